//! The multi-serve prelude for convenient importing of the most common items.

pub use crate::adapter::packet::Packet;
pub use crate::adapter::packet::PacketServer;
pub use crate::adapter::packet::PacketService;
pub use crate::adapter::packet::StaticSecret;
pub use crate::builder::MultiServerBuilder;
pub use crate::error::Error;
pub use crate::error::StopErrors;
pub use crate::report::ChannelReporter;
pub use crate::report::ExitReporter;
pub use crate::report::Fault;
pub use crate::report::Reporter;
pub use crate::report::TracingReporter;
pub use crate::server::MultiServer;
pub use crate::service::Service;
pub use crate::service::ServiceFuture;

#[cfg(feature = "http")]
pub use crate::adapter::http::HttpService;
#[cfg(feature = "jsonrpsee")]
pub use crate::adapter::jsonrpc::JsonRpcService;
