//! Serializable adapter settings.
//!
//! Every record is fully defaulted, so an empty document yields the same
//! configuration as the adapter's `new` constructor. Durations are expressed
//! in milliseconds.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Shutdown timeout of [`HttpService`](crate::adapter::http::HttpService) unless configured.
pub const DEFAULT_HTTP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// Shutdown timeout of [`PacketService`](crate::adapter::packet::PacketService) unless configured.
pub const DEFAULT_PACKET_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);
/// Keep-alive period applied to accepted HTTP connections unless configured.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(3 * 60);

/// Settings for an HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
    /// Zero force-closes every connection on stop.
    #[serde(rename = "shutdown_timeout_ms", with = "millis")]
    pub shutdown_timeout: Duration,
    pub skip_errors: bool,
    /// `None` leaves keep-alive at the operating system default.
    #[serde(rename = "keepalive_ms", with = "opt_millis")]
    pub keepalive: Option<Duration>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            shutdown_timeout: DEFAULT_HTTP_SHUTDOWN_TIMEOUT,
            skip_errors: false,
            keepalive: Some(DEFAULT_KEEPALIVE),
        }
    }
}

/// Settings for a JSON-RPC listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonRpcConfig {
    pub addr: String,
    pub skip_errors: bool,
}

/// Settings for a UDP packet listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketConfig {
    /// Empty means port 1812 on the wildcard address of `network`.
    pub addr: String,
    /// One of `udp`, `udp4`, `udp6`; empty means `udp`.
    pub network: String,
    #[serde(rename = "shutdown_timeout_ms", with = "millis")]
    pub shutdown_timeout: Duration,
    pub skip_errors: bool,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            network: String::new(),
            shutdown_timeout: DEFAULT_PACKET_SHUTDOWN_TIMEOUT,
            skip_errors: false,
        }
    }
}

/// PEM certificate chain and private key for a TLS-enabled HTTP listener.
#[cfg(feature = "tls")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsFiles {
    pub cert: std::path::PathBuf,
    pub key: std::path::PathBuf,
}

#[cfg(feature = "tls")]
impl TlsFiles {
    /// Loads the certificate and key into a rustls server configuration.
    pub async fn load(&self) -> Result<axum_server::tls_rustls::RustlsConfig, std::io::Error> {
        for path in [&self.cert, &self.key] {
            if !path.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("TLS file not found: {:?}", path),
                ));
            }
        }
        axum_server::tls_rustls::RustlsConfig::from_pem_file(&self.cert, &self.key).await
    }
}

mod millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}
