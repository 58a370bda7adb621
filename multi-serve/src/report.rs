//! Fire-and-forget failure reporting for serve loops.
//!
//! A serve loop runs on its own task after `start` has already returned, so
//! an unexpected exit has no caller to return an error to. Adapters hand
//! such failures to a [`Reporter`] injected at construction time. Which
//! reporter is injected decides the policy:
//!
//! * [`TracingReporter`] logs the fault and lets the process continue (default).
//! * [`ChannelReporter`] forwards the fault to a channel the caller watches.
//! * [`ExitReporter`] logs the fault and terminates the process.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::Error;

/// A failure raised by a background serve loop.
#[derive(Debug)]
pub struct Fault {
    /// Name of the service whose serve loop failed.
    pub service: String,
    pub error: Error,
}

impl Fault {
    pub fn new(service: impl Into<String>, error: Error) -> Self {
        Self {
            service: service.into(),
            error,
        }
    }
}

/// Receives faults from serve loops. Called concurrently from many tasks.
pub trait Reporter: Send + Sync {
    fn report(&self, fault: Fault);
}

impl<F> Reporter for F
where
    F: Fn(Fault) + Send + Sync,
{
    fn report(&self, fault: Fault) {
        self(fault)
    }
}

/// Shared handle to a reporter.
pub type SharedReporter = Arc<dyn Reporter>;

/// Logs every fault at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, fault: Fault) {
        tracing::error!(service = %fault.service, error = %fault.error, "serve loop failed");
    }
}

/// Sends every fault to an unbounded channel.
///
/// Faults reported after the receiver is dropped are logged instead.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<Fault>,
}

impl ChannelReporter {
    /// Creates a reporter together with the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fault>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, fault: Fault) {
        if let Err(mpsc::error::SendError(fault)) = self.tx.send(fault) {
            TracingReporter.report(fault);
        }
    }
}

/// Logs the fault and exits the process with status 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitReporter;

impl Reporter for ExitReporter {
    fn report(&self, fault: Fault) {
        tracing::error!(service = %fault.service, error = %fault.error, "serve loop failed, exiting");
        std::process::exit(1);
    }
}

pub(crate) fn default_reporter() -> SharedReporter {
    Arc::new(TracingReporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn channel_reporter_delivers_faults() {
        let (reporter, mut rx) = ChannelReporter::new();
        reporter.report(Fault::new("udp://0.0.0.0:1812", Error::MissingAddr));

        let fault = rx.recv().await.unwrap();
        assert_eq!(fault.service, "udp://0.0.0.0:1812");
        assert!(matches!(fault.error, Error::MissingAddr));
    }

    #[test]
    fn channel_reporter_survives_dropped_receiver() {
        let (reporter, rx) = ChannelReporter::new();
        drop(rx);
        reporter.report(Fault::new("http", Error::AlreadyStarted));
    }

    #[test]
    fn closures_are_reporters() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter: SharedReporter = Arc::new(move |fault: Fault| {
            sink.lock().unwrap().push(fault.service);
        });

        reporter.report(Fault::new("a", Error::MissingAddr));
        reporter.report(Fault::new("b", Error::MissingAddr));
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
