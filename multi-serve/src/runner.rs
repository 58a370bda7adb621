use std::future::Future;

use crate::error::Error;
use crate::server::MultiServer;

impl MultiServer {
    /// Starts all servers and blocks the current task until a shutdown
    /// signal (Ctrl+C) is received, then stops them.
    pub async fn run(self) -> Result<(), Error> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for Ctrl+C");
            }
        })
        .await
    }

    /// Starts all servers, waits for `signal` to complete, then stops them.
    ///
    /// If startup fails, the services that did start are stopped before the
    /// start error is returned.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        if let Err(err) = self.start().await {
            if let Err(stop_err) = self.stop().await {
                tracing::warn!(error = %stop_err, "cleanup after failed start");
            }
            return Err(err);
        }

        tracing::info!("servers running, waiting for shutdown signal");
        signal.await;

        tracing::info!("shutdown signal received, stopping servers");
        self.stop().await
    }
}
