//! Gateway application: the runtime wired to the loopback network and the
//! stdio transport

use imgate_harness::LoopbackProvider;
use imgate_runtime::{RuntimeBuilder, RuntimeHandle};
use tokio::io::BufReader;
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::transport;

pub struct GatewayApp {
    runtime: RuntimeHandle,
}

impl GatewayApp {
    pub async fn start(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let AppConfig { gateway, loopback } = config;

        let runtime = RuntimeBuilder::new(gateway)
            .with_provider(move |events| Box::new(LoopbackProvider::new(events, loopback)))
            .build_and_start()
            .await?;

        Ok(Self { runtime })
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    /// Serve stdin until it closes or the process is interrupted
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        tokio::select! {
            result = transport::serve(self.runtime.client(), stdin, stdout) => {
                result?;
                info!("Input closed");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
            }
        }
        Ok(())
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.runtime.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let app = GatewayApp::start(AppConfig::default()).await.unwrap();
        assert!(app.runtime().is_running());
        let status = app.runtime().status().await.unwrap();
        assert_eq!(status.sessions.online, 0);
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_refused() {
        let mut config = AppConfig::default();
        config.gateway.timeouts.login_timeout_secs = 0;
        let result = GatewayApp::start(config).await;
        assert!(matches!(result, Err(CliError::Gateway(_))));
    }
}
