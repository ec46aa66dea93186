//! Keep-alive background task
//!
//! Some free hosting tiers suspend services that receive no traffic. This task
//! periodically requests the service's own health endpoint to keep it awake.

use std::time::Duration;
use tokio::time::interval;

use crate::config::{Config, KeepAliveConfig};
use crate::error::{AppError, Result};

/// Periodic self-ping
pub struct KeepAlive {
    http: reqwest::Client,
    url: String,
    interval_secs: u64,
    initial_delay_secs: u64,
}

impl KeepAlive {
    pub fn new(url: String, config: &KeepAliveConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            url,
            interval_secs: config.interval_secs,
            initial_delay_secs: config.initial_delay_secs,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.keep_alive_url(), &config.keep_alive)
    }

    /// Run the ping loop until the task is cancelled.
    pub async fn run(&self) {
        tracing::info!(
            url = %self.url,
            "Keep-alive started (interval: {}s)",
            self.interval_secs
        );

        tokio::time::sleep(Duration::from_secs(self.initial_delay_secs)).await;

        let mut interval = interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;

            match self.ping().await {
                Ok(()) => tracing::debug!("Keep-alive ping succeeded"),
                Err(e) => tracing::warn!("Keep-alive ping failed: {}", e),
            }
        }
    }

    pub async fn ping(&self) -> Result<()> {
        let response = self.http.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ping_unreachable_is_an_error() {
        let keep_alive = KeepAlive::new(
            "http://127.0.0.1:9/health".to_string(),
            &KeepAliveConfig::default(),
        )
        .unwrap();

        assert!(keep_alive.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_ping_own_health_endpoint() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route("/health", axum::routing::get(|| async { "OK" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let keep_alive = KeepAlive::new(
            format!("http://{}/health", addr),
            &KeepAliveConfig::default(),
        )
        .unwrap();

        assert!(keep_alive.ping().await.is_ok());
    }
}
