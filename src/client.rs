//! Dashboard API Client
//!
//! HTTP client for the two chart endpoints the refresh loop polls.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::refresh::{ChartData, Endpoint, Forecast, RefreshError, RefreshResult};

/// Source of chart payloads
#[async_trait]
pub trait ChartApi: Send + Sync {
    /// `GET /api/chart_data?type=daily`
    async fn daily_chart_data(&self) -> RefreshResult<ChartData>;

    /// `GET /api/forecast`
    async fn forecast(&self) -> RefreshResult<Forecast>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the dashboard server (e.g., "http://localhost:5000")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// [`ChartApi`] over plain HTTP
pub struct HttpChartApi {
    client: Client,
    config: ClientConfig,
}

impl HttpChartApi {
    pub fn new(config: ClientConfig) -> RefreshResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| RefreshError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path()
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> RefreshResult<T> {
        let url = self.url(endpoint);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                RefreshError::Network(format!("request to {} timed out", url))
            } else {
                RefreshError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| RefreshError::Parse(format!("{} returned an unexpected body: {}", url, e)))
    }
}

#[async_trait]
impl ChartApi for HttpChartApi {
    async fn daily_chart_data(&self) -> RefreshResult<ChartData> {
        self.get_json::<ChartData>(Endpoint::DailyChartData)
            .await?
            .validate()
    }

    async fn forecast(&self) -> RefreshResult<Forecast> {
        self.get_json::<Forecast>(Endpoint::Forecast).await?.validate()
    }
}
