/// HTTP transport for the streams API
use crate::config::UpstreamConfig;
use crate::constants::USER_AGENT;
use crate::errors::{ConfigurationError, DashResult, UpstreamError};
use crate::streams::types::{StreamQuery, StreamRecord};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

/// One attempt of the upstream query. Implementations must be safe to
/// repeat; the accessor wraps this call in its retry policy.
#[async_trait]
pub trait StreamsTransport: Send + Sync {
    async fn fetch_streams(&self, query: &StreamQuery) -> DashResult<Vec<StreamRecord>>;
}

pub struct HttpStreamsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpStreamsClient {
    /// Create a client from validated upstream configuration.
    ///
    /// A missing endpoint fails here, at construction, not on first call.
    pub fn new(config: &UpstreamConfig) -> DashResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ConfigurationError::MissingConfig {
                field: "upstream.endpoint".to_string(),
            }
            .into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UpstreamError::ClientBuild {
                error: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl StreamsTransport for HttpStreamsClient {
    async fn fetch_streams(&self, query: &StreamQuery) -> DashResult<Vec<StreamRecord>> {
        let url = format!(
            "{}/streams?{}={}",
            self.base_url,
            query.param_name(),
            query.param_value()
        );

        debug!("Fetching streams from: {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| UpstreamError::Network {
            endpoint: url.clone(),
            error: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(UpstreamError::HttpStatus {
                endpoint: url,
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let records: Vec<StreamRecord> =
            response
                .json()
                .await
                .map_err(|e| UpstreamError::MalformedResponse {
                    endpoint: url.clone(),
                    error: e.to_string(),
                })?;

        debug!("Fetched {} streams for {}", records.len(), query.cache_key());

        Ok(records)
    }
}
