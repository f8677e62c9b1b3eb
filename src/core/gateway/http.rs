//! HTTP Gateway
//!
//! Calls edge functions at `{base_url}/{functions_path}/{operation}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::error::{GatewayError, Result};
use super::normalize::{normalize, RawResponse};
use super::{Gateway, RemoteResult};
use crate::config::GatewayConfig;

pub struct HttpGateway {
    client: Client,
    functions_url: Url,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_functions_path(base_url, "functions/v1", api_key, timeout)
    }

    pub fn with_functions_path(
        base_url: &str,
        functions_path: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(GatewayError::MissingBaseUrl);
        }

        // Trailing slashes keep `Url::join` from dropping path segments.
        let mut joined = format!("{}/", base_url.trim_end_matches('/'));
        let path = functions_path.trim_matches('/');
        if !path.is_empty() {
            joined.push_str(path);
            joined.push('/');
        }
        let functions_url = Url::parse(&joined).map_err(|source| GatewayError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            functions_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().ok_or(GatewayError::MissingBaseUrl)?;
        Self::with_functions_path(
            base_url,
            &config.functions_path,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Endpoint for an operation.
    pub fn endpoint(&self, operation: &str) -> String {
        match self.functions_url.join(operation.trim_start_matches('/')) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.functions_url, operation),
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn invoke(&self, operation: &str, payload: Option<Value>) -> RemoteResult<Value> {
        let url = self.endpoint(operation);
        let body = payload.unwrap_or_else(|| Value::Object(Default::default()));

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request
                .header("Authorization", format!("Bearer {key}"))
                .header("apikey", key);
        }

        debug!(operation, %url, "invoking edge function");
        let start = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(operation, error = %e, "edge function call failed");
                return RemoteResult::err(format!("Network error: {e}"));
            }
        };

        let result = normalize(RawResponse::read(response).await);
        let latency_ms = start.elapsed().as_millis() as u64;

        match result.error() {
            Some(error) => warn!(
                operation,
                status = result.status(),
                latency_ms,
                error,
                "edge function returned an error"
            ),
            None => debug!(operation, status = result.status(), latency_ms, "edge function ok"),
        }

        result
    }
}
