//! HTTP client for the daemon's RPC surface

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{Error, Result};

use super::{DaemonApi, SubmitReceipt};

/// Daemon instance reached over HTTP
pub struct HttpDaemon {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpDaemon {
    /// Create a client for one daemon endpoint
    ///
    /// `endpoint` is the base URL, e.g. `http://127.0.0.1:8302`.
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }
}

#[async_trait]
impl DaemonApi for HttpDaemon {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn submit_transaction(&self, payload: &Value) -> Result<SubmitReceipt> {
        let response = self
            .client
            .post(self.url("transactions"))
            .json(payload)
            .send()
            .await?;

        // Rejection is a structured receipt, not an HTTP error; only
        // malformed bodies are errors here.
        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            Error::DaemonResponse(format!("transaction receipt from {status}: {e}"))
        })?;

        serde_json::from_value(body.clone()).map_err(|_| {
            Error::DaemonResponse(format!("unrecognized transaction receipt: {body}"))
        })
    }

    async fn query_state(&self, query: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.url("state"))
            .query(&[("query", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::daemon_request(
                &self.endpoint,
                format!("state query '{}' returned {}", query, response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::DaemonResponse(format!("state query '{query}': {e}")))
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("health"))
            .send()
            .await
            .map_err(|e| Error::daemon_unreachable(&self.endpoint, e))?;

        if !response.status().is_success() {
            return Err(Error::daemon_unreachable(
                &self.endpoint,
                format!("health probe returned {}", response.status()),
            ));
        }
        Ok(())
    }
}
