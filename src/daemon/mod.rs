//! Daemon endpoint abstraction
//!
//! The daemon under test is an opaque collaborator reached over its HTTP
//! API. Everything the runner needs from it is behind [`DaemonApi`] so the
//! test suite can substitute the deterministic [`mock::MockDaemon`].

mod client;
pub mod mock;

pub use client::HttpDaemon;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::Result;

/// Receipt returned by the daemon for a submitted transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Whether the daemon accepted the transaction into its pool
    pub accepted: bool,
    /// Daemon-provided detail (tx hash, rejection reason, ...)
    #[serde(default)]
    pub info: Option<String>,
}

/// Operations the tester needs from a daemon instance
#[async_trait]
pub trait DaemonApi: Send + Sync {
    /// Endpoint identity used in logs, capture locks and error messages
    fn endpoint(&self) -> &str;

    /// Submit a transaction payload
    async fn submit_transaction(&self, payload: &Value) -> Result<SubmitReceipt>;

    /// Query a piece of daemon state; absent keys come back as `Value::Null`
    async fn query_state(&self, query: &str) -> Result<Value>;

    /// Cheap liveness probe used at startup
    async fn health(&self) -> Result<()>;
}
