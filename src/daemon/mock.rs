//! Deterministic in-memory daemon
//!
//! Stands in for a real daemon in the test suite: state is a plain map,
//! transactions mutate it synchronously, and scheduled values let tests
//! exercise condition polling without wall-clock dependence.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{Error, Result};

use super::{DaemonApi, SubmitReceipt};

#[derive(Default)]
struct MockState {
    state: HashMap<String, Value>,
    /// (key, value, remaining polls before the value becomes visible)
    scheduled: Vec<(String, Value, usize)>,
    transactions: Vec<Value>,
}

/// In-memory daemon with scripted behavior
pub struct MockDaemon {
    endpoint: String,
    inner: Mutex<MockState>,
    healthy: bool,
}

impl MockDaemon {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            inner: Mutex::new(MockState::default()),
            healthy: true,
        }
    }

    /// Seed a state entry
    pub fn with_state(self, key: &str, value: Value) -> Self {
        self.inner
            .lock()
            .unwrap()
            .state
            .insert(key.to_string(), value);
        self
    }

    /// Make `key` read as `value` only after it has been queried
    /// `after_queries` times, to exercise condition polling
    pub fn schedule(self, key: &str, value: Value, after_queries: usize) -> Self {
        self.inner
            .lock()
            .unwrap()
            .scheduled
            .push((key.to_string(), value, after_queries));
        self
    }

    /// Make the health probe fail
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Transactions submitted so far, in order
    pub fn submitted(&self) -> Vec<Value> {
        self.inner.lock().unwrap().transactions.clone()
    }
}

#[async_trait]
impl DaemonApi for MockDaemon {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn submit_transaction(&self, payload: &Value) -> Result<SubmitReceipt> {
        let mut inner = self.inner.lock().unwrap();
        inner.transactions.push(payload.clone());

        if payload.get("reject").and_then(Value::as_bool) == Some(true) {
            return Ok(SubmitReceipt {
                accepted: false,
                info: Some("rejected by mock".to_string()),
            });
        }

        // Payloads may carry state effects: {"set": {"chain.height": 2}}
        if let Some(effects) = payload.get("set").and_then(Value::as_object) {
            for (key, value) in effects {
                inner.state.insert(key.clone(), value.clone());
            }
        }

        Ok(SubmitReceipt {
            accepted: true,
            info: Some(format!("tx-{}", inner.transactions.len())),
        })
    }

    async fn query_state(&self, query: &str) -> Result<Value> {
        let mut inner = self.inner.lock().unwrap();

        let mut due = Vec::new();
        for (key, value, remaining) in inner.scheduled.iter_mut() {
            if key == query {
                if *remaining == 0 {
                    due.push((key.clone(), value.clone()));
                } else {
                    *remaining -= 1;
                }
            }
        }
        for (key, value) in due {
            inner.state.insert(key, value);
        }

        Ok(inner.state.get(query).cloned().unwrap_or(Value::Null))
    }

    async fn health(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(Error::daemon_unreachable(&self.endpoint, "mock is down"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_transaction_effects_apply() {
        let daemon = MockDaemon::new("mock-0");
        let receipt = daemon
            .submit_transaction(&json!({"set": {"chain.height": 5}}))
            .await
            .unwrap();
        assert!(receipt.accepted);
        assert_eq!(daemon.query_state("chain.height").await.unwrap(), json!(5));
    }

    #[tokio::test]
    async fn test_scheduled_value_appears_after_polls() {
        let daemon = MockDaemon::new("mock-0").schedule("chain.height", json!(3), 2);
        assert_eq!(daemon.query_state("chain.height").await.unwrap(), Value::Null);
        assert_eq!(daemon.query_state("chain.height").await.unwrap(), Value::Null);
        assert_eq!(daemon.query_state("chain.height").await.unwrap(), json!(3));
    }

    #[tokio::test]
    async fn test_reject_flag() {
        let daemon = MockDaemon::new("mock-0");
        let receipt = daemon
            .submit_transaction(&json!({"reject": true}))
            .await
            .unwrap();
        assert!(!receipt.accepted);
    }
}
