//! Mock gateways for testing
//!
//! `ScriptedGateway` replays queued results in call order and can hold a
//! response back until the test releases it. `MockGw` is the mockall
//! version for expectation-style tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use tokio::sync::Notify;

use crate::core::gateway::{Gateway, RemoteResult};

// ============================================================================
// Scripted Gateway
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub payload: Option<Value>,
}

impl RecordedCall {
    /// `search` field of the payload, if any.
    pub fn search(&self) -> Option<&str> {
        self.payload.as_ref()?.get("search")?.as_str()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.as_ref()?.get(name)
    }
}

struct Scripted {
    result: RemoteResult<Value>,
    gate: Option<Arc<Notify>>,
}

pub struct ScriptedGateway {
    calls: Mutex<Vec<RecordedCall>>,
    queue: Mutex<VecDeque<Scripted>>,
    fallback: RemoteResult<Value>,
}

impl ScriptedGateway {
    /// Unscripted calls answer with an empty list.
    pub fn new() -> Self {
        Self::with_fallback(RemoteResult::ok(Value::Array(Vec::new())).with_status(200))
    }

    pub fn with_fallback(fallback: RemoteResult<Value>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            fallback,
        }
    }

    pub fn push(&self, result: RemoteResult<Value>) {
        self.queue.lock().unwrap().push_back(Scripted { result, gate: None });
    }

    pub fn push_ok(&self, data: Value) {
        self.push(RemoteResult::ok(data).with_status(200));
    }

    pub fn push_err(&self, error: &str, status: u16) {
        self.push(RemoteResult::err(error).with_status(status));
    }

    /// Queue a result that is held until the returned handle is notified.
    pub fn push_gated(&self, result: RemoteResult<Value>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.queue.lock().unwrap().push_back(Scripted {
            result,
            gate: Some(gate.clone()),
        });
        gate
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn invoke(&self, operation: &str, payload: Option<Value>) -> RemoteResult<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            operation: operation.to_string(),
            payload,
        });

        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(Scripted { result, gate }) => {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                result
            }
            None => self.fallback.clone(),
        }
    }
}

// ============================================================================
// mockall Gateway
// ============================================================================

mock! {
    pub Gw {}

    #[async_trait]
    impl Gateway for Gw {
        async fn invoke(&self, operation: &str, payload: Option<Value>) -> RemoteResult<Value>;
    }
}
