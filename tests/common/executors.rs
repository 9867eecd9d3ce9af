#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use stratoflow::runs::StepInput;
use stratoflow::scheduler::{StepExecutor, StepExecutorError};
use tokio::time::{sleep, Duration};

/// Succeeds immediately, echoing the node id and its dependency keys.
#[derive(Debug, Default)]
pub struct EchoExecutor;

#[async_trait]
impl StepExecutor for EchoExecutor {
    async fn execute(&self, node_id: &str, input: StepInput) -> Result<Value, StepExecutorError> {
        let mut deps: Vec<&str> = input.keys().map(String::as_str).collect();
        deps.sort_unstable();
        Ok(json!({ "node": node_id, "deps": deps }))
    }
}

/// Records the order steps were invoked in.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    invocations: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepExecutor for RecordingExecutor {
    async fn execute(&self, node_id: &str, input: StepInput) -> Result<Value, StepExecutorError> {
        self.invocations.lock().unwrap().push(node_id.to_string());
        Ok(json!({ "node": node_id, "inputs": input.len() }))
    }
}

/// Fails the first `failures` attempts of every node, then succeeds.
#[derive(Debug)]
pub struct FlakyExecutor {
    failures: u32,
    attempts: Mutex<FxHashMap<String, u32>>,
}

impl FlakyExecutor {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            attempts: Mutex::new(FxHashMap::default()),
        }
    }

    /// How many times `node_id` was invoked so far.
    pub fn attempts_for(&self, node_id: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(node_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl StepExecutor for FlakyExecutor {
    async fn execute(&self, node_id: &str, _input: StepInput) -> Result<Value, StepExecutorError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(node_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if attempt <= self.failures {
            Err(format!("transient failure on attempt {attempt}").into())
        } else {
            Ok(json!({ "node": node_id, "attempt": attempt }))
        }
    }
}

/// Fails every attempt of one node, succeeds for all others.
#[derive(Debug)]
pub struct FailNodeExecutor {
    pub fail: &'static str,
}

#[async_trait]
impl StepExecutor for FailNodeExecutor {
    async fn execute(&self, node_id: &str, _input: StepInput) -> Result<Value, StepExecutorError> {
        if node_id == self.fail {
            Err(format!("node '{node_id}' exploded").into())
        } else {
            Ok(json!({ "node": node_id }))
        }
    }
}

/// Sleeps for a fixed delay before every success.
#[derive(Debug)]
pub struct SlowExecutor {
    pub delay: Duration,
}

#[async_trait]
impl StepExecutor for SlowExecutor {
    async fn execute(&self, node_id: &str, _input: StepInput) -> Result<Value, StepExecutorError> {
        sleep(self.delay).await;
        Ok(json!({ "node": node_id }))
    }
}

/// Sleeps only for one node, instant everywhere else.
#[derive(Debug)]
pub struct SlowNodeExecutor {
    pub slow: &'static str,
    pub delay: Duration,
}

#[async_trait]
impl StepExecutor for SlowNodeExecutor {
    async fn execute(&self, node_id: &str, _input: StepInput) -> Result<Value, StepExecutorError> {
        if node_id == self.slow {
            sleep(self.delay).await;
        }
        Ok(json!({ "node": node_id }))
    }
}

/// Tracks the highest number of attempts in flight at once.
#[derive(Debug, Default)]
pub struct GaugeExecutor {
    in_flight: AtomicU32,
    peak: AtomicU32,
}

impl GaugeExecutor {
    pub fn peak(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepExecutor for GaugeExecutor {
    async fn execute(&self, node_id: &str, _input: StepInput) -> Result<Value, StepExecutorError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({ "node": node_id }))
    }
}
