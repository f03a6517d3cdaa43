#![allow(dead_code)]

use console_access_core::{Monitor, Observation, RetryPolicy, TimeoutPolicy, Transport};
use console_access_spec::{AccessDetails, Principal, RequestContext};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

/// Monitor that keeps every observation for assertions.
#[derive(Default)]
pub struct RecordingMonitor {
    observations: Mutex<Vec<Observation>>,
}

impl RecordingMonitor {
    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }
}

impl Monitor for RecordingMonitor {
    fn observe(&self, observation: &Observation) {
        self.observations.lock().unwrap().push(observation.clone());
    }
}

pub fn transport_with(monitor: Arc<RecordingMonitor>) -> Arc<Transport> {
    let timeouts = TimeoutPolicy {
        read: Duration::from_secs(2),
        write: Duration::from_secs(2),
        token: Duration::from_secs(2),
    };
    Arc::new(
        Transport::new(
            RetryPolicy::new(2, Duration::from_millis(5)),
            timeouts,
            monitor,
        )
        .unwrap(),
    )
}

pub fn transport() -> Arc<Transport> {
    transport_with(Arc::new(RecordingMonitor::default()))
}

pub fn access(server: &MockServer) -> AccessDetails {
    AccessDetails::new("ns1", "user-token", server.uri(), "us-south", "guid-1")
}

pub fn ctx() -> RequestContext {
    RequestContext::new(
        "tx-1",
        Some(Principal::new("IBMid-42", "user-refresh").with_account("acc-1")),
    )
}
