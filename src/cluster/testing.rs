//! In-memory stand-ins for the HTTP collaborators.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::ClientError;
use crate::haproxy::{ActionSink, StatsSource};
use crate::models::{ActionRequest, ActionResponse, HostReport, StatsRecord, StatusValue};

pub fn record(proxy: &str, service: &str, status: &str, scur: u64) -> StatsRecord {
    StatsRecord {
        proxy_name: proxy.to_string(),
        service_name: service.to_string(),
        status: StatusValue::from(status),
        current_connections: scur,
        raw_fields: HashMap::new(),
    }
}

pub fn report(records: &[StatsRecord]) -> HostReport {
    let mut report = HostReport::new();
    for r in records {
        report.insert(r.clone());
    }
    report
}

/// Serves scripted reports per host. `None` in a script is a failed fetch.
/// Once a host's script has one entry left, that entry repeats.
#[derive(Default)]
pub struct FakeCluster {
    scripts: Mutex<HashMap<String, VecDeque<Option<HostReport>>>>,
    fetches: Mutex<Vec<String>>,
    failing_actions: Mutex<Vec<(String, String)>>,
    broken_actions: Mutex<Vec<(String, String)>>,
    actions: Mutex<Vec<(String, ActionRequest)>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(self, host: &str, script: Vec<Option<HostReport>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.to_string(), script.into());
        self
    }

    /// Actions on this host/proxy get a 500 response.
    pub fn reject_action(self, host: &str, proxy: &str) -> Self {
        self.failing_actions
            .lock()
            .unwrap()
            .push((host.to_string(), proxy.to_string()));
        self
    }

    /// Actions on this host/proxy fail before a response arrives.
    pub fn break_action(self, host: &str, proxy: &str) -> Self {
        self.broken_actions
            .lock()
            .unwrap()
            .push((host.to_string(), proxy.to_string()));
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<(String, ActionRequest)> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatsSource for FakeCluster {
    async fn fetch_report(&self, host: &str) -> Result<HostReport, ClientError> {
        self.fetches.lock().unwrap().push(host.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        let next = match scripts.get_mut(host) {
            Some(script) if script.len() > 1 => script.pop_front().flatten(),
            Some(script) => script.front().cloned().flatten(),
            None => None,
        };
        next.ok_or(ClientError::MissingHeader)
    }
}

#[async_trait]
impl ActionSink for FakeCluster {
    async fn send_action(
        &self,
        host: &str,
        request: &ActionRequest,
    ) -> Result<ActionResponse, ClientError> {
        self.actions
            .lock()
            .unwrap()
            .push((host.to_string(), request.clone()));

        let key = (host.to_string(), request.proxy.clone());
        if self.broken_actions.lock().unwrap().contains(&key) {
            return Err(ClientError::UnexpectedStatus {
                status: 0,
                url: format!("http://{host}/"),
            });
        }
        if self.failing_actions.lock().unwrap().contains(&key) {
            return Ok(ActionResponse {
                success: false,
                status: 500,
                body: String::new(),
            });
        }
        Ok(ActionResponse {
            success: true,
            status: 200,
            body: "<div><a>[X]</a> Action processed successfully.</div>".to_string(),
        })
    }
}
