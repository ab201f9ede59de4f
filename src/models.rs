use serde::{Serialize, Serializer, ser::SerializeMap};
use std::{collections::BTreeMap, collections::HashMap, fmt, str::FromStr, time::Duration};

use crate::error::ConfigError;

// ============================================================================
// Report Models
// ============================================================================

/// Service names HAProxy uses for the proxy's own aggregate rows.
pub const AGGREGATE_ROWS: [&str; 2] = ["FRONTEND", "BACKEND"];

/// Value of the `status` column. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatusValue {
    Up,
    Down,
    Maint,
    Other(String),
}

impl StatusValue {
    pub fn as_str(&self) -> &str {
        match self {
            StatusValue::Up => "UP",
            StatusValue::Down => "DOWN",
            StatusValue::Maint => "MAINT",
            StatusValue::Other(raw) => raw,
        }
    }

    /// Out of rotation, either failed checks or administratively disabled.
    pub fn is_down_or_maint(&self) -> bool {
        matches!(self, StatusValue::Down | StatusValue::Maint)
    }
}

impl From<&str> for StatusValue {
    fn from(raw: &str) -> Self {
        match raw {
            "UP" => StatusValue::Up,
            "DOWN" => StatusValue::Down,
            "MAINT" => StatusValue::Maint,
            other => StatusValue::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatusValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One server row of a host's status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRecord {
    pub proxy_name: String,
    pub service_name: String,
    pub status: StatusValue,
    pub current_connections: u64,
    /// Every other column of the row, keyed by header name.
    pub raw_fields: HashMap<String, String>,
}

/// proxy name -> service name -> record, for a single host and a single poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HostReport {
    proxies: BTreeMap<String, BTreeMap<String, StatsRecord>>,
}

impl HostReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later rows for the same proxy/service replace earlier ones.
    pub fn insert(&mut self, record: StatsRecord) {
        self.proxies
            .entry(record.proxy_name.clone())
            .or_default()
            .insert(record.service_name.clone(), record);
    }

    /// Record for `service` in `proxy`, if the host lists it.
    pub fn get(&self, proxy: &str, service: &str) -> Option<&StatsRecord> {
        self.proxies.get(proxy).and_then(|services| services.get(service))
    }

    /// Every proxy that lists `service` as one of its servers.
    pub fn proxies_with_service(&self, service: &str) -> Vec<String> {
        self.proxies
            .iter()
            .filter(|(_, services)| services.contains_key(service))
            .map(|(proxy, _)| proxy.clone())
            .collect()
    }

    /// Every server record across all proxies.
    pub fn records(&self) -> impl Iterator<Item = &StatsRecord> {
        self.proxies.values().flat_map(|services| services.values())
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

/// Reports of every host that answered one poll, in host order.
///
/// A host missing here failed to report. That is not the same as its
/// services being down and callers must treat it separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterReport {
    hosts: Vec<(String, HostReport)>,
}

impl ClusterReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores a host that is already present.
    pub fn insert(&mut self, host: impl Into<String>, report: HostReport) {
        let host = host.into();
        if self.get(&host).is_none() {
            self.hosts.push((host, report));
        }
    }

    /// Report of `host`, or `None` if it failed to answer.
    pub fn get(&self, host: &str) -> Option<&HostReport> {
        self.hosts
            .iter()
            .find(|(name, _)| name == host)
            .map(|(_, report)| report)
    }

    /// Hosts and their reports in host order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostReport)> {
        self.hosts.iter().map(|(host, report)| (host.as_str(), report))
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|(host, _)| host.as_str())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Serialize for ClusterReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.hosts.len()))?;
        for (host, report) in &self.hosts {
            map.serialize_entry(host, report)?;
        }
        map.end()
    }
}

// ============================================================================
// Verification Models
// ============================================================================

/// Bounded polling budget for a status wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    inter_attempt_delay: Duration,
}

impl RetryPolicy {
    /// Fails when `max_attempts` is zero.
    pub fn new(max_attempts: u32, inter_attempt_delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            inter_attempt_delay,
        })
    }

    /// Total cluster polls allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep between two consecutive polls.
    pub fn inter_attempt_delay(&self) -> Duration {
        self.inter_attempt_delay
    }
}

/// 15 attempts, 2 seconds apart: at most 30 seconds of waiting.
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            inter_attempt_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetStatus {
    Up,
    /// DOWN or MAINT with no current connections, i.e. drained.
    Down,
}

impl TargetStatus {
    /// Whether one host's record meets this target.
    pub fn is_satisfied_by(&self, record: &StatsRecord) -> bool {
        match self {
            TargetStatus::Up => record.status == StatusValue::Up,
            TargetStatus::Down => {
                record.status.is_down_or_maint() && record.current_connections == 0
            }
        }
    }
}

impl FromStr for TargetStatus {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(TargetStatus::Up),
            "down" => Ok(TargetStatus::Down),
            _ => Err(ConfigError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Up => f.write_str("UP"),
            TargetStatus::Down => f.write_str("DOWN"),
        }
    }
}

/// How per-host evaluations combine into the verdict for one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// Only the last reporting host in host order decides. Earlier hosts are
    /// still checked for the service's presence.
    #[default]
    LastHostOnly,
    /// Every reporting host must satisfy the condition.
    AllHostsAgree,
}

impl FromStr for VerificationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-host" => Ok(VerificationPolicy::LastHostOnly),
            "all-hosts" => Ok(VerificationPolicy::AllHostsAgree),
            _ => Err(ConfigError::UnknownVerificationPolicy(s.to_string())),
        }
    }
}

/// Terminal result of a status wait. `attempts` counts cluster polls made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified { attempts: u32 },
    NotFoundInAnyReportingHost { host: String, attempts: u32 },
    ExhaustedNoHostsReachable { attempts: u32 },
    ExhaustedNotVerified { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            VerificationOutcome::Verified { attempts }
            | VerificationOutcome::NotFoundInAnyReportingHost { attempts, .. }
            | VerificationOutcome::ExhaustedNoHostsReachable { attempts }
            | VerificationOutcome::ExhaustedNotVerified { attempts }
            | VerificationOutcome::Cancelled { attempts } => *attempts,
        }
    }
}

// ============================================================================
// Action Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Enable,
    Disable,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Enable => "enable",
            Action::Disable => "disable",
        }
    }

    /// Verb used in log lines, e.g. "Disabled".
    pub fn past_tense(&self) -> &'static str {
        match self {
            Action::Enable => "Enabled",
            Action::Disable => "Disabled",
        }
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable" => Ok(Action::Enable),
            "disable" => Ok(Action::Disable),
            _ => Err(ConfigError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which proxies an action targets on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyScope {
    /// Every proxy the server currently appears in.
    All,
    Named(String),
}

impl FromStr for ProxyScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(ConfigError::EmptyProxyName),
            "all" => Ok(ProxyScope::All),
            name => Ok(ProxyScope::Named(name.to_string())),
        }
    }
}

/// Form parameters of one admin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub server: String,
    pub proxy: String,
    pub action: Action,
}

impl ActionRequest {
    /// `s`, `b` and `action` parameters of the admin form.
    pub fn form(&self) -> [(&'static str, &str); 3] {
        [
            ("s", self.server.as_str()),
            ("b", self.proxy.as_str()),
            ("action", self.action.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub success: bool,
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Applied,
    Rejected { status: u16 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyActionResult {
    pub host: String,
    pub proxy: String,
    pub action: Action,
    pub status: ActionStatus,
}

impl ProxyActionResult {
    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Applied
    }
}

/// Everything one host did for an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostActionReport {
    pub host: String,
    pub results: Vec<ProxyActionResult>,
    /// Set when the host's report could not be fetched to resolve `all`.
    pub discovery_error: Option<String>,
}

impl HostActionReport {
    /// True when discovery worked and every proxy accepted the action.
    pub fn all_succeeded(&self) -> bool {
        self.discovery_error.is_none() && self.results.iter().all(|r| r.is_success())
    }
}
