use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::aggregator::ClusterStatsAggregator;
use crate::haproxy::StatsSource;
use crate::models::{
    ClusterReport, RetryPolicy, TargetStatus, VerificationOutcome, VerificationPolicy,
};

/// Which service to watch and the state it has to reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCheck {
    pub proxy: String,
    pub service: String,
    pub target: TargetStatus,
}

impl ServiceCheck {
    /// Watch `service` inside `proxy` until it reaches `target`.
    pub fn new(proxy: impl Into<String>, service: impl Into<String>, target: TargetStatus) -> Self {
        Self {
            proxy: proxy.into(),
            service: service.into(),
            target,
        }
    }
}

/// Result of evaluating one cluster snapshot.
#[derive(Debug, PartialEq, Eq)]
enum Evaluation {
    Verified,
    NotVerified,
    Missing { host: String },
}

/// Polls a cluster until a service reaches a target state.
pub struct ServiceStatusWaiter<S> {
    aggregator: ClusterStatsAggregator<S>,
    verification: VerificationPolicy,
}

impl<S: StatsSource> ServiceStatusWaiter<S> {
    /// Waiter using the last-host verification policy.
    pub fn new(source: S) -> Self {
        Self {
            aggregator: ClusterStatsAggregator::new(source),
            verification: VerificationPolicy::default(),
        }
    }

    /// Choose how per-host results combine into an attempt's verdict.
    pub fn with_verification(mut self, verification: VerificationPolicy) -> Self {
        self.verification = verification;
        self
    }

    /// Aggregator used for every poll.
    pub fn aggregator(&self) -> &ClusterStatsAggregator<S> {
        &self.aggregator
    }

    /// Poll until verified, missing, unreachable, cancelled, or out of attempts.
    ///
    /// A cluster with no reachable host ends the wait at once, as does a
    /// reporting host that does not list the service. Neither is retried.
    pub async fn wait_for_status(
        &self,
        hosts: &[String],
        check: &ServiceCheck,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> VerificationOutcome {
        let mut attempts = 0;

        let outcome = loop {
            if cancel.is_cancelled() {
                break VerificationOutcome::Cancelled { attempts };
            }
            attempts += 1;

            let cluster = self.aggregator.aggregate(hosts).await;
            if cluster.is_empty() {
                error!(
                    "Unable to retrieve stats from any of {}'s load balancers. Please contact a Systems Administrator.",
                    check.service
                );
                break VerificationOutcome::ExhaustedNoHostsReachable { attempts };
            }

            match self.evaluate(&cluster, check) {
                Evaluation::Verified => break VerificationOutcome::Verified { attempts },
                Evaluation::Missing { host } => {
                    error!(
                        "Unable to find service named '{}' in proxy named '{}' on {}. Please contact a Systems Administrator.",
                        check.service, check.proxy, host
                    );
                    break VerificationOutcome::NotFoundInAnyReportingHost { host, attempts };
                }
                Evaluation::NotVerified => {}
            }

            if attempts >= policy.max_attempts() {
                break VerificationOutcome::ExhaustedNotVerified { attempts };
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Wait for '{}' cancelled after {} attempts", check.service, attempts);
                    break VerificationOutcome::Cancelled { attempts };
                }
                _ = tokio::time::sleep(policy.inter_attempt_delay()) => {}
            }
        };

        let waited = policy.inter_attempt_delay() * attempts.saturating_sub(1);
        match &outcome {
            VerificationOutcome::Verified { .. } => info!(
                "HAProxy detected service '{}' of proxy '{}' is '{}'. Retried {} times ({:?}).",
                check.service, check.proxy, check.target, attempts, waited
            ),
            VerificationOutcome::ExhaustedNotVerified { .. } => warn!(
                "HAProxy did not detect service '{}' of proxy '{}' as '{}'. Retried {} times ({:?}).",
                check.service, check.proxy, check.target, attempts, waited
            ),
            _ => {}
        }

        outcome
    }

    /// Check every reporting host in report order. Any host missing the
    /// service short-circuits.
    fn evaluate(&self, cluster: &ClusterReport, check: &ServiceCheck) -> Evaluation {
        let mut verified = false;
        let mut all_agree = true;

        for (host, report) in cluster.iter() {
            let Some(record) = report.get(&check.proxy, &check.service) else {
                return Evaluation::Missing {
                    host: host.to_string(),
                };
            };
            debug!(
                "{}: Status for service '{}' in proxy '{}' is '{}' ({} current sessions)",
                host, check.service, check.proxy, record.status, record.current_connections
            );

            // Overwritten per host: with LastHostOnly the final host decides.
            verified = check.target.is_satisfied_by(record);
            all_agree &= verified;
        }

        let passed = match self.verification {
            VerificationPolicy::LastHostOnly => verified,
            VerificationPolicy::AllHostsAgree => all_agree,
        };
        if passed {
            Evaluation::Verified
        } else {
            Evaluation::NotVerified
        }
    }
}
