use tracing::{debug, error, info, warn};

use crate::haproxy::{ActionSink, StatsSource, extract_notice};
use crate::models::{
    Action, ActionRequest, ActionStatus, HostActionReport, ProxyActionResult, ProxyScope,
};

/// Enables or disables a server through the stats page admin form.
pub struct ServerActionExecutor<C> {
    client: C,
}

impl<C: StatsSource + ActionSink> ServerActionExecutor<C> {
    /// Executor that discovers proxies and sends actions through `client`.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Collaborator used for reports and admin requests.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Apply `action` to `server` on one host.
    ///
    /// With [`ProxyScope::All`] the host's report is fetched once to find every
    /// proxy listing the server. A named proxy is used as given.
    pub async fn apply(
        &self,
        host: &str,
        server: &str,
        action: Action,
        scope: &ProxyScope,
    ) -> HostActionReport {
        let proxies = match scope {
            ProxyScope::Named(proxy) => vec![proxy.clone()],
            ProxyScope::All => match self.client.fetch_report(host).await {
                Ok(report) => report.proxies_with_service(server),
                Err(e) => {
                    error!(
                        "Unable to find proxies for '{}' on {}: {}",
                        server, host, e
                    );
                    return HostActionReport {
                        host: host.to_string(),
                        results: Vec::new(),
                        discovery_error: Some(e.to_string()),
                    };
                }
            },
        };

        if proxies.is_empty() {
            warn!("Server '{}' is not in any proxy on {}", server, host);
        }

        let mut results = Vec::with_capacity(proxies.len());
        for proxy in proxies {
            let status = self.send(host, server, &proxy, action).await;
            results.push(ProxyActionResult {
                host: host.to_string(),
                proxy,
                action,
                status,
            });
        }

        HostActionReport {
            host: host.to_string(),
            results,
            discovery_error: None,
        }
    }

    /// Apply on each host in turn. Hosts are independent and nothing is
    /// rolled back when a later host fails.
    pub async fn apply_to_cluster(
        &self,
        hosts: &[String],
        server: &str,
        action: Action,
        scope: &ProxyScope,
    ) -> Vec<HostActionReport> {
        let mut reports = Vec::with_capacity(hosts.len());
        for host in hosts {
            reports.push(self.apply(host, server, action, scope).await);
        }
        reports
    }

    async fn send(&self, host: &str, server: &str, proxy: &str, action: Action) -> ActionStatus {
        let request = ActionRequest {
            server: server.to_string(),
            proxy: proxy.to_string(),
            action,
        };

        match self.client.send_action(host, &request).await {
            Ok(response) if response.success => {
                info!(
                    "{} '{}' in proxy '{}' on {}",
                    action.past_tense(),
                    server,
                    proxy,
                    host
                );
                if let Some(notice) = extract_notice(&response.body) {
                    debug!("HAProxy response on {}: {}", host, notice);
                }
                ActionStatus::Applied
            }
            Ok(response) => {
                error!(
                    "Failed to {} '{}' in proxy '{}' on {} (HTTP {})",
                    action, server, proxy, host, response.status
                );
                ActionStatus::Rejected {
                    status: response.status,
                }
            }
            Err(e) => {
                error!(
                    "Failed to {} '{}' in proxy '{}' on {}: {}",
                    action, server, proxy, host, e
                );
                ActionStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
