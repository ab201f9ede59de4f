use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::haproxy::StatsSource;
use crate::models::{ClusterReport, HostReport};

/// Polls every load balancer of a cluster for a fresh stats snapshot.
pub struct ClusterStatsAggregator<S> {
    source: S,
}

impl<S: StatsSource> ClusterStatsAggregator<S> {
    /// Aggregator fetching each host through `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Collaborator the reports are fetched from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch all hosts concurrently. Results come back in host order, one per
    /// distinct host.
    pub async fn fetch_all(&self, hosts: &[String]) -> Vec<(String, Result<HostReport, ClientError>)> {
        let mut distinct: Vec<&String> = Vec::with_capacity(hosts.len());
        for host in hosts {
            if !distinct.contains(&host) {
                distinct.push(host);
            }
        }

        let tasks = distinct.iter().map(|host| {
            info!("Getting stats from load balancer {}...", host);
            self.source.fetch_report(host)
        });
        let results = join_all(tasks).await;

        distinct.into_iter().cloned().zip(results).collect()
    }

    /// Hosts that failed are logged and left out of the report.
    pub async fn aggregate(&self, hosts: &[String]) -> ClusterReport {
        let mut cluster = ClusterReport::new();

        for (host, result) in self.fetch_all(hosts).await {
            match result {
                Ok(report) => cluster.insert(host, report),
                Err(e) => {
                    debug!("Stats fetch error for {}: {:?}", host, e);
                    warn!("Unable to get stats from load balancer {}: {}", host, e);
                }
            }
        }

        cluster
    }
}
