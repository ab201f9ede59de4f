//! Client for the HAProxy stats page: cluster-wide status checks and
//! enable/disable of backend servers.

pub mod cluster;
pub mod config_cli;
pub mod error;
pub mod haproxy;
pub mod models;

pub use cluster::{ClusterStatsAggregator, ServerActionExecutor, ServiceCheck, ServiceStatusWaiter};
pub use error::{ClientError, ConfigError};
pub use haproxy::{ActionSink, HaproxyClient, StatsEndpoint, StatsSource};
