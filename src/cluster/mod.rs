pub mod actions;
pub mod aggregator;
pub mod waiter;

#[cfg(test)]
mod testing;

pub use actions::ServerActionExecutor;
pub use aggregator::ClusterStatsAggregator;
pub use waiter::{ServiceCheck, ServiceStatusWaiter};
