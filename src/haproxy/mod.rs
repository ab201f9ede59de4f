pub mod client;
mod notice;
mod report;

pub use client::{ActionSink, Credentials, HaproxyClient, StatsEndpoint, StatsSource};
pub use notice::extract_notice;
