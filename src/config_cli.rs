// ============================================================================
// Configuration and CLI
// ============================================================================

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::error::ConfigError;
use crate::haproxy::{Credentials, StatsEndpoint};
use crate::models::{ProxyScope, RetryPolicy, TargetStatus, VerificationPolicy};

#[derive(Parser, Debug)]
#[command(name = "haproxy-ctl", about = "Check and toggle services across HAProxy load balancers")]
pub struct Config {
    /// Comma-separated list of load balancer hostnames
    #[arg(long, env = "LB_HOSTS", value_delimiter = ',', required = true)]
    pub lb_hosts: Vec<String>,

    /// Port the stats page listens on
    #[arg(long, env = "HAPROXY_PORT", default_value = "80")]
    pub port: u16,

    /// Stats URI configured in HAProxy
    #[arg(long, env = "HAPROXY_BASE_PATH", default_value = "/haproxy?stats")]
    pub base_path: String,

    /// Stats page username
    #[arg(long, env = "HAPROXY_USERNAME")]
    pub username: Option<String>,

    /// Stats page password
    #[arg(long, env = "HAPROXY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// HTTP request timeout (seconds)
    #[arg(long, env = "HAPROXY_TIMEOUT", default_value = "10")]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every load balancer's report as JSON
    Stats,
    /// Wait until a service is UP or drained on the cluster
    Wait(WaitArgs),
    /// Enable a server on every load balancer
    Enable(ActionArgs),
    /// Disable a server on every load balancer
    Disable(ActionArgs),
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    #[arg(long)]
    pub proxy: String,

    #[arg(long)]
    pub service: String,

    /// up, or down (DOWN/MAINT with no current sessions)
    #[arg(long, default_value = "up")]
    pub status: TargetStatus,

    #[arg(long, env = "MAX_ATTEMPTS", default_value = "15")]
    pub max_attempts: u32,

    /// Delay between polls (seconds)
    #[arg(long, env = "CHECK_INTERVAL", default_value = "2")]
    pub interval_secs: u64,

    /// last-host or all-hosts
    #[arg(long, default_value = "last-host")]
    pub verification: VerificationPolicy,
}

#[derive(Args, Debug)]
pub struct ActionArgs {
    #[arg(long)]
    pub server: String,

    /// Proxy name, or `all` for every proxy the server is in
    #[arg(long, default_value = "all")]
    pub proxy: ProxyScope,
}

impl Config {
    pub fn endpoint(&self) -> StatsEndpoint {
        let credentials = self.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        });

        StatsEndpoint {
            port: self.port,
            base_path: self.base_path.clone(),
            credentials,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WaitArgs {
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}
