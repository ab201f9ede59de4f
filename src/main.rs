use haproxy_ctl::cluster::{ClusterStatsAggregator, ServerActionExecutor, ServiceCheck, ServiceStatusWaiter};
use haproxy_ctl::config_cli::{ActionArgs, Command, Config};
use haproxy_ctl::haproxy::HaproxyClient;
use haproxy_ctl::models::{Action, VerificationOutcome};

use anyhow::{Context, Result};
use clap::Parser;
use std::{process::ExitCode, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::parse();

    if config.lb_hosts.is_empty() {
        return Err(anyhow::anyhow!("No load balancers specified"));
    }

    let client = Arc::new(
        HaproxyClient::new(config.endpoint(), config.timeout())
            .context("Failed to create HTTP client")?,
    );

    match &config.command {
        Command::Stats => {
            let cluster = ClusterStatsAggregator::new(client)
                .aggregate(&config.lb_hosts)
                .await;
            println!("{}", serde_json::to_string_pretty(&cluster)?);
            Ok(if cluster.is_empty() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Wait(args) => {
            let policy = args.retry_policy().context("Invalid retry settings")?;
            let check = ServiceCheck::new(&args.proxy, &args.service, args.status);
            let waiter = ServiceStatusWaiter::new(client).with_verification(args.verification);

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                    on_signal.cancel();
                }
            });

            let outcome = waiter
                .wait_for_status(&config.lb_hosts, &check, &policy, &cancel)
                .await;
            if !outcome.is_verified() {
                error!("Wait for '{}' ended: {}", check.service, describe(&outcome));
            }
            Ok(exit_code(outcome.is_verified()))
        }
        Command::Enable(args) => Ok(run_action(client, &config.lb_hosts, Action::Enable, args).await),
        Command::Disable(args) => Ok(run_action(client, &config.lb_hosts, Action::Disable, args).await),
    }
}

/// Apply an action on every load balancer and summarize the result.
async fn run_action(
    client: Arc<HaproxyClient>,
    hosts: &[String],
    action: Action,
    args: &ActionArgs,
) -> ExitCode {
    let reports = ServerActionExecutor::new(client)
        .apply_to_cluster(hosts, &args.server, action, &args.proxy)
        .await;

    let ok = reports.iter().all(|r| r.all_succeeded());
    let applied: usize = reports
        .iter()
        .map(|r| r.results.iter().filter(|p| p.is_success()).count())
        .sum();
    info!(
        "{} '{}' in {} proxies across {} load balancers",
        action.past_tense(),
        args.server,
        applied,
        reports.len()
    );
    exit_code(ok)
}

fn describe(outcome: &VerificationOutcome) -> String {
    match outcome {
        VerificationOutcome::Verified { attempts } => format!("verified after {attempts} attempts"),
        VerificationOutcome::NotFoundInAnyReportingHost { host, .. } => {
            format!("service not found on {host}")
        }
        VerificationOutcome::ExhaustedNoHostsReachable { .. } => {
            "no load balancer reachable".to_string()
        }
        VerificationOutcome::ExhaustedNotVerified { attempts } => {
            format!("not verified after {attempts} attempts")
        }
        VerificationOutcome::Cancelled { attempts } => {
            format!("cancelled after {attempts} attempts")
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
