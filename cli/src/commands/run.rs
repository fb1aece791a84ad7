//! Run command: the long-running update loop.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::application::services::{SweepReport, UpdateAgent, Verification};
use crate::domain::AgentConfig;
use crate::infra::config::load_public_key;
use crate::infra::github::GithubReleaseSource;
use crate::infra::signature::MinisignVerifier;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Check every target once and exit (non-zero if any target failed)
    #[arg(long)]
    pub once: bool,

    /// GitHub API token used to query releases
    #[arg(long, env = "GITHUB_API_TOKEN", hide_env_values = true)]
    pub github_token: String,
}

/// Entry point for `autodeploy run`.
///
/// # Errors
///
/// Returns an error if startup fails (key unreadable or malformed, HTTP client
/// unavailable), or with `--once` if any target failed.
pub async fn run(args: &RunArgs, config: &AgentConfig) -> Result<()> {
    let verification = verification(config)?;
    let source = GithubReleaseSource::new(args.github_token.clone())?;
    let agent = UpdateAgent::new(source, verification, super::coordinator(config));

    info!(
        deploy_dir = %config.deploy_dir.display(),
        targets = config.targets.len(),
        interval_secs = config.update_interval,
        "autodeploy starting"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        // A deployment already handed to the blocking pool runs to completion
        // even if the sweep future is dropped here.
        let report = tokio::select! {
            report = agent.sweep(&config.targets) => report,
            res = &mut shutdown => return stopped(res),
        };
        info!(
            updated = report.updated,
            up_to_date = report.up_to_date,
            failed = report.failed,
            "sweep complete"
        );

        if args.once {
            return once_result(report);
        }

        tokio::select! {
            () = tokio::time::sleep(config.interval()) => {}
            res = &mut shutdown => return stopped(res),
        }
    }
}

fn verification(config: &AgentConfig) -> Result<Verification<MinisignVerifier>> {
    if config.unsafe_skip_signature_verification {
        warn!("signature verification is DISABLED; unauthenticated releases will be deployed");
        return Ok(Verification::UnsafeSkip);
    }
    let key = load_public_key(config)?
        .context("public signing key must be set if signature verification is enabled")?;
    let verifier = MinisignVerifier::new(&key).context("invalid public signing key")?;
    Ok(Verification::Enforced(verifier))
}

fn stopped(signal: std::io::Result<()>) -> Result<()> {
    signal.context("failed to listen for shutdown signal")?;
    info!("shutdown requested, exiting");
    Ok(())
}

/// Maps a single sweep to the process result for `--once`.
///
/// # Errors
///
/// Returns an error if any target failed.
pub fn once_result(report: SweepReport) -> Result<()> {
    let total = report.updated + report.up_to_date + report.failed;
    anyhow::ensure!(
        report.failed == 0,
        "{} of {total} targets failed to update",
        report.failed
    );
    Ok(())
}
