//! Verify command: check a local archive against its detached signature.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::application::ports::SignatureVerifier;
use crate::domain::AgentConfig;
use crate::infra::config::load_public_key;
use crate::infra::signature::MinisignVerifier;

/// Arguments for the verify command.
#[derive(Args)]
pub struct VerifyArgs {
    /// Release archive to check
    #[arg(long)]
    pub archive: PathBuf,

    /// Detached minisign signature for the archive
    #[arg(long)]
    pub signature: PathBuf,
}

/// Entry point for `autodeploy verify`.
///
/// # Errors
///
/// Returns an error if no key is configured, a file cannot be read, the key or
/// signature is malformed, or the signature does not match.
pub fn run(args: &VerifyArgs, config: &AgentConfig) -> Result<()> {
    let key = load_public_key(config)?.context("no public signing key configured")?;
    let verifier = MinisignVerifier::new(&key).context("invalid public signing key")?;

    let archive = std::fs::read(&args.archive)
        .with_context(|| format!("cannot read {}", args.archive.display()))?;
    let signature = std::fs::read(&args.signature)
        .with_context(|| format!("cannot read {}", args.signature.display()))?;

    let valid = verifier
        .verify(&archive, &signature)
        .with_context(|| format!("cannot check {}", args.signature.display()))?;
    anyhow::ensure!(
        valid,
        "signature verification failed for {}",
        args.archive.display()
    );
    println!("signature valid: {}", args.archive.display());
    Ok(())
}
