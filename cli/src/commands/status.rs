//! Status command implementation.
//!
//! Prints the active release of every configured target.

use anyhow::Result;

use crate::application::ports::ReleaseFs;
use crate::application::services::ReleaseStore;
use crate::domain::{AgentConfig, ReleaseStoreError};

/// Entry point for `autodeploy status`.
///
/// # Errors
///
/// Returns an error if any target's active pointer could not be read. Every
/// target is still reported.
pub fn run(config: &AgentConfig) -> Result<()> {
    let store = super::release_store(config);
    let lines = status_lines(&store, config);
    let mut unreadable = 0;
    for (line, ok) in &lines {
        println!("{line}");
        if !ok {
            unreadable += 1;
        }
    }
    anyhow::ensure!(
        unreadable == 0,
        "{unreadable} target(s) have an unreadable active release"
    );
    Ok(())
}

/// One display line per target, paired with whether it was readable.
pub fn status_lines<F: ReleaseFs>(
    store: &ReleaseStore<F>,
    config: &AgentConfig,
) -> Vec<(String, bool)> {
    config
        .targets
        .iter()
        .map(|t| {
            let current = store.current_release_id(&t.name);
            (format_status_line(&t.name, &current), current.is_ok())
        })
        .collect()
}

/// Format a target status line, e.g. `web: 42` or `web: none`.
#[must_use]
pub fn format_status_line(
    name: &str,
    current: &Result<Option<String>, ReleaseStoreError>,
) -> String {
    match current {
        Ok(Some(id)) => format!("{name}: {id}"),
        Ok(None) => format!("{name}: none"),
        Err(e) => format!("{name}: error ({e})"),
    }
}
