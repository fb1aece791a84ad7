//! Config file loading: JSON by default, YAML by extension.

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::AgentConfig;

/// Read, parse and validate the agent config at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or fails
/// validation.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config = parse_config(path, &content)?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn parse_config(path: &Path, content: &str) -> Result<AgentConfig> {
    let yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if yaml {
        serde_yaml::from_str(content).with_context(|| format!("cannot parse {}", path.display()))
    } else {
        serde_json::from_str(content).with_context(|| format!("cannot parse {}", path.display()))
    }
}

/// Resolve the configured public key, reading the key file if one is set.
///
/// Returns `Ok(None)` when neither a key file nor an inline key is set.
///
/// # Errors
///
/// Returns an error if the key file cannot be read.
pub fn load_public_key(config: &AgentConfig) -> Result<Option<String>> {
    if let Some(path) = config
        .public_signing_key_file
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
    {
        let key = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read public signing key {}", path.display()))?;
        return Ok(Some(key));
    }
    Ok(config
        .public_signing_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string))
}
