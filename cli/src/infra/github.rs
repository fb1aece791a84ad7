//! Release source infrastructure: implements `ReleaseSource` using GitHub releases.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::application::ports::{LatestRelease, ReleaseSource};
use crate::domain::release::hex_encode;
use crate::domain::{AssetError, ReleaseAsset, Target};

/// GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Asset downloads are only accepted from this host.
pub const TRUSTED_ASSET_HOST: &str = "github.com";

/// Upper bound on a single downloaded asset.
const MAX_ASSET_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct GithubRelease {
    id: u64,
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

impl From<GithubRelease> for LatestRelease {
    fn from(release: GithubRelease) -> Self {
        Self {
            id: release.id.to_string(),
            tag: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|a| ReleaseAsset {
                    name: a.name,
                    download_url: a.browser_download_url,
                })
                .collect(),
        }
    }
}

/// Uses the GitHub releases API to find and download release assets.
pub struct GithubReleaseSource {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GithubReleaseSource {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_api_url(GITHUB_API_URL, token)
    }

    /// Create a source against an alternative API endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_api_url(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("autodeploy/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

impl ReleaseSource for GithubReleaseSource {
    async fn latest_release(&self, target: &Target) -> Result<LatestRelease> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url, target.owner, target.repo
        );
        debug!(url = %url, "querying latest release");
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("cannot reach GitHub for {}/{}", target.owner, target.repo))?;

        match response.status() {
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                anyhow::bail!("GitHub API rate limited or token rejected")
            }
            StatusCode::NOT_FOUND => anyhow::bail!(
                "no published release found for {}/{}",
                target.owner,
                target.repo
            ),
            status if !status.is_success() => anyhow::bail!("GitHub API returned HTTP {status}"),
            _ => {}
        }
        let release: GithubRelease = response
            .json()
            .await
            .context("failed to parse GitHub release response")?;
        Ok(release.into())
    }

    fn check_origin(&self, asset: &ReleaseAsset) -> Result<(), AssetError> {
        validate_asset_url(&asset.download_url)
    }

    async fn download(&self, asset: &ReleaseAsset) -> Result<Vec<u8>> {
        self.check_origin(asset)?;
        let mut response = self
            .client
            .get(&asset.download_url)
            .send()
            .await
            .with_context(|| format!("failed to download {}", asset.name))?
            .error_for_status()
            .with_context(|| format!("failed to download {}", asset.name))?;

        if response.content_length().is_some_and(|len| len > MAX_ASSET_BYTES) {
            anyhow::bail!("{} exceeds the {MAX_ASSET_BYTES} byte download limit", asset.name);
        }
        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("failed to read {}", asset.name))?
        {
            append_capped(&mut data, &chunk, MAX_ASSET_BYTES)
                .with_context(|| format!("failed to read {}", asset.name))?;
        }

        info!(
            asset = %asset.name,
            bytes = data.len(),
            sha256 = %hex_encode(&Sha256::digest(&data)),
            "asset downloaded"
        );
        Ok(data)
    }
}

/// Append `chunk` to `buf`, refusing to grow `buf` past `limit` bytes.
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: u64) -> Result<()> {
    let total = (buf.len() + chunk.len()) as u64;
    anyhow::ensure!(total <= limit, "body exceeds the {limit} byte download limit");
    buf.extend_from_slice(chunk);
    Ok(())
}

/// Accept only `http(s)` URLs on [`TRUSTED_ASSET_HOST`].
///
/// # Errors
///
/// Returns [`AssetError::InvalidUrl`] if the URL does not parse, or
/// [`AssetError::UntrustedHost`] for any other host.
pub fn validate_asset_url(raw: &str) -> Result<(), AssetError> {
    let url = Url::parse(raw).map_err(|_| AssetError::InvalidUrl {
        url: raw.to_string(),
    })?;
    let trusted = matches!(url.scheme(), "https" | "http")
        && url.host_str() == Some(TRUSTED_ASSET_HOST);
    if !trusted {
        return Err(AssetError::UntrustedHost {
            url: raw.to_string(),
            expected: TRUSTED_ASSET_HOST,
        });
    }
    Ok(())
}
