//! `appsettings.json` loading.
//!
//! Settings use the `PascalCase` `appsettings.json` layout of Azure AD app
//! registrations. An optional
//! `appsettings.Development.json` next to the base file is merged on top,
//! then environment variables override individual keys.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mailexport_core::directory::ews::EWS_ENDPOINT;
use mailexport_core::directory::graph::GRAPH_API_BASE;
use mailexport_oauth::provider::DEFAULT_AUTHORITY;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Base settings file name.
pub const SETTINGS_FILE: &str = "appsettings.json";

/// Overlay merged on top of the base file when present.
pub const DEVELOPMENT_SETTINGS_FILE: &str = "appsettings.Development.json";

/// Environment overrides.
const ENV_CLIENT_ID: &str = "MAILEXPORT_CLIENT_ID";
const ENV_TENANT_ID: &str = "MAILEXPORT_TENANT_ID";
const ENV_OUTPUT_DIR: &str = "MAILEXPORT_OUTPUT_DIR";

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// App registration.
    #[serde(rename = "AzureAd")]
    pub azure_ad: AzureAdConfig,
    /// Graph backend settings.
    #[serde(default)]
    pub graph: GraphConfig,
    /// EWS backend settings.
    #[serde(default)]
    pub ews: EwsConfig,
    /// Export defaults.
    #[serde(default)]
    pub export: ExportConfig,
}

/// Azure AD app registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AzureAdConfig {
    /// Login host.
    #[serde(default = "default_instance")]
    pub instance: String,
    /// Application (client) ID.
    #[serde(default)]
    pub client_id: String,
    /// Directory (tenant) ID, or `common`.
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
}

impl Default for AzureAdConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            client_id: String::new(),
            tenant_id: default_tenant(),
        }
    }
}

/// Graph settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphConfig {
    /// API root.
    #[serde(default = "default_graph_base")]
    pub base_url: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_graph_base(),
        }
    }
}

/// EWS settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EwsConfig {
    /// `Exchange.asmx` URL.
    #[serde(default = "default_ews_endpoint")]
    pub endpoint: String,
}

impl Default for EwsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ews_endpoint(),
        }
    }
}

/// Defaults for unattended exports.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportConfig {
    /// Messages per export; `0` exports everything.
    #[serde(default = "default_count")]
    pub default_count: i64,
    /// `json`, `html` or `both`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Where output files go.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_count: default_count(),
            format: default_format(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_instance() -> String {
    DEFAULT_AUTHORITY.to_string()
}

fn default_tenant() -> String {
    "common".to_string()
}

fn default_graph_base() -> String {
    GRAPH_API_BASE.to_string()
}

fn default_ews_endpoint() -> String {
    EWS_ENDPOINT.to_string()
}

const fn default_count() -> i64 {
    10
}

fn default_format() -> String {
    "both".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Loads settings from `explicit`, or from the first `appsettings.json`
    /// found in the working directory or the user config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no settings file exists, a file is not valid
    /// JSON, or no client id is configured.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let base_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => locate().await?,
        };
        debug!(path = %base_path.display(), "Loading settings");
        let base = read_json(&base_path).await?;

        let overlay_path = base_path.with_file_name(DEVELOPMENT_SETTINGS_FILE);
        let overlay = if overlay_path != base_path && tokio::fs::try_exists(&overlay_path).await? {
            debug!(path = %overlay_path.display(), "Applying settings overlay");
            Some(read_json(&overlay_path).await?)
        } else {
            None
        };

        Self::from_sources(base, overlay, |key| std::env::var(key).ok())
    }

    /// Builds a configuration from parsed documents and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged document does not describe a valid
    /// configuration.
    pub fn from_sources(
        mut base: Value,
        overlay: Option<Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if let Some(overlay) = overlay {
            merge(&mut base, overlay);
        }
        let mut config: Self =
            serde_json::from_value(base).context("settings do not match the expected layout")?;

        if let Some(client_id) = env(ENV_CLIENT_ID) {
            config.azure_ad.client_id = client_id;
        }
        if let Some(tenant_id) = env(ENV_TENANT_ID) {
            config.azure_ad.tenant_id = tenant_id;
        }
        if let Some(output_dir) = env(ENV_OUTPUT_DIR) {
            config.export.output_dir = PathBuf::from(output_dir);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.azure_ad.client_id.trim().is_empty() {
            bail!(
                "AzureAd.ClientId is not configured; set it in {SETTINGS_FILE} or via {ENV_CLIENT_ID}"
            );
        }
        if self.azure_ad.tenant_id.trim().is_empty() {
            bail!("AzureAd.TenantId must not be empty (use \"common\" for any account)");
        }
        Ok(())
    }
}

/// Searched locations for the base settings file, in order.
fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SETTINGS_FILE)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mailexport").join(SETTINGS_FILE));
    }
    paths
}

async fn locate() -> Result<PathBuf> {
    let candidates = candidates();
    for path in &candidates {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(path.clone());
        }
    }
    let searched = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    bail!("no {SETTINGS_FILE} found (searched: {searched}); pass --config <path>")
}

async fn read_json(path: &Path) -> Result<Value> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Recursively merges `overlay` into `base`; objects merge key by key,
/// anything else is replaced.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
