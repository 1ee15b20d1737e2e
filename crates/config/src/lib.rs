//! Configuration for hoard.
//!
//! Values are layered, later sources overriding earlier ones:
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A config file (TOML, YAML or JSON, picked by extension).
//! 3. `HOARD_` environment variables, with `__` separating nested keys
//!    (`HOARD_SCAN__BADGE__WIDTH=120`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "HOARD_";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for everything hoard persists.
    pub data_dir: PathBuf,
    /// SQLite database; `{data_dir}/hoard.db` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Image store root; `{data_dir}/imgs` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<PathBuf>,
    pub crawl: CrawlConfig,
    pub discovery: DiscoveryConfig,
    pub http: HttpConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Pause after a failed discovery fetch.
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Page listing random sites.
    pub url: String,
    /// CSS selector matching the site links on that page.
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Images considered per scanned page.
    pub max_images: usize,
    /// Larger downloads are discarded.
    pub max_image_bytes: u64,
    /// Simultaneous image downloads per page.
    pub concurrency: usize,
    pub badge: BadgeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    pub width: u32,
    pub height: u32,
    /// Drop images whose decoded size isn't exactly `width`×`height`.
    pub enforce_dimensions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: ProjectDirs::from("", "", "hoard").map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_default(),
            database: None,
            images: None,
            crawl: CrawlConfig::default(),
            discovery: DiscoveryConfig::default(),
            http: HttpConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self { backoff_ms: 1000 }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: "https://neocities.org/browse?sort_by=random".to_string(),
            selector: ".website-Gallery .title a".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { user_agent: concat!("hoard/", env!("CARGO_PKG_VERSION")).to_string(), timeout_secs: 30 }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { max_images: 200, max_image_bytes: 1024 * 1024, concurrency: 4, badge: BadgeConfig::default() }
    }
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self { width: 88, height: 31, enforce_dimensions: true }
    }
}

impl Config {
    /// Load and validate configuration.
    ///
    /// An explicit `path` must exist. Without one, the platform config file
    /// (e.g. `~/.config/hoard/config.toml`) is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// The layered sources, without extracting or validating.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => figment = merge_file(figment, path)?,
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::NoDataDir);
        }
        if !self.data_dir.is_absolute() {
            exn::bail!(ErrorKind::InvalidValue("data_dir must be absolute"));
        }
        if self.database.as_ref().is_some_and(|p| !p.is_absolute()) {
            exn::bail!(ErrorKind::InvalidValue("database must be absolute"));
        }
        if self.images.as_ref().is_some_and(|p| !p.is_absolute()) {
            exn::bail!(ErrorKind::InvalidValue("images must be absolute"));
        }
        if !(self.discovery.url.starts_with("http://") || self.discovery.url.starts_with("https://")) {
            exn::bail!(ErrorKind::InvalidValue("discovery.url must be an http(s) URL"));
        }
        if self.discovery.selector.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue("discovery.selector must not be empty"));
        }
        if self.http.timeout_secs == 0 {
            exn::bail!(ErrorKind::InvalidValue("http.timeout_secs must be positive"));
        }
        if self.scan.max_images == 0 || self.scan.max_image_bytes == 0 {
            exn::bail!(ErrorKind::InvalidValue("scan limits must be positive"));
        }
        if self.scan.concurrency == 0 {
            exn::bail!(ErrorKind::InvalidValue("scan.concurrency must be positive"));
        }
        if self.scan.badge.width == 0 || self.scan.badge.height == 0 {
            exn::bail!(ErrorKind::InvalidValue("badge dimensions must be positive"));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| self.data_dir.join("hoard.db"))
    }

    pub fn images_path(&self) -> PathBuf {
        self.images.clone().unwrap_or_else(|| self.data_dir.join("imgs"))
    }
}

impl CrawlConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Platform location of the config file, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hoard").map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    tracing::debug!(path = %path.display(), "Loading config file");
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
