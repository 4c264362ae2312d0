use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    /// Exchange listing page every session opens first.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for each readiness wait between navigation steps.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default)]
    pub sandbox: bool,

    /// Chrome/Chromium binary; auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

/// Output locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    #[serde(default = "default_codes_path")]
    pub codes_path: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.bvl.com.pe/neg_rv_alfa.html".to_string()
}
fn default_wait_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}
fn default_codes_path() -> PathBuf {
    PathBuf::from("data/codes.csv")
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            wait_secs: default_wait_secs(),
            headless: true,
            sandbox: false,
            chrome_path: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            codes_path: default_codes_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl BrowserConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn validated_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid exchange URL {:?}", self.base_url))
    }
}

impl OutputConfig {
    /// Default destination for a firm's history, e.g. `downloads/ALICORC1.csv`.
    pub fn history_path(&self, ticker: &str) -> PathBuf {
        self.downloads_dir.join(format!("{}.csv", ticker))
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("BVL").separator("__"))
            .build()?;

        Self::from_config(cfg)
    }

    /// Deserialize and validate an already-layered configuration. A bad value
    /// anywhere is an error rather than a silent fallback to defaults.
    pub fn from_config(cfg: config::Config) -> Result<Self> {
        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("invalid configuration")?;
        app_cfg.browser.validated_url()?;
        Ok(app_cfg)
    }
}
