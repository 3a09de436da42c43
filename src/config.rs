//! Configuration for the artifact pipeline.
//!
//! Every knob has a sane default; `Config::from_env` applies environment
//! overrides so deployments can tune retention and endpoints without a
//! config file.

use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "cvpress";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}

/// Get the default application data directory (~/cvpress/).
pub fn default_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory; the intake area, cache, and index live under it.
    pub data_dir: PathBuf,
    /// Maximum age (days) before the sweeper reclaims an artifact.
    pub retention_days: i64,
    /// Fixed interval between sweep cycles.
    pub sweep_interval: Duration,
    /// Development mode: disables the retention sweeper entirely.
    pub dev_mode: bool,
    /// Durable object store bucket base URL.
    pub object_store_url: String,
    /// Optional bearer token for the object store.
    pub object_store_token: Option<String>,
    /// Generative extraction endpoint.
    pub extraction_url: String,
    /// Model name passed to the extraction endpoint.
    pub extraction_model: String,
    /// Optional API key for the extraction endpoint.
    pub extraction_api_key: Option<String>,
    /// Bound on every outbound store and extraction call.
    pub http_timeout_secs: u64,
    /// Upload size cap for submitted documents.
    pub max_document_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            retention_days: 30,
            sweep_interval: Duration::from_secs(24 * 60 * 60),
            dev_mode: false,
            object_store_url: "http://localhost:9000/cvpress".to_string(),
            object_store_token: None,
            extraction_url: "http://localhost:11434".to_string(),
            extraction_model: "gemini-2.5-flash".to_string(),
            extraction_api_key: None,
            http_timeout_secs: 120,
            max_document_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Build a config from defaults plus `CVPRESS_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("CVPRESS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(days) = env_parse::<i64>("CVPRESS_RETENTION_DAYS") {
            config.retention_days = days;
        }
        if let Some(secs) = env_parse::<u64>("CVPRESS_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Ok(v) = std::env::var("CVPRESS_DEV_MODE") {
            config.dev_mode = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(url) = std::env::var("CVPRESS_STORE_URL") {
            config.object_store_url = url;
        }
        if let Ok(token) = std::env::var("CVPRESS_STORE_TOKEN") {
            config.object_store_token = Some(token);
        }
        if let Ok(url) = std::env::var("CVPRESS_EXTRACTION_URL") {
            config.extraction_url = url;
        }
        if let Ok(model) = std::env::var("CVPRESS_EXTRACTION_MODEL") {
            config.extraction_model = model;
        }
        if let Ok(key) = std::env::var("CVPRESS_EXTRACTION_API_KEY") {
            config.extraction_api_key = Some(key);
        }
        if let Some(secs) = env_parse::<u64>("CVPRESS_HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = secs;
        }

        config
    }

    /// Intake staging area for raw uploaded documents.
    pub fn intake_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Local cache directory, one rendered artifact file per identifier.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("processed_files")
    }

    /// Metadata index SQLite file.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("cvpress.db")
    }

    /// Retention window as a chrono duration.
    pub fn retention_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
