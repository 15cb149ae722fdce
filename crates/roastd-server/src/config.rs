use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Server configuration, read from the environment (and `.env`).
///
/// | Env Var                          | Default                  |
/// |----------------------------------|--------------------------|
/// | `ROASTD_HOST`                    | `0.0.0.0`                |
/// | `ROASTD_PORT`                    | `3000`                   |
/// | `ROASTD_DB_PATH`                 | `roastd.db`              |
/// | `ROASTD_STORAGE_DIR`             | `./roast-photos`         |
/// | `ROASTD_PUBLIC_URL`              | `http://localhost:{port}`|
/// | `GEMINI_API_KEY`                 | unset (no generation)    |
/// | `ROASTD_GEMINI_MODEL`            | `gemini-2.0-flash-exp`   |
/// | `ROASTD_GENERATION_TIMEOUT_SECS` | `60`                     |
/// | `ROASTD_FETCH_TIMEOUT_SECS`      | `20`                     |
/// | `ROASTD_MAX_UPLOAD_BYTES`        | `10485760`               |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub public_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub generation_timeout: Duration,
    pub fetch_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port: u16 = var("ROASTD_PORT", "3000")
            .parse()
            .context("ROASTD_PORT must be a valid port")?;
        let generation_timeout_secs: u64 = var("ROASTD_GENERATION_TIMEOUT_SECS", "60")
            .parse()
            .context("ROASTD_GENERATION_TIMEOUT_SECS must be a whole number of seconds")?;
        let fetch_timeout_secs: u64 = var("ROASTD_FETCH_TIMEOUT_SECS", "20")
            .parse()
            .context("ROASTD_FETCH_TIMEOUT_SECS must be a whole number of seconds")?;
        let max_upload_bytes: usize = var("ROASTD_MAX_UPLOAD_BYTES", "10485760")
            .parse()
            .context("ROASTD_MAX_UPLOAD_BYTES must be a byte count")?;

        Ok(Self {
            host: var("ROASTD_HOST", "0.0.0.0"),
            port,
            db_path: var("ROASTD_DB_PATH", "roastd.db").into(),
            storage_dir: var("ROASTD_STORAGE_DIR", "./roast-photos").into(),
            public_url: var("ROASTD_PUBLIC_URL", &format!("http://localhost:{}", port)),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_model: var("ROASTD_GEMINI_MODEL", "gemini-2.0-flash-exp"),
            generation_timeout: Duration::from_secs(generation_timeout_secs),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            max_upload_bytes,
        })
    }
}
