//! # Configuration Management
//!
//! Loads the server configuration from multiple sources:
//! - TOML configuration file (`config.toml`, optional)
//! - Environment variables (with `APP_` prefix, `__` between nested keys)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` environment variables (deployment platforms)
//! 2. `APP_*` environment variables (`APP_TRAINING__TIMEOUT_SECS=60`)
//! 3. Configuration file (`config.toml`)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// ## Rust Concepts:
/// - **Serialize/Deserialize**: the `config` crate builds this struct from
///   the merged sources, and `/api/v1/config` serializes it back out
/// - **Clone**: `main` keeps a copy for startup checks while `AppState`
///   owns the shared one behind an `Arc`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub training: TrainingConfig,
    pub auth: AuthConfig,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upload policy and external training tool settings.
///
/// ## Fields:
/// - `executable`: training tool, resolved against the working directory
/// - `tmp_dir`: scratch directory for per-request files
/// - `required_files`: exact number of WAV samples per request
/// - `max_file_size`: per-file ceiling in bytes
/// - `model_suffix`: extension of the generated model filename
/// - `timeout_secs`: wall-clock limit for one training run
/// - `max_concurrent_jobs`: training processes allowed to run at once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub executable: PathBuf,
    pub tmp_dir: PathBuf,
    pub required_files: usize,
    pub max_file_size: usize,
    pub model_suffix: String,
    pub timeout_secs: u64,
    pub max_concurrent_jobs: usize,
}

/// API key location. The key lives in `<keys_dir>/<key_name>.txt`; a
/// missing file disables authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub keys_dir: PathBuf,
    pub key_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            training: TrainingConfig {
                executable: PathBuf::from("./gen_model.sh"),
                tmp_dir: PathBuf::from("tmp"),
                required_files: 3,
                max_file_size: 500 * 1024,
                model_suffix: "pmdl".to_string(),
                timeout_secs: 300,
                max_concurrent_jobs: 4,
            },
            auth: AuthConfig {
                keys_dir: PathBuf::from("keys"),
                key_name: "APIKey".to_string(),
            },
        }
    }
}

impl TrainingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AuthConfig {
    pub fn key_path(&self) -> PathBuf {
        self.keys_dir.join(format!("{}.txt", self.key_name))
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml` and the environment.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`
    /// - `APP_TRAINING__EXECUTABLE=/opt/hotword/gen_model.sh`
    /// - `APP_TRAINING__MAX_CONCURRENT_JOBS=2`
    /// - `HOST=0.0.0.0`, `PORT=3000`
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let training = &self.training;
        if training.executable.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Training executable must be set"));
        }
        if training.required_files == 0 {
            return Err(anyhow::anyhow!("Required file count must be greater than 0"));
        }
        if training.max_file_size == 0 {
            return Err(anyhow::anyhow!("Max file size must be greater than 0"));
        }
        if training.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Training timeout must be greater than 0"));
        }
        if training.max_concurrent_jobs == 0 {
            return Err(anyhow::anyhow!("Max concurrent jobs must be greater than 0"));
        }
        if training.model_suffix.is_empty()
            || training.model_suffix.contains(['/', '\\'])
        {
            return Err(anyhow::anyhow!(
                "Model suffix must be a non-empty extension without path separators"
            ));
        }

        if self.auth.key_name.is_empty() {
            return Err(anyhow::anyhow!("API key name must be set"));
        }

        Ok(())
    }
}
