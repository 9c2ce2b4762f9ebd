use config::{Config, ConfigError, Environment, File};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::error::{Error, Result, MIB};

/// Placeholder shipped in sample `.env` files.
const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Largest accepted image, in bytes.
    pub max_file_size: u64,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    /// Working directory for uploaded images and temp copies.
    pub upload_folder: String,
    /// Age after which an unclaimed temp copy is swept.
    pub temp_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    /// Vision model used for feedback and as the fallback for rendering.
    pub model: String,
    /// Model first attempted for the 3D view.
    pub image_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__SERVER__PORT=5000 to server.port
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mut cfg: Self = s.try_deserialize()?;
        if cfg.model.api_key.is_none() {
            cfg.model.api_key = std::env::var("GEMINI_API_KEY").ok().map(Secret::new);
        }
        Ok(cfg)
    }

    /// Reject configurations the service cannot run with.
    ///
    /// Trims the API key in place.
    pub fn validate(&mut self) -> Result<()> {
        let key = self
            .model
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().trim().to_string())
            .unwrap_or_default();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(Error::config(
                "GEMINI_API_KEY not found in environment variables. \
                 Please create a .env file with your actual API key.",
            ));
        }
        self.model.api_key = Some(Secret::new(key));

        if self.upload.allowed_extensions.is_empty() {
            return Err(Error::config("upload.allowed_extensions must not be empty"));
        }
        self.upload.allowed_extensions = self
            .upload
            .allowed_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        if self.upload.max_file_size == 0 {
            return Err(Error::config("upload.max_file_size must be positive"));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 5000,
            },
            upload: UploadConfig::default(),
            model: ModelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 16 * MIB,
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "bmp", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            upload_folder: "uploads".into(),
            temp_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.5-flash".into(),
            image_model: "gemini-2.5-flash".into(),
            timeout_secs: 60,
        }
    }
}
