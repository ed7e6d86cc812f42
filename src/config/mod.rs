use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::drive::client::DEFAULT_API_BASE_URL;
use crate::transcribe::model::default_model_dir;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google Drive access
    pub drive: DriveConfig,

    /// Whisper settings
    pub transcription: TranscriptionConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// OAuth token file holding the access token
    pub token_path: PathBuf,

    /// Drive v3 REST endpoint
    pub api_base_url: String,

    /// Size of each ranged download request in MiB
    pub chunk_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Whisper model name (tiny/base/small/medium/large-v3) or model file path
    pub model: String,

    /// Where downloaded models are kept (defaults to the user cache dir)
    pub model_dir: Option<PathBuf>,

    /// CPU threads used for inference
    pub threads: usize,

    /// Default language code (auto-detect if not specified)
    pub language: Option<String>,

    /// Restrict language detection to these codes
    pub allowed_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for downloads
    pub output_dir: PathBuf,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from("token.json"),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            chunk_size_mb: 100,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "small".to_string(),
            model_dir: None,
            threads: 4,
            language: None,
            allowed_languages: Vec::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("drive-scribe").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.drive.chunk_size_mb == 0 {
            anyhow::bail!("drive.chunk_size_mb must be greater than zero");
        }

        if self.transcription.threads == 0 {
            anyhow::bail!("transcription.threads must be greater than zero");
        }

        if self.transcription.model.trim().is_empty() {
            anyhow::bail!("transcription.model must not be empty");
        }

        url::Url::parse(&self.drive.api_base_url)
            .with_context(|| format!("Invalid drive.api_base_url: {}", self.drive.api_base_url))?;

        Ok(())
    }

    /// Chunk size in bytes
    pub fn chunk_size_bytes(&self) -> u64 {
        self.drive.chunk_size_mb.saturating_mul(1024 * 1024)
    }

    /// Model directory, defaulting to the user cache dir
    pub fn model_dir(&self) -> PathBuf {
        self.transcription
            .model_dir
            .clone()
            .unwrap_or_else(default_model_dir)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Token File: {}", self.drive.token_path.display());
        println!("  Drive API: {}", self.drive.api_base_url);
        println!("  Chunk Size: {} MiB", self.drive.chunk_size_mb);
        println!("  Whisper Model: {}", self.transcription.model);
        println!("  Model Dir: {}", self.model_dir().display());
        println!("  Threads: {}", self.transcription.threads);
        if let Some(language) = &self.transcription.language {
            println!("  Language: {}", language);
        }
        if !self.transcription.allowed_languages.is_empty() {
            println!("  Allowed Languages: {}", self.transcription.allowed_languages.join(", "));
        }
        println!("  Output Dir: {}", self.app.output_dir.display());
    }
}
