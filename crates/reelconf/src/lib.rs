//! Configuration loading for the reel streaming server.
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`InfraConfig`): bind address, queue depth, paths,
//!   external tools, telemetry.
//! - **Video** (`VideoConfig`): the chunk sizes every session is created with.
//!
//! Sessions treat both as opaque and immutable once the server is up.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/reel/config.toml` (system)
//! 2. `~/.config/reel/config.toml` (user)
//! 3. `./reel.toml`, or the path given with `--config`
//! 4. Environment variables (`REEL_*`)
//!
//! # Example Config
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//! max_queue = 3
//!
//! [video]
//! frame_chunk_size = 5
//! audio_chunk_size = 1024
//!
//! [paths]
//! workspace_root = "/tmp"
//!
//! [tools]
//! yt_dlp = "yt-dlp"
//! ffmpeg = "ffmpeg"
//!
//! [telemetry]
//! log_level = "info"
//! log_file = "~/.local/state/reel/server.log"
//! ```

pub mod infra;
pub mod loader;
pub mod playback;

pub use infra::{InfraConfig, PathsConfig, ServerConfig, TelemetryConfig, ToolsConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use playback::VideoConfig;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete reel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReelConfig {
    #[serde(flatten)]
    pub infra: InfraConfig,

    #[serde(default)]
    pub video: VideoConfig,
}

impl ReelConfig {
    /// Load and validate configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load and validate configuration with `config_path` standing in for
    /// `./reel.toml`.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    ///
    /// Not validated: callers layer CLI flags on top and call
    /// [`ReelConfig::validate`] once the result is final.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ReelConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::apply_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Reject values that would make sessions unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.video.frame_chunk_size == 0 {
            return Err(ConfigError::Invalid("video.frame_chunk_size must be at least 1".into()));
        }
        if self.video.audio_chunk_size == 0 {
            return Err(ConfigError::Invalid("video.audio_chunk_size must be at least 1".into()));
        }
        if self.infra.server.max_queue == 0 {
            return Err(ConfigError::Invalid("server.max_queue must be at least 1".into()));
        }
        if self.infra.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.infra.tools.audio_sample_rate == 0 {
            return Err(ConfigError::Invalid("tools.audio_sample_rate must be non-zero".into()));
        }
        Ok(())
    }

    /// Frame queue capacity for a session: `max_queue` chunks worth of frames.
    pub fn frame_queue_capacity(&self) -> usize {
        self.infra.server.max_queue.saturating_mul(self.video.frame_chunk_size)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(self)?;
        Ok(format!("# reel configuration\n\n{}", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ReelConfig::default();
        assert_eq!(config.infra.server.port, 5000);
        assert_eq!(config.video.frame_chunk_size, 5);
        assert_eq!(config.video.audio_chunk_size, 1024);
        assert_eq!(config.frame_queue_capacity(), 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_toml_round_trips_through_loader() {
        let mut config = ReelConfig::default();
        config.infra.server.port = 6123;
        config.video.frame_chunk_size = 7;
        config.infra.telemetry.log_file = Some(PathBuf::from("/tmp/reel.log"));

        let text = config.to_toml().unwrap();
        let mut reloaded = ReelConfig::default();
        loader::apply_toml(&mut reloaded, &text, std::path::Path::new("x.toml")).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_to_toml_escapes_strings() {
        let mut config = ReelConfig::default();
        config.infra.tools.yt_dlp = r"C:\tools\yt-dlp.exe".to_string();
        config.infra.tools.format = r#"best[format_note="tiny"]"#.to_string();
        config.infra.paths.workspace_root = PathBuf::from(r"D:\reel\work");

        let text = config.to_toml().unwrap();
        let mut reloaded = ReelConfig::default();
        loader::apply_toml(&mut reloaded, &text, std::path::Path::new("x.toml")).unwrap();
        assert_eq!(reloaded.infra.tools.yt_dlp, r"C:\tools\yt-dlp.exe");
        assert_eq!(reloaded.infra.tools.format, r#"best[format_note="tiny"]"#);
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[video]\nframe_chunk_size = 12").unwrap();

        let (config, sources) = ReelConfig::load_with_sources_from(Some(&path)).unwrap();
        assert_eq!(config.video.frame_chunk_size, 12);
        assert!(sources.files.contains(&path));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = ReelConfig::default();
        config.video.frame_chunk_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ReelConfig::default();
        config.infra.server.max_queue = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file_with_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        std::fs::write(&path, "[video]\naudio_chunk_size = 0\n").unwrap();

        let err = ReelConfig::load_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("audio_chunk_size"));
    }

    #[test]
    fn test_sources_load_leaves_validation_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portless.toml");
        std::fs::write(&path, "[server]\nport = 0\n").unwrap();

        let (mut config, _sources) = ReelConfig::load_with_sources_from(Some(&path)).unwrap();
        assert!(config.validate().is_err());

        config.infra.server.port = 8080;
        assert!(config.validate().is_ok());
    }
}
