//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network bind settings and per-connection queue depth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address to bind the WebSocket listener to.
    /// Default: 0.0.0.0
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,

    /// Port for the WebSocket listener and health endpoint.
    /// Default: 5000
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,

    /// Frame queue depth, counted in frame chunks.
    /// Default: 3
    #[serde(default = "ServerConfig::default_max_queue")]
    pub max_queue: usize,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        5000
    }

    fn default_max_queue() -> usize {
        3
    }

    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            max_queue: Self::default_max_queue(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Parent directory for per-session workspaces.
    /// Default: the system temp dir
    #[serde(default = "PathsConfig::default_workspace_root")]
    pub workspace_root: PathBuf,
}

impl PathsConfig {
    fn default_workspace_root() -> PathBuf {
        std::env::temp_dir()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            workspace_root: Self::default_workspace_root(),
        }
    }
}

/// External programs used to acquire and transcode media.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// yt-dlp executable.
    #[serde(default = "ToolsConfig::default_yt_dlp")]
    pub yt_dlp: String,

    /// ffmpeg executable.
    #[serde(default = "ToolsConfig::default_ffmpeg")]
    pub ffmpeg: String,

    /// yt-dlp format selector. The client renders at a few dozen
    /// characters wide, so the smallest streams are plenty.
    #[serde(default = "ToolsConfig::default_format")]
    pub format: String,

    /// Sample rate for the DFPWM audio artifact.
    /// Default: 48000
    #[serde(default = "ToolsConfig::default_audio_sample_rate")]
    pub audio_sample_rate: u32,
}

impl ToolsConfig {
    fn default_yt_dlp() -> String {
        "yt-dlp".to_string()
    }

    fn default_ffmpeg() -> String {
        "ffmpeg".to_string()
    }

    fn default_format() -> String {
        "worstvideo[ext=mp4]+worstaudio[ext=m4a]/worst[ext=mp4]/worst".to_string()
    }

    fn default_audio_sample_rate() -> u32 {
        48000
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: Self::default_yt_dlp(),
            ffmpeg: Self::default_ffmpeg(),
            format: Self::default_format(),
            audio_sample_rate: Self::default_audio_sample_rate(),
        }
    }
}

/// Logging and observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,

    /// Append logs to this file in addition to stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// OTLP gRPC endpoint. Export is disabled when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            log_file: None,
            otlp_endpoint: None,
        }
    }
}

/// All infrastructure configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InfraConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
