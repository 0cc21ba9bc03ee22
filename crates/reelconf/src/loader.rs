//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, ReelConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/reel/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("reel/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("reel.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and overlay every key it sets onto `config`.
pub fn apply_file(config: &mut ReelConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Overlay keys from a TOML document. Keys absent from the document keep
/// whatever value `config` already holds, so files layer naturally.
pub(crate) fn apply_toml(
    config: &mut ReelConfig,
    contents: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(server) = table.get("server").and_then(|v| v.as_table()) {
        if let Some(v) = server.get("host").and_then(|v| v.as_str()) {
            config.infra.server.host = v.to_string();
        }
        if let Some(v) = server.get("port").and_then(|v| v.as_integer()) {
            config.infra.server.port = integer_field(path, "server.port", v)?;
        }
        if let Some(v) = server.get("max_queue").and_then(|v| v.as_integer()) {
            config.infra.server.max_queue = integer_field(path, "server.max_queue", v)?;
        }
    }

    if let Some(video) = table.get("video").and_then(|v| v.as_table()) {
        if let Some(v) = video.get("frame_chunk_size").and_then(|v| v.as_integer()) {
            config.video.frame_chunk_size = integer_field(path, "video.frame_chunk_size", v)?;
        }
        if let Some(v) = video.get("audio_chunk_size").and_then(|v| v.as_integer()) {
            config.video.audio_chunk_size = integer_field(path, "video.audio_chunk_size", v)?;
        }
    }

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("workspace_root").and_then(|v| v.as_str()) {
            config.infra.paths.workspace_root = expand_path(v);
        }
    }

    if let Some(tools) = table.get("tools").and_then(|v| v.as_table()) {
        if let Some(v) = tools.get("yt_dlp").and_then(|v| v.as_str()) {
            config.infra.tools.yt_dlp = v.to_string();
        }
        if let Some(v) = tools.get("ffmpeg").and_then(|v| v.as_str()) {
            config.infra.tools.ffmpeg = v.to_string();
        }
        if let Some(v) = tools.get("format").and_then(|v| v.as_str()) {
            config.infra.tools.format = v.to_string();
        }
        if let Some(v) = tools.get("audio_sample_rate").and_then(|v| v.as_integer()) {
            config.infra.tools.audio_sample_rate =
                integer_field(path, "tools.audio_sample_rate", v)?;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.infra.telemetry.log_level = v.to_string();
        }
        if let Some(v) = telemetry.get("log_file").and_then(|v| v.as_str()) {
            config.infra.telemetry.log_file = Some(expand_path(v));
        }
        if let Some(v) = telemetry.get("otlp_endpoint").and_then(|v| v.as_str()) {
            config.infra.telemetry.otlp_endpoint = Some(v.to_string());
        }
    }

    Ok(())
}

fn integer_field<T: TryFrom<i64>>(path: &Path, key: &str, value: i64) -> Result<T, ConfigError> {
    T::try_from(value).map_err(|_| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{} is out of range: {}", key, value),
    })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ReelConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("REEL_HOST") {
        config.infra.server.host = v;
        sources.env_overrides.push("REEL_HOST".to_string());
    }
    if let Ok(v) = env::var("REEL_PORT") {
        if let Ok(port) = v.parse() {
            config.infra.server.port = port;
            sources.env_overrides.push("REEL_PORT".to_string());
        }
    }
    if let Ok(v) = env::var("REEL_MAX_QUEUE") {
        if let Ok(depth) = v.parse() {
            config.infra.server.max_queue = depth;
            sources.env_overrides.push("REEL_MAX_QUEUE".to_string());
        }
    }
    if let Ok(v) = env::var("REEL_FRAME_CHUNK_SIZE") {
        if let Ok(size) = v.parse() {
            config.video.frame_chunk_size = size;
            sources.env_overrides.push("REEL_FRAME_CHUNK_SIZE".to_string());
        }
    }
    if let Ok(v) = env::var("REEL_AUDIO_CHUNK_SIZE") {
        if let Ok(size) = v.parse() {
            config.video.audio_chunk_size = size;
            sources.env_overrides.push("REEL_AUDIO_CHUNK_SIZE".to_string());
        }
    }
    if let Ok(v) = env::var("REEL_WORKSPACE_ROOT") {
        config.infra.paths.workspace_root = expand_path(&v);
        sources.env_overrides.push("REEL_WORKSPACE_ROOT".to_string());
    }
    if let Ok(v) = env::var("REEL_YT_DLP") {
        config.infra.tools.yt_dlp = v;
        sources.env_overrides.push("REEL_YT_DLP".to_string());
    }
    if let Ok(v) = env::var("REEL_FFMPEG") {
        config.infra.tools.ffmpeg = v;
        sources.env_overrides.push("REEL_FFMPEG".to_string());
    }
    if let Ok(v) = env::var("REEL_LOG_FILE") {
        config.infra.telemetry.log_file = Some(expand_path(&v));
        sources.env_overrides.push("REEL_LOG_FILE".to_string());
    }
    if let Ok(v) = env::var("REEL_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = Some(v);
        sources.env_overrides.push("REEL_OTLP_ENDPOINT".to_string());
    }
    // Also support the standard OTEL env var
    if let Ok(v) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = Some(v);
        sources.env_overrides.push("OTEL_EXPORTER_OTLP_ENDPOINT".to_string());
    }
    if let Ok(v) = env::var("REEL_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("REEL_LOG_LEVEL".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
