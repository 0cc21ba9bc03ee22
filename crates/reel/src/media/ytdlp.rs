//! Source download through yt-dlp.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use super::process::run_tool;
use super::{Fetcher, MediaError};

/// File name of the merged download inside the destination directory.
pub const VIDEO_FILE: &str = "video.mp4";

/// Downloads with the `yt-dlp` command line tool.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: String,
    format: String,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            format: format.into(),
        }
    }

    fn args(&self, url: &str, output: &Path) -> Vec<String> {
        vec![
            "--quiet".to_string(),
            "--no-playlist".to_string(),
            "--format".to_string(),
            self.format.clone(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--output".to_string(),
            output.display().to_string(),
            // A URL starting with '-' must not be read as an option
            "--".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, MediaError> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| MediaError::io(dest_dir, e))?;

        let output = dest_dir.join(VIDEO_FILE);
        run_tool(&self.program, self.args(url, &output)).await?;

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(MediaError::NoOutput {
                program: self.program.clone(),
                what: "video file",
            });
        }

        info!(url, path = %output.display(), "Download complete");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_end_with_separator_and_url() {
        let fetcher = YtDlpFetcher::new("yt-dlp", "worst");
        let args = fetcher.args("-rf", Path::new("/w/media/video.mp4"));

        assert_eq!(&args[args.len() - 2..], ["--", "-rf"]);
        let format = args.iter().position(|a| a == "--format").unwrap();
        assert_eq!(args[format + 1], "worst");
        assert!(args.contains(&"/w/media/video.mp4".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_that_writes_nothing_is_no_output() {
        let dir = tempfile::tempdir().unwrap();
        // `true` ignores its arguments and exits 0 without writing a file
        let fetcher = YtDlpFetcher::new("true", "worst");

        let err = fetcher
            .fetch("https://example.invalid/v", &dir.path().join("media"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoOutput { .. }));
        assert!(dir.path().join("media").is_dir());
    }
}
