//! Offset-based reads over the audio artifact.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Streams fixed-size windows of the audio artifact.
///
/// The file is reopened on every read; the cursor only remembers how far the
/// client has been served. The offset only moves forward and only by bytes
/// actually read, so it can never pass the end of the file.
#[derive(Debug)]
pub struct AudioCursor {
    path: PathBuf,
    offset: u64,
    chunk_size: usize,
}

impl AudioCursor {
    pub fn new(path: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            chunk_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next window. `Ok(None)` means end of stream, and stays that way.
    ///
    /// A missing artifact reads as an empty stream: sources without an audio
    /// track produce no file.
    pub async fn next_window(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let len = file.metadata().await?.len();
        if self.offset >= len {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(self.offset)).await?;

        // read_to_end on a bounded reader fills short reads until the
        // window is full or the file ends
        let mut window = Vec::with_capacity(self.chunk_size);
        file.take(self.chunk_size as u64)
            .read_to_end(&mut window)
            .await?;

        if window.is_empty() {
            return Ok(None);
        }

        self.offset += window.len() as u64;
        Ok(Some(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(len: usize) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.dfpwm");
        let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, bytes).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_windows_cover_file_in_order() {
        let (_dir, path) = artifact(10);
        let mut cursor = AudioCursor::new(&path, 4);

        assert_eq!(cursor.next_window().await.unwrap(), Some(vec![0, 1, 2, 3]));
        assert_eq!(cursor.offset(), 4);
        assert_eq!(cursor.next_window().await.unwrap(), Some(vec![4, 5, 6, 7]));
        assert_eq!(cursor.next_window().await.unwrap(), Some(vec![8, 9]));
        assert_eq!(cursor.offset(), 10);
    }

    #[tokio::test]
    async fn test_end_of_stream_is_idempotent() {
        let (_dir, path) = artifact(3);
        let mut cursor = AudioCursor::new(&path, 8);

        assert_eq!(cursor.next_window().await.unwrap().unwrap().len(), 3);
        for _ in 0..3 {
            assert_eq!(cursor.next_window().await.unwrap(), None);
            assert_eq!(cursor.offset(), 3);
        }
    }

    #[tokio::test]
    async fn test_empty_and_missing_artifacts() {
        let (dir, path) = artifact(0);
        let mut cursor = AudioCursor::new(&path, 8);
        assert_eq!(cursor.next_window().await.unwrap(), None);

        let mut missing = AudioCursor::new(dir.path().join("nope.dfpwm"), 8);
        assert_eq!(missing.next_window().await.unwrap(), None);
        assert_eq!(missing.offset(), 0);
    }

    #[tokio::test]
    async fn test_offset_never_exceeds_length() {
        let (_dir, path) = artifact(1000);
        let mut cursor = AudioCursor::new(&path, 333);
        let mut last = 0;
        while let Some(window) = cursor.next_window().await.unwrap() {
            assert!(window.len() <= 333);
            assert!(cursor.offset() > last);
            last = cursor.offset();
        }
        assert_eq!(cursor.offset(), 1000);
    }

    #[tokio::test]
    async fn test_reading_a_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cursor = AudioCursor::new(dir.path(), 8);
        assert!(cursor.next_window().await.is_err());
    }
}
