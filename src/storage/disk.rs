use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::StorageError;
use crate::core::types::StoredVideo;

use super::VideoSlot;

// ---------------------------------------------------------------------------
// DiskVideoSlot
// ---------------------------------------------------------------------------

/// Latest slot backed by one file on local disk (`<dir>/<file_name>`).
///
/// Writes go to a uniquely named `.part` file in the same directory and are
/// renamed over the slot on commit. A rejected or interrupted upload never
/// touches the stored video, and readers see either the old file or the new
/// one. Concurrent uploads are not serialized: the last rename wins.
#[derive(Debug, Clone)]
pub struct DiskVideoSlot {
    dir: PathBuf,
    path: PathBuf,
    file_name: String,
}

impl DiskVideoSlot {
    pub fn new(dir: impl Into<PathBuf>, file_name: &str) -> Result<Self, StorageError> {
        if file_name.is_empty() || file_name.contains('/') || file_name.contains('\\') {
            return Err(StorageError::InvalidSlot {
                reason: format!("'{}' is not a plain file name", file_name),
            });
        }
        let dir = dir.into();
        let path = dir.join(file_name);
        Ok(Self {
            dir,
            path,
            file_name: file_name.to_string(),
        })
    }

    /// Create the slot directory (recursively). Called once at startup.
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        debug!(dir = %self.dir.display(), "upload directory ready");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a streamed replacement of the slot.
    pub async fn begin_write(&self) -> Result<SlotWriter, StorageError> {
        let temp_path = self
            .dir
            .join(format!(".{}.{}.part", self.file_name, Uuid::new_v4()));
        let file = File::create(&temp_path).await?;
        Ok(SlotWriter {
            file: Some(BufWriter::new(file)),
            temp_path,
            final_path: self.path.clone(),
            written: 0,
            finished: false,
        })
    }

    /// Open the stored video for streaming. `None` when the slot is empty.
    pub async fn open(&self) -> Result<Option<(File, StoredVideo)>, StorageError> {
        let file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata().await?;
        Ok(Some((
            file,
            StoredVideo {
                path: self.path.clone(),
                size_bytes: meta.len(),
            },
        )))
    }
}

impl VideoSlot for DiskVideoSlot {
    async fn put(&self, data: Bytes) -> Result<StoredVideo, StorageError> {
        let mut writer = self.begin_write().await?;
        writer.write_chunk(&data).await?;
        writer.commit().await
    }

    async fn get(&self) -> Result<Option<Bytes>, StorageError> {
        match fs::read(&self.path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn stat(&self) -> Result<Option<StoredVideo>, StorageError> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(Some(StoredVideo {
                path: self.path.clone(),
                size_bytes: meta.len(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// SlotWriter
// ---------------------------------------------------------------------------

/// In-progress replacement of a [`DiskVideoSlot`].
///
/// Dropping a writer without `commit` removes its temp file.
pub struct SlotWriter {
    file: Option<BufWriter<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
    finished: bool,
}

impl SlotWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let file = self.file.as_mut().ok_or_else(|| StorageError::InvalidSlot {
            reason: "writer already closed".to_string(),
        })?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush the temp file and move it over the slot.
    pub async fn commit(mut self) -> Result<StoredVideo, StorageError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.into_inner().sync_all().await?;
        }
        fs::rename(&self.temp_path, &self.final_path).await?;
        self.finished = true;
        Ok(StoredVideo {
            path: self.final_path.clone(),
            size_bytes: self.written,
        })
    }

    /// Discard the write, leaving the slot untouched.
    pub async fn abort(mut self) {
        self.file.take();
        if let Err(e) = fs::remove_file(&self.temp_path).await {
            warn!(path = %self.temp_path.display(), error = %e, "failed to remove partial upload");
        }
        self.finished = true;
    }
}

impl Drop for SlotWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.file.take();
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_in(dir: &tempfile::TempDir) -> DiskVideoSlot {
        DiskVideoSlot::new(dir.path().join("uploads"), "latest.mp4").unwrap()
    }

    fn part_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count()
    }

    #[test]
    fn test_rejects_non_plain_file_name() {
        assert!(DiskVideoSlot::new("uploads", "a/b.mp4").is_err());
        assert!(DiskVideoSlot::new("uploads", "").is_err());
    }

    #[tokio::test]
    async fn test_init_creates_directory_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = DiskVideoSlot::new(tmp.path().join("a/b/uploads"), "latest.mp4").unwrap();
        slot.init().await.unwrap();
        assert!(slot.dir().is_dir());
        // Idempotent.
        slot.init().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = slot_in(&tmp);
        slot.init().await.unwrap();

        assert!(slot.get().await.unwrap().is_none());
        assert!(slot.stat().await.unwrap().is_none());
        assert!(slot.open().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = slot_in(&tmp);
        slot.init().await.unwrap();

        let stored = slot.put(Bytes::from_static(b"0123456789")).await.unwrap();
        assert_eq!(stored.size_bytes, 10);
        assert_eq!(stored.file_name(), "latest.mp4");

        let data = slot.get().await.unwrap().unwrap();
        assert_eq!(data.as_ref(), b"0123456789");
        assert_eq!(slot.stat().await.unwrap().unwrap().size_bytes, 10);
    }

    #[tokio::test]
    async fn test_put_overwrites_previous() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = slot_in(&tmp);
        slot.init().await.unwrap();

        slot.put(Bytes::from_static(b"first video, longer")).await.unwrap();
        slot.put(Bytes::from_static(b"second")).await.unwrap();

        let data = slot.get().await.unwrap().unwrap();
        assert_eq!(data.as_ref(), b"second");
        assert_eq!(part_files(slot.dir()), 0);
    }

    #[tokio::test]
    async fn test_aborted_write_leaves_slot_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = slot_in(&tmp);
        slot.init().await.unwrap();
        slot.put(Bytes::from_static(b"original")).await.unwrap();

        let mut writer = slot.begin_write().await.unwrap();
        writer.write_chunk(b"partial").await.unwrap();
        assert_eq!(writer.bytes_written(), 7);
        writer.abort().await;

        assert_eq!(slot.get().await.unwrap().unwrap().as_ref(), b"original");
        assert_eq!(part_files(slot.dir()), 0);
    }

    #[tokio::test]
    async fn test_dropped_writer_removes_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = slot_in(&tmp);
        slot.init().await.unwrap();

        {
            let mut writer = slot.begin_write().await.unwrap();
            writer.write_chunk(b"abandoned").await.unwrap();
        }

        assert_eq!(part_files(slot.dir()), 0);
        assert!(slot.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_reports_size() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = slot_in(&tmp);
        slot.init().await.unwrap();
        slot.put(Bytes::from(vec![7u8; 4096])).await.unwrap();

        let (_file, video) = slot.open().await.unwrap().unwrap();
        assert_eq!(video.size_bytes, 4096);
        assert_eq!(video.path, slot.path());
    }
}
