pub mod disk;

use bytes::Bytes;

use crate::core::error::StorageError;
use crate::core::types::StoredVideo;

// ---------------------------------------------------------------------------
// VideoSlot trait
// ---------------------------------------------------------------------------

/// A single-slot video store.
///
/// The slot holds at most one video. `put` replaces whatever is there
/// (last writer wins, no history) and `get` returns the current contents,
/// or `None` when nothing has been uploaded yet. Nothing here knows about
/// HTTP.
pub trait VideoSlot: Send + Sync {
    /// Replace the slot contents with `data`.
    fn put(
        &self,
        data: Bytes,
    ) -> impl std::future::Future<Output = Result<StoredVideo, StorageError>> + Send;

    /// Read the full slot contents.
    fn get(&self) -> impl std::future::Future<Output = Result<Option<Bytes>, StorageError>> + Send;

    /// Describe the stored video without reading its body.
    fn stat(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<StoredVideo>, StorageError>> + Send;
}
