use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use crate::BlobError;

/// Destination for files published to blob storage.
#[async_trait]
pub trait BlobUpload: Send + Sync {
    /// Upload the local file at `path` under `key`.
    ///
    /// Returns the number of bytes written.
    async fn upload_file(&self, key: &str, path: &Path) -> Result<u64, BlobError>;
}

#[async_trait]
impl<T> BlobUpload for Arc<T>
where
    T: BlobUpload + ?Sized,
{
    async fn upload_file(&self, key: &str, path: &Path) -> Result<u64, BlobError> {
        (**self).upload_file(key, path).await
    }
}
