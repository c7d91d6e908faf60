use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::{BlobError, BlobUpload};

/// Upload every file below `basedir`, keyed by its path relative to `basedir` under `base_key`.
///
/// Directories listed in `exclusions` (relative to `basedir`) are skipped together with their
/// contents. Returns the keys that were written, in walk order.
pub async fn bulk_upload<U>(
    uploader: &U,
    basedir: &Path,
    base_key: &str,
    exclusions: &[&str],
) -> Result<Vec<String>, BlobError>
where
    U: BlobUpload + ?Sized,
{
    let excluded: Vec<_> = exclusions.iter().map(|e| basedir.join(e)).collect();
    let base_key = base_key.trim_matches('/');

    let mut keys = Vec::new();
    let walker = WalkDir::new(basedir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !excluded.iter().any(|ex| entry.path().starts_with(ex)));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(basedir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let key = if base_key.is_empty() {
            relative
        } else {
            format!("{base_key}/{relative}")
        };

        uploader.upload_file(&key, entry.path()).await?;
        debug!(key = %key, "uploaded");
        keys.push(key);
    }
    Ok(keys)
}
