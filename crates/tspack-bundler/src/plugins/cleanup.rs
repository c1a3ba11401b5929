//! Output directory purge.

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Remove every entry inside `out_dir`, keeping the directory itself.
///
/// Creates the directory when it does not exist yet. Returns the number of
/// entries removed.
///
/// # Errors
///
/// Fails when `out_dir` exists but is not a directory, or when an entry
/// cannot be removed.
pub async fn purge_output_dir(out_dir: &Path) -> io::Result<usize> {
    match fs::metadata(out_dir).await {
        Ok(meta) if !meta.is_dir() => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Output path exists but is not a directory: {}",
                    out_dir.display()
                ),
            ));
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(out_dir).await?;
            return Ok(0);
        }
        Err(err) => return Err(err),
    }

    let mut removed = 0;
    let mut entries = fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        removed += 1;
    }

    debug!(dir = %out_dir.display(), removed, "purged output directory");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_purge_removes_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");
        std::fs::create_dir_all(out.join("nested")).unwrap();
        std::fs::write(out.join("stale.js"), "old").unwrap();
        std::fs::write(out.join("nested/chunk.js"), "old").unwrap();

        let removed = purge_output_dir(&out).await.unwrap();
        assert_eq!(removed, 2);
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_purge_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("fresh/dist");

        let removed = purge_output_dir(&out).await.unwrap();
        assert_eq!(removed, 0);
        assert!(out.is_dir());
    }

    #[tokio::test]
    async fn test_purge_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");
        std::fs::write(&out, "not a dir").unwrap();

        let err = purge_output_dir(&out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
