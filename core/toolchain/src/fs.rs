//! Filesystem access.
//!
//! The core only needs a handful of filesystem operations. They sit behind
//! the [`Filesystem`] trait so discovery, the legacy config fallback and the
//! post-install step can be tested against an in-memory tree.

use std::io;
use std::path::Path;

use async_trait::async_trait;

/// Minimal async filesystem interface.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Returns whether `path` exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Reads a UTF-8 file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, `NotFound` when the file is missing.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Lists the entry names of a directory, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, `NotFound` when the directory is missing.
    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Sets mode `0755` on a file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    async fn set_executable(&self, path: &Path) -> io::Result<()>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    async fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`Filesystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn set_executable(&self, path: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
        }

        #[cfg(not(unix))]
        {
            tokio::fs::metadata(path).await.map(|_| ())
        }
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
