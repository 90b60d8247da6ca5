//! The single error-wrapping boundary for disk access.
//!
//! Every filesystem call of the crate is awaited through [`file_io`] or
//! [`folder_io`], which re-signal a failed [`std::io::Error`] as
//! [`HiveError::FileIo`] / [`HiveError::FolderIo`] carrying a context message.

use std::{future::Future, path::Path};

use tokio::fs as tokio_fs;
use tracing::error;

use crate::{HiveError, Result};

/// Awaits a file operation, wrapping its failure in [`HiveError::FileIo`].
///
/// `context` is only evaluated when the operation fails.
pub async fn file_io<T, C, F>(context: C, operation: F) -> Result<T>
where
    C: FnOnce() -> String,
    F: Future<Output = std::io::Result<T>>,
{
    operation.await.map_err(|source| {
        let message = context();
        error!("{}: {}", message, source);
        HiveError::FileIo {
            message,
            source,
        }
    })
}

/// Awaits a folder operation, wrapping its failure in [`HiveError::FolderIo`].
pub async fn folder_io<T, C, F>(context: C, operation: F) -> Result<T>
where
    C: FnOnce() -> String,
    F: Future<Output = std::io::Result<T>>,
{
    operation.await.map_err(|source| {
        let message = context();
        error!("{}: {}", message, source);
        HiveError::FolderIo {
            message,
            source,
        }
    })
}

/// Returns true if a file or folder exists at `path`.
///
/// Errors while probing (for example a permission failure on a parent) count as
/// "does not exist"; the following read or write reports the real cause.
pub async fn exists(path: &Path) -> bool { tokio_fs::try_exists(path).await.unwrap_or(false) }

/// Creates `path` and its parents unless it already exists.
pub async fn ensure_folder(path: &Path, context: impl FnOnce() -> String) -> Result<()> {
    if exists(path).await {
        return Ok(());
    }
    folder_io(context, tokio_fs::create_dir_all(path)).await
}
