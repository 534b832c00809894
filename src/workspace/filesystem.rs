//! Filesystem capability backed by `tokio::fs`

use crate::core::traits::FileSystem;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn create_dir(&self, path: &Path) -> std::io::Result<()> {
        fs::create_dir(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> std::io::Result<()> {
        fs::remove_dir_all(path).await
    }

    async fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        fs::write(path, contents).await
    }
}
