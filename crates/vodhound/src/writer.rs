//! Chapter file output.

use std::path::Path;

use async_trait::async_trait;

/// Destination for rendered chapter text. A trait so tests can capture
/// writes without touching the filesystem.
#[async_trait]
pub trait ChapterWriter: Send + Sync {
    async fn write(&self, path: &Path, text: &str) -> std::io::Result<()>;
}

/// Writes chapter files under the recording tree, creating parent
/// directories as needed.
pub struct FsChapterWriter;

#[async_trait]
impl ChapterWriter for FsChapterWriter {
    async fn write(&self, path: &Path, text: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, text).await
    }
}
