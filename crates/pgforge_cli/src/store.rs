//! Artifact persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{HandlerError, HandlerResult};

/// Somewhere to put generated artifacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write a new artifact. Fails with [`HandlerError::Collision`] if one
    /// with the same name exists.
    async fn write_new(&self, name: &str, contents: &str) -> HandlerResult<PathBuf>;

    /// Remove an artifact written earlier in the same call.
    async fn remove(&self, name: &str) -> HandlerResult<()>;
}

/// Stores artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write_new(&self, name: &str, contents: &str) -> HandlerResult<PathBuf> {
        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);

        let file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(HandlerError::Collision(path));
            }
            Err(e) => return Err(e.into()),
        };

        fill(&path, file, contents).await?;
        debug!("Wrote {} bytes to {:?}", contents.len(), path);
        Ok(path)
    }

    async fn remove(&self, name: &str) -> HandlerResult<()> {
        fs::remove_file(self.root.join(name)).await?;
        Ok(())
    }
}

/// Write `contents` to a freshly created `path`. A failed write removes the
/// file again so no truncated artifact is left behind.
async fn fill<W>(path: &Path, mut out: W, contents: &str) -> HandlerResult<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        out.write_all(contents.as_bytes()).await?;
        out.flush().await
    }
    .await;
    drop(out);

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path).await {
            warn!("Could not remove partial artifact {:?}: {}", path, cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tempfile::TempDir;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_write_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(tmp.path().join("out").join("nested"));

        let path = store.write_new("main_1.tf", "# hello\n").await.unwrap();

        assert_eq!(path, tmp.path().join("out/nested/main_1.tf"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hello\n");
    }

    #[tokio::test]
    async fn test_existing_file_is_never_overwritten() {
        let tmp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(tmp.path());
        std::fs::write(tmp.path().join("playbook_1.yml"), "original").unwrap();

        let err = store.write_new("playbook_1.yml", "replacement").await.unwrap_err();

        assert!(matches!(err, HandlerError::Collision(_)));
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("playbook_1.yml")).unwrap(),
            "original"
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main_1.tf");
        std::fs::write(&path, "# hel").unwrap();
        let out = Builder::new()
            .write(b"# hel")
            .write_error(io::Error::new(ErrorKind::Other, "disk full"))
            .build();

        let err = fill(&path, out, "# hello\n").await.unwrap_err();

        assert!(matches!(err, HandlerError::Io(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_completed_write_keeps_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main_1.tf");
        std::fs::write(&path, "# hello\n").unwrap();
        let out = Builder::new().write(b"# hello\n").build();

        fill(&path, out, "# hello\n").await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(tmp.path());
        store.write_new("main_1.tf", "x").await.unwrap();

        store.remove("main_1.tf").await.unwrap();
        assert!(!tmp.path().join("main_1.tf").exists());
    }
}
