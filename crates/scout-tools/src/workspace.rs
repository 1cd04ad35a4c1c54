use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use scout_types::{Result, ScoutError};

/// Sandboxed file access that tools and the session controller operate in.
///
/// Every path is resolved against [`root`](Workspace::root); implementations
/// must reject paths that would escape it.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Resolve `path` to an absolute location inside the workspace.
    fn resolve(&self, path: &Path) -> Result<PathBuf>;
    async fn read_file(&self, path: &Path) -> Result<String>;
    /// Write `content`, creating parent directories as needed.
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;
    async fn file_exists(&self, path: &Path) -> Result<bool>;
    async fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn root(&self) -> &Path;
}

/// Workspace rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    /// Create a workspace rooted at `root`. A relative root is taken
    /// relative to the current directory.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        let absolute = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self {
            root: normalize_lexically(&absolute),
        })
    }

    pub fn current_dir() -> std::io::Result<Self> {
        Self::new(std::env::current_dir()?)
    }
}

/// Resolve `path` against `root` and verify the result stays inside it.
///
/// Resolution is lexical: `.` and `..` are folded without touching the
/// filesystem, so the target does not need to exist yet.
pub fn resolve_within(root: &Path, path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let normalized = normalize_lexically(&joined);
    if normalized.starts_with(root) {
        Ok(normalized)
    } else {
        Err(ScoutError::PathEscapesWorkspace {
            path: path.display().to_string(),
        })
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` on a bare root is a no-op, matching OS behavior.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl Workspace for LocalWorkspace {
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        resolve_within(&self.root, path)
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(&resolved).await?)
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(tokio::fs::write(&resolved, content).await?)
    }

    async fn file_exists(&self, path: &Path) -> Result<bool> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&resolved).await?)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::create_dir_all(&resolved).await?)
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
