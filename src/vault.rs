//! Vault access.
//!
//! A vault is a directory tree of Markdown notes. Paths handed to a `Vault`
//! are `/`-separated and relative to the vault root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::VaultError;

/// File store the sync pipeline writes into.
///
/// `create_folder` does not create missing parents; callers go through
/// [`ensure_folder`] for nested paths.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Check whether a folder exists at `path`
    async fn folder_exists(&self, path: &str) -> Result<bool, VaultError>;

    /// Create a single folder (its parent must exist)
    async fn create_folder(&self, path: &str) -> Result<(), VaultError>;

    /// Check whether anything exists at `path`
    async fn file_exists(&self, path: &str) -> Result<bool, VaultError>;

    /// Create a new file; fails if one already exists
    async fn create_file(&self, path: &str, content: &str) -> Result<(), VaultError>;

    /// All folders in the vault, root first as the empty string
    async fn list_folders(&self) -> Result<Vec<String>, VaultError>;
}

/// Create each level of `path` in turn, shallowest first.
///
/// Existing folders are left alone; an empty path (vault root) is a no-op.
pub async fn ensure_folder(vault: &dyn Vault, path: &str) -> Result<(), VaultError> {
    let mut current = String::new();

    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);

        if !vault.folder_exists(&current).await? {
            tracing::debug!("Creating folder {}", current);
            vault.create_folder(&current).await?;
        }
    }

    Ok(())
}

/// Join a folder and a file name into a vault path
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Vault backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    /// Create a vault rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Vault root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault path onto the filesystem, refusing to leave the root
    fn resolve(&self, path: &str) -> Result<PathBuf, VaultError> {
        let mut resolved = self.root.clone();

        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => resolved.push(part),
                _ => return Err(VaultError::InvalidPath(path.to_string())),
            }
        }

        Ok(resolved)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> VaultError {
    VaultError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl Vault for FsVault {
    async fn folder_exists(&self, path: &str) -> Result<bool, VaultError> {
        let full = self.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&full, e)),
        }
    }

    async fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        let full = self.resolve(path)?;
        fs::create_dir(&full).await.map_err(|e| io_err(&full, e))
    }

    async fn file_exists(&self, path: &str) -> Result<bool, VaultError> {
        let full = self.resolve(path)?;
        fs::try_exists(&full).await.map_err(|e| io_err(&full, e))
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let full = self.resolve(path)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    VaultError::AlreadyExists(path.to_string())
                } else {
                    io_err(&full, e)
                }
            })?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| io_err(&full, e))?;
        file.flush().await.map_err(|e| io_err(&full, e))?;

        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<String>, VaultError> {
        let mut folders = Vec::new();
        let mut stack = vec![(self.root.clone(), String::new())];

        while let Some((dir, rel)) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| io_err(&dir, e))?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&dir, e))? {
                let name = entry.file_name().to_string_lossy().to_string();
                // Hidden folders (.obsidian, .voicesync, .git) are not note folders
                if name.starts_with('.') {
                    continue;
                }

                let file_type = entry.file_type().await.map_err(|e| io_err(&entry.path(), e))?;
                if !file_type.is_dir() {
                    continue;
                }

                let child = join_path(&rel, &name);
                folders.push(child.clone());
                stack.push((entry.path(), child));
            }
        }

        folders.sort();
        folders.insert(0, String::new());
        Ok(folders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a.md"), "a.md");
        assert_eq!(join_path("Voice", "a.md"), "Voice/a.md");
        assert_eq!(join_path("/Voice/Notes/", "a.md"), "Voice/Notes/a.md");
    }

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let vault = FsVault::new("/vault");
        assert_eq!(
            vault.resolve("A//B/./c.md").unwrap(),
            PathBuf::from("/vault/A/B/c.md")
        );
        assert!(matches!(
            vault.resolve("A/../../etc"),
            Err(VaultError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_create_folder_and_file() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());

        assert!(!vault.folder_exists("Voice").await.unwrap());
        vault.create_folder("Voice").await.unwrap();
        assert!(vault.folder_exists("Voice").await.unwrap());

        // Parents are not created implicitly
        assert!(vault.create_folder("Missing/Child").await.is_err());

        vault.create_file("Voice/note.md", "# hi").await.unwrap();
        assert!(vault.file_exists("Voice/note.md").await.unwrap());
        let content = tokio::fs::read_to_string(temp.path().join("Voice/note.md"))
            .await
            .unwrap();
        assert_eq!(content, "# hi");
    }

    #[tokio::test]
    async fn test_create_file_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());

        vault.create_file("note.md", "first draft").await.unwrap();
        let err = vault.create_file("note.md", "replacement").await.unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists(_)));

        let content = tokio::fs::read_to_string(temp.path().join("note.md"))
            .await
            .unwrap();
        assert_eq!(content, "first draft");
    }

    #[tokio::test]
    async fn test_ensure_folder_nested() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());

        ensure_folder(&vault, "A/B/C").await.unwrap();
        assert!(temp.path().join("A/B/C").is_dir());

        // Idempotent
        ensure_folder(&vault, "A/B/C").await.unwrap();
        ensure_folder(&vault, "").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_folders() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("Inbox/Voice")).unwrap();
        std::fs::create_dir_all(temp.path().join("Archive")).unwrap();
        std::fs::create_dir_all(temp.path().join(".obsidian/plugins")).unwrap();
        std::fs::write(temp.path().join("Inbox/readme.md"), "x").unwrap();

        let vault = FsVault::new(temp.path());
        let folders = vault.list_folders().await.unwrap();

        assert_eq!(folders, vec!["", "Archive", "Inbox", "Inbox/Voice"]);
    }
}
