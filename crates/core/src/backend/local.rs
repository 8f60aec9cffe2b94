use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::debug;

use super::Backend;
use crate::error::{Result, StoreError};

pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root: path.as_ref().to_path_buf(),
        }
    }

    /// Uses `settings["path"]` verbatim as the root. The directory need not exist yet.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        Self::new(settings.get("path").map(String::as_str).unwrap_or_default())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(clean_key(key)?))
    }

    /// Keys of all files under `walk_root`, depth-first in lexical order,
    /// relative to the store root.
    async fn walk(&self, walk_root: &Path) -> Result<Vec<String>> {
        match tokio::fs::metadata(fs_path(walk_root)).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::io(
                    format!("failed to stat: {}", walk_root.display()),
                    e,
                ));
            }
        }

        let mut keys = Vec::new();
        let mut stack = vec![(walk_root.to_path_buf(), true)];

        while let Some((path, is_dir)) = stack.pop() {
            if !is_dir {
                keys.push(self.key_for(&path));
                continue;
            }

            let list_err = |e: std::io::Error| {
                StoreError::io(format!("failed to list: {}", path.display()), e)
            };
            let mut read_dir = tokio::fs::read_dir(fs_path(&path))
                .await
                .map_err(list_err)?;
            let mut entries = Vec::new();
            while let Some(entry) = read_dir.next_entry().await.map_err(list_err)? {
                let file_type = entry.file_type().await.map_err(list_err)?;
                entries.push((path.join(entry.file_name()), file_type.is_dir()));
            }
            entries.sort();
            stack.extend(entries.into_iter().rev());
        }

        Ok(keys)
    }

    fn key_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn store_type(&self) -> &'static str {
        "local"
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let full = self.full_path(key)?;
        tokio::fs::read(fs_path(&full)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::io(format!("failed to read: {}", full.display()), e)
            }
        })
    }

    async fn list(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        // A prefix above the root cannot match anything inside it.
        let Ok(prefix) = clean_key(prefix) else {
            return Ok(Vec::new());
        };
        let test_prefix = self.root.join(&prefix);

        // A directory prefix narrows the walk. Anything else is only a string
        // filter over the whole tree, so "a/rep" still matches "a/report.txt".
        let is_dir = tokio::fs::metadata(fs_path(&test_prefix))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        let walk_root = if is_dir { &test_prefix } else { &self.root };
        debug!(walk_root = %walk_root.display(), prefix = %prefix, suffix, "listing");

        let keys = self
            .walk(walk_root)
            .await?
            .into_iter()
            .filter(|key| key.starts_with(&prefix) && key.ends_with(suffix))
            .collect();
        Ok(keys)
    }

    async fn write(&self, key: &str, content: &mut (dyn AsyncRead + Unpin + Send)) -> Result<()> {
        let clean = clean_key(key)?;
        if clean.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let full = self.root.join(clean);

        if let Some(parent) = full.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::io(format!("failed to create directory: {}", parent.display()), e)
            })?;
        }

        let write_err =
            |e: std::io::Error| StoreError::io(format!("failed to write: {}", full.display()), e);
        let mut file = tokio::fs::File::create(&full).await.map_err(write_err)?;
        tokio::io::copy(content, &mut file).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(())
    }
}

/// Normalize a slash-separated key. `..` may not climb above the root.
fn clean_key(key: &str) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in key.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(StoreError::InvalidKey(key.to_string()));
                }
            }
            part => parts.push(part),
        }
    }
    Ok(parts.join("/"))
}

/// An empty root means the working directory.
fn fs_path(path: &Path) -> &Path {
    if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_str(backend: &LocalBackend, key: &str, content: &str) {
        backend.write(key, &mut content.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn local_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());

        write_str(&backend, "test/hello.txt", "world").await;
        assert_eq!(backend.read("test/hello.txt").await.unwrap(), b"world");

        write_str(&backend, "empty", "").await;
        assert!(backend.read("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_overwrites_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());

        write_str(&backend, "a/b/c/file", "first version").await;
        assert!(dir.path().join("a/b/c").is_dir());

        write_str(&backend, "a/b/c/file", "second").await;
        assert_eq!(backend.read("a/b/c/file").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());

        let err = backend.read("nope/missing.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref key) if key == "nope/missing.txt"));
    }

    #[tokio::test]
    async fn list_matches_partial_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        write_str(&backend, "a/report.txt", "r").await;
        write_str(&backend, "a/other.txt", "o").await;

        assert_eq!(backend.list("a/rep", "").await.unwrap(), vec!["a/report.txt"]);
        assert_eq!(
            backend.list("a", "").await.unwrap(),
            vec!["a/other.txt", "a/report.txt"]
        );
    }

    #[tokio::test]
    async fn list_directory_prefix_walks_only_that_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        write_str(&backend, "dir/file.txt", "1").await;
        write_str(&backend, "dirx/file.txt", "2").await;

        assert_eq!(backend.list("dir", ".txt").await.unwrap(), vec!["dir/file.txt"]);
        assert_eq!(backend.list("dir/", "").await.unwrap(), vec!["dir/file.txt"]);
        assert_eq!(
            backend.list("di", "").await.unwrap(),
            vec!["dir/file.txt", "dirx/file.txt"]
        );
    }

    #[tokio::test]
    async fn list_everything_in_walk_order() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        for key in ["b/2.log", "a.txt", "b/1.txt", "b/c/3.txt", "z.txt"] {
            write_str(&backend, key, key).await;
        }

        assert_eq!(
            backend.list("", "").await.unwrap(),
            vec!["a.txt", "b/1.txt", "b/2.log", "b/c/3.txt", "z.txt"]
        );
        assert_eq!(
            backend.list("", ".txt").await.unwrap(),
            vec!["a.txt", "b/1.txt", "b/c/3.txt", "z.txt"]
        );
        assert!(backend.list("", ".csv").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().join("not-created"));

        assert!(backend.list("", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().join("root"));

        let err = backend
            .write("../outside", &mut b"x".as_slice())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(!dir.path().join("outside").exists());

        write_str(&backend, "a/../b/./c", "ok").await;
        assert_eq!(backend.read("b/c").await.unwrap(), b"ok");
    }

    #[tokio::test]
    async fn list_prefix_above_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().join("root"));
        write_str(&backend, "a.txt", "a").await;

        assert!(backend.list("../nothing", "").await.unwrap().is_empty());
        assert!(backend.list("a/../..", ".txt").await.unwrap().is_empty());
        assert_eq!(backend.list("b/../a", "").await.unwrap(), vec!["a.txt"]);
    }

    #[test]
    fn clean_key_normalizes_segments() {
        assert_eq!(clean_key("").unwrap(), "");
        assert_eq!(clean_key("/a//b/").unwrap(), "a/b");
        assert_eq!(clean_key("./a/../b").unwrap(), "b");
        assert!(clean_key("a/../../b").is_err());
    }

    #[test]
    fn from_settings_takes_path_verbatim() {
        let settings = HashMap::from([("path".to_string(), "/tmp/x".to_string())]);
        let backend = LocalBackend::from_settings(&settings);
        assert_eq!(backend.root(), Path::new("/tmp/x"));
        assert_eq!(backend.store_type(), "local");
    }
}
