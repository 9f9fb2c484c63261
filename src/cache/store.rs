// Allow dead code: store methods beyond what the worker itself drives
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extension of the metadata sidecar written next to each body file
const META_SUFFIX: &str = ".meta.json";

/// Metadata kept alongside each cached asset body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMeta {
    pub url: String,
    pub content_type: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// A cached asset as served by the shell worker
#[derive(Debug, Clone)]
pub struct CachedAsset {
    pub url: String,
    pub content_type: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub body: Vec<u8>,
}

/// One versioned store: a directory named by the cache version tag holding
/// a body file and metadata sidecar per asset URL.
pub struct AssetStore {
    dir: PathBuf,
    version: String,
}

impl AssetStore {
    /// Open (creating if absent) the store for a version tag
    pub fn open(root: &Path, version: &str) -> Result<Self> {
        let dir = root.join(version);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache store {}", version))?;
        Ok(Self {
            dir,
            version: version.to_string(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Filesystem-safe entry name for an asset URL path.
    /// Collisions are resolved at read time by checking the sidecar URL.
    fn entry_name(url_path: &str) -> String {
        url_path
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn body_path(&self, url_path: &str) -> PathBuf {
        self.dir.join(Self::entry_name(url_path))
    }

    fn meta_path(&self, url_path: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", Self::entry_name(url_path), META_SUFFIX))
    }

    /// Store an asset body and its metadata
    pub fn put(&self, url_path: &str, content_type: Option<&str>, body: &[u8]) -> Result<()> {
        let meta = AssetMeta {
            url: url_path.to_string(),
            content_type: content_type.map(|s| s.to_string()),
            fetched_at: Utc::now(),
        };
        std::fs::write(self.body_path(url_path), body)
            .with_context(|| format!("Failed to write cached body for {}", url_path))?;
        std::fs::write(self.meta_path(url_path), serde_json::to_string_pretty(&meta)?)
            .with_context(|| format!("Failed to write cache metadata for {}", url_path))?;
        Ok(())
    }

    /// Look up an asset by URL path
    pub fn get(&self, url_path: &str) -> Result<Option<CachedAsset>> {
        let meta_path = self.meta_path(url_path);
        if !meta_path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read cache metadata for {}", url_path))?;
        let meta: AssetMeta = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache metadata for {}", url_path))?;

        // Sanitized names can collide; the sidecar records the real URL
        if meta.url != url_path {
            return Ok(None);
        }

        let body = std::fs::read(self.body_path(url_path))
            .with_context(|| format!("Failed to read cached body for {}", url_path))?;

        Ok(Some(CachedAsset {
            url: meta.url,
            content_type: meta.content_type,
            fetched_at: meta.fetched_at,
            body,
        }))
    }

    pub fn contains(&self, url_path: &str) -> bool {
        matches!(self.get(url_path), Ok(Some(_)))
    }

    /// Number of cached assets in this store
    pub fn entry_count(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.file_name().to_string_lossy().ends_with(META_SUFFIX))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Enumerate all store versions under a root
    pub fn list_versions(root: &Path) -> Result<Vec<String>> {
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(root).context("Failed to enumerate cache stores")? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Delete an entire versioned store
    pub fn delete_version(root: &Path, version: &str) -> Result<()> {
        let dir = root.join(version);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to delete cache store {}", version))?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let store = AssetStore::open(root.path(), "citas-v2").unwrap();

        store
            .put("/css/citas.css", Some("text/css"), b"body { margin: 0 }")
            .unwrap();

        let asset = store.get("/css/citas.css").unwrap().unwrap();
        assert_eq!(asset.url, "/css/citas.css");
        assert_eq!(asset.content_type.as_deref(), Some("text/css"));
        assert_eq!(asset.body, b"body { margin: 0 }");
        assert!(store.contains("/css/citas.css"));
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let root = tempfile::tempdir().unwrap();
        let store = AssetStore::open(root.path(), "citas-v2").unwrap();
        assert!(store.get("/missing.js").unwrap().is_none());
    }

    #[test]
    fn test_colliding_entry_names_do_not_alias() {
        let root = tempfile::tempdir().unwrap();
        let store = AssetStore::open(root.path(), "citas-v2").unwrap();

        // "/a_b" and "/a/b" sanitize to the same file name
        store.put("/a/b", None, b"slash").unwrap();
        assert!(store.get("/a_b").unwrap().is_none());
    }

    #[test]
    fn test_list_and_delete_versions() {
        let root = tempfile::tempdir().unwrap();
        AssetStore::open(root.path(), "citas-v1").unwrap();
        AssetStore::open(root.path(), "citas-v2").unwrap();

        assert_eq!(
            AssetStore::list_versions(root.path()).unwrap(),
            vec!["citas-v1".to_string(), "citas-v2".to_string()]
        );

        AssetStore::delete_version(root.path(), "citas-v1").unwrap();
        assert_eq!(
            AssetStore::list_versions(root.path()).unwrap(),
            vec!["citas-v2".to_string()]
        );
    }

    #[test]
    fn test_list_versions_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("never-created");
        assert!(AssetStore::list_versions(&nested).unwrap().is_empty());
    }
}
