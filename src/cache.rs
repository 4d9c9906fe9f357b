//! Shadow cache, overlay map and manifest
//!
//! The cache directory (`.inco_cache/` by default) holds content-addressed
//! shadow files plus two JSON artifacts: the overlay consumed by
//! `go build -overlay`, and the manifest that makes unchanged files skip
//! re-transformation. Both are rewritten whole at the end of every run;
//! the directory is safe to delete at any time.

use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Overlay file name inside the cache directory.
pub const OVERLAY_FILE: &str = "overlay.json";
/// Manifest file name inside the cache directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// The `go build -overlay` JSON format.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Overlay {
    #[serde(rename = "Replace")]
    pub replace: BTreeMap<String, String>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.replace.is_empty()
    }

    pub fn insert(&mut self, source: String, shadow: String) {
        self.replace.insert(source, shadow);
    }
}

/// One manifest entry: pre-transform source hash and the shadow it maps to.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ManifestEntry {
    #[serde(rename = "SrcHash")]
    pub src_hash: String,
    #[serde(rename = "ShadowPath")]
    pub shadow_path: String,
}

/// Incremental-reuse manifest, keyed by absolute source path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    #[serde(rename = "Files", default)]
    pub files: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Loads the manifest from the cache directory, `None` when absent or
    /// unreadable (a corrupt manifest just means a cold cache).
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let data = fs::read(cache_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_slice(&data).ok()
    }

    pub fn save(&self, cache_dir: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(cache_dir.join(MANIFEST_FILE), data)?;
        Ok(())
    }
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Shadow file name: `<base>_<hash12><ext>`.
pub fn shadow_file_name(source_path: &Path, hash: &str) -> String {
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("shadow");
    let ext = source_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("go");
    format!("{}_{}.{}", stem, &hash[..12.min(hash.len())], ext)
}

/// A run's view of the cache directory: the previous manifest for reuse
/// lookups, and the manifest being built for this run.
pub struct Cache {
    dir: PathBuf,
    previous: Manifest,
    current: Manifest,
}

impl Cache {
    /// Creates the cache directory if needed and loads the old manifest.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let previous = Manifest::load(dir).unwrap_or_default();
        Ok(Self {
            dir: dir.to_path_buf(),
            previous,
            current: Manifest::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reusable shadow path for `source`, when the previous run saw the
    /// same source bytes and the shadow still exists on disk.
    pub fn reusable_shadow(&self, source: &str, src_hash: &str) -> Option<String> {
        let entry = self.previous.files.get(source)?;
        if entry.src_hash != src_hash {
            return None;
        }
        if !Path::new(&entry.shadow_path).exists() {
            return None;
        }
        Some(entry.shadow_path.clone())
    }

    /// Records a file's shadow in this run's manifest.
    pub fn record(&mut self, source: String, src_hash: String, shadow_path: String) {
        self.current.files.insert(
            source,
            ManifestEntry {
                src_hash,
                shadow_path,
            },
        );
    }

    /// Writes shadow content into the cache, named by its own hash.
    pub fn write_shadow(&self, source_path: &Path, content: &str) -> Result<(PathBuf, String)> {
        let hash = content_hash(content.as_bytes());
        let name = shadow_file_name(source_path, &hash);
        let path = self.dir.join(name);
        fs::write(&path, content)?;
        Ok((path, hash))
    }

    /// Finishes the run: deletes stale shadows, persists overlay and
    /// manifest. Stale means referenced by the previous manifest but not
    /// by this run's (deleted sources, regenerated shadows).
    pub fn finish(self, overlay: &Overlay) -> Result<()> {
        let live: BTreeSet<&str> = self
            .current
            .files
            .values()
            .map(|e| e.shadow_path.as_str())
            .collect();

        for entry in self.previous.files.values() {
            if !live.contains(entry.shadow_path.as_str()) {
                match fs::remove_file(&entry.shadow_path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let overlay_path = self.dir.join(OVERLAY_FILE);
        if overlay.is_empty() {
            match fs::remove_file(&overlay_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            let data = serde_json::to_vec_pretty(overlay)?;
            fs::write(&overlay_path, data)?;
        }

        self.current.save(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn content_hash_is_stable() {
        let h1 = content_hash(b"package main");
        let h2 = content_hash(b"package main");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, content_hash(b"package other"));
    }

    #[test]
    fn shadow_name_shape() {
        let hash = content_hash(b"x");
        let name = shadow_file_name(Path::new("/p/engine.go"), &hash);
        assert!(name.starts_with("engine_"));
        assert!(name.ends_with(".go"));
        assert_eq!(name.len(), "engine_".len() + 12 + ".go".len());
    }

    #[test]
    fn reuse_requires_matching_hash_and_existing_shadow() {
        let temp = TempDir::new().unwrap();
        let mut cache = Cache::open(temp.path()).unwrap();
        let (shadow, _) = cache
            .write_shadow(Path::new("/p/a.go"), "package main\n")
            .unwrap();
        cache.record(
            "/p/a.go".into(),
            "hash1".into(),
            shadow.display().to_string(),
        );
        cache.finish(&Overlay::default()).unwrap();

        let cache = Cache::open(temp.path()).unwrap();
        assert!(cache.reusable_shadow("/p/a.go", "hash1").is_some());
        assert!(cache.reusable_shadow("/p/a.go", "hash2").is_none());
        assert!(cache.reusable_shadow("/p/b.go", "hash1").is_none());
    }

    #[test]
    fn finish_removes_stale_shadows() {
        let temp = TempDir::new().unwrap();
        let mut cache = Cache::open(temp.path()).unwrap();
        let (shadow, _) = cache
            .write_shadow(Path::new("/p/a.go"), "package main\n")
            .unwrap();
        cache.record(
            "/p/a.go".into(),
            "hash1".into(),
            shadow.display().to_string(),
        );
        cache.finish(&Overlay::default()).unwrap();
        assert!(shadow.exists());

        // Next run never sees a.go; its shadow must go away.
        let cache = Cache::open(temp.path()).unwrap();
        cache.finish(&Overlay::default()).unwrap();
        assert!(!shadow.exists());
    }

    #[test]
    fn overlay_file_written_and_removed() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();
        let mut overlay = Overlay::default();
        overlay.insert("/p/a.go".into(), "/c/a_abc.go".into());
        cache.finish(&overlay).unwrap();

        let overlay_path = temp.path().join(OVERLAY_FILE);
        let data = std::fs::read_to_string(&overlay_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed["Replace"]["/p/a.go"], "/c/a_abc.go");

        // Empty overlay on the next run removes the file.
        let cache = Cache::open(temp.path()).unwrap();
        cache.finish(&Overlay::default()).unwrap();
        assert!(!overlay_path.exists());
    }

    #[test]
    fn manifest_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut manifest = Manifest::default();
        manifest.files.insert(
            "/p/a.go".into(),
            ManifestEntry {
                src_hash: "h".into(),
                shadow_path: "/c/a_x.go".into(),
            },
        );
        manifest.save(temp.path()).unwrap();

        let loaded = Manifest::load(temp.path()).unwrap();
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.files["/p/a.go"].src_hash, "h");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap())
                .unwrap();
        assert!(raw["Files"]["/p/a.go"]["SrcHash"].is_string());
        assert!(raw["Files"]["/p/a.go"]["ShadowPath"].is_string());
    }
}
