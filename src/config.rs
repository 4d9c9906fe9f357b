//! Project configuration
//!
//! An optional `.inco.yaml` at the project root tunes the generator; every
//! field has a default matching the reference behaviour, so most projects
//! carry no config file at all.

use crate::error::{Error, Result};
use crate::imports::BUILTIN_PACKAGES;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Config file name at the project root.
pub const CONFIG_FILE: &str = ".inco.yaml";

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenConfig {
    /// Cache directory name under the project root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Release tag; files ending `_<tag>.go` are skipped by the scanner.
    #[serde(default = "default_release_tag")]
    pub release_tag: String,

    /// Extra packages the import injector recognises, on top of the
    /// built-in standard-library table.
    #[serde(default)]
    pub import_packages: Vec<String>,

    /// Extra directory names to exclude from the walk (hidden dirs,
    /// `vendor` and `testdata` are always excluded).
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
}

fn default_cache_dir() -> String {
    ".inco_cache".to_string()
}

fn default_release_tag() -> String {
    "inco".to_string()
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            release_tag: default_release_tag(),
            import_packages: Vec::new(),
            exclude_dirs: Vec::new(),
        }
    }
}

impl GenConfig {
    /// Loads `.inco.yaml` from the project root, `None` when absent.
    pub fn load_from_dir(root: &Path) -> Result<Option<Self>> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let config = serde_norway::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Some(config))
    }

    /// Loads the config or falls back to defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        Ok(Self::load_from_dir(root)?.unwrap_or_default())
    }

    /// The import-recognition table: built-ins plus configured extras.
    pub fn import_table(&self) -> BTreeSet<String> {
        BUILTIN_PACKAGES
            .iter()
            .map(|s| s.to_string())
            .chain(self.import_packages.iter().cloned())
            .collect()
    }

    /// True when a directory with this name is skipped by the walk.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        name.starts_with('.')
            || name == "vendor"
            || name == "testdata"
            || name == self.cache_dir
            || self.exclude_dirs.iter().any(|d| d == name)
    }

    /// Suffix of generated release files, skipped by the scanner.
    pub fn generated_suffix(&self) -> String {
        format!("_{}.go", self.release_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = GenConfig::default();
        assert_eq!(config.cache_dir, ".inco_cache");
        assert_eq!(config.generated_suffix(), "_inco.go");
        assert!(config.import_table().contains("fmt"));
        assert!(config.import_table().contains("errors"));
    }

    #[test]
    fn excluded_dirs() {
        let config = GenConfig::default();
        assert!(config.is_excluded_dir(".git"));
        assert!(config.is_excluded_dir("vendor"));
        assert!(config.is_excluded_dir("testdata"));
        assert!(config.is_excluded_dir(".inco_cache"));
        assert!(!config.is_excluded_dir("internal"));
    }

    #[test]
    fn load_from_yaml() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "release_tag: contracts\nimport_packages:\n  - slices\nexclude_dirs:\n  - third_party\n",
        )
        .unwrap();

        let config = GenConfig::load_or_default(temp.path()).unwrap();
        assert_eq!(config.generated_suffix(), "_contracts.go");
        assert!(config.import_table().contains("slices"));
        assert!(config.import_table().contains("fmt"));
        assert!(config.is_excluded_dir("third_party"));
        // Defaults still apply to unset fields.
        assert_eq!(config.cache_dir, ".inco_cache");
    }

    #[test]
    fn missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        assert!(GenConfig::load_from_dir(temp.path()).unwrap().is_none());
        let config = GenConfig::load_or_default(temp.path()).unwrap();
        assert_eq!(config.release_tag, "inco");
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "release_tag: [oops").unwrap();
        let err = GenConfig::load_from_dir(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
