//! Engine — walks a project tree and runs the per-file pipeline
//!
//! The engine is the only component that touches the filesystem layout:
//! it discovers annotated files, pipelines each one through probe →
//! classify → rewrite → imports → line map, and aggregates the overlay
//! and manifest via the cache. Source files are never modified.
//!
//! Failure policy follows the reference convention: a file that fails to
//! parse (or read) is reported and left out of the overlay; the run
//! continues with the remaining files. Cache-level failures abort the run.

use crate::cache::{content_hash, Cache, Overlay};
use crate::classify::classify;
use crate::config::GenConfig;
use crate::error::{Error, Result};
use crate::imports;
use crate::linemap;
use crate::probe::probe_source;
use crate::rewrite::rewrite;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A failed file and the rendered reason.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Files transformed into fresh shadows this run.
    pub generated: usize,
    /// Files whose previous shadow was reused via the manifest.
    pub reused: usize,
    /// Files scanned but carrying no directives.
    pub unchanged: usize,
    /// Files that failed; absent from the overlay.
    pub failures: Vec<FileFailure>,
}

impl RunReport {
    /// True when every scanned file was handled.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

enum FileOutcome {
    Generated,
    Reused,
    NoDirectives,
}

/// The core processor: scans Go sources under a root, injects guards into
/// shadow files, and produces the overlay mapping.
pub struct Engine {
    root: PathBuf,
    cache_dir: PathBuf,
    config: GenConfig,
    import_table: BTreeSet<String>,
    generated_suffix: String,
    overlay: Overlay,
}

impl Engine {
    /// Creates an engine rooted at `root`, loading `.inco.yaml` if present.
    pub fn new(root: &Path) -> Result<Self> {
        let config = GenConfig::load_or_default(root)?;
        Self::with_config(root, config)
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(root: &Path, config: GenConfig) -> Result<Self> {
        let root = root.canonicalize()?;
        let cache_dir = root.join(&config.cache_dir);
        let import_table = config.import_table();
        let generated_suffix = config.generated_suffix();
        Ok(Self {
            root,
            cache_dir,
            config,
            import_table,
            generated_suffix,
            overlay: Overlay::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The overlay produced by the last [`run`](Self::run).
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Executes the full pipeline: scan → transform → overlay + manifest.
    pub fn run(&mut self) -> Result<RunReport> {
        self.overlay = Overlay::default();
        let mut cache = Cache::open(&self.cache_dir)?;
        let mut report = RunReport::default();

        for path in self.collect_files()? {
            match self.process_file(&path, &mut cache) {
                Ok(FileOutcome::Generated) => report.generated += 1,
                Ok(FileOutcome::Reused) => report.reused += 1,
                Ok(FileOutcome::NoDirectives) => report.unchanged += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping file");
                    report.failures.push(FileFailure {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        cache.finish(&self.overlay)?;
        debug!(
            generated = report.generated,
            reused = report.reused,
            failed = report.failures.len(),
            "run complete"
        );
        Ok(report)
    }

    /// All candidate source files under the root, sorted for determinism.
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.walk_dir(&self.root, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn walk_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(()), // skip directories we can't read
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            if path.is_dir() {
                if !self.config.is_excluded_dir(&name) {
                    self.walk_dir(&path, files)?;
                }
            } else if self.is_source_file(&name) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn is_source_file(&self, name: &str) -> bool {
        name.ends_with(".go")
            && !name.ends_with("_test.go")
            && !name.ends_with(&self.generated_suffix)
    }

    /// Runs one file through the pipeline. The manifest short-circuits
    /// unchanged sources to their previous shadow without re-parsing.
    fn process_file(&mut self, path: &Path, cache: &mut Cache) -> Result<FileOutcome> {
        let bytes = fs::read(path)?;
        let source_key = path.display().to_string();
        let src_hash = content_hash(&bytes);

        if let Some(shadow) = cache.reusable_shadow(&source_key, &src_hash) {
            debug!(file = %source_key, "manifest hit, reusing shadow");
            self.overlay.insert(source_key.clone(), shadow.clone());
            cache.record(source_key, src_hash, shadow);
            return Ok(FileOutcome::Reused);
        }

        let source = String::from_utf8(bytes).map_err(|_| Error::Parse {
            path: path.to_path_buf(),
            detail: "source is not valid UTF-8".into(),
        })?;

        let probe = probe_source(path, &source)?;
        let sites = classify(&probe, &source);
        if !sites.iter().any(|s| s.is_active()) {
            return Ok(FileOutcome::NoDirectives);
        }

        let mut lines = rewrite(&source, &probe, &sites, path);

        let needed = imports::referenced_packages(&sites, &self.import_table);
        imports::inject(&mut lines, &needed, &probe.imports);

        let orig_lines: Vec<&str> = source.lines().collect();
        let mapped = linemap::inject_line_markers(&lines, &orig_lines, path);

        let mut content = mapped.join("\n");
        if source.ends_with('\n') {
            content.push('\n');
        }

        let (shadow_path, _) = cache.write_shadow(path, &content)?;
        let shadow_key = shadow_path.display().to_string();
        self.overlay.insert(source_key.clone(), shadow_key.clone());
        cache.record(source_key, src_hash, shadow_key);
        Ok(FileOutcome::Generated)
    }
}
