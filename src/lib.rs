// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # inco — contract directives for Go, compiled on the side
//!
//! inco turns annotated comments into runtime guards without touching the
//! source on disk. Developers write directives in plain comments:
//!
//! ```go
//! func Greet(name string) {
//!     // @inco: len(name) > 0
//!     fmt.Println(name)
//! }
//! ```
//!
//! A run scans the project tree, parses each annotated file, injects the
//! guard `if !(len(name) > 0) { panic(…) }` into a *shadow* copy under
//! `.inco_cache/`, and emits an overlay map for `go build -overlay` so the
//! toolchain compiles the shadows in place of the originals. `//line`
//! markers keep diagnostics pointing at the developer's file and line.
//!
//! ## Directive syntax
//!
//! ```text
//! // @inco: <expression>[, -<action>[(args…)]]
//! ```
//!
//! The expression is an arbitrary Go boolean expression, passed through
//! verbatim; the guard fires when its negation holds. Actions:
//!
//! | action | effect |
//! |--------|--------|
//! | `-panic` (default) | panic with an auto-generated or custom message |
//! | `-return(args…)` | return from the enclosing function |
//! | `-continue` / `-break` | loop control in the innermost loop |
//! | `-log(args…)` | report via `log.Println` and fall through |
//!
//! A directive on its own comment line is *standalone*: its guard takes the
//! line's place. A directive trailing a statement is *inline*: its guard
//! follows the statement. Comments anywhere else (struct fields, top-level
//! docs) are ignored.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use inco::Engine;
//!
//! let mut engine = Engine::new(Path::new("."))?;
//! let report = engine.run()?;
//! if !report.success() {
//!     for failure in &report.failures {
//!         eprintln!("inco: {}: {}", failure.path.display(), failure.reason);
//!     }
//! }
//! // .inco_cache/overlay.json is now ready for `go build -overlay`.
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! walk ──► probe (tree-sitter) ──► parse directives ──► classify
//!      ──► synthesise guards ──► rewrite shadow body ──► inject imports
//!      ──► //line markers ──► content-hash ──► cache + overlay + manifest
//! ```
//!
//! Unchanged sources (by SHA-256) skip the pipeline entirely and reuse
//! their previous shadow; shadows of deleted sources are cleaned up at the
//! end of every run. The cache directory is disposable.

// Core pipeline
pub mod classify;
pub mod directive;
pub mod guard;
pub mod imports;
pub mod linemap;
pub mod probe;
pub mod rewrite;

// Infrastructure
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;

// Re-exports
pub use cache::{content_hash, shadow_file_name, Manifest, ManifestEntry, Overlay};
pub use classify::{classify, DirectiveSite, Role};
pub use config::GenConfig;
pub use directive::{is_directive_comment_line, parse_directive, Action, Directive};
pub use engine::{Engine, FileFailure, RunReport};
pub use error::{Error, Result};
pub use guard::synthesize;
pub use probe::{probe_source, Container, ImportAnchor, Probe};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
