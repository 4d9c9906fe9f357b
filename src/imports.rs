//! Import injection — qualified identifiers in action args
//!
//! Action arguments are opaque Go expressions; the only semantic lift we
//! give them is a scan for `pkg.Name` selectors whose package is in the
//! recognition table, so the shadow imports what the guards reference.
//! Bare identifiers, user packages and already-imported paths inject
//! nothing.

use crate::classify::DirectiveSite;
use crate::probe::{ImportAnchor, ImportInventory};
use std::collections::BTreeSet;

/// Standard-library packages recognised out of the box. The config may
/// extend this set, never shrink it.
pub const BUILTIN_PACKAGES: &[&str] = &[
    "errors", "fmt", "log", "math", "os", "strconv", "strings", "time",
];

/// Packages referenced by the active sites' action args, restricted to the
/// recognition table.
pub fn referenced_packages(sites: &[DirectiveSite], table: &BTreeSet<String>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for site in sites.iter().filter(|s| s.is_active()) {
        for arg in &site.directive.action_args {
            scan_qualified(arg, table, &mut found);
        }
    }
    found
}

/// Scans one expression text for `identifier.Name` selectors, skipping
/// string literals. A candidate package must start at a word boundary and
/// not itself be a selector target (`a.fmt.X` never matches `fmt`).
fn scan_qualified(text: &str, table: &BTreeSet<String>, out: &mut BTreeSet<String>) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'`' {
                    i += 1;
                }
            }
            c if is_ident_start(c) => {
                let word_start = i;
                let preceded = word_start > 0 && {
                    let p = bytes[word_start - 1];
                    p == b'.' || is_ident_char(p)
                };
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
                if !preceded
                    && bytes.get(i) == Some(&b'.')
                    && bytes.get(i + 1).copied().is_some_and(is_ident_start)
                {
                    let ident = &text[word_start..i];
                    if table.contains(ident) {
                        out.insert(ident.to_string());
                    }
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Inserts imports for `needed` packages into the shadow lines, honouring
/// the probe's anchor. Packages already imported are dropped here.
pub fn inject(lines: &mut Vec<String>, needed: &BTreeSet<String>, inventory: &ImportInventory) {
    let missing: Vec<&String> = needed
        .iter()
        .filter(|p| !inventory.paths.contains(p.as_str()))
        .collect();
    if missing.is_empty() {
        return;
    }

    match inventory.anchor {
        ImportAnchor::Group { .. } => {
            // The group's `import (` line survives the rewrite verbatim.
            if let Some(idx) = lines
                .iter()
                .position(|l| l.trim() == "import (" || l.trim_start().starts_with("import ("))
            {
                for (offset, pkg) in missing.iter().enumerate() {
                    lines.insert(idx + 1 + offset, format!("\t\"{pkg}\""));
                }
                return;
            }
            append_single_imports(lines, &missing);
        }
        ImportAnchor::After { .. } | ImportAnchor::Package { .. } => {
            append_single_imports(lines, &missing);
        }
    }
}

/// Adds `import "pkg"` lines after the last existing import, or after the
/// package clause when the file imports nothing.
fn append_single_imports(lines: &mut Vec<String>, missing: &[&String]) {
    let anchor_idx = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("import "))
        .or_else(|| lines.iter().position(|l| l.trim_start().starts_with("package ")));
    let Some(idx) = anchor_idx else { return };
    for (offset, pkg) in missing.iter().enumerate() {
        lines.insert(idx + 1 + offset, format!("import \"{pkg}\""));
    }
}
