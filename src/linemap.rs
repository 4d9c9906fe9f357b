//! Line-origin reconciliation — `//line` markers for shadows
//!
//! After the rewrite, shadow lines are a mix of original lines (verbatim),
//! injected guard lines, and stripped-comment residue. A two-cursor walk
//! over shadow and original lines keeps diagnostics pointing at the
//! developer's file: whenever the streams fall out of step, the first
//! re-synchronised original line is preceded by a `//line <file>:<n>`
//! marker, which Go requires to start at column 1.
//!
//! Both cursors only move forward; cost is linear in the longer stream.

use crate::directive;
use std::path::Path;

/// Interleaves `//line` markers into the shadow lines so that every line
/// with an original counterpart reports its original position.
pub fn inject_line_markers(
    shadow_lines: &[String],
    orig_lines: &[&str],
    abs_source: &Path,
) -> Vec<String> {
    let mut out = Vec::with_capacity(shadow_lines.len());
    let mut orig_idx = 0;
    let mut resync_pending = false;

    for shadow in shadow_lines {
        let s = shadow.trim();
        let mut matched = false;

        while orig_idx < orig_lines.len() {
            let o = orig_lines[orig_idx].trim();

            if s == o {
                if resync_pending {
                    out.push(marker(abs_source, orig_idx + 1));
                    resync_pending = false;
                }
                out.push(shadow.clone());
                orig_idx += 1;
                matched = true;
                break;
            }

            // An original line whose trailing comment the rewrite removed
            // still corresponds 1:1; re-anchor only if already adrift.
            if let Some(stripped) = directive::strip_line_comments(o) {
                if !s.is_empty() && stripped.trim() == s {
                    if resync_pending {
                        out.push(marker(abs_source, orig_idx + 1));
                        resync_pending = false;
                    }
                    out.push(shadow.clone());
                    orig_idx += 1;
                    matched = true;
                    break;
                }
            }

            // A whole-line comment the rewrite stripped (directive or
            // decorative): step the original cursor past it and retry.
            // The deletion shifts subsequent lines, so a re-anchor is due.
            if directive::is_comment_line(o) {
                orig_idx += 1;
                resync_pending = true;
                continue;
            }

            break;
        }

        if !matched {
            // Injected shadow line with no original counterpart.
            out.push(shadow.clone());
            resync_pending = true;
        }
    }

    out
}

fn marker(abs_source: &Path, line: usize) -> String {
    format!("//line {}:{}", abs_source.display(), line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn map(shadow: &[&str], orig: &[&str]) -> Vec<String> {
        let shadow: Vec<String> = shadow.iter().map(|s| s.to_string()).collect();
        inject_line_markers(&shadow, orig, &PathBuf::from("/p/main.go"))
    }

    #[test]
    fn identical_streams_need_no_markers() {
        let lines = ["package main", "", "func main() {}"];
        let mapped = map(&lines, &lines);
        assert_eq!(mapped, lines.to_vec());
    }

    #[test]
    fn injection_resyncs_next_original_line() {
        let orig = ["func F() {", "\t// @inco: x > 0", "\t_ = x", "}"];
        let shadow = ["func F() {", "\tif !(x > 0) {", "\t\tpanic(\"no\")", "\t}", "\t_ = x", "}"];
        let mapped = map(&shadow, &orig);
        let marker_idx = mapped
            .iter()
            .position(|l| l == "//line /p/main.go:3")
            .expect("marker for the re-synced line");
        assert_eq!(mapped[marker_idx + 1], "\t_ = x");
    }

    #[test]
    fn markers_start_at_column_one() {
        let orig = ["a", "// note", "b"];
        let shadow = ["a", "b"];
        for line in map(&shadow, &orig) {
            if line.contains("//line ") {
                assert!(line.starts_with("//line "));
            }
        }
    }

    #[test]
    fn stripped_decorative_comment_reanchors() {
        let orig = ["a", "\t// note", "b"];
        let shadow = ["a", "b"];
        let mapped = map(&shadow, &orig);
        assert_eq!(mapped, vec!["a", "//line /p/main.go:3", "b"]);
    }

    #[test]
    fn stripped_trailing_comment_still_matches() {
        let orig = ["a", "\tx := 1 // note", "b"];
        let shadow = ["a", "\tx := 1", "b"];
        let mapped = map(&shadow, &orig);
        // 1:1 correspondence throughout, so no markers at all.
        assert_eq!(mapped, vec!["a", "\tx := 1", "b"]);
    }

    #[test]
    fn trailing_injection_after_last_statement() {
        let orig = ["func F() {", "\t_ = x", "\t// @inco: x > 0", "}"];
        let shadow = ["func F() {", "\t_ = x", "\tif !(x > 0) {", "\t\tpanic(\"m\")", "\t}", "}"];
        let mapped = map(&shadow, &orig);
        // The first `}`-shaped shadow line after the injection re-anchors
        // to the original closing brace.
        let marker_idx = mapped.iter().position(|l| l == "//line /p/main.go:4").unwrap();
        assert_eq!(mapped[marker_idx + 1].trim(), "}");
    }
}
