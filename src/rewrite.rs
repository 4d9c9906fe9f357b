//! Shadow body construction — comment stripping and guard placement
//!
//! Rebuilds the source as shadow lines: every comment is consumed (directive
//! comments become guards, decorative comments vanish), standalone guards
//! occupy the position of their comment line, and inline guards follow the
//! host statement. Original code lines pass through verbatim so the line
//! mapper can reconcile them by trimmed equality.

use crate::classify::{DirectiveSite, Role};
use crate::guard;
use crate::probe::Probe;
use std::collections::BTreeMap;
use std::path::Path;

/// One original line's fate in the shadow.
enum LineState {
    Keep,
    Replace(String),
    Delete,
}

/// Builds the shadow body for one file. `abs_source` is the canonical
/// source path used in guard locations.
pub fn rewrite(
    source: &str,
    probe: &Probe,
    sites: &[DirectiveSite],
    abs_source: &Path,
) -> Vec<String> {
    let lines: Vec<&str> = source.lines().collect();

    let states = strip_comments(&lines, probe);
    let (insert_at, insert_after) = plan_insertions(&lines, probe, sites, abs_source);

    let mut out = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if let Some(blocks) = insert_at.get(&idx) {
            out.extend(blocks.iter().cloned());
        }
        match &states[idx] {
            LineState::Keep => out.push((*line).to_string()),
            LineState::Replace(text) => out.push(text.clone()),
            LineState::Delete => {}
        }
        if let Some(blocks) = insert_after.get(&idx) {
            out.extend(blocks.iter().cloned());
        }
    }
    out
}

/// Computes each line's post-stripping state. Comment-only lines disappear;
/// lines sharing code keep the code with the comment text removed.
fn strip_comments(lines: &[&str], probe: &Probe) -> Vec<LineState> {
    // Byte ranges to remove, per 0-based line index.
    let mut removals: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();

    for c in &probe.comments {
        if c.start_line == c.end_line {
            removals
                .entry(c.start_line - 1)
                .or_default()
                .push((c.start_col, c.end_col));
        } else {
            let first_len = lines.get(c.start_line - 1).map_or(0, |l| l.len());
            removals
                .entry(c.start_line - 1)
                .or_default()
                .push((c.start_col, first_len));
            for mid in c.start_line..c.end_line - 1 {
                let len = lines.get(mid).map_or(0, |l| l.len());
                removals.entry(mid).or_default().push((0, len));
            }
            removals
                .entry(c.end_line - 1)
                .or_default()
                .push((0, c.end_col));
        }
    }

    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let Some(ranges) = removals.get_mut(&idx) else {
                return LineState::Keep;
            };
            ranges.sort_by_key(|r| std::cmp::Reverse(r.0));
            let mut text = (*line).to_string();
            for &(start, end) in ranges.iter() {
                let start = start.min(text.len());
                let end = end.min(text.len());
                text.replace_range(start..end, "");
            }
            if text.trim().is_empty() {
                // Nothing but the comment lived here.
                LineState::Delete
            } else {
                LineState::Replace(text.trim_end().to_string())
            }
        })
        .collect()
}

type InsertionPlan = BTreeMap<usize, Vec<String>>;

/// Synthesises guards for every active site and keys them by insertion
/// position: `insert_at` replaces a consumed comment line, `insert_after`
/// follows the keyed line.
fn plan_insertions(
    lines: &[&str],
    probe: &Probe,
    sites: &[DirectiveSite],
    abs_source: &Path,
) -> (InsertionPlan, InsertionPlan) {
    let mut insert_at: InsertionPlan = BTreeMap::new();
    let mut insert_after: InsertionPlan = BTreeMap::new();

    for site in sites.iter().filter(|s| s.is_active()) {
        let location = format!("{}:{}", abs_source.display(), site.line);
        let indent = site_indent(lines, probe, site);
        let guard_lines: Vec<String> = guard::synthesize(&site.directive, &location)
            .into_iter()
            .map(|l| format!("{indent}{l}"))
            .collect();

        match site.role {
            Role::Standalone if site.comment_only_line => {
                insert_at
                    .entry(site.line - 1)
                    .or_default()
                    .extend(guard_lines);
            }
            Role::Standalone => {
                // Comment shares its line with non-statement tokens (an
                // opening brace, a case label); guards open the list on
                // the following line.
                insert_after
                    .entry(site.end_line - 1)
                    .or_default()
                    .extend(guard_lines);
            }
            Role::Inline => {
                insert_after
                    .entry(site.line - 1)
                    .or_default()
                    .extend(guard_lines);
            }
            Role::Ignored => unreachable!("filtered above"),
        }
    }

    (insert_at, insert_after)
}

/// Guard indentation for a site: the following statement's indentation when
/// one exists, else derived from the comment's own line.
fn site_indent(lines: &[&str], probe: &Probe, site: &DirectiveSite) -> String {
    let container = site.container.map(|ci| &probe.containers[ci]);

    if site.role == Role::Inline {
        if let Some(cont) = container {
            if let Some(host) = cont
                .statements
                .iter()
                .find(|s| s.end_line == site.line && s.end_col <= site.column)
            {
                return leading_whitespace(lines.get(host.start_line - 1).copied().unwrap_or(""));
            }
        }
        return leading_whitespace(lines.get(site.line - 1).copied().unwrap_or(""));
    }

    if let Some(cont) = container {
        if let Some(following) = cont
            .statements
            .iter()
            .filter(|s| s.start_line > site.end_line)
            .min_by_key(|s| s.start_byte)
        {
            return leading_whitespace(
                lines.get(following.start_line - 1).copied().unwrap_or(""),
            );
        }
    }

    let own = leading_whitespace(lines.get(site.line - 1).copied().unwrap_or(""));
    if site.comment_only_line {
        own
    } else {
        format!("{own}\t")
    }
}

fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::probe::probe_source;
    use std::path::PathBuf;

    fn shadow_lines(source: &str) -> Vec<String> {
        let path = PathBuf::from("/p/main.go");
        let probe = probe_source(&path, source).unwrap();
        let sites = classify(&probe, source);
        rewrite(source, &probe, &sites, &path)
    }

    #[test]
    fn standalone_guard_replaces_comment_line() {
        let src = "package main\n\nfunc F(x int) {\n\t// @inco: x > 0\n\t_ = x\n}\n";
        let lines = shadow_lines(src);
        let text = lines.join("\n");
        assert!(text.contains("\tif !(x > 0) {"));
        assert!(text.contains("inco violation: x > 0 (at /p/main.go:4)"));
        assert!(!text.contains("@inco"));
        // Guard sits exactly where the comment was.
        let guard_idx = lines.iter().position(|l| l.contains("if !(x > 0)")).unwrap();
        let stmt_idx = lines.iter().position(|l| l.contains("_ = x")).unwrap();
        assert!(guard_idx < stmt_idx);
    }

    #[test]
    fn inline_guard_follows_statement() {
        let src = "package main\n\nfunc F(err error) {\n\t_ = err // @inco: err == nil, -panic(err)\n}\n";
        let lines = shadow_lines(src);
        let stmt_idx = lines.iter().position(|l| l.trim() == "_ = err").unwrap();
        assert_eq!(lines[stmt_idx + 1].trim(), "if !(err == nil) {");
        assert_eq!(lines[stmt_idx + 2].trim(), "panic(err)");
    }

    #[test]
    fn decorative_comments_are_stripped() {
        let src = "package main\n\n// doc comment\nfunc F(x int) {\n\t_ = x // trailing note\n}\n";
        let text = shadow_lines(src).join("\n");
        assert!(!text.contains("doc comment"));
        assert!(!text.contains("trailing note"));
        assert!(text.contains("_ = x"));
    }

    #[test]
    fn consecutive_directives_keep_source_order() {
        let src = "package main\n\nfunc F(a, b int) {\n\t// @inco: a > 0\n\t// @inco: b > 0\n\t_ = a\n}\n";
        let text = shadow_lines(src).join("\n");
        let first = text.find("!(a > 0)").unwrap();
        let second = text.find("!(b > 0)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn guard_indent_matches_following_statement() {
        let src = "package main\n\nfunc F(nums []int) {\n\tfor _, n := range nums {\n\t\t// @inco: n > 0, -continue\n\t\t_ = n\n\t}\n}\n";
        let lines = shadow_lines(src);
        let guard = lines.iter().find(|l| l.contains("if !(n > 0)")).unwrap();
        assert!(guard.starts_with("\t\tif"));
    }

    #[test]
    fn trailing_window_guard_before_closing_brace() {
        let src = "package main\n\nfunc F(x int) {\n\t_ = x\n\t// @inco: x > 0\n}\n";
        let lines = shadow_lines(src);
        let guard_idx = lines.iter().position(|l| l.contains("if !(x > 0)")).unwrap();
        let close_idx = lines.iter().rposition(|l| l.trim() == "}").unwrap();
        assert!(guard_idx < close_idx);
    }
}
