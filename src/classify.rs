//! Directive classification — standalone, inline, or ignored
//!
//! A directive's role is decided by where its comment sits relative to the
//! statement lists the probe found. Comments outside every container window
//! (struct fields, top-level doc comments, comment positions inside a
//! statement's own span) are ignored.

use crate::directive::{parse_directive, Directive};
use crate::probe::Probe;

/// Line role of a directive comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Comment occupies its line; guards take the line's place.
    Standalone,
    /// Comment trails a statement; guards follow that statement.
    Inline,
    /// Position where no guard can be synthesised.
    Ignored,
}

/// A directive bound to its source position and role.
#[derive(Debug, Clone)]
pub struct DirectiveSite {
    pub directive: Directive,
    /// 1-based line of the comment (first line for block comments).
    pub line: usize,
    /// 1-based last line of the comment (equals `line` for `//` comments).
    pub end_line: usize,
    /// 0-based byte column of the comment on its line.
    pub column: usize,
    pub role: Role,
    /// Index into the probe's containers, when the comment sits in one.
    pub container: Option<usize>,
    /// True when the comment's line(s) hold nothing but the comment.
    pub comment_only_line: bool,
}

impl DirectiveSite {
    pub fn is_active(&self) -> bool {
        self.role != Role::Ignored
    }
}

/// Classifies every directive comment in the probe against the source.
/// Sites come back in source order.
pub fn classify(probe: &Probe, source: &str) -> Vec<DirectiveSite> {
    let lines: Vec<&str> = source.lines().collect();
    let mut sites = Vec::new();

    for comment in &probe.comments {
        let Some(directive) = parse_directive(&comment.text) else {
            continue;
        };

        let comment_only = comment_only_line(comment, &lines);
        let container = probe.enclosing_container(comment.start_byte);

        let role = match container {
            None => Role::Ignored,
            Some(ci) => {
                let cont = &probe.containers[ci];
                let inside_stmt = cont.statements.iter().any(|s| {
                    s.start_byte < comment.start_byte && comment.start_byte < s.end_byte
                });
                if inside_stmt {
                    Role::Ignored
                } else if let Some(_host) = cont.statements.iter().find(|s| {
                    s.end_line == comment.start_line && s.end_col <= comment.start_col
                }) {
                    Role::Inline
                } else if !comment_only && cont.close_line == comment.end_line {
                    // Single-line container tail (`{ // @inco: … }`): there
                    // is no line after the comment that is still inside the
                    // container, so no insertion point exists.
                    Role::Ignored
                } else {
                    Role::Standalone
                }
            }
        };

        sites.push(DirectiveSite {
            directive,
            line: comment.start_line,
            end_line: comment.end_line,
            column: comment.start_col,
            role,
            container,
            comment_only_line: comment_only,
        });
    }

    sites
}

/// True when nothing but whitespace surrounds the comment on its first and
/// last physical lines.
fn comment_only_line(comment: &crate::probe::CommentSite, lines: &[&str]) -> bool {
    let first = lines.get(comment.start_line - 1).copied().unwrap_or("");
    let prefix = &first[..comment.start_col.min(first.len())];
    if !prefix.trim().is_empty() {
        return false;
    }
    let last = lines.get(comment.end_line - 1).copied().unwrap_or("");
    let suffix = &last[comment.end_col.min(last.len())..];
    suffix.trim().is_empty()
}
