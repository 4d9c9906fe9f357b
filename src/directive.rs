//! Directive parsing — decodes `@inco:` comment payloads
//!
//! Syntax: `@inco: <expr>[, -action[(args...)]]`
//!
//! The split between expression and action is made at the last top-level
//! comma of the payload: a comma at paren/bracket/brace depth 0 that is not
//! inside a double-quoted or backtick-quoted string. Anything that fails to
//! parse as an action demotes the whole payload to an expression with the
//! default action.

use std::fmt;

/// The directive marker, after comment delimiters are stripped.
pub const MARKER: &str = "@inco:";

/// Runtime response executed when a guard's condition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Default — panic with an auto-generated or user-supplied message.
    Panic,
    /// Return from the enclosing function, with optional values.
    Return,
    /// Continue the innermost enclosing loop.
    Continue,
    /// Break the innermost enclosing loop.
    Break,
    /// Report via the standard `log` package and fall through.
    Log,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Panic => write!(f, "panic"),
            Action::Return => write!(f, "return"),
            Action::Continue => write!(f, "continue"),
            Action::Break => write!(f, "break"),
            Action::Log => write!(f, "log"),
        }
    }
}

/// Keyword table for the `-action` suffix.
const ACTION_KEYWORDS: &[(&str, Action)] = &[
    ("panic", Action::Panic),
    ("return", Action::Return),
    ("continue", Action::Continue),
    ("break", Action::Break),
    ("log", Action::Log),
];

/// The parsed form of a single `@inco:` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Raw text of the boolean expression the programmer expects to hold.
    pub expression: String,
    /// Response when the expression does not hold.
    pub action: Action,
    /// Raw argument texts, e.g. `-return(0, err)` → `["0", "err"]`.
    pub action_args: Vec<String>,
}

/// Extracts a [`Directive`] from a comment string (delimiters included).
/// Returns `None` when the comment is not a valid `@inco:` directive.
pub fn parse_directive(comment: &str) -> Option<Directive> {
    let payload = strip_comment(comment)?;
    let rest = payload.strip_prefix(MARKER)?.trim();
    if rest.is_empty() {
        return None; // expression is mandatory
    }
    Some(parse_payload(rest))
}

/// Parses the text after `@inco:`. Two forms:
///   - expression only
///   - expression, -action[(args...)]
fn parse_payload(rest: &str) -> Directive {
    if let Some(idx) = find_last_top_level_comma(rest) {
        let expr = rest[..idx].trim();
        let after = rest[idx + 1..].trim();
        if !expr.is_empty() {
            if let Some((action, args)) = parse_action(after) {
                let shape_ok = match action {
                    Action::Continue | Action::Break => args.is_empty(),
                    Action::Log => !args.is_empty(),
                    Action::Panic | Action::Return => true,
                };
                if shape_ok {
                    return Directive {
                        expression: expr.to_string(),
                        action,
                        action_args: args,
                    };
                }
            }
        }
    }

    // No comma+action found — the entire payload is the expression.
    Directive {
        expression: rest.to_string(),
        action: Action::Panic,
        action_args: Vec::new(),
    }
}

/// Tries to read `-action` or `-action(args...)` covering all of `s`.
fn parse_action(s: &str) -> Option<(Action, Vec<String>)> {
    let body = s.strip_prefix('-')?;
    for (keyword, action) in ACTION_KEYWORDS {
        let Some(after) = body.strip_prefix(keyword) else {
            continue;
        };
        if after.is_empty() {
            // bare action: -continue, -break, -return, -panic
            return Some((*action, Vec::new()));
        }
        if after.starts_with('(') {
            if let Some((args, remaining)) = parse_action_args(after) {
                if remaining.trim().is_empty() {
                    return Some((*action, args));
                }
            }
        }
        // Not a valid action with that keyword; keep looking.
    }
    None
}

/// String-literal state for the payload scanners. Double-quoted strings
/// honour backslash escapes; backtick raw strings do not.
#[derive(Clone, Copy, PartialEq, Eq)]
enum StrState {
    Code,
    Quoted,
    Raw,
}

/// Returns the byte index of the last comma at depth 0, respecting
/// parentheses, brackets, braces and string literals. `None` if no
/// top-level comma exists.
fn find_last_top_level_comma(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth: i32 = 0;
    let mut state = StrState::Code;
    let mut last = None;
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        match state {
            StrState::Code => match ch {
                b'"' => state = StrState::Quoted,
                b'`' => state = StrState::Raw,
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b',' if depth == 0 => last = Some(i),
                _ => {}
            },
            StrState::Quoted => match ch {
                b'\\' => i += 1, // skip escaped char
                b'"' => state = StrState::Code,
                _ => {}
            },
            StrState::Raw => {
                if ch == b'`' {
                    state = StrState::Code;
                }
            }
        }
        i += 1;
    }
    last
}

/// Parses `(arg1, arg2, ...)` respecting nested parens and strings.
/// Returns the args and the remaining text after `)`, or `None` when the
/// paren never closes.
fn parse_action_args(s: &str) -> Option<(Vec<String>, &str)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'(') {
        return None;
    }
    let mut depth: i32 = 0;
    let mut state = StrState::Code;
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        match state {
            StrState::Code => match ch {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &s[1..i];
                        return Some((split_top_level(inner), &s[i + 1..]));
                    }
                }
                b'"' => state = StrState::Quoted,
                b'`' => state = StrState::Raw,
                _ => {}
            },
            StrState::Quoted => match ch {
                b'\\' => i += 1,
                b'"' => state = StrState::Code,
                _ => {}
            },
            StrState::Raw => {
                if ch == b'`' {
                    state = StrState::Code;
                }
            }
        }
        i += 1;
    }
    None // unmatched paren
}

/// Splits `s` by top-level commas, respecting nesting and string literals.
fn split_top_level(s: &str) -> Vec<String> {
    let bytes = s.as_bytes();
    let mut result = Vec::new();
    let mut depth: i32 = 0;
    let mut state = StrState::Code;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        match state {
            StrState::Code => match ch {
                b'"' => state = StrState::Quoted,
                b'`' => state = StrState::Raw,
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b',' if depth == 0 => {
                    result.push(s[start..i].trim().to_string());
                    start = i + 1;
                }
                _ => {}
            },
            StrState::Quoted => match ch {
                b'\\' => i += 1,
                b'"' => state = StrState::Code,
                _ => {}
            },
            StrState::Raw => {
                if ch == b'`' {
                    state = StrState::Code;
                }
            }
        }
        i += 1;
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        result.push(last.to_string());
    }
    result
}

// ---------------------------------------------------------------------------
// Comment-line helpers (shared with the line mapper)
// ---------------------------------------------------------------------------

/// Removes Go comment delimiters and returns trimmed content.
fn strip_comment(s: &str) -> Option<&str> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix("//") {
        return Some(rest.trim());
    }
    if let Some(rest) = s.strip_prefix("/*") {
        if let Some(inner) = rest.strip_suffix("*/") {
            return Some(inner.trim());
        }
    }
    None
}

/// True when the trimmed line consists of a comment only.
pub(crate) fn is_comment_line(line: &str) -> bool {
    let s = line.trim();
    s.starts_with("//") || (s.starts_with("/*") && s.ends_with("*/"))
}

/// True when the trimmed line is a comment whose payload begins with `@inco:`.
pub fn is_directive_comment_line(line: &str) -> bool {
    strip_comment(line).is_some_and(|p| p.starts_with(MARKER))
}

/// Removes any trailing or embedded comments from a single source line.
/// Returns `Some(cleaned)` when a comment was removed, `None` when the line
/// carries no comment. String literals are respected.
pub(crate) fn strip_line_comments(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(line.len());
    let mut state = StrState::Code;
    let mut removed = false;
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        match state {
            StrState::Code => {
                if ch == b'/' && bytes.get(i + 1) == Some(&b'/') {
                    removed = true;
                    break; // line comment runs to end of line
                }
                if ch == b'/' && bytes.get(i + 1) == Some(&b'*') {
                    removed = true;
                    match line[i + 2..].find("*/") {
                        Some(close) => {
                            i += 2 + close + 2;
                            continue;
                        }
                        None => break, // unterminated on this line
                    }
                }
                match ch {
                    b'"' => state = StrState::Quoted,
                    b'`' => state = StrState::Raw,
                    _ => {}
                }
                out.push(ch);
            }
            StrState::Quoted => {
                out.push(ch);
                match ch {
                    b'\\' => {
                        if let Some(&next) = bytes.get(i + 1) {
                            out.push(next);
                            i += 1;
                        }
                    }
                    b'"' => state = StrState::Code,
                    _ => {}
                }
            }
            StrState::Raw => {
                out.push(ch);
                if ch == b'`' {
                    state = StrState::Code;
                }
            }
        }
        i += 1;
    }
    if !removed {
        return None;
    }
    let cleaned = String::from_utf8_lossy(&out);
    Some(cleaned.trim_end().to_string())
}
