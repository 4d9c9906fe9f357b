//! AST probe — parses a Go source file via tree-sitter
//!
//! Exposes what the rest of the pipeline needs and nothing more: every
//! comment with its position, every statement-list container (blocks and
//! switch/select clauses) with its open/close boundaries and statement
//! spans, and the file's import inventory.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// A comment in the source, positions 1-based for lines, 0-based byte
/// offsets for columns.
#[derive(Debug, Clone)]
pub struct CommentSite {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Span of one statement inside a container.
#[derive(Debug, Clone, Copy)]
pub struct StmtSpan {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub end_col: usize,
}

/// A statement-list container: a block, or one clause of a switch/select.
///
/// The window a comment can occupy runs from the end of the opening token
/// (`{` or `:`) to the start of the closing boundary (`}`, or the next
/// clause for case bodies).
#[derive(Debug, Clone)]
pub struct Container {
    pub open_byte: usize,
    pub open_line: usize,
    pub close_byte: usize,
    pub close_line: usize,
    pub statements: Vec<StmtSpan>,
}

/// Where the import injector may add imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAnchor {
    /// Inside an existing `import ( … )` group — insert after this line.
    Group { line: usize },
    /// After the last single-form `import "x"` — insert new lines after.
    After { line: usize },
    /// No imports at all — insert after the `package` clause line.
    Package { line: usize },
}

/// Import inventory of the file.
#[derive(Debug, Clone)]
pub struct ImportInventory {
    /// Imported package paths, quotes stripped (`"fmt"` → `fmt`).
    pub paths: BTreeSet<String>,
    pub anchor: ImportAnchor,
}

/// Everything the probe learned about one source file.
#[derive(Debug)]
pub struct Probe {
    pub comments: Vec<CommentSite>,
    pub containers: Vec<Container>,
    pub imports: ImportInventory,
}

impl Probe {
    /// Index of the innermost container whose window holds `byte`, if any.
    pub fn enclosing_container(&self, byte: usize) -> Option<usize> {
        self.containers
            .iter()
            .enumerate()
            .filter(|(_, c)| c.open_byte <= byte && byte < c.close_byte)
            .max_by_key(|(_, c)| c.open_byte)
            .map(|(i, _)| i)
    }
}

/// Parses `source` and probes it. A tree containing syntax errors is a
/// fatal parse failure for the file.
pub fn probe_source(path: &Path, source: &str) -> Result<Probe> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| Error::Language(format!("failed to load Go grammar: {e}")))?;

    let tree = parser.parse(source, None).ok_or_else(|| Error::Parse {
        path: path.to_path_buf(),
        detail: "parser produced no tree".into(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let detail = first_error(root)
            .map(|n| {
                format!(
                    "syntax error at line {}, column {}",
                    n.start_position().row + 1,
                    n.start_position().column + 1
                )
            })
            .unwrap_or_else(|| "syntax error".into());
        return Err(Error::Parse {
            path: path.to_path_buf(),
            detail,
        });
    }

    let mut comments = Vec::new();
    let mut containers = Vec::new();
    collect(root, source, &mut comments, &mut containers);

    let imports = import_inventory(root, source);

    Ok(Probe {
        comments,
        containers,
        imports,
    })
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

/// Clause kinds that carry a statement body after a `:` token.
const CLAUSE_KINDS: &[&str] = &[
    "expression_case",
    "type_case",
    "default_case",
    "communication_case",
];

/// Switch/select kinds whose children are clauses plus braces.
const SWITCH_KINDS: &[&str] = &[
    "expression_switch_statement",
    "type_switch_statement",
    "select_statement",
];

fn collect(
    node: Node,
    source: &str,
    comments: &mut Vec<CommentSite>,
    containers: &mut Vec<Container>,
) {
    match node.kind() {
        "comment" => {
            comments.push(CommentSite {
                text: node
                    .utf8_text(source.as_bytes())
                    .unwrap_or("")
                    .to_string(),
                start_line: node.start_position().row + 1,
                end_line: node.end_position().row + 1,
                start_col: node.start_position().column,
                end_col: node.end_position().column,
                start_byte: node.start_byte(),
                end_byte: node.end_byte(),
            });
        }
        "block" => {
            if let Some(container) = block_container(node) {
                containers.push(container);
            }
        }
        kind if SWITCH_KINDS.contains(&kind) => {
            collect_clauses(node, containers);
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, source, comments, containers);
    }
}

fn block_container(node: Node) -> Option<Container> {
    let mut lbrace = None;
    let mut rbrace = None;
    let mut statements = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "{" => lbrace = Some(child),
            "}" => rbrace = Some(child),
            "comment" => {}
            _ if child.is_named() => statements.push(stmt_span(child)),
            _ => {}
        }
    }

    let (lbrace, rbrace) = (lbrace?, rbrace?);
    Some(Container {
        open_byte: lbrace.end_byte(),
        open_line: lbrace.end_position().row + 1,
        close_byte: rbrace.start_byte(),
        close_line: rbrace.start_position().row + 1,
        statements,
    })
}

/// Builds one container per clause of a switch/select. A clause's window
/// closes where the next clause (or the switch's `}`) begins, so comments
/// trailing a clause body belong to that clause.
fn collect_clauses(switch: Node, containers: &mut Vec<Container>) {
    let mut clauses: Vec<Node> = Vec::new();
    let mut rbrace = None;

    let mut cursor = switch.walk();
    for child in switch.children(&mut cursor) {
        if CLAUSE_KINDS.contains(&child.kind()) {
            clauses.push(child);
        } else if child.kind() == "}" {
            rbrace = Some(child);
        }
    }

    let Some(rbrace) = rbrace else { return };

    for (i, clause) in clauses.iter().enumerate() {
        let Some(colon) = clause_colon(*clause) else {
            continue;
        };
        let (close_byte, close_line) = match clauses.get(i + 1) {
            Some(next) => (next.start_byte(), next.start_position().row + 1),
            None => (rbrace.start_byte(), rbrace.start_position().row + 1),
        };

        let mut statements = Vec::new();
        let mut clause_cursor = clause.walk();
        for child in clause.children(&mut clause_cursor) {
            // A communication_case carries a statement before the colon;
            // only children past the colon form the body.
            if child.is_named()
                && child.kind() != "comment"
                && child.start_byte() >= colon.end_byte()
            {
                statements.push(stmt_span(child));
            }
        }

        containers.push(Container {
            open_byte: colon.end_byte(),
            open_line: colon.end_position().row + 1,
            close_byte,
            close_line,
            statements,
        });
    }
}

fn clause_colon(clause: Node) -> Option<Node> {
    let mut colon = None;
    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        if child.kind() == ":" {
            colon = Some(child);
        }
    }
    colon
}

fn stmt_span(node: Node) -> StmtSpan {
    StmtSpan {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        end_col: node.end_position().column,
    }
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

fn import_inventory(root: Node, source: &str) -> ImportInventory {
    let mut paths = BTreeSet::new();
    let mut group_line = None;
    let mut last_single_line = None;
    let mut package_line = 1;

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "package_clause" => {
                package_line = child.end_position().row + 1;
            }
            "import_declaration" => {
                let mut decl_cursor = child.walk();
                for decl_child in child.children(&mut decl_cursor) {
                    match decl_child.kind() {
                        "import_spec" => {
                            if let Some(p) = import_spec_path(decl_child, source) {
                                paths.insert(p);
                            }
                            last_single_line =
                                Some(child.end_position().row + 1).max(last_single_line);
                        }
                        "import_spec_list" => {
                            let mut list_cursor = decl_child.walk();
                            for spec in decl_child.children(&mut list_cursor) {
                                match spec.kind() {
                                    "import_spec" => {
                                        if let Some(p) = import_spec_path(spec, source) {
                                            paths.insert(p);
                                        }
                                    }
                                    "(" if group_line.is_none() => {
                                        group_line = Some(spec.start_position().row + 1);
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let anchor = if let Some(line) = group_line {
        ImportAnchor::Group { line }
    } else if let Some(line) = last_single_line {
        ImportAnchor::After { line }
    } else {
        ImportAnchor::Package { line: package_line }
    };

    ImportInventory { paths, anchor }
}

fn import_spec_path(spec: Node, source: &str) -> Option<String> {
    let mut cursor = spec.walk();
    for child in spec.children(&mut cursor) {
        match child.kind() {
            "interpreted_string_literal" | "raw_string_literal" => {
                let text = child.utf8_text(source.as_bytes()).ok()?;
                return Some(text.trim_matches(|c| c == '"' || c == '`').to_string());
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn probe(source: &str) -> Probe {
        probe_source(&PathBuf::from("test.go"), source).unwrap()
    }

    #[test]
    fn collects_comments_and_block() {
        let src = "package main\n\nfunc F(x int) {\n\t// @inco: x > 0\n\t_ = x\n}\n";
        let p = probe(src);
        assert_eq!(p.comments.len(), 1);
        assert_eq!(p.comments[0].start_line, 4);
        assert_eq!(p.containers.len(), 1);
        assert_eq!(p.containers[0].statements.len(), 1);
    }

    #[test]
    fn nested_closures_produce_nested_containers() {
        let src = "package main\n\nfunc Outer() {\n\tf := func(x int) {\n\t\t_ = x\n\t}\n\tf(1)\n}\n";
        let p = probe(src);
        assert_eq!(p.containers.len(), 2);
        // Innermost lookup lands in the closure body.
        let inner_byte = src.find("_ = x").unwrap();
        let idx = p.enclosing_container(inner_byte).unwrap();
        assert_eq!(p.containers[idx].statements.len(), 1);
    }

    #[test]
    fn switch_clauses_are_containers() {
        let src = "package main\n\nfunc F(x int) {\n\tswitch x {\n\tcase 1:\n\t\t_ = x\n\tdefault:\n\t\t_ = x\n\t}\n}\n";
        let p = probe(src);
        // Outer block + two clause bodies.
        assert_eq!(p.containers.len(), 3);
    }

    #[test]
    fn syntax_error_is_fatal() {
        let err = probe_source(&PathBuf::from("bad.go"), "package main\n\nfunc F( {\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn import_inventory_group() {
        let src = "package main\n\nimport (\n\t\"fmt\"\n\t\"os\"\n)\n\nfunc main() {}\n";
        let p = probe(src);
        assert!(p.imports.paths.contains("fmt"));
        assert!(p.imports.paths.contains("os"));
        assert_eq!(p.imports.anchor, ImportAnchor::Group { line: 3 });
    }

    #[test]
    fn import_inventory_single() {
        let src = "package main\n\nimport \"fmt\"\n\nfunc main() {}\n";
        let p = probe(src);
        assert!(p.imports.paths.contains("fmt"));
        assert_eq!(p.imports.anchor, ImportAnchor::After { line: 3 });
    }

    #[test]
    fn import_inventory_none() {
        let src = "package main\n\nfunc main() {}\n";
        let p = probe(src);
        assert!(p.imports.paths.is_empty());
        assert_eq!(p.imports.anchor, ImportAnchor::Package { line: 1 });
    }
}
