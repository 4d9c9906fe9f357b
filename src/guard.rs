//! Guard synthesis — renders the Go statements that realise a directive
//!
//! Every guard has the shape `if !(<expr>) { <action> }`: the programmer
//! writes the condition positively, the guard fires on its negation. The
//! expression is wrapped textually; no simplification is attempted.

use crate::directive::{Action, Directive};

/// Synthesises the guard for `directive` at `location` (`file:line` of the
/// original comment). Returns unindented Go lines; the rewriter applies
/// the site's indentation.
pub fn synthesize(directive: &Directive, location: &str) -> Vec<String> {
    vec![
        format!("if !({}) {{", directive.expression),
        format!("\t{}", action_statement(directive, location)),
        "}".to_string(),
    ]
}

fn action_statement(directive: &Directive, location: &str) -> String {
    match directive.action {
        Action::Panic => {
            if directive.action_args.is_empty() {
                let msg = format!(
                    "inco violation: {} (at {})",
                    directive.expression, location
                );
                format!("panic(\"{}\")", escape_go_string(&msg))
            } else {
                // User-supplied panic value, passed through verbatim.
                format!("panic({})", directive.action_args.join(", "))
            }
        }
        Action::Return => {
            if directive.action_args.is_empty() {
                "return".to_string()
            } else {
                format!("return {}", directive.action_args.join(", "))
            }
        }
        Action::Continue => "continue".to_string(),
        Action::Break => "break".to_string(),
        Action::Log => format!("log.Println({})", directive.action_args.join(", ")),
    }
}

/// Escapes a message for embedding in a double-quoted Go string literal.
fn escape_go_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(expr: &str, action: Action, args: &[&str]) -> Directive {
        Directive {
            expression: expr.to_string(),
            action,
            action_args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn default_panic() {
        let lines = synthesize(&directive("len(name) > 0", Action::Panic, &[]), "/p/main.go:6");
        assert_eq!(lines[0], "if !(len(name) > 0) {");
        assert_eq!(
            lines[1],
            "\tpanic(\"inco violation: len(name) > 0 (at /p/main.go:6)\")"
        );
        assert_eq!(lines[2], "}");
    }

    #[test]
    fn custom_panic_message() {
        let lines = synthesize(
            &directive("x > 0", Action::Panic, &[r#""x must be positive""#]),
            "f.go:1",
        );
        assert_eq!(lines[1], "\tpanic(\"x must be positive\")");
    }

    #[test]
    fn panic_call_expression_passthrough() {
        let lines = synthesize(
            &directive("x > 0", Action::Panic, &[r#"fmt.Sprintf("bad: %d", x)"#]),
            "f.go:1",
        );
        assert_eq!(lines[1], "\tpanic(fmt.Sprintf(\"bad: %d\", x))");
    }

    #[test]
    fn default_panic_escapes_quotes_in_expression() {
        let lines = synthesize(&directive(r#"s != "x""#, Action::Panic, &[]), "f.go:1");
        assert!(lines[1].contains(r#"s != \"x\""#));
    }

    #[test]
    fn bare_return() {
        let lines = synthesize(&directive("x > 0", Action::Return, &[]), "f.go:1");
        assert_eq!(lines[1], "\treturn");
    }

    #[test]
    fn multi_value_return() {
        let lines = synthesize(
            &directive("len(s) > 0", Action::Return, &["0", r#"fmt.Errorf("empty")"#]),
            "f.go:1",
        );
        assert_eq!(lines[1], "\treturn 0, fmt.Errorf(\"empty\")");
    }

    #[test]
    fn continue_and_break() {
        let c = synthesize(&directive("n > 0", Action::Continue, &[]), "f.go:1");
        assert_eq!(c[1], "\tcontinue");
        let b = synthesize(&directive("n != 42", Action::Break, &[]), "f.go:1");
        assert_eq!(b[1], "\tbreak");
    }

    #[test]
    fn log_action() {
        let lines = synthesize(
            &directive("x > 0", Action::Log, &[r#""x must be positive""#, "x"]),
            "f.go:1",
        );
        assert_eq!(lines[1], "\tlog.Println(\"x must be positive\", x)");
    }
}
