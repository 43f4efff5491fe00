use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(galago::parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Duplicate rule: <{name}>")]
    #[diagnostic(
        code(galago::parse::duplicate),
        help("each non-terminal may be defined once; use `|` to add alternatives")
    )]
    DuplicateRule {
        name: String,
        #[label("redefined here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("`where` clause before any rule")]
    #[diagnostic(
        code(galago::parse::dangling_where),
        help("a `where` clause constrains the rule defined on the preceding lines")
    )]
    DanglingWhere {
        #[label("no rule to attach to")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Invalid constraint '{text}': {reason}")]
    #[diagnostic(code(galago::parse::constraint))]
    InvalidConstraint { text: String, reason: String },

    #[error("Unknown constraint function '{name}'")]
    #[diagnostic(
        code(galago::parse::constraint_function),
        help("supported functions are int(), len(), abs() and uint16(len())")
    )]
    UnknownConstraintFunction { name: String },

    #[error("Missing node: expected {context}")]
    #[diagnostic(code(galago::parse::missing_node))]
    MissingNode { context: String },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Syntax {
            message: message.into(),
            span: (span.start, span.end.saturating_sub(span.start).max(1)).into(),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }
}

/// Post-parse validation failures: a grammar that reads fine but cannot be
/// used to generate inputs.
#[derive(Debug, Error, Diagnostic)]
pub enum SemanticError {
    #[error("Rule <{rule}> references undefined non-terminal <{referenced}>")]
    #[diagnostic(code(galago::grammar::undefined_reference))]
    UndefinedReference { rule: String, referenced: String },

    #[error("Rule <{rule}> cannot terminate: every alternative recurses")]
    #[diagnostic(
        code(galago::grammar::unproductive),
        help("add at least one alternative made only of terminals (or `?`/`*` elements)")
    )]
    Unproductive { rule: String },

    #[error("Grammar defines no rules")]
    #[diagnostic(code(galago::grammar::empty))]
    Empty,

    #[error("No rule named <{name}>")]
    #[diagnostic(code(galago::grammar::unknown_rule))]
    UnknownRule { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_syntax_error() {
        let err = ParseError::syntax("unexpected token", Span::new(0, 5), "hello", "test.fan");
        assert_eq!(err.to_string(), "Syntax error: unexpected token");
    }

    #[test]
    fn display_duplicate_rule() {
        let err = ParseError::DuplicateRule {
            name: "number".into(),
            span: (0, 8).into(),
            src: miette::NamedSource::new("test.fan", "<number>".to_owned()),
        };
        assert_eq!(err.to_string(), "Duplicate rule: <number>");
    }

    #[test]
    fn display_semantic_errors() {
        let err = SemanticError::UndefinedReference {
            rule: "start".into(),
            referenced: "digit".into(),
        };
        assert_eq!(
            err.to_string(),
            "Rule <start> references undefined non-terminal <digit>"
        );

        let err = SemanticError::Unproductive {
            rule: "loop".into(),
        };
        assert_eq!(
            err.to_string(),
            "Rule <loop> cannot terminate: every alternative recurses"
        );
    }

    #[test]
    fn syntax_constructor_clamps_zero_width_spans() {
        let err = ParseError::syntax("bad", Span::new(3, 3), "abcdef", "f.fan");
        match err {
            ParseError::Syntax { span, .. } => {
                assert_eq!(span.offset(), 3);
                assert_eq!(span.len(), 1);
            }
            _ => panic!("expected Syntax variant"),
        }
    }
}
