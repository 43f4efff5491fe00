// ParseError carries diagnostic spans and source fragments; boxing would lose
// the zero-copy benefit and complicate call sites throughout the crate.
#![allow(clippy::result_large_err)]

use indexmap::IndexMap;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::constraint::{CmpOp, Constraint, Operand};
use crate::errors::ParseError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct FanParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Helper to extract the next child from a pest iterator, returning a
/// descriptive error instead of panicking.
fn next_child<'a>(
    iter: &mut pest::iterators::Pairs<'a, Rule>,
    context: &str,
) -> Result<Pair<'a>, ParseError> {
    iter.next().ok_or_else(|| ParseError::MissingNode {
        context: context.to_owned(),
    })
}

/// Parse a `.fan` grammar file.
///
/// # Parameters
/// - `source`: UTF-8 grammar text.
/// - `filename`: Logical filename used in diagnostics.
///
/// # Returns
/// The parsed [`Grammar`] or a [`ParseError`]. Call
/// [`Grammar::validate`] afterwards to catch dangling references and
/// unproductive cycles.
pub fn parse(source: &str, filename: &str) -> Result<Grammar, ParseError> {
    let pairs = FanParser::parse(Rule::file, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, p + 1),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        ParseError::syntax(format!("{e}"), Span::new(start, end), source, filename)
    })?;

    let file_pair = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::MissingNode {
            context: "file".into(),
        })?;

    let mut rules: IndexMap<String, Production> = IndexMap::new();
    for statement in file_pair.into_inner() {
        if statement.as_rule() != Rule::statement {
            continue; // EOI
        }
        let inner = next_child(&mut statement.into_inner(), "statement body")?;
        match inner.as_rule() {
            Rule::rule_def => {
                let production = build_production(inner, source, filename)?;
                if rules.contains_key(&production.name) {
                    return Err(ParseError::DuplicateRule {
                        name: production.name.clone(),
                        span: (production.span.start, production.span.end - production.span.start)
                            .into(),
                        src: miette::NamedSource::new(filename, source.to_owned()),
                    });
                }
                rules.insert(production.name.clone(), production);
            }
            Rule::where_clause => {
                let span = span_from(&inner);
                let predicate = next_child(&mut inner.into_inner(), "where predicate")?;
                let constraint = parse_constraint(predicate.as_str().trim())?;
                let last = rules.len().checked_sub(1);
                match last.and_then(|index| rules.get_index_mut(index)) {
                    Some((_, production)) => production.constraints.push(constraint),
                    None => {
                        return Err(ParseError::DanglingWhere {
                            span: (span.start, span.end - span.start).into(),
                            src: miette::NamedSource::new(filename, source.to_owned()),
                        })
                    }
                }
            }
            other => {
                return Err(ParseError::MissingNode {
                    context: format!("unexpected node {other:?}"),
                })
            }
        }
    }

    Ok(Grammar { rules })
}

/// Parse a single `<name> ::= …` line, as used by rule-replacement splices.
pub fn parse_rule(source: &str, filename: &str) -> Result<Production, ParseError> {
    let pairs = FanParser::parse(Rule::rule_stmt, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, p + 1),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        ParseError::syntax(format!("{e}"), Span::new(start, end), source, filename)
    })?;
    let stmt = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::MissingNode {
            context: "rule statement".into(),
        })?;
    let def = stmt
        .into_inner()
        .find(|p| p.as_rule() == Rule::rule_def)
        .ok_or_else(|| ParseError::MissingNode {
            context: "rule definition".into(),
        })?;
    build_production(def, source, filename)
}

fn build_production(
    pair: Pair<'_>,
    source: &str,
    filename: &str,
) -> Result<Production, ParseError> {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let name_pair = next_child(&mut inner, "rule name")?;
    let name = strip_angle_brackets(name_pair.as_str());

    let alternation = next_child(&mut inner, "rule body")?;
    let alternatives = build_alternation(alternation)?;

    let hook = match inner.next() {
        Some(hook_pair) => {
            let hook_span = span_from(&hook_pair);
            let snippet = next_child(&mut hook_pair.into_inner(), "hook snippet")?;
            Some(build_hook(snippet.as_str().trim(), hook_span, source, filename)?)
        }
        None => None,
    };

    Ok(Production {
        name,
        alternatives,
        hook,
        constraints: Vec::new(),
        span,
    })
}

fn build_alternation(pair: Pair<'_>) -> Result<Vec<Alternative>, ParseError> {
    pair.into_inner().map(build_concatenation).collect()
}

fn build_concatenation(pair: Pair<'_>) -> Result<Alternative, ParseError> {
    let span = span_from(&pair);
    let elements = pair
        .into_inner()
        .map(build_element)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Alternative { elements, span })
}

fn build_element(pair: Pair<'_>) -> Result<Element, ParseError> {
    let mut inner = pair.into_inner();
    let primary = next_child(&mut inner, "element")?;
    let repeat = match inner.next().map(|p| p.as_str().to_owned()) {
        Some(op) => match op.as_str() {
            "?" => Repeat::Optional,
            "*" => Repeat::ZeroOrMore,
            "+" => Repeat::OneOrMore,
            _ => Repeat::Once,
        },
        None => Repeat::Once,
    };
    let inner_primary = next_child(&mut primary.into_inner(), "primary element")?;
    let kind = match inner_primary.as_rule() {
        Rule::literal => ElementKind::Literal(unescape_literal(inner_primary.as_str())),
        Rule::nonterminal => ElementKind::Reference(strip_angle_brackets(inner_primary.as_str())),
        Rule::group => {
            let alternation = next_child(&mut inner_primary.into_inner(), "group body")?;
            ElementKind::Group(build_alternation(alternation)?)
        }
        other => {
            return Err(ParseError::MissingNode {
                context: format!("unexpected element {other:?}"),
            })
        }
    };
    Ok(Element { kind, repeat })
}

/// Hooks are call-shaped: `name(arg, …)` with numeric arguments, or a bare
/// generator name. The snippet is resolved through the generator table at
/// generation time; here we only split it apart.
fn build_hook(
    snippet: &str,
    span: Span,
    source: &str,
    filename: &str,
) -> Result<SemanticHook, ParseError> {
    if snippet.is_empty() {
        return Err(ParseError::syntax("empty generator snippet", span, source, filename));
    }
    let (name, args) = match snippet.find('(') {
        Some(open) if snippet.ends_with(')') => {
            let name = snippet[..open].trim().to_owned();
            let body = &snippet[open + 1..snippet.len() - 1];
            let mut args = Vec::new();
            for raw in body.split(',') {
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                let value: f64 = raw.parse().map_err(|_| {
                    ParseError::syntax(
                        format!("generator argument '{raw}' is not numeric"),
                        span,
                        source,
                        filename,
                    )
                })?;
                args.push(value);
            }
            (name, args)
        }
        _ => (snippet.to_owned(), Vec::new()),
    };
    Ok(SemanticHook {
        name,
        args,
        source: snippet.to_owned(),
        span,
    })
}

/// Parse a constraint expression (`int(<nt>) != 0`, `len(<word>) > 0`,
/// `<length> == uint16(len(<content>))`, …).
pub fn parse_constraint(text: &str) -> Result<Constraint, ParseError> {
    let pairs =
        FanParser::parse(Rule::constraint, text).map_err(|e| ParseError::InvalidConstraint {
            text: text.to_owned(),
            reason: e.variant.message().into_owned(),
        })?;
    let constraint = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::MissingNode {
            context: "constraint".into(),
        })?;
    let mut inner = constraint.into_inner();
    let lhs = build_operand(next_child(&mut inner, "constraint lhs")?)?;
    let op_pair = next_child(&mut inner, "constraint operator")?;
    let op = match op_pair.as_str() {
        "==" => CmpOp::Eq,
        "!=" => CmpOp::Ne,
        "<=" => CmpOp::Le,
        ">=" => CmpOp::Ge,
        "<" => CmpOp::Lt,
        ">" => CmpOp::Gt,
        other => {
            return Err(ParseError::InvalidConstraint {
                text: text.to_owned(),
                reason: format!("unknown comparison operator '{other}'"),
            })
        }
    };
    let rhs = build_operand(next_child(&mut inner, "constraint rhs")?)?;
    Ok(Constraint { lhs, op, rhs })
}

fn build_operand(pair: Pair<'_>) -> Result<Operand, ParseError> {
    let inner = next_child(&mut pair.into_inner(), "operand")?;
    match inner.as_rule() {
        Rule::c_number => {
            let value: f64 = inner.as_str().parse().map_err(|_| ParseError::InvalidConstraint {
                text: inner.as_str().to_owned(),
                reason: "not a number".into(),
            })?;
            Ok(Operand::Number(value))
        }
        Rule::nonterminal => Ok(Operand::Yield(strip_angle_brackets(inner.as_str()))),
        Rule::c_call => {
            let mut call = inner.into_inner();
            let name = next_child(&mut call, "call name")?.as_str().to_owned();
            let arg = build_operand(next_child(&mut call, "call argument")?)?;
            match (name.as_str(), arg) {
                ("int", Operand::Yield(nt)) => Ok(Operand::Int(nt)),
                ("len", Operand::Yield(nt)) => Ok(Operand::Len(nt)),
                ("uint16", Operand::Len(nt)) => Ok(Operand::Uint16Len(nt)),
                ("abs", arg) => Ok(Operand::Abs(Box::new(arg))),
                ("int", _) | ("len", _) | ("uint16", _) => Err(ParseError::InvalidConstraint {
                    text: name.clone(),
                    reason: format!("{name}() expects a non-terminal argument"),
                }),
                _ => Err(ParseError::UnknownConstraintFunction { name }),
            }
        }
        other => Err(ParseError::MissingNode {
            context: format!("unexpected operand {other:?}"),
        }),
    }
}

fn strip_angle_brackets(text: &str) -> String {
    text.trim_start_matches('<').trim_end_matches('>').to_owned()
}

fn unescape_literal(raw: &str) -> String {
    // Strip the surrounding quotes, then resolve the escape set.
    let body = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rules_alternation_and_repetition() {
        let source = "\
<start> ::= <number> \", \" <number>
<number> ::= \"-\"? <digit>+
<digit> ::= \"0\" | \"1\" | \"2\"
";
        let grammar = parse(source, "test.fan").unwrap();
        assert_eq!(grammar.rules.len(), 3);

        let number = &grammar.rules["number"];
        assert_eq!(number.alternatives.len(), 1);
        let elements = &number.alternatives[0].elements;
        assert_eq!(elements[0].repeat, Repeat::Optional);
        assert_eq!(elements[1].repeat, Repeat::OneOrMore);

        let digit = &grammar.rules["digit"];
        assert_eq!(digit.alternatives.len(), 3);
    }

    #[test]
    fn parses_groups_with_repetition() {
        let source = "<list> ::= <item> (\",\" <item>)*\n<item> ::= \"x\"\n";
        let grammar = parse(source, "test.fan").unwrap();
        let list = &grammar.rules["list"];
        let tail = &list.alternatives[0].elements[1];
        assert_eq!(tail.repeat, Repeat::ZeroOrMore);
        assert!(matches!(tail.kind, ElementKind::Group(_)));
    }

    #[test]
    fn unescapes_literals() {
        let source = r#"<s> ::= "a\"b" "tab\there" "line\n""#;
        let grammar = parse(source, "test.fan").unwrap();
        let elements = &grammar.rules["s"].alternatives[0].elements;
        assert_eq!(elements[0].kind, ElementKind::Literal("a\"b".into()));
        assert_eq!(elements[1].kind, ElementKind::Literal("tab\there".into()));
        assert_eq!(elements[2].kind, ElementKind::Literal("line\n".into()));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let source = "\
# leading comment

<start> ::= \"x\"  # trailing comment

# closing comment
";
        let grammar = parse(source, "test.fan").unwrap();
        assert_eq!(grammar.rules.len(), 1);
    }

    #[test]
    fn attaches_where_clause_to_preceding_rule() {
        let source = "\
<field> ::= <length> <content>
where <length> == uint16(len(<content>))
<length> ::= \"00\"
<content> ::= \"a\"*
";
        let grammar = parse(source, "test.fan").unwrap();
        let field = &grammar.rules["field"];
        assert_eq!(field.constraints.len(), 1);
        assert_eq!(
            field.constraints[0].to_string(),
            "<length> == uint16(len(<content>))"
        );
        assert!(grammar.rules["length"].constraints.is_empty());
    }

    #[test]
    fn where_before_any_rule_is_an_error() {
        let err = parse("where int(<n>) != 0\n", "test.fan").unwrap_err();
        assert!(err.to_string().contains("before any rule"));
    }

    #[test]
    fn duplicate_rule_is_an_error() {
        let source = "<a> ::= \"x\"\n<a> ::= \"y\"\n";
        let err = parse(source, "test.fan").unwrap_err();
        assert_eq!(err.to_string(), "Duplicate rule: <a>");
    }

    #[test]
    fn parses_semantic_hooks() {
        let source = "<byte> ::= \"x\" := char(97, 122)\n";
        let grammar = parse(source, "test.fan").unwrap();
        let hook = grammar.rules["byte"].hook.as_ref().unwrap();
        assert_eq!(hook.name, "char");
        assert_eq!(hook.args, vec![97.0, 122.0]);
        assert_eq!(hook.source, "char(97, 122)");
    }

    #[test]
    fn bare_hook_name_has_no_args() {
        let source = "<n> ::= \"0\" := gauss\n";
        let grammar = parse(source, "test.fan").unwrap();
        let hook = grammar.rules["n"].hook.as_ref().unwrap();
        assert_eq!(hook.name, "gauss");
        assert!(hook.args.is_empty());
    }

    #[test]
    fn garbage_is_a_syntax_error() {
        assert!(parse("not a grammar", "test.fan").is_err());
        assert!(parse("<a> := \"x\"\n", "test.fan").is_err());
    }

    #[test]
    fn parse_rule_reads_a_single_replacement() {
        let production = parse_rule("<digit> ::= \"1\" | \"2\"", "splice").unwrap();
        assert_eq!(production.name, "digit");
        assert_eq!(production.alternatives.len(), 2);
    }

    #[test]
    fn constraint_rejects_unknown_function() {
        let err = parse_constraint("sqrt(<n>) > 0").unwrap_err();
        assert_eq!(err.to_string(), "Unknown constraint function 'sqrt'");
    }

    #[test]
    fn constraint_rejects_malformed_input() {
        assert!(parse_constraint("int(<n>)").is_err());
        assert!(parse_constraint(">= 3").is_err());
        assert!(parse_constraint("").is_err());
    }
}
