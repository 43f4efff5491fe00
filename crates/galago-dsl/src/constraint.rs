//! The constraint-expression mini-language.
//!
//! `where` clauses, config extra-constraints, and oracle proposals all share
//! one comparison form: `operand cmp operand`. Operands reference
//! non-terminal expansions (`<nt>`, `int(<nt>)`, `len(<nt>)`), may be
//! wrapped in `abs(…)` or `uint16(len(…))`, or are numeric literals.
//! Evaluation against a production trace lives in the engine; this module
//! only defines the syntax tree.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Numeric literal.
    Number(f64),
    /// `<nt>`: the raw yield string of an occurrence.
    Yield(String),
    /// `int(<nt>)`: the occurrence's yield parsed as an integer.
    Int(String),
    /// `len(<nt>)`: the occurrence's yield length in characters.
    Len(String),
    /// `abs(operand)`.
    Abs(Box<Operand>),
    /// `uint16(len(<nt>))`: the big-endian two-byte rendering of the
    /// occurrence's yield length, for length-prefixed formats.
    Uint16Len(String),
}

impl Operand {
    fn collect_referenced<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Operand::Number(_) => {}
            Operand::Yield(name)
            | Operand::Int(name)
            | Operand::Len(name)
            | Operand::Uint16Len(name) => out.push(name.as_str()),
            Operand::Abs(inner) => inner.collect_referenced(out),
        }
    }

    /// The non-terminal this operand binds to, if any.
    pub fn nonterminal(&self) -> Option<&str> {
        let mut refs = Vec::new();
        self.collect_referenced(&mut refs);
        refs.first().copied()
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Operand::Yield(name) => write!(f, "<{name}>"),
            Operand::Int(name) => write!(f, "int(<{name}>)"),
            Operand::Len(name) => write!(f, "len(<{name}>)"),
            Operand::Abs(inner) => write!(f, "abs({inner})"),
            Operand::Uint16Len(name) => write!(f, "uint16(len(<{name}>))"),
        }
    }
}

/// A parsed `where` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub lhs: Operand,
    pub op: CmpOp,
    pub rhs: Operand,
}

impl Constraint {
    /// Non-terminals referenced by either side, in order, deduplicated.
    pub fn referenced(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.lhs.collect_referenced(&mut refs);
        self.rhs.collect_referenced(&mut refs);
        let mut seen = Vec::new();
        for name in refs {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// True when both sides bind the same single non-terminal, or the two
    /// sides bind two distinct ones (pairwise evaluation); false for the
    /// universal single-sided form.
    pub fn is_relational(&self) -> bool {
        self.lhs.nonterminal().is_some() && self.rhs.nonterminal().is_some()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_constraint;

    #[test]
    fn referenced_deduplicates_in_order() {
        let c = parse_constraint("int(<number>) == int(<number>)").unwrap();
        assert_eq!(c.referenced(), vec!["number"]);

        let c = parse_constraint("<length> == uint16(len(<content>))").unwrap();
        assert_eq!(c.referenced(), vec!["length", "content"]);
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "int(<number>) != 0",
            "abs(int(<number>)) >= 1",
            "len(<word>) > 0",
            "<length> == uint16(len(<content>))",
        ] {
            let c = parse_constraint(text).unwrap();
            assert_eq!(c.to_string(), text);
            let again = parse_constraint(&c.to_string()).unwrap();
            assert_eq!(c, again);
        }
    }

    #[test]
    fn relational_classification() {
        assert!(!parse_constraint("int(<number>) != 0")
            .unwrap()
            .is_relational());
        assert!(parse_constraint("<length> == uint16(len(<content>))")
            .unwrap()
            .is_relational());
    }
}
