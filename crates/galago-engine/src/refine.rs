//! The constraint-refinement loop's building blocks: the oracle contract,
//! two local oracle implementations, and the splice-and-validate step that
//! turns textual proposals into new grammar versions.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use galago_dsl::ast::{ElementKind, Grammar, Repeat};
use galago_dsl::{parse_constraint, parse_rule};

use crate::errors::OracleError;
use crate::generate::{Generator, GeneratorOptions, GeneratorTable};

/// What the engine sends to the constraint-inference oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OracleRequest {
    pub grammar_text: String,
    pub property_name: String,
    pub property_description: String,
    pub counterexamples: Vec<String>,
}

/// What the oracle answers. A failed or malformed exchange is treated as
/// an empty constraint list by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct OracleResponse {
    pub constraints: Vec<String>,
}

/// External constraint-inference service. The network client lives outside
/// the engine; these implementations are local.
pub trait ConstraintOracle {
    fn infer(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;

    fn name(&self) -> &str {
        "oracle"
    }
}

/// Replays a fixed sequence of constraint sets; rounds past the end answer
/// with no constraints. The test double for feedback scenarios.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    rounds: RefCell<VecDeque<Vec<String>>>,
}

impl ScriptedOracle {
    pub fn new(rounds: Vec<Vec<String>>) -> Self {
        Self {
            rounds: RefCell::new(rounds.into()),
        }
    }
}

impl ConstraintOracle for ScriptedOracle {
    fn infer(&self, _request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let constraints = self.rounds.borrow_mut().pop_front().unwrap_or_default();
        Ok(OracleResponse { constraints })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Heuristic numeric miner: when failing witnesses involve a zero, propose
/// `int(<nt>) != 0` for every numeric leaf rule of the grammar. Covers the
/// division-by-zero family without any external service.
#[derive(Debug, Default)]
pub struct RuleBasedOracle;

impl ConstraintOracle for RuleBasedOracle {
    fn infer(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let grammar = match galago_dsl::parse(&request.grammar_text, "oracle-request") {
            Ok(grammar) => grammar,
            Err(_) => return Ok(OracleResponse::default()),
        };
        let mined = mine_numbers(&request.counterexamples);
        if !mined.contains(&0) {
            return Ok(OracleResponse::default());
        }
        let constraints = numeric_rules(&grammar)
            .into_iter()
            .map(|name| format!("int(<{name}>) != 0"))
            .collect();
        Ok(OracleResponse { constraints })
    }

    fn name(&self) -> &str {
        "rule-based"
    }
}

/// Integer literals appearing in witness renderings.
fn mine_numbers(witnesses: &[String]) -> Vec<i64> {
    let mut out = Vec::new();
    for witness in witnesses {
        let mut current = String::new();
        for ch in witness.chars().chain(std::iter::once(' ')) {
            if ch.is_ascii_digit()
                || (ch == '-' && current.is_empty())
                // Keep the decimal point so float literals fail the i64
                // parse instead of shedding spurious integer fragments.
                || (ch == '.' && !current.is_empty())
            {
                current.push(ch);
            } else {
                if let Ok(n) = current.parse::<i64>() {
                    out.push(n);
                }
                current.clear();
            }
        }
    }
    out
}

/// Rules whose entire language is numeric text (digits with an optional
/// sign), excluding the start rule. These are the safe targets for
/// `int(…)` predicates.
fn numeric_rules(grammar: &Grammar) -> Vec<String> {
    let start = grammar.start().to_owned();
    let mut numeric: Vec<String> = Vec::new();
    loop {
        let mut changed = false;
        for production in grammar.rules.values() {
            if numeric.contains(&production.name) || production.hook.is_some() {
                continue;
            }
            let all_numeric = production.alternatives.iter().all(|alt| {
                alt.elements.iter().all(|element| {
                    let kind_numeric = match &element.kind {
                        ElementKind::Literal(text) => {
                            !text.is_empty()
                                && text.chars().all(|c| c.is_ascii_digit() || c == '-')
                        }
                        ElementKind::Reference(name) => numeric.contains(name),
                        ElementKind::Group(_) => false,
                    };
                    kind_numeric && element.repeat != Repeat::ZeroOrMore
                })
            });
            if all_numeric {
                numeric.push(production.name.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    numeric.retain(|name| *name != start);
    numeric
}

/// The outcome of splicing a batch of oracle proposals into a grammar.
/// Rejected proposals are reported (and logged to the history by the
/// engine) but never applied.
#[derive(Debug)]
pub struct SpliceOutcome {
    pub grammar: Grammar,
    pub applied: Vec<String>,
    pub rejected: Vec<String>,
}

/// Apply each textual proposal: either a `where` predicate (attached to
/// the single referenced rule, or to the start rule when several are
/// named) or a replacement rule narrowing a leaf. A proposal is rejected
/// when it fails to parse, references unknown non-terminals, duplicates an
/// existing constraint, or leaves the grammar unable to produce a string.
pub fn splice_proposals(
    grammar: &Grammar,
    proposals: &[String],
    table: &GeneratorTable,
    probe_seed: u64,
) -> SpliceOutcome {
    let mut current = grammar.clone();
    let mut applied = Vec::new();
    let mut rejected = Vec::new();

    for proposal in proposals {
        let text = proposal.trim();
        if text.is_empty() {
            continue;
        }
        let candidate = if text.contains("::=") {
            parse_rule(text, "splice").and_then(|production| {
                current
                    .with_replaced_rule(production)
                    .map_err(|e| galago_dsl::errors::ParseError::InvalidConstraint {
                        text: text.to_owned(),
                        reason: e.to_string(),
                    })
            })
        } else {
            parse_constraint(text).and_then(|constraint| {
                let referenced = constraint.referenced();
                let scope = if referenced.len() == 1 {
                    referenced[0].to_owned()
                } else {
                    current.start().to_owned()
                };
                let duplicate = current
                    .rules
                    .get(&scope)
                    .map(|rule| rule.constraints.contains(&constraint))
                    .unwrap_or(false);
                if duplicate {
                    return Err(galago_dsl::errors::ParseError::InvalidConstraint {
                        text: text.to_owned(),
                        reason: "constraint already present".into(),
                    });
                }
                current.with_constraint(&scope, constraint).map_err(|e| {
                    galago_dsl::errors::ParseError::InvalidConstraint {
                        text: text.to_owned(),
                        reason: e.to_string(),
                    }
                })
            })
        };

        match candidate {
            Ok(next) if admits_a_string(&next, table, probe_seed) => {
                current = next;
                applied.push(text.to_owned());
            }
            Ok(_) => {
                debug!(proposal = text, "rejected: spliced grammar admits no string");
                rejected.push(text.to_owned());
            }
            Err(error) => {
                debug!(proposal = text, %error, "rejected constraint proposal");
                rejected.push(text.to_owned());
            }
        }
    }

    SpliceOutcome {
        grammar: current,
        applied,
        rejected,
    }
}

/// Bounded probe: a valid splice must leave at least one derivable string.
fn admits_a_string(grammar: &Grammar, table: &GeneratorTable, seed: u64) -> bool {
    let options = GeneratorOptions::default();
    match Generator::new(grammar.clone(), table.clone(), options, seed) {
        Ok(mut generator) => !generator.generate(16).derivations.is_empty(),
        Err(_) => false,
    }
}
