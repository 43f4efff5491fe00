//! The results schema: what a run reports per function/property pair, plus
//! serialization and text rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::properties::{EvalStats, EvaluationOutcome};

/// JSON schema version for inference results.
pub const RESULTS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "holds")]
    Holds,
    #[serde(rename = "does_not_hold")]
    DoesNotHold,
    /// Too few valid samples survived generation/parsing to decide.
    #[serde(rename = "inconclusive")]
    Inconclusive,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyOutcome {
    pub holds: bool,
    pub verdict: Verdict,
    /// `success_count / total_count`; 1.0 whenever the property holds.
    pub confidence: f64,
    pub successes: Vec<String>,
    pub counterexamples: Vec<String>,
    pub stats: EvalStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl PropertyOutcome {
    pub fn from_evaluation(
        evaluation: EvaluationOutcome,
        max_counterexamples: usize,
    ) -> Self {
        let confidence = evaluation.confidence();
        let mut counterexamples = evaluation.counterexamples;
        counterexamples.truncate(max_counterexamples);
        Self {
            holds: evaluation.holds,
            verdict: if evaluation.holds {
                Verdict::Holds
            } else {
                Verdict::DoesNotHold
            },
            confidence,
            successes: evaluation.successes,
            counterexamples,
            stats: evaluation.stats,
            diagnostic: None,
        }
    }

    pub fn inconclusive(diagnostic: impl Into<String>) -> Self {
        Self {
            holds: false,
            verdict: Verdict::Inconclusive,
            confidence: 0.0,
            successes: Vec::new(),
            counterexamples: Vec::new(),
            stats: EvalStats {
                total_count: 0,
                success_count: 0,
            },
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Everything reported for one function (or ordered function combination).
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairReport {
    pub outcomes: BTreeMap<String, PropertyOutcome>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints_history: BTreeMap<String, Vec<Vec<String>>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResults {
    pub schema_version: u32,
    pub results: BTreeMap<String, PairReport>,
}

impl RunResults {
    pub fn new() -> Self {
        Self {
            schema_version: RESULTS_SCHEMA_VERSION,
            results: BTreeMap::new(),
        }
    }

    pub fn pair_mut(&mut self, name: &str) -> &mut PairReport {
        self.results.entry(name.to_owned()).or_default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Human-readable report: verdict, confidence, witnesses.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (name, report) in &self.results {
            let _ = writeln!(out, "{name}:");
            for (property, outcome) in &report.outcomes {
                let verdict = match outcome.verdict {
                    Verdict::Holds => "holds",
                    Verdict::DoesNotHold => "does not hold",
                    Verdict::Inconclusive => "inconclusive",
                };
                let _ = writeln!(
                    out,
                    "  {property}: {verdict} ({:.1}%, {}/{})",
                    outcome.confidence * 100.0,
                    outcome.stats.success_count,
                    outcome.stats.total_count,
                );
                if let Some(diagnostic) = &outcome.diagnostic {
                    let _ = writeln!(out, "    note: {diagnostic}");
                }
                for witness in &outcome.successes {
                    for (i, line) in witness.lines().enumerate() {
                        let prefix = if i == 0 { "    + " } else { "      " };
                        let _ = writeln!(out, "{prefix}{line}");
                    }
                }
                for witness in &outcome.counterexamples {
                    for (i, line) in witness.lines().enumerate() {
                        let prefix = if i == 0 { "    - " } else { "      " };
                        let _ = writeln!(out, "{prefix}{line}");
                    }
                }
                if let Some(history) = report.constraints_history.get(property) {
                    for (iteration, constraints) in history.iter().enumerate() {
                        let _ = writeln!(
                            out,
                            "    refinement {}: {}",
                            iteration + 1,
                            constraints.join("; ")
                        );
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::EvaluationOutcome;

    fn sample_outcome() -> PropertyOutcome {
        PropertyOutcome::from_evaluation(
            EvaluationOutcome {
                holds: false,
                successes: vec![],
                counterexamples: vec![
                    "sub(5, 3): 2\n\tsub(3, 5): -2".into(),
                    "sub(1, 0): 1\n\tsub(0, 1): -1".into(),
                ],
                stats: EvalStats {
                    total_count: 10,
                    success_count: 8,
                },
            },
            1,
        )
    }

    #[test]
    fn counterexamples_are_truncated_for_reporting() {
        let outcome = sample_outcome();
        assert_eq!(outcome.counterexamples.len(), 1);
        assert_eq!(outcome.verdict, Verdict::DoesNotHold);
        assert!((outcome.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn json_shape_matches_the_schema() {
        let mut results = RunResults::new();
        results
            .pair_mut("sub")
            .outcomes
            .insert("Commutativity".into(), sample_outcome());
        results
            .pair_mut("sub")
            .constraints_history
            .insert("Commutativity".into(), vec![vec!["int(<b>) != 0".into()]]);

        let json = results.to_json();
        let outcome = &json["results"]["sub"]["outcomes"]["Commutativity"];
        assert_eq!(outcome["holds"], serde_json::json!(false));
        assert_eq!(outcome["verdict"], serde_json::json!("does_not_hold"));
        assert_eq!(outcome["stats"]["total_count"], serde_json::json!(10));
        assert_eq!(
            json["results"]["sub"]["constraints_history"]["Commutativity"][0][0],
            serde_json::json!("int(<b>) != 0")
        );
    }

    #[test]
    fn inconclusive_reports_zero_confidence_with_diagnostic() {
        let outcome = PropertyOutcome::inconclusive("no applicable inputs");
        assert_eq!(outcome.verdict, Verdict::Inconclusive);
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.diagnostic.as_deref(), Some("no applicable inputs"));
    }

    #[test]
    fn text_rendering_mentions_verdicts() {
        let mut results = RunResults::new();
        results
            .pair_mut("sub")
            .outcomes
            .insert("Commutativity".into(), sample_outcome());
        let text = results.render_text();
        assert!(text.contains("sub:"));
        assert!(text.contains("Commutativity: does not hold (80.0%, 8/10)"));
    }
}
