//! The property template library and registry.
//!
//! A template is a named predicate over one or more function-under-test
//! traces. Templates are plain data: a tagged [`TemplateKind`] carries the
//! per-template parameters and evaluation dispatches on the variant.

pub mod algebraic;
pub mod behavioral;
pub mod compositional;
pub mod structural;

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::{ArityError, EngineError};
use crate::fut::CombinedFunctionUnderTest;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Structural,
    Algebraic,
    Compositional,
    Behavioral,
    Cryptographic,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Structural => write!(f, "Structural"),
            Category::Algebraic => write!(f, "Algebraic"),
            Category::Compositional => write!(f, "Compositional"),
            Category::Behavioral => write!(f, "Behavioral"),
            Category::Cryptographic => write!(f, "Cryptographic"),
        }
    }
}

/// Per-template parameters; the variant tag doubles as the evaluation
/// procedure selector.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateKind {
    Commutativity { swap: (usize, usize) },
    /// `f(a, b) == -f(b, a)` for numeric codomains.
    AntiCommutativity,
    Associativity,
    /// `f(f(a)) == f(a)` for unary functions.
    Idempotence,
    /// `f(a, a) == a` for binary functions.
    BinaryIdempotence,
    IdentityElement { positions: Vec<usize>, targets: Vec<usize> },
    AbsorbingElement { positions: Vec<usize>, targets: Vec<usize> },
    FixedPoint,
    Injectivity,
    ShapePreservation,
    MonotonicallyIncreasing,
    MonotonicallyDecreasing,
    Determinism { runs: usize },
    /// `f(f(x)) == x` for a single function.
    Involution,
    NonIdentity,
    Avalanche,
    LeftComposition { result_index: usize },
    RightComposition { result_index: usize },
    /// `f(g(x)) == x` across a function pair.
    InverseComposition { result_index: usize },
    LeftDistributivity,
    RightDistributivity,
    Distributivity,
    Homomorphism,
    ScalarHomomorphism,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EvalStats {
    pub total_count: usize,
    pub success_count: usize,
}

/// The verdict of one template evaluation over a sample.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationOutcome {
    pub holds: bool,
    pub successes: Vec<String>,
    pub counterexamples: Vec<String>,
    pub stats: EvalStats,
}

impl EvaluationOutcome {
    /// `success_count / total_count`; 100% whenever the property holds, 0%
    /// with no applicable inputs.
    pub fn confidence(&self) -> f64 {
        if self.holds {
            return 1.0;
        }
        if self.stats.total_count == 0 {
            return 0.0;
        }
        self.stats.success_count as f64 / self.stats.total_count as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub max_counterexamples: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_counterexamples: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTemplate {
    pub name: String,
    pub category: Category,
    pub description: String,
    pub input_arity: usize,
    pub function_arity: usize,
    pub num_functions: usize,
    pub kind: TemplateKind,
}

impl PropertyTemplate {
    /// Arity/function-count gate. Incompatible pairings are skipped
    /// silently by the engine and contribute no tests.
    pub fn is_applicable(&self, fut: &CombinedFunctionUnderTest<'_>) -> bool {
        if fut.futs.len() != self.num_functions {
            return false;
        }
        match self.kind {
            // f: A -> B unary, g: K x A -> B binary.
            TemplateKind::Homomorphism | TemplateKind::ScalarHomomorphism => {
                fut.futs[0].arity() == 1 && fut.futs[1].arity() == 2
            }
            // Injectivity ranges over whole input tuples, any arity.
            TemplateKind::Injectivity => fut.futs[0].arity() >= 1,
            _ => fut
                .futs
                .iter()
                .all(|f| f.arity() == self.function_arity),
        }
    }

    /// Run the template over the sampled argument tuples. All derived
    /// calls go through the combined wrapper; statistics count points.
    pub fn evaluate(
        &self,
        fut: &CombinedFunctionUnderTest<'_>,
        samples: &[Vec<Value>],
        opts: &EvalOptions,
    ) -> Result<EvaluationOutcome, ArityError> {
        match &self.kind {
            TemplateKind::Commutativity { swap } => {
                structural::eval_swap_arguments(self, *swap, fut, samples, opts)
            }
            TemplateKind::AntiCommutativity => {
                structural::eval_anti_commutativity(fut, samples, opts)
            }
            TemplateKind::Associativity => algebraic::eval_associativity(fut, samples, opts),
            TemplateKind::Idempotence => algebraic::eval_idempotence(fut, samples, opts),
            TemplateKind::BinaryIdempotence => {
                algebraic::eval_binary_idempotence(fut, samples, opts)
            }
            TemplateKind::IdentityElement { positions, targets } => {
                structural::eval_candidate_element(
                    self, positions, targets, structural::ElementRole::Identity, fut, samples, opts,
                )
            }
            TemplateKind::AbsorbingElement { positions, targets } => {
                structural::eval_candidate_element(
                    self,
                    positions,
                    targets,
                    structural::ElementRole::Absorbing,
                    fut,
                    samples,
                    opts,
                )
            }
            TemplateKind::FixedPoint => structural::eval_fixed_point(fut, samples, opts),
            TemplateKind::Injectivity => structural::eval_injectivity(fut, samples, opts),
            TemplateKind::ShapePreservation => {
                structural::eval_shape_preservation(fut, samples, opts)
            }
            TemplateKind::MonotonicallyIncreasing => {
                structural::eval_monotonicity(fut, samples, opts, true)
            }
            TemplateKind::MonotonicallyDecreasing => {
                structural::eval_monotonicity(fut, samples, opts, false)
            }
            TemplateKind::Determinism { runs } => {
                behavioral::eval_determinism(fut, samples, opts, *runs)
            }
            TemplateKind::Involution => behavioral::eval_involution(fut, samples, opts),
            TemplateKind::NonIdentity => behavioral::eval_non_identity(fut, samples, opts),
            TemplateKind::Avalanche => behavioral::eval_avalanche(fut, samples, opts),
            TemplateKind::LeftComposition { result_index } => {
                compositional::eval_composition(fut, samples, opts, *result_index, compositional::CompositionKind::Left)
            }
            TemplateKind::RightComposition { result_index } => {
                compositional::eval_composition(fut, samples, opts, *result_index, compositional::CompositionKind::Right)
            }
            TemplateKind::InverseComposition { result_index } => {
                compositional::eval_composition(fut, samples, opts, *result_index, compositional::CompositionKind::Inverse)
            }
            TemplateKind::LeftDistributivity => {
                compositional::eval_distributivity(fut, samples, opts, compositional::DistSide::Left)
            }
            TemplateKind::RightDistributivity => {
                compositional::eval_distributivity(fut, samples, opts, compositional::DistSide::Right)
            }
            TemplateKind::Distributivity => compositional::eval_both_distributivity(fut, samples, opts),
            TemplateKind::Homomorphism => compositional::eval_homomorphism(fut, samples, opts),
            TemplateKind::ScalarHomomorphism => {
                compositional::eval_scalar_homomorphism(fut, samples, opts)
            }
        }
    }
}

impl fmt::Display for PropertyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (arity: {}/{})",
            self.name, self.input_arity, self.function_arity
        )
    }
}

// ---------------------------------------------------------------------------
// Shared evaluation helpers
// ---------------------------------------------------------------------------

/// Argument points of width `k`. Tuples wide enough contribute their first
/// `k` values directly; when no tuple is wide enough (e.g. an arity-3
/// template over a pair grammar) points are assembled from sliding windows
/// over the flattened value pool.
pub(crate) fn arg_points(samples: &[Vec<Value>], k: usize) -> Vec<Vec<Value>> {
    let direct: Vec<Vec<Value>> = samples
        .iter()
        .filter(|sample| sample.len() >= k)
        .map(|sample| sample[..k].to_vec())
        .collect();
    if !direct.is_empty() || k == 0 {
        return direct;
    }
    let flat: Vec<Value> = samples.iter().flatten().cloned().collect();
    if flat.len() < k {
        return Vec::new();
    }
    flat.windows(k).map(|w| w.to_vec()).collect()
}

/// Distinct values across all samples, first occurrence first.
pub(crate) fn element_pool(samples: &[Vec<Value>]) -> Vec<Value> {
    let mut pool: Vec<Value> = Vec::new();
    for value in samples.iter().flatten() {
        if !pool.contains(value) {
            pool.push(value.clone());
        }
    }
    pool
}

pub(crate) fn call_outcome(
    fut: &CombinedFunctionUnderTest<'_>,
    idx: usize,
    args: &[Value],
) -> Result<crate::fut::Outcome, ArityError> {
    Ok(fut.call(idx, args)?.outcome)
}

/// Feed one outcome into the next call; an inner error short-circuits into
/// the outer outcome, so it surfaces as a non-equal comparison.
pub(crate) fn chain(
    fut: &CombinedFunctionUnderTest<'_>,
    idx: usize,
    inner: &crate::fut::Outcome,
    build: impl Fn(&Value) -> Vec<Value>,
) -> Result<crate::fut::Outcome, ArityError> {
    match inner.ok_value() {
        Some(value) => call_outcome(fut, idx, &build(value)),
        None => Ok(inner.clone()),
    }
}

pub(crate) fn no_valid_inputs() -> EvaluationOutcome {
    EvaluationOutcome {
        holds: false,
        successes: Vec::new(),
        counterexamples: vec!["No valid inputs found".into()],
        stats: EvalStats {
            total_count: 0,
            success_count: 0,
        },
    }
}

/// The common "every point must pass" wrap-up.
pub(crate) fn finish(
    success_message: String,
    counterexamples: Vec<String>,
    total: usize,
) -> EvaluationOutcome {
    let holds = counterexamples.is_empty();
    EvaluationOutcome {
        holds,
        successes: if holds {
            vec![success_message]
        } else {
            Vec::new()
        },
        stats: EvalStats {
            total_count: total,
            success_count: total - counterexamples.len(),
        },
        counterexamples,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name-keyed template registry with category filters. Registries compose
/// by union; the first occurrence of a name wins.
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    templates: IndexMap<String, PropertyTemplate>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: PropertyTemplate) -> Result<&mut Self, EngineError> {
        if self.templates.contains_key(&template.name) {
            return Err(EngineError::DuplicateTemplate(template.name));
        }
        self.templates.insert(template.name.clone(), template);
        Ok(self)
    }

    pub fn by_name(&self, name: &str) -> Option<&PropertyTemplate> {
        self.templates.get(name)
    }

    pub fn by_category(&self, category: Category) -> Vec<&PropertyTemplate> {
        self.templates
            .values()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn get_all(&self) -> impl Iterator<Item = &PropertyTemplate> {
        self.templates.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Union of two registries; duplicates are dropped on first occurrence.
    /// `union(r, r)` is `r`.
    pub fn union(mut self, other: PropertyRegistry) -> PropertyRegistry {
        for (name, template) in other.templates {
            self.templates.entry(name).or_insert(template);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Bundles
// ---------------------------------------------------------------------------

fn register_all(templates: Vec<PropertyTemplate>) -> PropertyRegistry {
    let mut registry = PropertyRegistry::new();
    for template in templates {
        // Bundle constructors never produce duplicate names.
        let _ = registry.register(template);
    }
    registry
}

/// Every available template.
pub fn standard_registry() -> PropertyRegistry {
    register_all(vec![
        structural::commutativity(),
        structural::anti_commutativity(),
        algebraic::associativity(),
        algebraic::idempotence(),
        algebraic::binary_idempotence(),
        structural::left_identity_element(),
        structural::right_identity_element(),
        structural::identity_element(),
        structural::left_absorbing_element(),
        structural::right_absorbing_element(),
        structural::absorbing_element(),
        structural::fixed_point(),
        structural::injectivity(),
        structural::shape_preservation(),
        structural::monotonically_increasing(),
        structural::monotonically_decreasing(),
        behavioral::determinism(),
        behavioral::involution(),
        behavioral::non_identity(),
        behavioral::avalanche(),
        compositional::left_composition(),
        compositional::right_composition(),
        compositional::inverse_composition(),
        compositional::left_distributivity(),
        compositional::right_distributivity(),
        compositional::distributivity(),
        compositional::homomorphism(),
        compositional::scalar_homomorphism(),
    ])
}

/// The special-element scans only.
pub fn minimal_registry() -> PropertyRegistry {
    register_all(vec![
        structural::left_identity_element(),
        structural::right_identity_element(),
        structural::identity_element(),
        structural::left_absorbing_element(),
        structural::right_absorbing_element(),
        structural::absorbing_element(),
    ])
}

/// Laws relevant to binary arithmetic operators.
pub fn arithmetic_registry() -> PropertyRegistry {
    register_all(vec![
        structural::commutativity(),
        algebraic::associativity(),
        algebraic::binary_idempotence(),
        structural::identity_element(),
        structural::absorbing_element(),
        structural::injectivity(),
    ])
}

/// Laws relevant to boolean connectives (and, or, xor, …).
pub fn logical_registry() -> PropertyRegistry {
    register_all(vec![
        structural::commutativity(),
        algebraic::associativity(),
        algebraic::binary_idempotence(),
        structural::identity_element(),
        structural::absorbing_element(),
        compositional::distributivity(),
    ])
}

/// Laws relevant to collection-merging operations (union, merge, …).
pub fn data_structure_registry() -> PropertyRegistry {
    register_all(vec![
        structural::commutativity(),
        algebraic::associativity(),
        algebraic::binary_idempotence(),
        structural::identity_element(),
    ])
}

/// Behavioral checks for hash-like and cipher-like functions.
pub fn cryptographic_registry() -> PropertyRegistry {
    register_all(vec![
        behavioral::determinism(),
        behavioral::non_identity(),
        behavioral::avalanche(),
        structural::injectivity(),
    ])
}
