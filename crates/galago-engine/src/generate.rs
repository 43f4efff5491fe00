//! Grammar-driven input generation: top-down random expansion with depth
//! bounding, bounded-geometric repetition, semantic-generator hooks,
//! `where`-predicate rejection sampling, and a bounded input cache keyed by
//! grammar version.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use galago_dsl::ast::{Alternative, ElementKind, Grammar, Production, Repeat};
use galago_dsl::constraint::{CmpOp, Constraint, Operand};
use galago_dsl::errors::SemanticError;

use crate::errors::GenerationError;
use crate::value::Value;

/// Maximum sampled repetition length (`*`/`+`).
const MAX_REPEAT: usize = 12;
/// Continue-probability of the bounded geometric repetition sampler; gives
/// a mean length of 3.
const REPEAT_CONTINUE: f64 = 0.75;

/// A value produced by a semantic generator, together with its rendering in
/// the generated string.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticValue {
    pub rendered: String,
    pub value: Value,
}

pub type GeneratorFn = Rc<dyn Fn(&[f64], &mut StdRng) -> SemanticValue>;

/// Named semantic generators referenced by `:= name(args)` hooks. The
/// parser never executes snippets; they resolve here at generation time.
/// Cloning is cheap (the callables are shared), so every grammar version
/// spawned by the feedback loop can carry its own generator.
#[derive(Clone)]
pub struct GeneratorTable {
    entries: IndexMap<String, GeneratorFn>,
}

impl GeneratorTable {
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Table with the built-in generators used by the canonical grammars:
    /// `gauss(mu, sigma)`, `uniform(lo, hi)`, and `char(lo, hi)`.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.register("gauss", |args, rng| {
            let mu = args.first().copied().unwrap_or(0.0);
            let sigma = args.get(1).copied().unwrap_or(1.0);
            // Box-Muller transform over the seeded stream.
            let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
            let u2: f64 = rng.gen();
            let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
            let drawn = (mu + sigma * z).round() as i64;
            SemanticValue {
                rendered: drawn.to_string(),
                value: Value::Int(drawn),
            }
        });
        table.register("uniform", |args, rng| {
            let lo = args.first().copied().unwrap_or(0.0) as i64;
            let hi = (args.get(1).copied().unwrap_or(1.0) as i64).max(lo);
            let drawn = rng.gen_range(lo..=hi);
            SemanticValue {
                rendered: drawn.to_string(),
                value: Value::Int(drawn),
            }
        });
        table.register("char", |args, rng| {
            let lo = args.first().copied().unwrap_or(97.0) as u32;
            let hi = (args.get(1).copied().unwrap_or(122.0) as u32).max(lo);
            let code = rng.gen_range(lo..=hi);
            let ch = char::from_u32(code).unwrap_or('?');
            SemanticValue {
                rendered: ch.to_string(),
                value: Value::Int(code as i64),
            }
        });
        table
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[f64], &mut StdRng) -> SemanticValue + 'static,
    ) {
        self.entries.insert(name.into(), Rc::new(f));
    }

    fn get(&self, name: &str) -> Option<&GeneratorFn> {
        self.entries.get(name)
    }
}

impl Default for GeneratorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for GeneratorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorTable")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Past this depth, recursive alternatives are deprioritized.
    pub soft_depth: usize,
    /// Past this depth, only non-recursive alternatives are allowed.
    pub hard_depth: usize,
    /// Rejection-sampling budget per constrained rule expansion.
    pub constraint_attempts: usize,
    /// Suppress duplicate yields within a run.
    pub use_cache: bool,
    /// Bound on the per-version cache; oldest entries are evicted.
    pub cache_capacity: usize,
    /// How often a cache collision is resampled before the generator
    /// settles for fewer strings than requested.
    pub cache_resample: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            soft_depth: 16,
            hard_depth: 64,
            constraint_attempts: 32,
            use_cache: false,
            cache_capacity: 10_000,
            cache_resample: 8,
        }
    }
}

/// One node of a production trace. The yield of the root is the generated
/// input string; semantically generated leaves carry their raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceNode {
    pub nonterminal: String,
    pub alternative: usize,
    pub text: String,
    pub children: Vec<TraceNode>,
    pub semantic: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub text: String,
    pub trace: TraceNode,
}

/// The outcome of one `generate` call: the derivations that succeeded and
/// the per-sample failures (each failed slot was skipped, not fatal).
#[derive(Debug, Default)]
pub struct GenerationBatch {
    pub derivations: Vec<Derivation>,
    pub failures: Vec<GenerationError>,
}

enum Segment {
    Lit(String),
    Node(TraceNode),
}

pub struct Generator {
    grammar: Grammar,
    table: GeneratorTable,
    options: GeneratorOptions,
    reach: HashMap<String, HashSet<String>>,
    cache: IndexSet<String>,
    fingerprint: String,
    rng: StdRng,
}

impl Generator {
    /// Validate the grammar and set up a seeded generator for it. The same
    /// `(grammar, seed)` always produces the same sequence.
    pub fn new(
        grammar: Grammar,
        table: GeneratorTable,
        options: GeneratorOptions,
        seed: u64,
    ) -> Result<Self, SemanticError> {
        grammar.validate()?;
        let reach = grammar.reachability();
        let fingerprint = grammar.fingerprint();
        Ok(Self {
            grammar,
            table,
            options,
            reach,
            cache: IndexSet::new(),
            fingerprint,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Produce up to `count` derivations. Failed expansions skip their slot
    /// and are reported in the batch; with the cache enabled, persistent
    /// duplicates also shrink the output below `count`.
    pub fn generate(&mut self, count: usize) -> GenerationBatch {
        let mut batch = GenerationBatch::default();
        let start = self.grammar.start().to_owned();
        'slots: for _ in 0..count {
            let mut derivation = match self.derive(&start) {
                Ok(d) => d,
                Err(e) => {
                    batch.failures.push(e);
                    continue;
                }
            };
            if self.options.use_cache {
                let mut resamples = 0;
                while self.cache.contains(&derivation.text) {
                    if resamples >= self.options.cache_resample {
                        continue 'slots; // settle for fewer strings
                    }
                    resamples += 1;
                    derivation = match self.derive(&start) {
                        Ok(d) => d,
                        Err(e) => {
                            batch.failures.push(e);
                            continue 'slots;
                        }
                    };
                }
                if self.cache.len() >= self.options.cache_capacity {
                    self.cache.shift_remove_index(0);
                }
                self.cache.insert(derivation.text.clone());
            }
            batch.derivations.push(derivation);
        }
        batch
    }

    fn derive(&mut self, start: &str) -> Result<Derivation, GenerationError> {
        let trace = self.expand_rule(start, 0)?;
        Ok(Derivation {
            text: trace.text.clone(),
            trace,
        })
    }

    fn expand_rule(&mut self, name: &str, depth: usize) -> Result<TraceNode, GenerationError> {
        let production = match self.grammar.rules.get(name) {
            Some(p) => p.clone(),
            None => {
                // validate() rules this out; guard for spliced grammars.
                return Err(GenerationError::DepthExhausted {
                    nonterminal: name.to_owned(),
                    limit: self.options.hard_depth,
                });
            }
        };

        if let Some(hook) = &production.hook {
            let generator = self.table.get(&hook.name).cloned().ok_or_else(|| {
                GenerationError::UnknownGenerator {
                    name: hook.name.clone(),
                }
            })?;
            let semantic = generator.as_ref()(&hook.args, &mut self.rng);
            return Ok(TraceNode {
                nonterminal: production.name.clone(),
                alternative: 0,
                text: semantic.rendered,
                children: Vec::new(),
                semantic: Some(semantic.value),
            });
        }

        let attempts = if production.constraints.is_empty() {
            1
        } else {
            self.options.constraint_attempts
        };
        for _ in 0..attempts {
            let alternative = self.choose_alternative(&production, depth)?;
            let mut segments =
                self.expand_alternative(&production.alternatives[alternative], depth)?;
            if self.constraints_hold(&production, &mut segments) {
                let text = segments_text(&segments);
                let children = segments
                    .into_iter()
                    .filter_map(|segment| match segment {
                        Segment::Node(node) => Some(node),
                        Segment::Lit(_) => None,
                    })
                    .collect();
                return Ok(TraceNode {
                    nonterminal: production.name.clone(),
                    alternative,
                    text,
                    children,
                    semantic: None,
                });
            }
        }
        Err(GenerationError::ConstraintExhausted {
            nonterminal: production.name.clone(),
            attempts,
        })
    }

    fn choose_alternative(
        &mut self,
        production: &Production,
        depth: usize,
    ) -> Result<usize, GenerationError> {
        let recursive: Vec<bool> = production
            .alternatives
            .iter()
            .map(|alt| self.alternative_recurses(alt, &production.name))
            .collect();
        let all: Vec<usize> = (0..production.alternatives.len()).collect();
        let non_recursive: Vec<usize> = all
            .iter()
            .copied()
            .filter(|i| !recursive[*i])
            .collect();

        let candidates: &[usize] = if depth >= self.options.hard_depth {
            if non_recursive.is_empty() {
                return Err(GenerationError::DepthExhausted {
                    nonterminal: production.name.clone(),
                    limit: self.options.hard_depth,
                });
            }
            &non_recursive
        } else if depth >= self.options.soft_depth && !non_recursive.is_empty() {
            &non_recursive
        } else {
            &all
        };
        Ok(candidates[self.rng.gen_range(0..candidates.len())])
    }

    fn alternative_recurses(&self, alternative: &Alternative, rule: &str) -> bool {
        let mut refs = HashSet::new();
        collect_alt_references(alternative, &mut refs);
        refs.iter().any(|name| {
            *name == rule
                || self
                    .reach
                    .get(*name)
                    .map(|set| set.contains(rule))
                    .unwrap_or(false)
        })
    }

    fn expand_alternative(
        &mut self,
        alternative: &Alternative,
        depth: usize,
    ) -> Result<Vec<Segment>, GenerationError> {
        let mut segments = Vec::new();
        for element in &alternative.elements {
            let count = match element.repeat {
                Repeat::Once => 1,
                Repeat::Optional => usize::from(self.rng.gen_bool(0.5)),
                Repeat::ZeroOrMore => self.sample_repeat(MAX_REPEAT),
                Repeat::OneOrMore => 1 + self.sample_repeat(MAX_REPEAT - 1),
            };
            for _ in 0..count {
                match &element.kind {
                    ElementKind::Literal(text) => segments.push(Segment::Lit(text.clone())),
                    ElementKind::Reference(name) => {
                        segments.push(Segment::Node(self.expand_rule(name, depth + 1)?))
                    }
                    ElementKind::Group(alternatives) => {
                        let pick = self.rng.gen_range(0..alternatives.len());
                        let inner = self.expand_alternative(&alternatives[pick], depth)?;
                        segments.extend(inner);
                    }
                }
            }
        }
        Ok(segments)
    }

    /// Bounded geometric length sampler (mean 3, max `max`).
    fn sample_repeat(&mut self, max: usize) -> usize {
        let mut n = 0;
        while n < max && self.rng.gen_bool(REPEAT_CONTINUE) {
            n += 1;
        }
        n
    }

    fn constraints_hold(&self, production: &Production, segments: &mut Vec<Segment>) -> bool {
        production
            .constraints
            .iter()
            .all(|constraint| check_constraint(production, constraint, segments))
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("start", &self.grammar.start())
            .field("fingerprint", &self.fingerprint)
            .field("options", &self.options)
            .finish()
    }
}

fn collect_alt_references<'a>(alternative: &'a Alternative, out: &mut HashSet<&'a str>) {
    for element in &alternative.elements {
        match &element.kind {
            ElementKind::Reference(name) => {
                out.insert(name.as_str());
            }
            ElementKind::Group(alternatives) => {
                for inner in alternatives {
                    collect_alt_references(inner, out);
                }
            }
            ElementKind::Literal(_) => {}
        }
    }
}

fn segments_text(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Lit(text) => out.push_str(text),
            Segment::Node(node) => out.push_str(&node.text),
        }
    }
    out
}

fn collect_occurrences<'a>(node: &'a TraceNode, name: &str, out: &mut Vec<&'a TraceNode>) {
    if node.nonterminal == name {
        out.push(node);
    }
    for child in &node.children {
        collect_occurrences(child, name, out);
    }
}

fn occurrence_texts(production: &Production, segments: &[Segment], name: &str) -> Vec<String> {
    if name == production.name {
        // Self-reference: the predicate constrains the yield being built.
        return vec![segments_text(segments)];
    }
    let mut nodes = Vec::new();
    for segment in segments {
        if let Segment::Node(node) = segment {
            collect_occurrences(node, name, &mut nodes);
        }
    }
    nodes.into_iter().map(|n| n.text.clone()).collect()
}

fn check_constraint(production: &Production, constraint: &Constraint, segments: &mut Vec<Segment>) -> bool {
    let lhs_nt = constraint.lhs.nonterminal().map(str::to_owned);
    let rhs_nt = constraint.rhs.nonterminal().map(str::to_owned);
    match (lhs_nt, rhs_nt) {
        (None, None) => cmp_values(
            operand_value(&constraint.lhs, None),
            operand_value(&constraint.rhs, None),
            constraint.op,
        ),
        (Some(name), None) => occurrence_texts(production, segments, &name)
            .iter()
            .all(|text| {
                cmp_values(
                    operand_value(&constraint.lhs, Some(text.as_str())),
                    operand_value(&constraint.rhs, None),
                    constraint.op,
                )
            }),
        (None, Some(name)) => occurrence_texts(production, segments, &name)
            .iter()
            .all(|text| {
                cmp_values(
                    operand_value(&constraint.lhs, None),
                    operand_value(&constraint.rhs, Some(text.as_str())),
                    constraint.op,
                )
            }),
        (Some(left), Some(right)) if left == right => {
            // Same non-terminal on both sides: adjacent occurrences pair up.
            let texts = occurrence_texts(production, segments, &left);
            texts.windows(2).all(|pair| {
                cmp_values(
                    operand_value(&constraint.lhs, Some(pair[0].as_str())),
                    operand_value(&constraint.rhs, Some(pair[1].as_str())),
                    constraint.op,
                )
            })
        }
        (Some(left), Some(right)) => {
            let lhs_texts = occurrence_texts(production, segments, &left);
            let rhs_texts = occurrence_texts(production, segments, &right);
            let satisfied = lhs_texts.iter().zip(rhs_texts.iter()).all(|(l, r)| {
                cmp_values(
                    operand_value(&constraint.lhs, Some(l.as_str())),
                    operand_value(&constraint.rhs, Some(r.as_str())),
                    constraint.op,
                )
            });
            if satisfied {
                return true;
            }
            // Solved form: `<nt> == f(len(<sibling>))` assigns the computed
            // value instead of rejecting. Only direct children are repaired;
            // deeper matches fall back to rejection sampling.
            if constraint.op == CmpOp::Eq
                && matches!(constraint.lhs, Operand::Yield(_))
                && matches!(constraint.rhs, Operand::Len(_) | Operand::Uint16Len(_))
                && left != production.name
            {
                if let Some(first_rhs) = rhs_texts.first() {
                    if let Some(computed) = operand_value(&constraint.rhs, Some(first_rhs.as_str()))
                    {
                        let text = value_text(&computed);
                        for segment in segments.iter_mut() {
                            if let Segment::Node(node) = segment {
                                if node.nonterminal == left {
                                    node.text = text.clone();
                                    node.children.clear();
                                    node.semantic = None;
                                    return true;
                                }
                            }
                        }
                    }
                }
            }
            false
        }
    }
}

fn operand_value(operand: &Operand, occurrence: Option<&str>) -> Option<Value> {
    match operand {
        Operand::Number(n) => Some(if n.fract() == 0.0 {
            Value::Int(*n as i64)
        } else {
            Value::Float(*n)
        }),
        Operand::Yield(_) => occurrence.map(|text| Value::Str(text.to_owned())),
        Operand::Int(_) => occurrence.and_then(|text| text.trim().parse::<i64>().ok().map(Value::Int)),
        Operand::Len(_) => occurrence.map(|text| Value::Int(text.chars().count() as i64)),
        Operand::Uint16Len(_) => occurrence.map(|text| {
            let n = text.chars().count();
            Value::Str(uint16_text(n))
        }),
        Operand::Abs(inner) => operand_value(inner, occurrence).and_then(|value| match value {
            Value::Int(n) => Some(Value::Int(n.abs())),
            Value::Float(n) => Some(Value::Float(n.abs())),
            _ => None,
        }),
    }
}

/// Big-endian two-byte rendering of a length, as two chars.
fn uint16_text(n: usize) -> String {
    let hi = ((n >> 8) & 0xff) as u8;
    let lo = (n & 0xff) as u8;
    let mut out = String::with_capacity(2);
    out.push(hi as char);
    out.push(lo as char);
    out
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cmp_values(lhs: Option<Value>, rhs: Option<Value>, op: CmpOp) -> bool {
    let (lhs, rhs) = match (lhs, rhs) {
        (Some(l), Some(r)) => (l, r),
        // Unevaluable operands (e.g. int() over non-numeric text) cannot
        // satisfy the predicate.
        _ => return false,
    };
    match op {
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
        CmpOp::Le => lhs <= rhs,
        CmpOp::Ge => lhs >= rhs,
        CmpOp::Lt => lhs < rhs,
        CmpOp::Gt => lhs > rhs,
    }
}
