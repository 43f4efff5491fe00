//! The inference orchestrator: iterate over (function, template) pairs,
//! sample inputs, evaluate, and drive the constraint-refinement feedback
//! cycle on failure.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use galago_dsl::ast::Grammar;

use crate::errors::EngineError;
use crate::fut::{CombinedFunctionUnderTest, ComparisonStrategy, FunctionUnderTest};
use crate::generate::{Generator, GeneratorOptions, GeneratorTable};
use crate::input::InputParser;
use crate::properties::{EvalOptions, PropertyRegistry, PropertyTemplate};
use crate::refine::{splice_proposals, ConstraintOracle, OracleRequest};
use crate::result::{PropertyOutcome, RunResults};
use crate::value::Value;

/// A grammar plus the textual constraints the host wants layered on top of
/// it before any generation happens.
#[derive(Debug, Clone)]
pub struct GrammarConfig {
    pub grammar: Grammar,
    pub extra_constraints: Vec<String>,
}

impl GrammarConfig {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            extra_constraints: Vec::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.extra_constraints = constraints;
        self
    }
}

/// Per-run configuration. Owns the registry, the functions under test, and
/// every knob of the pipeline; there is no process-wide state.
pub struct InferenceConfig {
    pub registry: PropertyRegistry,
    pub futs: Vec<FunctionUnderTest>,
    /// Restrict evaluation to these template names (empty = all).
    pub property_filter: Vec<String>,
    pub default_grammar: Option<GrammarConfig>,
    pub fut_grammars: IndexMap<String, GrammarConfig>,
    pub default_parser: InputParser,
    pub fut_parsers: IndexMap<String, InputParser>,
    pub example_count: usize,
    pub max_counterexamples: usize,
    /// Widen the in-evaluation retention budget to `max(example_count,
    /// max_counterexamples)` so the oracle sees every failing witness;
    /// reporting still truncates to `max_counterexamples`. Switched on by
    /// [`InferenceConfig::with_feedback`].
    pub retain_all_counterexamples: bool,
    pub comparison_strategy: ComparisonStrategy,
    pub use_input_cache: bool,
    pub seed: u64,
    pub feedback_enabled: bool,
    pub max_feedback_attempts: usize,
    /// Feedback stops early once the observed success rate reaches this.
    pub min_success_rate: f64,
    /// Fraction of `example_count` that may fail generation/parsing before
    /// the outcome is marked inconclusive.
    pub generation_failure_budget: f64,
    pub generator_options: GeneratorOptions,
}

impl InferenceConfig {
    pub fn new(registry: PropertyRegistry) -> Self {
        Self {
            registry,
            futs: Vec::new(),
            property_filter: Vec::new(),
            default_grammar: None,
            fut_grammars: IndexMap::new(),
            default_parser: InputParser::numbers(),
            fut_parsers: IndexMap::new(),
            example_count: 100,
            max_counterexamples: 1,
            retain_all_counterexamples: false,
            comparison_strategy: ComparisonStrategy::Consensus,
            use_input_cache: false,
            seed: 0,
            feedback_enabled: false,
            max_feedback_attempts: 5,
            min_success_rate: 0.95,
            generation_failure_budget: 0.25,
            generator_options: GeneratorOptions::default(),
        }
    }

    pub fn add_function(mut self, fut: FunctionUnderTest) -> Self {
        self.futs.push(fut);
        self
    }

    /// Register a function with its own grammar and/or parser override.
    pub fn add_function_with(
        mut self,
        fut: FunctionUnderTest,
        grammar: Option<GrammarConfig>,
        parser: Option<InputParser>,
    ) -> Self {
        if let Some(grammar) = grammar {
            self.fut_grammars.insert(fut.name().to_owned(), grammar);
        }
        if let Some(parser) = parser {
            self.fut_parsers.insert(fut.name().to_owned(), parser);
        }
        self.futs.push(fut);
        self
    }

    pub fn set_default_grammar(mut self, grammar: GrammarConfig) -> Self {
        self.default_grammar = Some(grammar);
        self
    }

    pub fn set_default_parser(mut self, parser: InputParser) -> Self {
        self.default_parser = parser;
        self
    }

    pub fn add_property_by_name(mut self, name: &str) -> Result<Self, EngineError> {
        if self.registry.by_name(name).is_none() {
            return Err(EngineError::UnknownProperty(name.to_owned()));
        }
        if !self.property_filter.iter().any(|n| n == name) {
            self.property_filter.push(name.to_owned());
        }
        Ok(self)
    }

    pub fn with_example_count(mut self, count: usize) -> Self {
        self.example_count = count;
        self
    }

    pub fn with_max_counterexamples(mut self, count: usize) -> Self {
        self.max_counterexamples = count;
        self
    }

    pub fn with_comparison_strategy(mut self, strategy: ComparisonStrategy) -> Self {
        self.comparison_strategy = strategy;
        self
    }

    pub fn with_input_cache(mut self, enabled: bool) -> Self {
        self.use_input_cache = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable the constraint-refinement feedback cycle. Also widens
    /// counterexample retention so the oracle sees complete evidence.
    pub fn with_feedback(mut self, max_attempts: usize) -> Self {
        self.feedback_enabled = true;
        self.max_feedback_attempts = max_attempts;
        self.retain_all_counterexamples = true;
        self
    }
}

struct SampleSet {
    samples: Vec<Vec<Value>>,
    failures: usize,
}

/// Single-threaded by contract: sampling, invocation, and evaluation run
/// sequentially, so a run is reproducible from `(grammar, seed,
/// example_count)` alone.
pub struct InferenceEngine {
    config: InferenceConfig,
    table: GeneratorTable,
    oracle: Option<Box<dyn ConstraintOracle>>,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            table: GeneratorTable::builtin(),
            oracle: None,
        }
    }

    /// Replace the semantic-generator table (e.g. to add host-registered
    /// generators beyond the built-ins).
    pub fn with_generator_table(mut self, table: GeneratorTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_oracle(mut self, oracle: Box<dyn ConstraintOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Run inference for every applicable (function, template) pair and
    /// aggregate outcomes plus refinement history.
    pub fn run(&self) -> Result<RunResults, EngineError> {
        for name in &self.config.property_filter {
            if self.config.registry.by_name(name).is_none() {
                return Err(EngineError::UnknownProperty(name.clone()));
            }
        }
        let templates: Vec<PropertyTemplate> = self
            .config
            .registry
            .get_all()
            .filter(|t| {
                self.config.property_filter.is_empty()
                    || self.config.property_filter.iter().any(|n| n == &t.name)
            })
            .cloned()
            .collect();

        let mut memo: HashMap<String, Rc<SampleSet>> = HashMap::new();
        let mut results = RunResults::new();

        for template in &templates {
            for combo in index_product(self.config.futs.len(), template.num_functions) {
                let futs: Vec<&FunctionUnderTest> =
                    combo.iter().map(|&i| &self.config.futs[i]).collect();
                let combined =
                    CombinedFunctionUnderTest::new(futs, self.config.comparison_strategy);
                if !template.is_applicable(&combined) {
                    continue;
                }
                let Some(grammar_cfg) = self.grammar_for(&combined) else {
                    continue;
                };
                let Some(parser) = self.parser_for(&combined) else {
                    continue;
                };
                debug!(property = %template.name, fut = %combined.names(), "evaluating pair");
                let Some((outcome, history)) =
                    self.evaluate_pair(template, &combined, &grammar_cfg, &parser, &mut memo)?
                else {
                    continue;
                };
                let pair = results.pair_mut(&combined.names());
                pair.outcomes.insert(template.name.clone(), outcome);
                if !history.is_empty() {
                    pair.constraints_history
                        .insert(template.name.clone(), history);
                }
            }
        }
        Ok(results)
    }

    /// The grammar shared by a function combination. Members must agree on
    /// the base grammar; their extra constraints are merged.
    fn grammar_for(&self, combined: &CombinedFunctionUnderTest<'_>) -> Option<GrammarConfig> {
        let mut base: Option<&GrammarConfig> = None;
        let mut constraints: Vec<String> = Vec::new();
        for fut in &combined.futs {
            let config = self
                .config
                .fut_grammars
                .get(fut.name())
                .or(self.config.default_grammar.as_ref())?;
            match &base {
                None => base = Some(config),
                Some(existing) if existing.grammar == config.grammar => {}
                Some(_) => {
                    warn!(
                        fut = %combined.names(),
                        "cannot combine different grammars; skipping combination"
                    );
                    return None;
                }
            }
            for constraint in &config.extra_constraints {
                if !constraints.contains(constraint) {
                    constraints.push(constraint.clone());
                }
            }
        }
        base.map(|b| GrammarConfig {
            grammar: b.grammar.clone(),
            extra_constraints: constraints,
        })
    }

    fn parser_for(&self, combined: &CombinedFunctionUnderTest<'_>) -> Option<InputParser> {
        let mut chosen: Option<InputParser> = None;
        for fut in &combined.futs {
            let parser = self
                .config
                .fut_parsers
                .get(fut.name())
                .copied()
                .unwrap_or(self.config.default_parser);
            match chosen {
                None => chosen = Some(parser),
                Some(existing) if existing == parser => {}
                Some(_) => {
                    warn!(
                        fut = %combined.names(),
                        "cannot combine different parsers; skipping combination"
                    );
                    return None;
                }
            }
        }
        chosen
    }

    fn sample(
        &self,
        grammar: &Grammar,
        parser: &InputParser,
        memo: &mut HashMap<String, Rc<SampleSet>>,
    ) -> Result<Rc<SampleSet>, EngineError> {
        let key = format!("{}|{:?}", grammar.fingerprint(), parser.mode);
        if let Some(cached) = memo.get(&key) {
            return Ok(cached.clone());
        }
        let mut options = self.config.generator_options;
        options.use_cache = self.config.use_input_cache;
        let mut generator =
            Generator::new(grammar.clone(), self.table.clone(), options, self.config.seed)?;
        let batch = generator.generate(self.config.example_count);
        let mut failures = batch.failures.len();
        let mut samples = Vec::new();
        for derivation in batch.derivations {
            match parser.parse(&derivation.text) {
                Ok(args) => samples.push(args),
                Err(error) => {
                    debug!(%error, "skipping unparsable sample");
                    failures += 1;
                }
            }
        }
        let set = Rc::new(SampleSet { samples, failures });
        memo.insert(key, set.clone());
        Ok(set)
    }

    /// Evaluate one pair, feeding failures through the refinement loop
    /// while it is enabled and productive. `Ok(None)` marks the pair
    /// inapplicable (arity mismatch surfaced mid-evaluation).
    fn evaluate_pair(
        &self,
        template: &PropertyTemplate,
        combined: &CombinedFunctionUnderTest<'_>,
        grammar_cfg: &GrammarConfig,
        parser: &InputParser,
        memo: &mut HashMap<String, Rc<SampleSet>>,
    ) -> Result<Option<(PropertyOutcome, Vec<Vec<String>>)>, EngineError> {
        let mut current = if grammar_cfg.extra_constraints.is_empty() {
            grammar_cfg.grammar.clone()
        } else {
            let spliced = splice_proposals(
                &grammar_cfg.grammar,
                &grammar_cfg.extra_constraints,
                &self.table,
                self.config.seed,
            );
            for rejected in &spliced.rejected {
                warn!(constraint = %rejected, "configured constraint rejected");
            }
            spliced.grammar
        };

        let retention = if self.config.retain_all_counterexamples {
            self.config.example_count.max(self.config.max_counterexamples)
        } else {
            self.config.max_counterexamples
        };
        let eval_opts = EvalOptions {
            max_counterexamples: retention,
        };
        let failure_budget = (self.config.generation_failure_budget
            * self.config.example_count as f64)
            .ceil() as usize;

        let mut history: Vec<Vec<String>> = Vec::new();
        let mut attempts = 0usize;
        loop {
            let sampled = self.sample(&current, parser, memo)?;
            if sampled.samples.is_empty() {
                return Ok(Some((
                    PropertyOutcome::inconclusive("no applicable inputs"),
                    history,
                )));
            }
            if sampled.failures > failure_budget {
                return Ok(Some((
                    PropertyOutcome::inconclusive(format!(
                        "{} of {} samples failed generation or parsing",
                        sampled.failures, self.config.example_count
                    )),
                    history,
                )));
            }

            let evaluation = match template.evaluate(combined, &sampled.samples, &eval_opts) {
                Ok(evaluation) => evaluation,
                Err(arity) => {
                    warn!(%arity, property = %template.name, "pair inapplicable");
                    return Ok(None);
                }
            };

            let done = evaluation.holds
                || !self.config.feedback_enabled
                || self.oracle.is_none()
                || evaluation.confidence() >= self.config.min_success_rate
                || attempts >= self.config.max_feedback_attempts;
            if done {
                return Ok(Some((
                    PropertyOutcome::from_evaluation(evaluation, self.config.max_counterexamples),
                    history,
                )));
            }

            attempts += 1;
            info!(
                property = %template.name,
                fut = %combined.names(),
                attempt = attempts,
                "refining grammar from counterexamples"
            );
            let request = OracleRequest {
                grammar_text: current.render(),
                property_name: template.name.clone(),
                property_description: template.description.clone(),
                counterexamples: evaluation.counterexamples.clone(),
            };
            let constraints = match self.oracle.as_ref() {
                Some(oracle) => match oracle.infer(&request) {
                    Ok(response) => response.constraints,
                    Err(error) => {
                        warn!(%error, oracle = oracle.name(), "oracle failed; treating as empty");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };
            if constraints.is_empty() {
                return Ok(Some((
                    PropertyOutcome::from_evaluation(evaluation, self.config.max_counterexamples),
                    history,
                )));
            }

            let spliced = splice_proposals(&current, &constraints, &self.table, self.config.seed);
            // Every proposal, including rejected ones, is logged to the
            // history; only valid ones narrow the grammar.
            history.push(constraints);
            if spliced.applied.is_empty() {
                return Ok(Some((
                    PropertyOutcome::from_evaluation(evaluation, self.config.max_counterexamples),
                    history,
                )));
            }
            current = spliced.grammar;
        }
    }
}

/// Ordered index tuples: every combination of `count` functions taken
/// `repeat` at a time, with repetition, in registration order.
fn index_product(count: usize, repeat: usize) -> Vec<Vec<usize>> {
    if repeat == 0 || count == 0 {
        return Vec::new();
    }
    let mut out: Vec<Vec<usize>> = vec![Vec::new()];
    for _ in 0..repeat {
        let mut next = Vec::with_capacity(out.len() * count);
        for prefix in &out {
            for i in 0..count {
                let mut tuple = prefix.clone();
                tuple.push(i);
                next.push(tuple);
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::standard_registry;

    fn int_binop(name: &str, f: fn(i64, i64) -> i64) -> FunctionUnderTest {
        FunctionUnderTest::new(name, 2, move |args| match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(f(*a, *b))),
            _ => Err("expected integers".into()),
        })
    }

    fn pairs_grammar() -> GrammarConfig {
        let source = "\
<start> ::= <number> \", \" <number>
<number> ::= \"-\"? <digit>
<digit> ::= \"0\" | \"1\" | \"2\" | \"3\" | \"4\" | \"5\" | \"6\" | \"7\" | \"8\" | \"9\"
";
        GrammarConfig::new(galago_dsl::parse(source, "pairs.fan").unwrap())
    }

    #[test]
    fn index_product_orders_pairs() {
        assert_eq!(index_product(2, 1), vec![vec![0], vec![1]]);
        assert_eq!(
            index_product(2, 2),
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
        assert!(index_product(0, 1).is_empty());
    }

    #[test]
    fn run_reports_commutativity_for_addition() {
        let config = InferenceConfig::new(standard_registry())
            .add_function(int_binop("add", |a, b| a + b))
            .set_default_grammar(pairs_grammar())
            .with_example_count(30)
            .with_seed(5)
            .add_property_by_name("Commutativity")
            .unwrap();
        let results = InferenceEngine::new(config).run().unwrap();
        let outcome = &results.results["add"].outcomes["Commutativity"];
        assert!(outcome.holds);
        assert_eq!(outcome.confidence, 1.0);
    }

    #[test]
    fn unknown_property_filter_is_an_error() {
        let config = InferenceConfig::new(standard_registry());
        assert!(config.add_property_by_name("NotAProperty").is_err());
    }

    #[test]
    fn missing_grammar_skips_the_pair_silently() {
        let config = InferenceConfig::new(standard_registry())
            .add_function(int_binop("add", |a, b| a + b))
            .add_property_by_name("Commutativity")
            .unwrap();
        let results = InferenceEngine::new(config).run().unwrap();
        assert!(results.results.is_empty());
    }

    #[test]
    fn determinism_is_reproducible_across_runs() {
        let build = || {
            InferenceConfig::new(standard_registry())
                .add_function(int_binop("sub", |a, b| a - b))
                .set_default_grammar(pairs_grammar())
                .with_example_count(25)
                .with_seed(42)
                .with_max_counterexamples(3)
        };
        let first = InferenceEngine::new(build()).run().unwrap();
        let second = InferenceEngine::new(build()).run().unwrap();
        assert_eq!(first.to_json(), second.to_json());
    }
}
