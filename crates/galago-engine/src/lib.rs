#![doc = include_str!("../README.md")]

//! Galago property inference engine.
//!
//! This crate hosts the full pipeline: grammar-driven input generation,
//! typed-input parsing, function-under-test wrapping, the property template
//! library and registry, the inference orchestrator, and the
//! constraint-refinement feedback loop.

pub mod engine;
pub mod errors;
pub mod fut;
pub mod generate;
pub mod input;
pub mod properties;
pub mod refine;
pub mod result;
pub mod value;

pub use engine::{GrammarConfig, InferenceConfig, InferenceEngine};
pub use fut::{
    CombinedFunctionUnderTest, ComparisonStrategy, FunctionUnderTest, InvocationRecord, Outcome,
    ResultComparator,
};
pub use generate::{Generator, GeneratorOptions, GeneratorTable};
pub use input::{InputParser, ParserMode};
pub use properties::{
    arithmetic_registry, cryptographic_registry, data_structure_registry, logical_registry,
    minimal_registry, standard_registry, Category, EvaluationOutcome, PropertyRegistry,
    PropertyTemplate,
};
pub use refine::{ConstraintOracle, OracleRequest, OracleResponse, RuleBasedOracle};
pub use result::{PropertyOutcome, RunResults, Verdict};
pub use value::{Shape, Value};
