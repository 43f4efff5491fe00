use thiserror::Error;

/// A single failed expansion attempt. Non-fatal: the sample is skipped and
/// counted toward the per-pair failure budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("expansion of <{nonterminal}> exceeded the hard depth limit of {limit}")]
    DepthExhausted { nonterminal: String, limit: usize },

    #[error("constraints on <{nonterminal}> rejected {attempts} candidate expansions")]
    ConstraintExhausted { nonterminal: String, attempts: usize },

    #[error("no generator named '{name}' is registered")]
    UnknownGenerator { name: String },
}

/// A generated string that could not be converted into a typed input tuple.
/// Non-fatal: the sample is skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not parse input '{text}': {reason}")]
pub struct InputParseError {
    pub text: String,
    pub reason: String,
}

/// Argument-count mismatch when invoking a function under test. Fatal for
/// the `(function, property)` pair: it is reported as inapplicable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{fut} expects {expected} argument(s), got {actual}")]
pub struct ArityError {
    pub fut: String,
    pub expected: usize,
    pub actual: usize,
}

/// Failures of the external constraint-inference oracle. Logged and treated
/// as an empty constraint list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

/// Top-level engine failures. Per the propagation policy, none of these are
/// raised from inside a single `(function, property)` evaluation; they
/// surface from configuration and setup only.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("grammar error: {0}")]
    Grammar(#[from] galago_dsl::errors::SemanticError),

    #[error("grammar parse error: {0}")]
    GrammarParse(#[from] galago_dsl::errors::ParseError),

    #[error("duplicate property template '{0}'")]
    DuplicateTemplate(String),

    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error(transparent)]
    Arity(#[from] ArityError),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_generation_errors() {
        let err = GenerationError::DepthExhausted {
            nonterminal: "expr".into(),
            limit: 64,
        };
        assert_eq!(
            err.to_string(),
            "expansion of <expr> exceeded the hard depth limit of 64"
        );

        let err = GenerationError::ConstraintExhausted {
            nonterminal: "field".into(),
            attempts: 32,
        };
        assert_eq!(
            err.to_string(),
            "constraints on <field> rejected 32 candidate expansions"
        );
    }

    #[test]
    fn display_arity_error() {
        let err = ArityError {
            fut: "add".into(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.to_string(), "add expects 2 argument(s), got 3");
    }
}
