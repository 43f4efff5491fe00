//! Function-under-test wrappers: invocation capture, argument conversion,
//! and result comparison across one or more registered callables.

use std::fmt;
use std::time::{Duration, Instant};

use crate::errors::ArityError;
use crate::value::{render_args, Value};

pub type NativeFn = Box<dyn Fn(&[Value]) -> Result<Value, String>>;
pub type ArgConverter = Box<dyn Fn(&Value) -> Value>;

/// An equivalence relation over a callable's codomain, guarded by an
/// accept-predicate that says whether the comparator understands a pair of
/// operands at all.
#[derive(Clone, Copy)]
pub struct ResultComparator {
    pub name: &'static str,
    pub accepts: fn(&Value, &Value) -> bool,
    pub equal: fn(&Value, &Value) -> bool,
}

impl ResultComparator {
    /// Numeric comparator: accepts number pairs, equates across int/float.
    pub fn numeric() -> Self {
        Self {
            name: "numeric",
            accepts: |a, b| a.is_numeric() && b.is_numeric(),
            equal: |a, b| a == b,
        }
    }

    /// Tolerant float comparator for functions whose result accumulates
    /// rounding error (1e-9 absolute).
    pub fn approx_numeric() -> Self {
        Self {
            name: "approx_numeric",
            accepts: |a, b| a.is_numeric() && b.is_numeric(),
            equal: |a, b| match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => {
                    (x.is_nan() && y.is_nan()) || x == y || (x - y).abs() < 1e-9
                }
                _ => false,
            },
        }
    }
}

impl fmt::Debug for ResultComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultComparator({})", self.name)
    }
}

/// How a single invocation ended. Errors thrown by the callable never
/// propagate; they are captured here.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ok(Value),
    Error { kind: String, message: String },
}

impl Outcome {
    pub fn ok_value(&self) -> Option<&Value> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok(value) => write!(f, "{value}"),
            Outcome::Error { kind, message } => write!(f, "Error({kind}): {message}"),
        }
    }
}

/// Immutable record of one invocation: `(fut, input tuple, outcome)`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRecord {
    pub fut: String,
    pub args: Vec<Value>,
    pub outcome: Outcome,
}

impl InvocationRecord {
    /// The witness rendering: `add(3, -7): -4`.
    pub fn render(&self) -> String {
        format!("{}({}): {}", self.fut, render_args(&self.args), self.outcome)
    }
}

/// A registered callable plus its metadata: declared arity, optional
/// per-argument converter, optional result comparator, and an optional
/// per-call wall-clock budget (disabled by default).
pub struct FunctionUnderTest {
    name: String,
    namespace: String,
    arity: usize,
    func: NativeFn,
    converter: Option<ArgConverter>,
    comparator: Option<ResultComparator>,
    call_budget: Option<Duration>,
}

impl FunctionUnderTest {
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            arity,
            func: Box::new(func),
            converter: None,
            comparator: None,
            call_budget: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_converter(mut self, converter: impl Fn(&Value) -> Value + 'static) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    pub fn with_comparator(mut self, comparator: ResultComparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn with_call_budget(mut self, budget: Duration) -> Self {
        self.call_budget = Some(budget);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn comparator(&self) -> Option<&ResultComparator> {
        self.comparator.as_ref()
    }

    /// Invoke the callable with converted arguments, capturing the outcome.
    /// Only an argument-count mismatch is an error here; everything the
    /// callable itself does wrong ends up inside the record.
    pub fn invoke(&self, args: &[Value]) -> Result<InvocationRecord, ArityError> {
        if args.len() != self.arity {
            return Err(ArityError {
                fut: self.name.clone(),
                expected: self.arity,
                actual: args.len(),
            });
        }
        let converted: Vec<Value> = match &self.converter {
            Some(convert) => args.iter().map(|arg| convert(arg)).collect(),
            None => args.to_vec(),
        };
        let started = Instant::now();
        let outcome = match (self.func)(&converted) {
            Ok(value) => match self.call_budget {
                Some(budget) if started.elapsed() > budget => Outcome::Error {
                    kind: "timeout".into(),
                    message: format!("call exceeded {}ms budget", budget.as_millis()),
                },
                _ => Outcome::Ok(value),
            },
            Err(message) => Outcome::Error {
                kind: "invocation".into(),
                message,
            },
        };
        Ok(InvocationRecord {
            fut: self.name.clone(),
            args: converted,
            outcome,
        })
    }
}

impl fmt::Debug for FunctionUnderTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionUnderTest")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("has_converter", &self.converter.is_some())
            .field("comparator", &self.comparator)
            .finish()
    }
}

/// Strategy for reconciling multiple result comparators when a template
/// spans several functions under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonStrategy {
    /// First comparator whose accept-predicate passes decides.
    FirstCompatible,
    /// Every accepting comparator must agree; disagreement means unequal.
    Consensus,
    /// Equal only if every accepting comparator says equal.
    MostRestrictive,
}

impl std::str::FromStr for ComparisonStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(ComparisonStrategy::FirstCompatible),
            "consensus" => Ok(ComparisonStrategy::Consensus),
            "restrictive" => Ok(ComparisonStrategy::MostRestrictive),
            other => Err(format!(
                "unknown comparison strategy '{other}' (expected first|consensus|restrictive)"
            )),
        }
    }
}

/// One or more functions under test bundled for a template evaluation, so
/// multi-function templates (distributivity, homomorphism, …) can invoke
/// each member by index.
pub struct CombinedFunctionUnderTest<'a> {
    pub futs: Vec<&'a FunctionUnderTest>,
    pub strategy: ComparisonStrategy,
}

impl<'a> CombinedFunctionUnderTest<'a> {
    pub fn new(futs: Vec<&'a FunctionUnderTest>, strategy: ComparisonStrategy) -> Self {
        Self { futs, strategy }
    }

    pub fn single(fut: &'a FunctionUnderTest, strategy: ComparisonStrategy) -> Self {
        Self {
            futs: vec![fut],
            strategy,
        }
    }

    pub fn names(&self) -> String {
        self.futs
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn call(&self, idx: usize, args: &[Value]) -> Result<InvocationRecord, ArityError> {
        self.futs[idx].invoke(args)
    }

    /// Outcome comparison: an error on either side is never equal.
    pub fn compare(&self, a: &Outcome, b: &Outcome) -> bool {
        match (a.ok_value(), b.ok_value()) {
            (Some(x), Some(y)) => self.compare_values(x, y),
            _ => false,
        }
    }

    /// Value comparison under the configured strategy. When no registered
    /// comparator accepts the pair, falls back to structural equality.
    pub fn compare_values(&self, x: &Value, y: &Value) -> bool {
        let accepting: Vec<&ResultComparator> = self
            .futs
            .iter()
            .filter_map(|f| f.comparator())
            .filter(|c| (c.accepts)(x, y))
            .collect();
        if accepting.is_empty() {
            return x == y;
        }
        match self.strategy {
            ComparisonStrategy::FirstCompatible => (accepting[0].equal)(x, y),
            ComparisonStrategy::Consensus | ComparisonStrategy::MostRestrictive => {
                accepting.iter().all(|c| (c.equal)(x, y))
            }
        }
    }
}
