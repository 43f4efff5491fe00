//! Behavioral templates: determinism, single-function involution, and the
//! hash-oriented non-identity / avalanche checks.

use crate::errors::ArityError;
use crate::fut::{CombinedFunctionUnderTest, Outcome};
use crate::value::Value;

use super::{
    arg_points, call_outcome, chain, element_pool, finish, no_valid_inputs, Category, EvalOptions,
    EvaluationOutcome, PropertyTemplate, TemplateKind,
};

pub fn determinism() -> PropertyTemplate {
    PropertyTemplate {
        name: "Determinism".into(),
        category: Category::Behavioral,
        description: "Tests if repeated calls with the same input agree".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::Determinism { runs: 10 },
    }
}

pub fn involution() -> PropertyTemplate {
    PropertyTemplate {
        name: "Involution".into(),
        category: Category::Behavioral,
        description: "Tests if f(f(x)) equals x".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::Involution,
    }
}

pub fn non_identity() -> PropertyTemplate {
    PropertyTemplate {
        name: "NonIdentity".into(),
        category: Category::Cryptographic,
        description: "Tests that f(a) never returns its input unchanged".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::NonIdentity,
    }
}

pub fn avalanche() -> PropertyTemplate {
    PropertyTemplate {
        name: "Avalanche".into(),
        category: Category::Cryptographic,
        description: "Tests that a single flipped input bit changes the output".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::Avalanche,
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Repeated invocation with an identical input. An invocation error is a
/// falsification here: a total deterministic function must answer.
pub(crate) fn eval_determinism(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
    runs: usize,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, 1);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        total += 1;
        let first = fut.call(0, args)?;
        let mut failure = match first.outcome {
            Outcome::Error { .. } => Some(first.render()),
            Outcome::Ok(_) => None,
        };
        if failure.is_none() {
            for run in 1..runs.max(2) {
                let repeat = fut.call(0, args)?;
                if !fut.compare(&first.outcome, &repeat.outcome) {
                    failure = Some(format!(
                        "{} on run #1\n\t{} on run #{}",
                        first.render(),
                        repeat.render(),
                        run + 1
                    ));
                    break;
                }
            }
        }
        if let Some(ce) = failure {
            counterexamples.push(ce);
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!("{f}(a) is deterministic for all tested runs"),
        counterexamples,
        total,
    ))
}

pub(crate) fn eval_involution(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let pool = element_pool(samples);
    if pool.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for a in &pool {
        total += 1;
        let once = call_outcome(fut, 0, std::slice::from_ref(a))?;
        let twice = chain(fut, 0, &once, |v| vec![v.clone()])?;
        if !fut.compare(&twice, &Outcome::Ok(a.clone())) {
            counterexamples.push(format!("{f}({f}({a})): {twice}\n\tExpected: {a}"));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!("{f}({f}(a)) == a for all tested inputs"),
        counterexamples,
        total,
    ))
}

/// `f(a) != a` for every sampled input. Errors count as counterexamples:
/// a transform that cannot process its input gives no non-identity
/// evidence.
pub(crate) fn eval_non_identity(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let pool = element_pool(samples);
    if pool.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for a in &pool {
        total += 1;
        let record = fut.call(0, std::slice::from_ref(a))?;
        let failed = match record.outcome.ok_value() {
            Some(result) => fut.compare_values(result, a),
            None => true,
        };
        if failed {
            counterexamples.push(format!("{}\n\tinput returned unchanged", record.render()));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!("{f}(a) != a for all tested inputs"),
        counterexamples,
        total,
    ))
}

/// Weak avalanche check for integer transforms: flipping one low input bit
/// must change the output. The flipped bit index cycles with the point
/// index so the probe stays deterministic.
pub(crate) fn eval_avalanche(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let pool: Vec<i64> = element_pool(samples)
        .into_iter()
        .filter_map(|v| v.as_i64())
        .collect();
    if pool.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for (index, a) in pool.iter().enumerate() {
        total += 1;
        let flipped = a ^ (1 << (index % 8));
        let base = fut.call(0, &[Value::Int(*a)])?;
        let probe = fut.call(0, &[Value::Int(flipped)])?;
        let failed = match (&base.outcome, &probe.outcome) {
            (Outcome::Ok(_), Outcome::Ok(_)) => fut.compare(&base.outcome, &probe.outcome),
            _ => true,
        };
        if failed {
            counterexamples.push(format!("{}\n\t{}", base.render(), probe.render()));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!("{f} output changes whenever one input bit flips"),
        counterexamples,
        total,
    ))
}
