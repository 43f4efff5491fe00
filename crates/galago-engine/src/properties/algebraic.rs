//! Algebraic templates: associativity and the idempotence family.

use crate::errors::ArityError;
use crate::fut::{CombinedFunctionUnderTest, Outcome};
use crate::value::Value;

use super::{
    arg_points, element_pool, finish, no_valid_inputs, Category, EvalOptions, EvaluationOutcome,
    PropertyTemplate, TemplateKind,
};

pub fn associativity() -> PropertyTemplate {
    PropertyTemplate {
        name: "Associativity".into(),
        category: Category::Algebraic,
        description: "Tests if f(a, f(b, c)) equals f(f(a, b), c)".into(),
        input_arity: 3,
        function_arity: 2,
        num_functions: 1,
        kind: TemplateKind::Associativity,
    }
}

pub fn idempotence() -> PropertyTemplate {
    PropertyTemplate {
        name: "Idempotence".into(),
        category: Category::Algebraic,
        description: "Tests if f(f(a)) equals f(a)".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::Idempotence,
    }
}

pub fn binary_idempotence() -> PropertyTemplate {
    PropertyTemplate {
        name: "BinaryIdempotence".into(),
        category: Category::Algebraic,
        description: "Tests if f(a, a) equals a".into(),
        input_arity: 1,
        function_arity: 2,
        num_functions: 1,
        kind: TemplateKind::BinaryIdempotence,
    }
}

use super::{call_outcome, chain};

pub(crate) fn eval_associativity(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, 3);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        let (a, b, c) = (&args[0], &args[1], &args[2]);
        total += 1;

        let bc = call_outcome(fut, 0, &[b.clone(), c.clone()])?;
        let r1 = chain(fut, 0, &bc, |v| vec![a.clone(), v.clone()])?;

        let ab = call_outcome(fut, 0, &[a.clone(), b.clone()])?;
        let r2 = chain(fut, 0, &ab, |v| vec![v.clone(), c.clone()])?;

        if !fut.compare(&r1, &r2) {
            counterexamples.push(format!(
                "{f}({a}, {f}({b}, {c})): {r1}\n\t{f}({f}({a}, {b}), {c}): {r2}"
            ));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!("{f}(a, {f}(b, c)) == {f}({f}(a, b), c) for all tested inputs"),
        counterexamples,
        total,
    ))
}

pub(crate) fn eval_idempotence(
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
        if !fut.compare(&twice, &once) {
            counterexamples.push(format!("{f}({f}({a})): {twice}\n\t{f}({a}): {once}"));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!("{f}({f}(a)) == {f}(a) for all tested inputs"),
        counterexamples,
        total,
    ))
}

pub(crate) fn eval_binary_idempotence(
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
        let record = fut.call(0, &[a.clone(), a.clone()])?;
        if !fut.compare(&record.outcome, &Outcome::Ok(a.clone())) {
            counterexamples.push(format!("{}\n\tExpected: {a}", record.render()));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!("{f}(a, a) == a for all tested inputs"),
        counterexamples,
        total,
    ))
}
