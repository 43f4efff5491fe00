//! Compositional templates: properties relating two functions under test.

use crate::errors::ArityError;
use crate::fut::{CombinedFunctionUnderTest, Outcome};
use crate::value::Value;

use super::{
    arg_points, call_outcome, chain, element_pool, finish, no_valid_inputs, Category, EvalOptions,
    EvalStats, EvaluationOutcome, PropertyTemplate, TemplateKind,
};

pub fn left_composition() -> PropertyTemplate {
    PropertyTemplate {
        name: "LeftComposition".into(),
        category: Category::Compositional,
        description: "Checks that applying f after g yields exactly g's output".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 2,
        kind: TemplateKind::LeftComposition { result_index: 0 },
    }
}

pub fn right_composition() -> PropertyTemplate {
    PropertyTemplate {
        name: "RightComposition".into(),
        category: Category::Compositional,
        description: "Checks that f(g(x)) equals f(x)".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 2,
        kind: TemplateKind::RightComposition { result_index: 0 },
    }
}

pub fn inverse_composition() -> PropertyTemplate {
    PropertyTemplate {
        name: "InverseComposition".into(),
        category: Category::Compositional,
        description: "Checks that f(g(x)) returns the original argument".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 2,
        kind: TemplateKind::InverseComposition { result_index: 0 },
    }
}

pub fn left_distributivity() -> PropertyTemplate {
    PropertyTemplate {
        name: "LeftDistributivity".into(),
        category: Category::Compositional,
        description: "Tests left distributivity: f(a, g(b, c)) == g(f(a, b), f(a, c))".into(),
        input_arity: 3,
        function_arity: 2,
        num_functions: 2,
        kind: TemplateKind::LeftDistributivity,
    }
}

pub fn right_distributivity() -> PropertyTemplate {
    PropertyTemplate {
        name: "RightDistributivity".into(),
        category: Category::Compositional,
        description: "Tests right distributivity: f(g(a, b), c) == g(f(a, c), f(b, c))".into(),
        input_arity: 3,
        function_arity: 2,
        num_functions: 2,
        kind: TemplateKind::RightDistributivity,
    }
}

pub fn distributivity() -> PropertyTemplate {
    PropertyTemplate {
        name: "Distributivity".into(),
        category: Category::Compositional,
        description: "Tests both left and right distributivity".into(),
        input_arity: 3,
        function_arity: 2,
        num_functions: 2,
        kind: TemplateKind::Distributivity,
    }
}

pub fn homomorphism() -> PropertyTemplate {
    PropertyTemplate {
        name: "Homomorphism".into(),
        category: Category::Compositional,
        description: "Checks f(g(a, b)) == g(f(a), f(b)) for unary f and binary g".into(),
        input_arity: 2,
        function_arity: 0,
        num_functions: 2,
        kind: TemplateKind::Homomorphism,
    }
}

pub fn scalar_homomorphism() -> PropertyTemplate {
    PropertyTemplate {
        name: "ScalarHomomorphism".into(),
        category: Category::Compositional,
        description: "Checks f(g(k, a)) == g(k, f(a)) for unary f and binary g".into(),
        input_arity: 2,
        function_arity: 0,
        num_functions: 2,
        kind: TemplateKind::ScalarHomomorphism,
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompositionKind {
    /// `f(…, g(x…), …) == g(x…)`
    Left,
    /// `f(…, g(x…), …) == f(x…)`
    Right,
    /// `f(…, g(x…), …) == x[result_index]`
    Inverse,
}

pub(crate) fn eval_composition(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
    result_index: usize,
    kind: CompositionKind,
) -> Result<EvaluationOutcome, ArityError> {
    let arity = fut.futs[0].arity();
    let points = arg_points(samples, arity);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let g = fut.futs[1].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        total += 1;

        let r_g = call_outcome(fut, 1, args)?;
        let r_fg = chain(fut, 0, &r_g, |value| {
            let mut composed = args.clone();
            composed[result_index] = value.clone();
            composed
        })?;

        let (expected, expectation_label) = match kind {
            CompositionKind::Left => (r_g.clone(), format!("{g}(…): {r_g}")),
            CompositionKind::Right => {
                let r_f = call_outcome(fut, 0, args)?;
                let label = format!("{f}(…): {r_f}");
                (r_f, label)
            }
            CompositionKind::Inverse => {
                let original = args[result_index].clone();
                let label = format!("Expected: {original}");
                (Outcome::Ok(original), label)
            }
        };

        if !fut.compare(&r_fg, &expected) {
            counterexamples.push(format!("{f}({g}(…)): {r_fg}\n\t{expectation_label}"));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    let success = match kind {
        CompositionKind::Left => format!("{f}∘{g} always equals {g} for tested inputs"),
        CompositionKind::Right => format!("{f}∘{g} always equals {f} for tested inputs"),
        CompositionKind::Inverse => {
            format!("{f}∘{g} returns the original argument for all tested inputs")
        }
    };
    Ok(finish(success, counterexamples, total))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DistSide {
    Left,
    Right,
}

pub(crate) fn eval_distributivity(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
    side: DistSide,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, 3);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let g = fut.futs[1].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        let (a, b, c) = (&args[0], &args[1], &args[2]);
        total += 1;
        let (r1, r2, rendering) = match side {
            DistSide::Left => {
                // f(a, g(b, c)) vs g(f(a, b), f(a, c))
                let inner = call_outcome(fut, 1, &[b.clone(), c.clone()])?;
                let r1 = chain(fut, 0, &inner, |v| vec![a.clone(), v.clone()])?;

                let left = call_outcome(fut, 0, &[a.clone(), b.clone()])?;
                let right = call_outcome(fut, 0, &[a.clone(), c.clone()])?;
                let r2 = match (left.ok_value(), right.ok_value()) {
                    (Some(l), Some(r)) => call_outcome(fut, 1, &[l.clone(), r.clone()])?,
                    _ => left.clone(),
                };
                let rendering = format!(
                    "{f}({a}, {g}({b}, {c})): {r1}\n\t{g}({f}({a}, {b}), {f}({a}, {c})): {r2}"
                );
                (r1, r2, rendering)
            }
            DistSide::Right => {
                // f(g(a, b), c) vs g(f(a, c), f(b, c))
                let inner = call_outcome(fut, 1, &[a.clone(), b.clone()])?;
                let r1 = chain(fut, 0, &inner, |v| vec![v.clone(), c.clone()])?;

                let left = call_outcome(fut, 0, &[a.clone(), c.clone()])?;
                let right = call_outcome(fut, 0, &[b.clone(), c.clone()])?;
                let r2 = match (left.ok_value(), right.ok_value()) {
                    (Some(l), Some(r)) => call_outcome(fut, 1, &[l.clone(), r.clone()])?,
                    _ => left.clone(),
                };
                let rendering = format!(
                    "{f}({g}({a}, {b}), {c}): {r1}\n\t{g}({f}({a}, {c}), {f}({b}, {c})): {r2}"
                );
                (r1, r2, rendering)
            }
        };
        if !fut.compare(&r1, &r2) {
            counterexamples.push(rendering);
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    let success = match side {
        DistSide::Left => {
            format!("{f}(a, {g}(b, c)) == {g}({f}(a, b), {f}(a, c)) for all tested inputs")
        }
        DistSide::Right => {
            format!("{f}({g}(a, b), c) == {g}({f}(a, c), {f}(b, c)) for all tested inputs")
        }
    };
    Ok(finish(success, counterexamples, total))
}

pub(crate) fn eval_both_distributivity(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let left = eval_distributivity(fut, samples, opts, DistSide::Left)?;
    let right = eval_distributivity(fut, samples, opts, DistSide::Right)?;
    let holds = left.holds && right.holds;
    let mut counterexamples = [left.counterexamples, right.counterexamples].concat();
    counterexamples.truncate(opts.max_counterexamples);
    Ok(EvaluationOutcome {
        holds,
        successes: if holds {
            [left.successes, right.successes].concat()
        } else {
            Vec::new()
        },
        counterexamples,
        stats: EvalStats {
            total_count: left.stats.total_count + right.stats.total_count,
            success_count: left.stats.success_count + right.stats.success_count,
        },
    })
}

/// `f(g(a, b)) == g(f(a), f(b))` over unordered pairs of distinct sampled
/// values; f is unary, g binary.
pub(crate) fn eval_homomorphism(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let pool = element_pool(samples);
    if pool.len() < 2 {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let g = fut.futs[1].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    'outer: for i in 0..pool.len() {
        for j in i + 1..pool.len() {
            let (a, b) = (&pool[i], &pool[j]);
            total += 1;

            let gab = call_outcome(fut, 1, &[a.clone(), b.clone()])?;
            let r1 = chain(fut, 0, &gab, |v| vec![v.clone()])?;

            let fa = call_outcome(fut, 0, std::slice::from_ref(a))?;
            let fb = call_outcome(fut, 0, std::slice::from_ref(b))?;
            let r2 = match (fa.ok_value(), fb.ok_value()) {
                (Some(x), Some(y)) => call_outcome(fut, 1, &[x.clone(), y.clone()])?,
                _ => fa.clone(),
            };

            if !fut.compare(&r1, &r2) {
                counterexamples.push(format!(
                    "{f}({g}({a}, {b})): {r1}\n\t{g}({f}({a}), {f}({b})): {r2}"
                ));
                if counterexamples.len() >= opts.max_counterexamples {
                    break 'outer;
                }
            }
        }
    }
    Ok(finish(
        format!("{f}({g}(a, b)) == {g}({f}(a), {f}(b)) for all tested inputs"),
        counterexamples,
        total,
    ))
}

/// `f(g(k, a)) == g(k, f(a))`: the scalar position passes through g
/// unchanged.
pub(crate) fn eval_scalar_homomorphism(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let pool = element_pool(samples);
    if pool.len() < 2 {
        return Ok(no_valid_inputs());
    }
    let f = fut.futs[0].name().to_owned();
    let g = fut.futs[1].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    'outer: for i in 0..pool.len() {
        for j in i + 1..pool.len() {
            let (k, a) = (&pool[i], &pool[j]);
            total += 1;

            let gka = call_outcome(fut, 1, &[k.clone(), a.clone()])?;
            let r1 = chain(fut, 0, &gka, |v| vec![v.clone()])?;

            let fa = call_outcome(fut, 0, std::slice::from_ref(a))?;
            let r2 = chain(fut, 1, &fa, |v| vec![k.clone(), v.clone()])?;

            if !fut.compare(&r1, &r2) {
                counterexamples.push(format!(
                    "{f}({g}({k}, {a})): {r1}\n\t{g}({k}, {f}({a})): {r2}"
                ));
                if counterexamples.len() >= opts.max_counterexamples {
                    break 'outer;
                }
            }
        }
    }
    Ok(finish(
        format!("{f}({g}(k, a)) == {g}(k, {f}(a)) for all tested inputs"),
        counterexamples,
        total,
    ))
}
