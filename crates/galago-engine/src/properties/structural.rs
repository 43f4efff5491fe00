//! Structural templates: argument-position symmetry, special-element
//! scans, injectivity, shape preservation, and monotonicity.

use crate::errors::ArityError;
use crate::fut::{CombinedFunctionUnderTest, Outcome};
use crate::value::Value;

use super::{
    arg_points, element_pool, finish, no_valid_inputs, Category, EvalOptions, EvalStats,
    EvaluationOutcome, PropertyTemplate, TemplateKind,
};

pub fn commutativity() -> PropertyTemplate {
    PropertyTemplate {
        name: "Commutativity".into(),
        category: Category::Structural,
        description: "Tests if swapping two arguments yields the same result".into(),
        input_arity: 2,
        function_arity: 2,
        num_functions: 1,
        kind: TemplateKind::Commutativity { swap: (0, 1) },
    }
}

/// Commutativity at arbitrary positions of a wider function.
pub fn commutativity_at(function_arity: usize, swap: (usize, usize)) -> PropertyTemplate {
    PropertyTemplate {
        name: format!("Commutativity[{},{}]", swap.0, swap.1),
        category: Category::Structural,
        description: format!(
            "Tests if swapping arguments {} and {} yields the same result",
            swap.0, swap.1
        ),
        input_arity: function_arity,
        function_arity,
        num_functions: 1,
        kind: TemplateKind::Commutativity { swap },
    }
}

pub fn anti_commutativity() -> PropertyTemplate {
    PropertyTemplate {
        name: "AntiCommutativity".into(),
        category: Category::Structural,
        description: "Tests if f(a, b) equals -f(b, a)".into(),
        input_arity: 2,
        function_arity: 2,
        num_functions: 1,
        kind: TemplateKind::AntiCommutativity,
    }
}

pub fn left_identity_element() -> PropertyTemplate {
    element_template("LeftIdentityElement", ElementRole::Identity, vec![0], vec![1])
}

pub fn right_identity_element() -> PropertyTemplate {
    element_template("RightIdentityElement", ElementRole::Identity, vec![1], vec![0])
}

pub fn identity_element() -> PropertyTemplate {
    element_template("IdentityElement", ElementRole::Identity, vec![0, 1], vec![1, 0])
}

pub fn left_absorbing_element() -> PropertyTemplate {
    element_template("LeftAbsorbingElement", ElementRole::Absorbing, vec![0], vec![0])
}

pub fn right_absorbing_element() -> PropertyTemplate {
    element_template("RightAbsorbingElement", ElementRole::Absorbing, vec![1], vec![1])
}

pub fn absorbing_element() -> PropertyTemplate {
    element_template("AbsorbingElement", ElementRole::Absorbing, vec![0, 1], vec![0, 1])
}

fn element_template(
    name: &str,
    role: ElementRole,
    positions: Vec<usize>,
    targets: Vec<usize>,
) -> PropertyTemplate {
    let kind = match role {
        ElementRole::Identity => TemplateKind::IdentityElement {
            positions: positions.clone(),
            targets: targets.clone(),
        },
        ElementRole::Absorbing => TemplateKind::AbsorbingElement {
            positions: positions.clone(),
            targets: targets.clone(),
        },
    };
    PropertyTemplate {
        name: name.into(),
        category: Category::Structural,
        description: format!(
            "Scans generated inputs for a {} element at positions {positions:?}",
            role.label()
        ),
        input_arity: 2,
        function_arity: 2,
        num_functions: 1,
        kind,
    }
}

pub fn fixed_point() -> PropertyTemplate {
    PropertyTemplate {
        name: "FixedPoint".into(),
        category: Category::Structural,
        description: "Scans for values with f(a) = a".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::FixedPoint,
    }
}

pub fn injectivity() -> PropertyTemplate {
    PropertyTemplate {
        name: "Injectivity".into(),
        category: Category::Structural,
        description: "Tests if distinct inputs always produce distinct outputs".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::Injectivity,
    }
}

pub fn shape_preservation() -> PropertyTemplate {
    PropertyTemplate {
        name: "ShapePreservation".into(),
        category: Category::Structural,
        description: "Tests if the output shape matches the input shape".into(),
        input_arity: 1,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::ShapePreservation,
    }
}

pub fn monotonically_increasing() -> PropertyTemplate {
    PropertyTemplate {
        name: "MonotonicallyIncreasing".into(),
        category: Category::Structural,
        description: "Tests if a <= b implies f(a) <= f(b)".into(),
        input_arity: 2,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::MonotonicallyIncreasing,
    }
}

pub fn monotonically_decreasing() -> PropertyTemplate {
    PropertyTemplate {
        name: "MonotonicallyDecreasing".into(),
        category: Category::Structural,
        description: "Tests if a <= b implies f(a) >= f(b)".into(),
        input_arity: 2,
        function_arity: 1,
        num_functions: 1,
        kind: TemplateKind::MonotonicallyDecreasing,
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

pub(crate) fn eval_swap_arguments(
    template: &PropertyTemplate,
    swap: (usize, usize),
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, template.input_arity);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        let mut swapped = args.clone();
        swapped.swap(swap.0, swap.1);
        let straight = fut.call(0, args)?;
        let crossed = fut.call(0, &swapped)?;
        total += 1;
        if !fut.compare(&straight.outcome, &crossed.outcome) {
            counterexamples.push(format!("{}\n\t{}", straight.render(), crossed.render()));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        format!(
            "swapping arguments {} and {} yields the same result for all tested inputs",
            swap.0, swap.1
        ),
        counterexamples,
        total,
    ))
}

/// `f(a, b) == -f(b, a)` over numeric results; non-numeric or failed
/// outcomes falsify.
pub(crate) fn eval_anti_commutativity(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, 2);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        let swapped = vec![args[1].clone(), args[0].clone()];
        let straight = fut.call(0, args)?;
        let crossed = fut.call(0, &swapped)?;
        total += 1;
        let negated = crossed.outcome.ok_value().and_then(|value| match value {
            Value::Int(n) => Some(Value::Int(-n)),
            Value::Float(n) => Some(Value::Float(-n)),
            _ => None,
        });
        let failed = match negated {
            Some(expected) => !fut.compare(&straight.outcome, &Outcome::Ok(expected)),
            None => true,
        };
        if failed {
            counterexamples.push(format!("{}\n\t{}", straight.render(), crossed.render()));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        "f(a, b) == -f(b, a) for all tested inputs".into(),
        counterexamples,
        total,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementRole {
    Identity,
    Absorbing,
}

impl ElementRole {
    fn label(&self) -> &'static str {
        match self {
            ElementRole::Identity => "identity",
            ElementRole::Absorbing => "absorbing",
        }
    }
}

/// Candidate scan shared by the identity/absorbing family. A candidate
/// survives only if every probe at every declared position succeeds; the
/// property holds when at least one candidate survives.
#[allow(clippy::too_many_arguments)]
pub(crate) fn eval_candidate_element(
    template: &PropertyTemplate,
    positions: &[usize],
    targets: &[usize],
    role: ElementRole,
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, template.input_arity);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }

    // Candidates: every value witnessed at a scan position, plus the usual
    // suspects (0, 1, the empty collection) in the shapes we saw.
    let mut candidates: Vec<Value> = Vec::new();
    for args in &points {
        for &pos in positions {
            if let Some(value) = args.get(pos) {
                if !candidates.contains(value) {
                    candidates.push(value.clone());
                }
            }
        }
    }
    let saw_numeric = candidates.iter().any(Value::is_numeric);
    let saw_set = candidates.iter().any(|v| matches!(v, Value::Set(_)));
    let saw_list = candidates.iter().any(|v| matches!(v, Value::List(_)));
    let mut seeded: Vec<Value> = Vec::new();
    if saw_numeric {
        seeded.push(Value::Int(0));
        seeded.push(Value::Int(1));
    }
    if saw_set {
        seeded.push(Value::Set(Vec::new()));
    }
    if saw_list {
        seeded.push(Value::List(Vec::new()));
    }
    for value in seeded {
        if !candidates.contains(&value) {
            candidates.push(value);
        }
    }

    let f_name = fut.futs[0].name().to_owned();
    let mut survivors: Vec<Value> = Vec::new();
    let mut counterexamples: Vec<String> = Vec::new();
    let mut total = 0;

    'candidates: for candidate in &candidates {
        for args in &points {
            for (&pos, &target) in positions.iter().zip(targets.iter()) {
                let mut probe = args.clone();
                probe[pos] = candidate.clone();
                let expected = probe[target].clone();
                let record = fut.call(0, &probe)?;
                total += 1;
                if !fut.compare(&record.outcome, &Outcome::Ok(expected.clone())) {
                    if counterexamples.len() < opts.max_counterexamples {
                        counterexamples
                            .push(format!("{}\n\tExpected: {expected}", record.render()));
                    }
                    continue 'candidates;
                }
            }
        }
        survivors.push(candidate.clone());
    }

    let holds = !survivors.is_empty();
    let successes = survivors
        .iter()
        .map(|candidate| {
            let descriptor = element_descriptor(role, positions);
            let equations: Vec<String> = positions
                .iter()
                .zip(targets.iter())
                .map(|(&pos, &target)| {
                    element_equation(&f_name, template.function_arity, pos, target, candidate)
                })
                .collect();
            format!(
                "{candidate} is a {descriptor} element\n\t{}",
                equations.join(" and ")
            )
        })
        .collect();
    Ok(EvaluationOutcome {
        holds,
        successes,
        counterexamples,
        stats: EvalStats {
            total_count: total,
            success_count: if holds { total } else { 0 },
        },
    })
}

fn element_descriptor(role: ElementRole, positions: &[usize]) -> String {
    let side = if positions.len() > 1 {
        "two-sided"
    } else if positions[0] == 0 {
        "left"
    } else {
        "right"
    };
    format!("{side} {}", role.label())
}

fn element_equation(
    f_name: &str,
    arity: usize,
    pos: usize,
    target: usize,
    candidate: &Value,
) -> String {
    let mut parts: Vec<String> = (0..arity).map(|_| "x".to_owned()).collect();
    parts[pos] = candidate.to_string();
    let rhs = if target == pos {
        candidate.to_string()
    } else {
        "x".to_owned()
    };
    format!("{f_name}({}) = {rhs}", parts.join(", "))
}

/// Existence scan: holds iff at least one sampled value satisfies
/// `f(a) = a`.
pub(crate) fn eval_fixed_point(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    _opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let pool = element_pool(samples);
    if pool.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f_name = fut.futs[0].name().to_owned();
    let mut successes = Vec::new();
    let mut total = 0;
    for value in &pool {
        let record = fut.call(0, std::slice::from_ref(value))?;
        total += 1;
        if fut.compare(&record.outcome, &Outcome::Ok(value.clone())) {
            successes.push(format!("{value} is a fixed point: {f_name}({value}) = {value}"));
        }
    }
    let holds = !successes.is_empty();
    let found = successes.len();
    Ok(EvaluationOutcome {
        holds,
        successes,
        counterexamples: if holds {
            Vec::new()
        } else {
            vec![format!("no fixed point among {total} tested values")]
        },
        stats: EvalStats {
            total_count: total,
            success_count: found,
        },
    })
}

/// Distinct input tuples must produce distinct outputs. Works at any
/// arity: for a binary function the tuples `(1, 2)` and `(2, 1)` are
/// distinct inputs.
pub(crate) fn eval_injectivity(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let arity = fut.futs[0].arity();
    let mut pool: Vec<Vec<Value>> = Vec::new();
    for point in arg_points(samples, arity) {
        if !pool.contains(&point) {
            pool.push(point);
        }
    }
    // Swapped argument orders are distinct inputs too; probing them is
    // what separates e.g. addition from pairing functions.
    if arity == 2 {
        let swapped: Vec<Vec<Value>> = pool
            .iter()
            .map(|args| vec![args[1].clone(), args[0].clone()])
            .collect();
        for args in swapped {
            if !pool.contains(&args) {
                pool.push(args);
            }
        }
    }
    if pool.len() < 2 {
        return Ok(no_valid_inputs());
    }
    let mut records = Vec::with_capacity(pool.len());
    for args in &pool {
        records.push(fut.call(0, args)?);
    }
    let mut total = 0;
    let mut counterexamples = Vec::new();
    'outer: for i in 0..records.len() {
        for j in i + 1..records.len() {
            total += 1;
            let (a, b) = (&records[i], &records[j]);
            if fut.compare(&a.outcome, &b.outcome) {
                counterexamples.push(format!("{}\n\t{}", a.render(), b.render()));
                if counterexamples.len() >= opts.max_counterexamples {
                    break 'outer;
                }
            }
        }
    }
    Ok(finish(
        "distinct inputs produced distinct outputs for all tested pairs".into(),
        counterexamples,
        total,
    ))
}

/// Invocation errors falsify shape preservation: a function that fails on
/// an in-shape input does not preserve anything.
pub(crate) fn eval_shape_preservation(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, 1);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        let record = fut.call(0, args)?;
        total += 1;
        let failure = match record.outcome.ok_value() {
            Some(result) => {
                if result.shape() == args[0].shape() {
                    None
                } else {
                    Some(format!(
                        "input shape: {}\n\toutput shape: {}",
                        args[0].shape(),
                        result.shape()
                    ))
                }
            }
            None => Some(record.render()),
        };
        if let Some(ce) = failure {
            counterexamples.push(ce);
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    Ok(finish(
        "the output shape matched the input shape for all tested inputs".into(),
        counterexamples,
        total,
    ))
}

pub(crate) fn eval_monotonicity(
    fut: &CombinedFunctionUnderTest<'_>,
    samples: &[Vec<Value>],
    opts: &EvalOptions,
    increasing: bool,
) -> Result<EvaluationOutcome, ArityError> {
    let points = arg_points(samples, 2);
    if points.is_empty() {
        return Ok(no_valid_inputs());
    }
    let f_name = fut.futs[0].name().to_owned();
    let mut total = 0;
    let mut counterexamples = Vec::new();
    for args in &points {
        total += 1;
        let (a, b) = (&args[0], &args[1]);
        if !a.is_numeric() || !b.is_numeric() {
            counterexamples.push(format!(
                "monotonicity needs ordered scalars, got {a} and {b}"
            ));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
            continue;
        }
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let r_small = fut.call(0, std::slice::from_ref(small))?;
        let r_large = fut.call(0, std::slice::from_ref(large))?;
        let violation = match (r_small.outcome.ok_value(), r_large.outcome.ok_value()) {
            (Some(rs), Some(rl)) if rs.is_numeric() && rl.is_numeric() => {
                if increasing {
                    rs > rl
                } else {
                    rs < rl
                }
            }
            _ => true,
        };
        if violation {
            let relation = if increasing { ">" } else { "<" };
            counterexamples.push(format!(
                "{small} <= {large}\n\t{f_name}({small}) {relation} {f_name}({large})\n\t{} {relation} {}",
                r_small.outcome, r_large.outcome
            ));
            if counterexamples.len() >= opts.max_counterexamples {
                break;
            }
        }
    }
    let direction = if increasing { "<=" } else { ">=" };
    Ok(finish(
        format!("a <= b implies {f_name}(a) {direction} {f_name}(b) for all tested inputs"),
        counterexamples,
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fut::{ComparisonStrategy, FunctionUnderTest};

    fn int_binop(name: &str, f: fn(i64, i64) -> i64) -> FunctionUnderTest {
        FunctionUnderTest::new(name, 2, move |args| match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(f(*a, *b))),
            _ => Err("expected integers".into()),
        })
    }

    fn int_unop(name: &str, f: fn(i64) -> i64) -> FunctionUnderTest {
        FunctionUnderTest::new(name, 1, move |args| match &args[0] {
            Value::Int(a) => Ok(Value::Int(f(*a))),
            _ => Err("expected an integer".into()),
        })
    }

    fn pairs(values: &[(i64, i64)]) -> Vec<Vec<Value>> {
        values
            .iter()
            .map(|(a, b)| vec![Value::Int(*a), Value::Int(*b)])
            .collect()
    }

    fn opts() -> EvalOptions {
        EvalOptions {
            max_counterexamples: 3,
        }
    }

    #[test]
    fn commutativity_holds_for_addition() {
        let add = int_binop("add", |a, b| a + b);
        let fut = CombinedFunctionUnderTest::single(&add, ComparisonStrategy::Consensus);
        let samples = pairs(&[(3, -7), (0, 5), (2, 2)]);
        let outcome = commutativity()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(outcome.holds);
        assert_eq!(outcome.stats.total_count, 3);
        assert_eq!(outcome.stats.success_count, 3);
    }

    #[test]
    fn commutativity_fails_for_subtraction_with_witness() {
        let sub = int_binop("sub", |a, b| a - b);
        let fut = CombinedFunctionUnderTest::single(&sub, ComparisonStrategy::Consensus);
        let samples = pairs(&[(5, 3), (1, 1)]);
        let outcome = commutativity()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(!outcome.holds);
        assert_eq!(outcome.counterexamples[0], "sub(5, 3): 2\n\tsub(3, 5): -2");
        assert!(outcome.confidence() < 1.0);
    }

    #[test]
    fn anti_commutativity_holds_for_subtraction() {
        let sub = int_binop("sub", |a, b| a - b);
        let fut = CombinedFunctionUnderTest::single(&sub, ComparisonStrategy::Consensus);
        let samples = pairs(&[(5, 3), (1, 1), (-4, 9)]);
        let outcome = anti_commutativity()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(outcome.holds, "a - b == -(b - a)");
    }

    #[test]
    fn anti_commutativity_fails_for_addition() {
        let add = int_binop("add", |a, b| a + b);
        let fut = CombinedFunctionUnderTest::single(&add, ComparisonStrategy::Consensus);
        let samples = pairs(&[(5, 3)]);
        let outcome = anti_commutativity()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(!outcome.holds);
        assert_eq!(outcome.counterexamples[0], "add(5, 3): 8\n\tadd(3, 5): 8");
    }

    #[test]
    fn identity_element_found_for_multiplication() {
        let mul = int_binop("mul", |a, b| a * b);
        let fut = CombinedFunctionUnderTest::single(&mul, ComparisonStrategy::Consensus);
        let samples = pairs(&[(2, 3), (4, 1), (-5, 7)]);
        let outcome = identity_element()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(outcome.holds);
        assert!(outcome
            .successes
            .iter()
            .any(|s| s.starts_with("1 is a two-sided identity element")));
    }

    #[test]
    fn absorbing_element_found_for_multiplication() {
        let mul = int_binop("mul", |a, b| a * b);
        let fut = CombinedFunctionUnderTest::single(&mul, ComparisonStrategy::Consensus);
        let samples = pairs(&[(2, 3), (4, 6)]);
        let outcome = absorbing_element()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(outcome.holds);
        assert!(outcome
            .successes
            .iter()
            .any(|s| s.starts_with("0 is a two-sided absorbing element")));
    }

    #[test]
    fn no_identity_for_subtraction_on_left() {
        let sub = int_binop("sub", |a, b| a - b);
        let fut = CombinedFunctionUnderTest::single(&sub, ComparisonStrategy::Consensus);
        let samples = pairs(&[(5, 3), (2, 8)]);
        let outcome = left_identity_element()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(!outcome.holds);
        assert_eq!(outcome.stats.success_count, 0);
    }

    #[test]
    fn injectivity_fails_for_constant_function() {
        let constant = int_unop("constant", |_| 42);
        let fut = CombinedFunctionUnderTest::single(&constant, ComparisonStrategy::Consensus);
        let samples = pairs(&[(1, 2), (3, 4)]);
        let outcome = injectivity().evaluate(&fut, &samples, &opts()).unwrap();
        assert!(!outcome.holds);
        assert!(outcome.counterexamples[0].contains("constant(1): 42"));
    }

    #[test]
    fn injectivity_holds_for_negation() {
        let negate = int_unop("negate", |a| -a);
        let fut = CombinedFunctionUnderTest::single(&negate, ComparisonStrategy::Consensus);
        let samples = pairs(&[(1, 2), (3, 4)]);
        let outcome = injectivity().evaluate(&fut, &samples, &opts()).unwrap();
        assert!(outcome.holds);
    }

    #[test]
    fn fixed_point_scan_finds_zero_for_negation() {
        let negate = int_unop("negate", |a| -a);
        let fut = CombinedFunctionUnderTest::single(&negate, ComparisonStrategy::Consensus);
        let samples = pairs(&[(0, 2), (3, 4)]);
        let outcome = fixed_point().evaluate(&fut, &samples, &opts()).unwrap();
        assert!(outcome.holds);
        assert!(outcome.successes[0].contains("0 is a fixed point"));
    }

    #[test]
    fn shape_preservation_holds_for_int_to_int() {
        let negate = int_unop("negate", |a| -a);
        let fut = CombinedFunctionUnderTest::single(&negate, ComparisonStrategy::Consensus);
        let samples = pairs(&[(1, 2)]);
        let outcome = shape_preservation()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(outcome.holds);
    }

    #[test]
    fn monotonicity_classifies_negation() {
        let negate = int_unop("negate", |a| -a);
        let fut = CombinedFunctionUnderTest::single(&negate, ComparisonStrategy::Consensus);
        let samples = pairs(&[(1, 5), (-3, 2), (7, 7)]);
        let increasing = monotonically_increasing()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(!increasing.holds);
        let decreasing = monotonically_decreasing()
            .evaluate(&fut, &samples, &opts())
            .unwrap();
        assert!(decreasing.holds);
    }

    #[test]
    fn compatibility_gate_rejects_wrong_arity() {
        let negate = int_unop("negate", |a| -a);
        let fut = CombinedFunctionUnderTest::single(&negate, ComparisonStrategy::Consensus);
        assert!(!commutativity().is_applicable(&fut));
        assert!(injectivity().is_applicable(&fut));
    }
}
