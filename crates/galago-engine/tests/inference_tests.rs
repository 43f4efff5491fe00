//! End-to-end inference scenarios over the canonical grammars.

use galago_dsl::ast::Grammar;
use galago_engine::properties::EvalOptions;
use galago_engine::refine::RuleBasedOracle;
use galago_engine::{
    standard_registry, CombinedFunctionUnderTest, ComparisonStrategy, FunctionUnderTest,
    Generator, GeneratorOptions, GeneratorTable, GrammarConfig, InferenceConfig, InferenceEngine,
    InputParser, Value, Verdict,
};

fn load_grammar(name: &str) -> Grammar {
    let path = format!("{}/../../grammars/{name}", env!("CARGO_MANIFEST_DIR"));
    let source =
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {path}: {e}"));
    let grammar = galago_dsl::parse(&source, name)
        .unwrap_or_else(|e| panic!("Failed to parse {name}: {e}"));
    grammar.validate().unwrap();
    grammar
}

fn int_binop(name: &str, f: fn(i64, i64) -> i64) -> FunctionUnderTest {
    FunctionUnderTest::new(name, 2, move |args| match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(f(*a, *b))),
        _ => Err("expected integers".into()),
    })
}

fn safe_div() -> FunctionUnderTest {
    FunctionUnderTest::new("safe_div", 2, |args| {
        let a = args[0]
            .as_f64()
            .ok_or_else(|| "expected a number".to_string())?;
        let b = args[1]
            .as_f64()
            .ok_or_else(|| "expected a number".to_string())?;
        if b == 0.0 {
            return Err("division by zero".into());
        }
        Ok(Value::Float(a / b))
    })
}

fn set_union() -> FunctionUnderTest {
    FunctionUnderTest::new("union", 2, |args| match (&args[0], &args[1]) {
        (Value::Set(a), Value::Set(b)) => {
            let mut items = a.clone();
            items.extend(b.clone());
            Ok(Value::set(items))
        }
        _ => Err("expected sets".into()),
    })
}

fn frame_prefix(len: usize) -> String {
    let mut out = String::with_capacity(2);
    out.push((((len >> 8) & 0xff) as u8) as char);
    out.push(((len & 0xff) as u8) as char);
    out
}

fn encode() -> FunctionUnderTest {
    FunctionUnderTest::new("encode", 1, |args| match &args[0] {
        Value::Str(payload) => Ok(Value::Str(format!(
            "{}{payload}",
            frame_prefix(payload.chars().count())
        ))),
        other => Err(format!("expected a string payload, got {other}")),
    })
}

fn decode() -> FunctionUnderTest {
    FunctionUnderTest::new("decode", 1, |args| match &args[0] {
        Value::Str(frame) => {
            let chars: Vec<char> = frame.chars().collect();
            if chars.len() < 2 {
                return Err("frame shorter than its length prefix".into());
            }
            let declared = ((chars[0] as usize) << 8) | chars[1] as usize;
            let payload: String = chars[2..].iter().collect();
            if declared != payload.chars().count() {
                return Err("length prefix mismatch".into());
            }
            Ok(Value::Str(payload))
        }
        other => Err(format!("expected a frame string, got {other}")),
    })
}

// ---------------------------------------------------------------------------
// S1: commutative integer addition
// ---------------------------------------------------------------------------

#[test]
fn s1_addition_laws_over_int_pairs() {
    let config = InferenceConfig::new(standard_registry())
        .add_function(int_binop("add", |a, b| a.wrapping_add(b)))
        .set_default_grammar(GrammarConfig::new(load_grammar("int_pairs.fan")))
        .with_example_count(40)
        .with_seed(7)
        .with_max_counterexamples(3);
    let results = InferenceEngine::new(config).run().unwrap();
    let outcomes = &results.results["add"].outcomes;

    let commutativity = &outcomes["Commutativity"];
    assert!(commutativity.holds);
    assert_eq!(commutativity.confidence, 1.0);

    assert!(outcomes["Associativity"].holds);
    assert!(!outcomes["Injectivity"].holds, "add(1,2) == add(2,1)");

    // Compatibility gate: unary templates never produce an entry for a
    // binary function.
    assert!(!outcomes.contains_key("Involution"));
    assert!(!outcomes.contains_key("Determinism"));
}

// ---------------------------------------------------------------------------
// S2: non-commutative subtraction
// ---------------------------------------------------------------------------

#[test]
fn s2_subtraction_fails_commutativity_with_witness() {
    let config = InferenceConfig::new(standard_registry())
        .add_function(int_binop("sub", |a, b| a.wrapping_sub(b)))
        .set_default_grammar(GrammarConfig::new(load_grammar("int_pairs.fan")))
        .with_example_count(40)
        .with_seed(3)
        .with_max_counterexamples(3)
        .add_property_by_name("Commutativity")
        .unwrap();
    let results = InferenceEngine::new(config).run().unwrap();
    let report = &results.results["sub"];
    let outcome = &report.outcomes["Commutativity"];

    assert!(!outcome.holds);
    assert_eq!(outcome.verdict, Verdict::DoesNotHold);
    assert!(outcome.confidence < 1.0);
    assert!(!outcome.counterexamples.is_empty());
    assert!(outcome.counterexamples[0].contains("sub("));
    // Feedback disabled: no refinement history.
    assert!(report.constraints_history.is_empty());
}

// ---------------------------------------------------------------------------
// S3: identity element for multiplication
// ---------------------------------------------------------------------------

#[test]
fn s3_multiplication_has_identity_one() {
    let config = InferenceConfig::new(standard_registry())
        .add_function(int_binop("mul", |a, b| a.wrapping_mul(b)))
        .set_default_grammar(GrammarConfig::new(load_grammar("int_pairs.fan")))
        .with_example_count(30)
        .with_seed(9)
        .add_property_by_name("IdentityElement")
        .unwrap();
    let results = InferenceEngine::new(config).run().unwrap();
    let outcome = &results.results["mul"].outcomes["IdentityElement"];
    assert!(outcome.holds);
    assert!(outcome
        .successes
        .iter()
        .any(|witness| witness.starts_with("1 is a two-sided identity element")));
}

// ---------------------------------------------------------------------------
// S4: set-union laws
// ---------------------------------------------------------------------------

#[test]
fn s4_set_union_laws_over_set_pairs() {
    let config = InferenceConfig::new(standard_registry())
        .add_function(set_union())
        .set_default_grammar(GrammarConfig::new(load_grammar("set_pairs.fan")))
        .set_default_parser(InputParser::shaped())
        .with_example_count(30)
        .with_seed(21)
        .with_max_counterexamples(3);
    let results = InferenceEngine::new(config).run().unwrap();
    let outcomes = &results.results["union"].outcomes;

    assert!(outcomes["Commutativity"].holds, "A ∪ B == B ∪ A");
    assert!(outcomes["Associativity"].holds);
    assert!(outcomes["BinaryIdempotence"].holds, "A ∪ A == A");
}

// ---------------------------------------------------------------------------
// S5: feedback-driven refinement of safe division
// ---------------------------------------------------------------------------

#[test]
fn s5_feedback_refines_away_division_by_zero() {
    let config = InferenceConfig::new(standard_registry())
        .add_function(safe_div())
        .set_default_grammar(GrammarConfig::new(load_grammar("safe_div.fan")))
        .with_example_count(40)
        .with_seed(11)
        .with_max_counterexamples(5)
        .with_feedback(3)
        .add_property_by_name("Associativity")
        .unwrap();
    let results = InferenceEngine::new(config)
        .with_oracle(Box::new(RuleBasedOracle))
        .run()
        .unwrap();
    let report = &results.results["safe_div"];
    let history = &report.constraints_history["Associativity"];

    assert!(!history.is_empty());
    assert!(history
        .iter()
        .flatten()
        .any(|constraint| constraint == "int(<b>) != 0"));

    // Division still is not associative, but after refinement the
    // counterexamples involve no zero denominators.
    let outcome = &report.outcomes["Associativity"];
    assert!(!outcome.holds);
    assert!(!outcome
        .counterexamples
        .iter()
        .any(|ce| ce.contains("division by zero")));
}

// ---------------------------------------------------------------------------
// S6: length-prefixed frames round-trip
// ---------------------------------------------------------------------------

#[test]
fn s6_every_generated_frame_satisfies_the_length_prefix() {
    let mut generator = Generator::new(
        load_grammar("binary2.fan"),
        GeneratorTable::builtin(),
        GeneratorOptions::default(),
        17,
    )
    .unwrap();
    let batch = generator.generate(50);
    assert!(batch.failures.is_empty());
    assert_eq!(batch.derivations.len(), 50);
    for derivation in &batch.derivations {
        let chars: Vec<char> = derivation.text.chars().collect();
        let declared = ((chars[0] as usize) << 8) | chars[1] as usize;
        assert_eq!(declared, chars.len() - 2, "bad frame: {:?}", derivation.text);
    }
}

#[test]
fn s6_codec_round_trip_holds_on_generated_frames() {
    let config = InferenceConfig::new(standard_registry())
        .add_function(encode())
        .add_function(decode())
        .set_default_grammar(GrammarConfig::new(load_grammar("binary2.fan")))
        .set_default_parser(InputParser::shaped())
        .with_example_count(40)
        .with_seed(17)
        .add_property_by_name("InverseComposition")
        .unwrap();
    let results = InferenceEngine::new(config).run().unwrap();

    let round_trip = &results.results["encode, decode"].outcomes["InverseComposition"];
    assert!(round_trip.holds, "encode(decode(frame)) must equal frame");
    assert_eq!(round_trip.confidence, 1.0);

    let other_way = &results.results["decode, encode"].outcomes["InverseComposition"];
    assert!(other_way.holds, "decode(encode(frame)) must equal frame");
}

// ---------------------------------------------------------------------------
// Cross-cutting invariants
// ---------------------------------------------------------------------------

#[test]
fn outcomes_are_deterministic_for_a_fixed_seed() {
    let build = || {
        InferenceConfig::new(standard_registry())
            .add_function(int_binop("add", |a, b| a.wrapping_add(b)))
            .add_function(int_binop("sub", |a, b| a.wrapping_sub(b)))
            .set_default_grammar(GrammarConfig::new(load_grammar("int_pairs.fan")))
            .with_example_count(30)
            .with_seed(123)
            .with_max_counterexamples(2)
    };
    let first = InferenceEngine::new(build()).run().unwrap();
    let second = InferenceEngine::new(build()).run().unwrap();
    assert_eq!(first.to_json(), second.to_json());
}

#[test]
fn holding_properties_survive_subsampling() {
    let add = int_binop("add", |a, b| a.wrapping_add(b));
    let fut = CombinedFunctionUnderTest::single(&add, ComparisonStrategy::Consensus);
    let template = standard_registry().by_name("Commutativity").cloned().unwrap();

    let samples: Vec<Vec<Value>> = (0..20)
        .map(|i| vec![Value::Int(i), Value::Int(2 * i - 7)])
        .collect();
    let opts = EvalOptions {
        max_counterexamples: 3,
    };
    let full = template.evaluate(&fut, &samples, &opts).unwrap();
    assert!(full.holds);
    let sub = template.evaluate(&fut, &samples[5..12], &opts).unwrap();
    assert!(sub.holds, "a subsample cannot flip a holding property");
}

#[test]
fn inconclusive_when_the_grammar_cannot_satisfy_its_constraints() {
    // Every expansion is rejected, so all slots fail and the failure
    // budget trips.
    let source = "<start> ::= <digit> \", \" <digit>\n<digit> ::= \"7\"\nwhere int(<digit>) != 7\n";
    let grammar = galago_dsl::parse(source, "impossible.fan").unwrap();
    let config = InferenceConfig::new(standard_registry())
        .add_function(int_binop("add", |a, b| a + b))
        .set_default_grammar(GrammarConfig::new(grammar))
        .with_example_count(20)
        .add_property_by_name("Commutativity")
        .unwrap();
    let results = InferenceEngine::new(config).run().unwrap();
    let outcome = &results.results["add"].outcomes["Commutativity"];
    assert_eq!(outcome.verdict, Verdict::Inconclusive);
    assert_eq!(outcome.confidence, 0.0);
    assert!(outcome.diagnostic.is_some());
}

#[test]
fn scalars_grammar_supports_unary_templates() {
    let negate = FunctionUnderTest::new("negate", 1, |args| match &args[0] {
        Value::Int(a) => Ok(Value::Int(-a)),
        _ => Err("expected an integer".into()),
    });
    let config = InferenceConfig::new(standard_registry())
        .add_function(negate)
        .set_default_grammar(GrammarConfig::new(load_grammar("scalars.fan")))
        .with_example_count(30)
        .with_seed(5);
    let results = InferenceEngine::new(config).run().unwrap();
    let outcomes = &results.results["negate"].outcomes;
    assert!(outcomes["Involution"].holds, "negate(negate(x)) == x");
    assert!(outcomes["Determinism"].holds);
    assert!(outcomes["MonotonicallyDecreasing"].holds);
    assert!(!outcomes["MonotonicallyIncreasing"].holds);
}
