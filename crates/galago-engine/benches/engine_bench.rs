use criterion::{black_box, criterion_group, criterion_main, Criterion};

use galago_engine::{
    standard_registry, FunctionUnderTest, Generator, GeneratorOptions, GeneratorTable,
    GrammarConfig, InferenceConfig, InferenceEngine, Value,
};

const INT_PAIRS: &str = include_str!("../../../grammars/int_pairs.fan");
const BINARY2: &str = include_str!("../../../grammars/binary2.fan");

fn bench_generate_int_pairs(c: &mut Criterion) {
    let grammar = galago_dsl::parse(INT_PAIRS, "int_pairs.fan").unwrap();
    c.bench_function("generate_int_pairs_100", |b| {
        b.iter(|| {
            let mut generator = Generator::new(
                black_box(grammar.clone()),
                GeneratorTable::builtin(),
                GeneratorOptions::default(),
                7,
            )
            .unwrap();
            generator.generate(100)
        })
    });
}

fn bench_generate_binary_frames(c: &mut Criterion) {
    let grammar = galago_dsl::parse(BINARY2, "binary2.fan").unwrap();
    c.bench_function("generate_binary2_100", |b| {
        b.iter(|| {
            let mut generator = Generator::new(
                black_box(grammar.clone()),
                GeneratorTable::builtin(),
                GeneratorOptions::default(),
                7,
            )
            .unwrap();
            generator.generate(100)
        })
    });
}

fn bench_infer_addition(c: &mut Criterion) {
    let grammar = galago_dsl::parse(INT_PAIRS, "int_pairs.fan").unwrap();
    c.bench_function("infer_add_commutativity_50", |b| {
        b.iter(|| {
            let config = InferenceConfig::new(standard_registry())
                .add_function(FunctionUnderTest::new("add", 2, |args| {
                    match (&args[0], &args[1]) {
                        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
                        _ => Err("expected integers".into()),
                    }
                }))
                .set_default_grammar(GrammarConfig::new(black_box(grammar.clone())))
                .with_example_count(50)
                .add_property_by_name("Commutativity")
                .unwrap();
            InferenceEngine::new(config).run().unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_generate_int_pairs,
    bench_generate_binary_frames,
    bench_infer_addition
);
criterion_main!(benches);
