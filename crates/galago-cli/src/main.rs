mod cli;
mod demo;

use std::fs;
use std::path::Path;

use clap::Parser;
use miette::{miette, IntoDiagnostic};
use tracing_subscriber::EnvFilter;

use galago_dsl::ast::Grammar;
use galago_engine::refine::splice_proposals;
use galago_engine::{
    standard_registry, ComparisonStrategy, Generator, GeneratorOptions, GeneratorTable,
    GrammarConfig, InferenceConfig, InferenceEngine, RuleBasedOracle,
};

use cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { file } => check(&file),
        Commands::Sample {
            file,
            count,
            constraint,
            use_cache,
        } => sample(&file, count, &constraint, use_cache, cli.seed),
        Commands::Infer {
            file,
            functions,
            property,
            examples,
            max_counterexamples,
            strategy,
            feedback,
            max_attempts,
            use_cache,
            json,
        } => infer(InferArgs {
            file,
            functions,
            property,
            examples,
            max_counterexamples,
            strategy,
            feedback,
            max_attempts,
            use_cache,
            json,
            seed: cli.seed,
        }),
    }
}

fn load_grammar(file: &Path) -> miette::Result<Grammar> {
    let source = fs::read_to_string(file).into_diagnostic()?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let grammar = galago_dsl::parse(&source, &filename)?;
    grammar.validate()?;
    Ok(grammar)
}

fn check(file: &Path) -> miette::Result<()> {
    let grammar = load_grammar(file)?;
    println!(
        "ok: {} rules, start symbol <{}>, fingerprint {}",
        grammar.rules.len(),
        grammar.start(),
        &grammar.fingerprint()[..12],
    );
    Ok(())
}

fn sample(
    file: &Path,
    count: usize,
    constraints: &[String],
    use_cache: bool,
    seed: u64,
) -> miette::Result<()> {
    let mut grammar = load_grammar(file)?;
    let table = GeneratorTable::builtin();
    if !constraints.is_empty() {
        let spliced = splice_proposals(&grammar, constraints, &table, seed);
        for rejected in &spliced.rejected {
            eprintln!("warning: rejected constraint '{rejected}'");
        }
        grammar = spliced.grammar;
    }
    let options = GeneratorOptions {
        use_cache,
        ..GeneratorOptions::default()
    };
    let mut generator = Generator::new(grammar, table, options, seed).into_diagnostic()?;
    let batch = generator.generate(count);
    for derivation in &batch.derivations {
        println!("{}", derivation.text.escape_debug());
    }
    if !batch.failures.is_empty() {
        eprintln!("{} sample(s) skipped:", batch.failures.len());
        for failure in &batch.failures {
            eprintln!("  {failure}");
        }
    }
    Ok(())
}

struct InferArgs {
    file: std::path::PathBuf,
    functions: String,
    property: Vec<String>,
    examples: usize,
    max_counterexamples: usize,
    strategy: String,
    feedback: bool,
    max_attempts: usize,
    use_cache: bool,
    json: bool,
    seed: u64,
}

fn infer(args: InferArgs) -> miette::Result<()> {
    let (futs, parser) = demo::function_set(&args.functions).ok_or_else(|| {
        miette!(
            "unknown function set '{}' (expected arith, sets, or codec)",
            args.functions
        )
    })?;
    let strategy: ComparisonStrategy = args
        .strategy
        .parse()
        .map_err(|message: String| miette!(message))?;
    let grammar = load_grammar(&args.file)?;

    let mut config = InferenceConfig::new(standard_registry())
        .set_default_grammar(GrammarConfig::new(grammar))
        .set_default_parser(parser)
        .with_example_count(args.examples)
        .with_max_counterexamples(args.max_counterexamples)
        .with_comparison_strategy(strategy)
        .with_input_cache(args.use_cache)
        .with_seed(args.seed);
    for fut in futs {
        config = config.add_function(fut);
    }
    for name in &args.property {
        config = config.add_property_by_name(name).into_diagnostic()?;
    }
    if args.feedback {
        config = config.with_feedback(args.max_attempts);
    }

    let mut engine = InferenceEngine::new(config);
    if args.feedback {
        engine = engine.with_oracle(Box::new(RuleBasedOracle));
    }
    let results = engine.run().into_diagnostic()?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results.to_json()).into_diagnostic()?
        );
    } else {
        print!("{}", results.render_text());
    }
    Ok(())
}
