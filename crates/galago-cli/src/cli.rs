//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Grammar-driven property inference for functions under test.\n\n\
    Canonical path:\n  \
    1. galago check grammars/int_pairs.fan\n  \
    2. galago sample grammars/int_pairs.fan --count 10\n  \
    3. galago infer grammars/int_pairs.fan --functions arith\n\n\
    Use --functions to pick a built-in demo set (arith, sets, codec).\n\
    Use --feedback to let failing properties refine the grammar.";

#[derive(Parser)]
#[command(name = "galago")]
#[command(about = "Grammar-driven property inference for functions under test")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// Seed for the deterministic input generator
    #[arg(long, global = true, default_value_t = 0)]
    pub(crate) seed: u64,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Parse and validate a .fan grammar file
    #[command(display_order = 10)]
    Check {
        /// Path to the .fan grammar file
        file: PathBuf,
    },

    /// Generate sample inputs from a grammar
    #[command(display_order = 20)]
    Sample {
        /// Path to the .fan grammar file
        file: PathBuf,

        /// How many inputs to generate
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Extra constraint expressions layered onto the grammar
        #[arg(long)]
        constraint: Vec<String>,

        /// Suppress duplicate inputs
        #[arg(long)]
        use_cache: bool,
    },

    /// Infer properties of a built-in demo function set
    #[command(display_order = 30)]
    Infer {
        /// Path to the .fan grammar file
        file: PathBuf,

        /// Built-in function set: arith | sets | codec
        #[arg(long, default_value = "arith")]
        functions: String,

        /// Restrict evaluation to these property names (repeatable)
        #[arg(long)]
        property: Vec<String>,

        /// Typed inputs sampled per (function, property) pair
        #[arg(long, default_value_t = 50)]
        examples: usize,

        /// Failing witnesses retained per property
        #[arg(long, default_value_t = 3)]
        max_counterexamples: usize,

        /// Comparison strategy: first | consensus | restrictive
        #[arg(long, default_value = "consensus")]
        strategy: String,

        /// Refine the grammar from counterexamples on failure
        #[arg(long)]
        feedback: bool,

        /// Maximum refinement iterations per property
        #[arg(long, default_value_t = 3)]
        max_attempts: usize,

        /// Suppress duplicate generated inputs
        #[arg(long)]
        use_cache: bool,

        /// Emit the results schema as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
