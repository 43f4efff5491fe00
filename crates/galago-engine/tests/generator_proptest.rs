//! Randomized checks of the generator's determinism and cache laws.
//!
//! This suite is intentionally separate from the scenario tests: it sweeps
//! seeds and counts rather than pinning concrete outputs.

use proptest::prelude::*;

use galago_engine::{Generator, GeneratorOptions, GeneratorTable};

const INT_PAIRS: &str = "\
<start> ::= <number> \", \" <number>
<number> ::= \"-\"? <digit>+
<digit> ::= \"0\" | \"1\" | \"2\" | \"3\" | \"4\" | \"5\" | \"6\" | \"7\" | \"8\" | \"9\"
";

const REPEATED: &str = "<start> ::= <letter>*\n<letter> ::= \"x\" | \"y\"\n";

fn texts(source: &str, seed: u64, count: usize, use_cache: bool) -> Vec<String> {
    let grammar = galago_dsl::parse(source, "proptest.fan").unwrap();
    let options = GeneratorOptions {
        use_cache,
        ..GeneratorOptions::default()
    };
    let mut generator =
        Generator::new(grammar, GeneratorTable::builtin(), options, seed).unwrap();
    generator
        .generate(count)
        .derivations
        .into_iter()
        .map(|d| d.text)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn generation_is_deterministic_per_seed(seed in any::<u64>(), count in 1usize..40) {
        prop_assert_eq!(
            texts(INT_PAIRS, seed, count, false),
            texts(INT_PAIRS, seed, count, false)
        );
    }

    #[test]
    fn cache_never_yields_a_duplicate(seed in any::<u64>(), count in 1usize..60) {
        let yielded = texts(INT_PAIRS, seed, count, true);
        let mut unique = yielded.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(yielded.len(), unique.len());
    }

    #[test]
    fn cache_mode_is_a_subsequence_of_at_most_count(seed in any::<u64>(), count in 1usize..40) {
        let yielded = texts(INT_PAIRS, seed, count, true);
        prop_assert!(yielded.len() <= count);
    }

    #[test]
    fn repetition_lengths_stay_bounded(seed in any::<u64>()) {
        for text in texts(REPEATED, seed, 50, false) {
            prop_assert!(text.chars().count() <= 12);
        }
    }

    #[test]
    fn every_yield_matches_the_pair_shape(seed in any::<u64>()) {
        for text in texts(INT_PAIRS, seed, 20, false) {
            let (a, b) = text.split_once(", ").expect("pair layout");
            for part in [a, b] {
                let digits = part.strip_prefix('-').unwrap_or(part);
                prop_assert!(!digits.is_empty());
                prop_assert!(digits.chars().all(|c| c.is_ascii_digit()));
            }
        }
    }
}
