//! Property-based tests using proptest
//!
//! These tests verify path filtering, page-cursor iteration, option-layer
//! precedence, and generated-name uniqueness using randomized inputs.

use proptest::prelude::*;

use forgectl::commands::projects::random_names;
use forgectl::traverse::Filter;

/// Generate fully-qualified project paths (`group/sub/project`)
fn arb_paths() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::collection::vec("[a-z][a-z0-9-]{0,8}", 1..4).prop_map(|segments| segments.join("/")),
        0..40,
    )
}

/// Apply a compiled filter to a path list the way the traversal does
fn select(paths: &[String], filter: &Filter) -> Vec<String> {
    paths
        .iter()
        .filter(|path| filter.matches(path))
        .cloned()
        .collect()
}

proptest! {
    /// An empty pattern selects every path
    #[test]
    fn empty_pattern_selects_everything(paths in arb_paths()) {
        let filter = Filter::new("", false).unwrap();
        prop_assert_eq!(select(&paths, &filter).len(), paths.len());
    }

    /// Selection is an ordered subsequence of the input: nothing is added
    /// and relative order is preserved
    #[test]
    fn selection_is_an_ordered_subsequence(
        paths in arb_paths(),
        literal in "[a-z]{1,3}"
    ) {
        let filter = Filter::new(&literal, false).unwrap();
        let selected = select(&paths, &filter);

        prop_assert!(selected.len() <= paths.len());
        let mut cursor = paths.iter();
        for path in &selected {
            prop_assert!(cursor.any(|p| p == path));
        }
    }

    /// Selecting twice with the same pattern changes nothing
    #[test]
    fn selection_is_idempotent(
        paths in arb_paths(),
        literal in "[a-z]{1,3}"
    ) {
        let filter = Filter::new(&literal, false).unwrap();
        let once = select(&paths, &filter);
        let twice = select(&once, &filter);
        prop_assert_eq!(once, twice);
    }

    /// A literal pattern selects exactly the paths containing it, and the
    /// recursive flag plays no part in matching
    #[test]
    fn literal_patterns_mean_substring_match(
        paths in arb_paths(),
        literal in "[a-z]{1,3}",
        recursive in any::<bool>()
    ) {
        let filter = Filter::new(&literal, recursive).unwrap();
        for path in &paths {
            prop_assert_eq!(filter.matches(path), path.contains(&literal));
        }
    }
}

/// Tests for page-cursor iteration over in-memory pages
mod pager_tests {
    use super::*;
    use forgectl::forge::types::Paged;
    use forgectl::traverse::{Flow, Pager};

    fn arb_pages() -> impl Strategy<Value = Vec<Vec<u32>>> {
        prop::collection::vec(prop::collection::vec(any::<u32>(), 0..6), 1..6)
    }

    /// Drive a pager over in-memory pages, stopping after `stop_at` items
    /// when given. Returns the visited items, the number of pages fetched,
    /// and whether the pager reports exhaustion afterwards.
    fn walk(pages: &[Vec<u32>], stop_at: Option<usize>) -> (Vec<u32>, u32, bool) {
        tokio_test::block_on(async {
            let mut pager = Pager::new(async |token: Option<String>| {
                let index = token.map_or(0, |t| t.parse::<usize>().unwrap());
                let next = (index + 1 < pages.len()).then(|| (index + 1).to_string());
                Ok(Paged {
                    items: pages[index].clone(),
                    next_page_token: next,
                })
            });

            let mut seen = Vec::new();
            pager
                .for_each(async |item| {
                    seen.push(item);
                    if stop_at == Some(seen.len()) {
                        return Ok(Flow::Stop);
                    }
                    Ok(Flow::Continue)
                })
                .await
                .unwrap();

            let pages_fetched = pager.pages_fetched();
            let exhausted = pager.next_page().await.unwrap().is_none();
            (seen, pages_fetched, exhausted)
        })
    }

    proptest! {
        /// A full walk yields every item in page order, fetching each page
        /// exactly once
        #[test]
        fn full_walk_preserves_page_order(pages in arb_pages()) {
            let expected: Vec<u32> = pages.iter().flatten().copied().collect();
            let (seen, fetched, exhausted) = walk(&pages, None);
            prop_assert_eq!(seen, expected);
            prop_assert_eq!(fetched as usize, pages.len());
            prop_assert!(exhausted);
        }

        /// Stopping early yields a prefix and permanently ends the iteration
        #[test]
        fn early_stop_yields_a_prefix(
            pages in arb_pages(),
            stop_at in 1usize..10
        ) {
            let all: Vec<u32> = pages.iter().flatten().copied().collect();
            let (seen, fetched, exhausted) = walk(&pages, Some(stop_at));

            let expected_len = stop_at.min(all.len());
            prop_assert_eq!(seen.len(), expected_len);
            prop_assert_eq!(&all[..expected_len], seen.as_slice());
            prop_assert!(exhausted);
            prop_assert!(fetched as usize <= pages.len());
        }
    }
}

/// Tests for three-layer option resolution
mod precedence_tests {
    use super::*;
    use clap::Command;
    use forgectl::commands::projects::DeleteOptions;
    use forgectl::options::{GlobalOptions, LogLevel, OptionSet, Options, DEFAULT_BASE_URL};

    fn arb_level() -> impl Strategy<Value = LogLevel> {
        prop_oneof![
            Just(LogLevel::Off),
            Just(LogLevel::Error),
            Just(LogLevel::Warn),
            Just(LogLevel::Info),
            Just(LogLevel::Debug),
            Just(LogLevel::Trace),
        ]
    }

    fn level_name(level: LogLevel) -> &'static str {
        match level {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Overlay an optional file layer and CLI argv over the defaults.
    fn resolve(file_yaml: Option<&str>, argv: Vec<String>) -> Options {
        let mut options: Options = match file_yaml {
            Some(yaml) => serde_yaml::from_str(yaml).unwrap(),
            None => Options::default(),
        };
        let matches = GlobalOptions::register(Command::new("forgectl").no_binary_name(true))
            .try_get_matches_from(argv)
            .unwrap();
        options.global.apply(&matches);
        options
    }

    proptest! {
        /// The resolved base URL is CLI if given, else the file's, else the
        /// built-in default
        #[test]
        fn base_url_resolves_cli_over_file_over_default(
            file in proptest::option::of("[a-z]{1,8}"),
            cli in proptest::option::of("[a-z]{1,8}")
        ) {
            let file_url = file.map(|host| format!("https://{host}.file"));
            let cli_url = cli.map(|host| format!("https://{host}.cli"));

            let yaml = file_url.as_ref().map(|url| format!("global:\n  base-url: {url}\n"));
            let mut argv = Vec::new();
            if let Some(url) = &cli_url {
                argv.push("--base-url".to_string());
                argv.push(url.clone());
            }

            let options = resolve(yaml.as_deref(), argv);
            let expected = cli_url
                .or(file_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
            prop_assert_eq!(options.global.base_url, expected);
        }

        /// The same three-layer rule holds for the log level
        #[test]
        fn log_level_resolves_cli_over_file_over_default(
            file in proptest::option::of(arb_level()),
            cli in proptest::option::of(arb_level())
        ) {
            let yaml = file.map(|level| format!("global:\n  log-level: {}\n", level_name(level)));
            let mut argv = Vec::new();
            if let Some(level) = cli {
                argv.push("--log-level".to_string());
                argv.push(level_name(level).to_string());
            }

            let options = resolve(yaml.as_deref(), argv);
            let expected = cli.or(file).unwrap_or_default();
            prop_assert_eq!(options.global.log_level, expected);
        }

        /// On bool flags, `--flag=false` from the CLI beats a `true` from
        /// the file and an absent flag leaves the file value standing
        #[test]
        fn explicit_false_beats_a_true_from_the_file(
            file_value in any::<bool>(),
            cli_value in proptest::option::of(any::<bool>())
        ) {
            let yaml = format!("projects:\n  delete:\n    dry-run: {file_value}\n");
            let mut options: Options = serde_yaml::from_str(&yaml).unwrap();

            let argv: Vec<String> = match cli_value {
                Some(value) => vec![format!("--dry-run={value}")],
                None => Vec::new(),
            };
            let matches = DeleteOptions::register(Command::new("delete").no_binary_name(true))
                .try_get_matches_from(argv)
                .unwrap();
            options.projects.delete.apply(&matches);

            prop_assert_eq!(options.projects.delete.dry_run, cli_value.unwrap_or(file_value));
        }
    }
}

/// Tests for generated project names
mod name_generation_tests {
    use super::*;
    use std::collections::HashSet;

    proptest! {
        /// Every generated name is the base, a dash, and a 36-character
        /// UUID, in request order
        #[test]
        fn names_carry_base_and_uuid_suffix(
            base in "[a-z][a-z0-9-]{0,10}",
            count in 0u64..40
        ) {
            let names = random_names(&base, count);
            prop_assert_eq!(names.len() as u64, count);
            for name in &names {
                let suffix = name.strip_prefix(&format!("{base}-"));
                prop_assert!(suffix.is_some());
                prop_assert_eq!(suffix.unwrap().len(), 36);
            }
        }
    }

    /// Collisions stay absent at scale.
    #[test]
    fn ten_thousand_names_do_not_collide() {
        let names = random_names("load", 10_000);
        let unique: HashSet<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(unique.len(), names.len());
    }
}
