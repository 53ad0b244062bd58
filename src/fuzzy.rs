//! Fuzzy ranking of cell values against a search query using nucleo-matcher.

use std::cmp::Ordering;

use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

use crate::sort::alphanumeric_cmp;

/// Reusable ranker for one query. Not shareable between threads, create one
/// per worker.
pub struct Ranker {
    matcher: Matcher,
    pattern: Pattern,
    empty: bool,
}

impl Ranker {
    pub fn new(query: &str) -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            pattern: Pattern::new(
                query,
                CaseMatching::Ignore,
                Normalization::Smart,
                AtomKind::Fuzzy,
            ),
            empty: query.trim().is_empty(),
        }
    }

    /// Score of the haystack, `None` if it does not match. Higher is better.
    /// An empty query matches everything with score 0.
    pub fn rank(&mut self, haystack: &str) -> Option<u32> {
        if self.empty {
            return Some(0);
        }
        let mut buf = Vec::new();
        self.pattern
            .score(Utf32Str::new(haystack, &mut buf), &mut self.matcher)
    }
}

/// Ordering of two rows on a fuzzy sorted column: higher rank first, equal
/// ranks fall back to alphanumeric order of the values.
pub fn fuzzy_cmp(
    rank_a: Option<u32>,
    value_a: &str,
    rank_b: Option<u32>,
    value_b: &str,
) -> Ordering {
    rank_b
        .unwrap_or(0)
        .cmp(&rank_a.unwrap_or(0))
        .then_with(|| alphanumeric_cmp(value_a, value_b))
}
