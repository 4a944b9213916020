//! Property-based tests for pagination and filters.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Lazy collections yield every item exactly once, in order
//! - Item caps are exact and never over-fetch
//! - Iterations are restartable
//! - Filter toggles cycle with a net-zero counter
//! - Derived filter sets never count more than their source

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use futures::executor::block_on;
use proptest::prelude::*;
use searchdeck::utils::{Pagination, format_duration};
use searchdeck::{AppliedFilters, Error, LazyCollection, LazyCollectionOptions, Page};
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Test Helpers
// ============================================================================

/// Runs a full iteration over `0..len` and returns the items and call count.
fn drain(len: usize, batch_size: usize, max_items: Option<usize>) -> (Vec<usize>, usize) {
    let calls = AtomicUsize::new(0);
    let mut options = LazyCollectionOptions::default().with_batch_size(batch_size);
    if let Some(max) = max_items {
        options = options.with_max_items(max);
    }
    let collection = LazyCollection::new(
        |offset: usize, limit: usize| {
            calls.fetch_add(1, Ordering::SeqCst);
            let items: Vec<usize> = (offset..len.max(offset)).take(limit).collect();
            async move { Ok::<_, Error>(Page::new(items, offset, limit)) }
        },
        options,
    );

    let items = block_on(collection.to_array()).unwrap();
    (items, calls.load(Ordering::SeqCst))
}

fn facet_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["genres", "language", "director", "year"]).prop_map(String::from)
}

fn value_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(String::from)
}

// ============================================================================
// Lazy Collection Properties
// ============================================================================

proptest! {
    /// Property: every item is yielded once, in order, with one extra call
    /// when the source is an exact multiple of the batch size.
    #[test]
    fn prop_exhaustion(len in 0usize..300, batch_size in 1usize..50) {
        let (items, calls) = drain(len, batch_size, None);

        prop_assert_eq!(items, (0..len).collect::<Vec<_>>());
        prop_assert_eq!(calls, len / batch_size + 1);
    }

    /// Property: a cap below the source length is exact and fetches only the
    /// pages needed to supply it.
    #[test]
    fn prop_cap_enforced(len in 1usize..300, batch_size in 1usize..50, cap_seed in 0usize..300) {
        let cap = cap_seed % len;
        let (items, calls) = drain(len, batch_size, Some(cap));

        prop_assert_eq!(items, (0..cap).collect::<Vec<_>>());
        prop_assert_eq!(calls, cap.div_ceil(batch_size));
    }

    /// Property: two sequential iterations over one collection agree.
    #[test]
    fn prop_restartable(len in 0usize..200, batch_size in 1usize..40) {
        let collection = LazyCollection::new(
            |offset: usize, limit: usize| {
                let items: Vec<usize> = (offset..len.max(offset)).take(limit).collect();
                async move { Ok::<_, Error>(Page::new(items, offset, limit)) }
            },
            LazyCollectionOptions::default().with_batch_size(batch_size),
        );

        let first = block_on(collection.to_array()).unwrap();
        let second = block_on(collection.to_array()).unwrap();

        prop_assert_eq!(first.len(), len);
        prop_assert_eq!(first, second);
    }
}

// ============================================================================
// Filter Properties
// ============================================================================

proptest! {
    /// Property: three toggles of a fresh value restore state and counter.
    #[test]
    fn prop_toggle_cycle(
        prior in prop::collection::vec((facet_strategy(), value_strategy()), 0..20),
        facet in "[a-z]{1,8}_new",
        value in "[a-z]{1,8}",
    ) {
        let mut filters = AppliedFilters::new();
        for (f, v) in &prior {
            filters.apply_string_filter(f, v);
        }
        let before = filters.length();
        let rendered = filters.to_string();

        filters.apply_string_filter(&facet, &value);
        filters.apply_string_filter(&facet, &value);
        filters.apply_string_filter(&facet, &value);

        prop_assert!(!filters.is_value_applied(&facet, &value));
        prop_assert_eq!(filters.length(), before);
        prop_assert_eq!(filters.to_string(), rendered);
    }

    /// Property: the counter equals excluded values plus ranged facets.
    #[test]
    fn prop_length_counts_exclusions_and_ranges(
        toggles in prop::collection::vec((facet_strategy(), value_strategy()), 0..40),
        ranges in prop::collection::vec(facet_strategy(), 0..6),
    ) {
        let mut filters = AppliedFilters::new();
        for (f, v) in &toggles {
            filters.apply_string_filter(f, v);
        }
        for f in &ranges {
            filters.apply_range_filter(f, (0.0, 1.0));
        }

        let facets = ["genres", "language", "director", "year"];
        let values = ["a", "b", "c", "d"];
        let excluded = facets
            .iter()
            .flat_map(|f| values.iter().map(move |v| (*f, *v)))
            .filter(|(f, v)| {
                filters.status(f, v) == Some(searchdeck::StringFilterStatus::Exclude)
            })
            .count();
        let ranged = facets.iter().filter(|f| filters.has_range(f)).count();

        prop_assert_eq!(filters.length(), excluded + ranged);
    }

    /// Property: `without` drops the facet and never raises the counter.
    #[test]
    fn prop_without_drops_facet(
        toggles in prop::collection::vec((facet_strategy(), value_strategy()), 0..40),
        facet in facet_strategy(),
    ) {
        let mut filters = AppliedFilters::new();
        for (f, v) in &toggles {
            filters.apply_string_filter(f, v);
        }
        filters.apply_range_filter(&facet, (1.0, 2.0));

        let derived = filters.without(&facet);

        prop_assert!(derived.length() < filters.length());
        prop_assert!(!derived.has_range(&facet));
        for value in ["a", "b", "c", "d"] {
            prop_assert!(!derived.is_value_applied(&facet, value));
        }
    }
}

// ============================================================================
// Utility Properties
// ============================================================================

proptest! {
    /// Property: duration formatting never panics.
    #[test]
    fn prop_format_duration_total(input in "\\PC{0,24}") {
        let _ = format_duration(&input);
    }

    /// Property: whole-second durations render their seconds.
    #[test]
    fn prop_format_duration_seconds(seconds in 1u64..60) {
        prop_assert_eq!(format_duration(&format!("PT{seconds}S")).unwrap(), format!("{seconds}s"));
    }

    /// Property: the current page stays within `1..=last_page`.
    #[test]
    fn prop_pagination_bounds(per_page in 1usize..100, total in 1usize..5000, page_seed in 0usize..200) {
        let mut pagination = Pagination::new(per_page, total);
        let page = page_seed % pagination.last_page() + 1;
        pagination.go_to_page(page);

        prop_assert_eq!(pagination.current_page(), page);
        prop_assert!(pagination.next_page() <= pagination.last_page());
        prop_assert!(pagination.previous_page() >= 1);
    }
}
