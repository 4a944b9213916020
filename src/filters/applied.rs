//! Applied facet filters.
//!
//! Accumulates the filters a user picks while browsing an index and compiles
//! them into one filter expression.
//!
//! # String filter states
//!
//! Each `(facet, value)` pair cycles through three states. The transition
//! table also carries the change applied to [`AppliedFilters::length`]:
//!
//! | Current | Next | Length |
//! |---------|------|--------|
//! | unset | include | 0 |
//! | include | exclude | +1 |
//! | exclude | unset | -1 |
//!
//! Entering `include` does not count; only exclusions move the counter.

use super::syntax::{Expression, FilterSyntax, MeilisearchSyntax};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Latitude and longitude, in degrees.
pub type Coordinates = (f64, f64);

/// Inclusive numeric range `(min, max)`.
pub type FacetRange = (f64, f64);

/// Marker recorded for a facet value. Absence means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFilterStatus {
    /// Documents must carry the value.
    Include,
    /// Documents must not carry the value.
    Exclude,
}

/// Outcome of toggling a facet value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State after the toggle; `None` is unset.
    pub next: Option<StringFilterStatus>,
    /// Change applied to the criteria counter.
    pub length_delta: isize,
}

impl StringFilterStatus {
    /// Returns the transition out of `current`.
    #[must_use]
    pub const fn toggle(current: Option<Self>) -> Transition {
        match current {
            None => Transition {
                next: Some(Self::Include),
                length_delta: 0,
            },
            Some(Self::Include) => Transition {
                next: Some(Self::Exclude),
                length_delta: 1,
            },
            Some(Self::Exclude) => Transition {
                next: None,
                length_delta: -1,
            },
        }
    }
}

/// Rectangular geographic region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBoundingBox {
    /// North-west corner.
    pub top_left: Coordinates,
    /// South-east corner.
    pub bottom_right: Coordinates,
}

impl GeoBoundingBox {
    /// Creates a bounding box from its corners.
    #[must_use]
    pub const fn new(top_left: Coordinates, bottom_right: Coordinates) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }
}

/// Insertion-ordered association list.
#[derive(Debug, Clone, PartialEq)]
struct Ordered<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Ordered<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Ordered<V> {
    fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> V) -> &mut V {
        let index = match self.entries.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key.to_string(), default()));
                self.entries.len() - 1
            },
        };
        &mut self.entries[index].1
    }

    /// Replaces the value in place, keeping the original position.
    fn insert(&mut self, key: &str, value: V) -> Option<V> {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            return Some(std::mem::replace(existing, value));
        }
        self.entries.push((key.to_string(), value));
        None
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Facet filters selected by the user.
///
/// Cloning is deep: no per-facet mapping is ever shared between two sets.
///
/// # Example
///
/// ```
/// use searchdeck::filters::AppliedFilters;
///
/// let mut filters = AppliedFilters::new();
/// filters.apply_string_filter("genre", "drama");
/// filters.apply_string_filter("genre", "comedy");
/// filters.apply_string_filter("genre", "comedy"); // comedy: include -> exclude
/// filters.apply_range_filter("year", (1990.0, 1999.0));
///
/// assert_eq!(
///     filters.to_string(),
///     r#"(genre IN ["drama"] AND genre NOT IN ["comedy"]) AND year 1990 TO 1999"#
/// );
/// assert_eq!(filters.length(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedFilters {
    length: usize,
    string_filters: Ordered<Ordered<StringFilterStatus>>,
    range_filters: Ordered<FacetRange>,
    bounding_box: Option<GeoBoundingBox>,
    include_all: HashSet<String>,
}

impl AppliedFilters {
    /// Creates an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active criteria, as counted by the toggle table.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Returns true if the set compiles to an empty expression.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounding_box.is_none()
            && self.range_filters.entries.is_empty()
            && self
                .string_filters
                .iter()
                .all(|(_, values)| values.entries.is_empty())
    }

    /// Cycles `value` of `facet` through unset, include and exclude.
    ///
    /// Returns the new state.
    pub fn apply_string_filter(&mut self, facet: &str, value: &str) -> Option<StringFilterStatus> {
        let values = self.string_filters.get_or_insert_with(facet, Ordered::default);
        let transition = StringFilterStatus::toggle(values.get(value).copied());

        match transition.next {
            Some(status) => {
                values.insert(value, status);
            },
            None => {
                values.remove(value);
            },
        }
        self.length = self.length.saturating_add_signed(transition.length_delta);

        tracing::trace!(facet, value, state = ?transition.next, length = self.length, "toggled facet value");
        transition.next
    }

    /// Sets whether included values of `facet` must all match.
    ///
    /// With `None` the current setting is flipped. Returns the new setting.
    pub fn include_all(&mut self, facet: &str, include_all: Option<bool>) -> bool {
        let include_all = include_all.unwrap_or_else(|| !self.include_all.contains(facet));
        if include_all {
            self.include_all.insert(facet.to_string());
        } else {
            self.include_all.remove(facet);
        }
        include_all
    }

    /// Returns true if included values of `facet` must all match.
    #[must_use]
    pub fn includes_all(&self, facet: &str) -> bool {
        self.include_all.contains(facet)
    }

    /// Sets or replaces the range of `facet`.
    ///
    /// Only the first range of a facet counts towards [`Self::length`].
    pub fn apply_range_filter(&mut self, facet: &str, range: FacetRange) {
        if self.range_filters.insert(facet, range).is_none() {
            self.length += 1;
        }
    }

    /// Sets the geographic bounding box.
    ///
    /// Every call counts towards [`Self::length`], even when replacing a box.
    pub fn apply_bounding_box(&mut self, bounding_box: GeoBoundingBox) {
        self.length += 1;
        self.bounding_box = Some(bounding_box);
    }

    /// Returns a copy of this set without any criteria on `facet`.
    ///
    /// String values, ranges and the include-all flag of `facet` are dropped;
    /// everything else, the bounding box included, is carried over. The
    /// counter is reduced by what `facet` contributed to it.
    ///
    /// Unlike a fresh set, the copy keeps the counter and the include-all
    /// flags of the remaining facets, so it compiles to the same criteria
    /// minus `facet`.
    #[must_use]
    pub fn without(&self, facet: &str) -> Self {
        let mut derived = self.clone();

        let mut contributed = 0;
        if let Some(values) = derived.string_filters.remove(facet) {
            contributed += values
                .iter()
                .filter(|(_, status)| **status == StringFilterStatus::Exclude)
                .count();
        }
        if derived.range_filters.remove(facet).is_some() {
            contributed += 1;
        }
        derived.include_all.remove(facet);
        derived.length = derived.length.saturating_sub(contributed);
        derived
    }

    /// Returns true if `value` of `facet` is included or excluded.
    ///
    /// Lookups are read-only: querying a facet does not register it, so the
    /// compiled facet order follows the order in which filters were applied,
    /// not the order in which facets were first inspected.
    #[must_use]
    pub fn is_value_applied(&self, facet: &str, value: &str) -> bool {
        self.status(facet, value).is_some()
    }

    /// Returns the marker recorded for `value` of `facet`.
    #[must_use]
    pub fn status(&self, facet: &str, value: &str) -> Option<StringFilterStatus> {
        self.string_filters
            .get(facet)
            .and_then(|values| values.get(value))
            .copied()
    }

    /// Returns the range applied to `facet`.
    #[must_use]
    pub fn range(&self, facet: &str) -> Option<FacetRange> {
        self.range_filters.get(facet).copied()
    }

    /// Returns true if `facet` has a range.
    #[must_use]
    pub fn has_range(&self, facet: &str) -> bool {
        self.range_filters.contains(facet)
    }

    /// Returns the bounding box, if any.
    #[must_use]
    pub const fn bounding_box(&self) -> Option<&GeoBoundingBox> {
        self.bounding_box.as_ref()
    }

    /// Compiles the criteria with `syntax`.
    ///
    /// String facets come first, then ranges, each in the order the facet was
    /// first used. The bounding box is appended last. All parts sit in one
    /// flat `AND` chain; only a facet part that is itself a conjunction is
    /// parenthesised.
    pub fn compile<S: FilterSyntax + ?Sized>(&self, syntax: &S) -> Expression {
        let mut parts = Vec::new();

        for (facet, values) in self.string_filters.iter() {
            let mut included = Vec::new();
            let mut excluded = Vec::new();
            for (value, status) in values.iter() {
                match status {
                    StringFilterStatus::Include => included.push(value),
                    StringFilterStatus::Exclude => excluded.push(value),
                }
            }

            let mut facet_parts = Vec::new();
            if !included.is_empty() {
                facet_parts.push(if self.include_all.contains(facet) {
                    syntax.all_of(facet, &included)
                } else {
                    syntax.any_of(facet, &included)
                });
            }
            if !excluded.is_empty() {
                facet_parts.push(syntax.none_of(facet, &excluded));
            }
            parts.push(syntax.and(facet_parts));
        }

        for (facet, (min, max)) in self.range_filters.iter() {
            parts.push(syntax.between(facet, *min, *max));
        }

        if let Some(bounding_box) = &self.bounding_box {
            parts.push(syntax.within_bounding_box(bounding_box));
        }

        syntax.and(parts)
    }
}

impl fmt::Display for AppliedFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compile(&MeilisearchSyntax))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_set_is_empty() {
        let filters = AppliedFilters::new();
        assert_eq!(filters.to_string(), "");
        assert_eq!(filters.length(), 0);
        assert!(filters.is_empty());
    }

    #[test]
    fn test_toggle_table() {
        let include = StringFilterStatus::toggle(None);
        assert_eq!(include.next, Some(StringFilterStatus::Include));
        assert_eq!(include.length_delta, 0);

        let exclude = StringFilterStatus::toggle(include.next);
        assert_eq!(exclude.next, Some(StringFilterStatus::Exclude));
        assert_eq!(exclude.length_delta, 1);

        let unset = StringFilterStatus::toggle(exclude.next);
        assert_eq!(unset.next, None);
        assert_eq!(unset.length_delta, -1);
    }

    #[test]
    fn test_string_filter_cycle() {
        let mut filters = AppliedFilters::new();

        assert_eq!(
            filters.apply_string_filter("color", "red"),
            Some(StringFilterStatus::Include)
        );
        assert_eq!(filters.length(), 0);
        assert_eq!(filters.to_string(), r#"color IN ["red"]"#);

        assert_eq!(
            filters.apply_string_filter("color", "red"),
            Some(StringFilterStatus::Exclude)
        );
        assert_eq!(filters.length(), 1);
        assert_eq!(filters.to_string(), r#"color NOT IN ["red"]"#);

        assert_eq!(filters.apply_string_filter("color", "red"), None);
        assert_eq!(filters.length(), 0);
        assert!(!filters.is_value_applied("color", "red"));
        assert_eq!(filters.to_string(), "");
        assert!(filters.is_empty());
    }

    #[test]
    fn test_include_and_exclude_on_one_facet() {
        let mut filters = AppliedFilters::new();
        filters.apply_string_filter("color", "red");
        filters.apply_string_filter("color", "blue");
        filters.apply_string_filter("color", "green");
        filters.apply_string_filter("color", "green");

        assert_eq!(
            filters.to_string(),
            r#"color IN ["red", "blue"] AND color NOT IN ["green"]"#
        );
    }

    #[test]
    fn test_include_all_semantics() {
        let mut filters = AppliedFilters::new();
        filters.apply_string_filter("tags", "a");
        filters.apply_string_filter("tags", "b");

        assert_eq!(filters.to_string(), r#"tags IN ["a", "b"]"#);

        assert!(filters.include_all("tags", None));
        assert_eq!(filters.to_string(), r#"tags = "a" AND tags = "b""#);

        assert!(!filters.include_all("tags", None));
        assert_eq!(filters.to_string(), r#"tags IN ["a", "b"]"#);

        assert!(filters.include_all("tags", Some(true)));
        assert!(filters.include_all("tags", Some(true)));
        assert!(filters.includes_all("tags"));
    }

    #[test]
    fn test_include_all_off_for_unknown_facet_is_noop() {
        let mut filters = AppliedFilters::new();
        filters.include_all("a", Some(true));
        filters.include_all("b", Some(false));
        assert!(filters.includes_all("a"));
        assert!(!filters.includes_all("b"));
    }

    #[test]
    fn test_range_counts_once() {
        let mut filters = AppliedFilters::new();
        filters.apply_range_filter("price", (10.0, 20.0));
        filters.apply_range_filter("price", (15.0, 25.0));

        assert_eq!(filters.length(), 1);
        assert_eq!(filters.range("price"), Some((15.0, 25.0)));
        assert_eq!(filters.to_string(), "price 15 TO 25");
    }

    #[test]
    fn test_bounding_box_counts_every_call() {
        let mut filters = AppliedFilters::new();
        let bbox = GeoBoundingBox::new((1.0, 2.0), (3.0, 4.0));
        filters.apply_bounding_box(bbox);
        filters.apply_bounding_box(bbox);

        assert_eq!(filters.length(), 2);
        assert_eq!(filters.to_string(), "_geoBoundingBox([1, 2], [3, 4])");
    }

    #[test]
    fn test_full_expression_order() {
        let mut filters = AppliedFilters::new();
        filters.apply_range_filter("price", (10.0, 20.0));
        filters.apply_string_filter("color", "red");
        filters.apply_string_filter("color", "blue");
        filters.apply_string_filter("color", "blue");
        filters.apply_string_filter("size", "M");
        filters.apply_bounding_box(GeoBoundingBox::new((48.9, 2.2), (48.8, 2.4)));

        assert_eq!(
            filters.to_string(),
            "(color IN [\"red\"] AND color NOT IN [\"blue\"]) AND size IN [\"M\"] \
             AND price 10 TO 20 AND _geoBoundingBox([48.9, 2.2], [48.8, 2.4])"
        );
        assert_eq!(filters.length(), 3);
    }

    #[test]
    fn test_emptied_facet_keeps_its_position() {
        let mut filters = AppliedFilters::new();
        filters.apply_string_filter("a", "1");
        filters.apply_string_filter("b", "1");
        filters.apply_string_filter("a", "1");
        filters.apply_string_filter("a", "1");
        filters.apply_string_filter("a", "2");

        assert_eq!(filters.to_string(), r#"a IN ["2"] AND b IN ["1"]"#);
    }

    #[test]
    fn test_without_removes_facet_and_keeps_original() {
        let mut original = AppliedFilters::new();
        original.apply_string_filter("color", "red");
        original.apply_string_filter("color", "red");
        original.apply_string_filter("size", "M");
        original.apply_range_filter("color", (1.0, 2.0));
        original.include_all("color", Some(true));
        original.apply_bounding_box(GeoBoundingBox::new((1.0, 2.0), (3.0, 4.0)));
        let before = original.clone();

        let mut derived = original.without("color");
        derived.apply_string_filter("size", "L");

        assert_eq!(original, before);
        assert!(original.is_value_applied("color", "red"));
        assert!(!original.is_value_applied("size", "L"));
        assert!(!derived.is_value_applied("color", "red"));
        assert!(derived.is_value_applied("size", "L"));
        assert!(!derived.has_range("color"));
        assert!(!derived.includes_all("color"));
        assert_eq!(derived.bounding_box(), original.bounding_box());
        // color contributed one exclusion and one range.
        assert_eq!(original.length(), 3);
        assert_eq!(derived.length(), 1);
        assert_eq!(
            derived.to_string(),
            r#"size IN ["M", "L"] AND _geoBoundingBox([1, 2], [3, 4])"#
        );
    }

    #[test]
    fn test_is_value_applied_does_not_register_facet() {
        let filters = AppliedFilters::new();
        assert!(!filters.is_value_applied("color", "red"));
        assert!(filters.is_empty());
    }

    #[test]
    fn test_lookup_does_not_affect_facet_order() {
        let mut filters = AppliedFilters::new();
        filters.apply_string_filter("a", "1");
        assert!(!filters.is_value_applied("b", "1"));
        filters.apply_string_filter("c", "1");
        filters.apply_string_filter("b", "1");

        assert_eq!(
            filters.to_string(),
            r#"a IN ["1"] AND c IN ["1"] AND b IN ["1"]"#
        );
    }

    #[test]
    fn test_without_keeps_include_all_of_other_facets() {
        let mut filters = AppliedFilters::new();
        filters.apply_string_filter("color", "red");
        filters.apply_string_filter("color", "red");
        filters.apply_string_filter("size", "M");
        filters.apply_string_filter("size", "L");
        filters.apply_string_filter("size", "XL");
        filters.apply_string_filter("size", "XL");
        filters.include_all("size", Some(true));

        let derived = filters.without("color");

        assert_eq!(filters.length(), 2);
        assert_eq!(derived.length(), 1);
        assert!(derived.includes_all("size"));
        assert_eq!(
            derived.to_string(),
            r#"(size = "M" AND size = "L") AND size NOT IN ["XL"]"#
        );
    }

    #[test]
    fn test_bounding_box_joins_flat_chain() {
        let mut filters = AppliedFilters::new();
        filters.apply_string_filter("size", "M");
        filters.apply_range_filter("price", (10.0, 20.0));
        filters.apply_bounding_box(GeoBoundingBox::new((1.0, 2.0), (3.0, 4.0)));

        let rendered = filters.to_string();

        assert_eq!(
            rendered,
            r#"size IN ["M"] AND price 10 TO 20 AND _geoBoundingBox([1, 2], [3, 4])"#
        );
        assert!(!rendered.starts_with('('));
    }

    #[test]
    fn test_custom_syntax_is_used() {
        struct Sql;
        impl FilterSyntax for Sql {
            fn any_of(&self, facet: &str, values: &[&str]) -> Expression {
                Expression::clause(format!("{facet} IN ({})", values.join(",")))
            }
            fn all_of(&self, facet: &str, values: &[&str]) -> Expression {
                Expression::clause(format!("{facet} @> ({})", values.join(",")))
            }
            fn none_of(&self, facet: &str, values: &[&str]) -> Expression {
                Expression::clause(format!("{facet} NOT IN ({})", values.join(",")))
            }
            fn between(&self, facet: &str, min: f64, max: f64) -> Expression {
                Expression::clause(format!("{facet} BETWEEN {min} AND {max}"))
            }
            fn within_bounding_box(&self, _bounding_box: &GeoBoundingBox) -> Expression {
                Expression::clause("IN_BOX")
            }
        }

        let mut filters = AppliedFilters::new();
        filters.apply_string_filter("color", "red");
        filters.apply_range_filter("price", (1.0, 2.0));

        assert_eq!(
            filters.compile(&Sql).to_string(),
            "color IN (red) AND price BETWEEN 1 AND 2"
        );
    }
}
