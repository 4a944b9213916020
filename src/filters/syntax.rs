//! Filter expression building.
//!
//! [`AppliedFilters`](super::AppliedFilters) never writes filter syntax
//! itself. It asks a [`FilterSyntax`] for five fragment kinds and combines
//! them with [`FilterSyntax::and`]. [`MeilisearchSyntax`] is the stock
//! implementation:
//!
//! | Fragment | Output |
//! |----------|--------|
//! | any of | `genre IN ["drama", "horror"]` |
//! | all of | `genre = "drama" AND genre = "horror"` |
//! | none of | `genre NOT IN ["comedy"]` |
//! | range | `year 1990 TO 1999` |
//! | geo box | `_geoBoundingBox([48.9, 2.2], [48.8, 2.4])` |

use super::applied::GeoBoundingBox;
use std::fmt;

/// A compiled filter expression.
///
/// Conjunctions are kept as a tree so that nested conjunctions can be
/// parenthesised when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Expression {
    /// Matches everything; renders as an empty string.
    #[default]
    Empty,
    /// A single predicate, rendered verbatim.
    Clause(String),
    /// Conjunction of sub-expressions.
    And(Vec<Self>),
}

impl Expression {
    /// Creates a single predicate.
    #[must_use]
    pub fn clause(predicate: impl Into<String>) -> Self {
        Self::Clause(predicate.into())
    }

    /// Combines `parts` with AND.
    ///
    /// Empty parts are dropped. No parts yields [`Expression::Empty`], a
    /// single part is returned as is.
    #[must_use]
    pub fn and(parts: impl IntoIterator<Item = Self>) -> Self {
        let mut parts: Vec<Self> = parts.into_iter().filter(|p| !p.is_empty()).collect();
        match parts.len() {
            0 => Self::Empty,
            1 => parts.pop().unwrap_or_default(),
            _ => Self::And(parts),
        }
    }

    /// Returns true if the expression matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Clause(clause) => clause.is_empty(),
            Self::And(parts) => parts.iter().all(Self::is_empty),
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::And(parts) if parts.iter().filter(|p| !p.is_empty()).count() > 1)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Clause(clause) => f.write_str(clause),
            Self::And(parts) => {
                let mut first = true;
                for part in parts.iter().filter(|p| !p.is_empty()) {
                    if !first {
                        f.write_str(" AND ")?;
                    }
                    first = false;
                    if part.is_compound() {
                        write!(f, "({part})")?;
                    } else {
                        write!(f, "{part}")?;
                    }
                }
                Ok(())
            },
        }
    }
}

/// Backend-specific filter expression builder.
///
/// Facet names and values are passed through opaquely; implementations decide
/// how to quote them.
pub trait FilterSyntax {
    /// Matches documents whose facet holds at least one of `values`.
    fn any_of(&self, facet: &str, values: &[&str]) -> Expression;

    /// Matches documents whose facet holds every one of `values`.
    fn all_of(&self, facet: &str, values: &[&str]) -> Expression;

    /// Matches documents whose facet holds none of `values`.
    fn none_of(&self, facet: &str, values: &[&str]) -> Expression;

    /// Matches documents whose facet lies in `[min, max]`.
    fn between(&self, facet: &str, min: f64, max: f64) -> Expression;

    /// Matches documents located inside `bounding_box`.
    fn within_bounding_box(&self, bounding_box: &GeoBoundingBox) -> Expression;

    /// Combines `parts` with AND.
    fn and(&self, parts: Vec<Expression>) -> Expression {
        Expression::and(parts)
    }
}

/// Meilisearch filter syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeilisearchSyntax;

impl MeilisearchSyntax {
    fn quote(value: &str) -> String {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    }

    fn list(values: &[&str]) -> String {
        let quoted: Vec<String> = values.iter().map(|v| Self::quote(v)).collect();
        format!("[{}]", quoted.join(", "))
    }
}

impl FilterSyntax for MeilisearchSyntax {
    fn any_of(&self, facet: &str, values: &[&str]) -> Expression {
        if values.is_empty() {
            return Expression::Empty;
        }
        Expression::clause(format!("{facet} IN {}", Self::list(values)))
    }

    fn all_of(&self, facet: &str, values: &[&str]) -> Expression {
        Expression::and(
            values
                .iter()
                .map(|v| Expression::clause(format!("{facet} = {}", Self::quote(v)))),
        )
    }

    fn none_of(&self, facet: &str, values: &[&str]) -> Expression {
        if values.is_empty() {
            return Expression::Empty;
        }
        Expression::clause(format!("{facet} NOT IN {}", Self::list(values)))
    }

    fn between(&self, facet: &str, min: f64, max: f64) -> Expression {
        Expression::clause(format!("{facet} {min} TO {max}"))
    }

    fn within_bounding_box(&self, bounding_box: &GeoBoundingBox) -> Expression {
        let (top, left) = bounding_box.top_left;
        let (bottom, right) = bounding_box.bottom_right;
        Expression::clause(format!(
            "_geoBoundingBox([{top}, {left}], [{bottom}, {right}])"
        ))
    }
}
