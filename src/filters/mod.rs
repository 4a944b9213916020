//! Facet filter model and filter expression syntax.

mod applied;
mod syntax;

pub use applied::{AppliedFilters, Coordinates, FacetRange, GeoBoundingBox, StringFilterStatus, Transition};
pub use syntax::{Expression, FilterSyntax, MeilisearchSyntax};
