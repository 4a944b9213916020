//! Presentation helpers shared by the CLI and library consumers.

mod fields;
mod pagination;
mod picture_url;
mod time;

pub use fields::{FieldLayout, NAME_FIELD_CANDIDATES};
pub use pagination::Pagination;
pub use picture_url::looks_like_a_picture_url;
pub use time::{
    DEFAULT_DATE_PATTERN, DateFormatOptions, DurationParts, PRETTY_DATE, PRETTY_DATE_SHORT,
    format_date, format_duration, parse_date, parse_iso_duration, parse_offset,
};
