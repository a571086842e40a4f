//! Record filtering: criteria resolution and predicate evaluation
//!
//! Filtering is split into small pieces that resolve independently and are
//! then ANDed together:
//!
//! - [`FilterOptions`] holds the raw criteria for one run, one optional
//!   field per criterion.
//! - [`TimeWindow`] resolves the time-related options into a single
//!   half-open interval, honoring the precedence relative span > today >
//!   absolute bounds.
//! - [`WeekdaySelection`] evaluates the day-of-week tokens, where exactly
//!   two tokens form a cyclic range and any other count is a plain set.
//! - [`RecordFilter`] compiles everything into one predicate, validating
//!   all inputs up front so that evaluation itself cannot fail.
//!
//! All validation failures are [`FilterError`]s, raised before any record
//! is read.

pub mod error;
pub mod matcher;
pub mod options;
pub mod weekday;
pub mod window;

pub use error::FilterError;
pub use matcher::RecordFilter;
pub use options::{FilterOptions, parse_time_bound, print_filter_warnings};
pub use weekday::WeekdaySelection;
pub use window::TimeWindow;
