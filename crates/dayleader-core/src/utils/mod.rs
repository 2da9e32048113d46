//! Small formatting and arithmetic helpers.

pub mod format;

pub use format::{format_date, format_hours, percentage};
