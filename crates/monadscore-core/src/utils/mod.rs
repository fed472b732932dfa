pub mod format;

pub use format::{describe_points, format_points, short_address, truncate_string};
