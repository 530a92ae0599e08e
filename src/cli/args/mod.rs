//! Shared CLI argument types

mod common;
mod global;

pub use common::{OutputFormat, parse_header};
pub use global::GlobalOptions;
