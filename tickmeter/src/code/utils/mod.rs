//! Debug helpers for instruction listings

pub mod debug;

pub use debug::{debug_print_body, format_instruction, format_listing};
