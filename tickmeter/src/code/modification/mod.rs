//! In-place splicing of matched instruction sequences

pub mod rewriter;
pub mod splice;

pub use rewriter::rewrite_all;
pub use splice::SpliceRule;
