//! Success rules: the stored grammar and its evaluation against benchmark readings.

pub mod evaluator;
pub mod grammar;

pub use evaluator::*;
pub use grammar::*;
