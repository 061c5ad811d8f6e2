//! Category Constraint Analyzer: which unmet requirements block advancement
//! to the next skill category.

pub mod analyzer;
pub mod cache;
pub mod requirement;

pub use analyzer::*;
pub use cache::*;
pub use requirement::*;

pub use crate::registry::{Gender, SkillCategory};
