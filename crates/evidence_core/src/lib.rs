//! # evidence_core - Performance Evidence & Category-Advancement Engine
//!
//! Core of a golf academy training platform:
//! - **registry**: test numbers to performance domains, SG components and proof metrics
//! - **rules**: the success-rule grammar and its evaluation against benchmark readings
//! - **constraints**: which unmet requirements block advancement to the next skill category
//! - **tracker**: effort vs. proven progress for a player's breaking points
//!
//! Persistence is consumed through the traits in [`store`]; the in-memory
//! adapters there back the tests and benches.

#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod constraints;
pub mod data;
pub mod error;
pub mod registry;
pub mod rules;
pub mod store;
pub mod tracker;

pub use config::EvidenceConfig;
pub use constraints::{BindingConstraint, CategoryConstraintAnalyzer, ConstraintReport, Severity};
pub use error::{EvidenceError, Result};
pub use registry::{
    map_domain_to_component, map_test_number_to_domain, DomainRegistry, Gender, PerformanceDomain,
    ProofMetric, SgComponent, SkillCategory,
};
pub use rules::{
    build_default_success_rule, parse_success_rule, RuleEvaluation, RuleOutcomeReason, SuccessRule,
    SuccessRuleEngine,
};
pub use tracker::{
    calculate_effort_from_sessions, BreakingPoint, BreakingPointStatus, BreakingPointTracker,
    StatusTransition,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
