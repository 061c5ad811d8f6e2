//! Breaking Point Evidence Tracker.
//!
//! Effort and progress are separate signals with separate writers:
//! - effort comes from training-session volume
//! - progress comes from benchmark readings judged by a success rule

pub mod breaking_point;
pub mod effort;
pub mod service;
pub mod transition;


pub use breaking_point::*;
pub use effort::*;
pub use service::*;
pub use transition::*;
