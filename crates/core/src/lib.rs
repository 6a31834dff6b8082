//! `bouncer-core` — verdict and error building blocks.
//!
//! This crate contains **pure** decision primitives (no runtime, no timers).

pub mod error;
pub mod id;
pub mod verdict;

pub use error::{BouncerError, BouncerResult, RuleFailure};
pub use id::DecisionId;
pub use verdict::{Verdict, reasons};
