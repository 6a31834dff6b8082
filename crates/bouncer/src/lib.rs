//! `bouncer` — rule-based authorization decisions.
//!
//! Callers register named rules on a [`Bouncer`], then ask for a decision by
//! rule name. Every decision resolves to a [`Verdict`]: the rule's own
//! allow/deny, or a deny when the rule is missing, fails, or misses its
//! deadline.
//!
//! This crate is intentionally decoupled from transport and storage.

pub mod config;
pub mod decision;
pub mod registry;
pub mod rule;

pub use bouncer_core::{BouncerError, BouncerResult, DecisionId, RuleFailure, Verdict, reasons};
pub use config::{BouncerConfig, DEFAULT_TIMEOUT};
pub use decision::Decision;
pub use registry::{Bouncer, ErrorObserver};
pub use rule::{AsyncFnRule, FnRule, Rule, async_rule_fn, rule_fn};
