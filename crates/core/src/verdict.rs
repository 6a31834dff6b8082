use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Fixed reasons used when the engine, not the rule, decides.
pub mod reasons {
    /// The requested rule name is not registered.
    pub const NO_RULE_SET: &str = "no rule set";

    /// The rule returned an error or panicked.
    pub const ERROR_INTERPRETING_RULE: &str = "error interpreting rule";

    /// Nothing settled the decision before its deadline.
    pub const RULE_TIMED_OUT: &str = "rule timed out";
}

/// Final allow/deny outcome of one decision, with a human-readable reason.
///
/// `is_deny` is always `!is_allow`; the only way to build a verdict is through
/// [`Verdict::allow`] and [`Verdict::deny`]. Serialized as
/// `{"isAllow": .., "isDeny": .., "reason": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "VerdictRepr")]
pub struct Verdict {
    is_allow: bool,
    is_deny: bool,
    reason: Cow<'static, str>,
}

impl Verdict {
    pub fn allow(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::build(true, reason.into())
    }

    pub fn deny(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::build(false, reason.into())
    }

    pub fn no_rule_set() -> Self {
        Self::deny(reasons::NO_RULE_SET)
    }

    pub fn error_interpreting_rule() -> Self {
        Self::deny(reasons::ERROR_INTERPRETING_RULE)
    }

    pub fn timed_out() -> Self {
        Self::deny(reasons::RULE_TIMED_OUT)
    }

    fn build(is_allow: bool, reason: Cow<'static, str>) -> Self {
        Self {
            is_allow,
            is_deny: !is_allow,
            reason,
        }
    }

    pub fn is_allow(&self) -> bool {
        self.is_allow
    }

    pub fn is_deny(&self) -> bool {
        self.is_deny
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl core::fmt::Display for Verdict {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let outcome = if self.is_allow { "allow" } else { "deny" };
        write!(f, "{outcome}: {}", self.reason)
    }
}

// `isDeny` is derived on the way in so a hand-written payload cannot break
// the `is_deny == !is_allow` invariant.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerdictRepr {
    is_allow: bool,
    reason: String,
}

impl From<VerdictRepr> for Verdict {
    fn from(value: VerdictRepr) -> Self {
        Self::build(value.is_allow, Cow::Owned(value.reason))
    }
}
