//! Error model.

use std::any::Any;

use thiserror::Error;

/// Result type used by registration and configuration calls.
pub type BouncerResult<T> = Result<T, BouncerError>;

/// Setup-time error.
///
/// These surface synchronously to the caller of the offending registration or
/// configuration call. Decision-time failures never use this type: they are
/// folded into a deny [`crate::Verdict`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BouncerError {
    /// Malformed registration/configuration input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A rule with this name is already registered.
    #[error("rule already defined: '{0}'")]
    DuplicateRule(String),

    /// The error observer can only be configured once.
    #[error("error observer already set")]
    ObserverAlreadySet,
}

impl BouncerError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn duplicate_rule(name: impl Into<String>) -> Self {
        Self::DuplicateRule(name.into())
    }
}

/// Raw failure raised by a rule while it was being evaluated.
///
/// Handed to the error observer untouched, so callers can downcast
/// [`RuleFailure::Error`] back to the type their rule returned.
#[derive(Debug)]
pub enum RuleFailure {
    /// The rule returned `Err`.
    Error(anyhow::Error),

    /// The rule panicked; carries the raw panic payload.
    Panic(Box<dyn Any + Send + 'static>),
}

impl RuleFailure {
    /// The original error, if the rule returned one.
    pub fn as_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Error(err) => Some(err),
            Self::Panic(_) => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// The panic message, when the payload was a `&str` or `String`.
    pub fn panic_message(&self) -> Option<&str> {
        let Self::Panic(payload) = self else {
            return None;
        };
        payload
            .downcast_ref::<&'static str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
    }
}

impl From<anyhow::Error> for RuleFailure {
    fn from(value: anyhow::Error) -> Self {
        Self::Error(value)
    }
}

impl core::fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Error(err) => write!(f, "rule returned error: {err:#}"),
            Self::Panic(_) => match self.panic_message() {
                Some(msg) => write!(f, "rule panicked: {msg}"),
                None => f.write_str("rule panicked"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq, Eq)]
    #[error("mock unexpected error")]
    struct MockError;

    #[test]
    fn rule_failure_preserves_original_error() {
        let failure = RuleFailure::from(anyhow::Error::new(MockError));

        let err = failure.as_error().unwrap();
        assert_eq!(err.downcast_ref::<MockError>(), Some(&MockError));
        assert!(!failure.is_panic());
        assert_eq!(failure.to_string(), "rule returned error: mock unexpected error");
    }

    #[test]
    fn panic_failure_has_no_error() {
        let failure = RuleFailure::Panic(Box::new("boom"));

        assert!(failure.as_error().is_none());
        assert!(failure.is_panic());
        assert_eq!(failure.panic_message(), Some("boom"));
        assert_eq!(failure.to_string(), "rule panicked: boom");

        let formatted = RuleFailure::Panic(Box::new(format!("boom {}", 2)));
        assert_eq!(formatted.panic_message(), Some("boom 2"));
    }

    #[test]
    fn panic_failure_keeps_raw_payload() {
        #[derive(Debug, PartialEq)]
        struct Code(u32);

        let failure = RuleFailure::Panic(Box::new(Code(7)));

        assert_eq!(failure.panic_message(), None);
        assert_eq!(failure.to_string(), "rule panicked");
        let RuleFailure::Panic(payload) = failure else {
            panic!("expected panic failure");
        };
        assert_eq!(payload.downcast_ref::<Code>(), Some(&Code(7)));
    }

    #[test]
    fn setup_errors_display() {
        assert_eq!(
            BouncerError::duplicate_rule("enter club").to_string(),
            "rule already defined: 'enter club'"
        );
        assert_eq!(
            BouncerError::invalid_argument("name must not be empty").to_string(),
            "invalid argument: name must not be empty"
        );
        assert_eq!(BouncerError::ObserverAlreadySet.to_string(), "error observer already set");
    }
}
