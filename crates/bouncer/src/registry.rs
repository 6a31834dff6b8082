//! Rule registry and decision dispatcher.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, debug, debug_span, warn};

use bouncer_core::{BouncerError, BouncerResult, RuleFailure, Verdict, reasons};

use crate::config::{BouncerConfig, timeout_from_millis};
use crate::{Decision, Rule};

/// Error observer callback, invoked with the raw failure of a rule.
pub type ErrorObserver = Arc<dyn Fn(RuleFailure) + Send + Sync>;

type SharedRule<A> = Arc<dyn Rule<A>>;

/// Rule registry and decision entry point.
///
/// Cheap to clone; clones share rules and configuration. Rules are
/// registered once and never removed. Every call to [`Bouncer::decide`]
/// resolves to a [`Verdict`], whatever the rule does.
pub struct Bouncer<A = serde_json::Value>
where
    A: Send + 'static,
{
    inner: Arc<Inner<A>>,
}

struct Inner<A: Send + 'static> {
    rules: RwLock<HashMap<String, SharedRule<A>>>,
    timeout: RwLock<Duration>,
    observer: OnceLock<ErrorObserver>,
}

impl<A: Send + 'static> Clone for Bouncer<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + 'static> Default for Bouncer<A> {
    fn default() -> Self {
        Self::with_config(BouncerConfig::default())
    }
}

impl<A: Send + 'static> core::fmt::Debug for Bouncer<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bouncer")
            .field("rules", &self.rule_names())
            .field("timeout", &self.timeout())
            .field("has_error_observer", &self.inner.observer.get().is_some())
            .finish()
    }
}

impl<A: Send + 'static> Bouncer<A> {
    /// Registry with the default 5000 ms timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BouncerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                rules: RwLock::new(HashMap::new()),
                timeout: RwLock::new(config.default_timeout),
                observer: OnceLock::new(),
            }),
        }
    }

    /// Register a rule under `name`.
    ///
    /// Any string is a valid name, including `""`. Fails with `DuplicateRule`
    /// if the name is taken; the existing rule is never replaced.
    pub fn set_rule<R>(&self, name: impl Into<String>, rule: R) -> BouncerResult<()>
    where
        R: Rule<A> + 'static,
    {
        let name = name.into();
        let mut rules = self.inner.rules.write().unwrap_or_else(PoisonError::into_inner);
        match rules.entry(name) {
            Entry::Occupied(existing) => Err(BouncerError::duplicate_rule(existing.key().as_str())),
            Entry::Vacant(slot) => {
                debug!(rule = %slot.key(), "rule registered");
                slot.insert(Arc::new(rule));
                Ok(())
            }
        }
    }

    /// Set the deadline for decisions started from now on.
    ///
    /// In-flight decisions keep the timeout they started with.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.inner.timeout.write().unwrap_or_else(PoisonError::into_inner) = timeout;
        debug!(timeout_ms = timeout.as_millis() as u64, "decision timeout updated");
    }

    /// [`Bouncer::set_timeout`] from a millisecond count.
    pub fn set_timeout_ms(&self, ms: f64) -> BouncerResult<()> {
        self.set_timeout(timeout_from_millis(ms)?);
        Ok(())
    }

    /// Install the error observer. Only one may ever be set.
    pub fn set_error_observer<F>(&self, observer: F) -> BouncerResult<()>
    where
        F: Fn(RuleFailure) + Send + Sync + 'static,
    {
        self.inner
            .observer
            .set(Arc::new(observer))
            .map_err(|_| BouncerError::ObserverAlreadySet)
    }

    pub fn timeout(&self) -> Duration {
        *self.inner.timeout.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.inner
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered rule names, sorted.
    pub fn rule_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Run rule `name` against `args` and wait for its verdict.
    ///
    /// Never fails:
    /// - unknown rule → deny "no rule set"
    /// - rule returns `Err` or panics → deny "error interpreting rule" (and the
    ///   failure goes to the error observer, if any)
    /// - nothing settles before the deadline → deny "rule timed out"
    ///
    /// Must be polled inside a Tokio runtime; the rule runs on its own task.
    pub async fn decide(&self, name: &str, args: A) -> Verdict {
        let decision = Decision::new(self.timeout());
        let span = debug_span!("decide", decision_id = %decision.id(), rule = name);

        match self.rule(name) {
            None => {
                decision.deny(reasons::NO_RULE_SET);
            }
            Some(rule) => {
                span.in_scope(|| self.spawn_rule(name, rule, decision.clone(), args));
            }
        }

        let verdict = decision.verdict().instrument(span).await;
        debug!(
            decision_id = %decision.id(),
            rule = name,
            allow = verdict.is_allow(),
            reason = verdict.reason(),
            "decision resolved"
        );
        verdict
    }

    fn rule(&self, name: &str) -> Option<SharedRule<A>> {
        self.inner
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Evaluate the rule on its own task, supervised until it completes.
    ///
    /// The rule is never cancelled: it may keep working past the verdict or
    /// the deadline. A failure at any point is reported; once the decision is
    /// settled its deny is a no-op.
    fn spawn_rule(&self, name: &str, rule: SharedRule<A>, decision: Decision, args: A) {
        let inner = Arc::clone(&self.inner);
        let name = name.to_owned();

        let rule_decision = decision.clone();
        let evaluation: JoinHandle<anyhow::Result<()>> =
            tokio::spawn(async move { rule.evaluate(rule_decision, args).await }.in_current_span());

        tokio::spawn(
            async move {
                match evaluation.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => inner.report(&name, &decision, RuleFailure::Error(err)),
                    Err(join_err) => {
                        if let Some(failure) = panic_failure(join_err) {
                            inner.report(&name, &decision, failure);
                        }
                    }
                }
            }
            .in_current_span(),
        );
    }
}

impl<A: Send + 'static> Inner<A> {
    /// The observer runs before the deny, so a caller waiting on the verdict
    /// never sees it ahead of the error report.
    fn report(&self, rule: &str, decision: &Decision, failure: RuleFailure) {
        warn!(decision_id = %decision.id(), rule, error = %failure, "rule failed");

        if let Some(observer) = self.observer.get() {
            observer(failure);
        }
        decision.deny(reasons::ERROR_INTERPRETING_RULE);
    }
}

fn panic_failure(err: JoinError) -> Option<RuleFailure> {
    if !err.is_panic() {
        return None;
    }

    Some(RuleFailure::Panic(err.into_panic()))
}
