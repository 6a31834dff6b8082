//! Verdict resolver: one in-flight authorization decision.
//!
//! A [`Decision`] settles exactly once. Explicit `allow`/`deny` calls and the
//! deadline all race for that single settlement; the first attempt wins and
//! every later attempt is a no-op.
//!
//! ## Deadline
//!
//! The deadline is fixed when the decision is created. There is no timer
//! task: a settlement attempt made at or after the deadline loses to the
//! timeout verdict, and [`Decision::verdict`] races the settlement signal
//! against `sleep_until(deadline)`. Nothing is left running once the
//! decision is dropped.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use bouncer_core::{DecisionId, Verdict};

// Upper bound for deadlines that would overflow `Instant` (tokio caps sleeps
// far below this anyway).
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Handle to one decision request.
///
/// Cheap to clone; all clones share the same settlement state. The dispatcher
/// hands one clone to the rule and awaits another.
#[derive(Debug, Clone)]
pub struct Decision {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: DecisionId,
    timeout: Duration,
    deadline: Instant,
    /// `None` while pending, `Some` once settled. Only ever written through
    /// `send_if_modified`, which makes check-and-set atomic.
    state: watch::Sender<Option<Verdict>>,
}

impl Decision {
    /// Start a decision whose deadline is `timeout` from now.
    ///
    /// Never fails and does not need a running runtime.
    pub fn new(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let (state, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                id: DecisionId::new(),
                timeout,
                deadline,
                state,
            }),
        }
    }

    pub fn id(&self) -> DecisionId {
        self.inner.id
    }

    /// The timeout this decision was created with.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.inner.deadline
    }

    /// Try to settle as allowed. Returns `true` if this call won.
    pub fn allow(&self, reason: impl Into<Cow<'static, str>>) -> bool {
        self.settle(Verdict::allow(reason))
    }

    /// Try to settle as denied. Returns `true` if this call won.
    pub fn deny(&self, reason: impl Into<Cow<'static, str>>) -> bool {
        self.settle(Verdict::deny(reason))
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }

    /// The settled verdict, if any, without waiting.
    ///
    /// A decision past its deadline that nobody settled reports the timeout
    /// verdict here too.
    pub fn peek(&self) -> Option<Verdict> {
        if Instant::now() >= self.inner.deadline {
            self.expire();
        }
        self.inner.state.borrow().clone()
    }

    /// Wait for the verdict.
    ///
    /// Every caller (and every clone) observes the same verdict. Resolves no
    /// later than the deadline.
    pub async fn verdict(&self) -> Verdict {
        let mut rx = self.inner.state.subscribe();

        tokio::select! {
            biased;
            settled = rx.wait_for(Option::is_some) => {
                if let Ok(state) = settled {
                    if let Some(verdict) = state.as_ref() {
                        return verdict.clone();
                    }
                }
            }
            _ = tokio::time::sleep_until(self.inner.deadline) => {}
        }

        self.expire();
        self.inner
            .state
            .borrow()
            .clone()
            .unwrap_or_else(Verdict::timed_out)
    }

    fn settle(&self, verdict: Verdict) -> bool {
        let expired = Instant::now() >= self.inner.deadline;
        let mut won = false;

        self.inner.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            if expired {
                *state = Some(Verdict::timed_out());
            } else {
                *state = Some(verdict.clone());
                won = true;
            }
            true
        });

        if won {
            debug!(
                decision_id = %self.inner.id,
                allow = verdict.is_allow(),
                reason = verdict.reason(),
                "decision settled"
            );
        } else if expired {
            self.log_timeout();
        }

        won
    }

    /// Settle with the timeout verdict if still pending.
    fn expire(&self) {
        let expired = self.inner.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(Verdict::timed_out());
            true
        });

        if expired {
            self.log_timeout();
        }
    }

    fn log_timeout(&self) {
        warn!(
            decision_id = %self.inner.id,
            timeout_ms = self.inner.timeout.as_millis() as u64,
            "decision timed out"
        );
    }
}
