//! Rule capability.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::Decision;

/// A named policy rule.
///
/// A rule receives the decision handle plus caller-supplied arguments and is
/// expected to call [`Decision::allow`] or [`Decision::deny`] at some point,
/// possibly after asynchronous work. Returning `Err` (or panicking) means the
/// rule failed: the decision is denied and the error goes to the registry's
/// error observer.
///
/// The return value carries no verdict. A rule that returns `Ok(())` without
/// settling simply leaves the decision to its deadline.
#[async_trait]
pub trait Rule<A: Send + 'static>: Send + Sync {
    async fn evaluate(&self, decision: Decision, args: A) -> anyhow::Result<()>;
}

/// Synchronous rule built from a closure. See [`rule_fn`].
pub struct FnRule<F, A> {
    f: F,
    _args: PhantomData<fn(A)>,
}

/// Wrap a synchronous closure as a [`Rule`].
///
/// ```ignore
/// bouncer.set_rule("enter club", rule_fn(|decision: Decision, args: Value| {
///     if args["age"].as_u64().unwrap_or(0) >= 21 {
///         decision.allow("user is old enough");
///     } else {
///         decision.deny("user is a minor");
///     }
///     Ok(())
/// }))?;
/// ```
pub fn rule_fn<A, F>(f: F) -> FnRule<F, A>
where
    F: Fn(Decision, A) -> anyhow::Result<()> + Send + Sync + 'static,
{
    FnRule {
        f,
        _args: PhantomData,
    }
}

#[async_trait]
impl<A, F> Rule<A> for FnRule<F, A>
where
    A: Send + 'static,
    F: Fn(Decision, A) -> anyhow::Result<()> + Send + Sync,
{
    async fn evaluate(&self, decision: Decision, args: A) -> anyhow::Result<()> {
        (self.f)(decision, args)
    }
}

/// Asynchronous rule built from a closure returning a future. See [`async_rule_fn`].
pub struct AsyncFnRule<F, A> {
    f: F,
    _args: PhantomData<fn(A)>,
}

/// Wrap a closure returning a future as a [`Rule`].
pub fn async_rule_fn<A, F, Fut>(f: F) -> AsyncFnRule<F, A>
where
    F: Fn(Decision, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    AsyncFnRule {
        f,
        _args: PhantomData,
    }
}

#[async_trait]
impl<A, F, Fut> Rule<A> for AsyncFnRule<F, A>
where
    A: Send + 'static,
    F: Fn(Decision, A) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn evaluate(&self, decision: Decision, args: A) -> anyhow::Result<()> {
        (self.f)(decision, args).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bouncer_core::Verdict;

    use super::*;

    struct AdminOnly;

    #[async_trait]
    impl Rule<&'static str> for AdminOnly {
        async fn evaluate(&self, decision: Decision, role: &'static str) -> anyhow::Result<()> {
            if role == "admin" {
                decision.allow("admin");
            } else {
                decision.deny("not an admin");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn trait_impl_settles_decision() {
        let decision = Decision::new(Duration::from_secs(1));
        AdminOnly.evaluate(decision.clone(), "guest").await.unwrap();
        assert_eq!(decision.verdict().await, Verdict::deny("not an admin"));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_closure_rule() {
        let rule = rule_fn(|decision: Decision, age: u32| {
            if age >= 21 {
                decision.allow("user is old enough");
            } else {
                decision.deny("user is a minor");
            }
            Ok(())
        });

        let decision = Decision::new(Duration::from_secs(1));
        rule.evaluate(decision.clone(), 25).await.unwrap();
        assert_eq!(decision.verdict().await, Verdict::allow("user is old enough"));
    }

    #[tokio::test(start_paused = true)]
    async fn async_closure_rule() {
        let rule = async_rule_fn(|decision: Decision, _args: ()| async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            decision.allow("async works");
            anyhow::Ok(())
        });

        let decision = Decision::new(Duration::from_secs(1));
        rule.evaluate(decision.clone(), ()).await.unwrap();
        assert_eq!(decision.verdict().await, Verdict::allow("async works"));
    }

    #[tokio::test(start_paused = true)]
    async fn closure_error_is_returned() {
        let rule = rule_fn(|_decision: Decision, _args: ()| anyhow::bail!("mock unexpected error"));

        let decision = Decision::new(Duration::from_secs(1));
        let err = rule.evaluate(decision.clone(), ()).await.unwrap_err();
        assert_eq!(err.to_string(), "mock unexpected error");
        assert!(!decision.is_settled());
    }
}
