use std::time::Duration;

use bouncer::{Bouncer, Decision, Verdict, rule_fn};
use proptest::prelude::*;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

/// One explicit settlement attempt.
#[derive(Debug, Clone)]
enum Attempt {
    Allow(String),
    Deny(String),
}

fn attempt() -> impl Strategy<Value = Attempt> {
    prop_oneof![
        ".*".prop_map(Attempt::Allow),
        ".*".prop_map(Attempt::Deny),
    ]
}

fn expected(attempt: &Attempt) -> Verdict {
    match attempt {
        Attempt::Allow(reason) => Verdict::allow(reason.clone()),
        Attempt::Deny(reason) => Verdict::deny(reason.clone()),
    }
}

proptest! {
    #[test]
    fn first_settlement_wins(attempts in prop::collection::vec(attempt(), 1..8)) {
        let rt = paused_runtime();
        let verdict = rt.block_on(async {
            let decision = Decision::new(Duration::from_secs(1));
            let wins: Vec<bool> = attempts
                .iter()
                .map(|a| match a {
                    Attempt::Allow(reason) => decision.allow(reason.clone()),
                    Attempt::Deny(reason) => decision.deny(reason.clone()),
                })
                .collect();

            assert!(wins[0]);
            assert!(wins[1..].iter().all(|won| !won));
            decision.verdict().await
        });

        prop_assert_eq!(verdict, expected(&attempts[0]));
    }

    #[test]
    fn reason_passes_through_dispatcher(reason in ".*", allow in any::<bool>()) {
        let rt = paused_runtime();
        let bouncer: Bouncer<(String, bool)> = Bouncer::new();
        bouncer
            .set_rule(
                "echo",
                rule_fn(|decision: Decision, (reason, allow): (String, bool)| {
                    if allow {
                        decision.allow(reason);
                    } else {
                        decision.deny(reason);
                    }
                    Ok(())
                }),
            )
            .unwrap();

        let verdict = rt.block_on(bouncer.decide("echo", (reason.clone(), allow)));

        prop_assert_eq!(verdict.is_allow(), allow);
        prop_assert_eq!(verdict.is_deny(), !allow);
        prop_assert_eq!(verdict.reason(), reason.as_str());
    }

    #[test]
    fn unknown_names_are_denied(name in "[a-z ]{1,16}") {
        let rt = paused_runtime();
        let bouncer: Bouncer = Bouncer::new();

        let verdict = rt.block_on(bouncer.decide(&name, serde_json::Value::Null));

        prop_assert_eq!(verdict, Verdict::no_rule_set());
    }

    #[test]
    fn silent_rules_time_out_no_earlier_than_deadline(timeout_ms in 1u64..5_000) {
        let rt = paused_runtime();
        let bouncer: Bouncer = Bouncer::new();
        bouncer.set_timeout(Duration::from_millis(timeout_ms));
        bouncer
            .set_rule("silent", rule_fn(|_decision: Decision, _args: serde_json::Value| Ok(())))
            .unwrap();

        let (verdict, elapsed) = rt.block_on(async {
            let started = tokio::time::Instant::now();
            let verdict = bouncer.decide("silent", serde_json::Value::Null).await;
            (verdict, started.elapsed())
        });

        prop_assert_eq!(verdict, Verdict::timed_out());
        prop_assert!(elapsed >= Duration::from_millis(timeout_ms));
    }
}
