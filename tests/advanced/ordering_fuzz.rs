#![cfg(all(feature = "advanced-tests", not(loom)))]
//! Property-based tests driving `ResponseCorrelator` with random operation
//! sequences and checking every outcome against a simple model.

use proptest::prelude::*;
use replyline::{
    CorrelationError,
    ReplyOutcome,
    ResponseCorrelator,
    ResponseFuture,
    WaitError,
};

#[derive(Debug, Clone)]
enum Op {
    Begin(usize),
    Reply(u16),
    Fault,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => (0usize..5).prop_map(Op::Begin),
        4 => (200u16..600).prop_map(Op::Reply),
        1 => Just(Op::Fault),
    ]
}

struct Model {
    expected: usize,
    collected: Vec<u16>,
    wait: ResponseFuture<u16, &'static str>,
}

fn run(ops: &[Op]) -> Result<(), TestCaseError> {
    let correlator = ResponseCorrelator::<u16, &'static str>::new();
    let mut model: Option<Model> = None;

    for op in ops {
        match *op {
            Op::Begin(n) => {
                let state = model.as_ref().map(|m| (m.expected, m.collected.len()));
                match (state, correlator.begin_wait(n)) {
                    (Some(progress), Err(WaitError::AlreadyPending { expected, collected, .. })) => {
                        prop_assert_eq!((expected, collected), progress);
                    }
                    (None, Err(WaitError::ZeroReplies)) => prop_assert_eq!(n, 0),
                    (None, Ok(wait)) => {
                        prop_assert!(n > 0);
                        model = Some(Model {
                            expected: n,
                            collected: Vec::new(),
                            wait,
                        });
                    }
                    (state, other) => {
                        return Err(TestCaseError::fail(format!(
                            "begin_wait({n}) with pending={state:?} gave {:?}",
                            other.map(|_| ())
                        )));
                    }
                }
            }
            Op::Reply(code) => {
                let outcome = correlator.on_reply(code);
                match model.take() {
                    None => prop_assert_eq!(outcome, ReplyOutcome::Discarded),
                    Some(mut pending) => {
                        pending.collected.push(code);
                        if pending.collected.len() == pending.expected {
                            prop_assert_eq!(outcome, ReplyOutcome::Completed);
                            let replies = pending.wait.try_take();
                            prop_assert_eq!(replies, Some(Ok(pending.collected)));
                        } else {
                            prop_assert_eq!(
                                outcome,
                                ReplyOutcome::Collected {
                                    collected: pending.collected.len(),
                                    expected: pending.expected,
                                }
                            );
                            prop_assert!(!pending.wait.is_done());
                            model = Some(pending);
                        }
                    }
                }
            }
            Op::Fault => {
                let unclaimed = correlator.on_fault("boom");
                match model.take() {
                    None => prop_assert_eq!(unclaimed, Some("boom")),
                    Some(mut pending) => {
                        prop_assert_eq!(unclaimed, None);
                        let outcome = pending.wait.try_take();
                        prop_assert!(
                            matches!(outcome, Some(Err(CorrelationError::Fault("boom")))),
                            "wait resolved with {:?}",
                            outcome
                        );
                    }
                }
            }
        }
        prop_assert_eq!(correlator.is_pending(), model.is_some());
    }
    Ok(())
}

proptest! {
    #[test]
    fn correlator_matches_model(ops in prop::collection::vec(op(), 0..64)) {
        run(&ops)?;
    }
}
