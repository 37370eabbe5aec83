#![cfg(all(feature = "advanced-tests", loom))]
//! Concurrency tests for `ResponseCorrelator` using loom.
//!
//! The reader side (`on_reply`, `on_fault`) and the caller side
//! (`begin_wait`) run on separate threads. `loom` explores their
//! interleavings to check that every wait resolves exactly once and the slot
//! is never left occupied by a resolved wait.

use loom::{model, sync::Arc, thread};
use replyline::{CorrelationError, ReplyOutcome, ResponseCorrelator};

type Correlator = ResponseCorrelator<u8, &'static str>;

#[test]
fn reply_and_fault_race_resolves_once() {
    model(|| {
        let correlator = Arc::new(Correlator::new());
        let mut wait = correlator.begin_wait(1).expect("slot is free");

        let c1 = Arc::clone(&correlator);
        let c2 = Arc::clone(&correlator);
        let replier = thread::spawn(move || c1.on_reply(7));
        let faulter = thread::spawn(move || c2.on_fault("closed"));

        let reply = replier.join().expect("reply thread panicked");
        let unclaimed = faulter.join().expect("fault thread panicked");

        match wait.try_take().expect("wait resolved") {
            Ok(replies) => {
                assert_eq!(replies, vec![7]);
                assert_eq!(reply, ReplyOutcome::Completed);
                assert_eq!(unclaimed, Some("closed"));
            }
            Err(CorrelationError::Fault(error)) => {
                assert_eq!(error, "closed");
                assert_eq!(reply, ReplyOutcome::Discarded);
                assert_eq!(unclaimed, None);
            }
            Err(other) => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!correlator.is_pending());
    });
}

#[test]
fn concurrent_registrations_admit_one() {
    model(|| {
        let correlator = Arc::new(Correlator::new());
        let c1 = Arc::clone(&correlator);
        let c2 = Arc::clone(&correlator);

        let t1 = thread::spawn(move || c1.begin_wait(1).is_ok());
        let t2 = thread::spawn(move || c2.begin_wait(2).is_ok());

        let admitted = [
            t1.join().expect("first registrant panicked"),
            t2.join().expect("second registrant panicked"),
        ];
        assert_eq!(admitted.iter().filter(|ok| **ok).count(), 1);
    });
}

#[test]
fn registration_racing_reply() {
    model(|| {
        let correlator = Arc::new(Correlator::new());
        let reader = Arc::clone(&correlator);

        let replier = thread::spawn(move || reader.on_reply(1));
        let mut wait = correlator.begin_wait(1).expect("slot is free");
        let outcome = replier.join().expect("reply thread panicked");

        match outcome {
            ReplyOutcome::Completed => {
                assert_eq!(wait.try_take(), Some(Ok(vec![1])));
                assert!(!correlator.is_pending());
            }
            ReplyOutcome::Discarded => {
                assert!(!wait.is_done());
                assert!(correlator.is_pending());
            }
            ReplyOutcome::Collected { .. } => panic!("single-reply wait reported partial"),
        }
    });
}
