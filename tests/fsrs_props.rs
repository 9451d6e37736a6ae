//! Property-based tests for the memory model.
//!
//! Invariants checked across the input space:
//! - retrievability stays in (0, 1] and decreases with elapsed time
//! - successful recall never shrinks stability
//! - a lapse never grows stability, and the result stays positive
//! - difficulty updates pull toward the good-grade baseline

use proptest::prelude::*;

use mnemo::fsrs::{retrievability, FsrsParams, Grade, STABILITY_FLOOR};

// ============================================================================
// Generators
// ============================================================================

fn arb_stability() -> impl Strategy<Value = f64> {
    (1u64..=36500u64).prop_map(|v| v as f64 / 100.0)
}

fn arb_difficulty() -> impl Strategy<Value = f64> {
    // Range produced by the reference weight vector.
    (100u64..=1000u64).prop_map(|v| v as f64 / 100.0)
}

fn arb_retrievability() -> impl Strategy<Value = f64> {
    (1u64..=999u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_elapsed_days() -> impl Strategy<Value = f64> {
    (0u64..=3650u64).prop_map(|v| v as f64)
}

fn arb_success_grade() -> impl Strategy<Value = Grade> {
    prop_oneof![
        Just(Grade::Hard),
        Just(Grade::Good),
        Just(Grade::Easy),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn retrievability_is_a_probability(t in arb_elapsed_days(), s in arb_stability()) {
        let r = retrievability(t, s);
        prop_assert!(r > 0.0);
        prop_assert!(r <= 1.0);
        prop_assert!(r.is_finite());
    }

    #[test]
    fn retrievability_decreases_with_time(t in arb_elapsed_days(), s in arb_stability()) {
        let earlier = retrievability(t, s);
        let later = retrievability(t + 1.0, s);
        prop_assert!(later < earlier);
    }

    #[test]
    fn retrievability_increases_with_stability(t in 1u64..=3650u64, s in arb_stability()) {
        let weaker = retrievability(t as f64, s);
        let stronger = retrievability(t as f64, s + 1.0);
        prop_assert!(stronger > weaker);
    }

    #[test]
    fn successful_recall_never_shrinks_stability(
        d in arb_difficulty(),
        s in arb_stability(),
        r in arb_retrievability(),
        grade in arb_success_grade(),
    ) {
        let params = FsrsParams::default();
        let next = params.next_stability(d, s, r, grade);
        prop_assert!(next.is_finite());
        prop_assert!(next >= s);
    }

    #[test]
    fn lapse_never_grows_stability(
        d in arb_difficulty(),
        s in arb_stability(),
        r in arb_retrievability(),
    ) {
        let params = FsrsParams::default();
        let next = params.next_stability(d, s, r, Grade::Again);
        prop_assert!(next.is_finite());
        prop_assert!(next >= STABILITY_FLOOR);
        prop_assert!(next <= s.max(STABILITY_FLOOR));
    }

    #[test]
    fn next_stability_guards_malformed_stored_stability(
        d in arb_difficulty(),
        r in arb_retrievability(),
        grade in arb_success_grade(),
    ) {
        // Non-positive stability slipping in from corrupt history must not
        // produce NaN or a non-positive result.
        let params = FsrsParams::default();
        for bad in [0.0, -1.0, -100.0] {
            let next = params.next_stability(d, bad, r, grade);
            prop_assert!(next.is_finite());
            prop_assert!(next >= STABILITY_FLOOR);
        }
    }

    #[test]
    fn difficulty_update_is_finite_and_ordered(d in arb_difficulty()) {
        let params = FsrsParams::default();
        let after_fail = params.next_difficulty(d, Grade::Again);
        let after_easy = params.next_difficulty(d, Grade::Easy);
        prop_assert!(after_fail.is_finite());
        prop_assert!(after_easy.is_finite());
        // Failure never makes a concept look easier than success does.
        prop_assert!(after_fail > after_easy);
    }
}
