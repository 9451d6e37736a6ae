//! FSRS-4.5 memory model.
//!
//! Pure functions computing stability, difficulty and retrievability from a
//! fixed 17-element weight vector. No state, no randomness: every output is
//! fully determined by its inputs, so the whole scheduling behavior is pinned
//! by the parameter vector.

use serde::{Deserialize, Serialize};

/// Reference FSRS-4.5 weight vector.
///
/// Treated as a versioned constant: swapping it changes every derived
/// stability/difficulty value, so it is never adjusted in place.
/// See <https://github.com/open-spaced-repetition/fsrs4anki/wiki/The-Algorithm>
pub const FSRS45_WEIGHTS: [f64; 17] = [
    0.4872, 1.4003, 3.7145, 13.8206, // w0-w3: initial stability per grade
    5.1618, 1.2298, 0.8975, 0.031, 1.6474, // w4-w8
    0.1367, 1.0461, 2.1072, 0.0793, 0.3246, // w9-w13
    1.587, 0.2272, 2.8755, // w14-w16
];

/// Defensive lower bound for stability. Malformed historical data must not
/// feed a non-positive stability into the power terms below.
pub const STABILITY_FLOOR: f64 = 0.1;

/// FSRS parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsrsParams {
    pub w: [f64; 17],
}

impl Default for FsrsParams {
    fn default() -> Self {
        Self { w: FSRS45_WEIGHTS }
    }
}

/// Recall quality reported for one review attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Grade {
    /// Parses a raw numeric grade. Anything outside 1..=4 is rejected at the
    /// engine boundary before it can reach the model.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn value(self) -> i64 {
        self as i64
    }

    /// A recall judged unsuccessful (Again or Hard).
    pub fn is_failure(self) -> bool {
        (self as i64) < 3
    }
}

/// Probability of successful recall after `elapsed_days` at the given
/// stability. Equals 1.0 at zero elapsed days and decays toward 0.
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    let s = stability.max(STABILITY_FLOOR);
    let t = elapsed_days.max(0.0);
    (1.0 + t / (9.0 * s)).recip()
}

impl FsrsParams {
    /// Stability assigned on the first graded recall: `w[g-1]`.
    pub fn initial_stability(&self, grade: Grade) -> f64 {
        self.w[grade as usize - 1].max(STABILITY_FLOOR)
    }

    /// Difficulty assigned on the first graded recall.
    pub fn initial_difficulty(&self, grade: Grade) -> f64 {
        self.w[4] - (grade.value() - 3) as f64 * self.w[5]
    }

    /// Blends the good-grade baseline difficulty with the previous estimate,
    /// damped by `w[6]` and mixed by `w[7]`.
    pub fn next_difficulty(&self, difficulty: f64, grade: Grade) -> f64 {
        let baseline = self.initial_difficulty(Grade::Good);
        self.w[7] * baseline
            + (1.0 - self.w[7]) * (difficulty - self.w[6] * (grade.value() - 3) as f64)
    }

    /// Post-review stability.
    ///
    /// A lapse (Again) resets stability to a much smaller value; any other
    /// grade grows it, scaled by the hard penalty `w[15]` or easy bonus
    /// `w[16]`. The growth branch never returns less than the input
    /// stability for this parameter set.
    pub fn next_stability(
        &self,
        difficulty: f64,
        stability: f64,
        retrievability: f64,
        grade: Grade,
    ) -> f64 {
        let s = stability.max(STABILITY_FLOOR);

        if grade == Grade::Again {
            let reset = self.w[11]
                * difficulty.powf(-self.w[12])
                * ((s + 1.0).powf(self.w[13]) - 1.0)
                * (self.w[14] * (1.0 - retrievability)).exp();
            return reset.clamp(STABILITY_FLOOR, s);
        }

        let hard_penalty = if grade == Grade::Hard { self.w[15] } else { 1.0 };
        let easy_bonus = if grade == Grade::Easy { self.w[16] } else { 1.0 };

        let grown = s
            * (1.0
                + self.w[8].exp()
                    * (11.0 - difficulty)
                    * s.powf(-self.w[9])
                    * ((1.0 - retrievability) * self.w[10]).exp_m1()
                    * hard_penalty
                    * easy_bonus);
        grown.max(STABILITY_FLOOR)
    }
}
