//! Review technique allocation.
//!
//! A threshold classifier over a concept's full recall-grade history, not a
//! trained model: concepts that keep failing get the more involved
//! Elaboration treatment, everything else stays on plain Recall. Recomputed
//! on every call; the technique_progress counters exist only for reporting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A recall grade below this counts as a failed attempt (Again or Hard).
const FAILURE_GRADE_THRESHOLD: i64 = 3;

/// More than this many failures switches the concept to Elaboration.
const ELABORATION_FAILURE_THRESHOLD: usize = 2;

/// Named review technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Technique {
    Recall,
    Elaboration,
    Visualization,
}

impl Technique {
    /// Storage representation of the technique name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recall => "Recall",
            Self::Elaboration => "Elaboration",
            Self::Visualization => "Visualization",
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technique {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Recall" => Ok(Self::Recall),
            "Elaboration" => Ok(Self::Elaboration),
            "Visualization" => Ok(Self::Visualization),
            other => Err(format!("unknown technique: {}", other)),
        }
    }
}

/// Classifies a concept by its recorded grades (any order; only the count of
/// failures matters). More than two failed recalls over the entire history
/// selects Elaboration, otherwise Recall.
pub fn allocate(grades: &[i64]) -> Technique {
    let failure_count = grades
        .iter()
        .filter(|&&g| g < FAILURE_GRADE_THRESHOLD)
        .count();

    if failure_count > ELABORATION_FAILURE_THRESHOLD {
        Technique::Elaboration
    } else {
        Technique::Recall
    }
}
