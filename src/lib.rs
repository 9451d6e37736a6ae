//! mnemo - spaced-repetition scheduling engine for personal knowledge retention.
//!
//! Users store atomic concepts under topics and periodically recall them. This
//! crate decides which concept to present next and how to update its
//! memory-strength estimate after each graded recall attempt:
//!
//! - [`fsrs`] - the FSRS-4.5 memory model (stability, difficulty,
//!   retrievability) as pure functions over a fixed parameter vector
//! - [`scheduler`] - the next-concept selection policy
//! - [`technique`] - the review-technique allocation heuristic
//! - [`engine`] - the update protocol tying the pieces together
//! - [`storage`] - the SQLite-backed learning record store
//! - [`grading`] - keyword-overlap grading of free-text responses

pub mod engine;
pub mod fsrs;
pub mod grading;
pub mod scheduler;
pub mod storage;
pub mod technique;

pub use engine::{Engine, EngineError, EngineResult, ReviewOutcome, TopicMastery};
pub use fsrs::{FsrsParams, Grade};
pub use scheduler::{select_next, ReviewCandidate};
pub use storage::{Storage, StorageError, StorageResult};
pub use technique::Technique;
