//! Race results.
//!
//! A race's result set is stored as one row per horse but treated as a
//! single versioned object: it is created whole, re-ingestion without the
//! explicit override is a typed conflict, and a forced re-ingestion
//! replaces the whole set atomically (full replacement, never a merge).

use serde::{Deserialize, Serialize};

use crate::types::{HorseId, RaceId, Rank};

/// One horse's finishing rank in one race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    /// The horse.
    pub horse: HorseId,
    /// Its finishing position (1 = winner).
    pub rank: Rank,
}

/// How an ingestion landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The race had no recorded results; the set was inserted.
    Inserted,
    /// Existing results were deleted and the new set inserted (`force`).
    Replaced,
}

/// Errors surfaced by a results store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResultsError {
    /// Results already recorded for this race and `force` was not given.
    #[error("results already recorded for race {race}")]
    AlreadyRecorded {
        /// The race whose results already exist.
        race: RaceId,
    },

    /// The backing store is missing or unreachable.
    #[error("results store unavailable: {0}")]
    Storage(String),
}

/// Store of all race results.
pub trait ResultsStore: Send + Sync {
    /// Ingests the result set for a race.
    ///
    /// `rows` must be non-empty with distinct horses; the orchestrator
    /// validates both before calling. If the race has no recorded results
    /// the set is inserted and [`IngestOutcome::Inserted`] reported. If
    /// rows exist and `force` is `false`, nothing changes and the call
    /// fails with [`ResultsError::AlreadyRecorded`]. If rows exist and
    /// `force` is `true`, the old set is deleted and the new one inserted
    /// as one failure-atomic unit, reporting [`IngestOutcome::Replaced`].
    ///
    /// # Errors
    ///
    /// - [`ResultsError::AlreadyRecorded`] as above.
    /// - [`ResultsError::Storage`] on storage faults.
    fn ingest(
        &self,
        race: RaceId,
        rows: &[RaceResult],
        force: bool,
    ) -> Result<IngestOutcome, ResultsError>;

    /// Returns the recorded result set for a race.
    ///
    /// A race with nothing recorded yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::Storage`] on storage faults.
    fn results(&self, race: RaceId) -> Result<Vec<RaceResult>, ResultsError>;
}
