//! The prediction ledger.
//!
//! One ledger row per `(bettor, race)` pair; that pair is the natural key
//! and the storage layer enforces its uniqueness. Creation and mutation are
//! deliberately separate operations: a second `place` for the same pair is
//! a typed conflict (never an overwrite), and an `update` for an absent
//! pair is a typed not-found (never an implicit create).

use serde::{Deserialize, Serialize};

use crate::identity::BettorId;
use crate::types::{HorseId, RaceId};

/// One bettor's ranked horse picks for one race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// The bettor holding this prediction.
    pub bettor: BettorId,
    /// The race the prediction is for.
    pub race: RaceId,
    /// First choice to win.
    pub first: HorseId,
    /// Optional second choice.
    pub second: Option<HorseId>,
    /// Optional third choice.
    pub third: Option<HorseId>,
}

/// Errors surfaced by a ledger store.
///
/// `Duplicate` comes from the insert itself: implementations must surface
/// the storage engine's typed uniqueness violation rather than pre-checking
/// existence (which would race against a concurrent insert) or parsing
/// engine error text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// A prediction already exists for this `(bettor, race)` pair.
    #[error("a prediction already exists for this bettor and race")]
    Duplicate,

    /// No prediction exists for this `(bettor, race)` pair.
    #[error("no prediction exists for this bettor and race")]
    NotFound,

    /// The backing store is missing or unreachable.
    #[error("ledger store unavailable: {0}")]
    Storage(String),
}

/// Store of all predictions.
pub trait LedgerStore: Send + Sync {
    /// Creates a new prediction.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Duplicate`] if a row for `(bettor, race)` exists;
    ///   the existing row is left unchanged.
    /// - [`LedgerError::Storage`] on storage faults.
    fn place(&self, prediction: &Prediction) -> Result<(), LedgerError>;

    /// Updates the existing prediction for `(bettor, race)` in place.
    ///
    /// Callers gate this on the betting window being open and on the
    /// request carrying an already-established identity; the store only
    /// enforces row existence.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if no row exists for the pair.
    /// - [`LedgerError::Storage`] on storage faults.
    fn update(&self, prediction: &Prediction) -> Result<(), LedgerError>;

    /// Fetches the prediction for `(bettor, race)`, if any.
    ///
    /// An absent row is a normal `None`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on storage faults.
    fn get(&self, bettor: &BettorId, race: RaceId) -> Result<Option<Prediction>, LedgerError>;
}
