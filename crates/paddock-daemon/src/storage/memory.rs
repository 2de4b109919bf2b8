//! In-memory store implementations for unit tests.
//!
//! Same trait contracts as the SQLite adapters, backed by locked maps.
//! Used by the orchestrator's unit tests so dispatch behavior tests
//! without a database file.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use paddock_core::identity::BettorId;
use paddock_core::ledger::{LedgerError, LedgerStore, Prediction};
use paddock_core::mode::{ModeError, ModeStore};
use paddock_core::results::{IngestOutcome, RaceResult, ResultsError, ResultsStore};
use paddock_core::roster::{Horse, RosterError, RosterStore};
use paddock_core::types::RaceId;

/// In-memory [`ModeStore`].
#[derive(Debug, Default)]
pub struct MemoryModeStore {
    current_race: RwLock<Option<RaceId>>,
    betting_enabled: RwLock<Option<bool>>,
}

impl MemoryModeStore {
    /// Creates an empty store (both flags unset).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModeStore for MemoryModeStore {
    fn current_race(&self) -> Result<Option<RaceId>, ModeError> {
        Ok(*self.current_race.read().expect("lock poisoned"))
    }

    fn set_current_race(&self, race: RaceId) -> Result<(), ModeError> {
        *self.current_race.write().expect("lock poisoned") = Some(race);
        Ok(())
    }

    fn betting_enabled(&self) -> Result<Option<bool>, ModeError> {
        Ok(*self.betting_enabled.read().expect("lock poisoned"))
    }

    fn set_betting_enabled(&self, enabled: bool) -> Result<(), ModeError> {
        *self.betting_enabled.write().expect("lock poisoned") = Some(enabled);
        Ok(())
    }
}

/// In-memory [`LedgerStore`] keyed by `(bettor, race)`.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    rows: RwLock<HashMap<(BettorId, RaceId), Prediction>>,
}

impl MemoryLedgerStore {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn place(&self, prediction: &Prediction) -> Result<(), LedgerError> {
        let key = (prediction.bettor.clone(), prediction.race);
        let mut rows = self.rows.write().expect("lock poisoned");
        if rows.contains_key(&key) {
            return Err(LedgerError::Duplicate);
        }
        rows.insert(key, prediction.clone());
        Ok(())
    }

    fn update(&self, prediction: &Prediction) -> Result<(), LedgerError> {
        let key = (prediction.bettor.clone(), prediction.race);
        let mut rows = self.rows.write().expect("lock poisoned");
        match rows.get_mut(&key) {
            Some(row) => {
                *row = prediction.clone();
                Ok(())
            },
            None => Err(LedgerError::NotFound),
        }
    }

    fn get(&self, bettor: &BettorId, race: RaceId) -> Result<Option<Prediction>, LedgerError> {
        let rows = self.rows.read().expect("lock poisoned");
        Ok(rows.get(&(bettor.clone(), race)).cloned())
    }
}

/// In-memory [`ResultsStore`] keyed by race.
#[derive(Debug, Default)]
pub struct MemoryResultsStore {
    rows: RwLock<HashMap<RaceId, Vec<RaceResult>>>,
}

impl MemoryResultsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultsStore for MemoryResultsStore {
    fn ingest(
        &self,
        race: RaceId,
        rows: &[RaceResult],
        force: bool,
    ) -> Result<IngestOutcome, ResultsError> {
        let mut stored = self.rows.write().expect("lock poisoned");
        let outcome = match stored.get(&race) {
            Some(existing) if !existing.is_empty() => {
                if !force {
                    return Err(ResultsError::AlreadyRecorded { race });
                }
                IngestOutcome::Replaced
            },
            _ => IngestOutcome::Inserted,
        };
        stored.insert(race, rows.to_vec());
        Ok(outcome)
    }

    fn results(&self, race: RaceId) -> Result<Vec<RaceResult>, ResultsError> {
        let stored = self.rows.read().expect("lock poisoned");
        Ok(stored.get(&race).cloned().unwrap_or_default())
    }
}

/// In-memory [`RosterStore`] ordered by horse id.
#[derive(Debug, Default)]
pub struct MemoryRosterStore {
    rows: RwLock<BTreeMap<i64, Horse>>,
}

impl MemoryRosterStore {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RosterStore for MemoryRosterStore {
    fn put(&self, horse: &Horse) -> Result<(), RosterError> {
        let mut rows = self.rows.write().expect("lock poisoned");
        rows.insert(horse.horse_id.get(), horse.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Horse>, RosterError> {
        let rows = self.rows.read().expect("lock poisoned");
        Ok(rows.values().cloned().collect())
    }
}
