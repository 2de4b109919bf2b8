//! The horse roster.
//!
//! Display metadata for the horses bettors pick from. Operators maintain
//! it; anyone may list it. Purely informational: ledger and results
//! operations do not check picks against the roster.

use serde::{Deserialize, Serialize};

use crate::types::HorseId;

/// Maximum accepted length for a horse name.
pub const MAX_NAME_LEN: usize = 128;

/// Maximum accepted length for the free-text info field.
pub const MAX_INFO_LEN: usize = 1024;

/// One horse on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horse {
    /// Stable identifier bettors reference in picks.
    pub horse_id: HorseId,
    /// Display name.
    pub name: String,
    /// Free-text description shown to bettors.
    pub info: String,
}

/// Errors surfaced by a roster store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RosterError {
    /// The backing store is missing or unreachable.
    #[error("roster store unavailable: {0}")]
    Storage(String),
}

/// Store of roster entries.
pub trait RosterStore: Send + Sync {
    /// Inserts or replaces one roster entry.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Storage`] on storage faults.
    fn put(&self, horse: &Horse) -> Result<(), RosterError>;

    /// Lists the roster ordered by horse id.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Storage`] on storage faults.
    fn list(&self) -> Result<Vec<Horse>, RosterError>;
}
