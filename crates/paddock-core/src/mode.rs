//! Global betting-mode flags.
//!
//! Two event-wide flags gate the whole service: the active race and whether
//! the betting window is open. There is exactly one value of each per
//! deployment, no history is kept, and any number of daemon processes may
//! read and write them concurrently, so the trait contract requires every
//! write to be durable before it returns and every read to observe either
//! the old or the new value, never a partial write. The SQLite adapter
//! satisfies this with single-statement upserts.
//!
//! Reads return `Option` rather than a default: "never configured" is a
//! distinct, observable state (`current_race.get` reports it as not-found).

use crate::types::RaceId;

/// Persisted key for the active race flag.
pub const KEY_CURRENT_RACE: &str = "current_race";

/// Persisted key for the betting-window flag.
pub const KEY_BETTING_ENABLED: &str = "betting_enabled";

/// Snapshot of both mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BettingMode {
    /// The active race, if one has been configured.
    pub current_race: Option<RaceId>,
    /// The betting window flag, if it has ever been set.
    pub betting_enabled: Option<bool>,
}

/// Errors surfaced by a mode store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ModeError {
    /// The backing store is missing or unreachable.
    #[error("mode store unavailable: {0}")]
    Storage(String),

    /// A persisted flag value could not be decoded.
    #[error("corrupt mode flag {key}: {reason}")]
    Corrupt {
        /// The flag key whose value failed to decode.
        key: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Durable store for the two global mode flags.
pub trait ModeStore: Send + Sync {
    /// Returns the active race, or `None` if never configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the persisted value
    /// is corrupt.
    fn current_race(&self) -> Result<Option<RaceId>, ModeError>;

    /// Sets the active race. Durable before return.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_current_race(&self, race: RaceId) -> Result<(), ModeError>;

    /// Returns the betting-window flag, or `None` if never set.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the persisted value
    /// is corrupt.
    fn betting_enabled(&self) -> Result<Option<bool>, ModeError>;

    /// Opens or closes the betting window. Durable before return.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_betting_enabled(&self, enabled: bool) -> Result<(), ModeError>;

    /// Reads both flags.
    ///
    /// # Errors
    ///
    /// Returns an error if either read fails.
    fn snapshot(&self) -> Result<BettingMode, ModeError> {
        Ok(BettingMode {
            current_race: self.current_race()?,
            betting_enabled: self.betting_enabled()?,
        })
    }
}
