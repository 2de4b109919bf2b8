//! SQLite adapter for the mode store.
//!
//! Flags live in the flat `mode_flags(key, value)` namespace with
//! string-encoded values. Writes are single-statement upserts, so a
//! concurrent reader observes the old or the new value and nothing else.

use paddock_core::mode::{KEY_BETTING_ENABLED, KEY_CURRENT_RACE, ModeError, ModeStore};
use paddock_core::types::RaceId;
use rusqlite::{OptionalExtension, params};

use super::{SharedConnection, lock};

/// [`ModeStore`] over the shared SQLite connection.
pub struct SqliteModeStore {
    conn: SharedConnection,
}

impl SqliteModeStore {
    /// Creates the adapter over an opened connection.
    #[must_use]
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn read_flag(&self, key: &'static str) -> Result<Option<String>, ModeError> {
        let conn = lock(&self.conn).map_err(ModeError::Storage)?;
        conn.query_row(
            "SELECT value FROM mode_flags WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ModeError::Storage(e.to_string()))
    }

    fn write_flag(&self, key: &'static str, value: &str) -> Result<(), ModeError> {
        let conn = lock(&self.conn).map_err(ModeError::Storage)?;
        conn.execute(
            "INSERT INTO mode_flags (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| ModeError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl ModeStore for SqliteModeStore {
    fn current_race(&self) -> Result<Option<RaceId>, ModeError> {
        match self.read_flag(KEY_CURRENT_RACE)? {
            None => Ok(None),
            Some(raw) => {
                let value: i64 = raw.parse().map_err(|_| ModeError::Corrupt {
                    key: KEY_CURRENT_RACE,
                    reason: format!("not an integer: {raw:?}"),
                })?;
                let race = RaceId::new(value).map_err(|e| ModeError::Corrupt {
                    key: KEY_CURRENT_RACE,
                    reason: e.to_string(),
                })?;
                Ok(Some(race))
            },
        }
    }

    fn set_current_race(&self, race: RaceId) -> Result<(), ModeError> {
        self.write_flag(KEY_CURRENT_RACE, &race.get().to_string())
    }

    fn betting_enabled(&self) -> Result<Option<bool>, ModeError> {
        match self.read_flag(KEY_BETTING_ENABLED)? {
            None => Ok(None),
            Some(raw) => match raw.as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                other => Err(ModeError::Corrupt {
                    key: KEY_BETTING_ENABLED,
                    reason: format!("not a boolean: {other:?}"),
                }),
            },
        }
    }

    fn set_betting_enabled(&self, enabled: bool) -> Result<(), ModeError> {
        self.write_flag(KEY_BETTING_ENABLED, if enabled { "true" } else { "false" })
    }
}
