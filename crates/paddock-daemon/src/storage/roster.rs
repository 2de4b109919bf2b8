//! SQLite adapter for the horse roster.

use paddock_core::roster::{Horse, RosterError, RosterStore};
use paddock_core::types::HorseId;
use rusqlite::params;

use super::{SharedConnection, lock};

/// [`RosterStore`] over the shared SQLite connection.
pub struct SqliteRosterStore {
    conn: SharedConnection,
}

impl SqliteRosterStore {
    /// Creates the adapter over an opened connection.
    #[must_use]
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl RosterStore for SqliteRosterStore {
    fn put(&self, horse: &Horse) -> Result<(), RosterError> {
        let conn = lock(&self.conn).map_err(RosterError::Storage)?;
        conn.execute(
            "INSERT OR REPLACE INTO horses (horse_id, name, info) VALUES (?1, ?2, ?3)",
            params![horse.horse_id.get(), horse.name, horse.info],
        )
        .map_err(|e| RosterError::Storage(e.to_string()))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<Horse>, RosterError> {
        let conn = lock(&self.conn).map_err(RosterError::Storage)?;
        let mut stmt = conn
            .prepare("SELECT horse_id, name, info FROM horses ORDER BY horse_id ASC")
            .map_err(|e| RosterError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| RosterError::Storage(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, info) = row.map_err(|e| RosterError::Storage(e.to_string()))?;
            out.push(Horse {
                horse_id: HorseId::new(id)
                    .map_err(|_| RosterError::Storage("corrupt roster row: horse_id".into()))?,
                name,
                info,
            });
        }
        Ok(out)
    }
}
