//! SQLite adapter for the results store.
//!
//! Ingestion runs inside one rusqlite transaction: the existence check,
//! the forced delete, and the batch insert either all land or none do.

use paddock_core::results::{IngestOutcome, RaceResult, ResultsError, ResultsStore};
use paddock_core::types::{HorseId, RaceId, Rank};
use rusqlite::params;

use super::{SharedConnection, lock};

/// [`ResultsStore`] over the shared SQLite connection.
pub struct SqliteResultsStore {
    conn: SharedConnection,
}

impl SqliteResultsStore {
    /// Creates the adapter over an opened connection.
    #[must_use]
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

fn storage_err(e: impl std::fmt::Display) -> ResultsError {
    ResultsError::Storage(e.to_string())
}

impl ResultsStore for SqliteResultsStore {
    fn ingest(
        &self,
        race: RaceId,
        rows: &[RaceResult],
        force: bool,
    ) -> Result<IngestOutcome, ResultsError> {
        let mut conn = lock(&self.conn).map_err(ResultsError::Storage)?;
        let tx = conn.transaction().map_err(storage_err)?;

        let existing: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM results WHERE race_id = ?1",
                params![race.get()],
                |row| row.get(0),
            )
            .map_err(storage_err)?;

        let outcome = if existing > 0 {
            if !force {
                return Err(ResultsError::AlreadyRecorded { race });
            }
            tx.execute("DELETE FROM results WHERE race_id = ?1", params![race.get()])
                .map_err(storage_err)?;
            IngestOutcome::Replaced
        } else {
            IngestOutcome::Inserted
        };

        {
            let mut insert = tx
                .prepare("INSERT INTO results (race_id, horse_id, rank) VALUES (?1, ?2, ?3)")
                .map_err(storage_err)?;
            for row in rows {
                insert
                    .execute(params![race.get(), row.horse.get(), row.rank.get()])
                    .map_err(storage_err)?;
            }
        }

        tx.commit().map_err(storage_err)?;
        Ok(outcome)
    }

    fn results(&self, race: RaceId) -> Result<Vec<RaceResult>, ResultsError> {
        let conn = lock(&self.conn).map_err(ResultsError::Storage)?;
        let mut stmt = conn
            .prepare(
                "SELECT horse_id, rank FROM results WHERE race_id = ?1 ORDER BY rank ASC",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map(params![race.get()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(storage_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (horse, rank) = row.map_err(storage_err)?;
            out.push(RaceResult {
                horse: HorseId::new(horse)
                    .map_err(|_| storage_err("corrupt results row: horse_id"))?,
                rank: Rank::new(rank).map_err(|_| storage_err("corrupt results row: rank"))?,
            });
        }
        Ok(out)
    }
}
