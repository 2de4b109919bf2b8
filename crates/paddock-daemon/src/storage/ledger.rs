//! SQLite adapter for the prediction ledger.
//!
//! Uniqueness of `(bettor_id, race_id)` is the table's primary key. A
//! duplicate `place` is detected from the driver's typed constraint-
//! violation code on the insert itself: no pre-flight existence check
//! (which would race against a concurrent insert) and no matching on
//! engine error text.

use paddock_core::identity::BettorId;
use paddock_core::ledger::{LedgerError, LedgerStore, Prediction};
use paddock_core::types::{HorseId, RaceId};
use rusqlite::{ErrorCode, OptionalExtension, params};

use super::{SharedConnection, lock};

/// [`LedgerStore`] over the shared SQLite connection.
pub struct SqliteLedgerStore {
    conn: SharedConnection,
}

impl SqliteLedgerStore {
    /// Creates the adapter over an opened connection.
    #[must_use]
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

/// Returns `true` when the error is the engine's typed uniqueness
/// violation for the insert target.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation))
}

/// Rebuilds a [`Prediction`] from its stored columns.
///
/// Stored rows were validated on write, so a failure here means the
/// database was modified out-of-band; that surfaces as a storage fault.
fn prediction_from_columns(
    bettor: String,
    race: i64,
    first: i64,
    second: Option<i64>,
    third: Option<i64>,
) -> Result<Prediction, LedgerError> {
    let corrupt = |what: &str| LedgerError::Storage(format!("corrupt ledger row: {what}"));
    Ok(Prediction {
        bettor: BettorId::parse(&bettor).map_err(|_| corrupt("bettor_id"))?,
        race: RaceId::new(race).map_err(|_| corrupt("race_id"))?,
        first: HorseId::new(first).map_err(|_| corrupt("first_choice"))?,
        second: second
            .map(|v| HorseId::new(v).map_err(|_| corrupt("second_choice")))
            .transpose()?,
        third: third
            .map(|v| HorseId::new(v).map_err(|_| corrupt("third_choice")))
            .transpose()?,
    })
}

impl LedgerStore for SqliteLedgerStore {
    fn place(&self, prediction: &Prediction) -> Result<(), LedgerError> {
        let conn = lock(&self.conn).map_err(LedgerError::Storage)?;
        conn.execute(
            "INSERT INTO predictions
                 (bettor_id, race_id, first_choice, second_choice, third_choice)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                prediction.bettor.as_str(),
                prediction.race.get(),
                prediction.first.get(),
                prediction.second.map(HorseId::get),
                prediction.third.map(HorseId::get),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                LedgerError::Duplicate
            } else {
                LedgerError::Storage(e.to_string())
            }
        })?;
        Ok(())
    }

    fn update(&self, prediction: &Prediction) -> Result<(), LedgerError> {
        let conn = lock(&self.conn).map_err(LedgerError::Storage)?;
        let changed = conn
            .execute(
                "UPDATE predictions
                 SET first_choice = ?3, second_choice = ?4, third_choice = ?5
                 WHERE bettor_id = ?1 AND race_id = ?2",
                params![
                    prediction.bettor.as_str(),
                    prediction.race.get(),
                    prediction.first.get(),
                    prediction.second.map(HorseId::get),
                    prediction.third.map(HorseId::get),
                ],
            )
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        if changed == 0 {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    fn get(&self, bettor: &BettorId, race: RaceId) -> Result<Option<Prediction>, LedgerError> {
        let conn = lock(&self.conn).map_err(LedgerError::Storage)?;
        let columns = conn
            .query_row(
                "SELECT bettor_id, race_id, first_choice, second_choice, third_choice
                 FROM predictions
                 WHERE bettor_id = ?1 AND race_id = ?2",
                params![bettor.as_str(), race.get()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        columns
            .map(|(b, r, f, s, t)| prediction_from_columns(b, r, f, s, t))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;

    fn store() -> SqliteLedgerStore {
        SqliteLedgerStore::new(storage::open(":memory:").unwrap())
    }

    fn prediction(bettor: &str, race: i64, first: i64) -> Prediction {
        Prediction {
            bettor: BettorId::parse(bettor).unwrap(),
            race: RaceId::new(race).unwrap(),
            first: HorseId::new(first).unwrap(),
            second: None,
            third: None,
        }
    }

    #[test]
    fn place_then_get_round_trips() {
        let store = store();
        let p = Prediction {
            second: Some(HorseId::new(5).unwrap()),
            third: Some(HorseId::new(9).unwrap()),
            ..prediction("u1", 7, 3)
        };
        store.place(&p).unwrap();
        let fetched = store
            .get(&p.bettor, p.race)
            .unwrap()
            .expect("row should exist");
        assert_eq!(fetched, p);
    }

    #[test]
    fn second_place_for_same_pair_is_duplicate_and_leaves_row_unchanged() {
        let store = store();
        let first = prediction("u1", 7, 3);
        store.place(&first).unwrap();

        let second = prediction("u1", 7, 5);
        assert!(matches!(store.place(&second), Err(LedgerError::Duplicate)));

        let stored = store.get(&first.bettor, first.race).unwrap().unwrap();
        assert_eq!(stored.first.get(), 3);
    }

    #[test]
    fn same_bettor_may_bet_on_different_races() {
        let store = store();
        store.place(&prediction("u1", 1, 3)).unwrap();
        store.place(&prediction("u1", 2, 4)).unwrap();
    }

    #[test]
    fn update_missing_row_is_not_found_and_creates_nothing() {
        let store = store();
        let p = prediction("u1", 7, 3);
        assert!(matches!(store.update(&p), Err(LedgerError::NotFound)));
        assert_eq!(store.get(&p.bettor, p.race).unwrap(), None);
    }

    #[test]
    fn update_replaces_choices_in_place() {
        let store = store();
        store.place(&prediction("u1", 7, 3)).unwrap();

        let revised = Prediction {
            second: Some(HorseId::new(2).unwrap()),
            ..prediction("u1", 7, 8)
        };
        store.update(&revised).unwrap();

        let stored = store.get(&revised.bettor, revised.race).unwrap().unwrap();
        assert_eq!(stored, revised);
    }

    #[test]
    fn get_absent_row_is_none() {
        let store = store();
        let p = prediction("nobody", 1, 1);
        assert_eq!(store.get(&p.bettor, p.race).unwrap(), None);
    }
}
