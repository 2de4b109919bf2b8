//! Request orchestrator.
//!
//! The façade composing the guard, the identity resolver, and the stores
//! into the externally visible operations. Ordering is fixed: operator
//! requests pass the access guard before anything else, user requests
//! resolve their identity next, and only then are stores touched. Every
//! storage fault is mapped to the wire taxonomy here; raw engine text
//! stops at this boundary and goes to the log instead.
//!
//! Requests are independent stateless units of work; all cross-request
//! state lives behind the store traits. Store-touching dispatch hops
//! through `spawn_blocking` so rusqlite calls never stall the executor.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use paddock_core::guard::{AccessGuard, GuardError};
use paddock_core::identity::{self, IdentityError};
use paddock_core::ledger::{LedgerError, LedgerStore, Prediction};
use paddock_core::mode::{ModeError, ModeStore};
use paddock_core::results::{RaceResult, ResultsError, ResultsStore};
use paddock_core::roster::{Horse, MAX_INFO_LEN, MAX_NAME_LEN, RosterError, RosterStore};
use paddock_core::types::{HorseId, NonPositive, RaceId, Rank};
use tracing::{debug, info, warn};

use crate::protocol::messages::{
    ApiError, IssuedCredential, Reply, Request, Response, ResultRowDto,
};

/// Fixed floor on login response time, applied to success and failure
/// alike so the answer's timing carries no signal.
pub const MIN_LOGIN_DELAY: Duration = Duration::from_millis(250);

/// The request orchestrator.
///
/// Cheap to clone: the stores are shared handles and the guard holds only
/// the wrapped secret. Dispatch clones itself onto the blocking pool.
#[derive(Clone)]
pub struct Orchestrator {
    mode: Arc<dyn ModeStore>,
    ledger: Arc<dyn LedgerStore>,
    results: Arc<dyn ResultsStore>,
    roster: Arc<dyn RosterStore>,
    /// `None` when no operator secret is configured; login then fails
    /// closed and no operator session can ever validate.
    guard: Option<AccessGuard>,
}

impl Orchestrator {
    /// Builds the orchestrator over its collaborators.
    #[must_use]
    pub fn new(
        mode: Arc<dyn ModeStore>,
        ledger: Arc<dyn LedgerStore>,
        results: Arc<dyn ResultsStore>,
        roster: Arc<dyn RosterStore>,
        guard: Option<AccessGuard>,
    ) -> Self {
        Self {
            mode,
            ledger,
            results,
            roster,
            guard,
        }
    }

    /// Handles one request and produces its response.
    ///
    /// Login is handled inline (it sleeps to the fixed floor); everything
    /// else runs on the blocking pool because the stores are synchronous.
    pub async fn dispatch(&self, request: Request) -> Response {
        let request = match request {
            Request::OperatorLogin { password } => return self.login(&password).await,
            other => other,
        };

        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.dispatch_blocking(&request)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "dispatch worker task failed");
                Response::Err(ApiError::internal("request handling failed"))
            },
        }
    }

    /// Synchronous dispatch for every store-touching operation.
    pub fn dispatch_blocking(&self, request: &Request) -> Response {
        debug!(op = request_name(request), "dispatching request");
        let result = match request {
            Request::CurrentRaceGet => self.current_race_get(),
            Request::CurrentRaceSet { session, race_id } => {
                self.current_race_set(session.as_deref(), *race_id)
            },
            Request::BettingStatus => self.betting_status(),
            Request::BettingSet { session, enabled } => {
                self.betting_set(session.as_deref(), *enabled)
            },
            Request::BetPlace {
                credential,
                bettor_id,
                race_id,
                first_choice,
                second_choice,
                third_choice,
            } => self.bet_place(
                credential.as_deref(),
                bettor_id.as_deref(),
                *race_id,
                *first_choice,
                *second_choice,
                *third_choice,
            ),
            Request::BetUpdate {
                credential,
                race_id,
                first_choice,
                second_choice,
                third_choice,
            } => self.bet_update(
                credential.as_deref(),
                *race_id,
                *first_choice,
                *second_choice,
                *third_choice,
            ),
            Request::BetGet {
                credential,
                race_id,
            } => self.bet_get(credential.as_deref(), *race_id),
            Request::ResultsIngest {
                session,
                race_id,
                results,
                force,
            } => self.results_ingest(session.as_deref(), *race_id, results, *force),
            Request::ResultsGet { race_id } => self.results_get(*race_id),
            Request::HorsesList => self.horses_list(),
            Request::HorsePut {
                session,
                horse_id,
                name,
                info,
            } => self.horse_put(session.as_deref(), *horse_id, name, info),
            Request::OperatorLogin { .. } => {
                // Routed to the async path by `dispatch`.
                Err(ApiError::internal("login must not reach blocking dispatch"))
            },
            Request::OperatorLogout { session } => self.operator_logout(session.as_deref()),
        };
        result.into()
    }

    // ------------------------------------------------------------------
    // Operator authentication
    // ------------------------------------------------------------------

    async fn login(&self, password: &str) -> Response {
        let result = match &self.guard {
            None => {
                warn!("operator login attempted but no operator secret is configured");
                Err(ApiError::internal("operator authentication is not configured"))
            },
            Some(guard) => match guard.login(password, now_secs()) {
                Ok(session) => {
                    info!(expires_at = session.expires_at, "operator session issued");
                    Ok(Reply::Session {
                        session: session.token,
                        expires_at: session.expires_at,
                    })
                },
                Err(GuardError::WrongSecret) => {
                    Err(ApiError::unauthorized("operator secret mismatch"))
                },
                Err(e) => {
                    warn!(error = %e, "operator login failed unexpectedly");
                    Err(ApiError::internal("operator login failed"))
                },
            },
        };
        // Answer no sooner than the floor, whatever the outcome.
        tokio::time::sleep(MIN_LOGIN_DELAY).await;
        result.into()
    }

    /// Guard precondition for every operator-only operation.
    fn require_operator(&self, session: Option<&str>) -> Result<(), ApiError> {
        let Some(guard) = &self.guard else {
            return Err(ApiError::unauthorized(
                "operator authentication is not configured",
            ));
        };
        let Some(token) = session else {
            return Err(ApiError::unauthorized("missing operator session"));
        };
        match guard.verify_session(token, now_secs()) {
            Ok(()) => Ok(()),
            Err(GuardError::Expired) => Err(ApiError::unauthorized("operator session expired")),
            Err(_) => Err(ApiError::unauthorized("invalid operator session")),
        }
    }

    fn operator_logout(&self, session: Option<&str>) -> Result<Reply, ApiError> {
        self.require_operator(session)?;
        // Tokens are self-contained; logout is the client discarding its
        // copy. Acknowledge so clients can treat it as a checkpoint.
        debug!("operator logout acknowledged");
        Ok(Reply::Ack)
    }

    // ------------------------------------------------------------------
    // Mode flags
    // ------------------------------------------------------------------

    fn current_race_get(&self) -> Result<Reply, ApiError> {
        match self.mode.current_race()? {
            Some(race) => Ok(Reply::CurrentRace {
                race_id: race.get(),
            }),
            None => Err(ApiError::not_found("no current race has been set")),
        }
    }

    fn current_race_set(&self, session: Option<&str>, race_id: i64) -> Result<Reply, ApiError> {
        self.require_operator(session)?;
        let race: RaceId = validated(race_id)?;
        self.mode.set_current_race(race)?;
        info!(race_id = race.get(), "current race set");
        Ok(Reply::Ack)
    }

    fn betting_status(&self) -> Result<Reply, ApiError> {
        // The public contract is a plain boolean; "never set" reads as
        // closed.
        let enabled = self.mode.betting_enabled()?.unwrap_or(false);
        Ok(Reply::BettingStatus { enabled })
    }

    fn betting_set(&self, session: Option<&str>, enabled: bool) -> Result<Reply, ApiError> {
        self.require_operator(session)?;
        self.mode.set_betting_enabled(enabled)?;
        info!(enabled, "betting window toggled");
        Ok(Reply::Ack)
    }

    // ------------------------------------------------------------------
    // Bets
    // ------------------------------------------------------------------

    fn bet_place(
        &self,
        credential: Option<&str>,
        bettor_id: Option<&str>,
        race_id: i64,
        first_choice: i64,
        second_choice: Option<i64>,
        third_choice: Option<i64>,
    ) -> Result<Reply, ApiError> {
        let resolved = identity::resolve(credential, bettor_id).map_err(|e| {
            // Resolution picked the credential when one was attached, so a
            // malformed token there is an auth failure; otherwise it was
            // the caller-supplied payload id.
            if credential.is_some() {
                ApiError::unauthorized(e.to_string())
            } else {
                ApiError::validation("bettor_id", e.to_string())
            }
        })?;

        let prediction = Prediction {
            bettor: resolved.bettor.clone(),
            race: validated(race_id)?,
            first: validated_field(first_choice, "first_choice")?,
            second: second_choice
                .map(|v| validated_field(v, "second_choice"))
                .transpose()?,
            third: third_choice
                .map(|v| validated_field(v, "third_choice"))
                .transpose()?,
        };

        self.ledger.place(&prediction).map_err(|e| match e {
            LedgerError::Duplicate => {
                ApiError::conflict("a bet has already been placed for this race")
            },
            other => other.into(),
        })?;
        info!(race_id = prediction.race.get(), issued = resolved.issued, "bet placed");

        let credential = resolved
            .issued
            .then(|| IssuedCredential::new(resolved.bettor.as_str().to_string()));
        Ok(Reply::Bet {
            prediction: (&prediction).into(),
            credential,
        })
    }

    fn bet_update(
        &self,
        credential: Option<&str>,
        race_id: i64,
        first_choice: i64,
        second_choice: Option<i64>,
        third_choice: Option<i64>,
    ) -> Result<Reply, ApiError> {
        let bettor = identity::require(credential).map_err(unauthorized_identity)?;

        if !self.mode.betting_enabled()?.unwrap_or(false) {
            return Err(ApiError::betting_closed());
        }

        let prediction = Prediction {
            bettor,
            race: validated(race_id)?,
            first: validated_field(first_choice, "first_choice")?,
            second: second_choice
                .map(|v| validated_field(v, "second_choice"))
                .transpose()?,
            third: third_choice
                .map(|v| validated_field(v, "third_choice"))
                .transpose()?,
        };

        self.ledger.update(&prediction).map_err(|e| match e {
            LedgerError::NotFound => {
                ApiError::not_found("no existing bet for this race to update")
            },
            other => other.into(),
        })?;
        info!(race_id = prediction.race.get(), "bet updated");

        Ok(Reply::Bet {
            prediction: (&prediction).into(),
            credential: None,
        })
    }

    fn bet_get(&self, credential: Option<&str>, race_id: i64) -> Result<Reply, ApiError> {
        let bettor = identity::require(credential).map_err(unauthorized_identity)?;
        let race: RaceId = validated(race_id)?;

        match self.ledger.get(&bettor, race)? {
            Some(prediction) => Ok(Reply::Bet {
                prediction: (&prediction).into(),
                credential: None,
            }),
            None => Err(ApiError::not_found("no bet recorded for this race")),
        }
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    fn results_ingest(
        &self,
        session: Option<&str>,
        race_id: i64,
        rows: &[ResultRowDto],
        force: bool,
    ) -> Result<Reply, ApiError> {
        self.require_operator(session)?;
        let race: RaceId = validated(race_id)?;

        if rows.is_empty() {
            return Err(ApiError::validation("results", "result set must not be empty"));
        }
        let mut seen = HashSet::new();
        let mut validated_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let horse: HorseId = validated(row.horse_id)?;
            let rank: Rank = validated(row.rank)?;
            if !seen.insert(horse) {
                return Err(ApiError::validation(
                    "results",
                    format!("duplicate horse_id {horse} in result set"),
                ));
            }
            validated_rows.push(RaceResult { horse, rank });
        }

        let outcome = self
            .results
            .ingest(race, &validated_rows, force)
            .map_err(|e| match e {
                ResultsError::AlreadyRecorded { race } => ApiError::conflict(format!(
                    "results already recorded for race {race}; pass force to replace"
                )),
                other => other.into(),
            })?;
        info!(race_id = race.get(), ?outcome, rows = validated_rows.len(), "results ingested");

        Ok(Reply::Ingested { outcome })
    }

    fn results_get(&self, race_id: i64) -> Result<Reply, ApiError> {
        let race: RaceId = validated(race_id)?;
        let rows = self.results.results(race)?;
        Ok(Reply::Results {
            results: rows
                .iter()
                .map(|r| ResultRowDto {
                    horse_id: r.horse.get(),
                    rank: r.rank.get(),
                })
                .collect(),
        })
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    fn horses_list(&self) -> Result<Reply, ApiError> {
        let horses = self.roster.list()?;
        Ok(Reply::Horses {
            horses: horses.into_iter().map(Into::into).collect(),
        })
    }

    fn horse_put(
        &self,
        session: Option<&str>,
        horse_id: i64,
        name: &str,
        info: &str,
    ) -> Result<Reply, ApiError> {
        self.require_operator(session)?;
        let horse_id: HorseId = validated(horse_id)?;
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(ApiError::validation(
                "name",
                format!("name must be 1..={MAX_NAME_LEN} bytes"),
            ));
        }
        if info.len() > MAX_INFO_LEN {
            return Err(ApiError::validation(
                "info",
                format!("info must be at most {MAX_INFO_LEN} bytes"),
            ));
        }

        self.roster.put(&Horse {
            horse_id,
            name: name.to_string(),
            info: info.to_string(),
        })?;
        info!(horse_id = horse_id.get(), "roster entry stored");
        Ok(Reply::Ack)
    }
}

// ----------------------------------------------------------------------
// Helpers and error mapping
// ----------------------------------------------------------------------

/// Current unix time in seconds.
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Validates a wire integer into a positive-id newtype, mapping the
/// failure to a field-tagged validation error.
fn validated<T: TryFrom<i64, Error = NonPositive>>(value: i64) -> Result<T, ApiError> {
    T::try_from(value).map_err(|e| ApiError::validation(e.field, e.to_string()))
}

/// Like [`validated`] but reported under the caller's field name, for
/// request fields whose wire name differs from the newtype's.
fn validated_field<T: TryFrom<i64, Error = NonPositive>>(
    value: i64,
    field: &str,
) -> Result<T, ApiError> {
    T::try_from(value)
        .map_err(|e| ApiError::validation(field, format!("{field} must be a positive integer (got {})", e.value)))
}

fn unauthorized_identity(e: IdentityError) -> ApiError {
    ApiError::unauthorized(e.to_string())
}

fn request_name(request: &Request) -> &'static str {
    match request {
        Request::CurrentRaceGet => "current_race_get",
        Request::CurrentRaceSet { .. } => "current_race_set",
        Request::BettingStatus => "betting_status",
        Request::BettingSet { .. } => "betting_set",
        Request::BetPlace { .. } => "bet_place",
        Request::BetUpdate { .. } => "bet_update",
        Request::BetGet { .. } => "bet_get",
        Request::ResultsIngest { .. } => "results_ingest",
        Request::ResultsGet { .. } => "results_get",
        Request::HorsesList => "horses_list",
        Request::HorsePut { .. } => "horse_put",
        Request::OperatorLogin { .. } => "operator_login",
        Request::OperatorLogout { .. } => "operator_logout",
    }
}

impl From<ModeError> for ApiError {
    fn from(e: ModeError) -> Self {
        match e {
            ModeError::Storage(detail) => {
                warn!(%detail, "mode store fault");
                Self::dependency_unavailable()
            },
            ModeError::Corrupt { key, reason } => {
                warn!(key, %reason, "corrupt mode flag");
                Self::internal("stored mode flag is corrupt")
            },
            _ => Self::internal("unexpected mode error"),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Duplicate => {
                Self::conflict("a bet has already been placed for this race")
            },
            LedgerError::NotFound => Self::not_found("no such bet"),
            LedgerError::Storage(detail) => {
                warn!(%detail, "ledger store fault");
                Self::dependency_unavailable()
            },
            _ => Self::internal("unexpected ledger error"),
        }
    }
}

impl From<ResultsError> for ApiError {
    fn from(e: ResultsError) -> Self {
        match e {
            ResultsError::AlreadyRecorded { race } => {
                Self::conflict(format!("results already recorded for race {race}"))
            },
            ResultsError::Storage(detail) => {
                warn!(%detail, "results store fault");
                Self::dependency_unavailable()
            },
            _ => Self::internal("unexpected results error"),
        }
    }
}

impl From<RosterError> for ApiError {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::Storage(detail) => {
                warn!(%detail, "roster store fault");
                Self::dependency_unavailable()
            },
            _ => Self::internal("unexpected roster error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use paddock_core::guard::SESSION_TTL_SECS;
    use secrecy::SecretString;

    use super::*;
    use crate::protocol::messages::ErrorKind;
    use crate::storage::memory::{
        MemoryLedgerStore, MemoryModeStore, MemoryResultsStore, MemoryRosterStore,
    };

    const SECRET: &str = "a-test-secret-of-adequate-length";

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(MemoryModeStore::new()),
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(MemoryResultsStore::new()),
            Arc::new(MemoryRosterStore::new()),
            Some(AccessGuard::new(SecretString::from(SECRET)).unwrap()),
        )
    }

    fn unconfigured_orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(MemoryModeStore::new()),
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(MemoryResultsStore::new()),
            Arc::new(MemoryRosterStore::new()),
            None,
        )
    }

    async fn login(orch: &Orchestrator) -> String {
        let response = orch
            .dispatch(Request::OperatorLogin {
                password: SECRET.to_string(),
            })
            .await;
        match response.into_result().unwrap() {
            Reply::Session { session, .. } => session,
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    fn err_kind(response: Response) -> ErrorKind {
        response.into_result().unwrap_err().kind
    }

    fn place_request(race_id: i64, first: i64) -> Request {
        Request::BetPlace {
            credential: None,
            bettor_id: None,
            race_id,
            first_choice: first,
            second_choice: None,
            third_choice: None,
        }
    }

    #[tokio::test]
    async fn login_issues_session_accepted_by_operator_ops() {
        let orch = orchestrator();
        let session = login(&orch).await;
        let response = orch
            .dispatch(Request::CurrentRaceSet {
                session: Some(session),
                race_id: 7,
            })
            .await;
        assert_eq!(response.into_result().unwrap(), Reply::Ack);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let orch = orchestrator();
        let response = orch
            .dispatch(Request::OperatorLogin {
                password: "not-the-secret-at-all".to_string(),
            })
            .await;
        assert_eq!(err_kind(response), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn login_without_configured_secret_fails_closed() {
        let orch = unconfigured_orchestrator();
        let response = orch
            .dispatch(Request::OperatorLogin {
                password: "anything".to_string(),
            })
            .await;
        assert_eq!(err_kind(response), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn operator_ops_reject_missing_or_garbage_sessions() {
        let orch = orchestrator();
        let missing = orch
            .dispatch(Request::BettingSet {
                session: None,
                enabled: true,
            })
            .await;
        assert_eq!(err_kind(missing), ErrorKind::Unauthorized);

        let garbage = orch
            .dispatch(Request::BettingSet {
                session: Some("operator:v1:1:aa.bbbb".to_string()),
                enabled: true,
            })
            .await;
        assert_eq!(err_kind(garbage), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn current_race_unset_is_not_found_then_set_round_trips() {
        let orch = orchestrator();
        let before = orch.dispatch(Request::CurrentRaceGet).await;
        assert_eq!(err_kind(before), ErrorKind::NotFound);

        let session = login(&orch).await;
        orch.dispatch(Request::CurrentRaceSet {
            session: Some(session),
            race_id: 7,
        })
        .await
        .into_result()
        .unwrap();

        let after = orch.dispatch(Request::CurrentRaceGet).await;
        assert_eq!(
            after.into_result().unwrap(),
            Reply::CurrentRace { race_id: 7 }
        );
    }

    #[tokio::test]
    async fn set_current_race_validates_input() {
        let orch = orchestrator();
        let session = login(&orch).await;
        let response = orch
            .dispatch(Request::CurrentRaceSet {
                session: Some(session),
                race_id: 0,
            })
            .await;
        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("race_id"));
    }

    #[tokio::test]
    async fn first_bet_issues_credential_that_reads_back_the_bet() {
        let orch = orchestrator();
        let response = orch.dispatch(place_request(7, 3)).await;
        let (prediction, credential) = match response.into_result().unwrap() {
            Reply::Bet {
                prediction,
                credential,
            } => (prediction, credential.expect("credential should be issued")),
            other => panic!("unexpected reply: {other:?}"),
        };
        assert_eq!(prediction.race_id, 7);
        assert_eq!(prediction.first_choice, 3);

        let fetched = orch
            .dispatch(Request::BetGet {
                credential: Some(credential.credential.clone()),
                race_id: 7,
            })
            .await;
        match fetched.into_result().unwrap() {
            Reply::Bet {
                prediction: fetched,
                credential: none,
            } => {
                assert_eq!(fetched, prediction);
                assert!(none.is_none());
            },
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_bet_is_conflict_and_first_row_survives() {
        let orch = orchestrator();
        let first = orch.dispatch(place_request(7, 3)).await;
        let credential = match first.into_result().unwrap() {
            Reply::Bet { credential, .. } => credential.unwrap().credential,
            other => panic!("unexpected reply: {other:?}"),
        };

        let second = orch
            .dispatch(Request::BetPlace {
                credential: Some(credential.clone()),
                bettor_id: None,
                race_id: 7,
                first_choice: 5,
                second_choice: None,
                third_choice: None,
            })
            .await;
        assert_eq!(err_kind(second), ErrorKind::Conflict);

        let stored = orch
            .dispatch(Request::BetGet {
                credential: Some(credential),
                race_id: 7,
            })
            .await;
        match stored.into_result().unwrap() {
            Reply::Bet { prediction, .. } => assert_eq!(prediction.first_choice, 3),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn legacy_bettor_id_is_honored_without_credential() {
        let orch = orchestrator();
        let response = orch
            .dispatch(Request::BetPlace {
                credential: None,
                bettor_id: Some("legacy-uuid-1234".to_string()),
                race_id: 7,
                first_choice: 3,
                second_choice: None,
                third_choice: None,
            })
            .await;
        match response.into_result().unwrap() {
            Reply::Bet {
                prediction,
                credential,
            } => {
                assert_eq!(prediction.bettor_id, "legacy-uuid-1234");
                assert!(credential.is_none(), "no credential issued for supplied ids");
            },
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bet_place_validates_choice_fields() {
        let orch = orchestrator();
        let response = orch
            .dispatch(Request::BetPlace {
                credential: None,
                bettor_id: None,
                race_id: 7,
                first_choice: 3,
                second_choice: Some(-1),
                third_choice: None,
            })
            .await;
        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("second_choice"));
    }

    #[tokio::test]
    async fn update_without_credential_is_unauthorized() {
        let orch = orchestrator();
        let response = orch
            .dispatch(Request::BetUpdate {
                credential: None,
                race_id: 7,
                first_choice: 5,
                second_choice: None,
                third_choice: None,
            })
            .await;
        assert_eq!(err_kind(response), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn update_while_betting_closed_is_rejected_and_mutates_nothing() {
        let orch = orchestrator();
        let credential = match orch.dispatch(place_request(7, 3)).await.into_result().unwrap() {
            Reply::Bet { credential, .. } => credential.unwrap().credential,
            other => panic!("unexpected reply: {other:?}"),
        };

        // Window never opened: closed by default.
        let response = orch
            .dispatch(Request::BetUpdate {
                credential: Some(credential.clone()),
                race_id: 7,
                first_choice: 5,
                second_choice: None,
                third_choice: None,
            })
            .await;
        assert_eq!(err_kind(response), ErrorKind::BettingClosed);

        let stored = orch
            .dispatch(Request::BetGet {
                credential: Some(credential),
                race_id: 7,
            })
            .await;
        match stored.into_result().unwrap() {
            Reply::Bet { prediction, .. } => assert_eq!(prediction.first_choice, 3),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_with_open_window_revises_the_bet() {
        let orch = orchestrator();
        let credential = match orch.dispatch(place_request(7, 3)).await.into_result().unwrap() {
            Reply::Bet { credential, .. } => credential.unwrap().credential,
            other => panic!("unexpected reply: {other:?}"),
        };

        let session = login(&orch).await;
        orch.dispatch(Request::BettingSet {
            session: Some(session),
            enabled: true,
        })
        .await
        .into_result()
        .unwrap();

        let response = orch
            .dispatch(Request::BetUpdate {
                credential: Some(credential),
                race_id: 7,
                first_choice: 5,
                second_choice: Some(2),
                third_choice: None,
            })
            .await;
        match response.into_result().unwrap() {
            Reply::Bet { prediction, .. } => {
                assert_eq!(prediction.first_choice, 5);
                assert_eq!(prediction.second_choice, Some(2));
            },
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_without_existing_bet_is_not_found() {
        let orch = orchestrator();
        let session = login(&orch).await;
        orch.dispatch(Request::BettingSet {
            session: Some(session),
            enabled: true,
        })
        .await
        .into_result()
        .unwrap();

        let response = orch
            .dispatch(Request::BetUpdate {
                credential: Some("bettor:v1:deadbeef".to_string()),
                race_id: 7,
                first_choice: 5,
                second_choice: None,
                third_choice: None,
            })
            .await;
        assert_eq!(err_kind(response), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn ingest_requires_operator_session() {
        let orch = orchestrator();
        let response = orch
            .dispatch(Request::ResultsIngest {
                session: None,
                race_id: 7,
                results: vec![ResultRowDto { horse_id: 3, rank: 1 }],
                force: false,
            })
            .await;
        assert_eq!(err_kind(response), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn ingest_validates_rows() {
        let orch = orchestrator();
        let session = login(&orch).await;

        let empty = orch
            .dispatch(Request::ResultsIngest {
                session: Some(session.clone()),
                race_id: 7,
                results: vec![],
                force: false,
            })
            .await;
        let err = empty.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("results"));

        let duplicate = orch
            .dispatch(Request::ResultsIngest {
                session: Some(session.clone()),
                race_id: 7,
                results: vec![
                    ResultRowDto { horse_id: 3, rank: 1 },
                    ResultRowDto { horse_id: 3, rank: 2 },
                ],
                force: false,
            })
            .await;
        assert_eq!(err_kind(duplicate), ErrorKind::Validation);

        let nonpositive = orch
            .dispatch(Request::ResultsIngest {
                session: Some(session),
                race_id: 7,
                results: vec![ResultRowDto { horse_id: 3, rank: 0 }],
                force: false,
            })
            .await;
        assert_eq!(err_kind(nonpositive), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn ingest_then_conflict_then_forced_replacement() {
        let orch = orchestrator();
        let session = login(&orch).await;
        let rows1 = vec![
            ResultRowDto { horse_id: 3, rank: 1 },
            ResultRowDto { horse_id: 5, rank: 2 },
        ];

        let first = orch
            .dispatch(Request::ResultsIngest {
                session: Some(session.clone()),
                race_id: 7,
                results: rows1.clone(),
                force: false,
            })
            .await;
        assert_eq!(
            first.into_result().unwrap(),
            Reply::Ingested {
                outcome: paddock_core::results::IngestOutcome::Inserted
            }
        );

        let repeat = orch
            .dispatch(Request::ResultsIngest {
                session: Some(session.clone()),
                race_id: 7,
                results: rows1.clone(),
                force: false,
            })
            .await;
        assert_eq!(err_kind(repeat), ErrorKind::Conflict);

        // The first set survives the rejected repeat.
        let stored = orch.dispatch(Request::ResultsGet { race_id: 7 }).await;
        assert_eq!(
            stored.into_result().unwrap(),
            Reply::Results { results: rows1 }
        );

        let rows2 = vec![ResultRowDto { horse_id: 9, rank: 1 }];
        let forced = orch
            .dispatch(Request::ResultsIngest {
                session: Some(session),
                race_id: 7,
                results: rows2.clone(),
                force: true,
            })
            .await;
        assert_eq!(
            forced.into_result().unwrap(),
            Reply::Ingested {
                outcome: paddock_core::results::IngestOutcome::Replaced
            }
        );

        let replaced = orch.dispatch(Request::ResultsGet { race_id: 7 }).await;
        assert_eq!(
            replaced.into_result().unwrap(),
            Reply::Results { results: rows2 }
        );
    }

    #[tokio::test]
    async fn results_for_unrecorded_race_are_an_empty_list() {
        let orch = orchestrator();
        let response = orch.dispatch(Request::ResultsGet { race_id: 42 }).await;
        assert_eq!(
            response.into_result().unwrap(),
            Reply::Results { results: vec![] }
        );
    }

    #[tokio::test]
    async fn roster_put_requires_operator_and_lists_back() {
        let orch = orchestrator();
        let denied = orch
            .dispatch(Request::HorsePut {
                session: None,
                horse_id: 1,
                name: "Copper Penny".to_string(),
                info: "steady front-runner".to_string(),
            })
            .await;
        assert_eq!(err_kind(denied), ErrorKind::Unauthorized);

        let session = login(&orch).await;
        orch.dispatch(Request::HorsePut {
            session: Some(session),
            horse_id: 1,
            name: "Copper Penny".to_string(),
            info: "steady front-runner".to_string(),
        })
        .await
        .into_result()
        .unwrap();

        let listed = orch.dispatch(Request::HorsesList).await;
        match listed.into_result().unwrap() {
            Reply::Horses { horses } => {
                assert_eq!(horses.len(), 1);
                assert_eq!(horses[0].name, "Copper Penny");
            },
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn logout_requires_a_valid_session() {
        let orch = orchestrator();
        let denied = orch.dispatch(Request::OperatorLogout { session: None }).await;
        assert_eq!(err_kind(denied), ErrorKind::Unauthorized);

        let session = login(&orch).await;
        let response = orch
            .dispatch(Request::OperatorLogout {
                session: Some(session),
            })
            .await;
        assert_eq!(response.into_result().unwrap(), Reply::Ack);
    }

    #[tokio::test]
    async fn session_expiry_is_enforced() {
        let orch = orchestrator();
        // Mint a token that is already at the end of its window by
        // issuing against a past clock.
        let guard = AccessGuard::new(SecretString::from(SECRET)).unwrap();
        let stale = guard.issue_session(now_secs() - SESSION_TTL_SECS - 1);
        let response = orch
            .dispatch(Request::BettingSet {
                session: Some(stale.token),
                enabled: true,
            })
            .await;
        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, "operator session expired");
    }
}
