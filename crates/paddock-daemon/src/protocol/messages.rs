//! Wire messages for the paddock protocol.
//!
//! Requests are one serde enum internally tagged by `op`; responses are an
//! `ok`/`err` envelope. Numeric identifiers cross the wire as plain
//! integers and are validated into the core newtypes at the orchestrator
//! boundary so validation failures can name the offending field.

use paddock_core::identity::CREDENTIAL_TTL;
use paddock_core::ledger::Prediction;
use paddock_core::results::IngestOutcome;
use paddock_core::roster::Horse;
use paddock_core::types::HorseId;
use serde::{Deserialize, Serialize};

/// One request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Read the active race.
    CurrentRaceGet,
    /// Set the active race (operator).
    CurrentRaceSet {
        /// Operator session token.
        #[serde(default)]
        session: Option<String>,
        /// The race to activate.
        race_id: i64,
    },
    /// Read the betting-window flag.
    BettingStatus,
    /// Open or close the betting window (operator).
    BettingSet {
        /// Operator session token.
        #[serde(default)]
        session: Option<String>,
        /// `true` opens the window.
        enabled: bool,
    },
    /// Place a new bet.
    BetPlace {
        /// Replayed identity credential, if the client holds one.
        #[serde(default)]
        credential: Option<String>,
        /// Legacy caller-supplied bettor id; used only when no credential
        /// is attached.
        #[serde(default)]
        bettor_id: Option<String>,
        /// The race being bet on.
        race_id: i64,
        /// First choice to win.
        first_choice: i64,
        /// Optional second choice.
        #[serde(default)]
        second_choice: Option<i64>,
        /// Optional third choice.
        #[serde(default)]
        third_choice: Option<i64>,
    },
    /// Revise an existing bet (betting window must be open).
    BetUpdate {
        /// Replayed identity credential (required).
        #[serde(default)]
        credential: Option<String>,
        /// The race whose bet is being revised.
        race_id: i64,
        /// First choice to win.
        first_choice: i64,
        /// Optional second choice.
        #[serde(default)]
        second_choice: Option<i64>,
        /// Optional third choice.
        #[serde(default)]
        third_choice: Option<i64>,
    },
    /// Fetch the caller's bet for a race.
    BetGet {
        /// Replayed identity credential (required).
        #[serde(default)]
        credential: Option<String>,
        /// The race to look up.
        race_id: i64,
    },
    /// Record a race's results (operator).
    ResultsIngest {
        /// Operator session token.
        #[serde(default)]
        session: Option<String>,
        /// The race the results are for.
        race_id: i64,
        /// The full result set.
        results: Vec<ResultRowDto>,
        /// Replace an already-recorded set instead of conflicting.
        #[serde(default)]
        force: bool,
    },
    /// Read a race's results.
    ResultsGet {
        /// The race to look up.
        race_id: i64,
    },
    /// List the horse roster.
    HorsesList,
    /// Insert or replace one roster entry (operator).
    HorsePut {
        /// Operator session token.
        #[serde(default)]
        session: Option<String>,
        /// Horse identifier.
        horse_id: i64,
        /// Display name.
        name: String,
        /// Free-text description.
        info: String,
    },
    /// Exchange the operator secret for a session token.
    OperatorLogin {
        /// The operator secret.
        password: String,
    },
    /// End an operator session (client discards the token).
    OperatorLogout {
        /// Operator session token.
        #[serde(default)]
        session: Option<String>,
    },
}

/// One `(horse, rank)` result row on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRowDto {
    /// The horse.
    pub horse_id: i64,
    /// Its finishing position.
    pub rank: i64,
}

/// A prediction as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionDto {
    /// The bettor holding the prediction.
    pub bettor_id: String,
    /// The race it is for.
    pub race_id: i64,
    /// First choice.
    pub first_choice: i64,
    /// Second choice, if given.
    pub second_choice: Option<i64>,
    /// Third choice, if given.
    pub third_choice: Option<i64>,
}

impl From<&Prediction> for PredictionDto {
    fn from(p: &Prediction) -> Self {
        Self {
            bettor_id: p.bettor.as_str().to_string(),
            race_id: p.race.get(),
            first_choice: p.first.get(),
            second_choice: p.second.map(HorseId::get),
            third_choice: p.third.map(HorseId::get),
        }
    }
}

/// A roster entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HorseDto {
    /// Horse identifier.
    pub horse_id: i64,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub info: String,
}

impl From<Horse> for HorseDto {
    fn from(h: Horse) -> Self {
        Self {
            horse_id: h.horse_id.get(),
            name: h.name,
            info: h.info,
        }
    }
}

/// A newly issued identity credential, for the client to store and replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuedCredential {
    /// The credential token.
    pub credential: String,
    /// How long the client should retain it, in seconds.
    pub ttl_secs: u64,
}

impl IssuedCredential {
    /// Wraps a fresh bettor id with the standard retention TTL.
    #[must_use]
    pub fn new(credential: String) -> Self {
        Self {
            credential,
            ttl_secs: CREDENTIAL_TTL.as_secs(),
        }
    }
}

/// Successful reply payloads, tagged by operation family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    /// The active race.
    CurrentRace {
        /// Its identifier.
        race_id: i64,
    },
    /// The betting-window flag.
    BettingStatus {
        /// `true` when the window is open.
        enabled: bool,
    },
    /// Acknowledgement with no payload.
    Ack,
    /// A prediction, with a credential when one was just issued.
    Bet {
        /// The stored prediction.
        prediction: PredictionDto,
        /// Present only when an identity was synthesized for this request.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credential: Option<IssuedCredential>,
    },
    /// A race's recorded results.
    Results {
        /// The result rows, ordered by rank.
        results: Vec<ResultRowDto>,
    },
    /// How an ingestion landed.
    Ingested {
        /// `inserted` or `replaced`.
        outcome: IngestOutcome,
    },
    /// The horse roster.
    Horses {
        /// Entries ordered by horse id.
        horses: Vec<HorseDto>,
    },
    /// An operator session token.
    Session {
        /// The signed token to replay on operator requests.
        session: String,
        /// Expiry as unix seconds.
        expires_at: u64,
    },
}

/// Machine-checkable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input, rejected before touching storage.
    Validation,
    /// Missing/invalid operator session or bettor credential.
    Unauthorized,
    /// The betting window is closed.
    BettingClosed,
    /// Uniqueness or already-recorded-results violation.
    Conflict,
    /// A referenced row does not exist.
    NotFound,
    /// A backing store is missing or unreachable.
    DependencyUnavailable,
    /// Unexpected server fault.
    Internal,
}

/// A failure outcome: taxonomy kind, safe human-readable reason, and the
/// offending field for validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(deny_unknown_fields)]
#[error("{message}")]
pub struct ApiError {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable reason. Never raw storage-engine text.
    pub message: String,
    /// The request field at fault, for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    /// Builds a validation error naming the offending field.
    #[must_use]
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Builds an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unauthorized,
            message: message.into(),
            field: None,
        }
    }

    /// Builds the closed-betting-window rejection.
    #[must_use]
    pub fn betting_closed() -> Self {
        Self {
            kind: ErrorKind::BettingClosed,
            message: "betting is currently closed".to_string(),
            field: None,
        }
    }

    /// Builds a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Conflict,
            message: message.into(),
            field: None,
        }
    }

    /// Builds a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
            field: None,
        }
    }

    /// Builds a dependency-unavailable error with a safe message.
    #[must_use]
    pub fn dependency_unavailable() -> Self {
        Self {
            kind: ErrorKind::DependencyUnavailable,
            message: "a backing store is unavailable; try again later".to_string(),
            field: None,
        }
    }

    /// Builds an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            field: None,
        }
    }
}

/// One response frame: a successful reply or a taxonomy error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// The operation succeeded.
    Ok(Reply),
    /// The operation failed.
    Err(ApiError),
}

impl Response {
    /// Unwraps into a `Result` for callers that branch on outcome.
    ///
    /// # Errors
    ///
    /// Returns the carried [`ApiError`] for failure responses.
    pub fn into_result(self) -> Result<Reply, ApiError> {
        match self {
            Self::Ok(reply) => Ok(reply),
            Self::Err(err) => Err(err),
        }
    }
}

impl From<Result<Reply, ApiError>> for Response {
    fn from(result: Result<Reply, ApiError>) -> Self {
        match result {
            Ok(reply) => Self::Ok(reply),
            Err(err) => Self::Err(err),
        }
    }
}
