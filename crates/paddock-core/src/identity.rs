//! Anonymous bettor identity.
//!
//! Bettors have no accounts. Each one is identified by an opaque token that
//! the client stores and replays on every request. Resolution is a pure
//! function over the request's inputs so the precedence rules test without
//! any transport harness:
//!
//! 1. a previously issued credential attached to the request;
//! 2. a caller-supplied id in the bet-placement payload (legacy clients);
//! 3. otherwise a fresh cryptographically random id is synthesized.
//!
//! A present credential always wins. Silently replacing one would fork the
//! bettor into two identities, orphaning the ledger rows under the old id.
//!
//! Synthesized ids use the canonical text form
//! `bettor:v1:<64-lowercase-hex>` (32 random bytes). Ids supplied by legacy
//! clients are accepted as arbitrary opaque tokens within bounds.

use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical text prefix for synthesized bettor ids.
pub const BETTOR_ID_PREFIX: &str = "bettor:v1:";

/// Number of random bytes in a synthesized id.
const BETTOR_ID_RANDOM_BYTES: usize = 32;

/// Maximum accepted length for any bettor id token.
///
/// Bounded inputs keep hostile payloads from ballooning ledger keys.
pub const MAX_BETTOR_ID_LEN: usize = 128;

/// How long clients are told to retain an issued credential.
pub const CREDENTIAL_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Errors from credential parsing and identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum IdentityError {
    /// The operation requires an identity credential and none was attached.
    #[error("no identity credential attached to the request")]
    MissingCredential,

    /// An attached credential or supplied id was malformed.
    #[error("invalid bettor identity: {reason}")]
    Invalid {
        /// What was wrong with the token.
        reason: String,
    },
}

/// Opaque token identifying one anonymous bettor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BettorId(String);

impl BettorId {
    /// Parses an opaque bettor token.
    ///
    /// Tokens must be non-empty, at most [`MAX_BETTOR_ID_LEN`] bytes, and
    /// printable ASCII without whitespace: enough to keep them usable as
    /// storage keys without constraining legacy clients to the canonical
    /// form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Invalid`] for out-of-bounds or
    /// non-printable tokens.
    pub fn parse(token: &str) -> Result<Self, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::Invalid {
                reason: "empty token".to_string(),
            });
        }
        if token.len() > MAX_BETTOR_ID_LEN {
            return Err(IdentityError::Invalid {
                reason: format!("token exceeds {MAX_BETTOR_ID_LEN} bytes"),
            });
        }
        if !token.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(IdentityError::Invalid {
                reason: "token contains whitespace or non-printable bytes".to_string(),
            });
        }
        Ok(Self(token.to_string()))
    }

    /// Synthesizes a fresh random id in canonical text form.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; BETTOR_ID_RANDOM_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(format!("{BETTOR_ID_PREFIX}{}", hex::encode(bytes)))
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BettorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of identity resolution for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// The bettor to use for ledger operations.
    pub bettor: BettorId,
    /// Whether the id was synthesized for this request. When `true` the
    /// caller must hand the id back to the client as a credential to store
    /// for [`CREDENTIAL_TTL`] and replay on future requests.
    pub issued: bool,
}

/// Resolves the bettor identity for a bet-placement request.
///
/// `credential` is the replayed client-held credential, if any;
/// `placement_id` is the legacy id field of the placement payload. The
/// credential takes precedence whenever present.
///
/// # Errors
///
/// Returns [`IdentityError::Invalid`] if whichever token was selected is
/// malformed. A malformed credential is never silently replaced by the
/// payload id or a fresh one.
pub fn resolve(
    credential: Option<&str>,
    placement_id: Option<&str>,
) -> Result<ResolvedIdentity, IdentityError> {
    if let Some(token) = credential {
        return Ok(ResolvedIdentity {
            bettor: BettorId::parse(token)?,
            issued: false,
        });
    }
    if let Some(token) = placement_id {
        return Ok(ResolvedIdentity {
            bettor: BettorId::parse(token)?,
            issued: false,
        });
    }
    Ok(ResolvedIdentity {
        bettor: BettorId::generate(),
        issued: true,
    })
}

/// Resolves the bettor identity for operations that require an existing
/// credential (`bet.update`, `bet.get`).
///
/// # Errors
///
/// Returns [`IdentityError::MissingCredential`] when no credential is
/// attached, or [`IdentityError::Invalid`] when it is malformed.
pub fn require(credential: Option<&str>) -> Result<BettorId, IdentityError> {
    match credential {
        Some(token) => BettorId::parse(token),
        None => Err(IdentityError::MissingCredential),
    }
}
