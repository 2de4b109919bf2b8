//! Operator access guard.
//!
//! Operators authenticate with a shared secret and receive a signed,
//! time-limited session token asserting the operator role. The guard is a
//! two-state machine (anonymous or authenticated) with no server-side
//! session table: tokens are self-contained and simply expire, and logout
//! only discards the client's copy.
//!
//! # Security Properties
//!
//! - Secret comparison is digest-to-digest in constant time, so neither
//!   content nor length of the candidate leaks through timing.
//! - Tokens are HMAC-SHA256 over a versioned payload; verification
//!   recomputes the MAC and compares constant-time before looking at the
//!   expiry.
//! - The signing key is derived from the operator secret under a domain
//!   separator, so the secret itself is never used as a raw MAC key.
//! - The secret is wrapped in `SecretString` to prevent accidental logging.
//!
//! Time is passed in by the caller (unix seconds) so every transition is a
//! pure function of its inputs.
//!
//! Token text form:
//!
//! ```text
//! operator:v1:<expires_at_unix>:<32-hex-nonce>.<64-hex-mac>
//! ```

use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Validity window for an issued session token.
pub const SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Minimum accepted length for the configured operator secret.
pub const MIN_SECRET_LEN: usize = 16;

/// Canonical text prefix for session token payloads.
pub const TOKEN_PREFIX: &str = "operator:v1:";

/// Number of random bytes in a token nonce.
const NONCE_BYTES: usize = 16;

/// Domain separator for deriving the token-signing key from the operator
/// secret.
const KEY_DOMAIN_SEPARATION: &[u8] = b"paddock:session-token:v1\0";

/// Errors from guard configuration and checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GuardError {
    /// The configured operator secret is below the minimum length.
    #[error("operator secret must be at least {MIN_SECRET_LEN} bytes")]
    SecretTooShort,

    /// The submitted secret does not match the configured one.
    #[error("operator secret mismatch")]
    WrongSecret,

    /// The session token does not have the expected text form.
    #[error("malformed session token")]
    MalformedToken,

    /// The session token's signature does not verify.
    #[error("session token signature mismatch")]
    BadSignature,

    /// The session token verified but has expired.
    #[error("session token expired")]
    Expired,
}

/// A freshly issued session token, handed to the operator's client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// The signed token text.
    pub token: String,
    /// Expiry as unix seconds.
    pub expires_at: u64,
}

/// Verifies operator secrets and mints/validates session tokens.
#[derive(Clone, Debug)]
pub struct AccessGuard {
    secret: SecretString,
}

impl AccessGuard {
    /// Creates a guard around the configured operator secret.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::SecretTooShort`] for secrets below
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: SecretString) -> Result<Self, GuardError> {
        if secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(GuardError::SecretTooShort);
        }
        Ok(Self { secret })
    }

    /// Checks a submitted operator secret in constant time.
    ///
    /// Both sides are hashed before comparison so the timing of the check
    /// depends on neither the length nor the content of the candidate.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::WrongSecret`] on mismatch.
    pub fn verify_secret(&self, candidate: &str) -> Result<(), GuardError> {
        let expected = Sha256::digest(self.secret.expose_secret().as_bytes());
        let submitted = Sha256::digest(candidate.as_bytes());
        if expected.as_slice().ct_eq(submitted.as_slice()).into() {
            Ok(())
        } else {
            tracing::warn!("operator login rejected: secret mismatch");
            Err(GuardError::WrongSecret)
        }
    }

    /// Verifies the secret and, on success, issues a session token valid
    /// for [`SESSION_TTL_SECS`] from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::WrongSecret`] on mismatch.
    pub fn login(&self, candidate: &str, now: u64) -> Result<SessionToken, GuardError> {
        self.verify_secret(candidate)?;
        Ok(self.issue_session(now))
    }

    /// Mints a signed session token expiring [`SESSION_TTL_SECS`] after
    /// `now`.
    #[must_use]
    pub fn issue_session(&self, now: u64) -> SessionToken {
        let expires_at = now.saturating_add(SESSION_TTL_SECS);
        let mut nonce = [0_u8; NONCE_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let payload = format!("{TOKEN_PREFIX}{expires_at}:{}", hex::encode(nonce));
        let mac = self.compute_mac(payload.as_bytes());
        SessionToken {
            token: format!("{payload}.{}", hex::encode(mac)),
            expires_at,
        }
    }

    /// Validates a session token presented with an operator request.
    ///
    /// The MAC is checked (constant-time) before the expiry is parsed from
    /// the payload, so an attacker cannot probe expiry handling with
    /// unsigned tokens.
    ///
    /// # Errors
    ///
    /// - [`GuardError::MalformedToken`] if the text form is wrong.
    /// - [`GuardError::BadSignature`] if the MAC does not verify.
    /// - [`GuardError::Expired`] if the token's validity window has passed.
    pub fn verify_session(&self, token: &str, now: u64) -> Result<(), GuardError> {
        let (payload, mac_hex) = token.rsplit_once('.').ok_or(GuardError::MalformedToken)?;
        if !payload.starts_with(TOKEN_PREFIX) {
            return Err(GuardError::MalformedToken);
        }
        let presented = hex::decode(mac_hex).map_err(|_| GuardError::MalformedToken)?;

        let expected = self.compute_mac(payload.as_bytes());
        if !bool::from(expected.ct_eq(&presented)) {
            tracing::warn!("operator request rejected: session token signature mismatch");
            return Err(GuardError::BadSignature);
        }

        let rest = &payload[TOKEN_PREFIX.len()..];
        let (expires_str, _nonce) = rest.split_once(':').ok_or(GuardError::MalformedToken)?;
        let expires_at: u64 = expires_str.parse().map_err(|_| GuardError::MalformedToken)?;
        if now >= expires_at {
            return Err(GuardError::Expired);
        }
        Ok(())
    }

    /// Computes the HMAC-SHA256 of a token payload under the derived key.
    fn compute_mac(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.token_key())
            .expect("HMAC accepts any key length; a 32-byte digest cannot fail");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    /// Derives the token-signing key from the operator secret.
    fn token_key(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DOMAIN_SEPARATION);
        hasher.update(self.secret.expose_secret().as_bytes());
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn test_guard() -> AccessGuard {
        AccessGuard::new(SecretString::from("correct-horse-battery-staple")).unwrap()
    }

    #[test]
    fn rejects_short_secret_at_construction() {
        let err = AccessGuard::new(SecretString::from("short")).unwrap_err();
        assert_eq!(err, GuardError::SecretTooShort);
    }

    #[test]
    fn accepts_matching_secret() {
        assert!(test_guard().verify_secret("correct-horse-battery-staple").is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let err = test_guard().verify_secret("wrong-password-entirely").unwrap_err();
        assert_eq!(err, GuardError::WrongSecret);
    }

    #[test]
    fn login_issues_verifiable_token() {
        let guard = test_guard();
        let session = guard.login("correct-horse-battery-staple", NOW).unwrap();
        assert_eq!(session.expires_at, NOW + SESSION_TTL_SECS);
        assert!(guard.verify_session(&session.token, NOW).is_ok());
        assert!(guard.verify_session(&session.token, NOW + SESSION_TTL_SECS - 1).is_ok());
    }

    #[test]
    fn token_expires_at_ttl_boundary() {
        let guard = test_guard();
        let session = guard.issue_session(NOW);
        let err = guard
            .verify_session(&session.token, NOW + SESSION_TTL_SECS)
            .unwrap_err();
        assert_eq!(err, GuardError::Expired);
    }

    #[test]
    fn rejects_token_signed_under_different_secret() {
        let other = AccessGuard::new(SecretString::from("a-completely-different-secret")).unwrap();
        let session = other.issue_session(NOW);
        let err = test_guard().verify_session(&session.token, NOW).unwrap_err();
        assert_eq!(err, GuardError::BadSignature);
    }

    #[test]
    fn rejects_tampered_expiry() {
        let guard = test_guard();
        let session = guard.issue_session(NOW);
        // Push the embedded expiry forward without re-signing.
        let forged = session.token.replacen(
            &(NOW + SESSION_TTL_SECS).to_string(),
            &(NOW + 10 * SESSION_TTL_SECS).to_string(),
            1,
        );
        let err = guard.verify_session(&forged, NOW).unwrap_err();
        assert_eq!(err, GuardError::BadSignature);
    }

    #[test]
    fn rejects_malformed_tokens() {
        let guard = test_guard();
        assert_eq!(
            guard.verify_session("no-separator", NOW).unwrap_err(),
            GuardError::MalformedToken
        );
        assert_eq!(
            guard.verify_session("wrong:prefix:1.abcd", NOW).unwrap_err(),
            GuardError::MalformedToken
        );
        assert_eq!(
            guard.verify_session("operator:v1:1:aa.nothex!", NOW).unwrap_err(),
            GuardError::MalformedToken
        );
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let guard = test_guard();
        assert_ne!(guard.issue_session(NOW).token, guard.issue_session(NOW).token);
    }
}
