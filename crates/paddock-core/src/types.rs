//! Validated positive-integer identifiers shared across the stores.
//!
//! Race and horse identifiers (and finishing ranks) arrive over the wire as
//! plain integers. They are converted into these newtypes exactly once, at
//! the orchestrator boundary, so every store trait can assume its inputs
//! are already in range.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A non-positive value was supplied where a positive identifier is
/// required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{field} must be a positive integer (got {value})")]
pub struct NonPositive {
    /// Name of the offending field, as it appears on the wire.
    pub field: &'static str,
    /// The rejected value.
    pub value: i64,
}

macro_rules! positive_id {
    ($(#[$doc:meta])* $name:ident, $field:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Constructs a validated identifier.
            ///
            /// # Errors
            ///
            /// Returns [`NonPositive`] if `value` is zero or negative.
            pub const fn new(value: i64) -> Result<Self, NonPositive> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(NonPositive {
                        field: $field,
                        value,
                    })
                }
            }

            /// Returns the underlying integer.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = NonPositive;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// Identifier of one race of the event.
    RaceId,
    "race_id"
);

positive_id!(
    /// Identifier of one horse on the roster.
    HorseId,
    "horse_id"
);

positive_id!(
    /// A finishing position within one race (1 = winner).
    Rank,
    "rank"
);
