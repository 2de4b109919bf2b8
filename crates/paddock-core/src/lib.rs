//! Domain core for the paddock wagering service.
//!
//! This crate holds everything that does not depend on a transport or a
//! storage engine: validated domain types, the store traits the daemon's
//! SQLite adapters implement, the anonymous-bettor identity resolver, and
//! the operator access guard.
//!
//! The split keeps the invariants testable without a socket or a database:
//! the resolver is a pure function, the guard operates on plain strings and
//! clock values, and every store behavior is expressed as a trait contract
//! with typed errors (no caller ever inspects engine-specific error text).

pub mod guard;
pub mod identity;
pub mod ledger;
pub mod mode;
pub mod results;
pub mod roster;
pub mod types;

pub use guard::{AccessGuard, GuardError, SessionToken};
pub use identity::{BettorId, IdentityError, ResolvedIdentity};
pub use ledger::{LedgerError, LedgerStore, Prediction};
pub use mode::{BettingMode, ModeError, ModeStore};
pub use results::{IngestOutcome, RaceResult, ResultsError, ResultsStore};
pub use roster::{Horse, RosterError, RosterStore};
pub use types::{HorseId, RaceId, Rank};
