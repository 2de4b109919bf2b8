//! CLI command definitions.
//!
//! Operator commands authenticate with a session token (flag or
//! `PADDOCK_SESSION`); bettor commands carry the identity credential
//! (flag or `PADDOCK_CREDENTIAL`). Each argument struct knows how to turn
//! itself into a protocol request.

pub mod bettor;
pub mod operator;

use clap::Subcommand;

/// All paddock subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exchange the operator secret for a session token.
    Login(operator::LoginArgs),
    /// End an operator session (the token simply stops being replayed).
    Logout(operator::LogoutArgs),
    /// Set the active race.
    SetRace(operator::SetRaceArgs),
    /// Open or close the betting window.
    Betting(operator::BettingArgs),
    /// Record a race's results.
    IngestResults(operator::IngestResultsArgs),
    /// Insert or replace one roster entry.
    PutHorse(operator::PutHorseArgs),
    /// Show the active race and the betting window.
    Status,
    /// List the horse roster.
    Horses,
    /// Show a race's recorded results.
    Results(bettor::ResultsArgs),
    /// Place a bet.
    Bet(bettor::BetArgs),
    /// Revise an existing bet (betting window must be open).
    UpdateBet(bettor::UpdateBetArgs),
    /// Show your bet for a race.
    Prediction(bettor::PredictionArgs),
}
