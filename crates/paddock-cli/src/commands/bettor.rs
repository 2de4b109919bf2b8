//! Bettor command arguments.

use clap::Args;
use paddock_daemon::protocol::messages::Request;

/// Shared identity-credential argument.
#[derive(Debug, Args)]
pub struct CredentialArg {
    /// Identity credential issued with your first bet.
    #[arg(long, env = "PADDOCK_CREDENTIAL", hide_env_values = true)]
    pub credential: Option<String>,
}

/// Arguments for `paddock bet`.
#[derive(Debug, Args)]
pub struct BetArgs {
    #[command(flatten)]
    credential: CredentialArg,

    /// The race to bet on.
    #[arg(long)]
    pub race: i64,

    /// First choice to win.
    #[arg(long)]
    pub first: i64,

    /// Optional second choice.
    #[arg(long)]
    pub second: Option<i64>,

    /// Optional third choice.
    #[arg(long)]
    pub third: Option<i64>,

    /// Legacy caller-supplied bettor id (ignored when a credential is
    /// given).
    #[arg(long)]
    pub bettor_id: Option<String>,
}

impl BetArgs {
    /// Builds the bet-placement request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::BetPlace {
            credential: self.credential.credential,
            bettor_id: self.bettor_id,
            race_id: self.race,
            first_choice: self.first,
            second_choice: self.second,
            third_choice: self.third,
        }
    }
}

/// Arguments for `paddock update-bet`.
#[derive(Debug, Args)]
pub struct UpdateBetArgs {
    #[command(flatten)]
    credential: CredentialArg,

    /// The race whose bet to revise.
    #[arg(long)]
    pub race: i64,

    /// First choice to win.
    #[arg(long)]
    pub first: i64,

    /// Optional second choice.
    #[arg(long)]
    pub second: Option<i64>,

    /// Optional third choice.
    #[arg(long)]
    pub third: Option<i64>,
}

impl UpdateBetArgs {
    /// Builds the bet-update request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::BetUpdate {
            credential: self.credential.credential,
            race_id: self.race,
            first_choice: self.first,
            second_choice: self.second,
            third_choice: self.third,
        }
    }
}

/// Arguments for `paddock prediction`.
#[derive(Debug, Args)]
pub struct PredictionArgs {
    #[command(flatten)]
    credential: CredentialArg,

    /// The race to look up.
    #[arg(long)]
    pub race: i64,
}

impl PredictionArgs {
    /// Builds the prediction-lookup request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::BetGet {
            credential: self.credential.credential,
            race_id: self.race,
        }
    }
}

/// Arguments for `paddock results`.
#[derive(Debug, Args)]
pub struct ResultsArgs {
    /// The race to look up.
    #[arg(long)]
    pub race: i64,
}

impl ResultsArgs {
    /// Builds the results-lookup request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::ResultsGet { race_id: self.race }
    }
}
