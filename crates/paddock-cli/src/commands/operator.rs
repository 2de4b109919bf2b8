//! Operator command arguments.

use clap::{Args, ValueEnum};
use paddock_daemon::protocol::messages::{Request, ResultRowDto};

/// Shared operator-session argument.
#[derive(Debug, Args)]
pub struct SessionArg {
    /// Operator session token from `login`.
    #[arg(long, env = "PADDOCK_SESSION")]
    pub session: Option<String>,
}

/// Arguments for `paddock login`.
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// The operator secret.
    #[arg(long, env = "PADDOCK_OPERATOR_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl LoginArgs {
    /// Builds the login request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::OperatorLogin {
            password: self.password,
        }
    }
}

/// Arguments for `paddock logout`.
#[derive(Debug, Args)]
pub struct LogoutArgs {
    #[command(flatten)]
    session: SessionArg,
}

impl LogoutArgs {
    /// Builds the logout request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::OperatorLogout {
            session: self.session.session,
        }
    }
}

/// Arguments for `paddock set-race`.
#[derive(Debug, Args)]
pub struct SetRaceArgs {
    #[command(flatten)]
    session: SessionArg,

    /// The race to activate.
    pub race_id: i64,
}

impl SetRaceArgs {
    /// Builds the set-race request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::CurrentRaceSet {
            session: self.session.session,
            race_id: self.race_id,
        }
    }
}

/// Betting-window positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowState {
    /// Open the window.
    On,
    /// Close the window.
    Off,
}

/// Arguments for `paddock betting`.
#[derive(Debug, Args)]
pub struct BettingArgs {
    #[command(flatten)]
    session: SessionArg,

    /// Whether betting should be open.
    #[arg(value_enum)]
    pub state: WindowState,
}

impl BettingArgs {
    /// Builds the betting-toggle request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::BettingSet {
            session: self.session.session,
            enabled: matches!(self.state, WindowState::On),
        }
    }
}

/// Parses one `horse:rank` result row.
fn parse_result_row(raw: &str) -> Result<ResultRowDto, String> {
    let (horse, rank) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected horse:rank, got {raw:?}"))?;
    Ok(ResultRowDto {
        horse_id: horse
            .parse()
            .map_err(|_| format!("horse id is not an integer: {horse:?}"))?,
        rank: rank
            .parse()
            .map_err(|_| format!("rank is not an integer: {rank:?}"))?,
    })
}

/// Arguments for `paddock ingest-results`.
#[derive(Debug, Args)]
pub struct IngestResultsArgs {
    #[command(flatten)]
    session: SessionArg,

    /// The race the results are for.
    #[arg(long)]
    pub race: i64,

    /// One `horse:rank` row; repeat for the full result set.
    #[arg(long = "row", value_parser = parse_result_row, required = true)]
    pub rows: Vec<ResultRowDto>,

    /// Replace already-recorded results instead of conflicting.
    #[arg(long)]
    pub force: bool,
}

impl IngestResultsArgs {
    /// Builds the ingest request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::ResultsIngest {
            session: self.session.session,
            race_id: self.race,
            results: self.rows,
            force: self.force,
        }
    }
}

/// Arguments for `paddock put-horse`.
#[derive(Debug, Args)]
pub struct PutHorseArgs {
    #[command(flatten)]
    session: SessionArg,

    /// Horse identifier.
    #[arg(long)]
    pub id: i64,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Free-text description.
    #[arg(long, default_value = "")]
    pub info: String,
}

impl PutHorseArgs {
    /// Builds the roster-put request.
    #[must_use]
    pub fn into_request(self) -> Request {
        Request::HorsePut {
            session: self.session.session,
            horse_id: self.id,
            name: self.name,
            info: self.info,
        }
    }
}
