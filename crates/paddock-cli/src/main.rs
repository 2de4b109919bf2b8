//! `paddock`: command-line client for the wagering daemon.

mod commands;
mod exit_codes;

use std::path::PathBuf;

use clap::Parser;
use commands::Command;
use exit_codes::{codes, map_client_error, map_error_kind};
use paddock_core::results::IngestOutcome;
use paddock_daemon::protocol::messages::{ApiError, ErrorKind, Reply, Request, Response};
use paddock_daemon::protocol::ProtocolClient;

/// Command-line client for the paddock wagering daemon.
#[derive(Debug, Parser)]
#[command(name = "paddock", version, about)]
struct Cli {
    /// Daemon socket path.
    #[arg(long, env = "PADDOCK_SOCKET", default_value = "paddock.sock", global = true)]
    socket: PathBuf,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(i32::from(code));
}

async fn run(cli: Cli) -> u8 {
    let mut client = match ProtocolClient::connect(&cli.socket).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return map_client_error(&e);
        },
    };

    let request = match cli.command {
        Command::Status => return status(&mut client, cli.json).await,
        Command::Login(args) => args.into_request(),
        Command::Logout(args) => args.into_request(),
        Command::SetRace(args) => args.into_request(),
        Command::Betting(args) => args.into_request(),
        Command::IngestResults(args) => args.into_request(),
        Command::PutHorse(args) => args.into_request(),
        Command::Horses => Request::HorsesList,
        Command::Results(args) => args.into_request(),
        Command::Bet(args) => args.into_request(),
        Command::UpdateBet(args) => args.into_request(),
        Command::Prediction(args) => args.into_request(),
    };
    execute(&mut client, &request, cli.json).await
}

/// Sends one request and renders its outcome.
async fn execute(client: &mut ProtocolClient, request: &Request, json: bool) -> u8 {
    match client.request(request).await {
        Err(e) => {
            eprintln!("error: {e}");
            map_client_error(&e)
        },
        Ok(Response::Err(err)) => {
            report_error(&err, json);
            map_error_kind(err.kind)
        },
        Ok(Response::Ok(reply)) => {
            if json {
                print_json(&reply);
            } else {
                print_text(&reply);
            }
            codes::SUCCESS
        },
    }
}

/// `status` composes two read operations into one view.
async fn status(client: &mut ProtocolClient, json: bool) -> u8 {
    let race = match client.request(&Request::CurrentRaceGet).await {
        Err(e) => {
            eprintln!("error: {e}");
            return map_client_error(&e);
        },
        Ok(response) => response,
    };
    let betting = match client.request(&Request::BettingStatus).await {
        Err(e) => {
            eprintln!("error: {e}");
            return map_client_error(&e);
        },
        Ok(response) => response,
    };

    let race_id = match race {
        Response::Ok(Reply::CurrentRace { race_id }) => Some(race_id),
        // "no race set" is a normal state for the status view.
        Response::Err(ref err) if err.kind == ErrorKind::NotFound => None,
        Response::Err(err) => {
            report_error(&err, json);
            return map_error_kind(err.kind);
        },
        Response::Ok(other) => {
            eprintln!("error: unexpected reply: {other:?}");
            return codes::PROTOCOL_ERROR;
        },
    };
    let enabled = match betting {
        Response::Ok(Reply::BettingStatus { enabled }) => enabled,
        Response::Err(err) => {
            report_error(&err, json);
            return map_error_kind(err.kind);
        },
        Response::Ok(other) => {
            eprintln!("error: unexpected reply: {other:?}");
            return codes::PROTOCOL_ERROR;
        },
    };

    if json {
        println!(
            "{}",
            serde_json::json!({ "current_race": race_id, "betting_enabled": enabled })
        );
    } else {
        match race_id {
            Some(id) => println!("current race: {id}"),
            None => println!("current race: not set"),
        }
        println!("betting: {}", if enabled { "open" } else { "closed" });
    }
    codes::SUCCESS
}

fn report_error(err: &ApiError, json: bool) {
    if json {
        match serde_json::to_string(err) {
            Ok(encoded) => eprintln!("{encoded}"),
            Err(_) => eprintln!("error: {}", err.message),
        }
    } else {
        match &err.field {
            Some(field) => eprintln!("error: {} (field: {field})", err.message),
            None => eprintln!("error: {}", err.message),
        }
    }
}

fn print_json(reply: &Reply) {
    match serde_json::to_string_pretty(reply) {
        Ok(encoded) => println!("{encoded}"),
        Err(e) => eprintln!("error: failed to encode reply: {e}"),
    }
}

fn print_text(reply: &Reply) {
    match reply {
        Reply::CurrentRace { race_id } => println!("current race: {race_id}"),
        Reply::BettingStatus { enabled } => {
            println!("betting: {}", if *enabled { "open" } else { "closed" });
        },
        Reply::Ack => println!("ok"),
        Reply::Bet {
            prediction,
            credential,
        } => {
            let picks = [
                Some(prediction.first_choice),
                prediction.second_choice,
                prediction.third_choice,
            ]
            .iter()
            .flatten()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
            println!("race {}: picks {}", prediction.race_id, picks);
            if let Some(issued) = credential {
                println!(
                    "identity credential issued (retain for {} seconds and pass as --credential):",
                    issued.ttl_secs
                );
                println!("{}", issued.credential);
            }
        },
        Reply::Results { results } => {
            if results.is_empty() {
                println!("no results recorded");
            }
            for row in results {
                println!("rank {}: horse {}", row.rank, row.horse_id);
            }
        },
        Reply::Ingested { outcome } => match outcome {
            IngestOutcome::Inserted => println!("results inserted"),
            IngestOutcome::Replaced => println!("results replaced"),
        },
        Reply::Horses { horses } => {
            if horses.is_empty() {
                println!("roster is empty");
            }
            for horse in horses {
                println!("{}: {} - {}", horse.horse_id, horse.name, horse.info);
            }
        },
        Reply::Session {
            session,
            expires_at,
        } => {
            println!("session issued (expires at unix {expires_at}, pass as --session):");
            println!("{session}");
        },
    }
}
