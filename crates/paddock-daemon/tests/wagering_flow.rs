//! Integration tests for the daemon over its protocol socket.
//!
//! Each test starts a real daemon on a socket in a fresh temp directory
//! with an in-memory database, then drives it through the protocol client
//! exactly as the CLI would.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use paddock_core::guard::AccessGuard;
use paddock_daemon::orchestrator::{MIN_LOGIN_DELAY, Orchestrator};
use paddock_daemon::protocol::messages::{
    ApiError, ErrorKind, Reply, Request, Response, ResultRowDto,
};
use paddock_daemon::protocol::{ProtocolClient, ProtocolServer};
use paddock_daemon::storage::{
    self, SqliteLedgerStore, SqliteModeStore, SqliteResultsStore, SqliteRosterStore,
};
use secrecy::SecretString;
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const SECRET: &str = "an-integration-test-secret";

/// Starts a daemon on a socket inside `dir` and returns the socket path.
fn start_daemon(dir: &TempDir, with_secret: bool) -> PathBuf {
    let socket = dir.path().join("paddock.sock");
    let conn = storage::open(":memory:").expect("in-memory db should open");
    let guard = if with_secret {
        Some(AccessGuard::new(SecretString::from(SECRET)).expect("test secret is long enough"))
    } else {
        None
    };
    let orchestrator = Orchestrator::new(
        Arc::new(SqliteModeStore::new(Arc::clone(&conn))),
        Arc::new(SqliteLedgerStore::new(Arc::clone(&conn))),
        Arc::new(SqliteResultsStore::new(Arc::clone(&conn))),
        Arc::new(SqliteRosterStore::new(conn)),
        guard,
    );
    let server = ProtocolServer::bind(&socket, orchestrator).expect("bind should succeed");
    tokio::spawn(server.run());
    socket
}

async fn connect(socket: &PathBuf) -> ProtocolClient {
    // The accept loop races with the connect; a short retry absorbs it.
    for _ in 0..50 {
        if let Ok(client) = ProtocolClient::connect(socket).await {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("daemon socket never became connectable");
}

async fn roundtrip(client: &mut ProtocolClient, request: Request) -> Response {
    timeout(Duration::from_secs(5), client.request(&request))
        .await
        .expect("request timed out")
        .expect("transport failure")
}

async fn expect_ok(client: &mut ProtocolClient, request: Request) -> Reply {
    roundtrip(client, request)
        .await
        .into_result()
        .expect("expected ok response")
}

async fn expect_err(client: &mut ProtocolClient, request: Request) -> ApiError {
    roundtrip(client, request)
        .await
        .into_result()
        .expect_err("expected error response")
}

async fn login(client: &mut ProtocolClient) -> String {
    match expect_ok(
        client,
        Request::OperatorLogin {
            password: SECRET.to_string(),
        },
    )
    .await
    {
        Reply::Session { session, .. } => session,
        other => panic!("unexpected login reply: {other:?}"),
    }
}

#[tokio::test]
async fn full_wagering_flow() {
    let dir = TempDir::new().unwrap();
    let socket = start_daemon(&dir, true);
    let mut client = connect(&socket).await;

    // No race configured yet.
    let err = expect_err(&mut client, Request::CurrentRaceGet).await;
    assert_eq!(err.kind, ErrorKind::NotFound);

    // Operator configures race 7.
    let session = login(&mut client).await;
    expect_ok(
        &mut client,
        Request::CurrentRaceSet {
            session: Some(session.clone()),
            race_id: 7,
        },
    )
    .await;
    assert_eq!(
        expect_ok(&mut client, Request::CurrentRaceGet).await,
        Reply::CurrentRace { race_id: 7 }
    );

    // First bet with no credential: identity is issued.
    let reply = expect_ok(
        &mut client,
        Request::BetPlace {
            credential: None,
            bettor_id: None,
            race_id: 7,
            first_choice: 3,
            second_choice: None,
            third_choice: None,
        },
    )
    .await;
    let credential = match reply {
        Reply::Bet {
            prediction,
            credential,
        } => {
            assert_eq!(prediction.first_choice, 3);
            credential.expect("first bet should issue a credential").credential
        },
        other => panic!("unexpected bet reply: {other:?}"),
    };

    // Replaying the credential reads the bet back.
    let reply = expect_ok(
        &mut client,
        Request::BetGet {
            credential: Some(credential.clone()),
            race_id: 7,
        },
    )
    .await;
    match reply {
        Reply::Bet { prediction, .. } => {
            assert_eq!(prediction.bettor_id, credential);
            assert_eq!(prediction.first_choice, 3);
        },
        other => panic!("unexpected reply: {other:?}"),
    }

    // A second bet for the same race conflicts and changes nothing.
    let err = expect_err(
        &mut client,
        Request::BetPlace {
            credential: Some(credential.clone()),
            bettor_id: None,
            race_id: 7,
            first_choice: 5,
            second_choice: None,
            third_choice: None,
        },
    )
    .await;
    assert_eq!(err.kind, ErrorKind::Conflict);

    // Updates are rejected while the window is closed.
    let err = expect_err(
        &mut client,
        Request::BetUpdate {
            credential: Some(credential.clone()),
            race_id: 7,
            first_choice: 5,
            second_choice: None,
            third_choice: None,
        },
    )
    .await;
    assert_eq!(err.kind, ErrorKind::BettingClosed);

    // Operator opens the window; the update now lands.
    expect_ok(
        &mut client,
        Request::BettingSet {
            session: Some(session.clone()),
            enabled: true,
        },
    )
    .await;
    assert_eq!(
        expect_ok(&mut client, Request::BettingStatus).await,
        Reply::BettingStatus { enabled: true }
    );
    let reply = expect_ok(
        &mut client,
        Request::BetUpdate {
            credential: Some(credential.clone()),
            race_id: 7,
            first_choice: 5,
            second_choice: Some(2),
            third_choice: None,
        },
    )
    .await;
    match reply {
        Reply::Bet { prediction, .. } => assert_eq!(prediction.first_choice, 5),
        other => panic!("unexpected reply: {other:?}"),
    }

    // Results: insert, conflict on repeat, replace under force.
    let rows1 = vec![
        ResultRowDto { horse_id: 3, rank: 1 },
        ResultRowDto { horse_id: 5, rank: 2 },
    ];
    expect_ok(
        &mut client,
        Request::ResultsIngest {
            session: Some(session.clone()),
            race_id: 7,
            results: rows1.clone(),
            force: false,
        },
    )
    .await;
    assert_eq!(
        expect_ok(&mut client, Request::ResultsGet { race_id: 7 }).await,
        Reply::Results {
            results: rows1.clone()
        }
    );

    let err = expect_err(
        &mut client,
        Request::ResultsIngest {
            session: Some(session.clone()),
            race_id: 7,
            results: rows1.clone(),
            force: false,
        },
    )
    .await;
    assert_eq!(err.kind, ErrorKind::Conflict);

    let rows2 = vec![ResultRowDto { horse_id: 9, rank: 1 }];
    expect_ok(
        &mut client,
        Request::ResultsIngest {
            session: Some(session.clone()),
            race_id: 7,
            results: rows2.clone(),
            force: true,
        },
    )
    .await;
    assert_eq!(
        expect_ok(&mut client, Request::ResultsGet { race_id: 7 }).await,
        Reply::Results { results: rows2 }
    );

    // Logout acknowledges; the token itself simply expires later.
    assert_eq!(
        expect_ok(
            &mut client,
            Request::OperatorLogout {
                session: Some(session)
            }
        )
        .await,
        Reply::Ack
    );
}

#[tokio::test]
async fn operator_operations_require_a_session() {
    let dir = TempDir::new().unwrap();
    let socket = start_daemon(&dir, true);
    let mut client = connect(&socket).await;

    let err = expect_err(
        &mut client,
        Request::CurrentRaceSet {
            session: None,
            race_id: 7,
        },
    )
    .await;
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let err = expect_err(
        &mut client,
        Request::ResultsIngest {
            session: Some("operator:v1:1:aa.bb".to_string()),
            race_id: 7,
            results: vec![ResultRowDto { horse_id: 1, rank: 1 }],
            force: false,
        },
    )
    .await;
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn wrong_password_is_rejected_no_sooner_than_the_floor() {
    let dir = TempDir::new().unwrap();
    let socket = start_daemon(&dir, true);
    let mut client = connect(&socket).await;

    let started = Instant::now();
    let err = expect_err(
        &mut client,
        Request::OperatorLogin {
            password: "not-the-secret".to_string(),
        },
    )
    .await;
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(
        started.elapsed() >= MIN_LOGIN_DELAY,
        "login answered faster than the fixed floor"
    );
}

#[tokio::test]
async fn login_fails_closed_without_a_configured_secret() {
    let dir = TempDir::new().unwrap();
    let socket = start_daemon(&dir, false);
    let mut client = connect(&socket).await;

    let err = expect_err(
        &mut client,
        Request::OperatorLogin {
            password: "anything".to_string(),
        },
    )
    .await;
    assert_eq!(err.kind, ErrorKind::Internal);
}

#[tokio::test]
async fn malformed_frames_get_a_validation_error() {
    let dir = TempDir::new().unwrap();
    let socket = start_daemon(&dir, true);

    // Drive the socket below the typed client to send a non-request frame.
    let stream = {
        let mut attempt = 0;
        loop {
            match tokio::net::UnixStream::connect(&socket).await {
                Ok(stream) => break stream,
                Err(_) if attempt < 50 => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                },
                Err(e) => panic!("connect failed: {e}"),
            }
        }
    };
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    framed
        .send(Bytes::from_static(b"{\"op\":\"no_such_operation\"}"))
        .await
        .unwrap();
    let frame = timeout(Duration::from_secs(5), framed.next())
        .await
        .expect("response timed out")
        .expect("connection closed")
        .expect("frame error");
    let response: Response = serde_json::from_slice(&frame).unwrap();
    let err = response.into_result().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn bettors_are_isolated_by_credential() {
    let dir = TempDir::new().unwrap();
    let socket = start_daemon(&dir, true);
    let mut client = connect(&socket).await;

    let place = |credential: Option<String>, first| Request::BetPlace {
        credential,
        bettor_id: None,
        race_id: 3,
        first_choice: first,
        second_choice: None,
        third_choice: None,
    };

    let cred_a = match expect_ok(&mut client, place(None, 1)).await {
        Reply::Bet { credential, .. } => credential.unwrap().credential,
        other => panic!("unexpected reply: {other:?}"),
    };
    let cred_b = match expect_ok(&mut client, place(None, 2)).await {
        Reply::Bet { credential, .. } => credential.unwrap().credential,
        other => panic!("unexpected reply: {other:?}"),
    };
    assert_ne!(cred_a, cred_b);

    match expect_ok(
        &mut client,
        Request::BetGet {
            credential: Some(cred_b),
            race_id: 3,
        },
    )
    .await
    {
        Reply::Bet { prediction, .. } => assert_eq!(prediction.first_choice, 2),
        other => panic!("unexpected reply: {other:?}"),
    }
}
