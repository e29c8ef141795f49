use specboard::api::OrchestratorClient;
use specboard::session::{ReviewDecision, RunSession, SessionEvent};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

// An unroutable loopback port: connections fail fast without touching the
// network, which is all these tests need.
fn unreachable_client() -> OrchestratorClient {
    OrchestratorClient::new("http://127.0.0.1:9/api")
}

fn wait_for_event(
    session: &RunSession,
    timeout: Duration,
    mut accept: impl FnMut(&SessionEvent) -> bool,
) -> Option<SessionEvent> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(event) = session.try_next_event() {
            if accept(&event) {
                return Some(event);
            }
        } else {
            std::thread::sleep(Duration::from_millis(20));
        }
    }
    None
}

// Minimal canned orchestrator: answers each request on its own connection
// with a fixed JSON body per path. Enough to drive one real poll cycle.
fn spawn_stub_orchestrator() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
    let base_url = format!("http://{}/api", listener.local_addr().expect("stub address"));
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buffer = [0u8; 2048];
            let read = stream.read(&mut buffer).unwrap_or(0);
            let request = String::from_utf8_lossy(&buffer[..read]);
            let path = request.split_whitespace().nth(1).unwrap_or("");
            let body = match path {
                "/api/runs/run-1" => {
                    r#"{"id":"run-1","brief":"demo","status":"running","current_stage":"ba"}"#
                }
                "/api/runs/run-1/artifacts" => {
                    r#"[{"id":"REQ-1","run_id":"run-1","agent":"ba","type":"requirement","content":{"title":"Login"}}]"#
                }
                "/api/runs/run-1/logs" => {
                    r#"[{"id":1,"run_id":"run-1","agent":"ba","action":"created REQ-1"}]"#
                }
                _ => "{}",
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    base_url
}

#[test]
fn successful_poll_cycle_applies_run_artifacts_and_logs_together() {
    let base_url = spawn_stub_orchestrator();
    let client = OrchestratorClient::new(&base_url);
    let mut session = RunSession::start(client, "run-1", Duration::from_secs(3600));

    let event = wait_for_event(&session, Duration::from_secs(10), |event| {
        matches!(event, SessionEvent::Snapshot(_))
    })
    .expect("snapshot arrives");
    let SessionEvent::Snapshot(snapshot) = event else {
        unreachable!();
    };

    // One event carries the whole cycle: run, artifacts, and logs move
    // forward together.
    assert_eq!(snapshot.run.status, "running");
    assert_eq!(snapshot.run.current_stage, "ba");
    assert_eq!(snapshot.artifacts.len(), 1);
    assert_eq!(snapshot.artifacts[0].artifact_type, "requirement");
    assert_eq!(snapshot.logs.len(), 1);
    assert_eq!(snapshot.logs[0].action, "created REQ-1");

    // A run that is not waiting for review clears the gate explicitly.
    let gate = wait_for_event(&session, Duration::from_secs(10), |event| {
        matches!(event, SessionEvent::Gate(_))
    });
    assert!(matches!(gate, Some(SessionEvent::Gate(None))));
    session.stop();
}

#[test]
fn failed_poll_cycle_reports_an_error_and_applies_nothing() {
    let mut session = RunSession::start(unreachable_client(), "run-1", Duration::from_secs(3600));

    let event = wait_for_event(&session, Duration::from_secs(10), |event| {
        matches!(event, SessionEvent::PollFailed(_))
    });
    assert!(event.is_some(), "expected a PollFailed event");
    assert!(session.cache.is_empty());
    session.stop();
}

#[test]
fn content_fetch_failure_is_surfaced_and_leaves_the_id_retryable() {
    let mut session = RunSession::start(unreachable_client(), "run-1", Duration::from_secs(3600));

    session.request_full("REQ-1");
    assert!(session.cache.is_in_flight("REQ-1"));

    let event = wait_for_event(&session, Duration::from_secs(10), |event| {
        matches!(
            event,
            SessionEvent::ContentFetched { artifact_id, .. } if artifact_id == "REQ-1"
        )
    })
    .expect("fetch outcome arrives");

    let SessionEvent::ContentFetched {
        artifact_id,
        result,
    } = event
    else {
        unreachable!();
    };
    let message = session
        .apply_content_outcome(&artifact_id, result)
        .expect("failure message");
    assert!(!message.is_empty());
    assert!(!session.cache.has_full("REQ-1"));
    assert!(!session.cache.is_in_flight("REQ-1"));
    session.stop();
}

#[test]
fn duplicate_requests_collapse_while_one_is_outstanding() {
    let mut session = RunSession::start(unreachable_client(), "run-1", Duration::from_secs(3600));

    session.request_full("REQ-1");
    session.request_full("REQ-1");
    assert!(session.cache.is_in_flight("REQ-1"));

    // Exactly one outcome event arrives for the id.
    let first = wait_for_event(&session, Duration::from_secs(10), |event| {
        matches!(event, SessionEvent::ContentFetched { .. })
    });
    assert!(first.is_some());
    let second = wait_for_event(&session, Duration::from_millis(500), |event| {
        matches!(event, SessionEvent::ContentFetched { .. })
    });
    assert!(second.is_none(), "second fetch should have been collapsed");
    session.stop();
}

#[test]
fn short_feedback_never_reaches_the_network() {
    let mut session = RunSession::start(unreachable_client(), "run-1", Duration::from_secs(3600));

    let err = session
        .submit_decision(ReviewDecision::RequestChanges, "fix", 8)
        .expect_err("validation error");
    assert!(err.contains("8"));

    // No DecisionSubmitted event is produced for a rejected submission.
    let event = wait_for_event(&session, Duration::from_millis(500), |event| {
        matches!(event, SessionEvent::DecisionSubmitted { .. })
    });
    assert!(event.is_none());
    session.stop();
}

#[test]
fn stopping_the_session_halts_the_poll_loop_promptly() {
    let mut session = RunSession::start(unreachable_client(), "run-1", Duration::from_secs(3600));
    let started = Instant::now();
    session.stop();
    assert!(started.elapsed() < Duration::from_secs(5));

    let stop = AtomicBool::new(false);
    assert!(specboard::session::sleep_with_stop(&stop, Duration::from_millis(10)));
}
