use crate::api::{Artifact, DecisionLogEntry, HitlGate, OrchestratorClient, Run};
use crate::pipeline::is_waiting_for_review;
use crate::review::cache::ContentCache;
use crate::review::diagram::render_with_mermaid;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// One polling cycle's worth of run state, applied atomically: either all
// three fetches succeeded and the view moves forward together, or nothing is
// applied and the previous state is retained.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub run: Run,
    pub artifacts: Vec<Artifact>,
    pub logs: Vec<DecisionLogEntry>,
}

#[derive(Debug)]
pub enum SessionEvent {
    Snapshot(Box<RunSnapshot>),
    Gate(Option<HitlGate>),
    PollFailed(String),
    ContentFetched {
        artifact_id: String,
        result: Result<Box<Artifact>, String>,
    },
    DiagramRendered {
        artifact_id: String,
        source: String,
        result: Result<String, String>,
    },
    DecisionSubmitted {
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
    RequestChanges,
}

// Owns everything scoped to viewing one run: the poll worker, the content
// cache, and the event channel the workers report through. Dropping the
// session stops the poll loop; results from in-flight workers go to a
// disconnected channel and are discarded.
pub struct RunSession {
    client: OrchestratorClient,
    run_id: String,
    stop: Arc<AtomicBool>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    pub cache: ContentCache,
    poll_handle: Option<JoinHandle<()>>,
}

impl RunSession {
    pub fn start(client: OrchestratorClient, run_id: &str, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let worker_client = client.clone();
        let worker_run_id = run_id.to_string();
        let worker_tx = events_tx.clone();
        let worker_stop = Arc::clone(&stop);
        let poll_handle = thread::spawn(move || {
            run_poll_loop(&worker_client, &worker_run_id, &worker_tx, &worker_stop, poll_interval);
        });

        Self {
            client,
            run_id: run_id.to_string(),
            stop,
            events_tx,
            events_rx,
            cache: ContentCache::new(run_id),
            poll_handle: Some(poll_handle),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn try_next_event(&self) -> Option<SessionEvent> {
        self.events_rx.try_recv().ok()
    }

    // Idempotent full-content fetch. The cache's in-flight set guarantees at
    // most one outstanding request per artifact id; repeat calls before the
    // first resolves are no-ops.
    pub fn request_full(&mut self, artifact_id: &str) {
        if !self.cache.begin_fetch(artifact_id) {
            return;
        }
        let client = self.client.clone();
        let run_id = self.run_id.clone();
        let id = artifact_id.to_string();
        let tx = self.events_tx.clone();
        thread::spawn(move || {
            let result = client
                .get_artifact(&run_id, &id)
                .map(Box::new)
                .map_err(|err| err.to_string());
            let _ = tx.send(SessionEvent::ContentFetched {
                artifact_id: id,
                result,
            });
        });
    }

    pub fn apply_content_outcome(
        &mut self,
        artifact_id: &str,
        result: Result<Box<Artifact>, String>,
    ) -> Option<String> {
        match result {
            Ok(artifact) => {
                self.cache.complete_success(*artifact);
                None
            }
            Err(message) => {
                self.cache.complete_failure(artifact_id);
                Some(message)
            }
        }
    }

    pub fn request_diagram_render(&self, artifact_id: &str, handle: &str, binary: &str, source: &str) {
        let tx = self.events_tx.clone();
        let id = artifact_id.to_string();
        let handle = handle.to_string();
        let binary = binary.to_string();
        let source = source.to_string();
        thread::spawn(move || {
            let result =
                render_with_mermaid(&binary, &handle, &source).map_err(|err| err.to_string());
            // The source travels with the outcome so the instance can drop
            // completions for a source it no longer holds.
            let _ = tx.send(SessionEvent::DiagramRendered {
                artifact_id: id,
                source,
                result,
            });
        });
    }

    // Validation happens before any network call; a too-short feedback text
    // is returned immediately and nothing is sent to the orchestrator.
    pub fn submit_decision(
        &self,
        decision: ReviewDecision,
        feedback: &str,
        feedback_min_chars: usize,
    ) -> Result<(), String> {
        let feedback = feedback.trim().to_string();
        if decision == ReviewDecision::RequestChanges && feedback.chars().count() < feedback_min_chars
        {
            return Err(format!(
                "feedback must be at least {feedback_min_chars} characters"
            ));
        }

        let client = self.client.clone();
        let run_id = self.run_id.clone();
        let tx = self.events_tx.clone();
        thread::spawn(move || {
            let result = match decision {
                ReviewDecision::Approve => client.approve_gate(&run_id).map(|_| ()),
                ReviewDecision::Reject => client.reject_gate(&run_id).map(|_| ()),
                ReviewDecision::RequestChanges => {
                    client.request_changes(&run_id, &feedback).map(|_| ())
                }
            }
            .map_err(|err| err.to_string());
            let _ = tx.send(SessionEvent::DecisionSubmitted { result });
        });
        Ok(())
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.poll_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RunSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_poll_loop(
    client: &OrchestratorClient,
    run_id: &str,
    tx: &Sender<SessionEvent>,
    stop: &AtomicBool,
    interval: Duration,
) {
    loop {
        match poll_cycle(client, run_id) {
            Ok(snapshot) => {
                let waiting = is_waiting_for_review(&snapshot.run.status);
                if tx.send(SessionEvent::Snapshot(Box::new(snapshot))).is_err() {
                    return;
                }
                let gate_event = if waiting {
                    match client.current_gate(run_id) {
                        Ok(gate) => SessionEvent::Gate(gate),
                        Err(err) => SessionEvent::PollFailed(err.to_string()),
                    }
                } else {
                    SessionEvent::Gate(None)
                };
                if tx.send(gate_event).is_err() {
                    return;
                }
            }
            Err(message) => {
                if tx.send(SessionEvent::PollFailed(message)).is_err() {
                    return;
                }
            }
        }

        if !sleep_with_stop(stop, interval) {
            return;
        }
    }
}

// All three resources for one cycle, or nothing.
fn poll_cycle(client: &OrchestratorClient, run_id: &str) -> Result<RunSnapshot, String> {
    let run = client.get_run(run_id).map_err(|err| err.to_string())?;
    let artifacts = client.list_artifacts(run_id).map_err(|err| err.to_string())?;
    let logs = client.list_logs(run_id).map_err(|err| err.to_string())?;
    Ok(RunSnapshot {
        run,
        artifacts,
        logs,
    })
}

pub fn sleep_with_stop(stop: &AtomicBool, total: Duration) -> bool {
    let mut remaining = total;
    while remaining > Duration::from_millis(0) {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(Duration::from_millis(200));
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    !stop.load(Ordering::Relaxed)
}
