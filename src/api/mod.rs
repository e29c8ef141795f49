pub mod client;
pub mod types;

pub use client::{DiagramKind, OrchestratorClient};
pub use types::{Artifact, DecisionLogEntry, HitlGate, Run, RunStatus};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("orchestrator returned status {code} for {url}")]
    Status { url: String, code: u16 },
    #[error("invalid response body from {url}: {message}")]
    Decode { url: String, message: String },
}
