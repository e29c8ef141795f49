use super::types::{Artifact, DecisionLogEntry, HitlGate, Run, RunStatus};
use super::ApiError;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Er,
    Sequence,
}

impl DiagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Er => "er",
            DiagramKind::Sequence => "sequence",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "er" => Ok(DiagramKind::Er),
            "sequence" => Ok(DiagramKind::Sequence),
            other => Err(format!("unknown diagram kind `{other}`, expected er|sequence")),
        }
    }
}

// Blocking HTTP client for the orchestrator API. Only ever called from
// worker threads; the UI event loop never blocks on it.
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    base_url: String,
}

impl OrchestratorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn get<T: for<'de> Deserialize<'de>>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        let response = ureq::get(&url).call().map_err(|err| request_error(&url, err))?;
        response.into_json::<T>().map_err(|err| ApiError::Decode {
            url,
            message: err.to_string(),
        })
    }

    fn post<T: for<'de> Deserialize<'de>>(
        &self,
        segments: &[&str],
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        let request = ureq::post(&url);
        let response = match body {
            Some(value) => request.send_json(value),
            None => request.call(),
        }
        .map_err(|err| request_error(&url, err))?;
        response.into_json::<T>().map_err(|err| ApiError::Decode {
            url,
            message: err.to_string(),
        })
    }

    pub fn create_run(&self, brief: &str) -> Result<Run, ApiError> {
        self.post(&["runs"], Some(json!({"brief": brief})))
    }

    pub fn list_runs(&self) -> Result<Vec<Run>, ApiError> {
        self.get(&["runs"])
    }

    pub fn get_run(&self, run_id: &str) -> Result<Run, ApiError> {
        self.get(&["runs", run_id])
    }

    pub fn get_run_status(&self, run_id: &str) -> Result<RunStatus, ApiError> {
        self.get(&["runs", run_id, "status"])
    }

    pub fn list_artifacts(&self, run_id: &str) -> Result<Vec<Artifact>, ApiError> {
        self.get(&["runs", run_id, "artifacts"])
    }

    pub fn get_artifact(&self, run_id: &str, artifact_id: &str) -> Result<Artifact, ApiError> {
        self.get(&["runs", run_id, "artifacts", artifact_id])
    }

    pub fn current_gate(&self, run_id: &str) -> Result<Option<HitlGate>, ApiError> {
        self.get(&["runs", run_id, "hitl", "current"])
    }

    pub fn approve_gate(&self, run_id: &str) -> Result<serde_json::Value, ApiError> {
        self.post(&["runs", run_id, "hitl", "approve"], None)
    }

    pub fn reject_gate(&self, run_id: &str) -> Result<serde_json::Value, ApiError> {
        self.post(&["runs", run_id, "hitl", "reject"], None)
    }

    pub fn request_changes(
        &self,
        run_id: &str,
        feedback: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.post(
            &["runs", run_id, "hitl", "request-changes"],
            Some(json!({"feedback": feedback})),
        )
    }

    pub fn list_logs(&self, run_id: &str) -> Result<Vec<DecisionLogEntry>, ApiError> {
        self.get(&["runs", run_id, "logs"])
    }

    pub fn get_diagram(&self, run_id: &str, kind: DiagramKind) -> Result<Artifact, ApiError> {
        self.get(&["runs", run_id, "diagrams", kind.as_str()])
    }
}

fn request_error(url: &str, err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(code, _) => ApiError::Status {
            url: url.to_string(),
            code,
        },
        transport => ApiError::Request {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}
