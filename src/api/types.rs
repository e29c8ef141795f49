use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub brief: String,
    pub status: String,
    pub current_stage: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: String,
    pub status: String,
    pub current_stage: String,
}

// Artifact content carries no schema: agents emit whatever shape their stage
// produces, so it stays a generic JSON value and every field access goes
// through the synonym resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub run_id: String,
    pub agent: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub parent_ids: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitlGate {
    pub id: i64,
    pub run_id: String,
    pub stage: String,
    pub status: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub id: i64,
    pub run_id: String,
    pub agent: String,
    pub action: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub timestamp: String,
}
