use crate::api::Artifact;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

// Session-scoped store of full artifact records, keyed by artifact id and
// bound to one run. List fetches only carry summaries; the full record is
// fetched on first detail view and is authoritative from then on (artifact
// content is immutable once the orchestrator has produced it).
//
// The cache itself is synchronous; the owning event loop starts a fetch only
// when `begin_fetch` says so and feeds the outcome back through
// `complete_success` / `complete_failure`. The in-flight set is what
// collapses concurrent requests for the same id into a single fetch.
#[derive(Debug)]
pub struct ContentCache {
    run_id: String,
    full: BTreeMap<String, Artifact>,
    in_flight: BTreeSet<String>,
}

impl ContentCache {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            full: BTreeMap::new(),
            in_flight: BTreeSet::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    // True when the caller must start a fetch for this id. False when the
    // full record is already cached or a fetch is already outstanding.
    pub fn begin_fetch(&mut self, artifact_id: &str) -> bool {
        if self.full.contains_key(artifact_id) || self.in_flight.contains(artifact_id) {
            return false;
        }
        self.in_flight.insert(artifact_id.to_string());
        true
    }

    pub fn complete_success(&mut self, artifact: Artifact) {
        self.in_flight.remove(&artifact.id);
        // A record from another run never enters this cache.
        if artifact.run_id != self.run_id {
            return;
        }
        self.full.entry(artifact.id.clone()).or_insert(artifact);
    }

    // Failures leave the cache unchanged; the id becomes fetchable again so
    // the caller can retry.
    pub fn complete_failure(&mut self, artifact_id: &str) {
        self.in_flight.remove(artifact_id);
    }

    pub fn full(&self, artifact_id: &str) -> Option<&Artifact> {
        self.full.get(artifact_id)
    }

    pub fn has_full(&self, artifact_id: &str) -> bool {
        self.full.contains_key(artifact_id)
    }

    pub fn is_in_flight(&self, artifact_id: &str) -> bool {
        self.in_flight.contains(artifact_id)
    }

    // Best-known content for display and export: the cached full record when
    // present, otherwise the summary as listed.
    pub fn best_content<'a>(&'a self, summary: &'a Artifact) -> &'a Value {
        match self.full.get(&summary.id) {
            Some(full) => &full.content,
            None => &summary.content,
        }
    }

    pub fn len(&self) -> usize {
        self.full.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}
