use crate::api::Artifact;
use crate::review::cache::ContentCache;
use crate::review::natural_id::compare_ids;
use crate::review::section::{classify, SectionKey, CANONICAL_ORDER};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to create export directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write export file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// Classified, sorted view over one run's artifact set. Sections appear in
// canonical order; empty sections are omitted.
pub fn group_sections(artifacts: &[Artifact]) -> Vec<(SectionKey, Vec<Artifact>)> {
    let mut buckets: BTreeMap<SectionKey, Vec<Artifact>> = BTreeMap::new();
    for artifact in artifacts {
        let key = classify(&artifact.artifact_type, &artifact.id, &artifact.content);
        buckets.entry(key).or_default().push(artifact.clone());
    }
    for entries in buckets.values_mut() {
        entries.sort_by(|a, b| compare_ids(&a.id, &b.id));
    }
    CANONICAL_ORDER
        .iter()
        .filter_map(|key| buckets.remove(key).map(|entries| (*key, entries)))
        .collect()
}

// One-line section summary: artifact count plus a per-agent breakdown sorted
// by descending count, ties broken by first occurrence in the section.
pub fn summarize(entries: &[Artifact]) -> String {
    let mut order: Vec<String> = Vec::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for artifact in entries {
        if !counts.contains_key(&artifact.agent) {
            order.push(artifact.agent.clone());
        }
        *counts.entry(artifact.agent.clone()).or_insert(0) += 1;
    }

    let mut by_agent: Vec<(String, usize)> = order
        .iter()
        .map(|agent| (agent.clone(), counts[agent]))
        .collect();
    let first_seen = |agent: &str| order.iter().position(|a| a == agent).unwrap_or(usize::MAX);
    by_agent.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| first_seen(&a.0).cmp(&first_seen(&b.0))));

    let noun = if entries.len() == 1 { "artifact" } else { "artifacts" };
    if by_agent.is_empty() {
        return format!("{} {noun}", entries.len());
    }
    let breakdown = by_agent
        .iter()
        .map(|(agent, count)| format!("{agent} ({count})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {noun} from {breakdown}", entries.len())
}

// Export reflects whatever has already been inspected: cached full content
// when present, the listed summary otherwise. Never forces a fetch.
pub fn export_bundle(entries: &[Artifact], cache: &ContentCache) -> Value {
    let items = entries
        .iter()
        .map(|artifact| {
            json!({
                "id": artifact.id,
                "agent": artifact.agent,
                "type": artifact.artifact_type,
                "created_at": artifact.created_at,
                "content": cache.best_content(artifact).clone(),
            })
        })
        .collect::<Vec<_>>();
    Value::Array(items)
}

pub fn write_section_export(
    dir: &Path,
    key: SectionKey,
    entries: &[Artifact],
    cache: &ContentCache,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
        path: dir.display().to_string(),
        source,
    })?;
    let path = dir.join(key.export_filename());
    let bundle = export_bundle(entries, cache);
    let serialized = serde_json::to_string_pretty(&bundle).unwrap_or_else(|_| "[]".to_string());
    fs::write(&path, serialized).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(id: &str, kind: &str, agent: &str, content: Value) -> Artifact {
        Artifact {
            id: id.to_string(),
            run_id: "run-1".to_string(),
            agent: agent.to_string(),
            artifact_type: kind.to_string(),
            content,
            parent_ids: vec![],
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn grouping_buckets_sorts_and_omits_empty_sections() {
        let artifacts = vec![
            artifact("REQ-10", "requirement", "ba", json!({})),
            artifact("US-1", "user_story", "analyst", json!({})),
            artifact("REQ-2", "requirement", "ba", json!({})),
        ];
        let grouped = group_sections(&artifacts);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, SectionKey::Requirements);
        let req_ids: Vec<&str> = grouped[0].1.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(req_ids, vec!["REQ-2", "REQ-10"]);
        assert_eq!(grouped[1].0, SectionKey::Stories);
    }

    #[test]
    fn summary_breaks_down_by_agent_descending_with_stable_ties() {
        let entries = vec![
            artifact("TC-1", "test_case", "qa", json!({})),
            artifact("TC-2", "test_case", "ba", json!({})),
            artifact("TC-3", "test_case", "ba", json!({})),
            artifact("TC-4", "test_case", "design", json!({})),
        ];
        assert_eq!(summarize(&entries), "4 artifacts from ba (2), qa (1), design (1)");
        assert_eq!(summarize(&entries[..1]), "1 artifact from qa (1)");
    }

    #[test]
    fn export_prefers_cached_full_content() {
        let entries = vec![
            artifact("REQ-1", "requirement", "ba", json!({"title": "Login"})),
            artifact("REQ-2", "requirement", "ba", json!({"title": "Logout"})),
        ];
        let mut cache = ContentCache::new("run-1");
        cache.begin_fetch("REQ-1");
        cache.complete_success(artifact(
            "REQ-1",
            "requirement",
            "ba",
            json!({"title": "Login", "description": "full"}),
        ));

        let bundle = export_bundle(&entries, &cache);
        let items = bundle.as_array().expect("array bundle");
        assert_eq!(items[0]["content"]["description"], json!("full"));
        assert_eq!(items[1]["content"], json!({"title": "Logout"}));
    }
}
