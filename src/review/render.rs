use crate::api::Artifact;
use crate::review::fields;
use crate::review::section::{diagram_source, is_diagram_payload};
use serde_json::Value;
use std::collections::BTreeSet;

// Which specialized layout an artifact gets. Selection is a secondary test,
// independent of section classification, so e.g. a risk note filed under
// `other` still gets the inception-style layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Diagram,
    Inception,
    Story,
    TestCase,
    Generic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub label: &'static str,
    pub items: Vec<String>,
}

// Structured, display-ready view of one artifact's best-known content. The
// `extra` rows enumerate every content field the specialized layout did not
// already show, so nothing is duplicated and nothing is lost.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactView {
    pub mode: RenderMode,
    pub rows: Vec<FieldRow>,
    pub lists: Vec<ListRow>,
    pub references: Vec<String>,
    pub diagram_source: Option<String>,
    pub extra: Vec<(String, String)>,
}

pub fn select_mode(artifact: &Artifact, content: &Value) -> RenderMode {
    if is_diagram_payload(content) {
        return RenderMode::Diagram;
    }
    let kind = normalize(&artifact.artifact_type);
    let id = normalize(&artifact.id);
    if kind.contains("inception") || kind.contains("mvp") || kind.contains("risk") {
        return RenderMode::Inception;
    }
    if kind.contains("story") || id.starts_with("us") {
        return RenderMode::Story;
    }
    if kind.contains("test") || kind.contains("qa") || id.starts_with("tc") {
        return RenderMode::TestCase;
    }
    RenderMode::Generic
}

pub fn build_view(artifact: &Artifact, content: &Value) -> ArtifactView {
    let mode = select_mode(artifact, content);
    let mut shown: BTreeSet<String> = BTreeSet::new();
    let mut rows = Vec::new();
    let mut lists = Vec::new();
    let mut references = Vec::new();
    let mut source = None;

    let push_row = |label, aliases, shown: &mut BTreeSet<String>, rows: &mut Vec<FieldRow>| {
        if let Some((key, value)) = fields::resolve_entry(content, aliases) {
            if let Some(text) = fields::value_as_text(value) {
                shown.insert(key.to_string());
                rows.push(FieldRow { label, value: text });
            }
        }
    };
    let push_list = |label, aliases, shown: &mut BTreeSet<String>, lists: &mut Vec<ListRow>| {
        if let Some((key, _)) = fields::resolve_entry(content, aliases) {
            if let Some(items) = fields::resolve_list(content, aliases) {
                shown.insert(key.to_string());
                lists.push(ListRow { label, items });
            }
        }
    };

    match mode {
        RenderMode::Diagram => {
            if let Some(text) = diagram_source(content) {
                source = Some(text.to_string());
                for alias in fields::DIAGRAM_SOURCE {
                    let matches = content
                        .get(alias)
                        .and_then(Value::as_str)
                        .map(|raw| raw.trim() == text)
                        .unwrap_or(false);
                    if matches {
                        shown.insert((*alias).to_string());
                        break;
                    }
                }
            }
            push_row("Title", fields::TITLE, &mut shown, &mut rows);
            push_row("Description", fields::DESCRIPTION, &mut shown, &mut rows);
            for aliases in [fields::REFERENCED_REQS, fields::REFERENCED_STORIES] {
                if let Some((key, _)) = fields::resolve_entry(content, aliases) {
                    if let Some(items) = fields::resolve_list(content, aliases) {
                        shown.insert(key.to_string());
                        references.extend(items);
                    }
                }
            }
        }
        RenderMode::Inception => {
            push_row("Title", fields::TITLE, &mut shown, &mut rows);
            push_row("Description", fields::DESCRIPTION, &mut shown, &mut rows);
            push_row("Risk level", fields::RISK_LEVEL, &mut shown, &mut rows);
            push_row("Mitigation", fields::MITIGATION, &mut shown, &mut rows);
            push_row("Priority", fields::PRIORITY, &mut shown, &mut rows);
        }
        RenderMode::Story => {
            push_row("Title", fields::TITLE, &mut shown, &mut rows);
            push_row("Story", fields::STORY, &mut shown, &mut rows);
            push_row("Description", fields::DESCRIPTION, &mut shown, &mut rows);
            push_list(
                "Acceptance criteria",
                fields::ACCEPTANCE_CRITERIA,
                &mut shown,
                &mut lists,
            );
            push_row("Priority", fields::PRIORITY, &mut shown, &mut rows);
            push_list("References", fields::REFERENCED_REQS, &mut shown, &mut lists);
        }
        RenderMode::TestCase => {
            push_row("Title", fields::TITLE, &mut shown, &mut rows);
            push_row("Description", fields::DESCRIPTION, &mut shown, &mut rows);
            push_list("Steps", fields::STEPS, &mut shown, &mut lists);
            push_row("Expected result", fields::EXPECTED_RESULT, &mut shown, &mut rows);
            push_row("Priority", fields::PRIORITY, &mut shown, &mut rows);
            push_list("References", fields::REFERENCED_REQS, &mut shown, &mut lists);
            push_list("Stories", fields::REFERENCED_STORIES, &mut shown, &mut lists);
        }
        RenderMode::Generic => {
            push_row("Title", fields::TITLE, &mut shown, &mut rows);
            push_row("Description", fields::DESCRIPTION, &mut shown, &mut rows);
        }
    }

    ArtifactView {
        mode,
        rows,
        lists,
        references,
        diagram_source: source,
        extra: additional_fields(content, &shown),
    }
}

// Remainder view: every content field not covered by the specialized layout,
// with empty and null values suppressed rather than rendered as blanks.
fn additional_fields(content: &Value, shown: &BTreeSet<String>) -> Vec<(String, String)> {
    let Some(object) = content.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .filter(|(key, value)| !shown.contains(*key) && !fields::is_absent(value))
        .map(|(key, value)| (key.clone(), compact_value(value)))
        .collect()
}

fn compact_value(value: &Value) -> String {
    match fields::value_as_text(value) {
        Some(text) => text,
        None => serde_json::to_string(value).unwrap_or_else(|_| "<unserializable>".to_string()),
    }
}

// Verbatim serialized view of the full content, independent of which layout
// was chosen. Opening it is what triggers the full-content fetch.
pub fn raw_json(content: &Value) -> String {
    serde_json::to_string_pretty(content).unwrap_or_else(|_| "<unserializable>".to_string())
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
        .collect::<String>()
        .to_lowercase()
}
