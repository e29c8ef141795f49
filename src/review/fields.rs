use serde_json::Value;

// Upstream agents do not agree on field naming: the same semantic field may
// arrive in snake_case, camelCase, or Spanish. Each semantic field gets one
// ordered alias list; the first present, non-empty, non-null value wins.

pub const TITLE: &[&str] = &["title", "titulo", "name", "nombre", "summary"];
pub const DESCRIPTION: &[&str] = &[
    "description",
    "descripcion",
    "detail",
    "details",
    "text",
    "body",
];
pub const ACCEPTANCE_CRITERIA: &[&str] = &[
    "acceptance_criteria",
    "acceptanceCriteria",
    "criteria",
    "criterios_aceptacion",
    "criterios",
];
pub const PRIORITY: &[&str] = &["priority", "prioridad", "severity"];
pub const RISK_LEVEL: &[&str] = &[
    "risk_level",
    "riskLevel",
    "risk",
    "riesgo",
    "nivel_riesgo",
];
pub const MITIGATION: &[&str] = &["mitigation", "mitigacion", "mitigation_plan"];
pub const STORY: &[&str] = &["story", "user_story", "userStory", "historia"];
pub const STEPS: &[&str] = &["steps", "pasos", "test_steps", "testSteps"];
pub const EXPECTED_RESULT: &[&str] = &[
    "expected_result",
    "expectedResult",
    "expected",
    "resultado_esperado",
];
pub const REFERENCED_REQS: &[&str] = &[
    "referenced_reqs",
    "referencedReqs",
    "req_ids",
    "requirements",
    "related_requirements",
];
pub const REFERENCED_STORIES: &[&str] = &[
    "referenced_stories",
    "referencedStories",
    "story_ids",
    "stories",
];
pub const DIAGRAM_SOURCE: &[&str] = &[
    "mermaid_code",
    "mermaidCode",
    "diagram_source",
    "diagramSource",
    "mermaid",
];

// First alias whose value is present and usable. Empty strings and nulls are
// equivalent to absence.
pub fn resolve_entry<'a>(content: &'a Value, aliases: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    let object = content.as_object()?;
    for alias in aliases {
        if let Some(value) = object.get(*alias) {
            if !is_absent(value) {
                return Some((*alias, value));
            }
        }
    }
    None
}

pub fn resolve<'a>(content: &'a Value, aliases: &[&'static str]) -> Option<&'a Value> {
    resolve_entry(content, aliases).map(|(_, value)| value)
}

pub fn resolve_text(content: &Value, aliases: &[&'static str]) -> Option<String> {
    resolve(content, aliases).and_then(value_as_text)
}

// List-valued fields (steps, criteria, referenced ids). A bare string is
// treated as a one-element list.
pub fn resolve_list(content: &Value, aliases: &[&'static str]) -> Option<Vec<String>> {
    let value = resolve(content, aliases)?;
    let items = match value {
        Value::Array(items) => items.iter().filter_map(value_as_text).collect::<Vec<_>>(),
        other => value_as_text(other).map(|text| vec![text]).unwrap_or_default(),
    };
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
