use crate::review::fields;
use serde_json::Value;

// Display buckets for classified artifacts, in canonical presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKey {
    Requirements,
    Product,
    Stories,
    Qa,
    Design,
    Other,
}

pub const CANONICAL_ORDER: [SectionKey; 6] = [
    SectionKey::Requirements,
    SectionKey::Product,
    SectionKey::Stories,
    SectionKey::Qa,
    SectionKey::Design,
    SectionKey::Other,
];

impl SectionKey {
    pub fn label(&self) -> &'static str {
        match self {
            SectionKey::Requirements => "Requirements",
            SectionKey::Product => "Product & Inception",
            SectionKey::Stories => "User Stories",
            SectionKey::Qa => "QA & Test Cases",
            SectionKey::Design => "Design & Diagrams",
            SectionKey::Other => "Other",
        }
    }

    pub fn export_filename(&self) -> &'static str {
        match self {
            SectionKey::Requirements => "01_ba_requirements.json",
            SectionKey::Product => "02_product_inception.json",
            SectionKey::Stories => "03_user_stories.json",
            SectionKey::Qa => "04_qa_test_cases.json",
            SectionKey::Design => "05_design_diagrams.json",
            SectionKey::Other => "99_other.json",
        }
    }
}

struct RuleInput<'a> {
    kind: String,
    id: String,
    content: &'a Value,
}

struct Rule {
    target: SectionKey,
    applies: fn(&RuleInput<'_>) -> bool,
}

// Order matters: an artifact whose id is prefixed `REQ` but typed
// `clarification` must land with the requirements, and a mis-typed diagram
// payload must still reach the design bucket. First match wins.
const RULES: &[Rule] = &[
    Rule {
        target: SectionKey::Requirements,
        applies: |input| input.kind.contains("requirement") || input.id.starts_with("req"),
    },
    Rule {
        target: SectionKey::Requirements,
        applies: |input| input.kind.contains("clarif"),
    },
    Rule {
        target: SectionKey::Product,
        applies: |input| {
            input.kind.contains("inception")
                || input.kind.contains("mvp")
                || input.kind.contains("risk")
                || input.kind.contains("riesgo")
                || input.id.starts_with("mvp")
                || input.id.starts_with("risk")
                || input.id.starts_with("inc")
        },
    },
    Rule {
        target: SectionKey::Stories,
        applies: |input| {
            input.kind.contains("userstory")
                || input.kind.contains("story")
                || input.id.starts_with("us")
        },
    },
    Rule {
        target: SectionKey::Stories,
        applies: |input| {
            input.kind.contains("acceptance")
                || input.kind.contains("criteria")
                || input.kind.contains("criterio")
        },
    },
    Rule {
        target: SectionKey::Qa,
        applies: |input| {
            input.kind.contains("testcase")
                || input.kind.contains("test")
                || input.kind.contains("qa")
                || input.id.starts_with("tc")
        },
    },
    Rule {
        target: SectionKey::Design,
        applies: |input| {
            input.kind.contains("diagram")
                || input.kind.contains("design")
                || is_diagram_payload(input.content)
                || input.id.starts_with("diag")
        },
    },
];

// Total and deterministic: every artifact lands in exactly one section, with
// `Other` as the exhaustive fallback.
pub fn classify(artifact_type: &str, artifact_id: &str, content: &Value) -> SectionKey {
    let input = RuleInput {
        kind: normalize(artifact_type),
        id: normalize(artifact_id),
        content,
    };
    for rule in RULES {
        if (rule.applies)(&input) {
            return rule.target;
        }
    }
    SectionKey::Other
}

// Structural test, not a type tag: any object carrying a non-empty string
// under a diagram-source alias is a diagram payload, even when mis-typed
// upstream. Shared with the render dispatcher.
pub fn is_diagram_payload(content: &Value) -> bool {
    diagram_source(content).is_some()
}

pub fn diagram_source(content: &Value) -> Option<&str> {
    let object = content.as_object()?;
    fields::DIAGRAM_SOURCE.iter().find_map(|alias| {
        object
            .get(*alias)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
    })
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_and_id_heuristics_reach_every_section() {
        let empty = json!({});
        assert_eq!(classify("requirement", "REQ-1", &empty), SectionKey::Requirements);
        assert_eq!(classify("inception_report", "X-1", &empty), SectionKey::Product);
        assert_eq!(classify("user_story", "US-3", &empty), SectionKey::Stories);
        assert_eq!(classify("test_case", "TC-9", &empty), SectionKey::Qa);
        assert_eq!(classify("er_diagram", "D-1", &empty), SectionKey::Design);
        assert_eq!(classify("mystery", "X-1", &empty), SectionKey::Other);
    }

    #[test]
    fn clarification_with_req_prefixed_id_stays_with_requirements() {
        assert_eq!(
            classify("clarification", "REQ-9", &json!({})),
            SectionKey::Requirements
        );
    }

    #[test]
    fn mistyped_diagram_payload_is_classified_structurally() {
        let content = json!({"mermaid_code": "graph TD;A-->B;"});
        assert_eq!(classify("notes", "X-7", &content), SectionKey::Design);
    }

    #[test]
    fn normalization_ignores_case_separators_and_whitespace() {
        assert_eq!(classify("User Story", "us-2", &json!({})), SectionKey::Stories);
        assert_eq!(classify("TEST-CASE", "tc1", &json!({})), SectionKey::Qa);
    }

    #[test]
    fn classification_is_idempotent() {
        let content = json!({"riesgo": "alto"});
        let first = classify("risk_matrix", "RISK-1", &content);
        let second = classify("risk_matrix", "RISK-1", &content);
        assert_eq!(first, second);
        assert_eq!(first, SectionKey::Product);
    }
}
