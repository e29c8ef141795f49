use serde_json::json;
use specboard::review::section::{classify, diagram_source, is_diagram_payload, SectionKey, CANONICAL_ORDER};

#[test]
fn classification_is_total_and_deterministic() {
    let samples = [
        ("requirement", "REQ-1", json!({})),
        ("clarification", "Q-1", json!({})),
        ("inception_report", "INC-1", json!({})),
        ("user_story", "US-1", json!({})),
        ("acceptance_criteria", "AC-1", json!({})),
        ("test_case", "TC-1", json!({})),
        ("sequence_diagram", "DIAG-1", json!({})),
        ("", "", json!(null)),
        ("weird type", "???", json!([1, 2, 3])),
    ];
    for (kind, id, content) in &samples {
        let first = classify(kind, id, content);
        let second = classify(kind, id, content);
        assert_eq!(first, second, "unstable classification for {kind}/{id}");
        assert!(CANONICAL_ORDER.contains(&first));
    }
}

#[test]
fn rule_order_beats_later_heuristics_for_ambiguous_artifacts() {
    // A clarification with a requirements-prefixed id stays with the
    // requirements even though no clarification rule mentions design.
    assert_eq!(
        classify("clarification", "REQ-9", &json!({})),
        SectionKey::Requirements
    );
    // The id prefix alone is enough.
    assert_eq!(classify("note", "req-12", &json!({})), SectionKey::Requirements);
    // A test-typed artifact with a story id: story rule fires first.
    assert_eq!(classify("user_story", "TC-1", &json!({})), SectionKey::Stories);
}

#[test]
fn spanish_aliases_reach_their_sections() {
    assert_eq!(classify("matriz_riesgo", "R-1", &json!({})), SectionKey::Product);
    assert_eq!(classify("criterio_de_aceptacion", "A-1", &json!({})), SectionKey::Stories);
}

#[test]
fn diagram_payload_is_structural_not_a_type_tag() {
    let content = json!({"mermaid_code": "graph TD;A-->B;", "description": "flow"});
    assert!(is_diagram_payload(&content));
    assert_eq!(diagram_source(&content), Some("graph TD;A-->B;"));
    assert_eq!(classify("misc_notes", "X-1", &content), SectionKey::Design);

    assert!(!is_diagram_payload(&json!({"mermaid_code": "   "})));
    assert!(!is_diagram_payload(&json!({"mermaid_code": 42})));
    assert!(!is_diagram_payload(&json!("graph TD;A-->B;")));
}

#[test]
fn unmatched_artifacts_fall_back_to_other() {
    assert_eq!(classify("meeting_minutes", "MM-1", &json!({})), SectionKey::Other);
}
