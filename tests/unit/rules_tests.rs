use super::*;

fn rule(title: &str, content: &str, active: bool, created_at: i64) -> ContextRule {
    ContextRule::new(title.to_string(), content.to_string(), active, created_at)
}

#[test]
fn default_rules_seed_three_cards_first_active() {
    let defaults = default_rules();
    assert_eq!(defaults.len(), 3);
    assert!(defaults[0].is_active);
    assert!(!defaults[1].is_active);
    assert!(!defaults[2].is_active);
    assert!(defaults[0].created_at < defaults[1].created_at);
    assert!(defaults[1].created_at < defaults[2].created_at);
}

#[test]
fn context_block_includes_only_active_rules_in_order() {
    let rules = vec![
        rule("A", "内容甲", true, 1),
        rule("B", "内容乙", false, 2),
        rule("C", "内容丙", true, 3),
    ];
    let block = render_context_block(&rules);
    assert!(block.contains("--- ACTIVE GLOBAL CONTEXT RULES ---"));
    assert!(block.contains("1. [A]: 内容甲"));
    assert!(block.contains("2. [C]: 内容丙"));
    assert!(!block.contains("内容乙"));
    let a_pos = block.find("[A]").expect("A present");
    let c_pos = block.find("[C]").expect("C present");
    assert!(a_pos < c_pos);
}

#[test]
fn context_block_is_empty_without_active_rules() {
    let rules = vec![rule("A", "x", false, 1)];
    assert_eq!(render_context_block(&rules), "");
    assert_eq!(render_context_block(&[]), "");
}

#[test]
fn import_accepts_minimal_entries_as_inactive_fresh_rules() {
    let imported = parse_import(r#"[{"title":"X","content":"Y"}]"#).expect("valid import");
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].title, "X");
    assert_eq!(imported[0].content, "Y");
    assert!(!imported[0].is_active);
    assert!(!imported[0].id.is_empty());
}

#[test]
fn import_skips_entries_missing_title_or_content() {
    let text = r#"[
        {"title":"ok","content":"body"},
        {"title":"no content"},
        {"content":"no title"},
        {"title":"also ok","content":"b","isActive":true}
    ]"#;
    let imported = parse_import(text).expect("valid import");
    assert_eq!(imported.len(), 2);
    assert_eq!(imported[0].title, "ok");
    assert!(imported[1].is_active);
    assert!(imported[0].created_at < imported[1].created_at);
}

#[test]
fn import_rejects_non_json_and_non_array() {
    assert!(matches!(
        parse_import("{not json"),
        Err(ImportFormatError::NotJson(_))
    ));
    assert!(matches!(
        parse_import(r#"{"title":"X"}"#),
        Err(ImportFormatError::NotAnArray)
    ));
}

#[test]
fn export_round_trips_through_import() {
    let rules = vec![rule("边界值", "最小值-1", true, 1)];
    let exported = render_export(&rules);
    assert!(exported.contains("\"isActive\""));
    assert!(!exported.contains("\"id\""));
    assert!(!exported.contains("createdAt"));

    let reimported = parse_import(&exported).expect("export should reimport");
    assert_eq!(reimported.len(), 1);
    assert_eq!(reimported[0].title, "边界值");
    assert!(reimported[0].is_active);
    assert_ne!(reimported[0].id, rules[0].id);
}

#[test]
fn export_file_name_embeds_iso_date() {
    let name = export_file_name();
    assert!(name.starts_with("caseforge_prompts_"));
    assert!(name.ends_with(".json"));
    let date = &name["caseforge_prompts_".len()..name.len() - ".json".len()];
    assert_eq!(date.len(), 10);
    assert_eq!(date.as_bytes()[4], b'-');
    assert_eq!(date.as_bytes()[7], b'-');
}

#[test]
fn serde_uses_camel_case_wire_names() {
    let card = rule("T", "C", true, 42);
    let json = serde_json::to_string(&card).expect("serializes");
    assert!(json.contains("\"isActive\":true"));
    assert!(json.contains("\"createdAt\":42"));

    let parsed: ContextRule = serde_json::from_str(&json).expect("parses back");
    assert_eq!(parsed, card);
}
