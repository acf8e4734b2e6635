use super::*;

use crate::conversation::Role;
use crate::recovery::parse_test_cases;

fn type_str(app: &mut App, text: &str) {
    for c in text.chars() {
        let _ = app.handle_event(AppEvent::InputChar(c));
    }
}

fn submit_discussion(app: &mut App, text: &str) -> AppAction {
    type_str(app, text);
    app.handle_event(AppEvent::Submit)
        .expect("submit should start a discussion call")
}

fn sample_cases() -> (Vec<TestCase>, RecoveryOutcome) {
    parse_test_cases(
        r#"[
            {"module":"登录","testContent":"密码","priority":"P0"},
            {"module":"登录","testContent":"密码","priority":"P1"}
        ]"#,
    )
    .expect("sample payload is valid")
}

#[test]
fn default_state_shows_greeting_and_empty_table() {
    let app = App::default();
    assert!(app.running);
    assert_eq!(app.active_pane, Pane::Chat);
    assert_eq!(*app.modal(), Modal::None);
    assert_eq!(app.conversation().len(), 1);
    assert_eq!(app.conversation().turns()[0].role, Role::Assistant);
    assert!(app.test_cases().is_empty());
    assert!(!app.is_busy());
    assert!(app.toast_text().is_none());
}

#[test]
fn tab_toggles_between_chat_and_table() {
    let mut app = App::default();
    app.handle_event(AppEvent::NextPane);
    assert_eq!(app.active_pane, Pane::Table);
    app.handle_event(AppEvent::NextPane);
    assert_eq!(app.active_pane, Pane::Chat);
    app.handle_event(AppEvent::PrevPane);
    assert_eq!(app.active_pane, Pane::Table);
}

#[test]
fn typing_and_cursor_edit_chat_input() {
    let mut app = App::default();
    type_str(&mut app, "ac");
    app.handle_event(AppEvent::CursorLeft);
    app.handle_event(AppEvent::InputChar('b'));
    assert_eq!(app.chat_input(), "abc");
    app.handle_event(AppEvent::Backspace);
    assert_eq!(app.chat_input(), "ac");
    app.handle_event(AppEvent::CursorRight);
    app.handle_event(AppEvent::NewLine);
    assert_eq!(app.chat_input(), "ac\n");
}

#[test]
fn submit_builds_discussion_prompt_with_user_text() {
    let mut app = App::default();
    let action = submit_discussion(&mut app, "测试登录功能");
    let AppAction::StartDiscussion { prompt } = action else {
        panic!("expected discussion action");
    };
    assert!(prompt.contains("PHASE 1: REQUIREMENT CLARIFICATION ONLY"));
    assert!(prompt.contains("User Input: 测试登录功能"));
    // The message travels as the current input only; the history snapshot
    // stops at the greeting.
    let history_block = prompt.split("User Input:").next().expect("history block");
    assert!(!history_block.contains("User: 测试登录功能"));
    assert!(history_block.contains("AI: "));
    assert!(app.is_discussion_pending());
    assert!(app.chat_input().is_empty());
    assert_eq!(
        app.conversation().turns().last().expect("turn").role,
        Role::User
    );
}

#[test]
fn discussion_history_carries_only_settled_turns() {
    let mut app = App::default();
    submit_discussion(&mut app, "先测登录");
    app.on_discussion_result(Ok("好的".to_string()));

    let AppAction::StartDiscussion { prompt } = submit_discussion(&mut app, "再测注册") else {
        panic!("expected discussion action");
    };
    let history_block = prompt.split("User Input:").next().expect("history block");
    // The earlier exchange is settled history; the new message is not.
    assert!(history_block.contains("User: 先测登录"));
    assert!(history_block.contains("AI: 好的"));
    assert!(!history_block.contains("再测注册"));
    assert!(prompt.contains("User Input: 再测注册"));
}

#[test]
fn submit_includes_active_rules_block() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    let AppAction::StartDiscussion { prompt } = submit_discussion(&mut app, "hi") else {
        panic!("expected discussion action");
    };
    assert!(prompt.contains("--- ACTIVE GLOBAL CONTEXT RULES ---"));
    assert!(prompt.contains("Excel 格式化与合并规范"));
    // Inactive cards stay out of the prompt.
    assert!(!prompt.contains("通用边界值规则"));
}

#[test]
fn whitespace_only_submit_is_ignored() {
    let mut app = App::default();
    type_str(&mut app, "   ");
    assert_eq!(app.handle_event(AppEvent::Submit), None);
    assert!(!app.is_busy());
}

#[test]
fn submit_is_refused_while_a_call_is_in_flight() {
    let mut app = App::default();
    submit_discussion(&mut app, "first");
    type_str(&mut app, "second");
    assert_eq!(app.handle_event(AppEvent::Submit), None);
    assert_eq!(app.toast_text(), Some("正在等待模型响应..."));
    // The typed text is kept for retry.
    assert_eq!(app.chat_input(), "second");
}

#[test]
fn discussion_reply_and_error_append_assistant_turns() {
    let mut app = App::default();
    submit_discussion(&mut app, "需求");
    app.on_discussion_result(Ok("好的，已确认功能列表".to_string()));
    assert!(!app.is_busy());
    let last = app.conversation().turns().last().expect("turn");
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, "好的，已确认功能列表");

    submit_discussion(&mut app, "继续");
    app.on_discussion_result(Err(ModelError::Transport("timed out".to_string())));
    let last = app.conversation().turns().last().expect("turn");
    assert!(last.content.starts_with("连接错误: "));
    assert!(last.content.contains("timed out"));
}

#[test]
fn generation_requires_a_discussion_first() {
    let mut app = App::default();
    assert_eq!(app.handle_event(AppEvent::Generate), None);
    assert_eq!(app.toast_text(), Some("请先与 AI 讨论需求"));
    assert!(!app.is_generation_pending());
}

#[test]
fn generation_prompt_carries_history_and_rules() {
    let mut app = App::default();
    submit_discussion(&mut app, "登录模块");
    app.on_discussion_result(Ok("好的".to_string()));
    let action = app
        .handle_event(AppEvent::Generate)
        .expect("generation starts");
    let AppAction::StartGeneration { prompt } = action else {
        panic!("expected generation action");
    };
    assert!(prompt.contains("PHASE 2: DEEP THINKING & GENERATION"));
    assert!(prompt.contains("User: 登录模块"));
    assert!(app.is_generation_pending());
    // Focus moves to the table pane to show the incoming cases.
    assert_eq!(app.active_pane, Pane::Table);
}

#[test]
fn successful_generation_replaces_table_and_spans() {
    let mut app = App::default();
    submit_discussion(&mut app, "x");
    app.on_discussion_result(Ok("ok".to_string()));
    app.handle_event(AppEvent::Generate);

    app.on_generation_result(Ok(sample_cases()));
    assert!(!app.is_generation_pending());
    assert_eq!(app.test_cases().len(), 2);
    assert_eq!(app.row_spans().modules, vec![2, 0]);
    assert_eq!(app.toast_text(), Some("已生成 2 条用例"));
}

#[test]
fn repaired_generation_words_the_toast_differently() {
    let mut app = App::default();
    let (cases, _) = sample_cases();
    app.on_generation_result(Ok((cases, RecoveryOutcome::Repaired)));
    assert_eq!(app.toast_text(), Some("已修复格式并生成 2 条用例"));
}

#[test]
fn failed_generation_keeps_previous_table() {
    let mut app = App::default();
    app.on_generation_result(Ok(sample_cases()));
    assert_eq!(app.test_cases().len(), 2);

    app.on_generation_result(Err("invalid JSON".to_string()));
    assert_eq!(app.test_cases().len(), 2);
    assert_eq!(app.row_spans().modules, vec![2, 0]);
    assert!(app.toast_text().expect("toast").starts_with("生成失败"));
}

#[test]
fn copy_requires_a_non_empty_table() {
    let mut app = App::default();
    assert_eq!(app.handle_event(AppEvent::CopyTable), None);
    assert_eq!(app.toast_text(), Some("没有可复制的用例"));

    app.on_generation_result(Ok(sample_cases()));
    assert_eq!(
        app.handle_event(AppEvent::CopyTable),
        Some(AppAction::CopyTable)
    );
}

#[test]
fn reset_is_confirmed_before_clearing() {
    let mut app = App::default();
    submit_discussion(&mut app, "需求");
    app.on_discussion_result(Ok("ok".to_string()));
    app.on_generation_result(Ok(sample_cases()));

    app.handle_event(AppEvent::Reset);
    assert!(matches!(
        app.modal(),
        Modal::Confirm(PendingConfirm::ResetSession)
    ));

    // Escape cancels; nothing is lost.
    app.handle_event(AppEvent::Escape);
    assert_eq!(*app.modal(), Modal::None);
    assert_eq!(app.test_cases().len(), 2);
    assert_eq!(app.conversation().len(), 3);

    app.handle_event(AppEvent::Generate);
    assert_eq!(app.active_pane, Pane::Table);
    app.on_generation_result(Ok(sample_cases()));

    app.handle_event(AppEvent::Reset);
    app.handle_event(AppEvent::Submit);
    assert_eq!(*app.modal(), Modal::None);
    assert!(app.test_cases().is_empty());
    assert_eq!(app.conversation().len(), 1);
    assert_eq!(app.conversation().turns()[0].content, RESET_GREETING);
    assert_eq!(app.active_pane, Pane::Chat);
    assert_eq!(app.toast_text(), Some("会话已重置"));
}

#[test]
fn settings_modal_edits_and_saves_config() {
    let mut app = App::default();
    app.handle_event(AppEvent::OpenSettings);
    assert!(matches!(app.modal(), Modal::Settings(_)));

    // Provider field is first; cycle once to OpenAI.
    app.handle_event(AppEvent::CursorRight);
    app.handle_event(AppEvent::MoveDown);
    type_str(&mut app, "sk-123");
    let action = app.handle_event(AppEvent::Submit).expect("save settings");
    let AppAction::SaveSettings(config) = action else {
        panic!("expected save action");
    };
    assert_eq!(config.provider, Provider::OpenAi);
    assert_eq!(config.api_key, "sk-123");
    assert_eq!(app.api_config(), &config);
    assert_eq!(*app.modal(), Modal::None);
    assert_eq!(app.toast_text(), Some("设置已保存"));
}

#[test]
fn settings_escape_discards_edits() {
    let mut app = App::default();
    app.handle_event(AppEvent::OpenSettings);
    app.handle_event(AppEvent::MoveDown);
    type_str(&mut app, "discarded");
    assert_eq!(app.handle_event(AppEvent::Escape), None);
    assert_eq!(*app.modal(), Modal::None);
    assert!(app.api_config().api_key.is_empty());
}

#[test]
fn library_toggle_flips_active_state_and_persists() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    assert_eq!(app.active_rule_count(), 1);

    app.handle_event(AppEvent::OpenLibrary);
    let action = app.handle_event(AppEvent::InputChar(' ')).expect("toggle");
    let AppAction::UpsertRule(rule) = action else {
        panic!("expected upsert");
    };
    assert!(!rule.is_active);
    assert_eq!(app.active_rule_count(), 0);
}

#[test]
fn library_creates_a_new_active_card() {
    let mut app = App::default();
    app.handle_event(AppEvent::OpenLibrary);
    app.handle_event(AppEvent::InputChar('n'));
    type_str(&mut app, "新规则");
    app.handle_event(AppEvent::MoveDown);
    type_str(&mut app, "规则内容");
    let action = app.handle_event(AppEvent::Submit).expect("save card");
    let AppAction::UpsertRule(rule) = action else {
        panic!("expected upsert");
    };
    assert_eq!(rule.title, "新规则");
    assert_eq!(rule.content, "规则内容");
    // Freshly created cards join the prompt context immediately.
    assert!(rule.is_active);
    assert_eq!(app.rules().len(), 1);
    assert_eq!(app.active_rule_count(), 1);
    assert!(matches!(
        app.modal(),
        Modal::Library(LibraryState {
            mode: LibraryMode::Browse,
            ..
        })
    ));
}

#[test]
fn library_rejects_empty_card_fields() {
    let mut app = App::default();
    app.handle_event(AppEvent::OpenLibrary);
    app.handle_event(AppEvent::InputChar('n'));
    type_str(&mut app, "只有标题");
    assert_eq!(app.handle_event(AppEvent::Submit), None);
    assert_eq!(app.toast_text(), Some("标题和内容不能为空"));
    assert!(app.rules().is_empty());
}

#[test]
fn library_edit_preserves_id_and_created_at() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    let original = app.rules()[0].clone();

    app.handle_event(AppEvent::OpenLibrary);
    app.handle_event(AppEvent::InputChar('e'));
    type_str(&mut app, "!");
    let action = app.handle_event(AppEvent::Submit).expect("save edit");
    let AppAction::UpsertRule(rule) = action else {
        panic!("expected upsert");
    };
    assert_eq!(rule.id, original.id);
    assert_eq!(rule.created_at, original.created_at);
    assert_eq!(rule.title, format!("{}!", original.title));
    assert_eq!(rule.is_active, original.is_active);
    assert_eq!(app.rules().len(), 3);
}

#[test]
fn library_delete_goes_through_confirmation() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    let doomed = app.rules()[1].id.clone();

    app.handle_event(AppEvent::OpenLibrary);
    app.handle_event(AppEvent::MoveDown);
    app.handle_event(AppEvent::InputChar('d'));
    assert!(matches!(
        app.modal(),
        Modal::Confirm(PendingConfirm::DeleteRule { .. })
    ));

    let action = app.handle_event(AppEvent::Submit).expect("confirm delete");
    assert_eq!(action, AppAction::DeleteRule(doomed.clone()));
    assert_eq!(app.rules().len(), 2);
    assert!(app.rules().iter().all(|rule| rule.id != doomed));
    // Back in the library, still on the same slot.
    let Modal::Library(state) = app.modal() else {
        panic!("expected library modal");
    };
    assert_eq!(state.selected, 1);
}

#[test]
fn library_delete_of_last_card_clamps_selection() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    app.handle_event(AppEvent::OpenLibrary);
    app.handle_event(AppEvent::MoveDown);
    app.handle_event(AppEvent::MoveDown);
    app.handle_event(AppEvent::InputChar('d'));
    app.handle_event(AppEvent::Submit);
    let Modal::Library(state) = app.modal() else {
        panic!("expected library modal");
    };
    assert_eq!(app.rules().len(), 2);
    assert_eq!(state.selected, 1);
}

#[test]
fn library_delete_escape_keeps_selection() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    app.handle_event(AppEvent::OpenLibrary);
    app.handle_event(AppEvent::MoveDown);
    app.handle_event(AppEvent::InputChar('d'));
    assert_eq!(app.handle_event(AppEvent::Escape), None);
    let Modal::Library(state) = app.modal() else {
        panic!("expected library modal");
    };
    assert_eq!(state.selected, 1);
    assert_eq!(app.rules().len(), 3);
}

#[test]
fn library_import_asks_for_a_path() {
    let mut app = App::default();
    app.handle_event(AppEvent::OpenLibrary);
    app.handle_event(AppEvent::InputChar('i'));
    type_str(&mut app, "/tmp/cards.json");
    let action = app.handle_event(AppEvent::Submit).expect("import");
    assert_eq!(
        action,
        AppAction::ImportRules {
            path: "/tmp/cards.json".to_string()
        }
    );
}

#[test]
fn library_export_requires_cards() {
    let mut app = App::default();
    app.handle_event(AppEvent::OpenLibrary);
    assert_eq!(app.handle_event(AppEvent::InputChar('x')), None);
    assert_eq!(app.toast_text(), Some("没有可导出的卡片"));
}

#[test]
fn library_export_emits_action() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    app.handle_event(AppEvent::OpenLibrary);
    assert_eq!(
        app.handle_event(AppEvent::InputChar('x')),
        Some(AppAction::ExportRules)
    );
}

#[test]
fn library_selection_stays_in_bounds() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    app.handle_event(AppEvent::OpenLibrary);
    for _ in 0..10 {
        app.handle_event(AppEvent::MoveDown);
    }
    let Modal::Library(state) = app.modal() else {
        panic!("expected library modal");
    };
    assert_eq!(state.selected, 2);
    app.handle_event(AppEvent::MoveUp);
    app.handle_event(AppEvent::MoveUp);
    app.handle_event(AppEvent::MoveUp);
    let Modal::Library(state) = app.modal() else {
        panic!("expected library modal");
    };
    assert_eq!(state.selected, 0);
}

#[test]
fn imported_rules_merge_into_the_set() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    let imported = rules::parse_import(r#"[{"title":"X","content":"Y"}]"#).expect("import");
    assert_eq!(app.apply_imported_rules(imported), 1);
    assert_eq!(app.rules().len(), 4);
}

#[test]
fn remote_snapshot_replaces_rules_wholesale() {
    let mut app = App::default();
    app.replace_rules(rules::default_rules());
    let replacement = vec![ContextRule::new(
        "唯一".to_string(),
        "内容".to_string(),
        true,
        99,
    )];
    app.replace_rules(replacement);
    assert_eq!(app.rules().len(), 1);
    assert_eq!(app.rules()[0].title, "唯一");
}

#[test]
fn toast_expires_after_its_window() {
    let mut app = App::default();
    app.show_toast("短暂提示");
    assert_eq!(app.toast_text(), Some("短暂提示"));
    for _ in 0..TOAST_TICKS {
        app.on_tick();
    }
    assert_eq!(app.toast_text(), None);
}

#[test]
fn quit_event_stops_the_app() {
    let mut app = App::default();
    app.handle_event(AppEvent::Quit);
    assert!(!app.running);
}

#[test]
fn scrolling_targets_the_active_pane() {
    let mut app = App::default();
    app.handle_event(AppEvent::ScrollDown);
    assert_eq!(app.chat_scroll(), 1);
    app.handle_event(AppEvent::NextPane);
    app.handle_event(AppEvent::ScrollDown);
    app.handle_event(AppEvent::ScrollDown);
    assert_eq!(app.table_scroll(), 2);
    app.handle_event(AppEvent::ScrollUp);
    assert_eq!(app.table_scroll(), 1);
    app.handle_event(AppEvent::ScrollUp);
    app.handle_event(AppEvent::ScrollUp);
    assert_eq!(app.table_scroll(), 0);
}
