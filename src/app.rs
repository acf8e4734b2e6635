use crate::conversation::{ConversationStore, GREETING, RESET_GREETING};
use crate::events::AppEvent;
use crate::model::{ApiConfig, ModelError, Provider};
use crate::prompts;
use crate::recovery::{RecoveryOutcome, TestCase};
use crate::rules::{self, ContextRule};
use crate::table::{self, RowSpans};
use crate::text_layout::cursor_line_col;

/// How long a toast stays visible, in event-loop ticks (~16ms each).
const TOAST_TICKS: u64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Chat,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingConfirm {
    DeleteRule { id: String, selected: usize },
    ResetSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Title,
    Content,
}

/// Create/edit form for one rule card. `id` is `None` for a new card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleForm {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: Option<i64>,
    pub field: RuleField,
}

impl RuleForm {
    fn blank() -> Self {
        Self {
            id: None,
            title: String::new(),
            content: String::new(),
            is_active: false,
            created_at: None,
            field: RuleField::Title,
        }
    }

    fn for_rule(rule: &ContextRule) -> Self {
        Self {
            id: Some(rule.id.clone()),
            title: rule.title.clone(),
            content: rule.content.clone(),
            is_active: rule.is_active,
            created_at: Some(rule.created_at),
            field: RuleField::Title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryMode {
    Browse,
    Edit(RuleForm),
    ImportPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryState {
    pub selected: usize,
    pub mode: LibraryMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Provider,
    ApiKey,
    BaseUrl,
    ModelName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub field: SettingsField,
}

impl SettingsForm {
    fn from_config(config: &ApiConfig) -> Self {
        Self {
            provider: config.provider,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model_name: config.model_name.clone(),
            field: SettingsField::Provider,
        }
    }

    fn to_config(&self) -> ApiConfig {
        ApiConfig {
            provider: self.provider,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model_name: self.model_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    None,
    Library(LibraryState),
    Settings(SettingsForm),
    Confirm(PendingConfirm),
}

/// Side effects the event handler asks the caller to perform. State changes
/// happen inside `App`; network, clipboard, and disk stay outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    StartDiscussion { prompt: String },
    StartGeneration { prompt: String },
    CopyTable,
    SaveSettings(ApiConfig),
    UpsertRule(ContextRule),
    DeleteRule(String),
    ExportRules,
    ImportRules { path: String },
}

#[derive(Debug)]
pub struct App {
    pub running: bool,
    pub ticks: u64,
    pub active_pane: Pane,
    modal: Modal,
    conversation: ConversationStore,
    chat_input: String,
    chat_cursor: usize,
    chat_scroll: u16,
    table_scroll: u16,
    discussion_pending: bool,
    generation_pending: bool,
    test_cases: Vec<TestCase>,
    row_spans: RowSpans,
    rules: Vec<ContextRule>,
    api_config: ApiConfig,
    toast: Option<(String, u64)>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            running: true,
            ticks: 0,
            active_pane: Pane::Chat,
            modal: Modal::None,
            conversation: ConversationStore::with_greeting(GREETING),
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            table_scroll: 0,
            discussion_pending: false,
            generation_pending: false,
            test_cases: Vec::new(),
            row_spans: RowSpans::default(),
            rules: Vec::new(),
            api_config: ApiConfig::default(),
            toast: None,
        }
    }
}

impl App {
    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        if let Some((_, expires)) = &self.toast
            && self.ticks >= *expires
        {
            self.toast = None;
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some((message.into(), self.ticks + TOAST_TICKS));
    }

    pub fn toast_text(&self) -> Option<&str> {
        self.toast.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    pub fn chat_input(&self) -> &str {
        &self.chat_input
    }

    pub fn chat_cursor_line_col(&self, width: u16) -> (u16, u16) {
        cursor_line_col(&self.chat_input, width, self.chat_cursor)
    }

    pub fn chat_scroll(&self) -> u16 {
        self.chat_scroll
    }

    pub fn table_scroll(&self) -> u16 {
        self.table_scroll
    }

    pub fn is_busy(&self) -> bool {
        self.discussion_pending || self.generation_pending
    }

    pub fn is_discussion_pending(&self) -> bool {
        self.discussion_pending
    }

    pub fn is_generation_pending(&self) -> bool {
        self.generation_pending
    }

    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    pub fn row_spans(&self) -> &RowSpans {
        &self.row_spans
    }

    pub fn rules(&self) -> &[ContextRule] {
        &self.rules
    }

    pub fn active_rule_count(&self) -> usize {
        rules::active_rules(&self.rules).len()
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.api_config
    }

    pub fn set_api_config(&mut self, config: ApiConfig) {
        self.api_config = config;
    }

    /// Replaces the whole rule set, keeping stored order by creation time.
    /// Used for the initial load and for remote snapshot events.
    pub fn replace_rules(&mut self, mut snapshot: Vec<ContextRule>) {
        snapshot.sort_by_key(|rule| rule.created_at);
        self.rules = snapshot;
        if let Modal::Library(state) = &mut self.modal {
            state.selected = state.selected.min(self.rules.len().saturating_sub(1));
        }
    }

    /// Merges freshly imported rules into the local set and reports how many
    /// were added. The caller persists them to the active store.
    pub fn apply_imported_rules(&mut self, imported: Vec<ContextRule>) -> usize {
        let count = imported.len();
        for rule in imported {
            self.upsert_local_rule(rule);
        }
        count
    }

    fn upsert_local_rule(&mut self, rule: ContextRule) {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.id == rule.id) {
            *existing = rule;
        } else {
            self.rules.push(rule);
        }
        self.rules.sort_by_key(|rule| rule.created_at);
    }

    fn remove_local_rule(&mut self, id: &str) {
        self.rules.retain(|rule| rule.id != id);
    }

    /// Delivery point for a finished discussion call: the reply (or a
    /// connection-error line) becomes the next assistant turn.
    pub fn on_discussion_result(&mut self, result: Result<String, ModelError>) {
        self.discussion_pending = false;
        match result {
            Ok(reply) => self.conversation.append_assistant(reply),
            Err(err) => self
                .conversation
                .append_assistant(format!("连接错误: {err}")),
        }
    }

    /// Delivery point for a finished generation call. The table is replaced
    /// only when parsing succeeds; on failure the previous list stays.
    pub fn on_generation_result(
        &mut self,
        result: Result<(Vec<TestCase>, RecoveryOutcome), String>,
    ) {
        self.generation_pending = false;
        match result {
            Ok((cases, outcome)) => {
                let count = cases.len();
                self.row_spans = table::compute_row_spans(&cases);
                self.test_cases = cases;
                self.table_scroll = 0;
                match outcome {
                    RecoveryOutcome::Clean => self.show_toast(format!("已生成 {count} 条用例")),
                    RecoveryOutcome::Repaired => {
                        self.show_toast(format!("已修复格式并生成 {count} 条用例"))
                    }
                }
            }
            Err(detail) => self.show_toast(format!("生成失败: {detail}")),
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Option<AppAction> {
        match event {
            AppEvent::Tick => {
                self.on_tick();
                None
            }
            AppEvent::Quit => {
                self.quit();
                None
            }
            _ => match std::mem::replace(&mut self.modal, Modal::None) {
                Modal::None => self.handle_main_event(event),
                Modal::Confirm(pending) => self.handle_confirm_event(event, pending),
                Modal::Library(state) => self.handle_library_event(event, state),
                Modal::Settings(form) => self.handle_settings_event(event, form),
            },
        }
    }

    fn handle_main_event(&mut self, event: AppEvent) -> Option<AppAction> {
        match event {
            AppEvent::NextPane | AppEvent::PrevPane => {
                self.active_pane = match self.active_pane {
                    Pane::Chat => Pane::Table,
                    Pane::Table => Pane::Chat,
                };
                None
            }
            AppEvent::OpenLibrary => {
                self.modal = Modal::Library(LibraryState {
                    selected: 0,
                    mode: LibraryMode::Browse,
                });
                None
            }
            AppEvent::OpenSettings => {
                self.modal = Modal::Settings(SettingsForm::from_config(&self.api_config));
                None
            }
            AppEvent::Reset => {
                self.modal = Modal::Confirm(PendingConfirm::ResetSession);
                None
            }
            AppEvent::Generate => self.begin_generation(),
            AppEvent::CopyTable => {
                if self.test_cases.is_empty() {
                    self.show_toast("没有可复制的用例");
                    return None;
                }
                Some(AppAction::CopyTable)
            }
            AppEvent::ScrollUp => {
                self.scroll_active_pane(-1);
                None
            }
            AppEvent::ScrollDown => {
                self.scroll_active_pane(1);
                None
            }
            AppEvent::MoveUp => {
                self.scroll_active_pane(-1);
                None
            }
            AppEvent::MoveDown => {
                self.scroll_active_pane(1);
                None
            }
            AppEvent::InputChar(c) if self.active_pane == Pane::Chat => {
                self.input_char(c);
                None
            }
            AppEvent::NewLine if self.active_pane == Pane::Chat => {
                self.input_char('\n');
                None
            }
            AppEvent::Backspace if self.active_pane == Pane::Chat => {
                self.backspace_input();
                None
            }
            AppEvent::CursorLeft if self.active_pane == Pane::Chat => {
                self.chat_cursor = self.chat_cursor.saturating_sub(1);
                None
            }
            AppEvent::CursorRight if self.active_pane == Pane::Chat => {
                let char_len = self.chat_input.chars().count();
                self.chat_cursor = (self.chat_cursor + 1).min(char_len);
                None
            }
            AppEvent::Submit if self.active_pane == Pane::Chat => self.submit_chat_message(),
            _ => None,
        }
    }

    fn handle_confirm_event(
        &mut self,
        event: AppEvent,
        pending: PendingConfirm,
    ) -> Option<AppAction> {
        match event {
            AppEvent::Submit => match pending {
                PendingConfirm::ResetSession => {
                    self.conversation.reset(RESET_GREETING);
                    self.test_cases.clear();
                    self.row_spans = RowSpans::default();
                    self.chat_scroll = 0;
                    self.table_scroll = 0;
                    self.active_pane = Pane::Chat;
                    self.show_toast("会话已重置");
                    None
                }
                PendingConfirm::DeleteRule { id, selected } => {
                    self.remove_local_rule(&id);
                    self.modal = Modal::Library(LibraryState {
                        selected: selected.min(self.rules.len().saturating_sub(1)),
                        mode: LibraryMode::Browse,
                    });
                    Some(AppAction::DeleteRule(id))
                }
            },
            AppEvent::Escape => {
                if let PendingConfirm::DeleteRule { selected, .. } = pending {
                    self.modal = Modal::Library(LibraryState {
                        selected,
                        mode: LibraryMode::Browse,
                    });
                }
                None
            }
            _ => {
                self.modal = Modal::Confirm(pending);
                None
            }
        }
    }

    fn handle_library_event(
        &mut self,
        event: AppEvent,
        mut state: LibraryState,
    ) -> Option<AppAction> {
        match state.mode.clone() {
            LibraryMode::Browse => match event {
                AppEvent::Escape => None,
                AppEvent::MoveUp => {
                    state.selected = state.selected.saturating_sub(1);
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::MoveDown => {
                    if state.selected + 1 < self.rules.len() {
                        state.selected += 1;
                    }
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::InputChar(' ') | AppEvent::Submit => {
                    let action = self.rules.get(state.selected).map(|rule| {
                        let mut toggled = rule.clone();
                        toggled.is_active = !toggled.is_active;
                        toggled
                    });
                    self.modal = Modal::Library(state);
                    action.map(|rule| {
                        self.upsert_local_rule(rule.clone());
                        AppAction::UpsertRule(rule)
                    })
                }
                AppEvent::InputChar('n') => {
                    state.mode = LibraryMode::Edit(RuleForm::blank());
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::InputChar('e') => {
                    if let Some(rule) = self.rules.get(state.selected) {
                        state.mode = LibraryMode::Edit(RuleForm::for_rule(rule));
                    }
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::InputChar('d') => {
                    match self.rules.get(state.selected) {
                        Some(rule) => {
                            self.modal = Modal::Confirm(PendingConfirm::DeleteRule {
                                id: rule.id.clone(),
                                selected: state.selected,
                            });
                        }
                        None => self.modal = Modal::Library(state),
                    }
                    None
                }
                AppEvent::InputChar('x') => {
                    self.modal = Modal::Library(state);
                    if self.rules.is_empty() {
                        self.show_toast("没有可导出的卡片");
                        return None;
                    }
                    Some(AppAction::ExportRules)
                }
                AppEvent::InputChar('i') => {
                    state.mode = LibraryMode::ImportPath(String::new());
                    self.modal = Modal::Library(state);
                    None
                }
                _ => {
                    self.modal = Modal::Library(state);
                    None
                }
            },
            LibraryMode::Edit(mut form) => match event {
                AppEvent::Escape => {
                    state.mode = LibraryMode::Browse;
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::MoveUp | AppEvent::MoveDown => {
                    form.field = match form.field {
                        RuleField::Title => RuleField::Content,
                        RuleField::Content => RuleField::Title,
                    };
                    state.mode = LibraryMode::Edit(form);
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::InputChar(c) => {
                    match form.field {
                        RuleField::Title => form.title.push(c),
                        RuleField::Content => form.content.push(c),
                    }
                    state.mode = LibraryMode::Edit(form);
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::NewLine => {
                    if form.field == RuleField::Content {
                        form.content.push('\n');
                    }
                    state.mode = LibraryMode::Edit(form);
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::Backspace => {
                    match form.field {
                        RuleField::Title => {
                            form.title.pop();
                        }
                        RuleField::Content => {
                            form.content.pop();
                        }
                    }
                    state.mode = LibraryMode::Edit(form);
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::Submit => {
                    if form.title.trim().is_empty() || form.content.trim().is_empty() {
                        self.show_toast("标题和内容不能为空");
                        state.mode = LibraryMode::Edit(form);
                        self.modal = Modal::Library(state);
                        return None;
                    }
                    let rule = match (&form.id, form.created_at) {
                        (Some(id), Some(created_at)) => ContextRule {
                            id: id.clone(),
                            title: form.title.trim().to_string(),
                            content: form.content.trim().to_string(),
                            is_active: form.is_active,
                            created_at,
                        },
                        // New cards start active so they join the prompt
                        // context right away.
                        _ => ContextRule::new(
                            form.title.trim().to_string(),
                            form.content.trim().to_string(),
                            true,
                            rules::now_millis(),
                        ),
                    };
                    self.upsert_local_rule(rule.clone());
                    state.mode = LibraryMode::Browse;
                    self.modal = Modal::Library(state);
                    Some(AppAction::UpsertRule(rule))
                }
                _ => {
                    state.mode = LibraryMode::Edit(form);
                    self.modal = Modal::Library(state);
                    None
                }
            },
            LibraryMode::ImportPath(mut path) => match event {
                AppEvent::Escape => {
                    state.mode = LibraryMode::Browse;
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::InputChar(c) => {
                    path.push(c);
                    state.mode = LibraryMode::ImportPath(path);
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::Backspace => {
                    path.pop();
                    state.mode = LibraryMode::ImportPath(path);
                    self.modal = Modal::Library(state);
                    None
                }
                AppEvent::Submit => {
                    let trimmed = path.trim().to_string();
                    state.mode = LibraryMode::Browse;
                    self.modal = Modal::Library(state);
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(AppAction::ImportRules { path: trimmed })
                    }
                }
                _ => {
                    state.mode = LibraryMode::ImportPath(path);
                    self.modal = Modal::Library(state);
                    None
                }
            },
        }
    }

    fn handle_settings_event(&mut self, event: AppEvent, mut form: SettingsForm) -> Option<AppAction> {
        match event {
            AppEvent::Escape => None,
            AppEvent::Submit => {
                let config = form.to_config();
                self.api_config = config.clone();
                self.show_toast("设置已保存");
                Some(AppAction::SaveSettings(config))
            }
            AppEvent::MoveUp => {
                form.field = match form.field {
                    SettingsField::Provider => SettingsField::ModelName,
                    SettingsField::ApiKey => SettingsField::Provider,
                    SettingsField::BaseUrl => SettingsField::ApiKey,
                    SettingsField::ModelName => SettingsField::BaseUrl,
                };
                self.modal = Modal::Settings(form);
                None
            }
            AppEvent::MoveDown => {
                form.field = match form.field {
                    SettingsField::Provider => SettingsField::ApiKey,
                    SettingsField::ApiKey => SettingsField::BaseUrl,
                    SettingsField::BaseUrl => SettingsField::ModelName,
                    SettingsField::ModelName => SettingsField::Provider,
                };
                self.modal = Modal::Settings(form);
                None
            }
            AppEvent::CursorLeft | AppEvent::CursorRight
                if form.field == SettingsField::Provider =>
            {
                form.provider = form.provider.next();
                self.modal = Modal::Settings(form);
                None
            }
            AppEvent::InputChar(c) if form.field != SettingsField::Provider => {
                match form.field {
                    SettingsField::ApiKey => form.api_key.push(c),
                    SettingsField::BaseUrl => form.base_url.push(c),
                    SettingsField::ModelName => form.model_name.push(c),
                    SettingsField::Provider => {}
                }
                self.modal = Modal::Settings(form);
                None
            }
            AppEvent::Backspace => {
                match form.field {
                    SettingsField::ApiKey => {
                        form.api_key.pop();
                    }
                    SettingsField::BaseUrl => {
                        form.base_url.pop();
                    }
                    SettingsField::ModelName => {
                        form.model_name.pop();
                    }
                    SettingsField::Provider => {}
                }
                self.modal = Modal::Settings(form);
                None
            }
            _ => {
                self.modal = Modal::Settings(form);
                None
            }
        }
    }

    fn input_char(&mut self, c: char) {
        let byte_idx = char_to_byte_idx(&self.chat_input, self.chat_cursor);
        self.chat_input.insert(byte_idx, c);
        self.chat_cursor = self.chat_cursor.saturating_add(1);
    }

    fn backspace_input(&mut self) {
        if self.chat_cursor == 0 {
            return;
        }
        let start = char_to_byte_idx(&self.chat_input, self.chat_cursor - 1);
        let end = char_to_byte_idx(&self.chat_input, self.chat_cursor);
        self.chat_input.drain(start..end);
        self.chat_cursor -= 1;
    }

    fn scroll_active_pane(&mut self, delta: i32) {
        let scroll = match self.active_pane {
            Pane::Chat => &mut self.chat_scroll,
            Pane::Table => &mut self.table_scroll,
        };
        if delta < 0 {
            *scroll = scroll.saturating_sub(1);
        } else {
            *scroll = scroll.saturating_add(1);
        }
    }

    /// Sends the typed message into the discussion phase. Refused while a
    /// model call is already in flight.
    fn submit_chat_message(&mut self) -> Option<AppAction> {
        let message = self.chat_input.trim().to_string();
        if message.is_empty() {
            return None;
        }
        if self.is_busy() {
            self.show_toast("正在等待模型响应...");
            return None;
        }
        self.chat_input.clear();
        self.chat_cursor = 0;
        // The history snapshot stops before this message; the prompt carries
        // it separately as the current input.
        let history = self.conversation.history_text();
        self.conversation.append_user(message.clone());
        self.discussion_pending = true;
        let prompt = prompts::build_discussion_prompt(
            &history,
            &rules::render_context_block(&self.rules),
            &message,
        );
        Some(AppAction::StartDiscussion { prompt })
    }

    /// Starts the generation phase. Requires at least one full user/assistant
    /// exchange beyond the greeting, and no call in flight.
    fn begin_generation(&mut self) -> Option<AppAction> {
        if self.is_busy() {
            self.show_toast("正在等待模型响应...");
            return None;
        }
        if self.conversation.len() < 2 {
            self.show_toast("请先与 AI 讨论需求");
            return None;
        }
        self.generation_pending = true;
        self.active_pane = Pane::Table;
        let prompt = prompts::build_generation_prompt(
            &self.conversation.history_text(),
            &rules::render_context_block(&self.rules),
        );
        Some(AppAction::StartGeneration { prompt })
    }
}

fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}

#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
