use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Padding, Paragraph};

use crate::app::{
    App, LibraryMode, LibraryState, Modal, Pane, PendingConfirm, RuleField, SettingsField,
    SettingsForm,
};
use crate::theme::Theme;

const TEXT_PADDING: u16 = 1;
const STATUS_HEIGHT: u16 = 3;
const TITLE_BAR_HEIGHT: u16 = 3;
const MAX_INPUT_TEXT_LINES: u16 = 5;
const ACTIVE_TITLE_BG: Color = Color::Rgb(120, 90, 170);
const ACTIVE_TITLE_FG: Color = Color::Black;
const STATUS_HELP_TEXT: &str =
    "Tab 切换面板 | Enter 发送 | Ctrl+G 生成用例 | Ctrl+Y 复制表格 | Ctrl+L 规则库 | Ctrl+O 设置 | Ctrl+R 重置 | Ctrl+C 退出";

/// Text width available inside the chat input box, for cursor math.
pub fn chat_input_text_width(screen: Rect) -> u16 {
    let [body, _status] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)]).areas(screen);
    let [chat, _table] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(body);
    let [_title, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(chat);
    content.width.saturating_sub(TEXT_PADDING * 2).max(1)
}

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let [body, status] = Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)])
        .areas(frame.area());
    let [chat, table] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(body);

    render_chat_pane(frame, chat, app, app.active_pane == Pane::Chat, theme);
    render_table_pane(frame, table, app, app.active_pane == Pane::Table, theme);
    render_status_line(frame, status, app, theme);

    match app.modal() {
        Modal::None => {}
        Modal::Library(state) => render_library_modal(frame, app, state, theme),
        Modal::Settings(form) => render_settings_modal(frame, form, theme),
        Modal::Confirm(pending) => render_confirm_modal(frame, pending, theme),
    }

    if let Some(text) = app.toast_text() {
        render_toast(frame, text, theme);
    }
}

fn title_bar_bg(base: Color, active: bool) -> Color {
    if active { ACTIVE_TITLE_BG } else { base }
}

pub(crate) fn working_dots(ticks: u64) -> &'static str {
    const FRAMES: [&str; 6] = ["[   ]", "[.  ]", "[.. ]", "[...]", "[ ..]", "[  .]"];
    FRAMES[((ticks / 2) as usize) % FRAMES.len()]
}

pub(crate) fn steps_summary(test_steps: &str) -> String {
    let mut lines = test_steps.lines();
    let first = lines.next().unwrap_or("").to_string();
    if lines.next().is_some() {
        format!("{first} …")
    } else {
        first
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect, text: &str, active: bool, theme: &Theme) {
    let bg = title_bar_bg(theme.status_bg, active);
    let fg = if active { ACTIVE_TITLE_FG } else { theme.muted_fg };
    frame.render_widget(Block::default().style(Style::default().bg(bg)), area);
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().bg(bg).fg(fg))
            .block(
                Block::default()
                    .style(Style::default().bg(bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        area,
    );
}

fn render_chat_pane(frame: &mut Frame, area: Rect, app: &App, active: bool, theme: &Theme) {
    let [title_area, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(area);
    let title = format!("对话 (启用规则: {})", app.active_rule_count());
    render_title_bar(frame, title_area, &title, active, theme);

    frame.render_widget(
        Block::default().style(Style::default().bg(theme.chat_bg)),
        content,
    );
    if content.width < 1 || content.height < 2 {
        return;
    }

    let text_width = content.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let input_lines = crate::text_layout::wrap_text(app.chat_input(), text_width).len() as u16;
    let input_height = (input_lines.max(1) + TEXT_PADDING * 2)
        .min(MAX_INPUT_TEXT_LINES + TEXT_PADDING * 2)
        .min(content.height.saturating_sub(1).max(1));
    let [messages_area, input_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(input_height)]).areas(content);

    let mut lines: Vec<Line> = Vec::new();
    for turn in app.conversation().turns() {
        let (prefix, fg) = match turn.role {
            crate::conversation::Role::User => ("你: ", theme.user_fg),
            crate::conversation::Role::Assistant => ("AI: ", theme.assistant_fg),
        };
        let wrapped = crate::text_layout::wrap_text(&turn.content, text_width.saturating_sub(4).max(1));
        for (i, segment) in wrapped.iter().enumerate() {
            let lead = if i == 0 { prefix } else { "    " };
            lines.push(Line::from(vec![
                Span::styled(lead.to_string(), Style::default().fg(fg)),
                Span::styled(segment.clone(), Style::default().fg(fg)),
            ]));
        }
        lines.push(Line::default());
    }
    if app.is_discussion_pending() {
        lines.push(Line::styled(
            format!("AI 正在思考 {}", working_dots(app.ticks)),
            Style::default().fg(theme.muted_fg),
        ));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.chat_bg).fg(theme.text_fg))
            .scroll((app.chat_scroll(), 0))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.chat_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        messages_area,
    );

    frame.render_widget(
        Paragraph::new(crate::text_layout::wrap_text(app.chat_input(), text_width).join("\n"))
            .style(Style::default().bg(theme.input_bg).fg(theme.active_fg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.input_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        input_area,
    );

    if active && *app.modal() == Modal::None {
        let (line, col) = app.chat_cursor_line_col(text_width);
        frame.set_cursor_position((
            input_area.x + TEXT_PADDING + col,
            input_area.y + TEXT_PADDING + line,
        ));
    }
}

fn render_table_pane(frame: &mut Frame, area: Rect, app: &App, active: bool, theme: &Theme) {
    let [title_area, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(area);
    let title = format!("测试用例 ({})", app.test_cases().len());
    render_title_bar(frame, title_area, &title, active, theme);

    frame.render_widget(
        Block::default().style(Style::default().bg(theme.table_bg)),
        content,
    );

    let mut lines: Vec<Line> = Vec::new();
    if app.test_cases().is_empty() && !app.is_generation_pending() {
        lines.push(Line::styled(
            "暂无用例。讨论需求后按 Ctrl+G 生成。",
            Style::default().fg(theme.muted_fg),
        ));
    }
    let spans = app.row_spans();
    for (i, case) in app.test_cases().iter().enumerate() {
        if spans.modules.get(i).copied().unwrap_or(0) > 0 {
            lines.push(Line::styled(
                format!("■ {}", case.module),
                Style::default().fg(theme.accent_fg),
            ));
        }
        if spans.contents.get(i).copied().unwrap_or(0) > 0 {
            lines.push(Line::styled(
                format!("  ▸ {}", case.test_content),
                Style::default().fg(theme.text_fg),
            ));
        }
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(
                format!("[{}]", case.priority),
                Style::default().fg(theme.priority_fg(&case.priority)),
            ),
            Span::styled(
                format!(" {}", steps_summary(&case.test_steps)),
                Style::default().fg(theme.muted_fg),
            ),
        ]));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.table_bg).fg(theme.text_fg))
            .scroll((app.table_scroll(), 0))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.table_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        content,
    );

    if app.is_generation_pending() {
        render_center_overlay(
            frame,
            content,
            &format!("生成用例中 {}", working_dots(app.ticks)),
        );
    }
}

fn render_status_line(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.status_bg)),
        area,
    );
    let text = if app.is_busy() {
        format!("{} | 模型调用中 {}", STATUS_HELP_TEXT, working_dots(app.ticks))
    } else {
        STATUS_HELP_TEXT.to_string()
    };
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().bg(theme.status_bg).fg(theme.muted_fg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.status_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        area,
    );
}

fn render_center_overlay(frame: &mut Frame, area: Rect, text: &str) {
    let width = 32u16.min(area.width.saturating_sub(2)).max(20);
    let height = 3u16;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height);
    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Rgb(255, 165, 0)))
            .block(
                Block::default()
                    .style(Style::default().bg(Color::Rgb(20, 20, 20)))
                    .padding(Padding::uniform(1)),
            ),
        overlay,
    );
}

pub(crate) fn centered_rect(screen: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(screen.width.saturating_sub(2)).max(1);
    let height = height.min(screen.height.saturating_sub(2)).max(1);
    Rect::new(
        screen.x + (screen.width.saturating_sub(width)) / 2,
        screen.y + (screen.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn render_modal_frame(frame: &mut Frame, area: Rect, theme: &Theme) {
    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.modal_bg)),
        area,
    );
}

fn field_marker(selected: bool) -> &'static str {
    if selected { "▶ " } else { "  " }
}

fn render_library_modal(frame: &mut Frame, app: &App, state: &LibraryState, theme: &Theme) {
    let area = centered_rect(frame.area(), 72, 20);
    render_modal_frame(frame, area, theme);

    let mut lines: Vec<Line> = vec![
        Line::styled("规则卡库", Style::default().fg(theme.accent_fg)),
        Line::default(),
    ];
    match &state.mode {
        LibraryMode::Browse => {
            if app.rules().is_empty() {
                lines.push(Line::styled(
                    "没有规则卡。按 n 新建，或按 i 导入。",
                    Style::default().fg(theme.muted_fg),
                ));
            }
            for (i, rule) in app.rules().iter().enumerate() {
                let marker = if i == state.selected { "▶ " } else { "  " };
                let toggle = if rule.is_active { "[✓]" } else { "[ ]" };
                let fg = if rule.is_active {
                    theme.active_fg
                } else {
                    theme.muted_fg
                };
                lines.push(Line::styled(
                    format!("{marker}{toggle} {}", rule.title),
                    Style::default().fg(fg),
                ));
            }
            lines.push(Line::default());
            lines.push(Line::styled(
                "空格 启用/停用 | n 新建 | e 编辑 | d 删除 | i 导入 | x 导出 | Esc 关闭",
                Style::default().fg(theme.muted_fg),
            ));
        }
        LibraryMode::Edit(form) => {
            let heading = if form.id.is_some() { "编辑规则卡" } else { "新建规则卡" };
            lines.push(Line::styled(heading, Style::default().fg(theme.text_fg)));
            lines.push(Line::default());
            lines.push(Line::styled(
                format!("{}标题: {}", field_marker(form.field == RuleField::Title), form.title),
                Style::default().fg(theme.active_fg),
            ));
            lines.push(Line::styled(
                format!("{}内容:", field_marker(form.field == RuleField::Content)),
                Style::default().fg(theme.active_fg),
            ));
            for segment in form.content.split('\n') {
                lines.push(Line::styled(
                    format!("    {segment}"),
                    Style::default().fg(theme.text_fg),
                ));
            }
            lines.push(Line::default());
            lines.push(Line::styled(
                "↑/↓ 切换字段 | Alt+Enter 换行 | Enter 保存 | Esc 返回",
                Style::default().fg(theme.muted_fg),
            ));
        }
        LibraryMode::ImportPath(path) => {
            lines.push(Line::styled(
                "输入要导入的 JSON 文件路径:",
                Style::default().fg(theme.text_fg),
            ));
            lines.push(Line::styled(
                format!("  {path}▏"),
                Style::default().fg(theme.active_fg),
            ));
            lines.push(Line::default());
            lines.push(Line::styled(
                "Enter 导入 | Esc 返回",
                Style::default().fg(theme.muted_fg),
            ));
        }
    }

    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.modal_bg).fg(theme.text_fg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.modal_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        area,
    );
}

fn render_settings_modal(frame: &mut Frame, form: &SettingsForm, theme: &Theme) {
    let area = centered_rect(frame.area(), 64, 12);
    render_modal_frame(frame, area, theme);

    let masked_key = "*".repeat(form.api_key.chars().count());
    let lines: Vec<Line> = vec![
        Line::styled("模型设置", Style::default().fg(theme.accent_fg)),
        Line::default(),
        Line::styled(
            format!(
                "{}提供商: ◀ {} ▶",
                field_marker(form.field == SettingsField::Provider),
                form.provider.label()
            ),
            Style::default().fg(theme.active_fg),
        ),
        Line::styled(
            format!(
                "{}API Key: {masked_key}",
                field_marker(form.field == SettingsField::ApiKey)
            ),
            Style::default().fg(theme.active_fg),
        ),
        Line::styled(
            format!(
                "{}Base URL: {}",
                field_marker(form.field == SettingsField::BaseUrl),
                form.base_url
            ),
            Style::default().fg(theme.active_fg),
        ),
        Line::styled(
            format!(
                "{}模型名称: {}",
                field_marker(form.field == SettingsField::ModelName),
                form.model_name
            ),
            Style::default().fg(theme.active_fg),
        ),
        Line::default(),
        Line::styled(
            "↑/↓ 切换字段 | ←/→ 切换提供商 | Enter 保存 | Esc 取消",
            Style::default().fg(theme.muted_fg),
        ),
    ];

    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.modal_bg).fg(theme.text_fg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.modal_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        area,
    );
}

fn render_confirm_modal(frame: &mut Frame, pending: &PendingConfirm, theme: &Theme) {
    let area = centered_rect(frame.area(), 44, 5);
    render_modal_frame(frame, area, theme);
    let message = match pending {
        PendingConfirm::DeleteRule { .. } => "删除该规则卡?",
        PendingConfirm::ResetSession => "重置会话并清空用例?",
    };
    let lines = vec![
        Line::styled(message, Style::default().fg(theme.text_fg)),
        Line::default(),
        Line::styled("Enter 确认 | Esc 取消", Style::default().fg(theme.muted_fg)),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(Style::default().bg(theme.modal_bg))
            .block(Block::default().style(Style::default().bg(theme.modal_bg))),
        area,
    );
}

fn render_toast(frame: &mut Frame, text: &str, theme: &Theme) {
    let screen = frame.area();
    let width = (text.chars().count() as u16 + 4)
        .min(screen.width.saturating_sub(2))
        .max(10);
    let x = screen.x + screen.width.saturating_sub(width + 1);
    let y = screen
        .y
        .saturating_add(screen.height.saturating_sub(STATUS_HEIGHT + 3));
    let overlay = Rect::new(x, y, width, 3);
    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().bg(theme.accent_fg).fg(Color::Black))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.accent_fg))
                    .padding(Padding::uniform(1)),
            ),
        overlay,
    );
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
