use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use clap::Parser;
use crossterm::cursor::SetCursorStyle;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use tracing_subscriber::EnvFilter;

mod app;
mod conversation;
mod events;
mod export;
mod fsutil;
mod model;
mod prompts;
mod recovery;
mod rules;
mod settings;
mod store;
mod table;
mod text_layout;
mod theme;
mod ui;

use app::{App, AppAction};
use events::AppEvent;
use model::{ModelAdapter, ModelEvent};
use recovery::parse_test_cases;
use store::{CardStore, StoreEvent};
use theme::Theme;

const MAX_ADAPTER_EVENTS_PER_LOOP: usize = 16;

#[derive(Debug, Parser)]
#[command(name = "caseforge", about = "AI 测试用例生成助手", version)]
struct LaunchOptions {
    /// Force the local card store even when a sync URL is available.
    #[arg(long)]
    offline: bool,
    /// Base URL of the remote card-sync service.
    #[arg(long)]
    sync_url: Option<String>,
    /// Path to a theme TOML file.
    #[arg(long, default_value = "theme.toml")]
    theme: PathBuf,
}

fn init_logging(config_dir: &Path) -> io::Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config_dir.join("caseforge.log"))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> io::Result<()> {
    let options = LaunchOptions::parse();
    dotenvy::dotenv().ok();

    let config_dir = fsutil::config_dir()?;
    init_logging(&config_dir)?;

    let sync_url = options
        .sync_url
        .or_else(|| std::env::var("CASEFORGE_SYNC_URL").ok());
    let card_store = store::select_card_store(options.offline, sync_url.as_deref(), &config_dir)
        .map_err(io::Error::other)?;

    let mut app = App::default();
    app.set_api_config(settings::load_api_config(&config_dir));
    match card_store.list() {
        Ok(cards) if cards.is_empty() => {
            let defaults = rules::default_rules();
            for rule in &defaults {
                if let Err(err) = card_store.upsert(rule) {
                    tracing::warn!(error = %err, "failed to seed default rule card");
                }
            }
            app.replace_rules(defaults);
        }
        Ok(cards) => app.replace_rules(cards),
        Err(err) => {
            tracing::warn!(error = %err, "failed to load rule cards, starting empty");
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetCursorStyle::SteadyBar
    )?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let theme = Theme::load_or_default(&options.theme);
    let result = run_app(&mut terminal, app, &theme, card_store.as_ref(), &config_dir);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        SetCursorStyle::DefaultUserShape,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    theme: &Theme,
    card_store: &dyn CardStore,
    config_dir: &Path,
) -> io::Result<()> {
    let discussion_adapter = ModelAdapter::new();
    let generation_adapter = ModelAdapter::new();
    let card_events: Option<Receiver<StoreEvent>> = card_store.subscribe();

    while app.running {
        for event in discussion_adapter.drain_events_limited(MAX_ADAPTER_EVENTS_PER_LOOP) {
            let ModelEvent::Completed(result) = event;
            app.on_discussion_result(result);
        }

        for event in generation_adapter.drain_events_limited(MAX_ADAPTER_EVENTS_PER_LOOP) {
            let ModelEvent::Completed(result) = event;
            match result {
                Ok(raw) => match parse_test_cases(&raw) {
                    Ok(parsed) => app.on_generation_result(Ok(parsed)),
                    Err(err) => {
                        tracing::warn!(
                            payload = %err.payload.chars().take(200).collect::<String>(),
                            "generation output could not be recovered"
                        );
                        app.on_generation_result(Err(err.to_string()));
                    }
                },
                Err(err) => app.on_generation_result(Err(err.to_string())),
            }
        }

        if let Some(receiver) = &card_events {
            while let Ok(StoreEvent::CardsSnapshot(snapshot)) = receiver.try_recv() {
                app.replace_rules(snapshot);
            }
        }

        terminal.draw(|frame| ui::render(frame, &app, theme))?;

        let event = events::next_event()?;
        if event == AppEvent::Tick {
            app.on_tick();
            continue;
        }
        if let Some(action) = app.handle_event(event) {
            perform_action(
                &mut app,
                action,
                &discussion_adapter,
                &generation_adapter,
                card_store,
                config_dir,
            );
        }
    }

    Ok(())
}

fn perform_action(
    app: &mut App,
    action: AppAction,
    discussion_adapter: &ModelAdapter,
    generation_adapter: &ModelAdapter,
    card_store: &dyn CardStore,
    config_dir: &Path,
) {
    match action {
        AppAction::StartDiscussion { prompt } => {
            discussion_adapter.send_prompt(app.api_config().clone(), prompt);
        }
        AppAction::StartGeneration { prompt } => {
            generation_adapter.send_prompt(app.api_config().clone(), prompt);
        }
        AppAction::CopyTable => match export::copy_table_to_clipboard(app.test_cases(), app.row_spans())
        {
            Ok(()) => app.show_toast("表格已复制到剪贴板"),
            Err(detail) => {
                tracing::warn!(error = %detail, "clipboard copy failed");
                app.show_toast(format!("复制失败: {detail}"));
            }
        },
        AppAction::SaveSettings(config) => {
            if let Err(err) = settings::save_api_config(config_dir, &config) {
                tracing::warn!(error = %err, "failed to persist api_config");
                app.show_toast(format!("设置保存失败: {err}"));
            }
        }
        AppAction::UpsertRule(rule) => {
            if let Err(err) = card_store.upsert(&rule) {
                tracing::warn!(error = %err, "failed to persist rule card");
                app.show_toast(format!("规则保存失败: {err}"));
            }
        }
        AppAction::DeleteRule(id) => {
            if let Err(err) = card_store.remove(&id) {
                tracing::warn!(error = %err, "failed to delete rule card");
                app.show_toast(format!("规则删除失败: {err}"));
            }
        }
        AppAction::ExportRules => {
            match export::export_rules_to_dir(app.rules(), config_dir) {
                Ok(path) => app.show_toast(format!("已导出到 {}", path.display())),
                Err(err) => app.show_toast(format!("导出失败: {err}")),
            }
        }
        AppAction::ImportRules { path } => match fsutil::read_text_file(Path::new(&path)) {
            Ok(text) => match rules::parse_import(&text) {
                Ok(imported) if imported.is_empty() => {
                    app.show_toast("导入文件中没有有效规则");
                }
                Ok(imported) => {
                    for rule in &imported {
                        if let Err(err) = card_store.upsert(rule) {
                            tracing::warn!(error = %err, "failed to persist imported rule");
                        }
                    }
                    let count = app.apply_imported_rules(imported);
                    app.show_toast(format!("已导入 {count} 条规则"));
                }
                Err(err) => app.show_toast(format!("导入失败: {err}")),
            },
            Err(err) => app.show_toast(format!("读取文件失败: {err}")),
        },
    }
}

#[cfg(test)]
#[path = "../tests/unit/main_launch_tests.rs"]
mod launch_tests;
