use std::io;
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    Quit,
    NextPane,
    PrevPane,
    MoveUp,
    MoveDown,
    CursorLeft,
    CursorRight,
    ScrollUp,
    ScrollDown,
    InputChar(char),
    Backspace,
    Submit,
    NewLine,
    Escape,
    Generate,
    CopyTable,
    OpenLibrary,
    OpenSettings,
    Reset,
}

fn map_key_event(key_event: KeyEvent) -> AppEvent {
    if key_event.kind != KeyEventKind::Press {
        return AppEvent::Tick;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        match key_event.code {
            KeyCode::Char('c') => return AppEvent::Quit,
            KeyCode::Char('g') => return AppEvent::Generate,
            KeyCode::Char('y') => return AppEvent::CopyTable,
            KeyCode::Char('l') => return AppEvent::OpenLibrary,
            KeyCode::Char('o') => return AppEvent::OpenSettings,
            KeyCode::Char('r') => return AppEvent::Reset,
            KeyCode::Up => return AppEvent::ScrollUp,
            KeyCode::Down => return AppEvent::ScrollDown,
            _ => {}
        }
    }

    match key_event.code {
        KeyCode::Tab => AppEvent::NextPane,
        KeyCode::BackTab => AppEvent::PrevPane,
        KeyCode::Up if key_event.modifiers.contains(KeyModifiers::SHIFT) => AppEvent::ScrollUp,
        KeyCode::Down if key_event.modifiers.contains(KeyModifiers::SHIFT) => AppEvent::ScrollDown,
        KeyCode::PageUp => AppEvent::ScrollUp,
        KeyCode::PageDown => AppEvent::ScrollDown,
        KeyCode::Up => AppEvent::MoveUp,
        KeyCode::Down => AppEvent::MoveDown,
        KeyCode::Left => AppEvent::CursorLeft,
        KeyCode::Right => AppEvent::CursorRight,
        KeyCode::Backspace => AppEvent::Backspace,
        KeyCode::Enter if key_event.modifiers.contains(KeyModifiers::ALT) => AppEvent::NewLine,
        KeyCode::Enter => AppEvent::Submit,
        KeyCode::Esc => AppEvent::Escape,
        KeyCode::Char(c) => AppEvent::InputChar(c),
        _ => AppEvent::Tick,
    }
}

fn map_mouse_event_kind(kind: MouseEventKind) -> AppEvent {
    match kind {
        MouseEventKind::ScrollUp => AppEvent::ScrollUp,
        MouseEventKind::ScrollDown => AppEvent::ScrollDown,
        _ => AppEvent::Tick,
    }
}

pub fn next_event() -> io::Result<AppEvent> {
    if event::poll(Duration::from_millis(16))? {
        match event::read()? {
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                return Ok(map_key_event(key_event));
            }
            Event::Mouse(mouse_event) => {
                return Ok(map_mouse_event_kind(mouse_event.kind));
            }
            _ => {}
        }
    }

    Ok(AppEvent::Tick)
}
