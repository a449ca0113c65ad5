//! Key event dispatch: translates terminal input into [`Message`]s based
//! on the current mode (credential entry, help popup, main view).

use super::{App, Message};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub fn dispatch(app: &App, key: KeyEvent) -> Message {
    if key.kind != KeyEventKind::Press {
        return Message::None;
    }

    // Ctrl+C quits from any mode.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Message::Quit;
    }

    if !app.authenticated() {
        return match key.code {
            KeyCode::Enter => Message::TokenSubmit,
            KeyCode::Backspace => Message::TokenBackspace,
            KeyCode::Esc => Message::Quit,
            KeyCode::Char(c) => Message::TokenInput(c),
            _ => Message::None,
        };
    }

    if app.show_help {
        return match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Message::CloseModal,
            _ => Message::None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Message::Quit,
        KeyCode::Char('r') => Message::Refresh,
        KeyCode::Char('L') => Message::Logout,
        KeyCode::Tab | KeyCode::BackTab => Message::SwitchPanel,
        KeyCode::Char('j') | KeyCode::Down => Message::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Message::MoveUp,
        KeyCode::Char('g') | KeyCode::Home => Message::GotoTop,
        KeyCode::Char('G') | KeyCode::End => Message::GotoBottom,
        KeyCode::Enter | KeyCode::Char('o') => Message::OpenSelected,
        KeyCode::Char('c') => Message::CloseSelected,
        KeyCode::Char('h') => Message::ToggleHoldSelected,
        KeyCode::Char('t') => Message::ToggleTheme,
        KeyCode::Char('?') => Message::ToggleHelp,
        _ => Message::None,
    }
}
