//! Keyboard input handling for the TUI.
//!
//! Translates key events into local UI state changes or controller
//! `Action`s. Nothing in here talks to the network; remote work always goes
//! through `App::dispatch`.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{
    can_add_email_char, can_add_password_char, Action, App, AppState, LoginFocus, RowAction,
    PAGE_SCROLL_SIZE,
};
use crate::models::CitaStatus;

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle login overlay
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle install confirmation
    if matches!(app.state, AppState::ConfirmingInstall) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.confirm_install();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.decline_install();
            }
            _ => {}
        }
        return Ok(false);
    }

    // The empty-export warning blocks until acknowledged
    if matches!(app.state, AppState::ShowingExportWarning) {
        app.state = AppState::Normal;
        return Ok(false);
    }

    // Handle search mode
    if matches!(app.state, AppState::Searching) {
        return handle_search_input(app, key);
    }

    // Handle date filter editing
    if matches!(app.state, AppState::EditingDateFilter) {
        return handle_date_filter_input(app, key);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
            app.selection = 0;
        }
        KeyCode::Char('f') => {
            app.state = AppState::EditingDateFilter;
        }
        KeyCode::Char('s') => {
            app.filter_status = CitaStatus::next_filter(app.filter_status);
        }
        KeyCode::Char('a') | KeyCode::Char('r') => {
            app.dispatch(Action::Load);
        }
        KeyCode::Char('c') => {
            app.dispatch(Action::ClearFilters);
        }
        KeyCode::Char('e') => {
            app.dispatch(Action::Export);
        }
        KeyCode::Char('i') => {
            app.request_install();
        }
        KeyCode::Char('L') => {
            app.dispatch(Action::Logout);
        }
        KeyCode::Up => app.move_selection_up(1),
        KeyCode::Down => app.move_selection_down(1),
        KeyCode::PageUp => app.move_selection_up(PAGE_SCROLL_SIZE),
        KeyCode::PageDown => app.move_selection_down(PAGE_SCROLL_SIZE),
        KeyCode::Enter => {
            if let Some(id) = app.selected_cita_id() {
                app.dispatch(Action::Row {
                    id,
                    action: RowAction::Confirm,
                });
            }
        }
        KeyCode::Char('x') | KeyCode::Delete => {
            if let Some(id) = app.selected_cita_id() {
                app.dispatch(Action::Row {
                    id,
                    action: RowAction::Cancel,
                });
            }
        }
        _ => {}
    }

    Ok(false)
}

/// Search narrows the visible rows live; every keystroke re-renders
fn handle_search_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => {
            app.search_query.pop();
            app.selection = 0;
        }
        KeyCode::Char(c) => {
            app.search_query.push(c);
            app.selection = 0;
        }
        _ => {}
    }
    Ok(false)
}

/// The date filter takes an ISO date; it is applied on the next load
fn handle_date_filter_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
            app.dispatch(Action::Load);
        }
        KeyCode::Backspace => {
            app.filter_date.pop();
        }
        KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => {
            app.filter_date.push(c);
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Tab | KeyCode::Down => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => {
                app.login_focus = LoginFocus::Password;
            }
            LoginFocus::Password | LoginFocus::Button => {
                // Errors surface in the overlay; the loop keeps running
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email if can_add_email_char(&app.login_email) => {
                app.login_email.push(c);
            }
            LoginFocus::Password if can_add_password_char(&app.login_password) => {
                app.login_password.push(c);
            }
            _ => {}
        },
        _ => {}
    }
    Ok(false)
}
