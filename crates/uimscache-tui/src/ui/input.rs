//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;

use crate::app::{
    can_add_password_char, can_add_uid_char, App, AppState, LoginFocus, PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::SigningIn => return handle_login_input(app, key).await,
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
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
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('1') => app.select_tab(0),
        KeyCode::Char('2') => app.select_tab(1),
        KeyCode::Left | KeyCode::BackTab => app.prev_tab(),
        KeyCode::Right | KeyCode::Tab => app.next_tab(),
        KeyCode::Esc | KeyCode::Backspace => {
            app.back();
        }
        KeyCode::Char('u') => app.refresh(),
        KeyCode::Char('l') => {
            if let Err(e) = app.sign_out() {
                warn!(error = %e, "Sign-out failed");
                app.status_message = Some(format!("Sign-out failed: {}", e));
            }
        }
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, |sel, _| sel.saturating_sub(1)),
        KeyCode::Down | KeyCode::Char('j') => move_selection(app, |sel, len| (sel + 1).min(len - 1)),
        KeyCode::PageUp => move_selection(app, |sel, _| sel.saturating_sub(PAGE_SCROLL_SIZE)),
        KeyCode::PageDown => {
            move_selection(app, |sel, len| (sel + PAGE_SCROLL_SIZE).min(len - 1))
        }
        KeyCode::Home => move_selection(app, |_, _| 0),
        KeyCode::End => move_selection(app, |_, len| len - 1),
        _ => {}
    }

    Ok(false)
}

/// Apply `step` to the current tab's selection. `step` is only called with
/// a non-empty list.
fn move_selection(app: &mut App, step: impl Fn(usize, usize) -> usize) {
    let len = app.list_len();
    if len == 0 {
        return;
    }
    let selection = app.selection_mut();
    *selection = step(*selection, len);
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit from the sign-in screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Uid => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Uid,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Uid | LoginFocus::Password => {
                app.login_focus = app.login_focus.next();
            }
            LoginFocus::Button => {
                // On failure login_error is set and the form stays up
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Uid => {
                app.login_uid.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Uid => {
                if can_add_uid_char(app.login_uid.chars().count(), c) {
                    app.login_uid.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use crossterm::event::KeyModifiers;
    use uimscache_core::api::ApiClient;
    use uimscache_core::config::Config;
    use uimscache_core::storage::{keys, KeyValueStore, MemoryStore};
    use uimscache_core::Tab;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn signed_in_app() -> App {
        let store = MemoryStore::with_entries([
            (keys::UID, "20BCS1234"),
            (
                keys::ATTENDANCE,
                r#"[{"Code":"A"},{"Code":"B"},{"Code":"C"}]"#,
            ),
            (keys::FULL_ATTENDANCE, "[]"),
            (keys::TIMETABLE, "[]"),
        ]);
        store
            .set(keys::TIMESTAMP, &Utc::now().timestamp_millis().to_string())
            .unwrap();
        let api = ApiClient::new("http://localhost:5000/api").unwrap();
        let mut app = App::with_store(Config::default(), Arc::new(store), api);
        app.activate().unwrap();
        app
    }

    #[tokio::test]
    async fn test_number_keys_select_tabs() {
        let mut app = signed_in_app();
        handle_input(&mut app, press(KeyCode::Char('2'))).await.unwrap();
        assert_eq!(app.current_tab(), Tab::Timetable);
        handle_input(&mut app, press(KeyCode::Char('1'))).await.unwrap();
        assert_eq!(app.current_tab(), Tab::Attendance);
        handle_input(&mut app, press(KeyCode::Right)).await.unwrap();
        assert_eq!(app.current_route().path(), "/dashboard/timetable");
    }

    #[tokio::test]
    async fn test_selection_stays_in_bounds() {
        let mut app = signed_in_app();
        for _ in 0..5 {
            handle_input(&mut app, press(KeyCode::Down)).await.unwrap();
        }
        assert_eq!(app.attendance_selection, 2);
        handle_input(&mut app, press(KeyCode::Home)).await.unwrap();
        assert_eq!(app.attendance_selection, 0);
        handle_input(&mut app, press(KeyCode::Up)).await.unwrap();
        assert_eq!(app.attendance_selection, 0);

        // Empty timetable ignores movement
        app.select_tab(1);
        handle_input(&mut app, press(KeyCode::End)).await.unwrap();
        assert_eq!(app.timetable_selection, 0);
    }

    #[tokio::test]
    async fn test_quit_confirmation() {
        let mut app = signed_in_app();
        assert!(!handle_input(&mut app, press(KeyCode::Char('q'))).await.unwrap());
        assert_eq!(app.state, AppState::ConfirmingQuit);
        assert!(!handle_input(&mut app, press(KeyCode::Char('n'))).await.unwrap());
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, press(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, press(KeyCode::Char('y'))).await.unwrap());
    }

    #[tokio::test]
    async fn test_login_form_typing() {
        let api = ApiClient::new("http://localhost:5000/api").unwrap();
        let mut app = App::with_store(Config::default(), Arc::new(MemoryStore::new()), api);
        app.login_uid.clear();
        app.activate().unwrap();
        assert_eq!(app.state, AppState::SigningIn);
        assert_eq!(app.login_focus, LoginFocus::Uid);

        for c in "20bcs 1".chars() {
            handle_input(&mut app, press(KeyCode::Char(c))).await.unwrap();
        }
        assert_eq!(app.login_uid, "20bcs1");

        handle_input(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Password);
        handle_input(&mut app, press(KeyCode::Char('p'))).await.unwrap();
        handle_input(&mut app, press(KeyCode::Backspace)).await.unwrap();
        assert!(app.login_password.is_empty());

        // Tab keys are form navigation here, not tab switching
        handle_input(&mut app, press(KeyCode::Char('2'))).await.unwrap();
        assert_eq!(app.login_password, "2");
        assert_eq!(app.current_tab(), Tab::Attendance);
    }
}
