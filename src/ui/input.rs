//! Input handling for the TUI.
//!
//! Keys are resolved through the keybinding registry for the current view
//! and dispatched to the list or detail handler.

use crate::api::ListId;
use crate::app::{App, View};
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crossterm::event::{KeyCode, KeyModifiers};

use super::helpers::{open_in_browser, spawn_list_load};
use super::Action;

/// Lines scrolled per page in the detail view.
const DETAIL_PAGE_LINES: i32 = 10;

/// Main input dispatch function.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    let context = match app.view {
        View::List => KbContext::List,
        View::Detail => KbContext::Detail,
    };
    let Some(action) = app.keybindings.action_for_key(code, modifiers, context) else {
        return Action::Continue;
    };

    if action == KbAction::Quit {
        return Action::Quit;
    }

    match app.view {
        View::List => handle_list_action(app, action),
        View::Detail => handle_detail_action(app, action),
    }
    Action::Continue
}

/// Shows `list`, starting its first load if it was never visited.
pub(super) fn show_list(app: &mut App, list: ListId) {
    if app.switch_to(list) {
        spawn_list_load(app, list);
    }
}

fn handle_list_action(app: &mut App, action: KbAction) {
    let rows = app.viewport_rows;
    match action {
        KbAction::NavDown => app.page_mut().select_next(),
        KbAction::NavUp => app.page_mut().select_prev(),
        KbAction::PageDown => app.page_mut().page_down(rows),
        KbAction::PageUp => app.page_mut().page_up(rows),
        KbAction::First => app.page_mut().select_first(),
        KbAction::Last => app.page_mut().select_last(),
        KbAction::NextList => {
            let next = app.next_list();
            show_list(app, next);
        }
        KbAction::PrevList => {
            let prev = app.prev_list();
            show_list(app, prev);
        }
        KbAction::ShowEmailed => show_list(app, ListId::Emailed),
        KbAction::ShowShared => show_list(app, ListId::Shared),
        KbAction::ShowViewed => show_list(app, ListId::Viewed),
        KbAction::Select => {
            if !app.enter_detail() && !app.page().articles.is_empty() {
                app.set_status("Article is no longer in the list");
            }
        }
        KbAction::Retry => {
            let list = app.active;
            if app.page().loading {
                app.set_status("Already loading...");
            } else if spawn_list_load(app, list) {
                app.page_mut().error = None;
            }
        }
        KbAction::OpenInBrowser => {
            if let Some(article) = app.page().selected_article().cloned() {
                open_in_browser(app, &article);
            }
        }
        KbAction::Back | KbAction::Quit => {}
    }
    app.page_mut().ensure_visible(rows);
}

fn handle_detail_action(app: &mut App, action: KbAction) {
    match action {
        KbAction::Back => app.exit_detail(),
        KbAction::NavDown => app.scroll_detail(1),
        KbAction::NavUp => app.scroll_detail(-1),
        KbAction::PageDown => app.scroll_detail(DETAIL_PAGE_LINES),
        KbAction::PageUp => app.scroll_detail(-DETAIL_PAGE_LINES),
        KbAction::OpenInBrowser => {
            if let Some(article) = app.detail.clone() {
                open_in_browser(app, &article);
            }
        }
        KbAction::NextList
        | KbAction::PrevList
        | KbAction::ShowEmailed
        | KbAction::ShowShared
        | KbAction::ShowViewed => {
            app.exit_detail();
            handle_list_action(app, action);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::Pipeline;
    use secrecy::SecretString;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::channel(8);
        let pipeline = Pipeline::with_api_key(
            &Config {
                // unroutable; loads spawned by these tests fail without touching the network
                base_url: "http://127.0.0.1:9/v2".to_string(),
                request_timeout_secs: 1,
                ..Config::default()
            },
            SecretString::from("k".to_string()),
            tx,
        )
        .unwrap();
        App::new(Arc::new(pipeline), ListId::Emailed)
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = test_app();
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('q'), KeyModifiers::NONE),
            Action::Quit
        ));
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL),
            Action::Quit
        ));
    }

    #[tokio::test]
    async fn test_tab_switch_triggers_first_load_once() {
        let mut app = test_app();
        handle_input(&mut app, KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.active, ListId::Shared);
        assert!(app.page().visited);
        assert!(app.page().loading);
        assert!(app.load_handles[ListId::Shared.index()].is_some());

        handle_input(&mut app, KeyCode::Char('3'), KeyModifiers::NONE);
        assert_eq!(app.active, ListId::Viewed);
        handle_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE);
        assert_eq!(app.active, ListId::Shared);
    }

    #[tokio::test]
    async fn test_unbound_key_is_ignored() {
        let mut app = test_app();
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('z'), KeyModifiers::NONE),
            Action::Continue
        ));
        assert_eq!(app.view, View::List);
    }

    #[tokio::test]
    async fn test_esc_leaves_detail() {
        let mut app = test_app();
        app.view = View::Detail;
        handle_input(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.view, View::List);
    }

    #[tokio::test]
    async fn test_detail_scroll() {
        let mut app = test_app();
        app.view = View::Detail;
        handle_input(&mut app, KeyCode::Char('j'), KeyModifiers::NONE);
        handle_input(&mut app, KeyCode::PageDown, KeyModifiers::NONE);
        assert_eq!(app.detail_scroll, 11);
        handle_input(&mut app, KeyCode::PageUp, KeyModifiers::NONE);
        handle_input(&mut app, KeyCode::PageUp, KeyModifiers::NONE);
        assert_eq!(app.detail_scroll, 0);
    }
}
