use crate::app::{App, View};
use crate::keybindings::{Action, Context};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

use super::render::SPINNER;

const LIST_HINTS: &[Action] = &[
    Action::NavDown,
    Action::NavUp,
    Action::Select,
    Action::OpenInBrowser,
    Action::NextList,
    Action::Retry,
    Action::Quit,
];

const DETAIL_HINTS: &[Action] = &[
    Action::Back,
    Action::NavDown,
    Action::NavUp,
    Action::OpenInBrowser,
    Action::Quit,
];

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let page = app.page();
    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if page.loading {
        Cow::Owned(format!(
            "{} Loading {}...",
            SPINNER[app.spinner_frame % SPINNER.len()],
            page.list.title()
        ))
    } else {
        let (context, actions) = match app.view {
            View::List => (Context::List, LIST_HINTS),
            View::Detail => (Context::Detail, DETAIL_HINTS),
        };
        Cow::Owned(app.keybindings.hint_line(context, actions))
    };

    let style = if app.status_message.is_some() && page.error.is_some() {
        Style::default().bg(Color::Red).fg(Color::White)
    } else {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ListId;
    use crate::config::Config;
    use crate::pipeline::Pipeline;
    use ratatui::{backend::TestBackend, Terminal};
    use secrecy::SecretString;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn status_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 1)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                render(f, app, area);
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_hints_show_overridden_keys() {
        let (tx, _rx) = mpsc::channel(8);
        let pipeline = Pipeline::with_api_key(
            &Config {
                base_url: "https://api.example.com/v2".to_string(),
                ..Config::default()
            },
            SecretString::from("k".to_string()),
            tx,
        )
        .unwrap();
        let mut app = App::new(Arc::new(pipeline), ListId::Emailed);
        assert!(status_text(&app).contains("[r]reload"));

        let overrides = HashMap::from([("retry".to_string(), "R".to_string())]);
        assert!(app.keybindings.apply_overrides(&overrides).is_empty());

        let text = status_text(&app);
        assert!(text.contains("[R]reload"));
        assert!(!text.contains("[r]"));
    }
}
