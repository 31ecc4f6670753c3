//! Render functions for the TUI.
//!
//! Dispatches to the list or detail view and draws the shared tab and
//! status bars.

use crate::api::ListId;
use crate::app::{App, View};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame,
};

use super::{detail, list, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Spinner glyphs, one per frame.
pub(super) const SPINNER: [char; crate::app::SPINNER_FRAMES] =
    ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_tabs(f, app, chunks[0]);
    match app.view {
        View::List => list::render(f, app, chunks[1]),
        View::Detail => detail::render(f, app, chunks[1]),
    }
    status::render(f, app, chunks[2]);
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = ListId::ALL
        .iter()
        .map(|&list| {
            let page = &app.pages[list.index()];
            let marker = if page.loading {
                SPINNER[app.spinner_frame % SPINNER.len()]
            } else if page.error.is_some() {
                '!'
            } else {
                ' '
            };
            Line::from(vec![
                Span::raw(format!("{} ", list.index() + 1)),
                Span::raw(list.title()),
                Span::raw(format!(" {}", marker)),
            ])
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.active.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider("|");
    f.render_widget(tabs, area);
}
