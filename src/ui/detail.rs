use crate::app::App;
use crate::util::{format_bytes, strip_control_chars};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the article detail view.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let Some(article) = app.detail.as_ref() else {
        let paragraph = Paragraph::new("No article selected")
            .block(Block::default().borders(Borders::ALL).title("Article"));
        f.render_widget(paragraph, area);
        return;
    };

    let muted = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            strip_control_chars(&article.section).into_owned(),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(Span::styled(
            strip_control_chars(&article.title).into_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(strip_control_chars(&article.r#abstract).into_owned()),
        Line::from(""),
        Line::from(Span::styled(
            strip_control_chars(&article.byline).into_owned(),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Line::from(Span::styled(article.pretty_date(), muted)),
        Line::from(""),
    ];

    if let Some((media, _)) = article.lead_image() {
        let status = match article.image() {
            Some(bytes) => format!("[image {}]", format_bytes(bytes.len())),
            None => "[image not loaded]".to_string(),
        };
        lines.push(Line::from(Span::styled(status, Style::default().fg(Color::Green))));
        if !media.caption.is_empty() {
            lines.push(Line::from(strip_control_chars(&media.caption).into_owned()));
        }
        lines.push(Line::from(Span::styled(
            format!("© {}", strip_control_chars(&media.copyright)),
            muted,
        )));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(vec![
        Span::styled("Source: ", muted),
        Span::raw(strip_control_chars(&article.source).into_owned()),
    ]));
    lines.push(Line::from(Span::styled(
        article.url.to_string(),
        Style::default().fg(Color::Cyan),
    )));

    // clamp before rendering so a resize never shows an empty page
    let max_scroll = (lines.len() as u16).saturating_sub(area.height.saturating_sub(2));
    app.detail_scroll = app.detail_scroll.min(max_scroll);

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Article "))
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));

    f.render_widget(paragraph, area);
}
