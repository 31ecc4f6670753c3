use crate::app::{App, SlotImage};
use crate::util::{format_bytes, strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

/// Lines per row: section, title + abstract, image line, separator.
pub(super) const ROW_HEIGHT: usize = 4;

/// Render the ranked list of the active tab.
///
/// Also records how many rows fit so slots can be bound after the draw.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let inner_height = area.height.saturating_sub(2) as usize;
    app.viewport_rows = (inner_height / ROW_HEIGHT).max(1);
    let rows = app.viewport_rows;
    app.page_mut().ensure_visible(rows);

    let page = app.page();
    let title = format!(" {} ", page.list.title());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    if page.articles.is_empty() {
        let (text, style) = if page.loading {
            ("Loading...".to_string(), Style::default().fg(Color::Gray))
        } else if let Some(error) = &page.error {
            (
                format!("Failed to load: {}\n\nPress r to try again.", error),
                Style::default().fg(Color::Red),
            )
        } else {
            ("No articles".to_string(), Style::default().fg(Color::Gray))
        };
        let paragraph = Paragraph::new(text)
            .style(style)
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = page
        .visible(rows)
        .map(|(slot, article)| {
            let index = page.offset + slot.0;
            let selected = index == page.selected;

            let rank_style = Style::default().fg(Color::DarkGray);
            let section_style = Style::default().fg(Color::Yellow);
            let title_style = if selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };

            let title = strip_control_chars(&article.title);
            let abstract_text = strip_control_chars(&article.r#abstract);
            let title_width = unicode_width::UnicodeWidthStr::width(title.as_ref());
            let abstract_room = width.saturating_sub(title_width + 1);

            let mut lines = vec![
                Line::from(vec![
                    Span::styled(format!("{:>2}. ", index + 1), rank_style),
                    Span::styled(
                        strip_control_chars(&article.section).into_owned(),
                        section_style,
                    ),
                ]),
                Line::from(vec![
                    Span::styled(truncate_to_width(&title, width).into_owned(), title_style),
                    Span::raw(" "),
                    Span::styled(
                        truncate_to_width(&abstract_text, abstract_room).into_owned(),
                        Style::default().fg(Color::Gray),
                    ),
                ]),
            ];

            let image_line = match page.slots.get(&slot) {
                Some(paint) if paint.article_id == article.id => match &paint.image {
                    SlotImage::Loaded(bytes) => {
                        Some((format!("[image {}]", format_bytes(bytes.len())), Color::Green))
                    }
                    SlotImage::Loading { .. } => Some(("[loading image]".to_string(), Color::Gray)),
                    // a failed load paints like an article without image
                    SlotImage::Failed | SlotImage::None => None,
                },
                // not bound yet (first frame after a change)
                _ => article
                    .lead_image()
                    .map(|_| ("[loading image]".to_string(), Color::Gray)),
            };

            let mut image_spans = Vec::new();
            if let Some((text, color)) = image_line {
                image_spans.push(Span::styled(text, Style::default().fg(color)));
                if let Some((media, _)) = article.lead_image() {
                    image_spans.push(Span::styled(
                        format!(" © {}", strip_control_chars(&media.copyright)),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            lines.push(Line::from(image_spans));
            lines.push(Line::from(""));

            ListItem::new(lines)
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}
