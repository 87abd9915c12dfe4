//! Manual entry popup.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::{ENTRY_FIELDS, EntryForm};

/// Render the form centred over `area`.
pub fn draw(f: &mut Frame, area: Rect, form: &EntryForm) {
  let width = 44.min(area.width);
  let height = (ENTRY_FIELDS.len() as u16 + 2).min(area.height);
  let popup = Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  };

  let block = Block::default()
    .title(" Enter a car ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(popup);
  f.render_widget(Clear, popup);
  f.render_widget(block, popup);

  let lines: Vec<Line> = ENTRY_FIELDS
    .iter()
    .zip(&form.values)
    .enumerate()
    .map(|(i, (label, value))| {
      let focused = i == form.focus;
      let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(Color::Gray)
      };
      let cursor = if focused { "_" } else { "" };
      Line::from(vec![
        Span::styled(format!("{label:<7}"), label_style),
        Span::raw(format!("{value}{cursor}")),
      ])
    })
    .collect();

  f.render_widget(Paragraph::new(lines), inner);
}
