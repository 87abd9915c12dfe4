//! Spot grid pane: five spots per row, plus occupancy and takings.

use parkade_core::projector::{OccupancyLabel, StateSnapshot};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Gauge, Paragraph},
};

pub const SPOTS_PER_ROW: usize = 5;

/// Render the grid and totals into `area`.
pub fn draw(f: &mut Frame, area: Rect, snapshot: &StateSnapshot) {
  let block = Block::default()
    .title(format!(" Spots ({}) ", snapshot.spots.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // occupancy gauge
      Constraint::Length(2), // counts
      Constraint::Min(0),    // grid
    ])
    .split(inner);

  let color = label_color(snapshot.occupancy_label);
  let gauge = Gauge::default()
    .gauge_style(Style::default().fg(color).bg(Color::Black))
    .ratio((snapshot.occupancy_percent / 100.0).clamp(0.0, 1.0))
    .label(format!(
      "{:.1}% {}",
      snapshot.occupancy_percent,
      snapshot.occupancy_label.as_str()
    ));
  f.render_widget(gauge, rows[0]);

  let counts = &snapshot.counts;
  let totals = vec![
    Line::from(format!(
      "entering {}  parked {}  leaving {}  left {}",
      counts.entering, counts.parked, counts.leaving, counts.has_left
    )),
    Line::from(Span::styled(
      format!("takings ${:.2}", counts.total_cash),
      Style::default().add_modifier(Modifier::BOLD),
    )),
  ];
  f.render_widget(Paragraph::new(totals), rows[1]);

  let grid: Vec<Line> = snapshot
    .spots
    .chunks(SPOTS_PER_ROW)
    .map(|row| {
      Line::from(
        row
          .iter()
          .map(|spot| {
            let style = if spot.occupied {
              Style::default().fg(Color::Black).bg(Color::Red)
            } else {
              Style::default().fg(Color::Black).bg(Color::Green)
            };
            Span::styled(format!(" {:>3} ", spot.number), style)
          })
          .flat_map(|cell| [cell, Span::raw(" ")])
          .collect::<Vec<_>>(),
      )
    })
    .collect();
  f.render_widget(Paragraph::new(grid), rows[2]);
}

fn label_color(label: OccupancyLabel) -> Color {
  match label {
    OccupancyLabel::Available => Color::Green,
    OccupancyLabel::HalfFull => Color::Yellow,
    OccupancyLabel::Full => Color::Red,
  }
}
