//! TUI rendering: orchestrates all panes.

pub mod entry_form;
pub mod spot_grid;
pub mod vehicle_list;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::{App, Mode};

// ─── Root draw ───────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);

  if let Mode::Entry(form) = &app.mode {
    entry_form::draw(f, area, form);
  }
}

// ─── Header ──────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let time = Local::now().format("%H:%M:%S").to_string();

  let left = Span::styled(
    format!(" parkade  {}  cycle {}", app.backend.describe(), app.cycles),
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let state = if app.paused {
    Span::styled(" PAUSED ", Style::default().fg(Color::Black).bg(Color::Yellow))
  } else {
    Span::styled(
      format!(" every {}s ", app.tick_every.as_secs()),
      Style::default().fg(Color::Black).bg(Color::Green),
    )
  };
  let right = Span::styled(format!(" {time} "), Style::default().fg(Color::Gray));

  // Simple left-right header: pad the middle.
  let used = left.content.len() + state.content.len() + right.content.len();
  let pad = (area.width as usize).saturating_sub(used);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad)), state, right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ────────────────────────────────────────────────────────────────────

fn draw_body(f: &mut Frame, area: Rect, app: &App) {
  let Some(snapshot) = &app.snapshot else {
    f.render_widget(
      Paragraph::new("Loading…").style(Style::default().fg(Color::DarkGray)),
      area,
    );
    return;
  };

  // Left: spots and totals (40%). Right: vehicles by status (60%).
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
    .split(area);

  spot_grid::draw(f, cols[0], snapshot);
  vehicle_list::draw(f, cols[1], app, snapshot);
}

// ─── Status bar ──────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match &app.mode {
    Mode::Normal => ("NORMAL", "p pause  c cycle  i enter car  m or / filter  q quit"),
    Mode::Filter => ("FILTER", "Type a plate  Enter keep  Esc clear"),
    Mode::Entry(_) => ("ENTRY", "Tab next field  Enter admit  Esc cancel"),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(format!("  {status}"), Style::default().fg(Color::Gray));

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
