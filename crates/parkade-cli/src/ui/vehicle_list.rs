//! Vehicle pane: current vehicles grouped by status, then finished visits
//! with their duration and cost.

use parkade_core::{event::VehicleEvent, projector::StateSnapshot};
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, Mode};

/// Render the vehicle lists into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App, snapshot: &StateSnapshot) {
  let title = if app.filter.is_empty() {
    " Vehicles ".to_string()
  } else {
    format!(" Vehicles matching {:?} ", app.filter)
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let mut inner = block.inner(area);
  f.render_widget(block, area);

  // Filter bar at the bottom while typing.
  if app.mode == Mode::Filter && inner.height > 2 {
    let filter_area = Rect {
      x:      inner.x,
      y:      inner.y + inner.height - 1,
      width:  inner.width,
      height: 1,
    };
    inner.height -= 1;
    f.render_widget(
      Paragraph::new(format!("/{}_", app.filter)).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  let mut lines: Vec<Line> = Vec::new();
  section(&mut lines, "Entering", Color::Cyan, &app.matching(&snapshot.entering), |_| {
    String::new()
  });
  section(&mut lines, "Parked", Color::Green, &app.matching(&snapshot.parked), |v| {
    v.spot.map(|n| format!("spot {n}")).unwrap_or_default()
  });
  section(&mut lines, "Leaving", Color::Yellow, &app.matching(&snapshot.leaving), |_| {
    String::new()
  });

  lines.push(heading("Departed", Color::Magenta, snapshot.finished_sessions.len()));
  // Most recent visit first.
  for session in snapshot
    .finished_sessions
    .iter()
    .rev()
    .filter(|s| app.filter.is_empty() || plate_matches(app, &s.license_plate))
  {
    lines.push(Line::from(vec![
      Span::raw(format!("  {:<15}", session.license_plate)),
      Span::styled(
        format!("{:>6}s  ${:.2}", session.seconds, session.cost),
        Style::default().fg(Color::Gray),
      ),
    ]));
  }

  f.render_widget(Paragraph::new(lines), inner);
}

fn plate_matches(app: &App, plate: &str) -> bool {
  use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
  SkimMatcherV2::default().fuzzy_match(plate, &app.filter).is_some()
}

fn heading(label: &str, color: Color, count: usize) -> Line<'static> {
  Line::from(Span::styled(
    format!("{label} ({count})"),
    Style::default().fg(color).add_modifier(Modifier::BOLD),
  ))
}

fn section(
  lines: &mut Vec<Line<'static>>,
  label: &str,
  color: Color,
  vehicles: &[&VehicleEvent],
  extra: impl Fn(&VehicleEvent) -> String,
) {
  lines.push(heading(label, color, vehicles.len()));
  for &vehicle in vehicles {
    let v = &vehicle.vehicle;
    let mut description = [v.color.as_str(), v.model.as_str()]
      .into_iter()
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(" ");
    if let Some(year) = v.year {
      description.push_str(&format!(" {year}"));
    }
    lines.push(Line::from(vec![
      Span::raw(format!("  {:<15}", v.license_plate)),
      Span::styled(format!("{description:<24}"), Style::default().fg(Color::Gray)),
      Span::raw(extra(vehicle)),
    ]));
  }
  lines.push(Line::from(""));
}
