//! Application state machine and event dispatcher.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use parkade_core::{
  event::{NewVehicle, VehicleEvent},
  projector::StateSnapshot,
  traffic::CycleReport,
};

use crate::sim::Backend;

// ─── Mode ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  /// Typing a plate filter.
  Filter,
  /// The manual entry form is open.
  Entry(EntryForm),
}

// ─── Entry form ──────────────────────────────────────────────────────────────

pub const ENTRY_FIELDS: [&str; 4] = ["Plate", "Model", "Color", "Year"];

/// Manual vehicle entry: plate, model, color and year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryForm {
  pub values: [String; 4],
  pub focus:  usize,
}

impl EntryForm {
  pub fn next_field(&mut self) { self.focus = (self.focus + 1) % ENTRY_FIELDS.len(); }

  pub fn prev_field(&mut self) {
    self.focus = (self.focus + ENTRY_FIELDS.len() - 1) % ENTRY_FIELDS.len();
  }

  /// Build the request. Blank optional fields are left unset; the year must
  /// be a number when given. The plate is validated by the store.
  pub fn to_vehicle(&self) -> Result<NewVehicle, String> {
    let optional = |s: &str| {
      let s = s.trim();
      (!s.is_empty()).then(|| s.to_owned())
    };

    let year = match optional(&self.values[3]) {
      None => None,
      Some(raw) => Some(
        raw
          .parse::<u16>()
          .map_err(|_| format!("year must be a number, got {raw:?}"))?,
      ),
    };

    Ok(NewVehicle {
      license_plate: self.values[0].clone(),
      model: optional(&self.values[1]),
      color: optional(&self.values[2]),
      year,
    })
  }
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub mode: Mode,

  /// Where cycles run and state comes from.
  pub backend: Backend,

  /// Latest snapshot; `None` until the first successful load.
  pub snapshot: Option<StateSnapshot>,

  /// Result of the most recent cycle.
  pub last_report: Option<CycleReport>,

  /// Cycles run since startup.
  pub cycles: u64,

  /// Automatic ticking suspended.
  pub paused: bool,

  pub tick_every: Duration,

  last_tick: Instant,

  /// Plate filter (fuzzy).
  pub filter: String,

  /// One-line status message shown in the status bar.
  pub status_msg: String,
}

impl App {
  pub fn new(backend: Backend, tick_every: Duration) -> Self {
    Self {
      mode: Mode::Normal,
      backend,
      snapshot: None,
      last_report: None,
      cycles: 0,
      paused: false,
      tick_every,
      last_tick: Instant::now(),
      filter: String::new(),
      status_msg: String::new(),
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────

  /// Re-read the facility state.
  pub async fn refresh(&mut self) -> anyhow::Result<()> {
    match self.backend.snapshot().await {
      Ok(snapshot) => {
        self.snapshot = Some(snapshot);
        Ok(())
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        Err(e)
      }
    }
  }

  /// Run one cycle now and refresh. Failures land in the status bar.
  pub async fn run_cycle(&mut self) {
    self.last_tick = Instant::now();
    match self.backend.tick().await {
      Ok(report) => {
        self.cycles += 1;
        self.last_report = Some(report);
        self.status_msg = format!(
          "Cycle {}: {} parked, {} turned away, {} left, {} arrived, {} departing",
          self.cycles,
          report.outcome.parked,
          report.outcome.turned_away,
          report.outcome.leaving_resolved,
          report.arrivals,
          report.departures,
        );
        tracing::debug!(cycle = self.cycles, "cycle complete");
      }
      Err(e) => {
        tracing::warn!(error = %e, "cycle failed");
        self.status_msg = format!("Error: {e}");
        return;
      }
    }
    let _ = self.refresh().await;
  }

  /// Called by the event loop between key presses.
  pub async fn on_tick(&mut self) {
    if !self.paused && self.last_tick.elapsed() >= self.tick_every {
      self.run_cycle().await;
    }
  }

  // ── Filtered lists ────────────────────────────────────────────────────

  /// `vehicles` whose plate matches the current filter.
  pub fn matching<'a>(&self, vehicles: &'a [VehicleEvent]) -> Vec<&'a VehicleEvent> {
    if self.filter.is_empty() {
      return vehicles.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    vehicles
      .iter()
      .filter(|v| matcher.fuzzy_match(&v.vehicle.license_plate, &self.filter).is_some())
      .collect()
  }

  // ── Key handling ──────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    match self.mode {
      Mode::Normal => self.handle_normal_key(key).await,
      Mode::Filter => Ok(self.handle_filter_key(key)),
      Mode::Entry(_) => self.handle_entry_key(key).await,
    }
  }

  async fn handle_normal_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),

      KeyCode::Char('p') => {
        self.paused = !self.paused;
        self.status_msg = if self.paused { "Paused".into() } else { "Resumed".into() };
      }

      KeyCode::Char('c') => self.run_cycle().await,

      KeyCode::Char('i') => {
        self.mode = Mode::Entry(EntryForm::default());
        self.status_msg.clear();
      }

      KeyCode::Char('m') | KeyCode::Char('/') => {
        self.mode = Mode::Filter;
        self.filter.clear();
      }

      KeyCode::Esc => self.filter.clear(),

      _ => {}
    }
    Ok(true)
  }

  fn handle_filter_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.filter.clear();
      }
      KeyCode::Enter => self.mode = Mode::Normal,
      KeyCode::Backspace => {
        self.filter.pop();
      }
      KeyCode::Char(c) => self.filter.push(c),
      _ => {}
    }
    true
  }

  async fn handle_entry_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    let Mode::Entry(form) = &mut self.mode else {
      return Ok(true);
    };

    match key.code {
      KeyCode::Esc => self.mode = Mode::Normal,
      KeyCode::Tab | KeyCode::Down => form.next_field(),
      KeyCode::BackTab | KeyCode::Up => form.prev_field(),
      KeyCode::Backspace => {
        form.values[form.focus].pop();
      }
      KeyCode::Char(c) => form.values[form.focus].push(c),
      KeyCode::Enter => {
        let form = form.clone();
        self.submit_entry(form).await;
      }
      _ => {}
    }
    Ok(true)
  }

  /// Admit the vehicle described by `form`. On failure the form stays open
  /// so the input can be corrected.
  async fn submit_entry(&mut self, form: EntryForm) {
    let vehicle = match form.to_vehicle() {
      Ok(vehicle) => vehicle,
      Err(message) => {
        self.status_msg = message;
        return;
      }
    };

    match self.backend.admit(vehicle).await {
      Ok(event) => {
        self.status_msg = format!("Admitted {}", event.vehicle.license_plate);
        self.mode = Mode::Normal;
        let _ = self.refresh().await;
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use parkade_core::{event::VehicleStatus, memory::MemoryStore};

  use super::*;

  fn app(capacity: u32) -> App {
    App::new(Backend::local(MemoryStore::new(capacity)), Duration::from_secs(3600))
  }

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  async fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
      app.handle_key(key(KeyCode::Char(c))).await.unwrap();
    }
  }

  #[tokio::test]
  async fn p_toggles_pause_and_q_quits() {
    let mut app = app(2);
    assert!(app.handle_key(key(KeyCode::Char('p'))).await.unwrap());
    assert!(app.paused);
    app.handle_key(key(KeyCode::Char('p'))).await.unwrap();
    assert!(!app.paused);
    assert!(!app.handle_key(key(KeyCode::Char('q'))).await.unwrap());
  }

  #[tokio::test]
  async fn c_runs_a_cycle_with_local_traffic() {
    let mut app = app(3);
    app.handle_key(key(KeyCode::Char('c'))).await.unwrap();

    assert_eq!(app.cycles, 1);
    let report = app.last_report.unwrap();
    assert!(report.arrivals >= 1);
    assert_eq!(app.snapshot.as_ref().unwrap().counts.entering, report.arrivals);
  }

  #[tokio::test]
  async fn entry_form_admits_a_vehicle() {
    let mut app = app(2);
    app.handle_key(key(KeyCode::Char('i'))).await.unwrap();
    type_text(&mut app, "XYZ-321").await;
    app.handle_key(key(KeyCode::Tab)).await.unwrap();
    type_text(&mut app, "Civic").await;
    app.handle_key(key(KeyCode::Tab)).await.unwrap();
    app.handle_key(key(KeyCode::Tab)).await.unwrap();
    type_text(&mut app, "2020").await;
    app.handle_key(key(KeyCode::Enter)).await.unwrap();

    assert_eq!(app.mode, Mode::Normal);
    let entering = &app.snapshot.as_ref().unwrap().entering;
    assert_eq!(entering.len(), 1);
    assert_eq!(entering[0].status, VehicleStatus::Entering);
    assert_eq!(entering[0].vehicle.license_plate, "XYZ-321");
    assert_eq!(entering[0].vehicle.model, "Civic");
    assert_eq!(entering[0].vehicle.year, Some(2020));
  }

  #[tokio::test]
  async fn rejected_entry_keeps_the_form_open() {
    let mut app = app(2);
    app.handle_key(key(KeyCode::Char('i'))).await.unwrap();
    app.handle_key(key(KeyCode::Enter)).await.unwrap();

    assert!(matches!(app.mode, Mode::Entry(_)));
    assert!(app.status_msg.contains("license plate"));
  }

  #[tokio::test]
  async fn filter_matches_plates() {
    let mut app = app(2);
    for plate in ["ABC-123", "XYZ-789"] {
      app.backend.admit(NewVehicle::new(plate)).await.unwrap();
    }
    app.refresh().await.unwrap();

    app.handle_key(key(KeyCode::Char('m'))).await.unwrap();
    type_text(&mut app, "xyz").await;
    app.handle_key(key(KeyCode::Enter)).await.unwrap();

    let entering = app.snapshot.as_ref().unwrap().entering.clone();
    let shown = app.matching(&entering);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].vehicle.license_plate, "XYZ-789");

    app.handle_key(key(KeyCode::Esc)).await.unwrap();
    assert_eq!(app.matching(&entering).len(), 2);
  }

  #[test]
  fn year_must_be_numeric() {
    let mut form = EntryForm::default();
    form.values[0] = "ABC-123".into();
    form.values[3] = "soon".into();
    assert!(form.to_vehicle().is_err());

    form.values[3] = " ".into();
    assert_eq!(form.to_vehicle().unwrap().year, None);
  }
}
