//! Time source for event timestamps.
//!
//! Stores read the clock once per operation, so every event appended by one
//! cycle pass shares a timestamp; the event log's `seq` orders them.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, SubsecRound, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time truncated to microseconds, the precision the SQLite store
/// persists.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct ManualClock {
  start:         DateTime<Utc>,
  offset_micros: AtomicI64,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { start: start.trunc_subsecs(6), offset_micros: AtomicI64::new(0) }
  }

  /// Move forward by `by`. Saturates at the latest representable time
  /// instead of wrapping.
  pub fn advance(&self, by: Duration) {
    let micros = by.num_microseconds().unwrap_or(i64::MAX);
    let _ = self
      .offset_micros
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |offset| {
        Some(offset.saturating_add(micros))
      });
  }

  pub fn set(&self, to: DateTime<Utc>) {
    let micros = (to - self.start).num_microseconds().unwrap_or(i64::MAX);
    self.offset_micros.store(micros, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    let offset = Duration::microseconds(self.offset_micros.load(Ordering::SeqCst));
    self.start.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn manual_clock_moves_only_when_told() {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    assert_eq!(clock.now(), start);

    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now(), start + Duration::seconds(90));

    clock.set(start);
    assert_eq!(clock.now(), start);
  }

  #[test]
  fn manual_clock_saturates_instead_of_wrapping() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());

    clock.advance(Duration::days(1_000_000_000));
    clock.advance(Duration::days(1_000_000_000));
    assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);

    clock.advance(Duration::seconds(1));
    assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
  }
}
