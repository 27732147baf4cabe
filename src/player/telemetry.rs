//! Playback telemetry: duration and position scraped from player output.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Units of the raw position counter per second (omxplayer reports microseconds).
const RAW_UNITS_PER_SECOND: u64 = 1_000_000;

/// Render whole seconds as `HH:MM:SS`. Hours are not wrapped.
pub fn format_duration(value: u64) -> String {
  let hours = value / 3600;
  let minutes = (value - hours * 3600) / 60;
  let seconds = value - (hours * 3600 + minutes * 60);

  format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Current playback position.
///
/// Keeps the raw counter as emitted by the player next to the derived whole
/// seconds. Both cells are independent atomics; a reader may see a raw value
/// from one update and seconds from the next, never a torn word.
#[derive(Debug, Default)]
pub struct Position {
  raw: AtomicU64,
  seconds: AtomicU64,
}

impl Position {
  /// Store a raw counter value and recompute whole seconds.
  pub fn set(&self, raw: u64) {
    self.raw.store(raw, Ordering::Relaxed);
    self
      .seconds
      .store(raw / RAW_UNITS_PER_SECOND, Ordering::Relaxed);
  }

  pub fn raw(&self) -> u64 {
    self.raw.load(Ordering::Relaxed)
  }

  pub fn seconds(&self) -> u64 {
    self.seconds.load(Ordering::Relaxed)
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&format_duration(self.seconds()))
  }
}

/// Telemetry for one playback session, shared between the parser tasks and readers.
#[derive(Debug, Default)]
pub struct Telemetry {
  duration: AtomicU64,
  position: Position,
}

impl Telemetry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_duration(&self, seconds: u64) {
    self.duration.store(seconds, Ordering::Relaxed);
  }

  pub fn duration(&self) -> u64 {
    self.duration.load(Ordering::Relaxed)
  }

  pub fn position(&self) -> &Position {
    &self.position
  }

  /// Copy the current values.
  pub fn snapshot(&self) -> TelemetrySnapshot {
    TelemetrySnapshot {
      duration_seconds: self.duration(),
      position_seconds: self.position.seconds(),
    }
  }
}

/// Point-in-time copy of [`Telemetry`].
///
/// Position may exceed duration: duration can arrive late or never.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
  pub duration_seconds: u64,
  pub position_seconds: u64,
}

impl TelemetrySnapshot {
  pub fn duration(&self) -> String {
    format_duration(self.duration_seconds)
  }

  pub fn position(&self) -> String {
    format_duration(self.position_seconds)
  }
}
