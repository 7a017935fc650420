//! Time source for freshness checks.

use chrono::{DateTime, Utc};

/// Supplies the current time to the cache layer.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  /// Current time in milliseconds since the Unix epoch.
  fn now_ms(&self) -> i64 {
    self.now().timestamp_millis()
  }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
  now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn at_ms(ms: i64) -> Self {
    Self {
      now: std::sync::Mutex::new(DateTime::from_timestamp_millis(ms).unwrap()),
    }
  }

  pub fn advance(&self, by: chrono::Duration) {
    *self.now.lock().unwrap() += by;
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}
