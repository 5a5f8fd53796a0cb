//! Sources of the current time.

use std::{
  sync::Arc,
  time::{
    Duration,
    Instant,
  },
};

use parking_lot::Mutex;

pub trait Clock {
  fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// A clock that only moves when told to. Clones share the same time, so a
/// test can keep one handle and give another to the code under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
  now: Arc<Mutex<Instant>>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self::starting_at(Instant::now())
  }

  pub fn starting_at(now: Instant) -> Self {
    Self {
      now: Arc::new(Mutex::new(now)),
    }
  }

  pub fn advance(&self, by: Duration) {
    *self.now.lock() += by;
  }

  /// Move to `to`; never goes backwards.
  pub fn set(&self, to: Instant) {
    let mut now = self.now.lock();
    if to > *now {
      *now = to;
    }
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    *self.now.lock()
  }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
  fn now(&self) -> Instant {
    (**self).now()
  }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
  fn now(&self) -> Instant {
    (**self).now()
  }
}
