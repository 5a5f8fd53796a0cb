//! A queue of named one-shot timers.
//!
//! Each timer kind has at most one live deadline. Arming a kind again replaces
//! the previous deadline and invalidates its [`TimerHandle`], so a stale handle
//! can never cancel or observe the newer timer. Nothing fires on its own: the
//! owner polls [`Timers::pop_expired`] with the current time whenever the host
//! wakes it up, typically at [`Timers::next_deadline`].

use std::{
  hash::Hash,
  time::{
    Duration,
    Instant,
  },
};

use foldhash::fast::RandomState;
use hashbrown::HashMap;

/// Identifies one arming of a timer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle<K> {
  pub kind:   K,
  generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
  deadline:   Instant,
  generation: u64,
}

#[derive(Debug, Clone)]
pub struct Timers<K> {
  entries:    HashMap<K, Entry, RandomState>,
  generation: u64,
}

impl<K> Default for Timers<K> {
  fn default() -> Self {
    Self {
      entries:    HashMap::with_hasher(RandomState::default()),
      generation: 0,
    }
  }
}

impl<K: Copy + Eq + Hash> Timers<K> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Arm `kind` to fire at `deadline`, replacing any earlier arming.
  pub fn arm(&mut self, kind: K, deadline: Instant) -> TimerHandle<K> {
    self.generation += 1;
    self.entries.insert(kind, Entry {
      deadline,
      generation: self.generation,
    });
    TimerHandle {
      kind,
      generation: self.generation,
    }
  }

  pub fn arm_after(&mut self, kind: K, now: Instant, delay: Duration) -> TimerHandle<K> {
    self.arm(kind, now + delay)
  }

  /// Disarm `kind`. Returns whether a timer was armed.
  pub fn cancel(&mut self, kind: K) -> bool {
    self.entries.remove(&kind).is_some()
  }

  /// Disarm the timer only if `handle` is still its current arming.
  pub fn cancel_handle(&mut self, handle: TimerHandle<K>) -> bool {
    if self.is_current(handle) {
      self.entries.remove(&handle.kind);
      true
    } else {
      false
    }
  }

  pub fn is_current(&self, handle: TimerHandle<K>) -> bool {
    self
      .entries
      .get(&handle.kind)
      .is_some_and(|entry| entry.generation == handle.generation)
  }

  pub fn is_armed(&self, kind: K) -> bool {
    self.entries.contains_key(&kind)
  }

  pub fn deadline(&self, kind: K) -> Option<Instant> {
    self.entries.get(&kind).map(|entry| entry.deadline)
  }

  pub fn next_deadline(&self) -> Option<Instant> {
    self.entries.values().map(|entry| entry.deadline).min()
  }

  /// Counter of the most recent arming. Pass it to
  /// [`Timers::pop_expired_armed_by`] to leave timers armed later for the
  /// next poll.
  pub fn epoch(&self) -> u64 {
    self.generation
  }

  /// Remove and return the earliest timer whose deadline is at or before
  /// `now`. Timers with equal deadlines fire in the order they were armed.
  pub fn pop_expired(&mut self, now: Instant) -> Option<TimerHandle<K>> {
    self.pop_expired_armed_by(now, u64::MAX)
  }

  /// Like [`Timers::pop_expired`], but ignores timers armed after `epoch`.
  pub fn pop_expired_armed_by(&mut self, now: Instant, epoch: u64) -> Option<TimerHandle<K>> {
    let (&kind, entry) = self
      .entries
      .iter()
      .filter(|(_, entry)| entry.deadline <= now && entry.generation <= epoch)
      .min_by_key(|(_, entry)| (entry.deadline, entry.generation))?;
    let handle = TimerHandle {
      kind,
      generation: entry.generation,
    };
    self.entries.remove(&kind);
    Some(handle)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}
