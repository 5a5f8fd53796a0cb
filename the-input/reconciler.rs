//! The per-editor input reconciler.
//!
//! [`InputReconciler`] owns everything buffered between the platform and the
//! document: pending diffs, the pending action, the pending selection and
//! insertion marks, the composition flag, and the timers deciding when a
//! flush happens. The host drives it with discrete events (edit intents,
//! composition and selection reports, timer wake-ups) and drains the
//! [`HostEffect`]s it asks for.
//!
//! Classification of edit intents lives in [`crate::classifier`], committing
//! buffered input in [`crate::flush`].

use std::time::{
  Duration,
  Instant,
};

use the_input_event::{
  Clock,
  SystemClock,
  Timers,
};
use the_model::{
  Document,
  Editor,
  Operation,
};

use crate::{
  Result,
  config::ReconcilerConfig,
  hint::InsertionHint,
  mutation::{
    self,
    Mutation,
    MutationVerdict,
  },
  pending::{
    PendingMarks,
    PendingState,
  },
  session::Session,
};

/// Upper bound on timer rounds in one [`InputReconciler::poll_timers`] call.
const MAX_TIMER_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
  /// Composition ended; flush once duplicate end events had a chance to
  /// arrive.
  CompositionEnd,
  /// No input for a while; flush what is buffered.
  IdleFlush,
  /// Run a scheduled action or a scheduled flush.
  Action,
  /// Clear the flushing flag on the next turn.
  FlushingReset,
  /// Re-evaluate placeholder visibility after a key press.
  PlaceholderRefresh,
}

/// What the reconciler is doing, as far as the host needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
  Idle,
  Composing,
  HasPendingDiffs,
  HasPendingAction,
  Flushing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushState {
  #[default]
  Idle,
  Flushing,
  /// The flush runs (or ran) a structural action; the view will re-render
  /// from the model.
  Action,
}

/// Requests for the host, drained with [`InputReconciler::take_effects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEffect {
  /// The model changed; render it.
  Render,
  /// The view can no longer be trusted; rebuild it from the model.
  ForceRender,
  /// Arm the debounced platform selection sync.
  ScheduleSelectionSync,
  /// Run any pending platform selection sync now.
  FlushSelectionSync,
  /// Drop any pending platform selection sync.
  CancelSelectionSync,
  Placeholder { visible: bool },
}

pub struct InputReconciler<C = SystemClock> {
  pub(crate) config:    ReconcilerConfig,
  pub(crate) clock:     C,
  pub(crate) pending:   PendingState,
  pub(crate) hint:      InsertionHint,
  pub(crate) composing: bool,
  pub(crate) flushing:  FlushState,
  pub(crate) timers:    Timers<TimerKind>,
  pub(crate) effects:   Vec<HostEffect>,
}

impl InputReconciler<SystemClock> {
  pub fn new(config: ReconcilerConfig) -> Self {
    Self::with_clock(config, SystemClock)
  }
}

impl Default for InputReconciler<SystemClock> {
  fn default() -> Self {
    Self::new(ReconcilerConfig::default())
  }
}

impl<C: Clock> InputReconciler<C> {
  pub fn with_clock(config: ReconcilerConfig, clock: C) -> Self {
    Self {
      config,
      clock,
      pending: PendingState::new(),
      hint: InsertionHint::Disabled,
      composing: false,
      flushing: FlushState::Idle,
      timers: Timers::new(),
      effects: Vec::new(),
    }
  }

  pub fn config(&self) -> &ReconcilerConfig {
    &self.config
  }

  pub fn clock(&self) -> &C {
    &self.clock
  }

  pub fn pending(&self) -> &PendingState {
    &self.pending
  }

  pub fn insertion_hint(&self) -> &InsertionHint {
    &self.hint
  }

  pub fn is_composing(&self) -> bool {
    self.composing
  }

  pub fn has_pending_diffs(&self) -> bool {
    self.pending.has_diffs()
  }

  pub fn has_pending_action(&self) -> bool {
    self.pending.has_action()
  }

  pub fn has_pending_changes(&self) -> bool {
    self.has_pending_diffs() || self.has_pending_action()
  }

  pub fn is_flushing(&self) -> FlushState {
    self.flushing
  }

  pub fn state(&self) -> EngineState {
    if self.flushing != FlushState::Idle {
      EngineState::Flushing
    } else if self.has_pending_action() {
      EngineState::HasPendingAction
    } else if self.has_pending_diffs() {
      EngineState::HasPendingDiffs
    } else if self.composing {
      EngineState::Composing
    } else {
      EngineState::Idle
    }
  }

  pub fn take_effects(&mut self) -> Vec<HostEffect> {
    std::mem::take(&mut self.effects)
  }

  /// When the host should call [`InputReconciler::on_timer`] next.
  pub fn next_deadline(&self) -> Option<Instant> {
    self.timers.next_deadline()
  }

  pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
    self.timers.is_armed(kind)
  }

  /// Apply an operation issued outside the reconciler (a programmatic or
  /// collaborative edit), rewriting buffered input first.
  pub fn apply_operation(&mut self, doc: &mut Document, op: Operation) -> Result<()> {
    self.with_session(doc, |session| session.apply(op))
  }

  /// Run a multi-operation edit (a model transform, undo, redo) with
  /// buffered input following every operation it applies.
  pub fn with_session<R>(
    &mut self,
    doc: &mut Document,
    edit: impl FnOnce(&mut Session<'_>) -> the_model::Result<R>,
  ) -> Result<R> {
    let result = edit(&mut Session::new(doc, &mut self.pending));
    if let Err(err) = &result {
      tracing::warn!(%err, "external edit failed, dropping buffered input");
      self.invalidate();
    }
    Ok(result?)
  }

  pub fn handle_composition_start(&mut self) {
    tracing::trace!("composition start");
    self.composing = true;
    self.timers.cancel(TimerKind::CompositionEnd);
  }

  pub fn handle_composition_end(&mut self) {
    tracing::trace!("composition end");
    self.arm(TimerKind::CompositionEnd, self.config.resolve_delay());
  }

  /// Hide the placeholder while a key is handled, then re-evaluate.
  pub fn handle_key_down(&mut self) {
    if !self.has_pending_diffs() {
      self.update_placeholder(true);
      self.arm(TimerKind::PlaceholderRefresh, Duration::ZERO);
    }
  }

  /// A generic input notification. Without buffered diffs, or with an action
  /// waiting, everything the platform did must be committed now.
  pub fn handle_input(&mut self, doc: &mut Document) -> Result<()> {
    if self.has_pending_action() || !self.has_pending_diffs() {
      self.flush(doc)?;
    }
    Ok(())
  }

  /// Marks for the text the next flush inserts; `None` leaves the document's
  /// own marks alone.
  pub fn set_insertion_marks(&mut self, marks: Option<PendingMarks>) {
    self.pending.set_marks(marks);
  }

  /// Flush on the next turn, unless an action is already waiting to.
  pub fn schedule_flush(&mut self) {
    if !self.has_pending_action() {
      self.arm(TimerKind::Action, Duration::ZERO);
    }
  }

  pub fn handle_external_mutation_batch(&mut self, batch: &[Mutation]) -> MutationVerdict {
    let verdict = mutation::judge(batch, self.has_pending_changes());
    if verdict == MutationVerdict::ForceRender {
      tracing::debug!(mutations = batch.len(), "untracked view mutation");
      self.effects.push(HostEffect::ForceRender);
    }
    verdict
  }

  /// Fire every timer that expired by now. Timers armed while handling them
  /// wait for the next call.
  pub fn on_timer(&mut self, doc: &mut Document) -> Result<()> {
    let now = self.clock.now();
    let epoch = self.timers.epoch();
    while let Some(handle) = self.timers.pop_expired_armed_by(now, epoch) {
      self.fire(doc, handle.kind)?;
    }
    Ok(())
  }

  /// Call [`InputReconciler::on_timer`] until no timer is due.
  pub fn poll_timers(&mut self, doc: &mut Document) -> Result<()> {
    for _ in 0..MAX_TIMER_ROUNDS {
      match self.timers.next_deadline() {
        Some(deadline) if deadline <= self.clock.now() => self.on_timer(doc)?,
        _ => return Ok(()),
      }
    }
    tracing::warn!("timers still due after {MAX_TIMER_ROUNDS} rounds");
    Ok(())
  }

  /// Forget everything buffered, e.g. when the editor is torn down.
  pub fn reset(&mut self) {
    self.pending.clear();
    self.timers.clear();
    self.hint = InsertionHint::Disabled;
    self.composing = false;
    self.flushing = FlushState::Idle;
    self.effects.clear();
  }

  fn fire(&mut self, doc: &mut Document, kind: TimerKind) -> Result<()> {
    tracing::trace!(?kind, "timer fired");
    match kind {
      TimerKind::CompositionEnd => {
        self.composing = false;
        self.flush(doc)?;
      },
      TimerKind::IdleFlush if self.composing => {
        self.arm(TimerKind::IdleFlush, self.config.flush_delay());
      },
      TimerKind::IdleFlush | TimerKind::Action => {
        self.flush(doc)?;
      },
      TimerKind::FlushingReset => self.flushing = FlushState::Idle,
      TimerKind::PlaceholderRefresh => self.update_placeholder(false),
    }
    Ok(())
  }

  pub(crate) fn arm(&mut self, kind: TimerKind, delay: Duration) {
    let now = self.clock.now();
    self.timers.arm_after(kind, now, delay);
  }

  pub(crate) fn update_placeholder(&mut self, force_hide: bool) {
    let visible = !(self.has_pending_diffs() || force_hide);
    self.effects.push(HostEffect::Placeholder { visible });
  }

  /// Drop all buffered input after the model refused an operation.
  pub(crate) fn invalidate(&mut self) {
    self.pending.clear();
    self.timers.cancel(TimerKind::IdleFlush);
    self.timers.cancel(TimerKind::Action);
    self.effects.push(HostEffect::CancelSelectionSync);
    self.effects.push(HostEffect::ForceRender);
  }
}
