//! Driving a reconciler through a script with a manual clock.

use std::{
  fmt,
  time::{
    Duration,
    Instant,
  },
};

use anyhow::Result;
use the_input::{
  EngineState,
  HostEffect,
  InputReconciler,
  ReconcilerConfig,
};
use the_input_event::{
  DeadlineWaker,
  ManualClock,
};
use the_model::{
  Document,
  Node,
  Path,
  history,
  transforms,
};
use tokio::{
  sync::mpsc,
  time,
};

use crate::script::{
  self,
  Script,
  Step,
};

pub struct Replay {
  pub doc:        Document,
  pub reconciler: InputReconciler<ManualClock>,
  clock:          ManualClock,
  /// Every host effect requested so far, in order.
  pub effects:    Vec<HostEffect>,
}

impl Replay {
  pub fn new(children: Vec<Node>, config: ReconcilerConfig) -> Self {
    let clock = ManualClock::new();
    Self {
      doc: Document::new(children),
      reconciler: InputReconciler::with_clock(config, clock.clone()),
      clock,
      effects: Vec::new(),
    }
  }

  /// Replay with simulated time: `advance` steps move the clock at once.
  pub fn run(&mut self, script: &Script) -> Result<()> {
    self.begin(script)?;
    for (index, step) in script.steps.iter().enumerate() {
      log::debug!("step {index}: {step:?}");
      self.step(step)?;
      self.settle(index)?;
    }
    Ok(())
  }

  /// Replay against the wall clock. `advance` steps really wait, and timers
  /// fire when a [`DeadlineWaker`] reports them due, the way an interactive
  /// host would drive the reconciler.
  pub async fn run_realtime(&mut self, script: &Script) -> Result<()> {
    let (wake_tx, mut wake_rx) = mpsc::channel(4);
    let waker = DeadlineWaker::spawn(wake_tx);

    self.begin(script)?;
    for (index, step) in script.steps.iter().enumerate() {
      log::debug!("step {index}: {step:?}");
      self.clock.set(Instant::now());
      if let Step::Advance { ms } = step {
        let until = time::Instant::now() + Duration::from_millis(*ms);
        loop {
          waker.report(self.reconciler.next_deadline());
          let woken = tokio::select! {
            () = time::sleep_until(until) => None,
            woken = wake_rx.recv() => woken,
          };
          if woken.is_none() {
            break;
          }
          self.clock.set(Instant::now());
          self.settle(index)?;
        }
        self.clock.set(Instant::now());
      } else {
        self.step(step)?;
      }
      self.settle(index)?;
    }
    waker.report(None);
    Ok(())
  }

  fn begin(&mut self, script: &Script) -> Result<()> {
    if let Some(selection) = &script.selection {
      transforms::select(&mut self.doc, selection.to_range())?;
    }
    Ok(())
  }

  /// Fire whatever came due and collect what the host was asked to do.
  fn settle(&mut self, index: usize) -> Result<()> {
    self.reconciler.poll_timers(&mut self.doc)?;
    self.effects.extend(self.reconciler.take_effects());
    log::info!(
      "step {index}: {:?}, text {:?}",
      self.reconciler.state(),
      self.doc.text()
    );
    Ok(())
  }

  fn step(&mut self, step: &Step) -> Result<()> {
    let doc = &mut self.doc;
    let reconciler = &mut self.reconciler;
    match step {
      Step::Intent {
        kind,
        text,
        transfer,
        at,
        native_collapsed,
        stale,
      } => {
        let intent = script::intent(
          *kind,
          text.as_deref(),
          transfer.as_deref(),
          at.as_ref(),
          *native_collapsed,
          *stale,
        );
        let outcome = reconciler.handle_edit_intent(doc, intent)?;
        log::debug!("{kind}: {outcome:?}");
      },
      Step::Select { at } => {
        reconciler.handle_user_select(doc, at.as_ref().map(|span| span.to_range()));
      },
      Step::CompositionStart => reconciler.handle_composition_start(),
      Step::CompositionEnd => reconciler.handle_composition_end(),
      Step::KeyDown => reconciler.handle_key_down(),
      Step::Input => reconciler.handle_input(doc)?,
      Step::Marks { marks } => {
        reconciler.set_insertion_marks(Some(script::pending_marks(marks.as_deref())));
      },
      Step::Flush => {
        let outcome = reconciler.flush(doc)?;
        log::debug!("flush: {outcome:?}");
      },
      Step::Advance { ms } => self.clock.advance(Duration::from_millis(*ms)),
      Step::Operation { op } => reconciler.apply_operation(doc, op.clone())?,
      Step::Undo => {
        reconciler.with_session(doc, |session| history::undo(session))?;
      },
      Step::Redo => {
        reconciler.with_session(doc, |session| history::redo(session))?;
      },
    }
    Ok(())
  }

  pub fn summary(&self) -> Summary<'_> {
    Summary { replay: self }
  }
}

/// Plain-text rendering of the final state: one line per top-level block,
/// then whatever is still buffered.
pub struct Summary<'a> {
  replay: &'a Replay,
}

impl fmt::Display for Summary<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Replay {
      doc, reconciler, ..
    } = self.replay;
    for (index, _) in doc.children().iter().enumerate() {
      let text = doc.string(&Path::from([index])).unwrap_or_default();
      writeln!(f, "{text}")?;
    }
    writeln!(f, "---")?;
    if let Some(selection) = doc.selection() {
      writeln!(
        f,
        "selection: {}@{} .. {}@{}",
        selection.anchor.path, selection.anchor.offset, selection.focus.path, selection.focus.offset
      )?;
    }
    let state = reconciler.state();
    writeln!(f, "state: {state:?}")?;
    if state != EngineState::Idle {
      for entry in reconciler.pending().diffs() {
        writeln!(f, "pending diff {}: {} {:?}", entry.id, entry.path, entry.diff)?;
      }
      if let Some(action) = reconciler.pending().action() {
        writeln!(f, "pending action: {}", action.kind.name())?;
      }
    }
    Ok(())
  }
}
