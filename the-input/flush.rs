//! Committing buffered input to the document.

use std::time::Duration;

use the_input_event::Clock;
use the_model::{
  Document,
  Editor,
  Range,
  history,
  transforms::{
    self,
    Direction,
  },
};

use crate::{
  Result,
  hint::{
    InsertionHint,
    InsertionHintPolicy,
  },
  pending::{
    ActionTarget,
    PendingAction,
    PendingMarks,
    PendingSelection,
  },
  reconciler::{
    FlushState,
    HostEffect,
    InputReconciler,
    TimerKind,
  },
  session::Session,
  transform::{
    normalize_point,
    normalize_range,
    target_range,
    verify_diff_state,
  },
};

/// How a [`InputReconciler::flush`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
  /// Nothing was buffered.
  Idle,
  /// Only a pending selection was applied.
  SelectionOnly,
  /// Every buffered diff, and the pending action if any, reached the
  /// document.
  Committed,
  /// The document disagreed with a buffered diff; everything buffered was
  /// dropped and the host was asked to re-render.
  Aborted,
}

impl<C: Clock> InputReconciler<C> {
  /// Apply every buffered diff in arrival order, then the pending action,
  /// then the pending selection.
  ///
  /// A model error drops all buffered input and requests a forced render
  /// before it is returned.
  pub fn flush(&mut self, doc: &mut Document) -> Result<FlushOutcome> {
    self.timers.cancel(TimerKind::IdleFlush);
    self.timers.cancel(TimerKind::Action);

    match self.flush_pending(doc) {
      Ok(outcome) => {
        tracing::debug!(?outcome, "flushed");
        Ok(outcome)
      },
      Err(err) => {
        tracing::warn!(%err, "flush failed, dropping buffered input");
        self.flushing = FlushState::Action;
        self.invalidate();
        Err(err)
      },
    }
  }

  fn flush_pending(&mut self, doc: &mut Document) -> Result<FlushOutcome> {
    if !self.has_pending_changes() {
      return self.flush_selection(doc);
    }

    self.flushing = if self.has_pending_action() {
      FlushState::Action
    } else {
      FlushState::Flushing
    };
    self.arm(TimerKind::FlushingReset, Duration::ZERO);

    let user_marks = doc.marks().cloned();
    let had_diffs = self.has_pending_diffs();
    let pending_selection = self.pending.take_selection();
    let live_selection = doc.selection().cloned();
    let policy = self.config.insertion_hint;

    let mut session = Session::new(doc, &mut self.pending);
    session.track(live_selection);
    let hint = &mut self.hint;
    let verified = history::batched(&mut session, |session| drain(session, hint, policy))?;
    let tracked = session.take_tracked();
    drop(session);

    if !verified {
      self.abort();
      return Ok(FlushOutcome::Aborted);
    }

    if let Some(action) = self.pending.take_action() {
      self.perform_action(doc, action, tracked)?;
      self.effects.push(HostEffect::Render);
      return Ok(FlushOutcome::Committed);
    }

    if had_diffs {
      self.effects.push(HostEffect::ScheduleSelectionSync);
    }
    self.effects.push(HostEffect::FlushSelectionSync);

    let mut session = Session::new(doc, &mut self.pending);
    match pending_selection {
      Some(PendingSelection::Range(range)) => {
        if let Some(range) = normalize_range(session.doc(), &range) {
          transforms::select(&mut session, range)?;
        }
      },
      _ => {
        if let Some(range) = tracked {
          transforms::select(&mut session, range)?;
        }
      },
    }
    drop(session);

    if user_marks.is_some() {
      doc.set_marks(user_marks);
    }
    self.effects.push(HostEffect::Render);
    Ok(FlushOutcome::Committed)
  }

  fn flush_selection(&mut self, doc: &mut Document) -> Result<FlushOutcome> {
    let Some(PendingSelection::Range(range)) = self.pending.take_selection() else {
      return Ok(FlushOutcome::Idle);
    };
    let Some(range) = normalize_range(doc, &range) else {
      return Ok(FlushOutcome::Idle);
    };
    if doc.selection() == Some(&range) {
      return Ok(FlushOutcome::Idle);
    }
    transforms::select(&mut Session::new(doc, &mut self.pending), range)?;
    self.effects.push(HostEffect::Render);
    Ok(FlushOutcome::SelectionOnly)
  }

  fn perform_action(
    &mut self,
    doc: &mut Document,
    action: PendingAction,
    tracked: Option<Range>,
  ) -> Result<()> {
    let target = match &action.at {
      Some(ActionTarget::Point(point)) => normalize_point(doc, point).map(Range::collapsed),
      Some(ActionTarget::Range(range)) => normalize_range(doc, range),
      None => tracked,
    };
    if action.at.is_some() && target.is_none() {
      tracing::debug!(action = action.kind.name(), "action target no longer resolves");
      return Ok(());
    }

    tracing::debug!(action = action.kind.name(), ?target, "running pending action");
    let mut session = Session::new(doc, &mut self.pending);
    history::batched(&mut session, |session| {
      if let Some(target) = target {
        transforms::select(session, target)?;
      }
      action.kind.run(session)
    })?;
    Ok(())
  }

  fn abort(&mut self) {
    tracing::warn!(
      remaining = self.pending.diffs().len(),
      "document diverged from buffered input"
    );
    self.pending.clear_diffs();
    self.pending.take_action();
    self.pending.set_selection(None);
    self.flushing = FlushState::Action;
    self.effects.push(HostEffect::CancelSelectionSync);
    self.effects.push(HostEffect::ForceRender);
  }
}

/// Apply the queued diffs one at a time. Returns `false` as soon as the
/// document does not show what a diff said it would.
fn drain(
  session: &mut Session<'_>,
  hint: &mut InsertionHint,
  policy: InsertionHintPolicy,
) -> the_model::Result<bool> {
  while let Some(entry) = session.pending().first_diff().cloned() {
    transforms::select(session, target_range(&entry))?;
    // Selecting clears the document marks, so swap them in afterwards.
    if let Some(marks) = session.pending_mut().take_marks() {
      if matches!(marks, PendingMarks::Marks(_)) {
        hint.arm(policy);
      }
      session.doc_mut().set_marks(marks.into_marks());
    }

    if entry.diff.text.is_empty() {
      transforms::delete_fragment(session, Direction::Forward)?;
    } else {
      transforms::insert_text(session, &entry.diff.text)?;
    }
    session.pending_mut().remove_diff(entry.id);

    if !verify_diff_state(session.doc(), &entry) {
      tracing::warn!(path = %entry.path, diff = ?entry.diff, "diff did not apply cleanly");
      return Ok(false);
    }
  }
  Ok(true)
}

#[cfg(test)]
mod tests {
  use the_input_event::ManualClock;
  use the_model::{
    Node,
    Path,
    Point,
  };

  use super::*;
  use crate::{
    action::ActionKind,
    config::ReconcilerConfig,
    intent::{
      EditIntent,
      EditIntentKind,
    },
    reconciler::EngineState,
    string_diff::StringDiff,
  };

  fn reconciler() -> InputReconciler<ManualClock> {
    InputReconciler::with_clock(ReconcilerConfig::default(), ManualClock::new())
  }

  fn doc(text: &str, offset: usize) -> Document {
    let mut doc = Document::new(vec![Node::paragraph(text)]);
    transforms::select(&mut doc, Range::collapsed(Point::new([0, 0], offset))).unwrap();
    doc
  }

  fn insert_at(offset: usize, text: &str) -> EditIntent {
    EditIntent::new(EditIntentKind::InsertText)
      .with_text(text)
      .with_target(Range::collapsed(Point::new([0, 0], offset)))
  }

  #[test]
  fn typing_inside_a_word_merges_and_commits() {
    let mut doc = doc("word", 3);
    let mut reconciler = reconciler();
    reconciler.handle_edit_intent(&mut doc, insert_at(3, "x")).unwrap();
    reconciler.handle_edit_intent(&mut doc, insert_at(4, "y")).unwrap();
    assert_eq!(
      reconciler.pending().diffs()[0].diff,
      StringDiff::insert(3, "xy")
    );

    assert_eq!(reconciler.flush(&mut doc).unwrap(), FlushOutcome::Committed);
    assert_eq!(doc.text(), "worxyd");
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([0, 0], 5)))
    );
    assert!(!reconciler.has_pending_changes());
    let effects = reconciler.take_effects();
    assert!(effects.contains(&HostEffect::ScheduleSelectionSync));
    assert!(effects.contains(&HostEffect::Render));
  }

  #[test]
  fn emptying_a_leaf_becomes_an_action() {
    let mut doc = doc("word", 4);
    let mut reconciler = reconciler();
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward)
          .with_target(Range::new(Point::new([0, 0], 0), Point::new([0, 0], 4))),
      )
      .unwrap();
    assert_eq!(reconciler.state(), EngineState::HasPendingAction);
    assert!(!reconciler.has_pending_diffs());

    assert_eq!(reconciler.flush(&mut doc).unwrap(), FlushOutcome::Committed);
    assert_eq!(doc.text(), "");
    assert_eq!(reconciler.is_flushing(), FlushState::Action);
  }

  #[test]
  fn diffs_on_several_leaves_drain_in_order() {
    let mut doc = Document::new(vec![Node::paragraph("one"), Node::paragraph("two")]);
    transforms::select(&mut doc, Range::collapsed(Point::new([1, 0], 3))).unwrap();
    let mut reconciler = reconciler();
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertText)
          .with_text("!")
          .with_target(Range::collapsed(Point::new([0, 0], 3))),
      )
      .unwrap();
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertText)
          .with_text("?")
          .with_target(Range::collapsed(Point::new([1, 0], 0))),
      )
      .unwrap();
    assert_eq!(reconciler.pending().diffs().len(), 2);

    reconciler.flush(&mut doc).unwrap();
    assert_eq!(doc.string(&Path::from([0])).unwrap(), "one!");
    assert_eq!(doc.string(&Path::from([1])).unwrap(), "?two");
    assert!(reconciler.pending().diffs().is_empty());
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([1, 0], 1)))
    );
  }

  #[test]
  fn the_whole_drain_is_one_undo_step() {
    let mut doc = doc("word", 4);
    let mut reconciler = reconciler();
    reconciler.handle_edit_intent(&mut doc, insert_at(4, "s")).unwrap();
    reconciler.handle_edit_intent(&mut doc, insert_at(0, "a ")).unwrap();
    reconciler.flush(&mut doc).unwrap();
    assert_eq!(doc.text(), "a words");

    history::undo(&mut doc).unwrap();
    assert_eq!(doc.text(), "word");
  }

  #[test]
  fn a_diverged_document_aborts_the_drain() {
    // Two adjacent leaves with equal marks that were never normalized, so the
    // second leaf merges into the first once the diff lands.
    let mut doc = Document::new(vec![Node::element("paragraph", vec![
      Node::text("ab"),
      Node::text("cd"),
    ])]);
    transforms::select(&mut doc, Range::collapsed(Point::new([0, 1], 0))).unwrap();
    let mut reconciler = reconciler();
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertText)
          .with_text("x")
          .with_target(Range::collapsed(Point::new([0, 1], 0))),
      )
      .unwrap();

    assert_eq!(reconciler.flush(&mut doc).unwrap(), FlushOutcome::Aborted);
    assert!(!reconciler.has_pending_changes());
    assert!(reconciler.pending().selection().is_none());
    let effects = reconciler.take_effects();
    assert!(effects.contains(&HostEffect::ForceRender));
    assert!(effects.contains(&HostEffect::CancelSelectionSync));
  }

  #[test]
  fn a_second_action_flushes_the_first() {
    let mut doc = doc("word", 4);
    let mut reconciler = reconciler();
    let at = Range::collapsed(Point::new([0, 0], 4));
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertParagraph).with_target(at.clone()),
      )
      .unwrap();
    assert_eq!(
      reconciler.pending().action().map(|action| &action.kind),
      Some(&ActionKind::InsertBreak)
    );
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertLineBreak).with_target(at),
      )
      .unwrap();

    assert_eq!(doc.children().len(), 2);
    assert_eq!(
      reconciler.pending().action().map(|action| &action.kind),
      Some(&ActionKind::InsertSoftBreak)
    );
  }

  #[test]
  fn nothing_pending_only_moves_the_selection() {
    let mut doc = doc("word", 4);
    let mut reconciler = reconciler();
    assert_eq!(reconciler.flush(&mut doc).unwrap(), FlushOutcome::Idle);

    reconciler.handle_user_select(&doc, Some(Range::collapsed(Point::new([0, 0], 1))));
    assert_eq!(
      reconciler.flush(&mut doc).unwrap(),
      FlushOutcome::SelectionOnly
    );
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([0, 0], 1)))
    );
  }

  #[test]
  fn pending_marks_apply_to_flushed_text() {
    let mut doc = doc("word", 4);
    let mut reconciler = reconciler();
    reconciler.set_insertion_marks(Some(PendingMarks::Marks(
      the_model::Marks::new().with("bold"),
    )));
    reconciler.handle_edit_intent(&mut doc, insert_at(4, "s")).unwrap();
    reconciler.flush(&mut doc).unwrap();

    assert_eq!(doc.text(), "words");
    let bold = doc.leaf(&Path::from([0, 1])).unwrap();
    assert_eq!(bold.text, "s");
    assert!(bold.marks.contains("bold"));
    assert!(reconciler.pending().marks().is_none());
  }
}
