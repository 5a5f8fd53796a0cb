//! Deciding what to do with each platform edit.
//!
//! An edit that splices the text of a single leaf, without emptying it, is
//! buffered as a [`StringDiff`] and left to the platform to display. Anything
//! structural becomes a pending action that the next flush runs through the
//! document's own editing commands.

use the_input_event::Clock;
use the_model::{
  Document,
  Path,
  Point,
  Range,
  text::{
    char_len,
    next_grapheme_boundary,
    prev_grapheme_boundary,
  },
  transforms::{
    Direction,
    Unit,
  },
};

use crate::{
  Result,
  action::ActionKind,
  intent::{
    EditIntent,
    EditIntentKind,
    IntentData,
  },
  pending::{
    ActionTarget,
    PendingAction,
    PendingMarks,
    PendingSelection,
  },
  reconciler::{
    HostEffect,
    InputReconciler,
    TimerKind,
  },
  string_diff::{
    self,
    StringDiff,
  },
};

const ZERO_WIDTH_NO_BREAK_SPACE: char = '\u{feff}';

/// What became of an [`EditIntent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
  /// Dropped without effect.
  Ignored,
  /// Buffered as a text diff.
  Stored,
  /// Recorded as the pending action.
  Scheduled,
}

impl<C: Clock> InputReconciler<C> {
  /// Classify one edit the platform is about to perform.
  ///
  /// Only scheduling a second action touches the document, by flushing the
  /// first one.
  pub fn handle_edit_intent(&mut self, doc: &mut Document, intent: EditIntent) -> Result<IntentOutcome> {
    self.timers.cancel(TimerKind::IdleFlush);

    if intent.view_stale {
      tracing::debug!(kind = %intent.kind, "ignoring intent from a stale view");
      return Ok(IntentOutcome::Ignored);
    }
    if !matches!(
      intent.kind,
      EditIntentKind::InsertText | EditIntentKind::InsertCompositionText
    ) {
      self.hint.disable();
    }

    let Some((target, native)) = intent.resolve(doc.selection()) else {
      tracing::debug!(kind = %intent.kind, "no target range");
      return Ok(IntentOutcome::Ignored);
    };
    let native_collapsed = native.map_or(target.is_collapsed(), |native| native.collapsed);
    if !self.fits_visible_text(doc, &target.anchor) || !self.fits_visible_text(doc, &target.focus) {
      tracing::debug!(kind = %intent.kind, ?target, "target is not inside text");
      return Ok(IntentOutcome::Ignored);
    }

    let EditIntent { kind, data, .. } = intent;
    tracing::trace!(%kind, ?target, "edit intent");
    let mut target = target;

    if kind.is_delete() {
      let direction = kind.direction();
      target = canonical_delete_target(doc, target, direction);
      if target.is_expanded() {
        let (start, end) = target.edges();
        let (start, end) = (start.clone(), end.clone());
        if start.path == end.path {
          let diff = StringDiff::delete(start.offset, end.offset);
          if self.keeps_leaf(doc, &start.path, &diff) {
            self.store_diff(doc, &start.path, diff);
            self.handle_user_select(doc, Some(Range::collapsed(start)));
            return Ok(IntentOutcome::Stored);
          }
        }
        return self.schedule_action(doc, ActionKind::DeleteFragment(direction), target);
      }
    }

    if kind.is_insertion() {
      return self.handle_insertion(doc, kind, data, target);
    }

    let action = match kind {
      EditIntentKind::DeleteContent | EditIntentKind::DeleteContentForward => {
        if self.store_char_delete(doc, &target.anchor, Direction::Forward) {
          return Ok(IntentOutcome::Stored);
        }
        ActionKind::DeleteForward(Unit::Character)
      },
      EditIntentKind::DeleteContentBackward => {
        // A non-collapsed native range means a zero-width placeholder is
        // being removed.
        if native_collapsed && self.store_char_delete(doc, &target.anchor, Direction::Backward) {
          return Ok(IntentOutcome::Stored);
        }
        ActionKind::DeleteBackward(Unit::Character)
      },
      EditIntentKind::DeleteEntireSoftLine => ActionKind::DeleteEntireSoftLine,
      EditIntentKind::DeleteHardLineBackward => ActionKind::DeleteBackward(Unit::Block),
      EditIntentKind::DeleteSoftLineBackward => ActionKind::DeleteBackward(Unit::Line),
      EditIntentKind::DeleteHardLineForward => ActionKind::DeleteForward(Unit::Block),
      EditIntentKind::DeleteSoftLineForward => ActionKind::DeleteForward(Unit::Line),
      EditIntentKind::DeleteWordBackward => ActionKind::DeleteBackward(Unit::Word),
      EditIntentKind::DeleteWordForward => ActionKind::DeleteForward(Unit::Word),
      EditIntentKind::InsertLineBreak => ActionKind::InsertSoftBreak,
      EditIntentKind::InsertParagraph => ActionKind::InsertBreak,
      // deleteByComposition, deleteByCut, deleteByDrag
      _ => ActionKind::DeleteFragment(Direction::Forward),
    };
    self.schedule_action(doc, action, target)
  }

  fn handle_insertion(
    &mut self,
    doc: &mut Document,
    kind: EditIntentKind,
    data: IntentData,
    target: Range,
  ) -> Result<IntentOutcome> {
    let mut text = match data {
      IntentData::Transfer(transfer) => {
        return self.schedule_action(doc, ActionKind::InsertData(transfer), target);
      },
      IntentData::Text(text) => text,
      IntentData::None => String::new(),
    };

    if matches!(self.pending.marks(), Some(PendingMarks::Marks(_))) {
      text.retain(|ch| ch != ZERO_WIDTH_NO_BREAK_SPACE);
    }
    // Some platforms append an extra newline to pasted multi-line text.
    if kind == EditIntentKind::InsertText && text.ends_with('\n') && text.matches('\n').count() >= 2 {
      text.pop();
    }
    if text.contains('\n') {
      return self.schedule_action(doc, ActionKind::InsertLines(text), target);
    }

    if target.anchor.path == target.focus.path {
      let (start, end) = target.edges();
      let path = start.path.clone();
      let mut diff = StringDiff::new(start.offset, end.offset, text.clone());
      if self.hint.observe(kind, &mut diff, target.is_collapsed()) {
        self.schedule_flush();
      }

      if self.keeps_leaf(doc, &path, &diff) {
        let caret = Point::new(path.clone(), diff.start + diff.inserted_len());
        self.store_diff(doc, &path, diff);
        if doc.selection().is_some() {
          self.handle_user_select(doc, Some(Range::collapsed(caret)));
        }
        return Ok(IntentOutcome::Stored);
      }
    }

    self.schedule_action(doc, ActionKind::InsertText(text), target)
  }

  /// Buffer a one-grapheme delete next to `point`, if it can be expressed as
  /// a diff of its leaf. Boundaries are found in the text the user sees, with
  /// the pending diff applied.
  fn store_char_delete(&mut self, doc: &Document, point: &Point, direction: Direction) -> bool {
    let Some(visible) = self.visible_text(doc, &point.path) else {
      return false;
    };
    let offset = point.offset;
    let diff = match direction {
      Direction::Forward if offset < char_len(&visible) => {
        StringDiff::delete(offset, next_grapheme_boundary(&visible, offset))
      },
      Direction::Backward if offset > 0 && offset <= char_len(&visible) => {
        StringDiff::delete(prev_grapheme_boundary(&visible, offset), offset)
      },
      _ => return false,
    };
    if !self.keeps_leaf(doc, &point.path, &diff) {
      return false;
    }
    self.store_diff(doc, &point.path, diff);
    true
  }

  /// The leaf's text as the user sees it, with its buffered diff applied.
  fn visible_text(&self, doc: &Document, path: &Path) -> Option<String> {
    let leaf = doc.leaf(path).ok()?;
    Some(match self.pending.diff_for(path) {
      Some(entry) => entry.diff.apply_to(&leaf.text),
      None => leaf.text.clone(),
    })
  }

  fn fits_visible_text(&self, doc: &Document, point: &Point) -> bool {
    self
      .visible_text(doc, &point.path)
      .is_some_and(|text| point.offset <= char_len(&text))
  }

  /// Whether applying `diff` on top of what is buffered for `path` leaves
  /// some text in the leaf. An emptied leaf must go through the document.
  fn keeps_leaf(&self, doc: &Document, path: &Path, diff: &StringDiff) -> bool {
    let Ok(leaf) = doc.leaf(path) else {
      return false;
    };
    let buffered = self.pending.diff_for(path).map(|entry| &entry.diff);
    !string_diff::apply(&leaf.text, buffered.into_iter().chain([diff])).is_empty()
  }

  /// Record `diff`, expressed against the visible text of the leaf at
  /// `path`, merging it into the diff already buffered there.
  pub(crate) fn store_diff(&mut self, doc: &Document, path: &Path, diff: StringDiff) {
    let Ok(leaf) = doc.leaf(path) else {
      return;
    };
    match self.pending.diff_for(path).map(|entry| entry.diff.clone()) {
      None => {
        if let Some(diff) = string_diff::normalize(&leaf.text, &diff) {
          tracing::trace!(%path, ?diff, "buffering diff");
          self.pending.push_diff(path.clone(), diff);
        }
        self.update_placeholder(false);
      },
      Some(previous) => {
        match string_diff::merge(&leaf.text, &previous, &diff) {
          Some(merged) => {
            tracing::trace!(%path, diff = ?merged, "merged diff");
            self.pending.replace_diff(path, merged);
          },
          None => {
            tracing::trace!(%path, "buffered edits cancel out");
            self.pending.remove_diff_for(path);
            self.update_placeholder(false);
          },
        }
      },
    }
  }

  /// The platform moved (or cleared) its selection while input may be
  /// buffered. `selection` is in the coordinates the user sees.
  pub fn handle_user_select(&mut self, doc: &Document, selection: Option<Range>) {
    let previous = self
      .pending
      .selection()
      .and_then(PendingSelection::range)
      .or(doc.selection())
      .cloned();

    let (path_changed, parent_changed) = match (&previous, &selection) {
      (Some(previous), Some(selection)) => {
        (
          previous.anchor.path != selection.anchor.path,
          previous.anchor.path.parent() != selection.anchor.path.parent(),
        )
      },
      _ => (true, true),
    };

    self.pending.set_selection(Some(match selection {
      Some(range) => PendingSelection::Range(range),
      None => PendingSelection::Cleared,
    }));
    self.timers.cancel(TimerKind::IdleFlush);

    if (path_changed && self.hint.is_tracking()) || parent_changed {
      self.hint.disable();
    }
    if path_changed || self.has_pending_diffs() {
      self.arm(TimerKind::IdleFlush, self.config.flush_delay());
    }
  }

  /// Record `kind` as the pending action, flushing any action already
  /// waiting.
  pub(crate) fn schedule_action(
    &mut self,
    doc: &mut Document,
    kind: ActionKind,
    target: Range,
  ) -> Result<IntentOutcome> {
    self.hint.disable();
    self.pending.set_selection(None);
    self.effects.push(HostEffect::CancelSelectionSync);

    if self.has_pending_action() {
      self.flush(doc)?;
    }

    tracing::debug!(action = kind.name(), ?target, "scheduling action");
    self.pending.set_action(PendingAction {
      at: Some(ActionTarget::Range(target)),
      kind,
    });
    self.arm(TimerKind::Action, self.config.action_delay());
    Ok(IntentOutcome::Scheduled)
  }
}

/// A range from the very end of one leaf to the very start of the next
/// covers no text. Collapse it to the side the delete moves towards.
fn canonical_delete_target(doc: &Document, target: Range, direction: Direction) -> Range {
  if target.is_collapsed() {
    return target;
  }
  let (start, end) = target.edges();
  let spans_boundary = end.offset == 0
    && doc.text_len(&start.path).is_ok_and(|len| len == start.offset)
    && doc.next_text(&start.path).as_ref() == Some(&end.path);
  if !spans_boundary {
    return target;
  }
  match direction {
    Direction::Backward => Range::collapsed(end.clone()),
    Direction::Forward => Range::collapsed(start.clone()),
  }
}

#[cfg(test)]
mod tests {
  use the_input_event::ManualClock;
  use the_model::{
    Marks,
    Node,
    Text,
    transforms::{
      self,
      DataTransfer,
    },
  };

  use super::*;
  use crate::{
    config::ReconcilerConfig,
    intent::NativeRange,
    reconciler::EngineState,
  };

  fn setup(text: &str, offset: usize) -> (Document, InputReconciler<ManualClock>) {
    let mut doc = Document::new(vec![Node::paragraph(text)]);
    transforms::select(&mut doc, Range::collapsed(Point::new([0, 0], offset))).unwrap();
    let reconciler = InputReconciler::with_clock(ReconcilerConfig::default(), ManualClock::new());
    (doc, reconciler)
  }

  fn caret(offset: usize) -> Range {
    Range::collapsed(Point::new([0, 0], offset))
  }

  fn span(start: usize, end: usize) -> Range {
    Range::new(Point::new([0, 0], start), Point::new([0, 0], end))
  }

  fn action(reconciler: &InputReconciler<ManualClock>) -> Option<&ActionKind> {
    reconciler.pending().action().map(|action| &action.kind)
  }

  fn buffered(reconciler: &InputReconciler<ManualClock>) -> Vec<StringDiff> {
    reconciler
      .pending()
      .diffs()
      .iter()
      .map(|entry| entry.diff.clone())
      .collect()
  }

  #[test]
  fn expanded_delete_inside_a_leaf_is_buffered() {
    let (mut doc, mut reconciler) = setup("word", 4);
    let outcome = reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward).with_target(span(1, 3)),
      )
      .unwrap();
    assert_eq!(outcome, IntentOutcome::Stored);
    assert_eq!(buffered(&reconciler), vec![StringDiff::delete(1, 3)]);
    assert_eq!(
      reconciler.pending().selection(),
      Some(&PendingSelection::Range(caret(1)))
    );
  }

  #[test]
  fn deleting_everything_is_an_action() {
    let (mut doc, mut reconciler) = setup("word", 4);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward).with_target(span(0, 4)),
      )
      .unwrap();
    assert_eq!(reconciler.state(), EngineState::HasPendingAction);
    assert_eq!(
      action(&reconciler),
      Some(&ActionKind::DeleteFragment(Direction::Backward))
    );
  }

  #[test]
  fn backspace_removes_a_whole_grapheme() {
    let (mut doc, mut reconciler) = setup("ae\u{301}", 3);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward).with_target(caret(3)),
      )
      .unwrap();
    assert_eq!(buffered(&reconciler), vec![StringDiff::delete(1, 3)]);
  }

  #[test]
  fn backspace_sees_buffered_text() {
    let (mut doc, mut reconciler) = setup("a", 1);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertText)
          .with_text("bc")
          .with_target(caret(1)),
      )
      .unwrap();
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward).with_target(caret(3)),
      )
      .unwrap();
    assert_eq!(buffered(&reconciler), vec![StringDiff::insert(1, "b")]);

    // removing the last visible char must go through the document
    let (mut doc, mut reconciler) = setup("a", 1);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward).with_target(caret(1)),
      )
      .unwrap();
    assert_eq!(
      action(&reconciler),
      Some(&ActionKind::DeleteBackward(Unit::Character))
    );
  }

  #[test]
  fn backspace_over_a_placeholder_is_an_action() {
    let (mut doc, mut reconciler) = setup("word", 4);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward).with_target(NativeRange {
          range:     Some(caret(4)),
          collapsed: false,
        }),
      )
      .unwrap();
    assert_eq!(
      action(&reconciler),
      Some(&ActionKind::DeleteBackward(Unit::Character))
    );
  }

  #[test]
  fn forward_delete_at_the_end_is_an_action() {
    let (mut doc, mut reconciler) = setup("word", 4);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentForward).with_target(caret(4)),
      )
      .unwrap();
    assert_eq!(
      action(&reconciler),
      Some(&ActionKind::DeleteForward(Unit::Character))
    );

    let (mut doc, mut reconciler) = setup("word", 0);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentForward).with_target(caret(0)),
      )
      .unwrap();
    assert_eq!(buffered(&reconciler), vec![StringDiff::delete(0, 1)]);
  }

  #[test]
  fn deletes_across_a_leaf_boundary_collapse() {
    let mut doc = Document::new(vec![Node::element("paragraph", vec![
      Node::text("ab"),
      Node::Text(Text::with_marks("cd", Marks::new().with("bold"))),
    ])]);
    transforms::select(&mut doc, Range::collapsed(Point::new([0, 1], 0))).unwrap();
    let mut reconciler = InputReconciler::with_clock(ReconcilerConfig::default(), ManualClock::new());
    let boundary = Range::new(Point::new([0, 0], 2), Point::new([0, 1], 0));

    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteWordBackward).with_target(boundary.clone()),
      )
      .unwrap();
    assert_eq!(
      reconciler.pending().action().and_then(|action| action.at.clone()),
      Some(ActionTarget::Range(Range::collapsed(Point::new([0, 1], 0))))
    );

    reconciler.reset();
    let outcome = reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentForward).with_target(boundary),
      )
      .unwrap();
    // a collapsed forward delete at the end of "ab" cannot be buffered
    assert_eq!(outcome, IntentOutcome::Scheduled);
    assert_eq!(
      reconciler.pending().action().and_then(|action| action.at.clone()),
      Some(ActionTarget::Range(Range::collapsed(Point::new([0, 0], 2))))
    );
  }

  #[test]
  fn unit_deletes_and_breaks_map_to_actions() {
    let cases = [
      (EditIntentKind::DeleteWordBackward, ActionKind::DeleteBackward(Unit::Word)),
      (EditIntentKind::DeleteWordForward, ActionKind::DeleteForward(Unit::Word)),
      (EditIntentKind::DeleteSoftLineBackward, ActionKind::DeleteBackward(Unit::Line)),
      (EditIntentKind::DeleteHardLineForward, ActionKind::DeleteForward(Unit::Block)),
      (EditIntentKind::DeleteEntireSoftLine, ActionKind::DeleteEntireSoftLine),
      (EditIntentKind::DeleteByCut, ActionKind::DeleteFragment(Direction::Forward)),
      (EditIntentKind::InsertLineBreak, ActionKind::InsertSoftBreak),
      (EditIntentKind::InsertParagraph, ActionKind::InsertBreak),
    ];
    for (kind, expected) in cases {
      let (mut doc, mut reconciler) = setup("some words", 4);
      let outcome = reconciler
        .handle_edit_intent(&mut doc, EditIntent::new(kind).with_target(caret(4)))
        .unwrap();
      assert_eq!(outcome, IntentOutcome::Scheduled, "{kind}");
      assert_eq!(action(&reconciler), Some(&expected), "{kind}");
      assert!(reconciler.is_timer_armed(TimerKind::Action));
    }
  }

  #[test]
  fn multi_line_text_is_inserted_as_lines() {
    let (mut doc, mut reconciler) = setup("", 0);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertText)
          .with_text("one\ntwo\n")
          .with_target(caret(0)),
      )
      .unwrap();
    assert_eq!(
      action(&reconciler),
      Some(&ActionKind::InsertLines("one\ntwo".into()))
    );

    let (mut doc, mut reconciler) = setup("", 0);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertFromPaste)
          .with_text("a\n")
          .with_target(caret(0)),
      )
      .unwrap();
    assert_eq!(
      action(&reconciler),
      Some(&ActionKind::InsertLines("a\n".into()))
    );
  }

  #[test]
  fn data_transfers_are_actions() {
    let (mut doc, mut reconciler) = setup("word", 4);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertFromPaste)
          .with_transfer(DataTransfer::text("pasted"))
          .with_target(caret(4)),
      )
      .unwrap();
    assert_eq!(
      action(&reconciler),
      Some(&ActionKind::InsertData(DataTransfer::text("pasted")))
    );
  }

  #[test]
  fn placeholder_chars_are_stripped_while_marks_are_pending() {
    let (mut doc, mut reconciler) = setup("word", 4);
    reconciler.set_insertion_marks(Some(PendingMarks::Marks(Marks::new().with("bold"))));
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertCompositionText)
          .with_text("\u{feff}x\u{feff}")
          .with_target(caret(4)),
      )
      .unwrap();
    assert_eq!(buffered(&reconciler), vec![StringDiff::insert(4, "x")]);
  }

  #[test]
  fn edits_that_cancel_out_leave_nothing_buffered() {
    let (mut doc, mut reconciler) = setup("word", 4);
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertText)
          .with_text("s")
          .with_target(caret(4)),
      )
      .unwrap();
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::DeleteContentBackward).with_target(caret(5)),
      )
      .unwrap();
    assert!(!reconciler.has_pending_diffs());
    let effects = reconciler.take_effects();
    assert_eq!(
      effects.last(),
      Some(&HostEffect::Placeholder { visible: true })
    );
  }

  #[test]
  fn unusable_intents_are_ignored() {
    let (mut doc, mut reconciler) = setup("word", 4);
    let stale = EditIntent::new(EditIntentKind::InsertText)
      .with_text("x")
      .with_target(caret(4))
      .stale();
    assert_eq!(
      reconciler.handle_edit_intent(&mut doc, stale).unwrap(),
      IntentOutcome::Ignored
    );

    let outside = EditIntent::new(EditIntentKind::InsertText)
      .with_text("x")
      .with_target(Range::collapsed(Point::new([0], 0)));
    assert_eq!(
      reconciler.handle_edit_intent(&mut doc, outside).unwrap(),
      IntentOutcome::Ignored
    );

    let mut doc = Document::new(vec![Node::paragraph("word")]);
    let untargeted = EditIntent::new(EditIntentKind::InsertText).with_text("x");
    assert_eq!(
      reconciler.handle_edit_intent(&mut doc, untargeted).unwrap(),
      IntentOutcome::Ignored
    );
    assert!(!reconciler.has_pending_changes());
  }

  #[test]
  fn targets_past_the_visible_text_are_ignored() {
    let (mut doc, mut reconciler) = setup("word", 4);
    let typed = EditIntent::new(EditIntentKind::InsertText)
      .with_text("s")
      .with_target(caret(4));
    reconciler.handle_edit_intent(&mut doc, typed).unwrap();

    // "words" is visible, so offset 5 is fine and 10 is not
    let outside = EditIntent::new(EditIntentKind::InsertText)
      .with_text("x")
      .with_target(caret(10));
    assert_eq!(
      reconciler.handle_edit_intent(&mut doc, outside).unwrap(),
      IntentOutcome::Ignored
    );
    let inside = EditIntent::new(EditIntentKind::InsertText)
      .with_text("!")
      .with_target(caret(5));
    assert_eq!(
      reconciler.handle_edit_intent(&mut doc, inside).unwrap(),
      IntentOutcome::Stored
    );
    assert_eq!(buffered(&reconciler), vec![StringDiff::insert(4, "s!")]);

    reconciler.flush(&mut doc).unwrap();
    assert_eq!(doc.text(), "words!");
  }

  #[test]
  fn selection_reports_arm_the_idle_flush() {
    let (doc, mut reconciler) = setup("word", 4);
    reconciler.handle_user_select(&doc, Some(caret(4)));
    assert!(!reconciler.is_timer_armed(TimerKind::IdleFlush));

    reconciler.handle_user_select(&doc, None);
    assert_eq!(
      reconciler.pending().selection(),
      Some(&PendingSelection::Cleared)
    );
    assert!(reconciler.is_timer_armed(TimerKind::IdleFlush));
  }

  #[test]
  fn scheduling_an_action_drops_the_pending_selection() {
    let (mut doc, mut reconciler) = setup("word", 4);
    reconciler.handle_user_select(&doc, Some(caret(2)));
    reconciler
      .handle_edit_intent(
        &mut doc,
        EditIntent::new(EditIntentKind::InsertParagraph).with_target(caret(2)),
      )
      .unwrap();
    assert!(reconciler.pending().selection().is_none());
    assert!(reconciler.take_effects().contains(&HostEffect::CancelSelectionSync));
  }
}
