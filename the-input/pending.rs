//! Buffered input that has not reached the document yet.

use the_model::{
  Document,
  Marks,
  Operation,
  Path,
  Point,
  Range,
  text::char_slice,
};

use crate::{
  action::ActionKind,
  string_diff::StringDiff,
  transform::{
    transform_pending_point,
    transform_pending_range,
    transform_text_diff,
  },
};

/// A buffered splice of the leaf at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDiff {
  pub id:   u64,
  pub path: Path,
  pub diff: StringDiff,
}

/// Where a deferred action applies. Selected before the action runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
  Point(Point),
  Range(Range),
}

impl ActionTarget {
  fn transform(&self, before: &[TextDiff], op: &Operation) -> Option<Self> {
    match self {
      Self::Point(point) => transform_pending_point(before, point, op).map(Self::Point),
      Self::Range(range) => transform_pending_range(before, range, op).map(Self::Range),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
  pub at:   Option<ActionTarget>,
  pub kind: ActionKind,
}

/// The selection the platform reported while edits were buffered, in
/// coordinates that assume every pending diff is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSelection {
  Range(Range),
  /// The platform reported no selection.
  Cleared,
}

impl PendingSelection {
  pub fn range(&self) -> Option<&Range> {
    match self {
      Self::Range(range) => Some(range),
      Self::Cleared => None,
    }
  }
}

/// Marks for text inserted while composing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMarks {
  Marks(Marks),
  /// Insert without any marks.
  Cleared,
}

impl PendingMarks {
  pub fn into_marks(self) -> Option<Marks> {
    match self {
      Self::Marks(marks) => Some(marks),
      Self::Cleared => None,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct PendingState {
  /// Arrival order, at most one entry per path.
  diffs:     Vec<TextDiff>,
  next_id:   u64,
  action:    Option<PendingAction>,
  selection: Option<PendingSelection>,
  marks:     Option<PendingMarks>,
}

impl PendingState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn diffs(&self) -> &[TextDiff] {
    &self.diffs
  }

  pub fn has_diffs(&self) -> bool {
    !self.diffs.is_empty()
  }

  pub fn first_diff(&self) -> Option<&TextDiff> {
    self.diffs.first()
  }

  pub fn diff_for(&self, path: &Path) -> Option<&TextDiff> {
    self.diffs.iter().find(|entry| entry.path == *path)
  }

  /// Queue a diff for a path that has none yet. Returns its id.
  pub(crate) fn push_diff(&mut self, path: Path, diff: StringDiff) -> u64 {
    debug_assert!(self.diff_for(&path).is_none());
    let id = self.next_id;
    self.next_id += 1;
    self.diffs.push(TextDiff { id, path, diff });
    id
  }

  /// Replace the diff of an existing entry, keeping its place in the queue.
  pub(crate) fn replace_diff(&mut self, path: &Path, diff: StringDiff) {
    if let Some(entry) = self.diffs.iter_mut().find(|entry| entry.path == *path) {
      entry.diff = diff;
    }
  }

  pub(crate) fn remove_diff_for(&mut self, path: &Path) {
    self.diffs.retain(|entry| entry.path != *path);
  }

  pub(crate) fn remove_diff(&mut self, id: u64) {
    self.diffs.retain(|entry| entry.id != id);
  }

  pub(crate) fn clear_diffs(&mut self) {
    self.diffs.clear();
  }

  pub fn action(&self) -> Option<&PendingAction> {
    self.action.as_ref()
  }

  pub fn has_action(&self) -> bool {
    self.action.is_some()
  }

  pub(crate) fn set_action(&mut self, action: PendingAction) {
    self.action = Some(action);
  }

  pub(crate) fn take_action(&mut self) -> Option<PendingAction> {
    self.action.take()
  }

  pub fn selection(&self) -> Option<&PendingSelection> {
    self.selection.as_ref()
  }

  pub(crate) fn set_selection(&mut self, selection: Option<PendingSelection>) {
    self.selection = selection;
  }

  pub(crate) fn take_selection(&mut self) -> Option<PendingSelection> {
    self.selection.take()
  }

  pub fn marks(&self) -> Option<&PendingMarks> {
    self.marks.as_ref()
  }

  pub(crate) fn set_marks(&mut self, marks: Option<PendingMarks>) {
    self.marks = marks;
  }

  pub(crate) fn take_marks(&mut self) -> Option<PendingMarks> {
    self.marks.take()
  }

  /// Rewrite everything buffered so it still addresses the same content once
  /// `op` is applied to `doc`. Must run before the operation lands.
  pub(crate) fn transform(&mut self, doc: &Document, op: &Operation) {
    if self.diffs.is_empty() && self.selection.is_none() && self.action.is_none() {
      return;
    }
    // Points ride along with the diffs as they were before the operation.
    let before = std::mem::take(&mut self.diffs);

    for entry in &before {
      let Some(next) = transform_text_diff(entry, op) else {
        tracing::debug!(path = %entry.path, ?op, "pending diff invalidated");
        continue;
      };
      match self.diffs.iter_mut().find(|other| other.path == next.path) {
        Some(existing) => {
          match join_merged(doc, op, &existing.diff, &next.diff) {
            Some(diff) => existing.diff = diff,
            None => tracing::warn!(path = %next.path, ?op, "dropping colliding pending diff"),
          }
        },
        None => self.diffs.push(next),
      }
    }

    if let Some(PendingSelection::Range(range)) = &self.selection {
      self.selection = transform_pending_range(&before, range, op).map(PendingSelection::Range);
    }

    if let Some(action) = &mut self.action
      && let Some(at) = &action.at
    {
      match at.transform(&before, op) {
        Some(at) => action.at = Some(at),
        None => {
          tracing::debug!(action = action.kind.name(), ?op, "pending action invalidated");
          self.action = None;
        },
      }
    }
  }

  pub fn clear(&mut self) {
    self.diffs.clear();
    self.action = None;
    self.selection = None;
    self.marks = None;
  }
}

/// Two diffs end up on one leaf only when `op` merges their leaves. Both are
/// already rebased onto the merged text; join them into one splice.
fn join_merged(doc: &Document, op: &Operation, a: &StringDiff, b: &StringDiff) -> Option<StringDiff> {
  let Operation::MergeNode { path, .. } = op else {
    return None;
  };
  let previous = doc.leaf(&path.previous()?).ok()?;
  let current = doc.leaf(path).ok()?;
  let merged = format!("{}{}", previous.text, current.text);

  let (left, right) = if a.start <= b.start { (a, b) } else { (b, a) };
  let between = char_slice(&merged, left.end, right.start)?;
  Some(StringDiff::new(
    left.start,
    right.end,
    format!("{}{between}{}", left.text, right.text),
  ))
}

#[cfg(test)]
mod tests {
  use quickcheck::{
    Arbitrary,
    Gen,
  };
  use the_model::Node;

  use super::*;

  fn doc() -> Document {
    Document::new(vec![Node::element(
      "paragraph",
      (0..6).map(|i| Node::text(format!("leaf{i}"))).collect(),
    )])
  }

  #[derive(Debug, Clone)]
  enum StoreOp {
    Push(usize, usize),
    Remove(usize),
    Transform(usize, usize),
  }

  impl Arbitrary for StoreOp {
    fn arbitrary(g: &mut Gen) -> Self {
      let leaf = usize::arbitrary(g) % 4;
      match u8::arbitrary(g) % 3 {
        0 => Self::Push(leaf, usize::arbitrary(g) % 8),
        1 => Self::Remove(leaf),
        _ => Self::Transform(leaf, usize::arbitrary(g) % 3),
      }
    }
  }

  fn leaf(index: usize) -> Path {
    Path::from([0, index])
  }

  quickcheck::quickcheck! {
    fn at_most_one_diff_per_path(ops: Vec<StoreOp>) -> bool {
      let doc = doc();
      let mut state = PendingState::new();
      for op in ops {
        match op {
          StoreOp::Push(index, at) => {
            let path = leaf(index);
            let diff = StringDiff::insert(at % 6, "x");
            match state.diff_for(&path) {
              Some(_) => state.replace_diff(&path, diff),
              None => {
                state.push_diff(path, diff);
              },
            }
          },
          StoreOp::Remove(index) => state.remove_diff_for(&leaf(index)),
          StoreOp::Transform(index, kind) => {
            let path = leaf(index);
            let op = match kind {
              0 => Operation::InsertNode { path, node: Node::text("n") },
              1 => Operation::RemoveNode { path, node: Node::text("n") },
              _ => Operation::MergeNode {
                path: leaf(index + 1),
                position: 1,
                properties: Node::text("").properties(),
              },
            };
            state.transform(&doc, &op);
          },
        }
      }
      let diffs = state.diffs();
      diffs
        .iter()
        .enumerate()
        .all(|(i, a)| diffs[i + 1..].iter().all(|b| a.path != b.path))
    }
  }

  #[test]
  fn action_is_dropped_with_its_leaf() {
    let mut state = PendingState::new();
    state.set_action(PendingAction {
      at:   Some(ActionTarget::Point(Point::new([0, 1], 0))),
      kind: ActionKind::InsertBreak,
    });
    state.transform(&doc(), &Operation::RemoveNode {
      path: Path::from([0, 1]),
      node: Node::text("leaf1"),
    });
    assert!(!state.has_action());
  }

  #[test]
  fn actions_without_a_target_survive() {
    let mut state = PendingState::new();
    state.set_action(PendingAction {
      at:   None,
      kind: ActionKind::InsertBreak,
    });
    state.transform(&doc(), &Operation::RemoveNode {
      path: Path::from([0]),
      node: Node::paragraph("gone"),
    });
    assert!(state.has_action());
  }

  #[test]
  fn merging_two_buffered_leaves_joins_their_diffs() {
    let doc = doc();
    let mut state = PendingState::new();
    state.push_diff(leaf(1), StringDiff::insert(1, "X"));
    state.push_diff(leaf(2), StringDiff::new(0, 1, "Y"));
    state.transform(&doc, &Operation::MergeNode {
      path:       leaf(2),
      position:   5,
      properties: Node::text("").properties(),
    });

    assert_eq!(state.diffs().len(), 1);
    let entry = &state.diffs()[0];
    assert_eq!(entry.path, leaf(1));
    assert_eq!(entry.diff, StringDiff::new(1, 6, "Xeaf1Y"));
    assert_eq!(entry.diff.apply_to("leaf1leaf2"), "lXeaf1Yeaf2");
  }

  #[test]
  fn ids_are_monotonic() {
    let mut state = PendingState::new();
    let a = state.push_diff(leaf(0), StringDiff::insert(0, "a"));
    state.remove_diff(a);
    let b = state.push_diff(leaf(0), StringDiff::insert(0, "b"));
    assert!(b > a);
    assert_eq!(state.first_diff().map(|entry| entry.id), Some(b));
  }
}
