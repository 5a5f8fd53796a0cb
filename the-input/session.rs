//! The document as seen while the reconciler holds buffered input.

use the_model::{
  Affinity,
  Document,
  Editor,
  Operation,
  Range,
};

use crate::pending::PendingState;

/// Wraps a document so every operation applied through it first rewrites the
/// pending state, and optionally a tracked selection.
pub struct Session<'a> {
  doc:     &'a mut Document,
  pending: &'a mut PendingState,
  /// Follows operations with forward affinity; `None` once invalidated.
  tracked: Option<Range>,
}

impl<'a> Session<'a> {
  pub fn new(doc: &'a mut Document, pending: &'a mut PendingState) -> Self {
    Self {
      doc,
      pending,
      tracked: None,
    }
  }

  /// Start tracking `range` across every operation applied from now on.
  pub fn track(&mut self, range: Option<Range>) {
    self.tracked = range;
  }

  pub fn tracked(&self) -> Option<&Range> {
    self.tracked.as_ref()
  }

  pub fn take_tracked(&mut self) -> Option<Range> {
    self.tracked.take()
  }

  pub fn pending(&self) -> &PendingState {
    self.pending
  }

  pub fn pending_mut(&mut self) -> &mut PendingState {
    self.pending
  }
}

impl Editor for Session<'_> {
  fn doc(&self) -> &Document {
    self.doc
  }

  fn doc_mut(&mut self) -> &mut Document {
    self.doc
  }

  fn will_apply(&mut self, op: &Operation) {
    self.pending.transform(self.doc, op);
    if let Some(range) = &self.tracked {
      self.tracked = range.transform(op, Affinity::Forward);
    }
  }
}
