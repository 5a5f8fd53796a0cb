//! The operation entry point and tree normalization.

use crate::{
  document::{
    Document,
    Result,
  },
  operation::Operation,
};

/// Normalization gives up after this many fix-ups in one pass; a document
/// that keeps producing fix-ups indicates a bug in a rule, not a big tree.
const MAX_NORMALIZE_STEPS: usize = 10_000;

/// Anything that owns a [`Document`] and lets operations reach it.
///
/// Every change to the tree, including the fix-ups produced by
/// normalization and the inverses replayed by undo, goes through
/// [`Editor::apply`]. Wrappers implement [`Editor::will_apply`] to observe
/// each operation before it lands.
pub trait Editor {
  fn doc(&self) -> &Document;

  fn doc_mut(&mut self) -> &mut Document;

  /// Called with every operation right before the document applies it.
  fn will_apply(&mut self, _op: &Operation) {}

  fn apply(&mut self, op: Operation) -> Result<()> {
    apply_operation(self, op)
  }
}

impl Editor for Document {
  fn doc(&self) -> &Document {
    self
  }

  fn doc_mut(&mut self) -> &mut Document {
    self
  }
}

/// The default [`Editor::apply`]: notify, apply, record, normalize.
pub fn apply_operation<E: Editor + ?Sized>(editor: &mut E, op: Operation) -> Result<()> {
  editor.will_apply(&op);
  editor.doc_mut().history_mut().begin();
  let result = apply_and_normalize(editor, &op);
  editor.doc_mut().history_mut().end();
  result
}

fn apply_and_normalize<E: Editor + ?Sized>(editor: &mut E, op: &Operation) -> Result<()> {
  let doc = editor.doc_mut();
  let selection_before = doc.selection().cloned();
  doc.apply_raw(op)?;
  doc.history_mut().record(op, selection_before);
  if !op.is_selection() && !doc.is_normalizing_suspended() {
    normalize(editor)?;
  }
  Ok(())
}

/// Run `f` with normalization deferred; the tree is normalized once when the
/// outermost scope closes. The whole scope is a single undo step.
pub fn without_normalizing<E, R>(editor: &mut E, f: impl FnOnce(&mut E) -> Result<R>) -> Result<R>
where
  E: Editor + ?Sized,
{
  editor.doc_mut().suspend_normalizing();
  editor.doc_mut().history_mut().begin();
  let result = f(editor);
  editor.doc_mut().resume_normalizing();
  let result = match result {
    Ok(value) if !editor.doc().is_normalizing_suspended() => normalize(editor).map(|()| value),
    other => other,
  };
  editor.doc_mut().history_mut().end();
  result
}

/// Apply fix-ups until the tree satisfies the structural rules:
///
/// - an element always has at least one child (an empty text is inserted);
/// - adjacent texts with equal marks are merged;
/// - an empty text next to another text is removed.
pub fn normalize<E: Editor + ?Sized>(editor: &mut E) -> Result<()> {
  editor.doc_mut().suspend_normalizing();
  let result = run_normalization(editor);
  editor.doc_mut().resume_normalizing();
  result
}

fn run_normalization<E: Editor + ?Sized>(editor: &mut E) -> Result<()> {
  for _ in 0..MAX_NORMALIZE_STEPS {
    let Some(op) = editor.doc().next_normalization() else {
      return Ok(());
    };
    tracing::trace!(?op, "normalize");
    editor.apply(op)?;
  }
  tracing::warn!("normalization did not settle after {MAX_NORMALIZE_STEPS} steps");
  Ok(())
}
