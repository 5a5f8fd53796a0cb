//! Undo/redo over batches of operations.
//!
//! Every operation that reaches [`Document::apply`](crate::Document::apply)
//! through an [`Editor`] is recorded here. Operations issued inside one
//! [`Editor::apply`] call (the operation plus its normalization fix-ups) or one
//! [`without_normalizing`] scope land in the same [`Batch`]; consecutive typing
//! or deleting at adjacent offsets is merged into the previous batch as well.
//! Selection changes are not recorded on their own, but each batch remembers
//! the selection from before its first operation.
//!
//! Undo replays inverses through [`Editor::apply`], so a wrapper that
//! intercepts operations (see [`Editor::will_apply`]) observes them like any
//! other change. The stacks only move once the replay succeeded.

use crate::{
  Editor,
  document::Result,
  editor::without_normalizing,
  operation::Operation,
  point::Range,
  transforms,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
  pub operations:       Vec<Operation>,
  pub selection_before: Option<Range>,
}

#[derive(Debug, Clone, Default)]
pub struct History {
  undos:       Vec<Batch>,
  redos:       Vec<Batch>,
  /// Open [`History::begin`] scopes.
  depth:       usize,
  /// Whether the current scope already recorded an operation.
  scope_dirty: bool,
  /// Open [`without_saving`] scopes.
  paused:      usize,
}

impl History {
  pub fn undos(&self) -> &[Batch] {
    &self.undos
  }

  pub fn redos(&self) -> &[Batch] {
    &self.redos
  }

  pub fn can_undo(&self) -> bool {
    !self.undos.is_empty()
  }

  pub fn can_redo(&self) -> bool {
    !self.redos.is_empty()
  }

  pub fn clear(&mut self) {
    self.undos.clear();
    self.redos.clear();
  }

  /// Open a scope; operations recorded until the matching [`History::end`]
  /// share one batch.
  pub(crate) fn begin(&mut self) {
    if self.depth == 0 {
      self.scope_dirty = false;
    }
    self.depth += 1;
  }

  pub(crate) fn end(&mut self) {
    self.depth = self.depth.saturating_sub(1);
    if self.depth == 0 {
      self.scope_dirty = false;
    }
  }

  pub(crate) fn record(&mut self, op: &Operation, selection_before: Option<Range>) {
    if self.paused > 0 || op.is_selection() {
      return;
    }

    let merge = match self.undos.last() {
      None => false,
      Some(_) if self.depth > 0 && self.scope_dirty => true,
      Some(last) => {
        last
          .operations
          .last()
          .is_some_and(|prev| should_merge(op, prev))
      },
    };
    if self.depth > 0 {
      self.scope_dirty = true;
    }

    match self.undos.last_mut() {
      Some(last) if merge => last.operations.push(op.clone()),
      _ => {
        self.undos.push(Batch {
          operations: vec![op.clone()],
          selection_before,
        })
      },
    }
    self.redos.clear();
  }
}

/// Typing forward or deleting backward at the edge of the previous edit
/// continues the same undo step.
fn should_merge(op: &Operation, prev: &Operation) -> bool {
  match (op, prev) {
    (
      Operation::InsertText { path, offset, .. },
      Operation::InsertText {
        path: prev_path,
        offset: prev_offset,
        text: prev_text,
      },
    ) => path == prev_path && *offset == prev_offset + prev_text.chars().count(),
    (
      Operation::RemoveText { path, offset, text },
      Operation::RemoveText {
        path: prev_path,
        offset: prev_offset,
        ..
      },
    ) => path == prev_path && offset + text.chars().count() == *prev_offset,
    _ => false,
  }
}

/// Run `f` without recording its operations.
pub fn without_saving<E, R>(editor: &mut E, f: impl FnOnce(&mut E) -> Result<R>) -> Result<R>
where
  E: Editor + ?Sized,
{
  editor.doc_mut().history_mut().paused += 1;
  let result = f(editor);
  let history = editor.doc_mut().history_mut();
  history.paused = history.paused.saturating_sub(1);
  result
}

/// Run `f` as one undo step.
pub fn batched<E, R>(editor: &mut E, f: impl FnOnce(&mut E) -> Result<R>) -> Result<R>
where
  E: Editor + ?Sized,
{
  editor.doc_mut().history_mut().begin();
  let result = f(editor);
  editor.doc_mut().history_mut().end();
  result
}

/// Revert the most recent batch. Returns `false` when there is nothing to
/// undo.
pub fn undo<E: Editor + ?Sized>(editor: &mut E) -> Result<bool> {
  let Some(batch) = editor.doc_mut().history_mut().undos.pop() else {
    return Ok(false);
  };

  let result = without_saving(editor, |editor| {
    without_normalizing(editor, |editor| {
      for op in batch.operations.iter().rev() {
        editor.apply(op.inverse())?;
      }
      match &batch.selection_before {
        Some(selection) => transforms::select(editor, selection.clone()),
        None => transforms::deselect(editor),
      }
    })
  });

  let history = editor.doc_mut().history_mut();
  match result {
    Ok(()) => {
      history.redos.push(batch);
      Ok(true)
    },
    Err(err) => {
      tracing::warn!(%err, "undo failed, keeping batch on the undo stack");
      history.undos.push(batch);
      Err(err)
    },
  }
}

/// Re-apply the most recently undone batch. Returns `false` when there is
/// nothing to redo.
pub fn redo<E: Editor + ?Sized>(editor: &mut E) -> Result<bool> {
  let Some(batch) = editor.doc_mut().history_mut().redos.pop() else {
    return Ok(false);
  };

  let result = without_saving(editor, |editor| {
    without_normalizing(editor, |editor| {
      if let Some(selection) = &batch.selection_before {
        transforms::select(editor, selection.clone())?;
      }
      for op in &batch.operations {
        editor.apply(op.clone())?;
      }
      Ok(())
    })
  });

  let history = editor.doc_mut().history_mut();
  match result {
    Ok(()) => {
      history.undos.push(batch);
      Ok(true)
    },
    Err(err) => {
      tracing::warn!(%err, "redo failed, keeping batch on the redo stack");
      history.redos.push(batch);
      Err(err)
    },
  }
}
