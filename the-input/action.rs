//! Deferred structural edits.
//!
//! Some edits cannot be buffered as a splice of one leaf (line breaks, unit
//! deletes, pastes, anything that would empty a leaf). They are recorded as an
//! [`ActionKind`] and later run through the model's own editing commands.

use the_model::{
  Editor,
  Result,
  transforms::{
    self,
    DataTransfer,
    Direction,
    Unit,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
  DeleteFragment(Direction),
  DeleteBackward(Unit),
  DeleteForward(Unit),
  /// Delete to both ends of the line around the caret.
  DeleteEntireSoftLine,
  InsertSoftBreak,
  InsertBreak,
  InsertData(DataTransfer),
  InsertText(String),
  /// Insert text containing newlines as lines joined by soft breaks.
  InsertLines(String),
}

impl ActionKind {
  pub fn name(&self) -> &'static str {
    match self {
      Self::DeleteFragment(_) => "delete_fragment",
      Self::DeleteBackward(_) => "delete_backward",
      Self::DeleteForward(_) => "delete_forward",
      Self::DeleteEntireSoftLine => "delete_entire_soft_line",
      Self::InsertSoftBreak => "insert_soft_break",
      Self::InsertBreak => "insert_break",
      Self::InsertData(_) => "insert_data",
      Self::InsertText(_) => "insert_text",
      Self::InsertLines(_) => "insert_lines",
    }
  }

  /// Run against the current selection of `editor`.
  pub fn run<E: Editor + ?Sized>(&self, editor: &mut E) -> Result<()> {
    match self {
      Self::DeleteFragment(direction) => transforms::delete_fragment(editor, *direction),
      Self::DeleteBackward(unit) => transforms::delete_backward(editor, *unit),
      Self::DeleteForward(unit) => transforms::delete_forward(editor, *unit),
      Self::DeleteEntireSoftLine => {
        transforms::delete_backward(editor, Unit::Line)?;
        transforms::delete_forward(editor, Unit::Line)
      },
      Self::InsertSoftBreak => transforms::insert_soft_break(editor),
      Self::InsertBreak => transforms::insert_break(editor),
      Self::InsertData(data) => transforms::insert_data(editor, data),
      Self::InsertText(text) => transforms::insert_text(editor, text),
      Self::InsertLines(text) => {
        let lines: Vec<&str> = text.split('\n').collect();
        let last = lines.len().saturating_sub(1);
        for (idx, line) in lines.into_iter().enumerate() {
          if !line.is_empty() {
            transforms::insert_text(editor, line)?;
          }
          if idx != last {
            transforms::insert_soft_break(editor)?;
          }
        }
        Ok(())
      },
    }
  }
}
