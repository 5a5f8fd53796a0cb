//! The replay script format.
//!
//! A script is a TOML file with an optional starting `selection` and a list
//! of `[[step]]` tables, each tagged with a `type`:
//!
//! ```toml
//! selection = { anchor = { path = [0, 0], offset = 4 } }
//!
//! [[step]]
//! type = "composition-start"
//!
//! [[step]]
//! type = "intent"
//! kind = "insertCompositionText"
//! text = "x"
//! at   = { anchor = { path = [0, 0], offset = 4 } }
//!
//! [[step]]
//! type = "advance"
//! ms   = 25
//! ```

use std::{
  fs,
  path::Path,
};

use anyhow::{
  Context,
  Result,
};
use serde::Deserialize;
use the_input::{
  EditIntent,
  EditIntentKind,
  NativeRange,
  PendingMarks,
};
use the_model::{
  Marks,
  Operation,
  Point,
  Range,
  transforms::DataTransfer,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
  /// Selection to place before the first step.
  #[serde(default)]
  pub selection: Option<Span>,
  #[serde(default, rename = "step")]
  pub steps:     Vec<Step>,
}

/// A range written as an anchor and an optional focus; a missing focus means
/// a caret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Span {
  pub anchor: Point,
  #[serde(default)]
  pub focus:  Option<Point>,
}

impl Span {
  pub fn to_range(&self) -> Range {
    match &self.focus {
      Some(focus) => Range::new(self.anchor.clone(), focus.clone()),
      None => Range::collapsed(self.anchor.clone()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Step {
  /// A platform edit notification.
  Intent {
    kind:             EditIntentKind,
    #[serde(default)]
    text:             Option<String>,
    /// Plain text carried as a data transfer (paste, drop).
    #[serde(default)]
    transfer:         Option<String>,
    #[serde(default)]
    at:               Option<Span>,
    /// Whether the native range was collapsed, when it differs from `at`.
    #[serde(default)]
    native_collapsed: Option<bool>,
    #[serde(default)]
    stale:            bool,
  },
  /// The platform reported a selection; no `at` means it cleared it.
  Select {
    #[serde(default)]
    at: Option<Span>,
  },
  CompositionStart,
  CompositionEnd,
  KeyDown,
  Input,
  /// Marks for the next flushed insertion; no `marks` means none at all.
  Marks {
    #[serde(default)]
    marks: Option<Vec<String>>,
  },
  Flush,
  /// Move the clock forward and fire whatever timers came due.
  Advance { ms: u64 },
  /// An operation from outside the reconciler, e.g. a collaborator.
  Operation { op: Operation },
  Undo,
  Redo,
}

impl Script {
  pub fn from_toml(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let source = fs::read_to_string(path)
      .with_context(|| format!("failed to read script {}", path.display()))?;
    Self::from_toml(&source).with_context(|| format!("bad script {}", path.display()))
  }
}

pub fn intent(
  kind: EditIntentKind,
  text: Option<&str>,
  transfer: Option<&str>,
  at: Option<&Span>,
  native_collapsed: Option<bool>,
  stale: bool,
) -> EditIntent {
  let mut intent = EditIntent::new(kind);
  if let Some(text) = text {
    intent = intent.with_text(text);
  }
  if let Some(transfer) = transfer {
    intent = intent.with_transfer(DataTransfer::text(transfer));
  }
  if let Some(at) = at {
    let range = at.to_range();
    let collapsed = native_collapsed.unwrap_or(range.is_collapsed());
    intent = intent.with_target(NativeRange {
      range: Some(range),
      collapsed,
    });
  }
  if stale {
    intent = intent.stale();
  }
  intent
}

pub fn pending_marks(marks: Option<&[String]>) -> PendingMarks {
  match marks {
    Some(marks) => {
      PendingMarks::Marks(
        marks
          .iter()
          .fold(Marks::new(), |marks, mark| marks.with(mark.as_str())),
      )
    },
    None => PendingMarks::Cleared,
  }
}
