//! Edit notifications from the platform.
//!
//! The host translates each `beforeinput`-style notification into an
//! [`EditIntent`]: the kind of edit, its payload, and the ranges it already
//! mapped from view coordinates to model coordinates.

use std::{
  fmt,
  str::FromStr,
};

use serde::{
  Deserialize,
  Serialize,
};
use the_model::{
  Range,
  transforms::{
    DataTransfer,
    Direction,
  },
};
use thiserror::Error;

macro_rules! intent_kinds {
  ($($variant:ident => $name:literal,)*) => {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum EditIntentKind {
      $(
        #[serde(rename = $name)]
        $variant,
      )*
    }

    impl EditIntentKind {
      pub const ALL: &[EditIntentKind] = &[$(Self::$variant,)*];

      pub fn as_str(self) -> &'static str {
        match self {
          $(Self::$variant => $name,)*
        }
      }
    }

    impl FromStr for EditIntentKind {
      type Err = UnknownIntentKind;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($name => Ok(Self::$variant),)*
          _ => Err(UnknownIntentKind(s.to_owned())),
        }
      }
    }
  };
}

intent_kinds! {
  InsertText => "insertText",
  InsertCompositionText => "insertCompositionText",
  DeleteCompositionText => "deleteCompositionText",
  InsertFromComposition => "insertFromComposition",
  InsertFromDrop => "insertFromDrop",
  InsertFromPaste => "insertFromPaste",
  InsertFromYank => "insertFromYank",
  InsertReplacementText => "insertReplacementText",
  InsertLineBreak => "insertLineBreak",
  InsertParagraph => "insertParagraph",
  DeleteByComposition => "deleteByComposition",
  DeleteByCut => "deleteByCut",
  DeleteByDrag => "deleteByDrag",
  DeleteContent => "deleteContent",
  DeleteContentForward => "deleteContentForward",
  DeleteContentBackward => "deleteContentBackward",
  DeleteEntireSoftLine => "deleteEntireSoftLine",
  DeleteHardLineBackward => "deleteHardLineBackward",
  DeleteHardLineForward => "deleteHardLineForward",
  DeleteSoftLineBackward => "deleteSoftLineBackward",
  DeleteSoftLineForward => "deleteSoftLineForward",
  DeleteWordBackward => "deleteWordBackward",
  DeleteWordForward => "deleteWordForward",
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown input type: {0:?}")]
pub struct UnknownIntentKind(pub String);

impl EditIntentKind {
  pub fn is_delete(self) -> bool {
    self.as_str().starts_with("delete")
  }

  /// Direction of a delete; forward unless the kind says backward.
  pub fn direction(self) -> Direction {
    if self.as_str().ends_with("Backward") {
      Direction::Backward
    } else {
      Direction::Forward
    }
  }

  /// Kinds that carry text (or a data transfer) to insert.
  pub fn is_insertion(self) -> bool {
    matches!(
      self,
      Self::InsertText
        | Self::InsertCompositionText
        | Self::DeleteCompositionText
        | Self::InsertFromComposition
        | Self::InsertFromDrop
        | Self::InsertFromPaste
        | Self::InsertFromYank
        | Self::InsertReplacementText
    )
  }
}

impl fmt::Display for EditIntentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IntentData {
  #[default]
  None,
  Text(String),
  Transfer(DataTransfer),
}

/// A platform range after mapping. `range` is `None` when the view could not
/// map it; `collapsed` still describes the native range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRange {
  pub range:     Option<Range>,
  pub collapsed: bool,
}

impl From<Range> for NativeRange {
  fn from(range: Range) -> Self {
    Self {
      collapsed: range.is_collapsed(),
      range:     Some(range),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditIntent {
  pub kind:             EditIntentKind,
  pub data:             IntentData,
  /// The first target range the platform attached to the event.
  pub target_range:     Option<NativeRange>,
  /// The platform selection, consulted when there is no usable target range.
  pub native_selection: Option<NativeRange>,
  /// The host's view to model mapping is out of date; the intent cannot be
  /// trusted.
  pub view_stale:       bool,
}

impl EditIntent {
  pub fn new(kind: EditIntentKind) -> Self {
    Self {
      kind,
      data: IntentData::None,
      target_range: None,
      native_selection: None,
      view_stale: false,
    }
  }

  pub fn with_text(mut self, text: impl Into<String>) -> Self {
    self.data = IntentData::Text(text.into());
    self
  }

  pub fn with_transfer(mut self, data: DataTransfer) -> Self {
    self.data = IntentData::Transfer(data);
    self
  }

  pub fn with_target(mut self, target: impl Into<NativeRange>) -> Self {
    self.target_range = Some(target.into());
    self
  }

  pub fn with_native_selection(mut self, selection: impl Into<NativeRange>) -> Self {
    self.native_selection = Some(selection.into());
    self
  }

  pub fn stale(mut self) -> Self {
    self.view_stale = true;
    self
  }

  /// The range the edit applies to and the native range it came from:
  /// the target range if it mapped, else the native selection, else the
  /// model selection.
  pub(crate) fn resolve(&self, selection: Option<&Range>) -> Option<(Range, Option<&NativeRange>)> {
    let mut native = self.target_range.as_ref();
    let mut range = native.and_then(|native| native.range.clone());
    if range.is_none()
      && let Some(selection) = &self.native_selection
    {
      native = Some(selection);
      range = selection.range.clone();
    }
    let range = range.or_else(|| selection.cloned())?;
    Some((range, native))
  }
}
