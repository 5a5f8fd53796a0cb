//! Correction for composition commits that arrive one char off.
//!
//! Some soft keyboards report the second word typed after a marks placeholder
//! with a target range starting one char too far right, although the composed
//! text itself is right. The reconciler watches plain `insertText` diffs
//! typed one after another and, when a composition update lines up with them
//! except for that one char, moves its start back.

use serde::{
  Deserialize,
  Serialize,
};
use the_model::text::first_non_whitespace;

use crate::{
  intent::EditIntentKind,
  string_diff::StringDiff,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertionHintPolicy {
  #[default]
  Enabled,
  Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InsertionHint {
  /// Not tracking.
  #[default]
  Disabled,
  /// The next plain insertion starts the hint.
  Armed,
  /// Consecutive plain insertions seen so far, as one diff.
  Tracking(StringDiff),
}

impl InsertionHint {
  pub fn is_tracking(&self) -> bool {
    matches!(self, Self::Tracking(_))
  }

  pub(crate) fn disable(&mut self) {
    *self = Self::Disabled;
  }

  /// Start watching again, unless the policy forbids it or a hint is already
  /// live.
  pub(crate) fn arm(&mut self, policy: InsertionHintPolicy) {
    if policy == InsertionHintPolicy::Enabled && *self == Self::Disabled {
      *self = Self::Armed;
    }
  }

  /// Feed a text insertion about to be stored. May correct `diff` in place;
  /// returns whether it did, in which case a flush should follow promptly.
  pub(crate) fn observe(
    &mut self,
    kind: EditIntentKind,
    diff: &mut StringDiff,
    collapsed: bool,
  ) -> bool {
    match (kind, &mut *self) {
      (EditIntentKind::InsertCompositionText, Self::Tracking(hint)) if !diff.text.is_empty() => {
        let hint_position = hint.start + first_non_whitespace(&hint.text);
        let diff_position = diff.start + first_non_whitespace(&diff.text);
        if diff.start > 0
          && diff_position == hint_position + 1
          && diff.end == hint.start + hint.inserted_len()
        {
          tracing::debug!(?diff, ?hint, "correcting off-by-one composition range");
          diff.start -= 1;
          *self = Self::Armed;
          true
        } else {
          *self = Self::Disabled;
          false
        }
      },
      (EditIntentKind::InsertText, Self::Armed) => {
        *self = Self::Tracking(diff.clone());
        false
      },
      (EditIntentKind::InsertText, Self::Tracking(hint))
        if collapsed && hint.end + hint.inserted_len() == diff.start =>
      {
        hint.text.push_str(&diff.text);
        false
      },
      _ => {
        *self = Self::Disabled;
        false
      },
    }
  }
}
