//! Splice records over a leaf's text.
//!
//! A [`StringDiff`] replaces the chars `[start, end)` of some reference string
//! with `text`. The platform reports edits in this shape, often wider than the
//! change really is ("replace the whole word"), so diffs are shrunk with
//! [`normalize`] before they are buffered, and a second edit to the same leaf
//! is folded into the first with [`merge`].
//!
//! Offsets count chars, like every offset in the model. Offsets past the end
//! of the string are clamped when slicing.

use std::ops::Range;

use serde::{
  Deserialize,
  Serialize,
};
use the_model::text::{
  char_len,
  char_slice,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringDiff {
  pub start: usize,
  pub end:   usize,
  pub text:  String,
}

impl StringDiff {
  pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
    Self {
      start,
      end,
      text: text.into(),
    }
  }

  pub fn insert(at: usize, text: impl Into<String>) -> Self {
    Self::new(at, at, text)
  }

  pub fn delete(start: usize, end: usize) -> Self {
    Self::new(start, end, String::new())
  }

  /// Replaces nothing with nothing.
  pub fn is_noop(&self) -> bool {
    self.start == self.end && self.text.is_empty()
  }

  /// Chars inserted.
  pub fn inserted_len(&self) -> usize {
    char_len(&self.text)
  }

  /// Chars removed from the reference string.
  pub fn removed_len(&self) -> usize {
    self.end.saturating_sub(self.start)
  }

  /// The replaced span of the reference string.
  pub fn range(&self) -> Range<usize> {
    self.start..self.end
  }

  /// Apply to `text`.
  pub fn apply_to(&self, text: &str) -> String {
    let head = slice(text, 0, self.start);
    let tail = slice(text, self.end, usize::MAX);
    let mut out = String::with_capacity(head.len() + self.text.len() + tail.len());
    out.push_str(head);
    out.push_str(&self.text);
    out.push_str(tail);
    out
  }
}

/// Char slice clamped to the string.
fn slice(text: &str, start: usize, end: usize) -> &str {
  let len = char_len(text);
  let start = start.min(len);
  let end = end.clamp(start, len);
  char_slice(text, start, end).unwrap_or_default()
}

/// Apply `diffs` one after another, each against the result of the previous.
pub fn apply<'a>(text: &str, diffs: impl IntoIterator<Item = &'a StringDiff>) -> String {
  diffs
    .into_iter()
    .fold(text.to_owned(), |text, diff| diff.apply_to(&text))
}

pub fn longest_common_prefix_len(a: &str, b: &str) -> usize {
  a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Length of the shared suffix, at most `max` chars.
pub fn longest_common_suffix_len(a: &str, b: &str, max: usize) -> usize {
  a.chars()
    .rev()
    .zip(b.chars().rev())
    .take(max)
    .take_while(|(x, y)| x == y)
    .count()
}

/// Shrink `diff` to the chars that really change in `reference`. Returns
/// `None` when nothing changes at all.
pub fn normalize(reference: &str, diff: &StringDiff) -> Option<StringDiff> {
  let removed = slice(reference, diff.start, diff.end);
  let removed_len = char_len(removed);
  let inserted_len = diff.inserted_len();

  let prefix = longest_common_prefix_len(removed, &diff.text);
  let max = (removed_len - prefix).min(inserted_len - prefix);
  let suffix = longest_common_suffix_len(removed, &diff.text, max);

  let normalized = StringDiff {
    start: diff.start + prefix,
    end:   (diff.start + removed_len).saturating_sub(suffix),
    text:  slice(&diff.text, prefix, inserted_len - suffix).to_owned(),
  };
  (!normalized.is_noop()).then_some(normalized)
}

/// Fold `next`, expressed against the text `prev` produced, into one diff
/// against `reference`. The result is normalized; `None` means the two edits
/// cancel out.
pub fn merge(reference: &str, prev: &StringDiff, next: &StringDiff) -> Option<StringDiff> {
  let prev_start = prev.start as isize;
  let prev_end = prev.end as isize;
  let prev_len = prev.inserted_len() as isize;
  let next_start = next.start as isize;
  let next_end = next.end as isize;
  let next_len = next.inserted_len() as isize;

  let start = prev_start.min(next_start);
  let prev_text_end = prev_start + prev_len;
  let overlap = (prev_text_end.min(next_end) - next_start).max(0);

  let applied = apply(reference, [prev, next]);
  let carried = if prev_text_end > next_start { next_len } else { 0 };
  let slice_end = (next_start + next_len).max(prev_text_end + carried - overlap);
  let end = prev_end.max(next_end - prev_len + (prev_end - prev_start));

  let start = start.max(0) as usize;
  let end = (end.max(0) as usize).clamp(start, char_len(reference).max(start));
  let text = slice(&applied, start, slice_end.max(0) as usize);
  normalize(reference, &StringDiff::new(start, end, text))
}

#[cfg(test)]
mod tests {
  use quickcheck::{
    Arbitrary,
    Gen,
  };

  use super::*;

  /// A diff that is valid against the text it travels with.
  #[derive(Debug, Clone)]
  struct Edit {
    text: String,
    diff: StringDiff,
  }

  fn diff_within(text: &str, a: usize, b: usize, insert: String) -> StringDiff {
    let len = char_len(text);
    let (x, y) = (a % (len + 1), b % (len + 1));
    StringDiff::new(x.min(y), x.max(y), insert)
  }

  impl Arbitrary for Edit {
    fn arbitrary(g: &mut Gen) -> Self {
      let text = String::arbitrary(g);
      let diff = diff_within(
        &text,
        usize::arbitrary(g),
        usize::arbitrary(g),
        String::arbitrary(g),
      );
      Self { text, diff }
    }
  }

  quickcheck::quickcheck! {
    fn normalize_preserves_effect(edit: Edit) -> bool {
      let expected = edit.diff.apply_to(&edit.text);
      match normalize(&edit.text, &edit.diff) {
        Some(normalized) => normalized.apply_to(&edit.text) == expected,
        None => expected == edit.text,
      }
    }

    fn normalize_is_idempotent(edit: Edit) -> bool {
      let once = normalize(&edit.text, &edit.diff);
      let twice = once.as_ref().and_then(|diff| normalize(&edit.text, diff));
      once == twice
    }

    fn merge_matches_sequential_application(
      edit: Edit,
      a: usize,
      b: usize,
      insert: String
    ) -> bool {
      let between = edit.diff.apply_to(&edit.text);
      let next = diff_within(&between, a, b, insert);
      let expected = next.apply_to(&between);
      match merge(&edit.text, &edit.diff, &next) {
        Some(merged) => merged.apply_to(&edit.text) == expected,
        None => expected == edit.text,
      }
    }
  }

  #[test]
  fn adjacent_typing_merges_into_one_insertion() {
    let a = StringDiff::insert(3, "x");
    let b = StringDiff::insert(4, "y");
    let merged = merge("word", &a, &b);
    assert_eq!(merged, Some(StringDiff::insert(3, "xy")));
    assert_eq!(apply("word", &merged), "worxyd");
  }

  #[test]
  fn normalize_trims_word_replacement() {
    // autocorrect reports "teh" -> "the" as a whole word replacement
    let diff = StringDiff::new(4, 7, "the");
    assert_eq!(
      normalize("fix teh bug", &diff),
      Some(StringDiff::new(5, 7, "he"))
    );
    assert_eq!(normalize("same", &StringDiff::new(0, 4, "same")), None);
    assert_eq!(normalize("same", &StringDiff::insert(2, "")), None);
  }

  #[test]
  fn normalize_keeps_repeated_chars_apart() {
    // "aa" replaced by "a": the prefix takes the first char, so the suffix
    // must not count it again.
    assert_eq!(
      normalize("aa", &StringDiff::new(0, 2, "a")),
      Some(StringDiff::delete(1, 2))
    );
  }

  #[test]
  fn typing_then_deleting_cancels_out() {
    let a = StringDiff::insert(2, "x");
    let b = StringDiff::delete(2, 3);
    assert_eq!(merge("abcd", &a, &b), None);
  }

  #[test]
  fn delete_reaching_into_the_previous_insertion() {
    // "abcd" -> "abXYcd" -> "aYcd"
    let a = StringDiff::insert(2, "XY");
    let b = StringDiff::delete(1, 3);
    let merged = merge("abcd", &a, &b);
    assert_eq!(merged, Some(StringDiff::new(1, 2, "Y")));
    assert_eq!(apply("abcd", &merged), "aYcd");
  }

  #[test]
  fn edits_before_the_previous_diff() {
    let a = StringDiff::insert(4, "X");
    let b = StringDiff::insert(1, "Y");
    let merged = merge("abcdef", &a, &b);
    assert_eq!(apply("abcdef", &merged), "aYbcdXef");
  }

  #[test]
  fn multibyte_offsets_count_chars() {
    let diff = StringDiff::new(1, 2, "é");
    assert_eq!(diff.apply_to("añb"), "aéb");
    assert_eq!(diff.inserted_len(), 1);
    assert_eq!(diff.removed_len(), 1);
  }
}
