//! Char-indexed string helpers.
//!
//! Every offset in the model counts Unicode scalar values, while Rust strings
//! are indexed by byte. These helpers do the conversion and find grapheme and
//! word boundaries for unit deletes.

use unicode_general_category::{
  GeneralCategory,
  get_general_category,
};
use unicode_segmentation::GraphemeCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharCategory {
  Whitespace,
  Word,
  Punctuation,
  Unknown,
}

pub fn categorize_char(ch: char) -> CharCategory {
  match ch {
    c if c.is_whitespace() || c == '\u{FEFF}' => CharCategory::Whitespace,
    c if char_is_word(c) => CharCategory::Word,
    c if char_is_punctuation(c) => CharCategory::Punctuation,
    _ => CharCategory::Unknown,
  }
}

#[inline]
pub fn char_is_word(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_'
}

#[inline]
pub fn char_is_punctuation(ch: char) -> bool {
  matches!(
    get_general_category(ch),
    GeneralCategory::OtherPunctuation
      | GeneralCategory::OpenPunctuation
      | GeneralCategory::ClosePunctuation
      | GeneralCategory::InitialPunctuation
      | GeneralCategory::FinalPunctuation
      | GeneralCategory::ConnectorPunctuation
      | GeneralCategory::DashPunctuation
      | GeneralCategory::MathSymbol
      | GeneralCategory::CurrencySymbol
      | GeneralCategory::ModifierSymbol
  )
}

#[inline]
pub fn char_len(s: &str) -> usize {
  s.chars().count()
}

/// Byte index of the `char_idx`-th char. `char_idx == char_len(s)` maps to
/// `s.len()`; anything past that is `None`.
pub fn char_to_byte(s: &str, char_idx: usize) -> Option<usize> {
  s.char_indices()
    .map(|(i, _)| i)
    .chain(std::iter::once(s.len()))
    .nth(char_idx)
}

pub fn byte_to_char(s: &str, byte_idx: usize) -> usize {
  s[..byte_idx.min(s.len())].chars().count()
}

/// Char-indexed slice `[start, end)`.
pub fn char_slice(s: &str, start: usize, end: usize) -> Option<&str> {
  if start > end {
    return None;
  }
  let from = char_to_byte(s, start)?;
  let to = char_to_byte(s, end)?;
  Some(&s[from..to])
}

pub fn prev_grapheme_boundary(s: &str, char_idx: usize) -> usize {
  let Some(byte_idx) = char_to_byte(s, char_idx) else {
    return char_len(s);
  };
  let mut cursor = GraphemeCursor::new(byte_idx, s.len(), true);
  match cursor.prev_boundary(s, 0) {
    Ok(Some(boundary)) => byte_to_char(s, boundary),
    Ok(None) => 0,
    // The whole string is the chunk, so more context is never needed.
    Err(_) => char_idx.saturating_sub(1),
  }
}

pub fn next_grapheme_boundary(s: &str, char_idx: usize) -> usize {
  let len = char_len(s);
  let Some(byte_idx) = char_to_byte(s, char_idx) else {
    return len;
  };
  let mut cursor = GraphemeCursor::new(byte_idx, s.len(), true);
  match cursor.next_boundary(s, 0) {
    Ok(Some(boundary)) => byte_to_char(s, boundary),
    Ok(None) => len,
    Err(_) => (char_idx + 1).min(len),
  }
}

/// Start of the word before `char_idx`: skip separators, then one run of
/// chars of the same category.
pub fn prev_word_boundary(s: &str, char_idx: usize) -> usize {
  let chars: Vec<char> = s.chars().collect();
  let mut idx = char_idx.min(chars.len());
  while idx > 0 && categorize_char(chars[idx - 1]) == CharCategory::Whitespace {
    idx -= 1;
  }
  let Some(&ch) = idx.checked_sub(1).and_then(|i| chars.get(i)) else {
    return 0;
  };
  let category = categorize_char(ch);
  while idx > 0 && categorize_char(chars[idx - 1]) == category {
    idx -= 1;
  }
  idx
}

/// End of the word after `char_idx`.
pub fn next_word_boundary(s: &str, char_idx: usize) -> usize {
  let chars: Vec<char> = s.chars().collect();
  let mut idx = char_idx.min(chars.len());
  while idx < chars.len() && categorize_char(chars[idx]) == CharCategory::Whitespace {
    idx += 1;
  }
  let Some(&ch) = chars.get(idx) else {
    return chars.len();
  };
  let category = categorize_char(ch);
  while idx < chars.len() && categorize_char(chars[idx]) == category {
    idx += 1;
  }
  idx
}

/// Index of the first non-whitespace char, or the char length when there is
/// none.
pub fn first_non_whitespace(s: &str) -> usize {
  let mut len = 0;
  for (idx, ch) in s.chars().enumerate() {
    if !ch.is_whitespace() {
      return idx;
    }
    len = idx + 1;
  }
  len
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn char_indexing() {
    let s = "añb";
    assert_eq!(char_to_byte(s, 2), Some(3));
    assert_eq!(char_to_byte(s, 3), Some(4));
    assert_eq!(char_to_byte(s, 4), None);
    assert_eq!(char_slice(s, 1, 3), Some("ñb"));
    assert_eq!(byte_to_char(s, 3), 2);
  }

  #[test]
  fn grapheme_boundaries_skip_combining_marks() {
    // "e" followed by a combining acute accent is one grapheme of two chars.
    let s = "ae\u{301}b";
    assert_eq!(prev_grapheme_boundary(s, 3), 1);
    assert_eq!(next_grapheme_boundary(s, 1), 3);
    assert_eq!(prev_grapheme_boundary(s, 0), 0);
    assert_eq!(next_grapheme_boundary(s, 4), 4);
  }

  #[test]
  fn word_boundaries() {
    let s = "hello brave  world";
    assert_eq!(prev_word_boundary(s, 18), 13);
    assert_eq!(prev_word_boundary(s, 13), 6);
    assert_eq!(next_word_boundary(s, 5), 11);
    assert_eq!(next_word_boundary(s, 0), 5);
    assert_eq!(prev_word_boundary("foo.bar", 4), 3);
  }

  #[test]
  fn first_non_whitespace_position() {
    assert_eq!(first_non_whitespace("  ab"), 2);
    assert_eq!(first_non_whitespace(" \t "), 3);
    assert_eq!(first_non_whitespace(""), 0);
  }
}
