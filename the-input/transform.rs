//! Keeping buffered input valid while the document changes underneath it.
//!
//! Every operation that reaches the document, whether issued by the host or
//! by a flush, first rewrites the pending diffs, the pending selection and
//! the pending action target with the functions here.
//!
//! Pending points live in coordinates where every pending diff is already
//! applied. To move one across an operation it is mapped back onto the model
//! text, transformed with backward affinity, and mapped forward again.

use the_model::{
  Affinity,
  Document,
  Node,
  Operation,
  Point,
  Range,
};

use crate::{
  pending::TextDiff,
  string_diff::StringDiff,
};

/// Rewrite `text_diff` for `op`. Returns `None` when its leaf is removed.
pub fn transform_text_diff(text_diff: &TextDiff, op: &Operation) -> Option<TextDiff> {
  let TextDiff { id, path, diff } = text_diff;
  let rebuilt = |path, diff| {
    Some(TextDiff {
      id: *id,
      path,
      diff,
    })
  };

  match op {
    Operation::InsertText {
      path: at,
      offset,
      text,
    } => {
      if at != path || *offset >= diff.end {
        return Some(text_diff.clone());
      }
      let len = text.chars().count();
      let diff = if *offset <= diff.start {
        StringDiff::new(diff.start + len, diff.end + len, diff.text.clone())
      } else {
        StringDiff::new(diff.start, diff.end + len, diff.text.clone())
      };
      rebuilt(path.clone(), diff)
    },
    Operation::RemoveText {
      path: at,
      offset,
      text,
    } => {
      if at != path || *offset >= diff.end {
        return Some(text_diff.clone());
      }
      let len = text.chars().count();
      let map = |x: usize| {
        if x <= *offset {
          x
        } else {
          x.saturating_sub(len).max(*offset)
        }
      };
      rebuilt(
        path.clone(),
        StringDiff::new(map(diff.start), map(diff.end), diff.text.clone()),
      )
    },
    Operation::SplitNode {
      path: at,
      position,
      ..
    } => {
      if at != path || *position >= diff.end {
        return rebuilt(path.transform(op, Affinity::Backward)?, diff.clone());
      }
      if *position > diff.start {
        return rebuilt(
          path.clone(),
          StringDiff::new(diff.start, (*position).min(diff.end), diff.text.clone()),
        );
      }
      rebuilt(
        path.transform(op, Affinity::Forward)?,
        StringDiff::new(
          diff.start - position,
          diff.end - position,
          diff.text.clone(),
        ),
      )
    },
    Operation::MergeNode {
      path: at,
      position,
      ..
    } => {
      let new_path = path.transform(op, Affinity::Forward)?;
      if at != path {
        return rebuilt(new_path, diff.clone());
      }
      rebuilt(
        new_path,
        StringDiff::new(
          diff.start + position,
          diff.end + position,
          diff.text.clone(),
        ),
      )
    },
    _ => rebuilt(path.transform(op, Affinity::Forward)?, diff.clone()),
  }
}

/// Rewrite a pending point for `op`, given the pending diffs as they were
/// before `op`.
pub fn transform_pending_point(diffs: &[TextDiff], point: &Point, op: &Operation) -> Option<Point> {
  let Some(entry) = diffs.iter().find(|entry| entry.path == point.path) else {
    return point.transform(op, Affinity::Backward);
  };
  let diff = &entry.diff;
  if point.offset <= diff.start {
    return point.transform(op, Affinity::Backward);
  }

  let inserted = diff.inserted_len();
  // Inside the inserted text: follow the diff's start.
  if point.offset <= diff.start + inserted {
    let anchor = Point::new(point.path.clone(), diff.start);
    let transformed = anchor.transform(op, Affinity::Backward)?;
    return Some(Point::new(
      transformed.path,
      transformed.offset + point.offset - diff.start,
    ));
  }

  // After the diff: map onto the model text, transform, map back. The diff
  // only shifts the point while both still share a leaf.
  let model_offset = point.offset - inserted + diff.removed_len();
  let anchor = Point::new(point.path.clone(), model_offset);
  let transformed = anchor.transform(op, Affinity::Backward)?;
  match transform_text_diff(entry, op) {
    Some(moved) if moved.path == transformed.path => {
      let offset = (transformed.offset + moved.diff.inserted_len())
        .saturating_sub(moved.diff.removed_len());
      Some(Point::new(transformed.path, offset))
    },
    _ => Some(transformed),
  }
}

pub fn transform_pending_range(diffs: &[TextDiff], range: &Range, op: &Operation) -> Option<Range> {
  let anchor = transform_pending_point(diffs, &range.anchor, op)?;
  if range.is_collapsed() {
    return Some(Range::collapsed(anchor));
  }
  let focus = transform_pending_point(diffs, &range.focus, op)?;
  Some(Range::new(anchor, focus))
}

/// The model range a pending diff replaces.
pub fn target_range(text_diff: &TextDiff) -> Range {
  Range::new(
    Point::new(text_diff.path.clone(), text_diff.diff.start),
    Point::new(text_diff.path.clone(), text_diff.diff.end),
  )
}

/// Whether the document shows what `text_diff` says it should after it was
/// applied. Text inserted at the very end of a leaf may have landed in the
/// following leaf (when marks differ), so that is checked too.
pub fn verify_diff_state(doc: &Document, text_diff: &TextDiff) -> bool {
  let TextDiff { path, diff, .. } = text_diff;
  let Ok(leaf) = doc.leaf(path) else {
    return false;
  };
  let inserted = diff.inserted_len();

  if diff.start != leaf.len() || inserted == 0 {
    return doc
      .slice(path, diff.start, diff.start + inserted)
      .is_ok_and(|text| text == diff.text);
  }

  let Some(next) = path.next() else {
    return false;
  };
  match doc.node(&next) {
    Ok(Node::Text(next)) => next.text.starts_with(&diff.text),
    _ => false,
  }
}

/// Re-express a point whose offset overflows its leaf by walking forward
/// through the following leaves of the same block. `None` when the point no
/// longer resolves.
pub fn normalize_point(doc: &Document, point: &Point) -> Option<Point> {
  let mut path = point.path.clone();
  let mut offset = point.offset;
  let mut len = doc.text_len(&path).ok()?;
  let block = doc.block_above(&path)?;

  while offset > len {
    let next = doc.next_text(&path)?;
    if !block.is_ancestor(&next) {
      return None;
    }
    offset -= len;
    len = doc.text_len(&next).ok()?;
    path = next;
  }
  Some(Point::new(path, offset))
}

pub fn normalize_range(doc: &Document, range: &Range) -> Option<Range> {
  let anchor = normalize_point(doc, &range.anchor)?;
  if range.is_collapsed() {
    return Some(Range::collapsed(anchor));
  }
  let focus = normalize_point(doc, &range.focus)?;
  Some(Range::new(anchor, focus))
}
