//! Caret positions and selection spans.
//!
//! A [`Point`] is a char offset inside the text leaf at `path`. A [`Range`]
//! has an `anchor` and a `focus`; when the focus comes first in document
//! order the range is backward.

use std::cmp::Ordering;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  operation::Operation,
  path::{
    Affinity,
    Path,
  },
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
  pub path:   Path,
  pub offset: usize,
}

impl Point {
  pub fn new(path: impl Into<Path>, offset: usize) -> Self {
    Self {
      path: path.into(),
      offset,
    }
  }

  pub fn compare(&self, another: &Point) -> Ordering {
    match self.path.cmp(&another.path) {
      Ordering::Equal => self.offset.cmp(&another.offset),
      ordering => ordering,
    }
  }

  pub fn is_before(&self, another: &Point) -> bool {
    self.compare(another) == Ordering::Less
  }

  pub fn is_after(&self, another: &Point) -> bool {
    self.compare(another) == Ordering::Greater
  }

  /// Rewrite the point so it keeps addressing the same character position
  /// after `op` is applied. Returns `None` when the leaf was removed, or when
  /// an exclusive point sits exactly at a split.
  pub fn transform(&self, op: &Operation, affinity: Affinity) -> Option<Point> {
    let mut p = self.clone();
    match op {
      Operation::InsertNode { .. } | Operation::MoveNode { .. } => {
        p.path = self.path.transform(op, affinity)?;
      },
      Operation::InsertText { path, offset, text } => {
        if *path == self.path
          && (*offset < self.offset || (*offset == self.offset && affinity == Affinity::Forward))
        {
          p.offset += text.chars().count();
        }
      },
      Operation::RemoveText { path, offset, text } => {
        if *path == self.path && *offset <= self.offset {
          p.offset -= (self.offset - offset).min(text.chars().count());
        }
      },
      Operation::MergeNode { path, position, .. } => {
        if *path == self.path {
          p.offset += position;
        }
        p.path = self.path.transform(op, affinity)?;
      },
      Operation::RemoveNode { path, .. } => {
        if *path == self.path || path.is_ancestor(&self.path) {
          return None;
        }
        p.path = self.path.transform(op, affinity)?;
      },
      Operation::SplitNode { path, position, .. } => {
        if *path == self.path {
          if *position == self.offset && affinity == Affinity::Exclusive {
            return None;
          }
          if *position < self.offset || (*position == self.offset && affinity == Affinity::Forward) {
            p.offset -= position;
            p.path = self.path.transform(op, Affinity::Forward)?;
          }
        } else {
          p.path = self.path.transform(op, affinity)?;
        }
      },
      Operation::SetNode { .. } | Operation::SetSelection { .. } => {},
    }
    Some(p)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
  pub anchor: Point,
  pub focus:  Point,
}

impl Range {
  pub fn new(anchor: Point, focus: Point) -> Self {
    Self { anchor, focus }
  }

  pub fn collapsed(point: Point) -> Self {
    Self {
      anchor: point.clone(),
      focus:  point,
    }
  }

  pub fn is_collapsed(&self) -> bool {
    self.anchor == self.focus
  }

  pub fn is_expanded(&self) -> bool {
    !self.is_collapsed()
  }

  pub fn is_backward(&self) -> bool {
    self.anchor.is_after(&self.focus)
  }

  /// `(start, end)` in document order.
  pub fn edges(&self) -> (&Point, &Point) {
    if self.is_backward() {
      (&self.focus, &self.anchor)
    } else {
      (&self.anchor, &self.focus)
    }
  }

  pub fn start(&self) -> &Point {
    self.edges().0
  }

  pub fn end(&self) -> &Point {
    self.edges().1
  }

  pub fn includes(&self, point: &Point) -> bool {
    let (start, end) = self.edges();
    !point.is_before(start) && !point.is_after(end)
  }

  /// Transform both ends with the same affinity. Returns `None` if either
  /// end is invalidated.
  pub fn transform(&self, op: &Operation, affinity: Affinity) -> Option<Range> {
    let anchor = self.anchor.transform(op, affinity)?;
    let focus = if self.is_collapsed() {
      anchor.clone()
    } else {
      self.focus.transform(op, affinity)?
    };
    Some(Range { anchor, focus })
  }
}

impl From<Point> for Range {
  fn from(point: Point) -> Self {
    Range::collapsed(point)
  }
}
