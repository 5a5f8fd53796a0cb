//! Child-index paths into the document tree.
//!
//! A [`Path`] is the list of child indices leading from the document root to
//! a node. The empty path is the root itself.
//!
//! ```text
//! root
//! ├── [0] paragraph
//! │   ├── [0, 0] "hello "
//! │   └── [0, 1] "world"      (bold)
//! └── [1] paragraph
//!     └── [1, 0] "!"
//! ```
//!
//! Paths are rewritten by [`Path::transform`] whenever an [`Operation`] moves
//! nodes around, so anything holding a path across operations (selections,
//! pending input) can keep pointing at the same node.

use std::{
  cmp::Ordering,
  fmt,
};

use serde::{
  Deserialize,
  Serialize,
};
use smallvec::SmallVec;

use crate::operation::Operation;

/// How a position resolves when an operation happens exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
  /// Move along with content inserted at the position.
  Forward,
  /// Stay before content inserted at the position.
  Backward,
  /// Neither; positions exactly at a split point are dropped.
  Exclusive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(SmallVec<[usize; 8]>);

impl Path {
  pub fn root() -> Self {
    Self(SmallVec::new())
  }

  pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
    Self(indices.into_iter().collect())
  }

  pub fn as_slice(&self) -> &[usize] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }

  pub fn last(&self) -> Option<usize> {
    self.0.last().copied()
  }

  pub fn parent(&self) -> Option<Path> {
    let (_, head) = self.0.split_last()?;
    Some(Self(head.iter().copied().collect()))
  }

  pub fn child(&self, index: usize) -> Path {
    let mut path = self.clone();
    path.0.push(index);
    path
  }

  /// The following sibling. `None` for the root.
  pub fn next(&self) -> Option<Path> {
    let mut path = self.clone();
    let last = path.0.last_mut()?;
    *last += 1;
    Some(path)
  }

  /// The preceding sibling. `None` for the root and for first children.
  pub fn previous(&self) -> Option<Path> {
    let mut path = self.clone();
    let last = path.0.last_mut()?;
    *last = last.checked_sub(1)?;
    Some(path)
  }

  pub fn has_previous(&self) -> bool {
    self.last().is_some_and(|last| last > 0)
  }

  /// Compare only the shared prefix; ancestors compare equal to their
  /// descendants.
  pub fn compare(&self, another: &Path) -> Ordering {
    let len = self.len().min(another.len());
    self.0[..len].cmp(&another.0[..len])
  }

  pub fn is_ancestor(&self, another: &Path) -> bool {
    self.len() < another.len() && self.compare(another) == Ordering::Equal
  }

  pub fn is_descendant(&self, another: &Path) -> bool {
    another.is_ancestor(self)
  }

  pub fn is_before(&self, another: &Path) -> bool {
    self.compare(another) == Ordering::Less
  }

  pub fn is_after(&self, another: &Path) -> bool {
    self.compare(another) == Ordering::Greater
  }

  /// Whether `self` is a left sibling of `another` or of one of its
  /// ancestors.
  pub fn ends_before(&self, another: &Path) -> bool {
    let Some((&last, head)) = self.0.split_last() else {
      return false;
    };
    another.len() > head.len()
      && another.0[..head.len()] == *head
      && last < another.0[head.len()]
  }

  pub fn is_sibling(&self, another: &Path) -> bool {
    if self.is_root() || self.len() != another.len() {
      return false;
    }
    let depth = self.len() - 1;
    self.0[..depth] == another.0[..depth] && self.0[depth] != another.0[depth]
  }

  /// Longest shared ancestor path.
  pub fn common(&self, another: &Path) -> Path {
    Self(
      self
        .0
        .iter()
        .zip(another.0.iter())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| *a)
        .collect(),
    )
  }

  /// Rewrite the path so it keeps addressing the same node after `op` is
  /// applied. Returns `None` when the node no longer exists.
  pub fn transform(&self, op: &Operation, affinity: Affinity) -> Option<Path> {
    if self.is_root() {
      return Some(self.clone());
    }
    if op.path().is_some_and(Path::is_root) {
      return Some(self.clone());
    }

    let mut p = self.clone();
    match op {
      Operation::InsertNode { path: at, .. } => {
        if at == self || at.ends_before(self) || at.is_ancestor(self) {
          p.0[at.len() - 1] += 1;
        }
      },
      Operation::RemoveNode { path: at, .. } => {
        if at == self || at.is_ancestor(self) {
          return None;
        }
        if at.ends_before(self) {
          p.0[at.len() - 1] -= 1;
        }
      },
      Operation::MergeNode {
        path: at, position, ..
      } => {
        if at == self || at.ends_before(self) {
          p.0[at.len() - 1] = p.0[at.len() - 1].saturating_sub(1);
        } else if at.is_ancestor(self) {
          p.0[at.len() - 1] = p.0[at.len() - 1].saturating_sub(1);
          p.0[at.len()] += position;
        }
      },
      Operation::SplitNode {
        path: at, position, ..
      } => {
        if at == self {
          match affinity {
            Affinity::Forward => {
              let last = p.0.len() - 1;
              p.0[last] += 1;
            },
            Affinity::Backward => {},
            Affinity::Exclusive => return None,
          }
        } else if at.ends_before(self) {
          p.0[at.len() - 1] += 1;
        } else if at.is_ancestor(self) && self.0[at.len()] >= *position {
          p.0[at.len() - 1] += 1;
          p.0[at.len()] -= position;
        }
      },
      Operation::MoveNode {
        path: from,
        new_path: to,
      } => {
        if from == to {
          return Some(p);
        }
        if from.is_ancestor(self) || from == self {
          let mut moved = to.clone();
          if from.ends_before(to) && from.len() < to.len() {
            moved.0[from.len() - 1] -= 1;
          }
          moved.0.extend_from_slice(&self.0[from.len()..]);
          return Some(moved);
        } else if from.is_sibling(to) && (to.is_ancestor(self) || to == self) {
          if from.ends_before(self) {
            p.0[from.len() - 1] -= 1;
          } else {
            p.0[from.len() - 1] += 1;
          }
        } else if to.ends_before(self) || to == self || to.is_ancestor(self) {
          if from.ends_before(self) {
            p.0[from.len() - 1] -= 1;
          }
          p.0[to.len() - 1] += 1;
        } else if from.ends_before(self) {
          if to == self {
            p.0[to.len() - 1] += 1;
          }
          p.0[from.len() - 1] -= 1;
        }
      },
      Operation::InsertText { .. }
      | Operation::RemoveText { .. }
      | Operation::SetNode { .. }
      | Operation::SetSelection { .. } => {},
    }
    Some(p)
  }
}

impl PartialOrd for Path {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Document order: ancestors sort before their descendants.
impl Ord for Path {
  fn cmp(&self, other: &Self) -> Ordering {
    self.0.as_slice().cmp(other.0.as_slice())
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, index) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, ",")?;
      }
      write!(f, "{index}")?;
    }
    write!(f, "]")
  }
}

impl From<&[usize]> for Path {
  fn from(value: &[usize]) -> Self {
    Self(value.iter().copied().collect())
  }
}

impl<const N: usize> From<[usize; N]> for Path {
  fn from(value: [usize; N]) -> Self {
    Self(value.into_iter().collect())
  }
}

impl From<Vec<usize>> for Path {
  fn from(value: Vec<usize>) -> Self {
    Self(SmallVec::from_vec(value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::{
    Node,
    Properties,
  };

  fn path<const N: usize>(indices: [usize; N]) -> Path {
    Path::from(indices)
  }

  #[test]
  fn relations() {
    assert!(path([0]).is_ancestor(&path([0, 1])));
    assert!(!path([0, 1]).is_ancestor(&path([0, 1])));
    assert!(path([0, 1]).ends_before(&path([0, 2, 4])));
    assert!(!path([0, 2]).ends_before(&path([0, 2, 4])));
    assert!(path([1, 0]).is_sibling(&path([1, 3])));
    assert!(!path([1, 0]).is_sibling(&path([2, 0])));
    assert_eq!(path([1, 2, 3]).common(&path([1, 2, 5])), path([1, 2]));
    assert_eq!(path([0, 0]).previous(), None);
    assert_eq!(path([0, 3]).next(), Some(path([0, 4])));
    assert!(path([0]) < path([0, 0]));
    assert!(path([0, 5]) < path([1]));
  }

  #[test]
  fn transform_insert_and_remove() {
    let insert = Operation::InsertNode {
      path: path([0, 1]),
      node: Node::text(""),
    };
    assert_eq!(
      path([0, 1]).transform(&insert, Affinity::Forward),
      Some(path([0, 2]))
    );
    assert_eq!(
      path([0, 0]).transform(&insert, Affinity::Forward),
      Some(path([0, 0]))
    );

    let remove = Operation::RemoveNode {
      path: path([0]),
      node: Node::text(""),
    };
    assert_eq!(path([0, 3]).transform(&remove, Affinity::Forward), None);
    assert_eq!(
      path([2, 3]).transform(&remove, Affinity::Forward),
      Some(path([1, 3]))
    );
  }

  #[test]
  fn transform_split_and_merge() {
    let split = Operation::SplitNode {
      path:       path([0]),
      position:   2,
      properties: Properties::default(),
    };
    assert_eq!(
      path([0, 3]).transform(&split, Affinity::Forward),
      Some(path([1, 1]))
    );
    assert_eq!(
      path([0, 1]).transform(&split, Affinity::Forward),
      Some(path([0, 1]))
    );
    assert_eq!(path([0]).transform(&split, Affinity::Exclusive), None);
    assert_eq!(
      path([0]).transform(&split, Affinity::Backward),
      Some(path([0]))
    );

    let merge = Operation::MergeNode {
      path:       path([1]),
      position:   2,
      properties: Properties::default(),
    };
    assert_eq!(
      path([1, 1]).transform(&merge, Affinity::Forward),
      Some(path([0, 3]))
    );
    assert_eq!(
      path([2]).transform(&merge, Affinity::Forward),
      Some(path([1]))
    );
  }

  #[test]
  fn transform_move() {
    let op = Operation::MoveNode {
      path:     path([0]),
      new_path: path([2]),
    };
    assert_eq!(
      path([0, 1]).transform(&op, Affinity::Forward),
      Some(path([2, 1]))
    );
    assert_eq!(
      path([1]).transform(&op, Affinity::Forward),
      Some(path([0]))
    );
    assert_eq!(
      path([3]).transform(&op, Affinity::Forward),
      Some(path([3]))
    );
  }
}
