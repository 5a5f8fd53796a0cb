//! The nine primitive operations every document change is made of.
//!
//! Operations are invertible: each carries enough of the state it replaces
//! (removed text, removed node, previous properties, previous selection) to
//! build its inverse, which is what [`crate::history`] relies on.

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  node::{
    Node,
    Properties,
  },
  path::{
    Affinity,
    Path,
  },
  point::Range,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
  InsertText {
    path:   Path,
    offset: usize,
    text:   String,
  },
  RemoveText {
    path:   Path,
    offset: usize,
    text:   String,
  },
  InsertNode {
    path: Path,
    node: Node,
  },
  RemoveNode {
    path: Path,
    node: Node,
  },
  /// Split the node at `path`; content from `position` on moves into a new
  /// following sibling carrying `properties`.
  SplitNode {
    path:       Path,
    position:   usize,
    properties: Properties,
  },
  /// Merge the node at `path` into its previous sibling, whose content
  /// length was `position`.
  MergeNode {
    path:       Path,
    position:   usize,
    properties: Properties,
  },
  MoveNode {
    path:     Path,
    new_path: Path,
  },
  SetNode {
    path:           Path,
    properties:     Properties,
    new_properties: Properties,
  },
  SetSelection {
    selection:     Option<Range>,
    new_selection: Option<Range>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
  InsertText,
  RemoveText,
  InsertNode,
  RemoveNode,
  SplitNode,
  MergeNode,
  MoveNode,
  SetNode,
  SetSelection,
}

impl Operation {
  pub fn kind(&self) -> OperationKind {
    match self {
      Operation::InsertText { .. } => OperationKind::InsertText,
      Operation::RemoveText { .. } => OperationKind::RemoveText,
      Operation::InsertNode { .. } => OperationKind::InsertNode,
      Operation::RemoveNode { .. } => OperationKind::RemoveNode,
      Operation::SplitNode { .. } => OperationKind::SplitNode,
      Operation::MergeNode { .. } => OperationKind::MergeNode,
      Operation::MoveNode { .. } => OperationKind::MoveNode,
      Operation::SetNode { .. } => OperationKind::SetNode,
      Operation::SetSelection { .. } => OperationKind::SetSelection,
    }
  }

  /// The node the operation targets. `None` for selection changes.
  pub fn path(&self) -> Option<&Path> {
    match self {
      Operation::InsertText { path, .. }
      | Operation::RemoveText { path, .. }
      | Operation::InsertNode { path, .. }
      | Operation::RemoveNode { path, .. }
      | Operation::SplitNode { path, .. }
      | Operation::MergeNode { path, .. }
      | Operation::MoveNode { path, .. }
      | Operation::SetNode { path, .. } => Some(path),
      Operation::SetSelection { .. } => None,
    }
  }

  pub fn is_selection(&self) -> bool {
    matches!(self, Operation::SetSelection { .. })
  }

  pub fn is_text(&self) -> bool {
    matches!(
      self,
      Operation::InsertText { .. } | Operation::RemoveText { .. }
    )
  }

  /// The operation that undoes `self` when applied right after it.
  pub fn inverse(&self) -> Operation {
    match self {
      Operation::InsertText { path, offset, text } => {
        Operation::RemoveText {
          path:   path.clone(),
          offset: *offset,
          text:   text.clone(),
        }
      },
      Operation::RemoveText { path, offset, text } => {
        Operation::InsertText {
          path:   path.clone(),
          offset: *offset,
          text:   text.clone(),
        }
      },
      Operation::InsertNode { path, node } => {
        Operation::RemoveNode {
          path: path.clone(),
          node: node.clone(),
        }
      },
      Operation::RemoveNode { path, node } => {
        Operation::InsertNode {
          path: path.clone(),
          node: node.clone(),
        }
      },
      Operation::SplitNode {
        path,
        position,
        properties,
      } => {
        Operation::MergeNode {
          path:       path.next().unwrap_or_else(|| path.clone()),
          position:   *position,
          properties: properties.clone(),
        }
      },
      Operation::MergeNode {
        path,
        position,
        properties,
      } => {
        Operation::SplitNode {
          path:       path.previous().unwrap_or_else(|| path.clone()),
          position:   *position,
          properties: properties.clone(),
        }
      },
      Operation::MoveNode { path, new_path } => {
        if path == new_path {
          return self.clone();
        }
        if path.is_sibling(new_path) {
          return Operation::MoveNode {
            path:     new_path.clone(),
            new_path: path.clone(),
          };
        }
        // The moved node now lives at the transformed `path`; putting it back
        // means moving it in front of whatever now follows its old slot.
        let inverse_path = path
          .transform(self, Affinity::Forward)
          .unwrap_or_else(|| new_path.clone());
        let inverse_new_path = path
          .next()
          .and_then(|next| next.transform(self, Affinity::Forward))
          .unwrap_or_else(|| path.clone());
        Operation::MoveNode {
          path:     inverse_path,
          new_path: inverse_new_path,
        }
      },
      Operation::SetNode {
        path,
        properties,
        new_properties,
      } => {
        Operation::SetNode {
          path:           path.clone(),
          properties:     new_properties.clone(),
          new_properties: properties.clone(),
        }
      },
      Operation::SetSelection {
        selection,
        new_selection,
      } => {
        Operation::SetSelection {
          selection:     new_selection.clone(),
          new_selection: selection.clone(),
        }
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::Marks;

  #[test]
  fn split_and_merge_invert_each_other() {
    let split = Operation::SplitNode {
      path:       Path::from([0, 1]),
      position:   3,
      properties: Properties::marks(Marks::new().with("bold")),
    };
    let merge = split.inverse();
    assert_eq!(merge, Operation::MergeNode {
      path:       Path::from([0, 2]),
      position:   3,
      properties: Properties::marks(Marks::new().with("bold")),
    });
    assert_eq!(merge.inverse(), split);
  }

  #[test]
  fn text_operations_invert() {
    let insert = Operation::InsertText {
      path:   Path::from([0, 0]),
      offset: 1,
      text:   "ab".into(),
    };
    assert_eq!(insert.inverse().kind(), OperationKind::RemoveText);
    assert_eq!(insert.inverse().inverse(), insert);
  }
}
