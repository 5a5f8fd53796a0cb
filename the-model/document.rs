//! The document tree and the editor state that travels with it.
//!
//! [`Document::apply_raw`] is the only place the tree is mutated. It applies a
//! single [`Operation`] and keeps the selection pointing at valid positions;
//! recording history and normalizing are layered on top by
//! [`Editor::apply`](crate::Editor::apply).

use std::cmp::Ordering;

use thiserror::Error;

use crate::{
  history::History,
  node::{
    self,
    Element,
    Marks,
    Node,
    Text,
  },
  operation::Operation,
  path::{
    Affinity,
    Path,
  },
  point::{
    Point,
    Range,
  },
  text::{
    char_len,
    char_slice,
    char_to_byte,
  },
};

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
  #[error("no node at path {path}")]
  InvalidPath { path: Path },
  #[error("node at {path} is not a text leaf")]
  NotText { path: Path },
  #[error("node at {path} is not an element")]
  NotElement { path: Path },
  #[error("offset {offset} is out of bounds for node {path} of length {len}")]
  OffsetOutOfBounds {
    path:   Path,
    offset: usize,
    len:    usize,
  },
  #[error("cannot merge node at {path} into its previous sibling")]
  CannotMerge { path: Path },
  #[error("cannot move node at {path} to {new_path}")]
  CannotMove { path: Path, new_path: Path },
}

#[derive(Debug, Clone, Default)]
pub struct Document {
  children:    Vec<Node>,
  selection:   Option<Range>,
  /// Marks applied to the next inserted text, overriding the marks of the
  /// leaf at the caret. Cleared whenever the selection changes.
  marks:       Option<Marks>,
  history:     History,
  /// Open normalization-suspending scopes.
  suspensions: usize,
}

impl Document {
  pub fn new(children: Vec<Node>) -> Self {
    Self {
      children,
      ..Self::default()
    }
  }

  pub fn children(&self) -> &[Node] {
    &self.children
  }

  pub fn selection(&self) -> Option<&Range> {
    self.selection.as_ref()
  }

  pub fn marks(&self) -> Option<&Marks> {
    self.marks.as_ref()
  }

  /// Replace the pending insertion marks. This is editor state, not an
  /// operation, so it is neither recorded nor observed by wrappers.
  pub fn set_marks(&mut self, marks: Option<Marks>) {
    self.marks = marks;
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn history_mut(&mut self) -> &mut History {
    &mut self.history
  }

  pub(crate) fn suspend_normalizing(&mut self) {
    self.suspensions += 1;
  }

  pub(crate) fn resume_normalizing(&mut self) {
    self.suspensions = self.suspensions.saturating_sub(1);
  }

  pub fn is_normalizing_suspended(&self) -> bool {
    self.suspensions > 0
  }

  /// Plain text of the document, top-level blocks separated by `\n`.
  pub fn text(&self) -> String {
    self
      .children
      .iter()
      .map(Node::string)
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn node(&self, path: &Path) -> Result<&Node> {
    let invalid = || ModelError::InvalidPath { path: path.clone() };
    let (&first, rest) = path.as_slice().split_first().ok_or_else(invalid)?;
    let mut node = self.children.get(first).ok_or_else(invalid)?;
    for &index in rest {
      node = node.children().get(index).ok_or_else(invalid)?;
    }
    Ok(node)
  }

  fn node_mut(&mut self, path: &Path) -> Result<&mut Node> {
    let invalid = || ModelError::InvalidPath { path: path.clone() };
    let (&first, rest) = path.as_slice().split_first().ok_or_else(invalid)?;
    let mut node = self.children.get_mut(first).ok_or_else(invalid)?;
    for &index in rest {
      node = match node {
        Node::Element(element) => element.children.get_mut(index).ok_or_else(invalid)?,
        Node::Text(_) => return Err(invalid()),
      };
    }
    Ok(node)
  }

  pub fn has_path(&self, path: &Path) -> bool {
    self.node(path).is_ok()
  }

  /// Children of the node at `path`; the root's children for the empty path.
  pub fn children_at(&self, path: &Path) -> Result<&[Node]> {
    if path.is_root() {
      return Ok(&self.children);
    }
    match self.node(path)? {
      Node::Element(element) => Ok(&element.children),
      Node::Text(_) => Err(ModelError::NotElement { path: path.clone() }),
    }
  }

  fn children_mut(&mut self, path: &Path) -> Result<&mut Vec<Node>> {
    if path.is_root() {
      return Ok(&mut self.children);
    }
    match self.node_mut(path)? {
      Node::Element(element) => Ok(&mut element.children),
      Node::Text(_) => Err(ModelError::NotElement { path: path.clone() }),
    }
  }

  pub fn leaf(&self, path: &Path) -> Result<&Text> {
    self
      .node(path)?
      .as_text()
      .ok_or_else(|| ModelError::NotText { path: path.clone() })
  }

  fn leaf_mut(&mut self, path: &Path) -> Result<&mut Text> {
    match self.node_mut(path)? {
      Node::Text(text) => Ok(text),
      Node::Element(_) => Err(ModelError::NotText { path: path.clone() }),
    }
  }

  /// Length in chars of the text leaf at `path`.
  pub fn text_len(&self, path: &Path) -> Result<usize> {
    self.leaf(path).map(Text::len)
  }

  pub fn string(&self, path: &Path) -> Result<String> {
    if path.is_root() {
      return Ok(self.children.iter().map(Node::string).collect());
    }
    self.node(path).map(Node::string)
  }

  /// Every text leaf in document order.
  pub fn texts(&self) -> Vec<(Path, &Text)> {
    let mut out = Vec::new();
    node::collect_texts(&Path::root(), &self.children, &mut out);
    out
  }

  /// Text leaves below `path`, in document order.
  pub fn texts_in(&self, path: &Path) -> Result<Vec<(Path, &Text)>> {
    let mut out = Vec::new();
    match self.node(path)? {
      Node::Text(text) => out.push((path.clone(), text)),
      Node::Element(element) => node::collect_texts(path, &element.children, &mut out),
    }
    Ok(out)
  }

  /// Every node path in pre-order.
  pub fn paths(&self) -> Vec<Path> {
    let mut out = Vec::new();
    node::collect_paths(&Path::root(), &self.children, &mut out);
    out
  }

  /// The first text leaf after `path` in document order.
  pub fn next_text(&self, path: &Path) -> Option<Path> {
    self
      .texts()
      .into_iter()
      .map(|(p, _)| p)
      .find(|p| p > path && !path.is_ancestor(p))
  }

  /// The last text leaf before `path` in document order.
  pub fn previous_text(&self, path: &Path) -> Option<Path> {
    self
      .texts()
      .into_iter()
      .map(|(p, _)| p)
      .take_while(|p| p < path)
      .last()
  }

  /// The innermost element containing `path`.
  pub fn block_above(&self, path: &Path) -> Option<Path> {
    let mut current = path.parent()?;
    while !current.is_root() {
      if matches!(self.node(&current), Ok(Node::Element(_))) {
        return Some(current);
      }
      current = current.parent()?;
    }
    None
  }

  /// First position inside the node at `path`.
  pub fn start(&self, path: &Path) -> Result<Point> {
    let texts = self.texts_in(path)?;
    let (first, _) = texts
      .first()
      .ok_or_else(|| ModelError::NotText { path: path.clone() })?;
    Ok(Point::new(first.clone(), 0))
  }

  /// Last position inside the node at `path`.
  pub fn end(&self, path: &Path) -> Result<Point> {
    let texts = self.texts_in(path)?;
    let (last, text) = texts
      .last()
      .ok_or_else(|| ModelError::NotText { path: path.clone() })?;
    Ok(Point::new(last.clone(), text.len()))
  }

  /// Marks the next inserted text would carry: the explicit insertion marks
  /// when set, otherwise those of the leaf at the selection.
  pub fn effective_marks(&self) -> Option<Marks> {
    if let Some(marks) = &self.marks {
      return Some(marks.clone());
    }
    let selection = self.selection.as_ref()?;
    let point = selection.start();
    if selection.is_expanded() {
      return self.leaf(&point.path).ok().map(|text| text.marks.clone());
    }

    // At the very start of a leaf, typing continues the previous leaf of the
    // same block.
    if point.offset == 0
      && let Some(prev) = self.previous_text(&point.path)
      && self.block_above(&prev) == self.block_above(&point.path)
    {
      return self.leaf(&prev).ok().map(|text| text.marks.clone());
    }
    self.leaf(&point.path).ok().map(|text| text.marks.clone())
  }

  /// Topmost nodes lying strictly between the leaves `start` and `end`,
  /// excluding ancestors of either, in document order.
  pub(crate) fn nodes_between(&self, start: &Path, end: &Path) -> Vec<Path> {
    let mut out: Vec<Path> = Vec::new();
    for path in self.paths() {
      if path <= *start || path >= *end || path.is_ancestor(end) {
        continue;
      }
      if out.last().is_some_and(|last| last.is_ancestor(&path)) {
        continue;
      }
      out.push(path);
    }
    out
  }

  /// Apply one operation to the tree and keep the selection valid.
  pub fn apply_raw(&mut self, op: &Operation) -> Result<()> {
    match op {
      Operation::InsertText { path, offset, text } => {
        let leaf = self.leaf_mut(path)?;
        let byte = char_to_byte(&leaf.text, *offset).ok_or_else(|| {
          ModelError::OffsetOutOfBounds {
            path:   path.clone(),
            offset: *offset,
            len:    char_len(&leaf.text),
          }
        })?;
        leaf.text.insert_str(byte, text);
      },
      Operation::RemoveText { path, offset, text } => {
        let leaf = self.leaf_mut(path)?;
        let end = offset + char_len(text);
        let (Some(from), Some(to)) = (char_to_byte(&leaf.text, *offset), char_to_byte(&leaf.text, end))
        else {
          return Err(ModelError::OffsetOutOfBounds {
            path:   path.clone(),
            offset: end,
            len:    char_len(&leaf.text),
          });
        };
        leaf.text.replace_range(from..to, "");
      },
      Operation::InsertNode { path, node } => {
        let (parent, index) = split_path(path)?;
        let children = self.children_mut(&parent)?;
        if index > children.len() {
          return Err(ModelError::InvalidPath { path: path.clone() });
        }
        children.insert(index, node.clone());
      },
      Operation::RemoveNode { path, .. } => {
        let (parent, index) = split_path(path)?;
        let children = self.children_mut(&parent)?;
        if index >= children.len() {
          return Err(ModelError::InvalidPath { path: path.clone() });
        }
        children.remove(index);
      },
      Operation::MergeNode { path, .. } => {
        let (parent, index) = split_path(path)?;
        let children = self.children_mut(&parent)?;
        let compatible = index > 0
          && index < children.len()
          && matches!(
            (&children[index - 1], &children[index]),
            (Node::Text(_), Node::Text(_)) | (Node::Element(_), Node::Element(_))
          );
        if !compatible {
          return Err(ModelError::CannotMerge { path: path.clone() });
        }
        let node = children.remove(index);
        match (&mut children[index - 1], node) {
          (Node::Text(prev), Node::Text(text)) => prev.text.push_str(&text.text),
          (Node::Element(prev), Node::Element(element)) => prev.children.extend(element.children),
          // Kinds were checked above.
          _ => {},
        }
      },
      Operation::SplitNode {
        path,
        position,
        properties,
      } => {
        let (parent, index) = split_path(path)?;
        let out_of_bounds = |len| {
          ModelError::OffsetOutOfBounds {
            path: path.clone(),
            offset: *position,
            len,
          }
        };
        let mut tail = match self.node_mut(path)? {
          Node::Text(text) => {
            let byte = char_to_byte(&text.text, *position).ok_or_else(|| out_of_bounds(text.len()))?;
            Node::Text(Text {
              text:  text.text.split_off(byte),
              marks: text.marks.clone(),
            })
          },
          Node::Element(element) => {
            if *position > element.children.len() {
              return Err(out_of_bounds(element.children.len()));
            }
            Node::Element(Element {
              kind:     element.kind.clone(),
              children: element.children.split_off(*position),
            })
          },
        };
        tail.set_properties(properties);
        self.children_mut(&parent)?.insert(index + 1, tail);
      },
      Operation::MoveNode { path, new_path } => {
        if path.is_ancestor(new_path) || new_path.is_root() {
          return Err(ModelError::CannotMove {
            path:     path.clone(),
            new_path: new_path.clone(),
          });
        }
        let (parent, index) = split_path(path)?;
        let children = self.children_mut(&parent)?;
        if index >= children.len() {
          return Err(ModelError::InvalidPath { path: path.clone() });
        }
        let node = children.remove(index);
        let cannot_move = || {
          ModelError::CannotMove {
            path:     path.clone(),
            new_path: new_path.clone(),
          }
        };
        let target = path.transform(op, Affinity::Forward).ok_or_else(cannot_move)?;
        let (target_parent, target_index) = split_path(&target)?;
        let children = self.children_mut(&target_parent)?;
        if target_index > children.len() {
          return Err(cannot_move());
        }
        children.insert(target_index, node);
      },
      Operation::SetNode {
        path,
        new_properties,
        ..
      } => {
        self.node_mut(path)?.set_properties(new_properties);
      },
      Operation::SetSelection { new_selection, .. } => {
        self.selection = new_selection.clone();
        self.marks = None;
      },
    }

    if !op.is_selection() {
      self.transform_selection(op);
    }
    Ok(())
  }

  fn transform_selection(&mut self, op: &Operation) {
    let Some(mut selection) = self.selection.take() else {
      return;
    };
    for point in [&mut selection.anchor, &mut selection.focus] {
      match point.transform(op, Affinity::Forward) {
        Some(transformed) => *point = transformed,
        None => {
          let Some(relocated) = op.path().and_then(|removed| self.nearest_text(removed)) else {
            return;
          };
          *point = relocated;
        },
      }
    }
    self.selection = Some(selection);
  }

  /// Where a point inside the just removed node at `removed` goes: the end of
  /// the previous text, or the start of the next one when that is closer.
  fn nearest_text(&self, removed: &Path) -> Option<Point> {
    let mut prev = None;
    let mut next = None;
    for (path, text) in self.texts() {
      if path.compare(removed) == Ordering::Less {
        prev = Some((path, text.len()));
      } else {
        next = Some(path);
        break;
      }
    }

    let prefer_next = match (&prev, &next) {
      (Some(_), Some(next)) if next == removed => !next.has_previous(),
      (Some((prev, _)), Some(next)) => prev.common(removed).len() < next.common(removed).len(),
      _ => false,
    };
    match (prev, next) {
      (Some((path, len)), _) if !prefer_next => Some(Point::new(path, len)),
      (_, Some(path)) => Some(Point::new(path, 0)),
      _ => None,
    }
  }

  /// The structural fix-up the tree needs next, if any.
  pub(crate) fn next_normalization(&self) -> Option<Operation> {
    normalization_in(&Path::root(), &self.children)
  }

  /// Text of the leaf at `path` between two char offsets.
  pub fn slice(&self, path: &Path, start: usize, end: usize) -> Result<String> {
    let leaf = self.leaf(path)?;
    char_slice(&leaf.text, start, end)
      .map(str::to_owned)
      .ok_or_else(|| {
        ModelError::OffsetOutOfBounds {
          path:   path.clone(),
          offset: end,
          len:    leaf.len(),
        }
      })
  }
}

fn split_path(path: &Path) -> Result<(Path, usize)> {
  match (path.parent(), path.last()) {
    (Some(parent), Some(index)) => Ok((parent, index)),
    _ => Err(ModelError::InvalidPath { path: path.clone() }),
  }
}

fn normalization_in(base: &Path, children: &[Node]) -> Option<Operation> {
  for (index, child) in children.iter().enumerate() {
    let path = base.child(index);
    if let Node::Element(element) = child {
      if element.children.is_empty() {
        return Some(Operation::InsertNode {
          path: path.child(0),
          node: Node::text(""),
        });
      }
      if let Some(op) = normalization_in(&path, &element.children) {
        return Some(op);
      }
    }

    let prev = index.checked_sub(1).and_then(|i| children.get(i));
    let (Some(Node::Text(prev)), Node::Text(text)) = (prev, child) else {
      continue;
    };
    if prev.marks == text.marks {
      return Some(Operation::MergeNode {
        path,
        position: prev.len(),
        properties: child.properties(),
      });
    }
    if prev.is_empty() {
      return Some(Operation::RemoveNode {
        path: base.child(index - 1),
        node: Node::Text(prev.clone()),
      });
    }
    if text.is_empty() {
      return Some(Operation::RemoveNode {
        path,
        node: child.clone(),
      });
    }
  }
  None
}
