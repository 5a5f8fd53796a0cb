//! Document tree nodes.

use std::collections::BTreeSet;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  Tendril,
  path::Path,
};

/// Formatting attributes carried by a text leaf (`bold`, `italic`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marks(BTreeSet<Tendril>);

impl Marks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn contains(&self, mark: &str) -> bool {
    self.0.iter().any(|m| m.as_str() == mark)
  }

  pub fn insert(&mut self, mark: impl Into<Tendril>) -> bool {
    self.0.insert(mark.into())
  }

  pub fn remove(&mut self, mark: &str) -> bool {
    let before = self.0.len();
    self.0.retain(|m| m.as_str() != mark);
    self.0.len() != before
  }

  pub fn with(mut self, mark: impl Into<Tendril>) -> Self {
    self.insert(mark);
    self
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(Tendril::as_str)
  }
}

impl<T: Into<Tendril>> FromIterator<T> for Marks {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    Self(iter.into_iter().map(Into::into).collect())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
  pub text:  String,
  #[serde(default, skip_serializing_if = "Marks::is_empty")]
  pub marks: Marks,
}

impl Text {
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      text:  text.into(),
      marks: Marks::default(),
    }
  }

  pub fn with_marks(text: impl Into<String>, marks: Marks) -> Self {
    Self {
      text: text.into(),
      marks,
    }
  }

  /// Length in chars; all model offsets count chars.
  pub fn len(&self) -> usize {
    self.text.chars().count()
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
  pub kind:     Tendril,
  pub children: Vec<Node>,
}

impl Element {
  pub fn new(kind: impl Into<Tendril>, children: Vec<Node>) -> Self {
    Self {
      kind: kind.into(),
      children,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
  Element(Element),
  Text(Text),
}

impl Node {
  pub fn text(text: impl Into<String>) -> Self {
    Node::Text(Text::new(text))
  }

  pub fn element(kind: impl Into<Tendril>, children: Vec<Node>) -> Self {
    Node::Element(Element::new(kind, children))
  }

  pub fn paragraph(text: impl Into<String>) -> Self {
    Node::element("paragraph", vec![Node::text(text)])
  }

  pub fn as_text(&self) -> Option<&Text> {
    match self {
      Node::Text(text) => Some(text),
      Node::Element(_) => None,
    }
  }

  pub fn as_element(&self) -> Option<&Element> {
    match self {
      Node::Element(element) => Some(element),
      Node::Text(_) => None,
    }
  }

  pub fn children(&self) -> &[Node] {
    match self {
      Node::Element(element) => &element.children,
      Node::Text(_) => &[],
    }
  }

  /// Concatenated text of every leaf below this node.
  pub fn string(&self) -> String {
    match self {
      Node::Text(text) => text.text.clone(),
      Node::Element(element) => element.children.iter().map(Node::string).collect(),
    }
  }

  pub fn properties(&self) -> Properties {
    match self {
      Node::Text(text) => {
        Properties {
          kind:  None,
          marks: Some(text.marks.clone()),
        }
      },
      Node::Element(element) => {
        Properties {
          kind:  Some(element.kind.clone()),
          marks: None,
        }
      },
    }
  }

  /// Overwrite the properties present in `properties`.
  pub fn set_properties(&mut self, properties: &Properties) {
    match self {
      Node::Text(text) => {
        if let Some(marks) = &properties.marks {
          text.marks = marks.clone();
        }
      },
      Node::Element(element) => {
        if let Some(kind) = &properties.kind {
          element.kind = kind.clone();
        }
      },
    }
  }
}

/// The non-content attributes of a node, as carried by `split_node`,
/// `merge_node` and `set_node`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub kind:  Option<Tendril>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub marks: Option<Marks>,
}

impl Properties {
  pub fn marks(marks: Marks) -> Self {
    Self {
      kind:  None,
      marks: Some(marks),
    }
  }
}

/// Depth-first walk over `children`, yielding every text leaf with its path
/// relative to `base`.
pub(crate) fn collect_texts<'a>(base: &Path, children: &'a [Node], out: &mut Vec<(Path, &'a Text)>) {
  for (index, child) in children.iter().enumerate() {
    let path = base.child(index);
    match child {
      Node::Text(text) => out.push((path, text)),
      Node::Element(element) => collect_texts(&path, &element.children, out),
    }
  }
}

/// Pre-order walk yielding every node path below `base`.
pub(crate) fn collect_paths(base: &Path, children: &[Node], out: &mut Vec<Path>) {
  for (index, child) in children.iter().enumerate() {
    let path = base.child(index);
    out.push(path.clone());
    collect_paths(&path, child.children(), out);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deserializes_untagged_nodes() {
    let json = r#"[{"kind":"paragraph","children":[{"text":"hi "},{"text":"there","marks":["bold"]}]}]"#;
    let nodes: Vec<Node> = serde_json::from_str(json).unwrap();
    assert_eq!(nodes.len(), 1);
    let children = nodes[0].children();
    assert_eq!(children[0], Node::text("hi "));
    assert!(children[1].as_text().unwrap().marks.contains("bold"));
    assert_eq!(nodes[0].string(), "hi there");
  }

  #[test]
  fn marks_are_a_set() {
    let mut marks = Marks::new().with("bold");
    assert!(!marks.insert("bold"));
    assert!(marks.insert("italic"));
    assert_eq!(marks.iter().collect::<Vec<_>>(), vec!["bold", "italic"]);
    assert!(marks.remove("bold"));
    assert!(!marks.contains("bold"));
  }
}
