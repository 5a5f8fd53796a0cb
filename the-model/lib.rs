//! A path-addressed rich-text document model.
//!
//! The tree is made of [`Element`]s holding children and [`Text`] leaves
//! carrying a string plus [`Marks`]. Every change is one of nine invertible
//! [`Operation`]s; positions ([`Path`], [`Point`], [`Range`]) can be rewritten
//! across any operation so they keep addressing the same content.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod document;
pub mod editor;
pub mod history;
pub mod node;
pub mod operation;
pub mod path;
pub mod point;
pub mod text;
pub mod transforms;

pub type Tendril = SmartString<LazyCompact>;

pub use document::{
  Document,
  ModelError,
  Result,
};
pub use editor::{
  Editor,
  without_normalizing,
};
pub use node::{
  Element,
  Marks,
  Node,
  Properties,
  Text,
};
pub use operation::{
  Operation,
  OperationKind,
};
pub use path::{
  Affinity,
  Path,
};
pub use point::{
  Point,
  Range,
};
