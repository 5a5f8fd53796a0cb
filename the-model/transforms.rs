//! Editing commands built from operations.
//!
//! Every command acts on the current selection and goes through
//! [`Editor::apply`], so wrappers observe each operation it produces. Commands
//! that emit more than one operation run inside [`without_normalizing`] and
//! form a single undo step.

use crate::{
  Editor,
  document::{
    Document,
    ModelError,
    Result,
  },
  editor::without_normalizing,
  node::{
    self,
    Marks,
    Node,
    Properties,
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
    next_grapheme_boundary,
    next_word_boundary,
    prev_grapheme_boundary,
    prev_word_boundary,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Forward,
  Backward,
}

/// How far a collapsed delete reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
  Character,
  Word,
  /// Without layout information a line is the whole block.
  Line,
  Block,
}

/// Payload of a paste or drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTransfer {
  /// Structured content copied from an editor.
  pub fragment: Option<Vec<Node>>,
  pub text:     Option<String>,
}

impl DataTransfer {
  pub fn text(text: impl Into<String>) -> Self {
    Self {
      fragment: None,
      text:     Some(text.into()),
    }
  }
}

pub fn select<E: Editor + ?Sized>(editor: &mut E, range: Range) -> Result<()> {
  let selection = editor.doc().selection().cloned();
  if selection.as_ref() == Some(&range) {
    return Ok(());
  }
  editor.apply(Operation::SetSelection {
    selection,
    new_selection: Some(range),
  })
}

pub fn deselect<E: Editor + ?Sized>(editor: &mut E) -> Result<()> {
  let Some(selection) = editor.doc().selection().cloned() else {
    return Ok(());
  };
  editor.apply(Operation::SetSelection {
    selection:     Some(selection),
    new_selection: None,
  })
}

/// Replace the selection with `text`. Pending insertion marks, if any, are
/// applied to the new text and consumed.
pub fn insert_text<E: Editor + ?Sized>(editor: &mut E, text: &str) -> Result<()> {
  let Some(selection) = editor.doc().selection().cloned() else {
    return Ok(());
  };
  let marks = editor.doc().marks().cloned();

  without_normalizing(editor, |editor| {
    if selection.is_expanded() {
      delete_range(editor, &selection)?;
    }
    if text.is_empty() {
      return Ok(());
    }
    let Some(point) = caret(editor.doc()) else {
      return Ok(());
    };
    match marks {
      Some(marks) => insert_marked_text(editor, &point, text, &marks),
      None => {
        editor.apply(Operation::InsertText {
          path:   point.path,
          offset: point.offset,
          text:   text.to_owned(),
        })
      },
    }
  })?;
  editor.doc_mut().set_marks(None);
  Ok(())
}

/// Delete the expanded selection. A collapsed selection is left alone.
pub fn delete_fragment<E: Editor + ?Sized>(editor: &mut E, direction: Direction) -> Result<()> {
  let Some(selection) = editor.doc().selection().cloned() else {
    return Ok(());
  };
  if selection.is_collapsed() {
    return Ok(());
  }
  tracing::trace!(?direction, "delete fragment");
  delete_range(editor, &selection)
}

pub fn delete_backward<E: Editor + ?Sized>(editor: &mut E, unit: Unit) -> Result<()> {
  delete_unit(editor, unit, Direction::Backward)
}

pub fn delete_forward<E: Editor + ?Sized>(editor: &mut E, unit: Unit) -> Result<()> {
  delete_unit(editor, unit, Direction::Forward)
}

fn delete_unit<E: Editor + ?Sized>(editor: &mut E, unit: Unit, direction: Direction) -> Result<()> {
  let Some(selection) = editor.doc().selection().cloned() else {
    return Ok(());
  };
  if selection.is_expanded() {
    return delete_fragment(editor, direction);
  }
  let point = selection.anchor;
  let target = match direction {
    Direction::Backward => position_before(editor.doc(), &point, unit),
    Direction::Forward => position_after(editor.doc(), &point, unit),
  };
  let Some(target) = target else {
    return Ok(());
  };
  delete_range(editor, &Range::new(target, point))
}

/// Split the block at the caret.
pub fn insert_break<E: Editor + ?Sized>(editor: &mut E) -> Result<()> {
  let Some(selection) = editor.doc().selection().cloned() else {
    return Ok(());
  };
  without_normalizing(editor, |editor| {
    if selection.is_expanded() {
      delete_range(editor, &selection)?;
    }
    let Some(point) = caret(editor.doc()) else {
      return Ok(());
    };
    split_block_at(editor, &point)
  })
}

pub fn insert_soft_break<E: Editor + ?Sized>(editor: &mut E) -> Result<()> {
  insert_text(editor, "\n")
}

/// Insert structured content: the leaves of the first block join the caret's
/// block, every further block starts a new one.
pub fn insert_fragment<E: Editor + ?Sized>(editor: &mut E, fragment: &[Node]) -> Result<()> {
  let Some(selection) = editor.doc().selection().cloned() else {
    return Ok(());
  };
  without_normalizing(editor, |editor| {
    if selection.is_expanded() {
      delete_range(editor, &selection)?;
    }
    for (index, block) in fragment.iter().enumerate() {
      let Some(point) = caret(editor.doc()) else {
        return Ok(());
      };
      if index > 0 {
        split_block_at(editor, &point)?;
      }
      let mut leaves = Vec::new();
      node::collect_texts(&Path::root(), std::slice::from_ref(block), &mut leaves);
      for (_, leaf) in leaves {
        let Some(point) = caret(editor.doc()) else {
          return Ok(());
        };
        if !leaf.text.is_empty() {
          insert_marked_text(editor, &point, &leaf.text, &leaf.marks)?;
        }
      }
    }
    Ok(())
  })
}

/// Paste: a fragment when one is present, otherwise plain text with every
/// line break starting a new block.
pub fn insert_data<E: Editor + ?Sized>(editor: &mut E, data: &DataTransfer) -> Result<()> {
  if let Some(fragment) = data.fragment.as_deref()
    && !fragment.is_empty()
  {
    return insert_fragment(editor, fragment);
  }
  let Some(text) = data.text.as_deref() else {
    return Ok(());
  };
  let text = text.replace("\r\n", "\n").replace('\r', "\n");
  without_normalizing(editor, |editor| {
    for (index, line) in text.split('\n').enumerate() {
      if index > 0 {
        insert_break(editor)?;
      }
      insert_text(editor, line)?;
    }
    Ok(())
  })
}

pub fn add_mark<E: Editor + ?Sized>(editor: &mut E, mark: &str) -> Result<()> {
  update_marks(editor, |marks| {
    marks.insert(mark);
  })
}

pub fn remove_mark<E: Editor + ?Sized>(editor: &mut E, mark: &str) -> Result<()> {
  update_marks(editor, |marks| {
    marks.remove(mark);
  })
}

/// Collapsed selections only change the pending insertion marks; expanded
/// ones rewrite the marks of every covered leaf, splitting the edge leaves.
fn update_marks<E: Editor + ?Sized>(editor: &mut E, update: impl Fn(&mut Marks)) -> Result<()> {
  let Some(selection) = editor.doc().selection().cloned() else {
    return Ok(());
  };
  if selection.is_collapsed() {
    let mut marks = editor.doc().effective_marks().unwrap_or_default();
    update(&mut marks);
    editor.doc_mut().set_marks(Some(marks));
    return Ok(());
  }

  let (start, end) = selection.edges();
  let (start, end) = (start.clone(), end.clone());
  without_normalizing(editor, |editor| {
    // Split the end first so the start path stays valid.
    let mut last = end.path.clone();
    if end.offset > 0 && end.offset < editor.doc().text_len(&end.path)? {
      split_leaf(editor, &end.path, end.offset)?;
    }
    let mut first = start.path.clone();
    if start.offset > 0 && start.offset < editor.doc().text_len(&start.path)? {
      let op = split_leaf(editor, &start.path, start.offset)?;
      first = first.next().ok_or_else(|| ModelError::InvalidPath { path: first.clone() })?;
      last = if start.path == end.path {
        first.clone()
      } else {
        last.transform(&op, Affinity::Forward).unwrap_or(last)
      };
    } else if start.path != end.path && start.offset == editor.doc().text_len(&start.path)? {
      first = editor.doc().next_text(&first).unwrap_or(first);
    }
    if end.offset == 0
      && last != first
      && let Some(previous) = editor.doc().previous_text(&last)
    {
      last = previous;
    }

    let covered: Vec<Path> = editor
      .doc()
      .texts()
      .into_iter()
      .map(|(path, _)| path)
      .filter(|path| *path >= first && *path <= last)
      .collect();
    for path in covered {
      let old = editor.doc().leaf(&path)?.marks.clone();
      let mut marks = old.clone();
      update(&mut marks);
      if marks != old {
        editor.apply(Operation::SetNode {
          path,
          properties: Properties::marks(old),
          new_properties: Properties::marks(marks),
        })?;
      }
    }
    Ok(())
  })
}

fn split_leaf<E: Editor + ?Sized>(editor: &mut E, path: &Path, position: usize) -> Result<Operation> {
  let properties = editor.doc().node(path)?.properties();
  let op = Operation::SplitNode {
    path: path.clone(),
    position,
    properties,
  };
  editor.apply(op.clone())?;
  Ok(op)
}

fn caret(doc: &Document) -> Option<Point> {
  doc.selection().map(|selection| selection.anchor.clone())
}

/// Insert `text` carrying `marks` at `point`. Text matching the leaf's marks
/// is inserted in place; otherwise it becomes its own leaf and the caret is
/// moved behind it.
fn insert_marked_text<E: Editor + ?Sized>(
  editor: &mut E,
  point: &Point,
  text: &str,
  marks: &Marks,
) -> Result<()> {
  let leaf = editor.doc().leaf(&point.path)?;
  if leaf.marks == *marks {
    return editor.apply(Operation::InsertText {
      path:   point.path.clone(),
      offset: point.offset,
      text:   text.to_owned(),
    });
  }

  let len = leaf.len();
  let at = if point.offset == 0 {
    point.path.clone()
  } else if point.offset >= len {
    point
      .path
      .next()
      .ok_or_else(|| ModelError::InvalidPath { path: point.path.clone() })?
  } else {
    split_leaf(editor, &point.path, point.offset)?;
    point
      .path
      .next()
      .ok_or_else(|| ModelError::InvalidPath { path: point.path.clone() })?
  };
  editor.apply(Operation::InsertNode {
    path: at.clone(),
    node: Node::Text(Text::with_marks(text, marks.clone())),
  })?;
  select(editor, Range::collapsed(Point::new(at, char_len(text))))
}

/// Split the caret's leaf and then its block, leaving the caret at the start
/// of the new block.
fn split_block_at<E: Editor + ?Sized>(editor: &mut E, point: &Point) -> Result<()> {
  let block = editor
    .doc()
    .block_above(&point.path)
    .ok_or_else(|| ModelError::NotElement { path: point.path.clone() })?;
  let index = point
    .path
    .as_slice()
    .get(block.len())
    .copied()
    .ok_or_else(|| ModelError::InvalidPath { path: point.path.clone() })?;
  let block_properties = editor.doc().node(&block)?.properties();

  split_leaf(editor, &point.path, point.offset)?;
  editor.apply(Operation::SplitNode {
    path:       block.clone(),
    position:   index + 1,
    properties: block_properties,
  })?;
  let next = block
    .next()
    .ok_or_else(|| ModelError::InvalidPath { path: block.clone() })?;
  select(editor, Range::collapsed(Point::new(next.child(0), 0)))
}

/// Remove everything between the edges of `range` and collapse the selection
/// to its start. Leaves in between are removed whole and the end block is
/// joined onto the start block.
pub fn delete_range<E: Editor + ?Sized>(editor: &mut E, range: &Range) -> Result<()> {
  let (start, end) = range.edges();
  let (start, mut end) = (start.clone(), end.clone());
  if start == end {
    return select(editor, Range::collapsed(start));
  }

  without_normalizing(editor, |editor| {
    if start.path == end.path {
      let text = editor.doc().slice(&start.path, start.offset, end.offset)?;
      editor.apply(Operation::RemoveText {
        path: start.path.clone(),
        offset: start.offset,
        text,
      })?;
      return select(editor, Range::collapsed(start.clone()));
    }

    let start_len = editor.doc().text_len(&start.path)?;
    if start.offset < start_len {
      let text = editor.doc().slice(&start.path, start.offset, start_len)?;
      editor.apply(Operation::RemoveText {
        path: start.path.clone(),
        offset: start.offset,
        text,
      })?;
    }

    let between = editor.doc().nodes_between(&start.path, &end.path);
    for path in between.into_iter().rev() {
      let node = editor.doc().node(&path)?.clone();
      let op = Operation::RemoveNode { path, node };
      if let Some(transformed) = end.transform(&op, Affinity::Forward) {
        end = transformed;
      }
      editor.apply(op)?;
    }

    if end.offset > 0 {
      let text = editor.doc().slice(&end.path, 0, end.offset)?;
      editor.apply(Operation::RemoveText {
        path: end.path.clone(),
        offset: 0,
        text,
      })?;
      end.offset = 0;
    }

    let start_block = editor.doc().block_above(&start.path);
    let end_block = editor.doc().block_above(&end.path);
    if let (Some(start_block), Some(end_block)) = (start_block, end_block)
      && start_block != end_block
    {
      join_blocks(editor, &start_block, &end_block)?;
    }
    select(editor, Range::collapsed(start.clone()))
  })
}

/// Append the children of `source` to `target` and drop `source`.
fn join_blocks<E: Editor + ?Sized>(editor: &mut E, target: &Path, source: &Path) -> Result<()> {
  let position = editor.doc().children_at(target)?.len();
  if target.next().as_ref() == Some(source) {
    let properties = editor.doc().node(source)?.properties();
    return editor.apply(Operation::MergeNode {
      path: source.clone(),
      position,
      properties,
    });
  }

  let count = editor.doc().children_at(source)?.len();
  for offset in 0..count {
    editor.apply(Operation::MoveNode {
      path:     source.child(0),
      new_path: target.child(position + offset),
    })?;
  }
  let node = editor.doc().node(source)?.clone();
  editor.apply(Operation::RemoveNode {
    path: source.clone(),
    node,
  })
}

/// Offset of `point` from the start of its block.
fn block_offset(doc: &Document, block: &Path, point: &Point) -> Option<usize> {
  let mut offset = 0;
  for (path, text) in doc.texts_in(block).ok()? {
    if path == point.path {
      return Some(offset + point.offset);
    }
    offset += text.len();
  }
  None
}

/// The point `offset` chars into `block`, preferring the earlier leaf at leaf
/// boundaries.
fn point_in_block(doc: &Document, block: &Path, offset: usize) -> Option<Point> {
  let mut consumed = 0;
  for (path, text) in doc.texts_in(block).ok()? {
    if offset <= consumed + text.len() {
      return Some(Point::new(path, offset - consumed));
    }
    consumed += text.len();
  }
  None
}

fn position_before(doc: &Document, point: &Point, unit: Unit) -> Option<Point> {
  let block = doc.block_above(&point.path)?;
  let offset = block_offset(doc, &block, point)?;
  if offset == 0 {
    let prev = doc.previous_text(&point.path)?;
    let len = doc.text_len(&prev).ok()?;
    return Some(Point::new(prev, len));
  }
  let string = doc.string(&block).ok()?;
  let target = match unit {
    Unit::Character => prev_grapheme_boundary(&string, offset),
    Unit::Word => prev_word_boundary(&string, offset),
    Unit::Line | Unit::Block => 0,
  };
  point_in_block(doc, &block, target)
}

fn position_after(doc: &Document, point: &Point, unit: Unit) -> Option<Point> {
  let block = doc.block_above(&point.path)?;
  let offset = block_offset(doc, &block, point)?;
  let string = doc.string(&block).ok()?;
  let len = char_len(&string);
  if offset >= len {
    let next = doc.next_text(&point.path)?;
    return Some(Point::new(next, 0));
  }
  let target = match unit {
    Unit::Character => next_grapheme_boundary(&string, offset),
    Unit::Word => next_word_boundary(&string, offset),
    Unit::Line | Unit::Block => len,
  };
  point_in_block(doc, &block, target)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc_at(blocks: &[&str], anchor: Point, focus: Point) -> Document {
    let mut doc = Document::new(blocks.iter().map(|text| Node::paragraph(*text)).collect());
    select(&mut doc, Range::new(anchor, focus)).unwrap();
    doc
  }

  fn caret_at(blocks: &[&str], path: [usize; 2], offset: usize) -> Document {
    doc_at(
      blocks,
      Point::new(path, offset),
      Point::new(path, offset),
    )
  }

  #[test]
  fn insert_text_replaces_expanded_selection() {
    let mut doc = doc_at(&["hello"], Point::new([0, 0], 1), Point::new([0, 0], 4));
    insert_text(&mut doc, "ipp").unwrap();
    assert_eq!(doc.text(), "hippo");
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([0, 0], 4)))
    );
  }

  #[test]
  fn insert_text_with_marks_creates_leaf() {
    let mut doc = caret_at(&["ab"], [0, 0], 1);
    doc.set_marks(Some(Marks::new().with("bold")));
    insert_text(&mut doc, "X").unwrap();
    let leaves = doc.children()[0].children();
    assert_eq!(leaves.len(), 3);
    assert_eq!(leaves[1], Node::Text(Text::with_marks("X", Marks::new().with("bold"))));
    assert_eq!(doc.marks(), None);
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([0, 1], 1)))
    );
  }

  #[test]
  fn delete_across_blocks_merges_them() {
    let mut doc = doc_at(
      &["one", "two", "three"],
      Point::new([0, 0], 1),
      Point::new([2, 0], 2),
    );
    delete_fragment(&mut doc, Direction::Backward).unwrap();
    assert_eq!(doc.text(), "oree");
    assert_eq!(doc.children().len(), 1);
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([0, 0], 1)))
    );
  }

  #[test]
  fn delete_backward_at_block_start_joins_previous() {
    let mut doc = caret_at(&["ab", "cd"], [1, 0], 0);
    delete_backward(&mut doc, Unit::Character).unwrap();
    assert_eq!(doc.text(), "abcd");
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([0, 0], 2)))
    );
  }

  #[test]
  fn unit_deletes() {
    let mut doc = caret_at(&["hello brave world"], [0, 0], 11);
    delete_backward(&mut doc, Unit::Word).unwrap();
    assert_eq!(doc.text(), "hello  world");

    let mut doc = caret_at(&["hello world"], [0, 0], 5);
    delete_forward(&mut doc, Unit::Word).unwrap();
    assert_eq!(doc.text(), "hello");

    let mut doc = caret_at(&["hello world"], [0, 0], 6);
    delete_backward(&mut doc, Unit::Line).unwrap();
    assert_eq!(doc.text(), "world");

    let mut doc = caret_at(&["ae\u{301}"], [0, 0], 3);
    delete_backward(&mut doc, Unit::Character).unwrap();
    assert_eq!(doc.text(), "a");
  }

  #[test]
  fn insert_break_at_end_leaves_empty_block() {
    let mut doc = caret_at(&["abc"], [0, 0], 3);
    insert_break(&mut doc).unwrap();
    assert_eq!(doc.children(), &[Node::paragraph("abc"), Node::paragraph("")]);
    assert_eq!(
      doc.selection(),
      Some(&Range::collapsed(Point::new([1, 0], 0)))
    );
  }

  #[test]
  fn insert_data_splits_lines() {
    let mut doc = caret_at(&["ab"], [0, 0], 1);
    insert_data(&mut doc, &DataTransfer::text("x\r\ny")).unwrap();
    assert_eq!(doc.text(), "ax\nyb");
    assert_eq!(doc.history().undos().len(), 1);
  }

  #[test]
  fn insert_fragment_keeps_marks() {
    let mut doc = caret_at(&["ab"], [0, 0], 2);
    let fragment = vec![
      Node::element("paragraph", vec![Node::Text(Text::with_marks(
        "B",
        Marks::new().with("bold"),
      ))]),
      Node::paragraph("c"),
    ];
    insert_fragment(&mut doc, &fragment).unwrap();
    assert_eq!(doc.text(), "abB\nc");
    assert!(
      doc.children()[0].children()[1]
        .as_text()
        .unwrap()
        .marks
        .contains("bold")
    );
  }

  #[test]
  fn marks_on_expanded_selection_split_leaves() {
    let mut doc = doc_at(&["abcd"], Point::new([0, 0], 1), Point::new([0, 0], 3));
    add_mark(&mut doc, "bold").unwrap();
    let leaves = doc.children()[0].children();
    assert_eq!(leaves.len(), 3);
    assert_eq!(leaves[1], Node::Text(Text::with_marks("bc", Marks::new().with("bold"))));

    remove_mark(&mut doc, "bold").unwrap();
    assert_eq!(doc.children(), &[Node::paragraph("abcd")]);
  }

  #[test]
  fn collapsed_mark_only_changes_insertion_marks() {
    let mut doc = caret_at(&["ab"], [0, 0], 1);
    add_mark(&mut doc, "italic").unwrap();
    assert_eq!(doc.marks(), Some(&Marks::new().with("italic")));
    assert_eq!(doc.children(), &[Node::paragraph("ab")]);
  }
}
