use std::time::Duration;

use the_input::{
  EditIntent,
  EditIntentKind,
  InputReconciler,
  NativeRange,
  PendingMarks,
  ReconcilerConfig,
};
use the_input_event::ManualClock;
use the_model::{
  Document,
  Marks,
  Node,
  Operation,
  Path,
  Point,
  Range,
  transforms,
};

const MAX_BLOCKS: usize = 4;
const MAX_INITIAL_BYTES: usize = 64;
const MAX_EVENTS: usize = 128;
const MAX_INSERT_BYTES: usize = 8;
const MAX_ADVANCE_MS: usize = 300;

/// A point chosen from raw bytes; resolved against the live document when
/// the event runs.
#[derive(Debug, Clone, Copy)]
pub struct RawPoint {
  pub leaf:   u8,
  pub offset: u8,
}

#[derive(Debug, Clone)]
pub enum Event {
  Intent {
    kind:      u8,
    anchor:    RawPoint,
    focus:     Option<RawPoint>,
    text:      Vec<u8>,
    collapsed: bool,
  },
  Select(Option<RawPoint>),
  CompositionStart,
  CompositionEnd,
  KeyDown,
  Input,
  Marks(bool),
  Flush,
  Advance(u16),
  RemoteInsert(RawPoint, Vec<u8>),
  RemoteRemove(RawPoint, u8),
  RemoteSplit(RawPoint),
}

pub struct FuzzSession {
  pub doc:        Document,
  pub reconciler: InputReconciler<ManualClock>,
  pub clock:      ManualClock,
  pub events:     Vec<Event>,
}

pub fn session_from_bytes(data: &[u8]) -> Option<FuzzSession> {
  let mut cursor = ByteCursor::new(data);
  let blocks = cursor.next_usize(MAX_BLOCKS - 1) + 1;
  let mut children = Vec::with_capacity(blocks);
  for _ in 0..blocks {
    let len = cursor.next_usize(MAX_INITIAL_BYTES);
    children.push(Node::paragraph(lossy_text(cursor.next_bytes(len))));
  }

  let event_count = cursor.next_usize(MAX_EVENTS);
  let mut events = Vec::with_capacity(event_count);
  for _ in 0..event_count {
    events.push(decode_event(&mut cursor));
  }
  if events.is_empty() {
    return None;
  }

  let mut doc = Document::new(children);
  let start = doc.texts().first().map(|(path, _)| path.clone())?;
  transforms::select(&mut doc, Range::collapsed(Point::new(start, 0))).ok()?;

  let clock = ManualClock::new();
  Some(FuzzSession {
    doc,
    reconciler: InputReconciler::with_clock(ReconcilerConfig::default(), clock.clone()),
    clock,
    events,
  })
}

/// Run one event. Model errors are expected for nonsense input and only
/// reported; panics are what the fuzzer looks for.
pub fn run_event(session: &mut FuzzSession, event: &Event) {
  let FuzzSession {
    doc,
    reconciler,
    clock,
    ..
  } = session;

  let result = match event {
    Event::Intent {
      kind,
      anchor,
      focus,
      text,
      collapsed,
    } => {
      let kind = EditIntentKind::ALL[*kind as usize % EditIntentKind::ALL.len()];
      let Some(anchor) = resolve(doc, *anchor) else {
        return;
      };
      let range = match focus.and_then(|focus| resolve(doc, focus)) {
        Some(focus) => Range::new(anchor, focus),
        None => Range::collapsed(anchor),
      };
      let intent = EditIntent::new(kind)
        .with_text(lossy_text(text))
        .with_target(NativeRange {
          collapsed: *collapsed && range.is_collapsed(),
          range:     Some(range),
        });
      reconciler.handle_edit_intent(doc, intent).map(|_| ())
    },
    Event::Select(point) => {
      let range = point.and_then(|point| resolve(doc, point)).map(Range::collapsed);
      reconciler.handle_user_select(doc, range);
      Ok(())
    },
    Event::CompositionStart => {
      reconciler.handle_composition_start();
      Ok(())
    },
    Event::CompositionEnd => {
      reconciler.handle_composition_end();
      Ok(())
    },
    Event::KeyDown => {
      reconciler.handle_key_down();
      Ok(())
    },
    Event::Input => reconciler.handle_input(doc),
    Event::Marks(bold) => {
      let marks = if *bold {
        PendingMarks::Marks(Marks::new().with("bold"))
      } else {
        PendingMarks::Cleared
      };
      reconciler.set_insertion_marks(Some(marks));
      Ok(())
    },
    Event::Flush => reconciler.flush(doc).map(|_| ()),
    Event::Advance(ms) => {
      clock.advance(Duration::from_millis(*ms as u64));
      Ok(())
    },
    Event::RemoteInsert(point, text) => {
      let Some(point) = resolve_in_model(doc, *point) else {
        return;
      };
      reconciler.apply_operation(doc, Operation::InsertText {
        path:   point.path,
        offset: point.offset,
        text:   lossy_text(text),
      })
    },
    Event::RemoteRemove(point, len) => {
      let Some(point) = resolve_in_model(doc, *point) else {
        return;
      };
      let Ok(leaf) = doc.leaf(&point.path) else {
        return;
      };
      let text: String = leaf
        .text
        .chars()
        .skip(point.offset)
        .take(*len as usize % 4)
        .collect();
      reconciler.apply_operation(doc, Operation::RemoveText {
        path: point.path,
        offset: point.offset,
        text,
      })
    },
    Event::RemoteSplit(point) => {
      let Some(point) = resolve_in_model(doc, *point) else {
        return;
      };
      reconciler.with_session(doc, |session| {
        transforms::select(session, Range::collapsed(point))?;
        transforms::insert_break(session)
      })
    },
  };

  let _ = result;
  let _ = reconciler.poll_timers(doc);
  reconciler.take_effects();
}

/// Structural properties that must hold after every event.
pub fn check_invariants(session: &FuzzSession) {
  let diffs = session.reconciler.pending().diffs();
  for (index, entry) in diffs.iter().enumerate() {
    assert!(
      diffs[index + 1..].iter().all(|other| other.path != entry.path),
      "two pending diffs for {}",
      entry.path
    );
    assert!(
      session.doc.leaf(&entry.path).is_ok(),
      "pending diff for missing leaf {}",
      entry.path
    );
  }
}

/// A point in the visible text, which may run past the model leaf by the
/// length of what is buffered for it.
fn resolve(doc: &Document, raw: RawPoint) -> Option<Point> {
  let texts = doc.texts();
  let (path, text) = texts.get(raw.leaf as usize % texts.len().max(1))?;
  let len = text.text.chars().count() + 2;
  Some(Point::new(path.clone(), raw.offset as usize % (len + 1)))
}

fn resolve_in_model(doc: &Document, raw: RawPoint) -> Option<Point> {
  let texts = doc.texts();
  let (path, text): &(Path, _) = texts.get(raw.leaf as usize % texts.len().max(1))?;
  let len = text.text.chars().count();
  Some(Point::new(path.clone(), raw.offset as usize % (len + 1)))
}

fn decode_event(cursor: &mut ByteCursor<'_>) -> Event {
  match cursor.next_u8() % 12 {
    0 | 1 | 2 => {
      let kind = cursor.next_u8();
      let anchor = cursor.next_point();
      let focus = (cursor.next_u8() % 3 == 0).then(|| cursor.next_point());
      let len = cursor.next_usize(MAX_INSERT_BYTES);
      let text = cursor.next_bytes(len).to_vec();
      let collapsed = cursor.next_u8() % 4 != 0;
      Event::Intent {
        kind,
        anchor,
        focus,
        text,
        collapsed,
      }
    },
    3 => Event::Select((cursor.next_u8() % 5 != 0).then(|| cursor.next_point())),
    4 => Event::CompositionStart,
    5 => Event::CompositionEnd,
    6 => {
      if cursor.next_u8() % 2 == 0 {
        Event::KeyDown
      } else {
        Event::Input
      }
    },
    7 => Event::Marks(cursor.next_u8() % 2 == 0),
    8 => Event::Flush,
    9 => Event::Advance(cursor.next_usize(MAX_ADVANCE_MS) as u16),
    10 => {
      let point = cursor.next_point();
      let len = cursor.next_usize(MAX_INSERT_BYTES);
      Event::RemoteInsert(point, cursor.next_bytes(len).to_vec())
    },
    _ => {
      if cursor.next_u8() % 3 == 0 {
        Event::RemoteSplit(cursor.next_point())
      } else {
        Event::RemoteRemove(cursor.next_point(), cursor.next_u8())
      }
    },
  }
}

fn lossy_text(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into_owned()
}

struct ByteCursor<'a> {
  data: &'a [u8],
  pos:  usize,
}

impl<'a> ByteCursor<'a> {
  fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  fn next_u8(&mut self) -> u8 {
    let value = self.data.get(self.pos).copied().unwrap_or(0);
    self.pos = self.pos.saturating_add(1);
    value
  }

  fn next_u16(&mut self) -> u16 {
    let lo = self.next_u8() as u16;
    let hi = self.next_u8() as u16;
    lo | (hi << 8)
  }

  fn next_usize(&mut self, max: usize) -> usize {
    if max == 0 {
      return 0;
    }
    (self.next_u16() as usize) % (max + 1)
  }

  fn next_point(&mut self) -> RawPoint {
    RawPoint {
      leaf:   self.next_u8(),
      offset: self.next_u8(),
    }
  }

  fn next_bytes(&mut self, len: usize) -> &'a [u8] {
    let start = self.pos.min(self.data.len());
    let end = start.saturating_add(len).min(self.data.len());
    self.pos = end;
    &self.data[start..end]
  }
}
