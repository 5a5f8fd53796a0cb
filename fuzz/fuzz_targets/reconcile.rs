#![no_main]

mod common;

use std::mem;

use libfuzzer_sys::fuzz_target;

use crate::common::{
  check_invariants,
  run_event,
  session_from_bytes,
};

fuzz_target!(|data: &[u8]| {
  let Some(mut session) = session_from_bytes(data) else {
    return;
  };

  for event in mem::take(&mut session.events) {
    run_event(&mut session, &event);
    check_invariants(&session);
  }

  // Whatever is left must commit (or abort) cleanly.
  if session.reconciler.flush(&mut session.doc).is_ok() {
    assert!(!session.reconciler.has_pending_changes());
  }
});
