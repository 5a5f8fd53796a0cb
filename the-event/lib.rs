//! Time and wake-up plumbing for the input reconciler.

pub mod clock;
pub mod deadline;
pub mod timer;

pub use clock::{
  Clock,
  ManualClock,
  SystemClock,
};
pub use deadline::DeadlineWaker;
pub use timer::{
  TimerHandle,
  Timers,
};
