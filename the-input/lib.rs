//! Reconciling asynchronous platform input with the document model.
//!
//! Platforms edit their own view first and report what they did (or are about
//! to do) afterwards, sometimes several edits at a time and while the
//! document is being changed by someone else. [`InputReconciler`] buffers
//! those edits as per-leaf [`StringDiff`]s or a single pending
//! [`ActionKind`], keeps everything buffered valid across every document
//! operation, and commits it in one flush once input settles.
//!
//! Applying an operation from outside must go through
//! [`InputReconciler::apply_operation`] (or a [`Session`]) while input is
//! buffered; the buffered state is rewritten before the operation lands.

use thiserror::Error;

pub mod action;
pub mod classifier;
pub mod config;
pub mod flush;
pub mod hint;
pub mod intent;
pub mod mutation;
pub mod pending;
pub mod reconciler;
pub mod session;
pub mod string_diff;
pub mod transform;

pub use action::ActionKind;
pub use classifier::IntentOutcome;
pub use config::{
  ConfigError,
  ReconcilerConfig,
};
pub use flush::FlushOutcome;
pub use hint::{
  InsertionHint,
  InsertionHintPolicy,
};
pub use intent::{
  EditIntent,
  EditIntentKind,
  IntentData,
  NativeRange,
};
pub use mutation::{
  Mutation,
  MutationTarget,
  MutationVerdict,
};
pub use pending::{
  ActionTarget,
  PendingAction,
  PendingMarks,
  PendingSelection,
  PendingState,
  TextDiff,
};
pub use reconciler::{
  EngineState,
  FlushState,
  HostEffect,
  InputReconciler,
  TimerKind,
};
pub use session::Session;
pub use string_diff::StringDiff;
use the_model::ModelError;

pub type Result<T> = std::result::Result<T, InputError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InputError {
  #[error(transparent)]
  Model(#[from] ModelError),
}
