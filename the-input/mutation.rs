//! Judging view mutations the reconciler did not ask for.
//!
//! The host observes low-level changes to its view tree and reports them in
//! batches. When nothing is buffered, a change inside the editable content
//! means the view drifted from the model and must be re-rendered.

/// Where a mutated view node sits, as far as the host can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationTarget {
  /// A node marked non-editable.
  NonEditable,
  /// A node still attached to the view; `editable` when it belongs to the
  /// editor's editable content.
  Attached { editable: bool },
  /// A node no longer attached. `parent` is the index, within the same batch,
  /// of the mutation that added or removed it (or one of its ancestors).
  Detached { parent: Option<usize> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
  pub target: MutationTarget,
}

impl Mutation {
  pub fn new(target: MutationTarget) -> Self {
    Self { target }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationVerdict {
  /// Buffered input explains the mutations.
  Expected,
  /// Nothing in the batch touched editable content.
  Untracked,
  /// The view changed behind the model's back.
  ForceRender,
}

/// Whether the mutation at `index` touched editable content.
pub fn is_tracked(batch: &[Mutation], index: usize) -> bool {
  let mut current = index;
  // Parent links may form a cycle in a malformed batch.
  for _ in 0..=batch.len() {
    let Some(mutation) = batch.get(current) else {
      return false;
    };
    match mutation.target {
      MutationTarget::NonEditable => return false,
      MutationTarget::Attached { editable } => return editable,
      MutationTarget::Detached { parent } => {
        match parent {
          Some(parent) if parent != current => current = parent,
          _ => return false,
        }
      },
    }
  }
  false
}

pub(crate) fn judge(batch: &[Mutation], expected: bool) -> MutationVerdict {
  if expected {
    return MutationVerdict::Expected;
  }
  if (0..batch.len()).any(|index| is_tracked(batch, index)) {
    MutationVerdict::ForceRender
  } else {
    MutationVerdict::Untracked
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detached_nodes_follow_their_parent_mutation() {
    let batch = [
      Mutation::new(MutationTarget::Attached { editable: true }),
      Mutation::new(MutationTarget::Detached { parent: Some(0) }),
      Mutation::new(MutationTarget::Detached { parent: Some(1) }),
      Mutation::new(MutationTarget::Detached { parent: None }),
    ];
    assert!(is_tracked(&batch, 2));
    assert!(!is_tracked(&batch, 3));
  }

  #[test]
  fn cycles_are_not_tracked() {
    let batch = [
      Mutation::new(MutationTarget::Detached { parent: Some(1) }),
      Mutation::new(MutationTarget::Detached { parent: Some(0) }),
    ];
    assert!(!is_tracked(&batch, 0));
    assert_eq!(judge(&batch, false), MutationVerdict::Untracked);
  }

  #[test]
  fn pending_input_explains_everything() {
    let batch = [Mutation::new(MutationTarget::Attached { editable: true })];
    assert_eq!(judge(&batch, true), MutationVerdict::Expected);
    assert_eq!(judge(&batch, false), MutationVerdict::ForceRender);
    assert_eq!(
      judge(
        &[Mutation::new(MutationTarget::NonEditable)],
        false
      ),
      MutationVerdict::Untracked
    );
  }
}
