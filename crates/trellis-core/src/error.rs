//! Error taxonomy for render passes and host-tree primitives.
//!
//! Every variant of [`RenderError`] is a programmer error: the runtime fails
//! fast at the call site and never attempts partial recovery. An error raised
//! mid-pass aborts that pass; host mutations already applied stay applied.

use thiserror::Error;

use crate::descriptor::Key;
use crate::host::HostNodeId;

/// Failure of a single host-tree primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host node {id} missing")]
    Missing { id: HostNodeId },
    #[error("host node {id} is not an element")]
    NotAnElement { id: HostNodeId },
    #[error("host node {id} is not a text node")]
    NotText { id: HostNodeId },
}

/// Errors surfaced by hooks, the descriptor builder and the reconciler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("hook `{hook}` called outside of a component render")]
    OutsideComponent { hook: &'static str },

    #[error("state must be initialised with a record, got {found}")]
    InvalidStateShape { found: &'static str },

    #[error("hook call #{index} exceeds the {limit} hook(s) recorded at mount")]
    HookOrderViolation { index: usize, limit: usize },

    #[error("context read without an enclosing provider")]
    ContextNotProvided,

    #[error("entry {index} of a {len}-entry child list has no explicit key")]
    MissingKey { index: usize, len: usize },

    #[error("child list declares key {key} more than once")]
    DuplicateKey { key: Key },

    #[error("render output must resolve to exactly one root, found {count}")]
    MultipleRoot { count: usize },

    #[error("invalid template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("component instance {id} is not alive")]
    UnknownInstance { id: usize },

    #[error("render pass already in progress")]
    Reentrant,

    #[error(transparent)]
    Host(#[from] HostError),
}

impl RenderError {
    pub(crate) fn invalid_template(reason: impl Into<String>) -> Self {
        RenderError::InvalidTemplate {
            reason: reason.into(),
        }
    }
}
