use thiserror::Error;

use crate::common::config::ConfigError;
use crate::ipc::{ConId, IpcError};

#[derive(Debug, Error)]
pub enum LayoutError {
    // Preconditions: nothing has been changed yet.
    #[error("Mark `{0}` is already in use; is another layout being applied?")]
    MarkInUse(String),
    #[error("No focused workspace")]
    NoFocusedWorkspace,
    #[error("Workspace `{0}` not found")]
    WorkspaceNotFound(String),
    #[error("Workspace `{0}` has no children to lay out")]
    EmptyWorkspace(String),
    #[error("Container at {0:?} has no children")]
    EmptyContainer(Vec<usize>),

    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    // Invariant violations: the tree changed under us or the reconciler is wrong.
    #[error("Container {id} drifted from workspace {expected} to {actual:?}")]
    Drift {
        id: ConId,
        expected: ConId,
        actual: Option<ConId>,
    },
    #[error("Mark `{0}` is still assigned after reconciliation")]
    MarkNotReleased(String),
    #[error("Container {0} vanished from the tree")]
    ContainerVanished(ConId),
    #[error("No window was resolved for the leaf at {0:?}")]
    MissingLeaf(Vec<usize>),
    #[error("Container {id} is not a child of {parent} after being moved there")]
    Misplaced { id: ConId, parent: ConId },
    #[error("Container {0} could not be hoisted to its workspace")]
    HoistLimit(ConId),
    #[error("Splitting container {0} did not wrap it in a new container")]
    NotWrapped(ConId),

    #[error("No window appeared for `{command}` before the timeout")]
    LaunchTimedOut { command: String },
    #[error("Workspace {workspace} disappeared while waiting for `{command}`")]
    WorkspaceLost { command: String, workspace: ConId },
    #[error("Leaf has an empty command and no matching window is open")]
    NothingToLaunch,

    #[error("Unexpected node kind {kind} for container {id}")]
    UnexpectedNodeKind { id: ConId, kind: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ipc(#[from] IpcError),
}

impl LayoutError {
    /// Whether the error reports a broken internal assumption rather than a
    /// problem with the environment.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            LayoutError::Drift { .. }
                | LayoutError::MarkNotReleased(_)
                | LayoutError::ContainerVanished(_)
                | LayoutError::MissingLeaf(_)
                | LayoutError::Misplaced { .. }
                | LayoutError::HoistLimit(_)
                | LayoutError::NotWrapped(_)
        )
    }
}
