use thiserror::Error;

pub mod protocol;
pub mod socket;
#[cfg(test)]
pub mod testing;

pub use protocol::{CommandReply, ConId, Node, Output, Workspace};
pub use socket::SwayConnection;

use crate::model::tree::Tree;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Neither SWAYSOCK nor I3SOCK is set")]
    NoSocketPath,
    #[error("IPC I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed IPC payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Reply does not start with the i3-ipc magic string")]
    BadMagic,
    #[error("Expected a reply of type {expected}, got {actual}")]
    UnexpectedReply { expected: u32, actual: u32 },
}

/// Request/reply access to a running window manager.
///
/// Every call is a blocking round trip. Nothing returned here stays valid
/// across a command: callers take a fresh [`Tree`] after each mutation.
pub trait Connection {
    fn get_tree(&mut self) -> Result<Node, IpcError>;

    fn get_marks(&mut self) -> Result<Vec<String>, IpcError>;

    fn get_outputs(&mut self) -> Result<Vec<Output>, IpcError>;

    fn get_workspaces(&mut self) -> Result<Vec<Workspace>, IpcError>;

    /// Runs `command`, scoped to the container `target` when given.
    ///
    /// Returns one reply per sub-command.
    fn run_command(
        &mut self,
        target: Option<ConId>,
        command: &str,
    ) -> Result<Vec<CommandReply>, IpcError>;

    fn snapshot(&mut self) -> Result<Tree, IpcError> { Ok(Tree::new(self.get_tree()?)) }
}

pub fn scoped_command(target: Option<ConId>, command: &str) -> String {
    match target {
        Some(id) => format!("[con_id={id}] {command}"),
        None => command.to_owned(),
    }
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn get_tree(&mut self) -> Result<Node, IpcError> { (**self).get_tree() }

    fn get_marks(&mut self) -> Result<Vec<String>, IpcError> { (**self).get_marks() }

    fn get_outputs(&mut self) -> Result<Vec<Output>, IpcError> { (**self).get_outputs() }

    fn get_workspaces(&mut self) -> Result<Vec<Workspace>, IpcError> {
        (**self).get_workspaces()
    }

    fn run_command(
        &mut self,
        target: Option<ConId>,
        command: &str,
    ) -> Result<Vec<CommandReply>, IpcError> {
        (**self).run_command(target, command)
    }
}
