use std::fmt;

use tracing::{debug, trace};

use super::{LayoutError, LayoutKind};
use crate::common::config::Mark;
use crate::common::util::quote_argument;
use crate::ipc::{CommandReply, ConId, Connection, scoped_command};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeAxis {
    Width,
    Height,
}

/// The commands the layout engine sends, rendered in sway's command language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WmCommand {
    /// Runs a shell command line.
    Exec(String),
    Workspace(String),
    MoveWorkspaceToOutput(String),
    MoveToWorkspace(String),
    MoveRight,
    SwapWith(ConId),
    AddMark(Mark),
    MoveToMark(Mark),
    Unmark(Mark),
    SplitH,
    Layout(LayoutKind),
    Resize { axis: ResizeAxis, percent: u8 },
    Focus,
}

impl fmt::Display for WmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WmCommand::Exec(command) => write!(f, "exec {command}"),
            WmCommand::Workspace(name) => write!(f, "workspace {}", quote_argument(name)),
            WmCommand::MoveWorkspaceToOutput(output) => {
                write!(f, "move workspace to output {}", quote_argument(output))
            }
            WmCommand::MoveToWorkspace(name) => {
                write!(f, "move container to workspace {}", quote_argument(name))
            }
            WmCommand::MoveRight => f.write_str("move right"),
            WmCommand::SwapWith(id) => write!(f, "swap container with con_id {id}"),
            WmCommand::AddMark(mark) => write!(f, "mark --add {}", quote_argument(&mark.to_string())),
            WmCommand::MoveToMark(mark) => {
                write!(f, "move container to mark {}", quote_argument(&mark.to_string()))
            }
            WmCommand::Unmark(mark) => write!(f, "unmark {}", quote_argument(&mark.to_string())),
            WmCommand::SplitH => f.write_str("splith"),
            WmCommand::Layout(kind) => write!(f, "layout {kind}"),
            WmCommand::Resize { axis, percent } => {
                let axis = match axis {
                    ResizeAxis::Width => "width",
                    ResizeAxis::Height => "height",
                };
                write!(f, "resize set {axis} {percent} ppt")
            }
            WmCommand::Focus => f.write_str("focus"),
        }
    }
}

/// Sends `command` and fails unless every reply reports success.
pub fn run(
    conn: &mut impl Connection,
    target: Option<ConId>,
    command: &WmCommand,
) -> Result<(), LayoutError> {
    let text = command.to_string();
    let scoped = scoped_command(target, &text);
    debug!(command = %scoped, "Running command");
    let replies = conn.run_command(target, &text)?;
    check_replies(&scoped, &replies)
}

pub fn check_replies(command: &str, replies: &[CommandReply]) -> Result<(), LayoutError> {
    for reply in replies {
        trace!(command, ?reply, "Command reply");
        if !reply.success {
            return Err(LayoutError::CommandFailed {
                command: command.to_owned(),
                message: reply.error.clone().unwrap_or_else(|| "unknown error".to_owned()),
            });
        }
    }
    Ok(())
}
