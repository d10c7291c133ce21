//! Launching an application and waiting for its window.
//!
//! The windows matching the leaf on the focused workspace are recorded before
//! `exec` is sent. Polling then succeeds on the first matching window that was
//! not in that baseline, so an already open instance of the same application
//! is never mistaken for the new one.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace};

use super::LayoutError;
use super::commands::{self, WmCommand};
use super::matching::find_windows_on_workspace;
use crate::common::collections::HashSet;
use crate::common::config::{LaunchCommand, LaunchSettings, WindowMatchExpression};
use crate::ipc::{ConId, Connection};
use crate::model::tree::Tree;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaunchState {
    Launching {
        workspace: ConId,
        known: HashSet<ConId>,
        polls_left: u32,
    },
    Succeeded(ConId),
    TimedOut,
    WorkspaceLost(ConId),
}

impl LaunchState {
    /// Records the baseline on the focused workspace of `tree`.
    pub fn start(
        tree: &Tree,
        matcher: &WindowMatchExpression,
        polls: u32,
    ) -> Result<LaunchState, LayoutError> {
        let workspace = tree.focused_workspace().ok_or(LayoutError::NoFocusedWorkspace)?;
        let known = find_windows_on_workspace(workspace, matcher).map(|n| n.id).collect();
        Ok(LaunchState::Launching {
            workspace: workspace.id,
            known,
            polls_left: polls,
        })
    }

    /// Advances the state with one freshly polled tree. Terminal states are
    /// left unchanged.
    pub fn poll(self, tree: &Tree, matcher: &WindowMatchExpression) -> LaunchState {
        let LaunchState::Launching {
            workspace,
            known,
            polls_left,
        } = self
        else {
            return self;
        };

        let Some(live) = tree.get(workspace) else {
            return LaunchState::WorkspaceLost(workspace);
        };
        if let Some(new) = find_windows_on_workspace(live, matcher).find(|n| !known.contains(&n.id))
        {
            return LaunchState::Succeeded(new.id);
        }

        match polls_left.saturating_sub(1) {
            0 => LaunchState::TimedOut,
            polls_left => LaunchState::Launching {
                workspace,
                known,
                polls_left,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LaunchState::Launching { .. })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LaunchSynchronizer {
    poll_interval: Duration,
    timeout: Duration,
}

impl LaunchSynchronizer {
    pub fn new(settings: &LaunchSettings) -> Self {
        LaunchSynchronizer {
            poll_interval: settings.poll_interval(),
            timeout: settings.timeout(),
        }
    }

    fn polls(&self) -> u32 {
        let polls = self.timeout.as_millis() / self.poll_interval.as_millis().max(1);
        u32::try_from(polls).unwrap_or(u32::MAX).max(1)
    }

    /// Runs `cmd` on the focused workspace and returns the id of the window it
    /// opened.
    pub fn launch(
        &self,
        conn: &mut impl Connection,
        cmd: &LaunchCommand,
        matcher: &WindowMatchExpression,
    ) -> Result<ConId, LayoutError> {
        if cmd.is_empty() {
            return Err(LayoutError::NothingToLaunch);
        }
        let command = cmd.to_exec_string();

        debug!(%command, "Launching");
        let mut state = LaunchState::start(&conn.snapshot()?, matcher, self.polls())?;
        commands::run(conn, None, &WmCommand::Exec(command.clone()))?;

        while !state.is_terminal() {
            thread::sleep(self.poll_interval);
            state = state.poll(&conn.snapshot()?, matcher);
            trace!(?state, "Polled for new window");
        }

        match state {
            LaunchState::Succeeded(id) => {
                info!(%command, id, "Application window appeared");
                Ok(id)
            }
            LaunchState::WorkspaceLost(workspace) => {
                Err(LayoutError::WorkspaceLost { command, workspace })
            }
            _ => Err(LayoutError::LaunchTimedOut { command }),
        }
    }
}
