use tracing::{debug, info, warn};

use super::LayoutError;
use super::capture::create_layout_from_tree;
use super::commands::{self, ResizeAxis, WmCommand};
use super::compare::{ShapeComparison, compare_workspace};
use super::launch::LaunchSynchronizer;
use super::matching::find_windows_on_workspace;
use super::ratio::calculate_percent;
use super::reconcile::{
    LeafAssignments, LeafPath, MarkLease, RealizedLayout, create_layout, with_relocation_mark,
};
use crate::common::collections::HashSet;
use crate::common::config::{Layout, LayoutNode, OutputSelector, Settings, WorkspaceLayout};
use crate::ipc::protocol::{NodeLayout, NodeType};
use crate::ipc::{ConId, Connection};
use crate::model::tree::Tree;
use crate::sys::process::{CommandLineLookup, ProcCommandLine};

/// A workspace of a layout document paired with its live container.
#[derive(Debug, Clone)]
pub struct ResolvedWorkspace<'a> {
    pub name: String,
    /// `None` while the workspace does not exist yet.
    pub id: Option<ConId>,
    pub layout: &'a WorkspaceLayout,
}

/// Binds `focused_workspace` to the name of the currently focused workspace
/// and looks up every workspace by name. Named workspaces come first, in name
/// order, then `focused_workspace`. If the focused workspace is also named,
/// `focused_workspace` replaces that entry so it is reconciled only once.
pub fn resolve_workspaces<'a>(
    tree: &Tree,
    layout: &'a Layout,
) -> Result<Vec<ResolvedWorkspace<'a>>, LayoutError> {
    let mut resolved: Vec<_> = layout
        .workspaces
        .iter()
        .map(|(name, workspace_layout)| ResolvedWorkspace {
            name: name.clone(),
            id: tree.workspace_by_name(name).map(|ws| ws.id),
            layout: workspace_layout,
        })
        .collect();

    if let Some(focused_layout) = &layout.focused_workspace {
        let focused = tree.focused_workspace().ok_or(LayoutError::NoFocusedWorkspace)?;
        let name = focused.name.clone().unwrap_or_default();
        match resolved.iter_mut().find(|ws| ws.name == name) {
            Some(named) => {
                warn!(workspace = %name, "Workspace given twice, using focused_workspace");
                named.layout = focused_layout;
            }
            None => resolved.push(ResolvedWorkspace {
                name,
                id: Some(focused.id),
                layout: focused_layout,
            }),
        }
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct WorkspaceCheck {
    pub name: String,
    pub id: Option<ConId>,
    /// `None` when the workspace does not exist.
    pub comparison: Option<ShapeComparison>,
}

impl WorkspaceCheck {
    pub fn is_match(&self) -> bool {
        self.comparison.as_ref().is_some_and(ShapeComparison::is_match)
    }
}

pub struct LayoutEngine<C> {
    conn: C,
    settings: Settings,
    lookup: Box<dyn CommandLineLookup>,
}

impl<C: Connection> LayoutEngine<C> {
    pub fn new(conn: C, settings: Settings) -> Self {
        Self::with_lookup(conn, settings, Box::new(ProcCommandLine::default()))
    }

    pub fn with_lookup(conn: C, settings: Settings, lookup: Box<dyn CommandLineLookup>) -> Self {
        LayoutEngine { conn, settings, lookup }
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn tree(&mut self) -> Result<Tree, LayoutError> { Ok(self.conn.snapshot()?) }

    /// Brings every workspace of `layout` into shape, one after the other,
    /// launching applications whose windows are missing.
    pub fn apply(&mut self, layout: &Layout) -> Result<Vec<RealizedLayout>, LayoutError> {
        let tree = self.conn.snapshot()?;
        let workspaces = resolve_workspaces(&tree, layout)?;
        let synchronizer = LaunchSynchronizer::new(&self.settings.launch);

        with_relocation_mark(&mut self.conn, self.settings.relocation_mark, |conn, lease| {
            workspaces
                .iter()
                .map(|workspace| apply_workspace(&mut *conn, lease, &synchronizer, workspace))
                .collect()
        })
    }

    /// Compares each workspace of `layout` with the live tree without
    /// changing anything.
    pub fn check(&mut self, layout: &Layout) -> Result<Vec<WorkspaceCheck>, LayoutError> {
        let tree = self.conn.snapshot()?;
        let checks = resolve_workspaces(&tree, layout)?
            .into_iter()
            .map(|workspace| {
                let comparison = workspace
                    .id
                    .and_then(|id| tree.get(id))
                    .map(|live| compare_workspace(live, workspace.layout));
                match &comparison {
                    Some(c) if c.is_match() => info!(workspace = %workspace.name, "Layout matches"),
                    Some(c) => info!(
                        workspace = %workspace.name,
                        mismatches = c.mismatches.len(),
                        "Layout does not match"
                    ),
                    None => info!(workspace = %workspace.name, "Workspace not found"),
                }
                WorkspaceCheck {
                    name: workspace.name,
                    id: workspace.id,
                    comparison,
                }
            })
            .collect();
        Ok(checks)
    }

    /// Captures the named workspaces, or all of them, into a layout document.
    pub fn capture(&mut self, names: &[String]) -> Result<Layout, LayoutError> {
        let tree = self.conn.snapshot()?;
        create_layout_from_tree(&tree, names, self.lookup.as_ref())
    }
}

fn apply_workspace(
    conn: &mut impl Connection,
    lease: &MarkLease,
    synchronizer: &LaunchSynchronizer,
    workspace: &ResolvedWorkspace<'_>,
) -> Result<RealizedLayout, LayoutError> {
    let name = workspace.name.as_str();
    info!(workspace = name, "Applying layout");
    commands::run(conn, None, &WmCommand::Workspace(name.to_owned()))?;
    if let Some(output) = &workspace.layout.output {
        place_on_output(conn, name, output)?;
    }

    let leaves = resolve_leaves(conn, synchronizer, name, workspace.layout)?;
    let realized = create_layout(conn, lease, name, workspace.layout, &leaves)?;
    finish_workspace(conn, workspace.layout, &realized)?;
    Ok(realized)
}

/// Moves the focused workspace `name` to the first present output of
/// `selector`, unless it is there already.
fn place_on_output(
    conn: &mut impl Connection,
    name: &str,
    selector: &OutputSelector,
) -> Result<(), LayoutError> {
    let outputs = conn.get_outputs()?;
    let Some(target) = selector.candidates().iter().find(|candidate| {
        let present = outputs.iter().any(|o| o.active && o.name == **candidate);
        if !present {
            debug!(output = candidate.as_str(), "Output not present");
        }
        present
    }) else {
        return Ok(());
    };

    let current = conn.get_workspaces()?.into_iter().find(|ws| ws.name == name);
    if current.is_some_and(|ws| ws.output == *target) {
        return Ok(());
    }
    commands::run(conn, None, &WmCommand::MoveWorkspaceToOutput(target.clone()))
}

/// Every node of `children` with its path, parents before their children.
fn walk<'a>(children: &'a [LayoutNode], path: &mut LeafPath, out: &mut Vec<(LeafPath, &'a LayoutNode)>) {
    for (i, child) in children.iter().enumerate() {
        path.push(i);
        out.push((path.clone(), child));
        walk(child.children(), path, out);
        path.pop();
    }
}

fn nodes_of(layout: &WorkspaceLayout) -> Vec<(LeafPath, &LayoutNode)> {
    let mut out = Vec::new();
    walk(&layout.children, &mut Vec::new(), &mut out);
    out
}

/// Picks a window for every leaf in document order: an unclaimed matching
/// tiled window on the workspace, or a freshly launched one.
fn resolve_leaves(
    conn: &mut impl Connection,
    synchronizer: &LaunchSynchronizer,
    name: &str,
    layout: &WorkspaceLayout,
) -> Result<LeafAssignments, LayoutError> {
    let mut assignments = LeafAssignments::default();
    let mut claimed = HashSet::default();

    for (path, node) in nodes_of(layout) {
        let LayoutNode::Leaf(leaf) = node else {
            continue;
        };
        let tree = conn.snapshot()?;
        let live = tree
            .workspace_by_name(name)
            .ok_or_else(|| LayoutError::WorkspaceNotFound(name.to_owned()))?;
        let existing = find_windows_on_workspace(live, &leaf.matcher)
            .find(|n| n.node_type == NodeType::Con && !claimed.contains(&n.id))
            .map(|n| n.id);

        let id = match existing {
            Some(id) => {
                debug!(id, ?path, "Reusing window");
                id
            }
            None => synchronizer.launch(conn, &leaf.cmd, &leaf.matcher)?,
        };
        claimed.insert(id);
        assignments.insert(path, id);
    }
    Ok(assignments)
}

/// Adds configured marks, applies sizes and focuses the window asking for it.
fn finish_workspace(
    conn: &mut impl Connection,
    layout: &WorkspaceLayout,
    realized: &RealizedLayout,
) -> Result<(), LayoutError> {
    let mut focus = None;
    for (path, node) in nodes_of(layout) {
        let Some(&id) = realized.nodes.get(&path) else {
            warn!(?path, "Node was not realized");
            continue;
        };

        let tree = conn.snapshot()?;
        let live = tree.get(id).ok_or(LayoutError::ContainerVanished(id))?;
        for mark in node.assigned_marks() {
            if !live.has_mark(&mark.to_string()) {
                commands::run(conn, Some(id), &WmCommand::AddMark(*mark))?;
            }
        }

        if let Some(percent) = node.percent() {
            let parent = tree.parent_of(id).ok_or(LayoutError::ContainerVanished(id))?;
            let axis = match parent.layout {
                NodeLayout::SplitH => Some(ResizeAxis::Width),
                NodeLayout::SplitV => Some(ResizeAxis::Height),
                _ => None,
            };
            match axis {
                Some(axis) if calculate_percent(parent, live) != Some(percent) => {
                    commands::run(conn, Some(id), &WmCommand::Resize { axis, percent })?;
                }
                Some(_) => {}
                None => debug!(id, "Percent has no effect in a {:?} container", parent.layout),
            }
        }

        if let LayoutNode::Leaf(leaf) = node {
            if leaf.focus && !live.focused {
                focus = Some(id);
            }
        }
    }

    if let Some(id) = focus {
        commands::run(conn, Some(id), &WmCommand::Focus)?;
    }
    Ok(())
}
