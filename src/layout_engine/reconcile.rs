//! Moves existing windows into the shape of a workspace layout.
//!
//! sway has no "insert at index" command. Containers are built bottom-up: the
//! first child of a container is split to create the container itself, every
//! further child is hoisted to the workspace and moved into the new container
//! through a borrowed mark, and a swap puts it at its index. Each step is
//! skipped when the live tree already has the node where it belongs, so
//! applying a satisfied layout sends no structural commands.
//!
//! Nodes of the desired tree are identified by their path of child indices
//! from the workspace, which keeps two textually identical leaves apart.

use tracing::{debug, info, warn};

use super::LayoutError;
use super::commands::{self, WmCommand};
use crate::common::collections::{HashMap, HashSet};
use crate::common::config::{LayoutNode, Mark, WorkspaceLayout};
use crate::ipc::protocol::{NodeLayout, NodeType};
use crate::ipc::{ConId, Connection, Node};
use crate::layout_engine::LayoutKind;
use crate::model::tree::{Tree, descendants};

pub type LeafPath = Vec<usize>;

/// Window chosen for every leaf, keyed by the leaf's path.
pub type LeafAssignments = HashMap<LeafPath, ConId>;

/// Steps after which a container still not directly on its workspace is
/// considered stuck.
const HOIST_LIMIT: usize = 64;

/// Exclusive use of the relocation mark for the duration of a reconciliation.
///
/// The mark doubles as a lock between concurrent runs: acquiring fails when
/// any container already carries it.
#[derive(Debug)]
pub struct MarkLease {
    mark: Mark,
}

impl MarkLease {
    pub fn acquire(conn: &mut impl Connection, mark: Mark) -> Result<MarkLease, LayoutError> {
        let name = String::from(mark);
        if conn.get_marks()?.contains(&name) {
            return Err(LayoutError::MarkInUse(name));
        }
        debug!(%mark, "Acquired relocation mark");
        Ok(MarkLease { mark })
    }

    pub fn mark(&self) -> Mark { self.mark }

    /// Fails when the mark is still assigned to a container.
    pub fn verify(&self, conn: &mut impl Connection) -> Result<(), LayoutError> {
        let name = String::from(self.mark);
        if conn.get_marks()?.contains(&name) {
            return Err(LayoutError::MarkNotReleased(name));
        }
        Ok(())
    }

    pub fn release(self, conn: &mut impl Connection) -> Result<(), LayoutError> {
        self.verify(conn)?;
        debug!(mark = %self.mark, "Released relocation mark");
        Ok(())
    }

    /// Best-effort cleanup after a failure.
    pub fn abandon(self, conn: &mut impl Connection) {
        if let Err(e) = commands::run(conn, None, &WmCommand::Unmark(self.mark)) {
            warn!(mark = %self.mark, "Could not clear relocation mark: {e}");
        }
    }
}

/// Runs `f` while holding the relocation mark. The mark is verified absent
/// afterwards, or cleared on the way out when `f` fails.
pub fn with_relocation_mark<C, T>(
    conn: &mut C,
    mark: Mark,
    f: impl FnOnce(&mut C, &MarkLease) -> Result<T, LayoutError>,
) -> Result<T, LayoutError>
where
    C: Connection,
{
    let lease = MarkLease::acquire(conn, mark)?;
    match f(conn, &lease) {
        Ok(value) => {
            lease.release(conn)?;
            Ok(value)
        }
        Err(e) => {
            lease.abandon(conn);
            Err(e)
        }
    }
}

/// Live ids of the realised workspace and of every node of its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizedLayout {
    pub workspace: ConId,
    pub nodes: HashMap<LeafPath, ConId>,
}

/// Arranges the windows in `leaves` on workspace `workspace_name` as described
/// by `layout`.
pub fn create_layout(
    conn: &mut impl Connection,
    lease: &MarkLease,
    workspace_name: &str,
    layout: &WorkspaceLayout,
    leaves: &LeafAssignments,
) -> Result<RealizedLayout, LayoutError> {
    let tree = conn.snapshot()?;
    let workspace = tree
        .workspace_by_name(workspace_name)
        .ok_or_else(|| LayoutError::WorkspaceNotFound(workspace_name.to_owned()))?;
    if layout.children.is_empty() {
        return Err(LayoutError::EmptyWorkspace(workspace_name.to_owned()));
    }

    let mut reconciler = Reconciler {
        conn: &mut *conn,
        mark: lease.mark(),
        workspace: workspace.id,
        workspace_name,
        leaves,
        realized: HashMap::default(),
    };

    if reconciler.realizes_workspace(workspace, layout) {
        info!(workspace = workspace_name, "Layout already in place");
        reconciler.record_workspace(workspace, layout);
    } else {
        reconciler.build_workspace(workspace, layout)?;
    }

    let RealizedLayout { workspace, nodes } = reconciler.finish()?;
    lease.verify(conn)?;
    Ok(RealizedLayout { workspace, nodes })
}

struct Reconciler<'a, C> {
    conn: &'a mut C,
    mark: Mark,
    workspace: ConId,
    workspace_name: &'a str,
    leaves: &'a LeafAssignments,
    realized: HashMap<LeafPath, ConId>,
}

impl<C: Connection> Reconciler<'_, C> {
    fn run(&mut self, target: ConId, command: WmCommand) -> Result<(), LayoutError> {
        commands::run(&mut *self.conn, Some(target), &command)
    }

    fn snapshot(&mut self) -> Result<Tree, LayoutError> { Ok(self.conn.snapshot()?) }

    fn build_workspace(
        &mut self,
        workspace: &Node,
        layout: &WorkspaceLayout,
    ) -> Result<(), LayoutError> {
        // Hoisting relies on `move right` leaving split containers sideways.
        if workspace.layout != NodeLayout::SplitH {
            if let Some(first) = workspace.nodes.first() {
                self.run(first.id, WmCommand::Layout(LayoutKind::SplitH))?;
            }
        }

        let mut path = Vec::new();
        for (index, child) in layout.children.iter().enumerate() {
            path.push(index);
            let id = self.realize(child, &mut path)?;
            path.pop();
            self.bring_to_workspace(id)?;
            let tree = self.snapshot()?;
            self.swap_into(&tree, self.workspace, id, index)?;
        }

        if let Some(kind) = layout.layout {
            let tree = self.snapshot()?;
            let live = tree.get(self.workspace).ok_or(LayoutError::ContainerVanished(self.workspace))?;
            if !kind.matches_live(live.layout) {
                if let Some(first) = live.nodes.first() {
                    self.run(first.id, WmCommand::Layout(kind))?;
                }
            }
        }
        Ok(())
    }

    /// Returns the live id of `node`, building it first when needed.
    fn realize(&mut self, node: &LayoutNode, path: &mut LeafPath) -> Result<ConId, LayoutError> {
        let container = match node {
            LayoutNode::Leaf(_) => {
                let id = *self.leaves.get(path.as_slice()).ok_or_else(|| LayoutError::MissingLeaf(path.clone()))?;
                if !self.snapshot()?.contains(id) {
                    return Err(LayoutError::ContainerVanished(id));
                }
                self.realized.insert(path.clone(), id);
                return Ok(id);
            }
            LayoutNode::Container(container) => container,
        };

        let tree = self.snapshot()?;
        if let Some(live) = self.find_realized(&tree, node, path) {
            debug!(id = live.id, ?path, "Reusing container");
            self.record(live, node, path);
            return Ok(live.id);
        }

        let Some(first) = container.children.first() else {
            return Err(LayoutError::EmptyContainer(path.clone()));
        };
        path.push(0);
        let first = self.realize(first, path)?;
        path.pop();
        let parent = self.wrap(first, container.layout)?;
        debug!(id = parent, ?path, layout = %container.layout, "Created container");

        for (index, child) in container.children.iter().enumerate().skip(1) {
            path.push(index);
            let id = self.realize(child, path)?;
            path.pop();
            self.place(parent, id, index)?;
        }

        self.realized.insert(path.clone(), parent);
        Ok(parent)
    }

    /// Puts `id` into a container with `layout` and returns that container.
    ///
    /// `split` on the only child of a split container changes the parent's
    /// layout instead of wrapping. That parent is reused, except when it is
    /// the workspace: the workspace is briefly made tabbed so that the split
    /// wraps, then turned back to splith.
    fn wrap(&mut self, id: ConId, layout: LayoutKind) -> Result<ConId, LayoutError> {
        let tree = self.snapshot()?;
        let parent = tree.parent_of(id).ok_or(LayoutError::ContainerVanished(id))?;
        let lone_on_workspace = parent.id == self.workspace
            && parent.nodes.len() == 1
            && matches!(parent.layout, NodeLayout::SplitH | NodeLayout::SplitV);
        if lone_on_workspace {
            self.run(id, WmCommand::Layout(LayoutKind::Tabbed))?;
        }
        self.run(id, WmCommand::SplitH)?;
        self.run(id, WmCommand::Layout(layout))?;

        let tree = self.snapshot()?;
        let wrapper = tree.parent_of(id).ok_or(LayoutError::ContainerVanished(id))?;
        if wrapper.id == self.workspace || wrapper.node_type != NodeType::Con {
            return Err(LayoutError::NotWrapped(id));
        }
        let wrapper = wrapper.id;
        if lone_on_workspace {
            self.run(wrapper, WmCommand::Layout(LayoutKind::SplitH))?;
        }
        Ok(wrapper)
    }

    /// Makes `id` the `index`-th child of the container `parent`.
    fn place(&mut self, parent: ConId, id: ConId, index: usize) -> Result<(), LayoutError> {
        let mut tree = self.snapshot()?;
        if !is_child_of(&tree, parent, id) {
            self.bring_to_workspace(id)?;
            self.run(parent, WmCommand::AddMark(self.mark))?;
            self.run(id, WmCommand::MoveToMark(self.mark))?;
            self.run(parent, WmCommand::Unmark(self.mark))?;
            tree = self.snapshot()?;
            if !is_child_of(&tree, parent, id) {
                return Err(LayoutError::Misplaced { id, parent });
            }
        }
        self.swap_into(&tree, parent, id, index)
    }

    /// Moves `id` onto the target workspace and hoists it until it is a direct
    /// tiling child of the workspace.
    fn bring_to_workspace(&mut self, id: ConId) -> Result<(), LayoutError> {
        let tree = self.snapshot()?;
        if tree.workspace_of(id).map(|ws| ws.id) != Some(self.workspace) {
            self.run(id, WmCommand::MoveToWorkspace(self.workspace_name.to_owned()))?;
        }

        for _ in 0..HOIST_LIMIT {
            let tree = self.snapshot()?;
            if !tree.contains(id) {
                return Err(LayoutError::ContainerVanished(id));
            }
            if is_child_of(&tree, self.workspace, id) {
                return Ok(());
            }
            let actual = tree.workspace_of(id).map(|ws| ws.id);
            if actual != Some(self.workspace) {
                return Err(LayoutError::Drift {
                    id,
                    expected: self.workspace,
                    actual,
                });
            }
            self.run(id, WmCommand::MoveRight)?;
        }
        Err(LayoutError::HoistLimit(id))
    }

    /// Swaps `id` with whatever occupies `index` under `parent`, if that is
    /// not `id` already.
    fn swap_into(
        &mut self,
        tree: &Tree,
        parent: ConId,
        id: ConId,
        index: usize,
    ) -> Result<(), LayoutError> {
        match tree.children(parent).get(index) {
            Some(current) if current.id == id => Ok(()),
            Some(current) => {
                let other = current.id;
                self.run(id, WmCommand::SwapWith(other))
            }
            None => Err(LayoutError::Misplaced { id, parent }),
        }
    }

    /// The live container that already realises `node` exactly, found as the
    /// ancestor of the node's first window at the matching depth.
    fn find_realized<'t>(
        &self,
        tree: &'t Tree,
        node: &LayoutNode,
        path: &LeafPath,
    ) -> Option<&'t Node> {
        let mut first_leaf = path.clone();
        let mut current = node;
        while let Some(first) = current.children().first() {
            first_leaf.push(0);
            current = first;
        }
        let depth = first_leaf.len() - path.len();
        let leaf = *self.leaves.get(&first_leaf)?;
        let candidate = tree.ancestors(leaf).nth(depth)?;
        let mut path = path.clone();
        self.realizes(candidate, node, &mut path).then_some(candidate)
    }

    fn realizes(&self, live: &Node, desired: &LayoutNode, path: &mut LeafPath) -> bool {
        match desired {
            LayoutNode::Leaf(_) => self.leaves.get(path.as_slice()) == Some(&live.id),
            LayoutNode::Container(container) => {
                live.node_type == NodeType::Con
                    && !live.is_window()
                    && container.layout.matches_live(live.layout)
                    && self.children_realize(live, &container.children, path)
            }
        }
    }

    fn children_realize(&self, live: &Node, children: &[LayoutNode], path: &mut LeafPath) -> bool {
        live.nodes.len() == children.len()
            && live.nodes.iter().zip(children).enumerate().all(|(i, (live, desired))| {
                path.push(i);
                let realized = self.realizes(live, desired, path);
                path.pop();
                realized
            })
    }

    fn realizes_workspace(&self, workspace: &Node, layout: &WorkspaceLayout) -> bool {
        layout.layout.is_none_or(|kind| kind.matches_live(workspace.layout))
            && self.children_realize(workspace, &layout.children, &mut Vec::new())
    }

    fn record(&mut self, live: &Node, desired: &LayoutNode, path: &mut LeafPath) {
        self.realized.insert(path.clone(), live.id);
        for (i, (live, desired)) in live.nodes.iter().zip(desired.children()).enumerate() {
            path.push(i);
            self.record(live, desired, path);
            path.pop();
        }
    }

    fn record_workspace(&mut self, workspace: &Node, layout: &WorkspaceLayout) {
        let mut path = Vec::new();
        for (i, (live, desired)) in workspace.nodes.iter().zip(&layout.children).enumerate() {
            path.push(i);
            self.record(live, desired, &mut path);
            path.pop();
        }
    }

    /// Warns about containers on the workspace that are not part of the
    /// layout. They are left where they are.
    fn finish(mut self) -> Result<RealizedLayout, LayoutError> {
        let tree = self.snapshot()?;
        let workspace = tree.get(self.workspace).ok_or(LayoutError::ContainerVanished(self.workspace))?;
        let touched: HashSet<ConId> = self.realized.values().copied().collect();
        for node in descendants(workspace).filter(|n| !touched.contains(&n.id)) {
            warn!(workspace = self.workspace_name, "Container {} is not part of the layout", node.describe());
        }
        Ok(RealizedLayout {
            workspace: self.workspace,
            nodes: self.realized,
        })
    }
}

fn is_child_of(tree: &Tree, parent: ConId, id: ConId) -> bool {
    tree.children(parent).iter().any(|c| c.id == id)
}
