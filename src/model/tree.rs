//! Immutable snapshot of the window manager's container tree.
//!
//! A [`Tree`] owns one `get_tree` reply and an index from container id to the
//! node's position. It is never updated in place: after any command the caller
//! takes a new snapshot, since commands can move, replace or delete containers.

use crate::common::collections::HashMap;
use crate::ipc::protocol::{ConId, Node, NodeType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Tiling(usize),
    Floating(usize),
}

#[derive(Debug)]
struct Location {
    parent: Option<ConId>,
    path: Vec<Step>,
}

#[derive(Debug)]
pub struct Tree {
    root: Node,
    index: HashMap<ConId, Location>,
}

impl Tree {
    pub fn new(root: Node) -> Self {
        let mut index = HashMap::default();
        let mut stack = vec![(&root, None, Vec::new())];
        while let Some((node, parent, path)) = stack.pop() {
            for (i, child) in node.nodes.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(Step::Tiling(i));
                stack.push((child, Some(node.id), child_path));
            }
            for (i, child) in node.floating_nodes.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(Step::Floating(i));
                stack.push((child, Some(node.id), child_path));
            }
            index.insert(node.id, Location { parent, path });
        }
        Tree { root, index }
    }

    pub fn contains(&self, id: ConId) -> bool { self.index.contains_key(&id) }

    pub fn get(&self, id: ConId) -> Option<&Node> {
        let location = self.index.get(&id)?;
        let mut node = &self.root;
        for step in &location.path {
            node = match *step {
                Step::Tiling(i) => node.nodes.get(i)?,
                Step::Floating(i) => node.floating_nodes.get(i)?,
            };
        }
        Some(node)
    }

    pub fn parent_of(&self, id: ConId) -> Option<&Node> {
        self.index.get(&id)?.parent.and_then(|p| self.get(p))
    }

    /// Tiling children of `id`, empty when the node is unknown.
    pub fn children(&self, id: ConId) -> &[Node] {
        self.get(id).map(|n| n.nodes.as_slice()).unwrap_or_default()
    }

    /// Returns an iterator over all ancestors of the node, including itself.
    pub fn ancestors(&self, id: ConId) -> impl Iterator<Item = &Node> + '_ {
        let mut next = self.get(id);
        std::iter::from_fn(move || {
            let node = next?;
            next = self.parent_of(node.id);
            Some(node)
        })
    }

    pub fn workspace_of(&self, id: ConId) -> Option<&Node> {
        self.ancestors(id).find(|n| n.node_type == NodeType::Workspace)
    }

    /// User-visible workspaces; internal ones such as `__i3_scratch` are skipped.
    pub fn workspaces(&self) -> impl Iterator<Item = &Node> + '_ {
        traverse_preorder(&self.root).filter(|n| {
            n.node_type == NodeType::Workspace
                && !n.name.as_deref().unwrap_or_default().starts_with("__")
        })
    }

    pub fn workspace_by_name(&self, name: &str) -> Option<&Node> {
        self.workspaces().find(|ws| ws.name.as_deref() == Some(name))
    }

    pub fn focused(&self) -> Option<&Node> { traverse_preorder(&self.root).find(|n| n.focused) }

    pub fn focused_workspace(&self) -> Option<&Node> {
        self.focused().and_then(|n| self.workspace_of(n.id))
    }

    pub fn draw(&self, id: ConId) -> Option<String> {
        let node = self.get(id)?;
        let mut out = String::new();
        ascii_tree::write_tree(&mut out, &ascii_node(node)).ok()?;
        Some(out)
    }
}

/// Visits `node` and all of its descendants, tiling before floating.
pub fn traverse_preorder(node: &Node) -> impl Iterator<Item = &Node> + '_ {
    let mut stack = vec![node];
    std::iter::from_fn(move || {
        let next = stack.pop()?;
        stack.extend(next.floating_nodes.iter().rev());
        stack.extend(next.nodes.iter().rev());
        Some(next)
    })
}

pub fn descendants(node: &Node) -> impl Iterator<Item = &Node> + '_ { traverse_preorder(node).skip(1) }

/// Windows under `node`, in tree order.
pub fn leaves(node: &Node) -> impl Iterator<Item = &Node> + '_ {
    descendants(node).filter(|n| n.is_window())
}

fn ascii_node(node: &Node) -> ascii_tree::Tree {
    let label = if node.is_window() {
        let mut label = format!("{} {:?}", node.id, node.name.as_deref().unwrap_or(""));
        for mark in &node.marks {
            label.push_str(&format!(" [{mark}]"));
        }
        label
    } else {
        format!("{} {:?} {:?}", node.id, node.node_type, node.layout)
    };
    let children: Vec<_> = node.nodes.iter().chain(&node.floating_nodes).map(ascii_node).collect();
    if children.is_empty() {
        ascii_tree::Tree::Leaf(vec![label])
    } else {
        ascii_tree::Tree::Node(label, children)
    }
}
