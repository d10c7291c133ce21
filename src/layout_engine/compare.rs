//! Read-only comparison of a live subtree with a desired layout.
//!
//! The walk never stops at the first difference: every mismatch is collected
//! so `check` can report all of them, and the overall verdict is simply
//! whether the list is empty.

use std::fmt;

use tracing::debug;

use super::LayoutKind;
use super::matching::is_window_matching;
use crate::common::config::{LayoutNode, WorkspaceLayout};
use crate::ipc::protocol::{ConId, Node, NodeLayout, NodeType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MismatchReason {
    UnexpectedNodeKind(NodeType),
    ExpectedWindow(NodeLayout),
    WindowNotMatching,
    ExpectedContainer,
    LayoutDiffers {
        expected: LayoutKind,
        actual: NodeLayout,
    },
    ChildCount {
        expected: usize,
        actual: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub id: ConId,
    /// Child indices from the workspace down to the compared node.
    pub path: Vec<usize>,
    pub reason: MismatchReason,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container {} at {:?}: ", self.id, self.path)?;
        match &self.reason {
            MismatchReason::UnexpectedNodeKind(kind) => write!(f, "unexpected node kind {kind:?}"),
            MismatchReason::ExpectedWindow(layout) => {
                write!(f, "expected a window, found a {layout:?} container")
            }
            MismatchReason::WindowNotMatching => f.write_str("window does not match"),
            MismatchReason::ExpectedContainer => f.write_str("expected a container, found a window"),
            MismatchReason::LayoutDiffers { expected, actual } => {
                write!(f, "layout is {actual:?}, expected {expected}")
            }
            MismatchReason::ChildCount { expected, actual } => {
                write!(f, "has {actual} children, expected {expected}")
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapeComparison {
    pub mismatches: Vec<Mismatch>,
}

impl ShapeComparison {
    pub fn is_match(&self) -> bool { self.mismatches.is_empty() }

    fn push(&mut self, live: &Node, path: &[usize], reason: MismatchReason) {
        let mismatch = Mismatch {
            id: live.id,
            path: path.to_vec(),
            reason,
        };
        debug!("Mismatch: {mismatch}");
        self.mismatches.push(mismatch);
    }

    fn node(&mut self, live: &Node, desired: &LayoutNode, path: &mut Vec<usize>) {
        if !live.is_inspectable() {
            self.push(live, path, MismatchReason::UnexpectedNodeKind(live.node_type));
            return;
        }
        match desired {
            LayoutNode::Leaf(leaf) => {
                if !live.is_window() {
                    self.push(live, path, MismatchReason::ExpectedWindow(live.layout));
                } else if !is_window_matching(live, &leaf.matcher) {
                    self.push(live, path, MismatchReason::WindowNotMatching);
                }
            }
            LayoutNode::Container(container) => {
                self.container(live, Some(container.layout), &container.children, path)
            }
        }
    }

    fn container(
        &mut self,
        live: &Node,
        layout: Option<LayoutKind>,
        children: &[LayoutNode],
        path: &mut Vec<usize>,
    ) {
        if !live.is_inspectable() {
            self.push(live, path, MismatchReason::UnexpectedNodeKind(live.node_type));
            return;
        }
        if live.is_window() {
            self.push(live, path, MismatchReason::ExpectedContainer);
            return;
        }
        if let Some(expected) = layout.filter(|l| !l.matches_live(live.layout)) {
            self.push(live, path, MismatchReason::LayoutDiffers {
                expected,
                actual: live.layout,
            });
        }
        if live.nodes.len() != children.len() {
            self.push(live, path, MismatchReason::ChildCount {
                expected: children.len(),
                actual: live.nodes.len(),
            });
        }
        for (i, (live_child, desired_child)) in live.nodes.iter().zip(children).enumerate() {
            path.push(i);
            self.node(live_child, desired_child, path);
            path.pop();
        }
    }
}

pub fn compare_workspace(live: &Node, desired: &WorkspaceLayout) -> ShapeComparison {
    let mut comparison = ShapeComparison::default();
    comparison.container(live, desired.layout, &desired.children, &mut Vec::new());
    comparison
}
