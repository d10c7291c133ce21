//! Builds a layout document from the live tree.

use tracing::{debug, error, info, warn};

use super::LayoutError;
use super::ratio::{calculate_percent, fix_up_percentages};
use crate::common::config::{
    ApplicationLaunchConfig, ContainerConfig, LaunchCommand, Layout, LayoutNode, Mark,
    MatchPattern, OutputSelector, WaylandMatch, WindowMatchExpression, WorkspaceLayout, X11Match,
    mark_fields,
};
use crate::ipc::protocol::{Node, NodeType, WindowIdentity};
use crate::layout_engine::LayoutKind;
use crate::model::tree::Tree;
use crate::sys::process::CommandLineLookup;

/// Captures the named workspaces, or every workspace when `names` is empty.
pub fn create_layout_from_tree(
    tree: &Tree,
    names: &[String],
    lookup: &dyn CommandLineLookup,
) -> Result<Layout, LayoutError> {
    let mut layout = Layout::default();
    for workspace in tree.workspaces() {
        let Some(name) = workspace.name.as_deref() else {
            continue;
        };
        if !names.is_empty() && !names.iter().any(|n| n == name) {
            continue;
        }
        let children = capture_children(workspace, lookup)?;
        if children.is_empty() {
            info!("Skipping workspace {name} without tiled windows");
            continue;
        }
        let output = tree
            .parent_of(workspace.id)
            .filter(|p| p.node_type == NodeType::Output)
            .and_then(|p| p.name.clone())
            .map(OutputSelector::One);
        layout.workspaces.insert(name.to_owned(), WorkspaceLayout {
            layout: LayoutKind::from_live(workspace.layout),
            output,
            children,
        });
    }

    for name in names {
        if !layout.workspaces.contains_key(name) {
            warn!("Workspace {name} was not captured");
        }
    }
    Ok(layout)
}

fn capture_children(
    parent: &Node,
    lookup: &dyn CommandLineLookup,
) -> Result<Vec<LayoutNode>, LayoutError> {
    for floating in &parent.floating_nodes {
        warn!(
            "Floating containers are not supported; skipping {}",
            floating.describe()
        );
    }

    let mut children = Vec::new();
    for child in &parent.nodes {
        if let Some(mut node) = capture_node(child, lookup)? {
            node.set_percent(calculate_percent(parent, child));
            children.push(node);
        }
    }
    fix_up_percentages(&mut children);
    Ok(children)
}

fn capture_node(
    node: &Node,
    lookup: &dyn CommandLineLookup,
) -> Result<Option<LayoutNode>, LayoutError> {
    debug!("Capturing {}", node.describe());
    match node.node_type {
        NodeType::Con if node.is_window() => Ok(capture_window(node, lookup)?.map(LayoutNode::Leaf)),
        NodeType::Con => {
            let Some(layout) = LayoutKind::from_live(node.layout) else {
                return Err(LayoutError::UnexpectedNodeKind {
                    id: node.id,
                    kind: format!("container with layout {:?}", node.layout),
                });
            };
            let children = capture_children(node, lookup)?;
            if children.is_empty() {
                warn!("Skipping empty container {}", node.describe());
                return Ok(None);
            }
            let (mark, marks) = mark_fields(captured_marks(node));
            Ok(Some(LayoutNode::Container(ContainerConfig {
                layout,
                children,
                mark,
                marks,
                percent: None,
            })))
        }
        NodeType::FloatingCon => {
            warn!("Floating containers are not supported; skipping {}", node.describe());
            Ok(None)
        }
        other => Err(LayoutError::UnexpectedNodeKind {
            id: node.id,
            kind: format!("{other:?}"),
        }),
    }
}

fn capture_window(
    node: &Node,
    lookup: &dyn CommandLineLookup,
) -> Result<Option<ApplicationLaunchConfig>, LayoutError> {
    let exact = |value: Option<&str>| value.map(MatchPattern::exact).transpose();
    let matcher = match node.identity() {
        WindowIdentity::Wayland { app_id, title } => WindowMatchExpression {
            wayland: Some(WaylandMatch::new(Some(MatchPattern::exact(app_id)?), exact(title)?)?),
            x11: None,
        },
        WindowIdentity::X11 {
            class: None,
            instance: None,
            title: None,
        } => {
            warn!("Window {} has no identifying attributes; skipping", node.describe());
            return Ok(None);
        }
        WindowIdentity::X11 { class, instance, title } => WindowMatchExpression {
            wayland: None,
            x11: Some(X11Match::new(exact(class)?, exact(instance)?, exact(title)?)?),
        },
    };

    let cmd = match node.pid {
        Some(pid) => lookup.command_line(pid).unwrap_or_default(),
        None => {
            error!("Cannot recover the command of {} without a pid", node.describe());
            Vec::new()
        }
    };

    let (mark, marks) = mark_fields(captured_marks(node));
    Ok(Some(ApplicationLaunchConfig {
        cmd: LaunchCommand::Args(cmd),
        matcher,
        mark,
        marks,
        percent: None,
        focus: node.focused,
    }))
}

/// Marks that fit in a layout document; longer marks are dropped.
fn captured_marks(node: &Node) -> Vec<Mark> {
    node.marks
        .iter()
        .filter_map(|m| match Mark::try_from(m.clone()) {
            Ok(mark) => Some(mark),
            Err(e) => {
                warn!("Not capturing mark of {}: {e}", node.describe());
                None
            }
        })
        .collect()
}
