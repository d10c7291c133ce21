use tracing::trace;

use crate::common::config::{MatchPattern, WindowMatchExpression};
use crate::ipc::protocol::{Node, NodeType, WindowIdentity};
use crate::model::tree::leaves;

/// A set filter field only matches a present attribute.
fn field_matches(pattern: Option<&MatchPattern>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(pattern), Some(value)) => pattern.is_match(value),
        (Some(_), None) => false,
    }
}

/// Checks a window against the variant of `expr` for the protocol the window
/// speaks. Wayland windows never match the X11 variant and vice versa.
pub fn is_window_matching(node: &Node, expr: &WindowMatchExpression) -> bool {
    match node.identity() {
        WindowIdentity::Wayland { app_id, title } => expr.wayland.as_ref().is_some_and(|m| {
            field_matches(m.app_id.as_ref(), Some(app_id)) && field_matches(m.title.as_ref(), title)
        }),
        WindowIdentity::X11 { class, instance, title } => expr.x11.as_ref().is_some_and(|m| {
            field_matches(m.class_name.as_ref(), class)
                && field_matches(m.instance.as_ref(), instance)
                && field_matches(m.title.as_ref(), title)
        }),
    }
}

/// Windows on `workspace` matching `expr`, in tree order.
pub fn find_windows_on_workspace<'a>(
    workspace: &'a Node,
    expr: &'a WindowMatchExpression,
) -> impl Iterator<Item = &'a Node> + 'a {
    leaves(workspace).filter(move |leaf| {
        let matched = matches!(leaf.node_type, NodeType::Con | NodeType::FloatingCon)
            && is_window_matching(leaf, expr);
        trace!(window = %leaf.describe(), matched, "Checked window");
        matched
    })
}
