use super::{LayoutKind, Orientation};
use crate::common::config::LayoutNode;
use crate::ipc::protocol::Node;

fn extent(node: &Node, orientation: Orientation) -> u32 {
    match orientation {
        Orientation::Horizontal => node.rect.width,
        Orientation::Vertical => node.rect.height + node.deco_rect.height,
    }
}

/// Size available to the tiling children of `parent`, without gaps.
///
/// Along the split axis this is the sum of the children's extents; across it,
/// the largest child.
pub fn content_size(parent: &Node) -> (u32, u32) {
    let widths = parent.nodes.iter().map(|c| extent(c, Orientation::Horizontal));
    let heights = parent.nodes.iter().map(|c| extent(c, Orientation::Vertical));
    match LayoutKind::from_live(parent.layout).and_then(LayoutKind::orientation) {
        Some(Orientation::Horizontal) => (widths.sum(), heights.max().unwrap_or(0)),
        Some(Orientation::Vertical) => (widths.max().unwrap_or(0), heights.sum()),
        None => (widths.max().unwrap_or(0), heights.max().unwrap_or(0)),
    }
}

/// Share of `parent`'s content taken by `child` along the split axis, rounded
/// down. Stacking and tabbed parents have no split axis and yield `None`.
pub fn calculate_percent(parent: &Node, child: &Node) -> Option<u8> {
    let orientation = LayoutKind::from_live(parent.layout)?.orientation()?;
    let (width, height) = content_size(parent);
    let total = match orientation {
        Orientation::Horizontal => width,
        Orientation::Vertical => height,
    };
    if total == 0 {
        return None;
    }
    let percent = u64::from(extent(child, orientation)) * 100 / u64::from(total);
    Some(percent.min(100) as u8)
}

/// Adds the rounding remainder to the last sibling so that the percentages sum
/// to exactly 100. Does nothing unless every sibling has a percentage.
///
/// The siblings before the last must not exceed 100 together, otherwise the
/// last one is clamped to 0 and the sum stays above 100. Percentages taken
/// from one parent with [`calculate_percent`] are floored shares of the same
/// total and always satisfy this.
pub fn fix_up(percents: &mut [Option<u8>]) {
    let Some(defined) = percents.iter().copied().collect::<Option<Vec<u8>>>() else {
        return;
    };
    let Some(last) = percents.last_mut() else {
        return;
    };
    let sum: i32 = defined.iter().map(|p| i32::from(*p)).sum();
    debug_assert!(
        sum - defined.last().map_or(0, |p| i32::from(*p)) <= 100,
        "leading percentages exceed 100: {defined:?}"
    );
    let difference = 100 - sum;
    if let Some(last) = last {
        *last = (i32::from(*last) + difference).clamp(0, 100) as u8;
    }
}

pub fn fix_up_percentages(children: &mut [LayoutNode]) {
    let mut percents: Vec<_> = children.iter().map(LayoutNode::percent).collect();
    fix_up(&mut percents);
    for (child, percent) in children.iter_mut().zip(percents) {
        child.set_percent(percent);
    }
}
