use serde::{Deserialize, Serialize};

use crate::ipc::protocol::NodeLayout;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Layout of a container as written in a layout document and in `layout`
/// commands.
///
/// The live tree calls the stacking layout `stacked`; [`LayoutKind::from_live`]
/// and [`LayoutKind::matches_live`] translate between the two spellings.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LayoutKind {
    SplitH,
    SplitV,
    Stacking,
    Tabbed,
}

impl LayoutKind {
    pub fn from_live(layout: NodeLayout) -> Option<Self> {
        match layout {
            NodeLayout::SplitH => Some(LayoutKind::SplitH),
            NodeLayout::SplitV => Some(LayoutKind::SplitV),
            NodeLayout::Stacked => Some(LayoutKind::Stacking),
            NodeLayout::Tabbed => Some(LayoutKind::Tabbed),
            _ => None,
        }
    }

    pub fn matches_live(self, layout: NodeLayout) -> bool { Self::from_live(layout) == Some(self) }

    /// Split axis, or `None` for stacking and tabbed containers where every
    /// child fills the whole container.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            LayoutKind::SplitH => Some(Orientation::Horizontal),
            LayoutKind::SplitV => Some(Orientation::Vertical),
            LayoutKind::Stacking | LayoutKind::Tabbed => None,
        }
    }
}
