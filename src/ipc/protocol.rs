//! Wire types of the i3/sway IPC protocol, limited to the fields this crate
//! reads. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Container id as reported in the tree and accepted by `[con_id=...]`.
pub type ConId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    RunCommand = 0,
    GetWorkspaces = 1,
    GetOutputs = 3,
    GetTree = 4,
    GetMarks = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Output,
    Workspace,
    Con,
    FloatingCon,
    Dockarea,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLayout {
    SplitH,
    SplitV,
    Stacked,
    Tabbed,
    Output,
    Dockarea,
    #[default]
    #[serde(rename = "none", other)]
    NoLayout,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self { Rect { x, y, width, height } }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowProperties {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: ConId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub layout: NodeLayout,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub deco_rect: Rect,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub floating_nodes: Vec<Node>,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub marks: Vec<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub pid: Option<i32>,
    #[serde(default)]
    pub window: Option<u64>,
    #[serde(default)]
    pub window_properties: Option<WindowProperties>,
}

/// Identity attributes of a window, split by the protocol it speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowIdentity<'a> {
    Wayland {
        app_id: &'a str,
        title: Option<&'a str>,
    },
    X11 {
        class: Option<&'a str>,
        instance: Option<&'a str>,
        title: Option<&'a str>,
    },
}

impl Node {
    /// Whether the node is a window rather than a split container.
    ///
    /// sway reports windows with layout `none`. i3 reports a split layout on
    /// windows as well, so a childless node carrying a window is also accepted.
    pub fn is_window(&self) -> bool {
        if !matches!(self.node_type, NodeType::Con | NodeType::FloatingCon) {
            return false;
        }
        self.layout == NodeLayout::NoLayout
            || (self.nodes.is_empty()
                && self.floating_nodes.is_empty()
                && (self.app_id.is_some() || self.window.is_some()))
    }

    /// Node kinds whose shape can be compared with a layout document.
    pub fn is_inspectable(&self) -> bool {
        matches!(self.node_type, NodeType::Con | NodeType::FloatingCon | NodeType::Workspace)
    }

    pub fn has_mark(&self, mark: &str) -> bool { self.marks.iter().any(|m| m == mark) }

    pub fn identity(&self) -> WindowIdentity<'_> {
        match &self.app_id {
            Some(app_id) => WindowIdentity::Wayland {
                app_id,
                title: self.name.as_deref(),
            },
            None => {
                let props = self.window_properties.as_ref();
                WindowIdentity::X11 {
                    class: props.and_then(|p| p.class.as_deref()),
                    instance: props.and_then(|p| p.instance.as_deref()),
                    title: props.and_then(|p| p.title.as_deref()),
                }
            }
        }
    }

    pub fn describe(&self) -> String {
        format!("{:?} ({})", self.name.as_deref().unwrap_or(""), self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    #[serde(default)]
    pub parse_error: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl CommandReply {
    pub fn ok() -> Self {
        CommandReply {
            success: true,
            parse_error: false,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        CommandReply {
            success: false,
            parse_error: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub num: i32,
    pub name: String,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub output: String,
}
