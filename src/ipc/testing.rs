//! An in-memory window manager for tests.
//!
//! [`FakeSway`] keeps a container tree and applies the subset of the sway
//! command language the layout engine emits, with sway's semantics for
//! splitting, moving and marking. Every command is recorded so tests can assert
//! on exactly what was sent.

use std::collections::BTreeMap;

use super::protocol::{NodeLayout, NodeType, Rect, WindowProperties};
use super::{CommandReply, ConId, Connection, IpcError, Node, Output, Workspace, scoped_command};
use crate::common::util::parse_command;

#[derive(Clone, Debug)]
pub enum FakeWindow {
    Wayland {
        app_id: String,
        title: String,
    },
    X11 {
        class: String,
        instance: String,
        title: String,
    },
}

impl FakeWindow {
    pub fn wayland(app_id: &str, title: &str) -> Self {
        FakeWindow::Wayland {
            app_id: app_id.into(),
            title: title.into(),
        }
    }

    pub fn x11(class: &str, instance: &str, title: &str) -> Self {
        FakeWindow::X11 {
            class: class.into(),
            instance: instance.into(),
            title: title.into(),
        }
    }
}

#[derive(Clone, Debug)]
struct FakeNode {
    node_type: NodeType,
    name: Option<String>,
    layout: NodeLayout,
    parent: Option<ConId>,
    children: Vec<ConId>,
    floating: Vec<ConId>,
    marks: Vec<String>,
    window: Option<FakeWindow>,
    weight: f64,
}

impl FakeNode {
    fn new(node_type: NodeType, layout: NodeLayout) -> Self {
        FakeNode {
            node_type,
            name: None,
            layout,
            parent: None,
            children: Vec::new(),
            floating: Vec::new(),
            marks: Vec::new(),
            window: None,
            weight: 1.0,
        }
    }
}

struct SpawnRule {
    needle: String,
    id: ConId,
    window: FakeWindow,
    after_polls: usize,
}

struct Relocation {
    needle: String,
    id: ConId,
    workspace: String,
}

struct PendingSpawn {
    id: ConId,
    window: FakeWindow,
    workspace: ConId,
    remaining_polls: usize,
}

pub const OUTPUT_RECT: Rect = Rect { x: 0, y: 0, width: 1000, height: 800 };

pub struct FakeSway {
    nodes: BTreeMap<ConId, FakeNode>,
    next_id: ConId,
    root: ConId,
    focused: ConId,
    spawn_rules: Vec<SpawnRule>,
    pending_spawns: Vec<PendingSpawn>,
    removals: Vec<(ConId, usize)>,
    relocations: Vec<Relocation>,
    failures: Vec<String>,
    log: Vec<String>,
}

impl Default for FakeSway {
    fn default() -> Self { Self::new() }
}

impl FakeSway {
    /// A root with one output, `HDMI-A-1`, showing the focused workspace `1`.
    pub fn new() -> Self {
        let mut fake = FakeSway {
            nodes: BTreeMap::new(),
            next_id: 1,
            root: 1,
            focused: 1,
            spawn_rules: Vec::new(),
            pending_spawns: Vec::new(),
            removals: Vec::new(),
            relocations: Vec::new(),
            failures: Vec::new(),
            log: Vec::new(),
        };
        let root = fake.insert(FakeNode::new(NodeType::Root, NodeLayout::SplitH), None);
        fake.root = root;
        fake.add_output("HDMI-A-1");
        let ws = fake.add_workspace("1");
        fake.focused = ws;
        fake
    }

    fn alloc_id(&mut self) -> ConId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, mut node: FakeNode, parent: Option<ConId>) -> ConId {
        let id = self.alloc_id();
        node.parent = parent;
        self.nodes.insert(id, node);
        if let Some(parent) = parent {
            self.node_mut(parent).children.push(id);
        }
        id
    }

    fn node(&self, id: ConId) -> &FakeNode { &self.nodes[&id] }

    fn node_mut(&mut self, id: ConId) -> &mut FakeNode {
        self.nodes.get_mut(&id).unwrap_or_else(|| panic!("no node {id}"))
    }

    pub fn add_output(&mut self, name: &str) -> ConId {
        let mut output = FakeNode::new(NodeType::Output, NodeLayout::Output);
        output.name = Some(name.into());
        self.insert(output, Some(self.root))
    }

    /// Adds a workspace on the first output.
    pub fn add_workspace(&mut self, name: &str) -> ConId {
        let output = self.outputs()[0];
        self.add_workspace_on(output, name)
    }

    pub fn add_workspace_on(&mut self, output: ConId, name: &str) -> ConId {
        let mut ws = FakeNode::new(NodeType::Workspace, NodeLayout::SplitH);
        ws.name = Some(name.into());
        self.insert(ws, Some(output))
    }

    pub fn add_container(&mut self, parent: ConId, layout: NodeLayout) -> ConId {
        self.insert(FakeNode::new(NodeType::Con, layout), Some(parent))
    }

    pub fn add_window(&mut self, parent: ConId, window: FakeWindow) -> ConId {
        let id = self.insert(window_node(window), Some(parent));
        self.focused = id;
        id
    }

    pub fn add_floating(&mut self, workspace: ConId, window: FakeWindow) -> ConId {
        let id = self.alloc_id();
        let mut node = window_node(window);
        node.node_type = NodeType::FloatingCon;
        node.parent = Some(workspace);
        self.nodes.insert(id, node);
        self.node_mut(workspace).floating.push(id);
        id
    }

    pub fn set_marks(&mut self, id: ConId, marks: &[&str]) {
        self.node_mut(id).marks = marks.iter().map(|m| m.to_string()).collect();
    }

    pub fn focus(&mut self, id: ConId) { self.focused = id; }

    /// The next `exec` whose command line contains `needle` opens `window` on
    /// the workspace focused at that time, visible from the poll after
    /// `after_polls` further `get_tree` calls. Returns the id it will get.
    pub fn spawn_on_exec(&mut self, needle: &str, window: FakeWindow, after_polls: usize) -> ConId {
        let id = self.alloc_id();
        self.spawn_rules.push(SpawnRule {
            needle: needle.into(),
            id,
            window,
            after_polls,
        });
        id
    }

    /// Deletes `id` once `after_polls` more trees have been served.
    pub fn remove_after_polls(&mut self, id: ConId, after_polls: usize) {
        self.removals.push((id, after_polls));
    }

    /// Once a command containing `needle` has run, `id` is moved to the
    /// workspace `workspace`, as if another client had interfered.
    pub fn relocate_after(&mut self, needle: &str, id: ConId, workspace: &str) {
        self.relocations.push(Relocation {
            needle: needle.into(),
            id,
            workspace: workspace.into(),
        });
    }

    /// Every command containing `needle` fails.
    pub fn fail_command(&mut self, needle: &str) { self.failures.push(needle.into()); }

    pub fn commands(&self) -> &[String] { &self.log }

    pub fn clear_log(&mut self) { self.log.clear(); }

    /// Commands that change the tree, ignoring `exec`, `focus` and friends.
    pub fn structural_commands(&self) -> Vec<&str> {
        self.log
            .iter()
            .map(String::as_str)
            .filter(|c| {
                ["move ", "swap ", "mark ", "unmark ", "split", "layout "]
                    .iter()
                    .any(|verb| c.contains(verb))
            })
            .collect()
    }

    pub fn workspace_id(&self, name: &str) -> Option<ConId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.node_type == NodeType::Workspace && n.name.as_deref() == Some(name))
            .map(|(id, _)| *id)
    }

    pub fn children_of(&self, id: ConId) -> Vec<ConId> { self.node(id).children.clone() }

    pub fn parent_of(&self, id: ConId) -> Option<ConId> { self.nodes.get(&id).and_then(|n| n.parent) }

    pub fn layout_of(&self, id: ConId) -> NodeLayout { self.node(id).layout }

    pub fn marks_of(&self, id: ConId) -> Vec<String> { self.node(id).marks.clone() }

    pub fn focused_id(&self) -> ConId { self.focused }

    fn outputs(&self) -> Vec<ConId> { self.node(self.root).children.clone() }

    fn workspace_of(&self, mut id: ConId) -> Option<ConId> {
        loop {
            let node = self.nodes.get(&id)?;
            if node.node_type == NodeType::Workspace {
                return Some(id);
            }
            id = node.parent?;
        }
    }

    fn focused_workspace(&self) -> Option<ConId> { self.workspace_of(self.focused) }

    fn is_ancestor(&self, ancestor: ConId, mut id: ConId) -> bool {
        while let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    fn detach(&mut self, id: ConId) -> Option<ConId> {
        let parent = self.node_mut(id).parent.take()?;
        let parent_node = self.node_mut(parent);
        parent_node.children.retain(|c| *c != id);
        parent_node.floating.retain(|c| *c != id);
        Some(parent)
    }

    fn attach(&mut self, id: ConId, parent: ConId, index: usize) {
        self.node_mut(id).parent = Some(parent);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, id);
    }

    /// Removes split containers left without children.
    fn reap(&mut self, mut id: ConId) {
        loop {
            let node = self.node(id);
            if node.node_type != NodeType::Con || node.window.is_some() || !node.children.is_empty()
            {
                return;
            }
            let parent = self.detach(id);
            self.remove_subtree(id);
            match parent {
                Some(parent) => id = parent,
                None => return,
            }
        }
    }

    fn remove_subtree(&mut self, id: ConId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children.into_iter().chain(node.floating) {
                self.remove_subtree(child);
            }
        }
        if !self.nodes.contains_key(&self.focused) {
            self.focused = self.root;
        }
    }

    fn find_or_create_workspace(&mut self, name: &str) -> ConId {
        if let Some(id) = self.workspace_id(name) {
            return id;
        }
        let output = self
            .focused_workspace()
            .and_then(|ws| self.node(ws).parent)
            .unwrap_or_else(|| self.outputs()[0]);
        self.add_workspace_on(output, name)
    }

    fn first_window(&self, id: ConId) -> Option<ConId> {
        let node = self.node(id);
        if node.window.is_some() {
            return Some(id);
        }
        node.children.iter().chain(&node.floating).find_map(|c| self.first_window(*c))
    }

    fn tick(&mut self) {
        let mut ready = Vec::new();
        self.pending_spawns.retain_mut(|spawn| {
            if spawn.remaining_polls == 0 {
                ready.push((spawn.id, spawn.window.clone(), spawn.workspace));
                false
            } else {
                spawn.remaining_polls -= 1;
                true
            }
        });
        for (id, window, workspace) in ready {
            if !self.nodes.contains_key(&workspace) {
                continue;
            }
            let mut node = window_node(window);
            node.parent = Some(workspace);
            self.nodes.insert(id, node);
            self.node_mut(workspace).children.push(id);
            self.focused = id;
        }

        let mut gone = Vec::new();
        self.removals.retain_mut(|(id, remaining)| {
            if *remaining == 0 {
                gone.push(*id);
                false
            } else {
                *remaining -= 1;
                true
            }
        });
        for id in gone {
            self.detach(id);
            self.remove_subtree(id);
        }
    }

    fn execute(&mut self, target: Option<ConId>, command: &str) -> Result<(), String> {
        let target = target.unwrap_or(self.focused);
        if !self.nodes.contains_key(&target) {
            return Err(format!("No container matches con_id={target}"));
        }

        let words = parse_command(command);
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["exec", ..] => {
                let line = command.trim_start_matches("exec").trim_start();
                self.exec(line);
                Ok(())
            }
            ["workspace", name] => {
                self.switch_workspace(name);
                Ok(())
            }
            ["move", "workspace", "to", "output", output] => self.move_workspace(target, output),
            ["move", "container", "to", "workspace", name] => self.move_to_workspace(target, name),
            ["move", "container", "to", "mark", mark] => self.move_to_mark(target, mark),
            ["move", "right"] => self.move_right(target),
            ["swap", "container", "with", "con_id", other] => {
                let other = other.parse().map_err(|_| format!("Bad con_id {other}"))?;
                self.swap(target, other)
            }
            ["mark", "--add", mark] => {
                for node in self.nodes.values_mut() {
                    node.marks.retain(|m| m != mark);
                }
                self.node_mut(target).marks.push(mark.to_string());
                Ok(())
            }
            ["unmark", mark] => {
                for node in self.nodes.values_mut() {
                    node.marks.retain(|m| m != mark);
                }
                Ok(())
            }
            ["splith"] => self.split(target, NodeLayout::SplitH),
            ["splitv"] => self.split(target, NodeLayout::SplitV),
            ["layout", kind] => {
                let layout = match *kind {
                    "splith" => NodeLayout::SplitH,
                    "splitv" => NodeLayout::SplitV,
                    "stacking" => NodeLayout::Stacked,
                    "tabbed" => NodeLayout::Tabbed,
                    _ => return Err(format!("Unknown layout {kind}")),
                };
                let node = self.node(target);
                let owner = if node.node_type == NodeType::Workspace {
                    target
                } else {
                    node.parent.ok_or("Container has no parent")?
                };
                self.node_mut(owner).layout = layout;
                Ok(())
            }
            ["resize", "set", axis @ ("width" | "height"), amount, "ppt"] => {
                let amount: f64 = amount.parse().map_err(|_| format!("Bad amount {amount}"))?;
                self.resize(target, axis, amount)
            }
            ["focus"] => {
                self.focused = target;
                Ok(())
            }
            _ => Err(format!("Unknown/invalid command '{command}'")),
        }
    }

    fn relocate(&mut self, command: &str) -> Result<(), String> {
        let Some(index) = self.relocations.iter().position(|r| command.contains(&r.needle)) else {
            return Ok(());
        };
        let relocation = self.relocations.remove(index);
        self.move_to_workspace(relocation.id, &relocation.workspace)
    }

    fn exec(&mut self, line: &str) {
        let Some(index) = self.spawn_rules.iter().position(|r| line.contains(&r.needle)) else {
            return;
        };
        let rule = self.spawn_rules.remove(index);
        if let Some(workspace) = self.focused_workspace() {
            self.pending_spawns.push(PendingSpawn {
                id: rule.id,
                window: rule.window,
                workspace,
                remaining_polls: rule.after_polls,
            });
        }
    }

    fn switch_workspace(&mut self, name: &str) {
        let previous = self.focused_workspace();
        let ws = self.find_or_create_workspace(name);
        self.focused = self.first_window(ws).unwrap_or(ws);
        if let Some(previous) = previous.filter(|p| *p != ws) {
            let node = self.node(previous);
            if node.children.is_empty() && node.floating.is_empty() {
                self.detach(previous);
                self.remove_subtree(previous);
            }
        }
    }

    fn move_workspace(&mut self, target: ConId, output: &str) -> Result<(), String> {
        let ws = self.workspace_of(target).ok_or("Not on a workspace")?;
        let output = self
            .outputs()
            .into_iter()
            .find(|o| self.node(*o).name.as_deref() == Some(output))
            .ok_or_else(|| format!("No output matched {output}"))?;
        self.detach(ws);
        self.attach(ws, output, usize::MAX);
        Ok(())
    }

    fn move_to_workspace(&mut self, target: ConId, name: &str) -> Result<(), String> {
        if self.node(target).node_type == NodeType::Workspace {
            return Err("Can't move a workspace to a workspace".into());
        }
        let ws = self.find_or_create_workspace(name);
        if let Some(old_parent) = self.detach(target) {
            self.attach(target, ws, usize::MAX);
            self.reap(old_parent);
        }
        Ok(())
    }

    fn move_to_mark(&mut self, target: ConId, mark: &str) -> Result<(), String> {
        let (destination, node) = self
            .nodes
            .iter()
            .find(|(_, n)| n.marks.iter().any(|m| m == mark))
            .map(|(id, n)| (*id, n.clone()))
            .ok_or_else(|| format!("Mark '{mark}' not found"))?;
        if destination == target || self.is_ancestor(target, destination) {
            return Err("Can't move a container into itself".into());
        }
        let old_parent = self.detach(target).ok_or("Container has no parent")?;
        if node.window.is_some() {
            let parent = node.parent.ok_or("Marked window has no parent")?;
            let index = self.node(parent).children.iter().position(|c| *c == destination);
            self.attach(target, parent, index.map_or(usize::MAX, |i| i + 1));
        } else {
            self.attach(target, destination, usize::MAX);
        }
        self.reap(old_parent);
        Ok(())
    }

    /// Passes a window to the right, enters a split container to the right,
    /// or leaves the parent for the first ancestor with a right neighbour. At
    /// the right edge of the workspace the container becomes a direct child
    /// of the workspace.
    fn move_right(&mut self, target: ConId) -> Result<(), String> {
        let old_parent = self.node(target).parent.ok_or("Container has no parent")?;
        let mut current = target;
        loop {
            let parent = self.node(current).parent.ok_or("Container has no parent")?;
            let parent_node = self.node(parent);
            let index = parent_node.children.iter().position(|c| *c == current).ok_or("Floating")?;
            let neighbour = parent_node.children.get(index + 1).copied();

            if let Some(neighbour) = neighbour.filter(|_| parent_node.layout == NodeLayout::SplitH) {
                let neighbour_node = self.node(neighbour);
                if neighbour_node.window.is_some() {
                    if current == target {
                        self.node_mut(parent).children.swap(index, index + 1);
                        return Ok(());
                    }
                    self.detach(target);
                    self.attach(target, parent, index + 1);
                } else {
                    let index = if neighbour_node.layout == NodeLayout::SplitH { 0 } else { usize::MAX };
                    self.detach(target);
                    self.attach(target, neighbour, index);
                }
                self.reap(old_parent);
                return Ok(());
            }

            if parent_node.node_type == NodeType::Workspace {
                if current != target {
                    self.detach(target);
                    self.attach(target, parent, index + 1);
                    self.reap(old_parent);
                }
                return Ok(());
            }
            current = parent;
        }
    }

    fn swap(&mut self, a: ConId, b: ConId) -> Result<(), String> {
        if !self.nodes.contains_key(&b) {
            return Err(format!("Failed to find container {b}"));
        }
        if a == b || self.is_ancestor(a, b) || self.is_ancestor(b, a) {
            return Err("Cannot swap ancestor and descendant".into());
        }
        let pa = self.node(a).parent.ok_or("No parent")?;
        let pb = self.node(b).parent.ok_or("No parent")?;
        let ia = self.node(pa).children.iter().position(|c| *c == a).ok_or("Floating")?;
        let ib = self.node(pb).children.iter().position(|c| *c == b).ok_or("Floating")?;
        self.node_mut(pa).children[ia] = b;
        self.node_mut(pb).children[ib] = a;
        self.node_mut(a).parent = Some(pb);
        self.node_mut(b).parent = Some(pa);
        let (wa, wb) = (self.node(a).weight, self.node(b).weight);
        self.node_mut(a).weight = wb;
        self.node_mut(b).weight = wa;
        Ok(())
    }

    fn split(&mut self, target: ConId, layout: NodeLayout) -> Result<(), String> {
        let node = self.node(target);
        if node.node_type == NodeType::Workspace {
            self.node_mut(target).layout = layout;
            return Ok(());
        }
        let parent = node.parent.ok_or("Container has no parent")?;
        let parent_node = self.node(parent);
        let lone_in_split = parent_node.children.len() == 1
            && matches!(parent_node.layout, NodeLayout::SplitH | NodeLayout::SplitV);
        if lone_in_split {
            self.node_mut(parent).layout = layout;
            return Ok(());
        }
        let index = parent_node.children.iter().position(|c| *c == target).ok_or("Floating")?;
        let weight = node.weight;

        let id = self.alloc_id();
        let mut wrapper = FakeNode::new(NodeType::Con, layout);
        wrapper.parent = Some(parent);
        wrapper.children = vec![target];
        wrapper.weight = weight;
        self.nodes.insert(id, wrapper);
        self.node_mut(parent).children[index] = id;
        let node = self.node_mut(target);
        node.parent = Some(id);
        node.weight = 1.0;
        Ok(())
    }

    fn resize(&mut self, target: ConId, axis: &str, amount: f64) -> Result<(), String> {
        let parent = self.node(target).parent.ok_or("Container has no parent")?;
        let expected = if axis == "width" { NodeLayout::SplitH } else { NodeLayout::SplitV };
        let parent_node = self.node(parent);
        if parent_node.layout != expected {
            return Err(format!("Cannot resize {axis} in a {:?} container", parent_node.layout));
        }
        let others: f64 = parent_node
            .children
            .iter()
            .filter(|c| **c != target)
            .map(|c| self.node(*c).weight)
            .sum();
        if others == 0.0 || !(0.0..100.0).contains(&amount) {
            return Err("Cannot resize".into());
        }
        self.node_mut(target).weight = others * amount / (100.0 - amount);
        Ok(())
    }

    fn build(&self, id: ConId, rect: Rect) -> Node {
        let node = self.node(id);
        let rect = if node.node_type == NodeType::Output || node.node_type == NodeType::Workspace {
            OUTPUT_RECT
        } else {
            rect
        };

        let child_rects = child_rects(
            node.layout,
            rect,
            &node.children.iter().map(|c| self.node(*c).weight).collect::<Vec<_>>(),
        );
        let nodes = node.children.iter().zip(child_rects).map(|(c, r)| self.build(*c, r)).collect();
        let floating_nodes =
            node.floating.iter().map(|c| self.build(*c, Rect::new(100, 100, 300, 200))).collect();

        let (app_id, window, window_properties, name) = match &node.window {
            Some(FakeWindow::Wayland { app_id, title }) => {
                (Some(app_id.clone()), None, None, Some(title.clone()))
            }
            Some(FakeWindow::X11 { class, instance, title }) => (
                None,
                Some(id as u64),
                Some(WindowProperties {
                    class: Some(class.clone()),
                    instance: Some(instance.clone()),
                    title: Some(title.clone()),
                }),
                Some(title.clone()),
            ),
            None => (None, None, None, node.name.clone()),
        };

        Node {
            id,
            name,
            node_type: node.node_type,
            layout: node.layout,
            rect,
            deco_rect: Rect::default(),
            nodes,
            floating_nodes,
            focused: id == self.focused,
            marks: node.marks.clone(),
            app_id,
            pid: node.window.as_ref().map(|_| 1000 + id as i32),
            window,
            window_properties,
        }
    }
}

fn window_node(window: FakeWindow) -> FakeNode {
    let mut node = FakeNode::new(NodeType::Con, NodeLayout::NoLayout);
    node.window = Some(window);
    node
}

fn child_rects(layout: NodeLayout, rect: Rect, weights: &[f64]) -> Vec<Rect> {
    let total: f64 = weights.iter().sum();
    let (extent, horizontal) = match layout {
        NodeLayout::SplitH => (rect.width, true),
        NodeLayout::SplitV => (rect.height, false),
        _ => return weights.iter().map(|_| rect).collect(),
    };

    let mut rects = Vec::with_capacity(weights.len());
    let mut offset = 0u32;
    for (i, weight) in weights.iter().enumerate() {
        let size = if i + 1 == weights.len() {
            extent - offset
        } else {
            (extent as f64 * weight / total).floor() as u32
        };
        rects.push(if horizontal {
            Rect::new(rect.x + offset as i32, rect.y, size, rect.height)
        } else {
            Rect::new(rect.x, rect.y + offset as i32, rect.width, size)
        });
        offset += size;
    }
    rects
}

impl Connection for FakeSway {
    fn get_tree(&mut self) -> Result<Node, IpcError> {
        self.tick();
        Ok(self.build(self.root, OUTPUT_RECT))
    }

    fn get_marks(&mut self) -> Result<Vec<String>, IpcError> {
        Ok(self.nodes.values().flat_map(|n| n.marks.iter().cloned()).collect())
    }

    fn get_outputs(&mut self) -> Result<Vec<Output>, IpcError> {
        Ok(self
            .outputs()
            .into_iter()
            .filter_map(|o| self.node(o).name.clone())
            .map(|name| Output { name, active: true })
            .collect())
    }

    fn get_workspaces(&mut self) -> Result<Vec<Workspace>, IpcError> {
        let focused = self.focused_workspace();
        let mut workspaces = Vec::new();
        for output in self.outputs() {
            let output_name = self.node(output).name.clone().unwrap_or_default();
            for ws in &self.node(output).children {
                let name = self.node(*ws).name.clone().unwrap_or_default();
                if name.starts_with("__") {
                    continue;
                }
                workspaces.push(Workspace {
                    num: name.parse().unwrap_or(-1),
                    name,
                    focused: focused == Some(*ws),
                    output: output_name.clone(),
                });
            }
        }
        Ok(workspaces)
    }

    fn run_command(
        &mut self,
        target: Option<ConId>,
        command: &str,
    ) -> Result<Vec<CommandReply>, IpcError> {
        self.log.push(scoped_command(target, command));
        if self.failures.iter().any(|f| command.contains(f.as_str())) {
            return Ok(vec![CommandReply::failed(format!("Simulated failure of '{command}'"))]);
        }
        let result = self.execute(target, command).and_then(|()| self.relocate(command));
        Ok(vec![match result {
            Ok(()) => CommandReply::ok(),
            Err(e) => CommandReply::failed(e),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree::Tree;

    fn tree(fake: &mut FakeSway) -> Tree { fake.snapshot().unwrap() }

    #[test]
    fn default_tree_has_a_focused_workspace() {
        let mut fake = FakeSway::new();
        let tree = tree(&mut fake);
        assert_eq!(tree.focused_workspace().unwrap().name.as_deref(), Some("1"));
        assert_eq!(tree.focused_workspace().unwrap().rect, OUTPUT_RECT);
    }

    #[test]
    fn split_children_share_the_width() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let ids: Vec<_> =
            (0..3).map(|i| fake.add_window(ws, FakeWindow::wayland("foot", &i.to_string()))).collect();
        let tree = tree(&mut fake);
        let widths: Vec<_> = ids.iter().map(|id| tree.get(*id).unwrap().rect.width).collect();
        assert_eq!(widths, vec![333, 333, 334]);
    }

    #[test]
    fn split_of_a_lone_child_only_changes_the_parent() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let con = fake.add_container(ws, NodeLayout::SplitH);
        let a = fake.add_window(con, FakeWindow::wayland("a", ""));
        fake.run_command(Some(a), "splitv").unwrap();
        assert_eq!(fake.layout_of(con), NodeLayout::SplitV);
        assert_eq!(fake.parent_of(a), Some(con));
    }

    #[test]
    fn split_of_the_only_window_changes_the_workspace() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let a = fake.add_window(ws, FakeWindow::wayland("a", ""));
        fake.run_command(Some(a), "splitv").unwrap();
        assert_eq!(fake.parent_of(a), Some(ws));
        assert_eq!(fake.layout_of(ws), NodeLayout::SplitV);
    }

    #[test]
    fn split_wraps_when_there_are_siblings_or_tabs() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let a = fake.add_window(ws, FakeWindow::wayland("a", ""));
        let b = fake.add_window(ws, FakeWindow::wayland("b", ""));
        fake.run_command(Some(a), "splith").unwrap();
        let wrapper = fake.parent_of(a).unwrap();
        assert_ne!(wrapper, ws);
        assert_eq!(fake.children_of(ws), vec![wrapper, b]);

        let tabs = fake.add_container(ws, NodeLayout::Tabbed);
        let c = fake.add_window(tabs, FakeWindow::wayland("c", ""));
        fake.run_command(Some(c), "splitv").unwrap();
        let inner = fake.parent_of(c).unwrap();
        assert_eq!(fake.children_of(tabs), vec![inner]);
        assert_eq!(fake.layout_of(inner), NodeLayout::SplitV);
    }

    #[test]
    fn move_to_mark_inserts_after_windows_and_appends_to_containers() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let a = fake.add_window(ws, FakeWindow::wayland("a", ""));
        let b = fake.add_window(ws, FakeWindow::wayland("b", ""));
        let con = fake.add_container(ws, NodeLayout::SplitV);
        let c = fake.add_window(con, FakeWindow::wayland("c", ""));
        let d = fake.add_window(con, FakeWindow::wayland("d", ""));

        fake.run_command(Some(a), "mark --add x").unwrap();
        fake.run_command(Some(c), "move container to mark x").unwrap();
        assert_eq!(fake.children_of(ws), vec![a, c, b, con]);

        fake.run_command(Some(con), "mark --add x").unwrap();
        assert!(fake.marks_of(a).is_empty());
        fake.run_command(Some(b), "move container to mark x").unwrap();
        assert_eq!(fake.children_of(con), vec![d, b]);
    }

    #[test]
    fn emptied_containers_are_reaped() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let con = fake.add_container(ws, NodeLayout::SplitV);
        let a = fake.add_window(con, FakeWindow::wayland("a", ""));
        fake.run_command(Some(a), "move right").unwrap();
        assert_eq!(fake.children_of(ws), vec![a]);
        assert!(fake.parent_of(con).is_none());
    }

    #[test]
    fn move_right_passes_windows_and_enters_containers() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let a = fake.add_window(ws, FakeWindow::wayland("a", ""));
        let b = fake.add_window(ws, FakeWindow::wayland("b", ""));
        let con = fake.add_container(ws, NodeLayout::SplitH);
        let c = fake.add_window(con, FakeWindow::wayland("c", ""));

        fake.run_command(Some(a), "move right").unwrap();
        assert_eq!(fake.children_of(ws), vec![b, a, con]);
        fake.run_command(Some(a), "move right").unwrap();
        assert_eq!(fake.children_of(ws), vec![b, con]);
        assert_eq!(fake.children_of(con), vec![a, c]);
    }

    #[test]
    fn move_right_leaves_towards_the_neighbour_of_an_ancestor() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let v = fake.add_container(ws, NodeLayout::SplitV);
        let a = fake.add_window(v, FakeWindow::wayland("a", ""));
        let b = fake.add_window(v, FakeWindow::wayland("b", ""));
        let c = fake.add_window(ws, FakeWindow::wayland("c", ""));

        fake.run_command(Some(a), "move right").unwrap();
        assert_eq!(fake.children_of(ws), vec![v, a, c]);
        assert_eq!(fake.children_of(v), vec![b]);
    }

    #[test]
    fn relocation_follows_the_matching_command() {
        let mut fake = FakeSway::new();
        let ws = fake.workspace_id("1").unwrap();
        let a = fake.add_window(ws, FakeWindow::wayland("a", ""));
        fake.add_window(ws, FakeWindow::wayland("b", ""));
        fake.relocate_after("move right", a, "2");
        fake.run_command(Some(a), "move right").unwrap();
        assert_eq!(fake.parent_of(a), fake.workspace_id("2"));
    }

    #[test]
    fn spawns_after_the_configured_polls() {
        let mut fake = FakeSway::new();
        let id = fake.spawn_on_exec("foot", FakeWindow::wayland("foot", "shell"), 1);
        fake.run_command(None, "exec foot").unwrap();
        assert!(!tree(&mut fake).contains(id));
        assert!(tree(&mut fake).contains(id));
        assert_eq!(fake.focused_id(), id);
    }

    #[test]
    fn unknown_commands_fail() {
        let mut fake = FakeSway::new();
        let replies = fake.run_command(None, "fullscreen").unwrap();
        assert!(!replies[0].success);
        assert_eq!(fake.commands(), ["fullscreen"]);
    }
}
