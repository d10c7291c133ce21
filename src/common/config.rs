//! Layout documents and tool settings.
//!
//! A layout document is YAML and describes the desired tree of every
//! workspace. The settings file is TOML and tunes how layouts are applied.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collections::HashSet;
use super::util::{join_command, parse_command};
use crate::layout_engine::LayoutKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid match pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Mark must be a single character, got {0:?}")]
    Mark(String),
    #[error("At least one match expression must be provided in `{0}`")]
    EmptyMatch(&'static str),
}

pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sway-out").join("config.toml"))
}

/// A regular expression matched against the start of a window attribute, the
/// way sway's own criteria match.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchPattern {
    source: String,
    regex: Regex,
}

impl MatchPattern {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(MatchPattern { source: pattern.to_owned(), regex })
    }

    /// A pattern matching exactly `text` and nothing else.
    pub fn exact(text: &str) -> Result<Self, ConfigError> {
        Self::new(&format!("{}$", regex::escape(text)))
    }

    pub fn as_str(&self) -> &str { &self.source }

    pub fn is_match(&self, haystack: &str) -> bool { self.regex.is_match(haystack) }
}

impl TryFrom<String> for MatchPattern {
    type Error = ConfigError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> { Self::new(&pattern) }
}

impl From<MatchPattern> for String {
    fn from(pattern: MatchPattern) -> String { pattern.source }
}

impl PartialEq for MatchPattern {
    fn eq(&self, other: &Self) -> bool { self.source == other.source }
}

impl Eq for MatchPattern {}

impl fmt::Debug for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "/{}/", self.source) }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWaylandMatch {
    #[serde(default)]
    app_id: Option<MatchPattern>,
    #[serde(default)]
    title: Option<MatchPattern>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWaylandMatch")]
pub struct WaylandMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<MatchPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<MatchPattern>,
}

impl WaylandMatch {
    pub fn new(
        app_id: Option<MatchPattern>,
        title: Option<MatchPattern>,
    ) -> Result<Self, ConfigError> {
        if app_id.is_none() && title.is_none() {
            return Err(ConfigError::EmptyMatch("wayland"));
        }
        Ok(WaylandMatch { app_id, title })
    }
}

impl TryFrom<RawWaylandMatch> for WaylandMatch {
    type Error = ConfigError;

    fn try_from(raw: RawWaylandMatch) -> Result<Self, Self::Error> {
        Self::new(raw.app_id, raw.title)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawX11Match {
    #[serde(default, rename = "class")]
    class_name: Option<MatchPattern>,
    #[serde(default)]
    instance: Option<MatchPattern>,
    #[serde(default)]
    title: Option<MatchPattern>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawX11Match")]
pub struct X11Match {
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<MatchPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<MatchPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<MatchPattern>,
}

impl X11Match {
    pub fn new(
        class_name: Option<MatchPattern>,
        instance: Option<MatchPattern>,
        title: Option<MatchPattern>,
    ) -> Result<Self, ConfigError> {
        if class_name.is_none() && instance.is_none() && title.is_none() {
            return Err(ConfigError::EmptyMatch("x11"));
        }
        Ok(X11Match { class_name, instance, title })
    }
}

impl TryFrom<RawX11Match> for X11Match {
    type Error = ConfigError;

    fn try_from(raw: RawX11Match) -> Result<Self, Self::Error> {
        Self::new(raw.class_name, raw.instance, raw.title)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWindowMatchExpression {
    #[serde(default)]
    wayland: Option<WaylandMatch>,
    #[serde(default)]
    x11: Option<X11Match>,
}

/// Identifies the window of an application, per windowing protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindowMatchExpression")]
pub struct WindowMatchExpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wayland: Option<WaylandMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x11: Option<X11Match>,
}

impl WindowMatchExpression {
    pub fn new(wayland: Option<WaylandMatch>, x11: Option<X11Match>) -> Result<Self, ConfigError> {
        if wayland.is_none() && x11.is_none() {
            return Err(ConfigError::EmptyMatch("match"));
        }
        Ok(WindowMatchExpression { wayland, x11 })
    }
}

impl TryFrom<RawWindowMatchExpression> for WindowMatchExpression {
    type Error = ConfigError;

    fn try_from(raw: RawWindowMatchExpression) -> Result<Self, Self::Error> {
        Self::new(raw.wayland, raw.x11)
    }
}

/// A sway mark. Layout documents only use single-character marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mark(char);

impl Mark {
    pub const fn new(ch: char) -> Self { Mark(ch) }
}

impl TryFrom<String> for Mark {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(Mark(ch)),
            _ => Err(ConfigError::Mark(value)),
        }
    }
}

impl From<Mark> for String {
    fn from(mark: Mark) -> String { mark.0.to_string() }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaunchCommand {
    Shell(String),
    Args(Vec<String>),
}

impl LaunchCommand {
    /// The text passed to `exec`, which runs it through `sh -c`.
    pub fn to_exec_string(&self) -> String {
        match self {
            LaunchCommand::Shell(command) => command.clone(),
            LaunchCommand::Args(args) => join_command(args),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LaunchCommand::Shell(command) => parse_command(command).is_empty(),
            LaunchCommand::Args(args) => args.is_empty(),
        }
    }
}

/// One window of the desired tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationLaunchConfig {
    pub cmd: LaunchCommand,
    #[serde(rename = "match")]
    pub matcher: WindowMatchExpression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    #[serde(default, skip_serializing_if = "no")]
    pub focus: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    pub layout: LayoutKind,
    pub children: Vec<LayoutNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutNode {
    Leaf(ApplicationLaunchConfig),
    Container(ContainerConfig),
}

impl LayoutNode {
    pub fn percent(&self) -> Option<u8> {
        match self {
            LayoutNode::Leaf(leaf) => leaf.percent,
            LayoutNode::Container(container) => container.percent,
        }
    }

    pub fn set_percent(&mut self, percent: Option<u8>) {
        match self {
            LayoutNode::Leaf(leaf) => leaf.percent = percent,
            LayoutNode::Container(container) => container.percent = percent,
        }
    }

    pub fn assigned_marks(&self) -> &[Mark] {
        match self {
            LayoutNode::Leaf(leaf) => assigned_marks(&leaf.mark, &leaf.marks),
            LayoutNode::Container(container) => assigned_marks(&container.mark, &container.marks),
        }
    }

    pub fn children(&self) -> &[LayoutNode] {
        match self {
            LayoutNode::Leaf(_) => &[],
            LayoutNode::Container(container) => &container.children,
        }
    }
}

fn assigned_marks<'a>(mark: &'a Option<Mark>, marks: &'a Option<Vec<Mark>>) -> &'a [Mark] {
    match (mark, marks) {
        (Some(mark), _) => std::slice::from_ref(mark),
        (None, Some(marks)) => marks,
        (None, None) => &[],
    }
}

/// Splits marks into the `mark`/`marks` pair used by documents: a single mark
/// is written as `mark`, anything else as `marks`.
pub fn mark_fields(marks: Vec<Mark>) -> (Option<Mark>, Option<Vec<Mark>>) {
    match marks.as_slice() {
        [] => (None, None),
        [mark] => (Some(*mark), None),
        _ => (None, Some(marks)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputSelector {
    One(String),
    Many(Vec<String>),
}

impl OutputSelector {
    /// Output names in order of preference.
    pub fn candidates(&self) -> &[String] {
        match self {
            OutputSelector::One(name) => std::slice::from_ref(name),
            OutputSelector::Many(names) => names,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSelector>,
    pub children: Vec<LayoutNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_workspace: Option<WorkspaceLayout>,
    #[serde(default)]
    pub workspaces: BTreeMap<String, WorkspaceLayout>,
}

impl Layout {
    pub fn parse(buf: &str) -> anyhow::Result<Layout> {
        serde_yaml::from_str(buf).context("Could not parse layout document")
    }

    /// Reads and validates a layout document.
    pub fn read(path: &Path, relocation_mark: Mark) -> anyhow::Result<Layout> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read layout file {}", path.display()))?;
        let layout =
            Self::parse(&buf).with_context(|| format!("Invalid layout file {}", path.display()))?;
        let issues = layout.validate(relocation_mark);
        if !issues.is_empty() {
            bail!("Invalid layout file {}:\n  {}", path.display(), issues.join("\n  "));
        }
        Ok(layout)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> { Ok(serde_yaml::to_string(self)?) }

    /// Validates the document and returns a list of issues found.
    pub fn validate(&self, relocation_mark: Mark) -> Vec<String> {
        let mut validator = Validator {
            relocation_mark,
            seen_marks: HashSet::default(),
            issues: Vec::new(),
        };

        if let Some(workspace) = &self.focused_workspace {
            validator.workspace("focused_workspace", workspace);
        }
        for (name, workspace) in &self.workspaces {
            validator.workspace(&format!("workspaces.{name}"), workspace);
        }

        validator.issues
    }
}

struct Validator {
    relocation_mark: Mark,
    seen_marks: HashSet<Mark>,
    issues: Vec<String>,
}

impl Validator {
    fn workspace(&mut self, path: &str, workspace: &WorkspaceLayout) {
        if workspace.children.is_empty() {
            self.issues.push(format!("{path}: workspace has no children"));
        }

        let mut focused = 0;
        for (i, child) in workspace.children.iter().enumerate() {
            focused += self.node(&format!("{path}.children[{i}]"), child);
        }
        if focused > 1 {
            self.issues.push(format!("{path}: {focused} windows request focus, at most one may"));
        }
    }

    /// Returns the number of leaves below `node` that request focus.
    fn node(&mut self, path: &str, node: &LayoutNode) -> usize {
        match node {
            LayoutNode::Leaf(leaf) => {
                self.marks(path, &leaf.mark, &leaf.marks);
                self.percent(path, leaf.percent);
                if let LaunchCommand::Shell(command) = &leaf.cmd {
                    if parse_command(command).is_empty() {
                        self.issues.push(format!("{path}: cmd does not name a program"));
                    }
                }
                usize::from(leaf.focus)
            }
            LayoutNode::Container(container) => {
                self.marks(path, &container.mark, &container.marks);
                self.percent(path, container.percent);
                if container.children.is_empty() {
                    self.issues.push(format!("{path}: container has no children"));
                }
                container
                    .children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| self.node(&format!("{path}.children[{i}]"), child))
                    .sum()
            }
        }
    }

    fn marks(&mut self, path: &str, mark: &Option<Mark>, marks: &Option<Vec<Mark>>) {
        if mark.is_some() && marks.is_some() {
            self.issues.push(format!("{path}: `mark` and `marks` are mutually exclusive"));
        }
        for mark in mark.iter().chain(marks.iter().flatten()) {
            if *mark == self.relocation_mark {
                self.issues.push(format!("{path}: mark `{mark}` is reserved for relocating containers"));
            } else if !self.seen_marks.insert(*mark) {
                self.issues.push(format!("{path}: mark `{mark}` is used more than once"));
            }
        }
    }

    fn percent(&mut self, path: &str, percent: Option<u8>) {
        if let Some(percent) = percent.filter(|p| *p > 100) {
            self.issues.push(format!("{path}: percent must be at most 100, got {percent}"));
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Mark borrowed while moving containers into place. It must not be in use
    /// when a layout is applied.
    #[serde(default = "default_relocation_mark")]
    pub relocation_mark: Mark,
    #[serde(default)]
    pub launch: LaunchSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LaunchSettings {
    #[serde(default = "default_launch_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            relocation_mark: default_relocation_mark(),
            launch: LaunchSettings::default(),
        }
    }
}

impl Default for LaunchSettings {
    fn default() -> Self {
        LaunchSettings {
            timeout_ms: default_launch_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl LaunchSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
}

fn default_relocation_mark() -> Mark { Mark('@') }

fn default_launch_timeout_ms() -> u64 { 10_000 }

fn default_poll_interval_ms() -> u64 { 500 }

fn no(value: &bool) -> bool { !*value }

impl Settings {
    pub fn read(path: &Path) -> anyhow::Result<Settings> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Loads settings from `path`, or from the default location when no path is
    /// given. A missing default file yields the default settings.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Settings> {
        let settings = match (path, config_file()) {
            (Some(path), _) => Self::read(path)?,
            (None, Some(default)) if default.exists() => Self::read(&default)?,
            (None, _) => Settings::default(),
        };
        let issues = settings.validate();
        if !issues.is_empty() {
            bail!("Invalid settings:\n  {}", issues.join("\n  "));
        }
        Ok(settings)
    }

    fn parse(buf: &str) -> anyhow::Result<Settings> { Ok(toml::from_str(buf)?) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.launch.poll_interval_ms == 0 {
            issues.push("launch.poll_interval_ms must be positive".to_string());
        }

        if self.launch.timeout_ms < self.launch.poll_interval_ms {
            issues.push(format!(
                "launch.timeout_ms ({}) must not be shorter than launch.poll_interval_ms ({})",
                self.launch.timeout_ms, self.launch.poll_interval_ms
            ));
        }

        issues
    }
}
