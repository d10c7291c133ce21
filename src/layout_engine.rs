pub mod capture;
pub mod commands;
pub mod compare;
pub mod engine;
mod error;
pub(crate) mod graph;
pub mod launch;
pub mod matching;
pub mod ratio;
pub mod reconcile;

pub use engine::{LayoutEngine, ResolvedWorkspace, WorkspaceCheck, resolve_workspaces};
pub use error::LayoutError;
pub use graph::{LayoutKind, Orientation};
