//! Declarative workspace layouts for sway and i3.
//!
//! A layout document describes the desired container tree of one or more
//! workspaces. The [`layout_engine`] compares it with the live tree, launches
//! missing applications, and issues the commands that move existing windows
//! into the described shape. The reverse direction captures a live workspace
//! into a new document.

pub mod common;
pub mod ipc;
pub mod layout_engine;
pub mod model;
pub mod sys;
