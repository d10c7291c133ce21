use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

pub type Pid = nix::libc::pid_t;

pub struct ProcessInfo {
    pub command_line: Vec<String>,
}

impl ProcessInfo {
    fn for_pid_in(proc_root: &Path, pid: Pid) -> io::Result<Self> {
        let raw = std::fs::read(proc_root.join(pid.to_string()).join("cmdline"))?;
        Ok(Self {
            command_line: split_cmdline(&raw),
        })
    }
}

/// `cmdline` holds NUL-terminated arguments.
fn split_cmdline(raw: &[u8]) -> Vec<String> {
    let raw = raw.strip_suffix(b"\0").unwrap_or(raw);
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|b| *b == 0).map(|arg| String::from_utf8_lossy(arg).into_owned()).collect()
}

/// Recovers the command line a window's process was started with.
pub trait CommandLineLookup {
    fn command_line(&self, pid: Pid) -> Option<Vec<String>>;
}

/// Reads command lines from procfs.
pub struct ProcCommandLine {
    proc_root: PathBuf,
}

impl Default for ProcCommandLine {
    fn default() -> Self {
        ProcCommandLine {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl ProcCommandLine {
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        ProcCommandLine {
            proc_root: proc_root.into(),
        }
    }
}

impl CommandLineLookup for ProcCommandLine {
    fn command_line(&self, pid: Pid) -> Option<Vec<String>> {
        match ProcessInfo::for_pid_in(&self.proc_root, pid) {
            Ok(info) if !info.command_line.is_empty() => Some(info.command_line),
            // Kernel threads and zombies have an empty cmdline.
            Ok(_) => {
                warn!(pid, "Process has an empty command line");
                None
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(pid, "Process is gone");
                None
            }
            Err(e) => {
                error!(pid, "Could not read command line: {e}");
                None
            }
        }
    }
}
