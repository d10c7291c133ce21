use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::protocol::{MAGIC, MessageType};
use super::{CommandReply, ConId, Connection, IpcError, Node, Output, Workspace, scoped_command};

const HEADER_LEN: usize = MAGIC.len() + 8;

/// Client for the i3-ipc framing spoken by sway and i3.
pub struct SwayConnection {
    stream: UnixStream,
}

impl SwayConnection {
    /// Connects to the socket named by `SWAYSOCK`, falling back to `I3SOCK`.
    pub fn connect() -> Result<Self, IpcError> {
        let path = socket_path().ok_or(IpcError::NoSocketPath)?;
        Self::connect_to(&path)
    }

    pub fn connect_to(path: &Path) -> Result<Self, IpcError> {
        debug!("Connecting to IPC socket {}", path.display());
        Ok(SwayConnection {
            stream: UnixStream::connect(path)?,
        })
    }

    fn request<T: DeserializeOwned>(
        &mut self,
        message_type: MessageType,
        payload: &str,
    ) -> Result<T, IpcError> {
        self.stream.write_all(&encode_message(message_type, payload.as_bytes()))?;

        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header)?;
        let (len, reply_type) = decode_header(&header)?;
        if reply_type != message_type as u32 {
            return Err(IpcError::UnexpectedReply {
                expected: message_type as u32,
                actual: reply_type,
            });
        }

        let mut body = vec![0u8; len as usize];
        self.stream.read_exact(&mut body)?;
        trace!("IPC reply ({:?}): {}", message_type, String::from_utf8_lossy(&body));
        Ok(serde_json::from_slice(&body)?)
    }
}

fn socket_path() -> Option<PathBuf> {
    ["SWAYSOCK", "I3SOCK"]
        .iter()
        .filter_map(std::env::var_os)
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn encode_message(message_type: MessageType, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    buf.extend_from_slice(&(message_type as u32).to_ne_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn decode_header(header: &[u8; HEADER_LEN]) -> Result<(u32, u32), IpcError> {
    let (magic, rest) = header.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(IpcError::BadMagic);
    }
    let len = u32::from_ne_bytes([rest[0], rest[1], rest[2], rest[3]]);
    let reply_type = u32::from_ne_bytes([rest[4], rest[5], rest[6], rest[7]]);
    Ok((len, reply_type))
}

impl Connection for SwayConnection {
    fn get_tree(&mut self) -> Result<Node, IpcError> { self.request(MessageType::GetTree, "") }

    fn get_marks(&mut self) -> Result<Vec<String>, IpcError> {
        self.request(MessageType::GetMarks, "")
    }

    fn get_outputs(&mut self) -> Result<Vec<Output>, IpcError> {
        self.request(MessageType::GetOutputs, "")
    }

    fn get_workspaces(&mut self) -> Result<Vec<Workspace>, IpcError> {
        self.request(MessageType::GetWorkspaces, "")
    }

    fn run_command(
        &mut self,
        target: Option<ConId>,
        command: &str,
    ) -> Result<Vec<CommandReply>, IpcError> {
        let command = scoped_command(target, command);
        debug!("Running command: {}", command);
        self.request(MessageType::RunCommand, &command)
    }
}
