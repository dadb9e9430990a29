//! Discord IPC wire types for the Unity presence daemon.
//!
//! The daemon talks to the locally running Discord client over its IPC
//! socket. Every message is a frame: a little-endian `u32` opcode, a
//! little-endian `u32` payload length, then that many bytes of JSON. Only the
//! subset the daemon needs is modelled here: the handshake, `SET_ACTIVITY`,
//! close frames and ping/pong keepalives.
//!
//! Keeping these types in their own crate lets tests build real frames
//! without pulling in the daemon.

mod activity;

pub use activity::{
    truncate_text, ActivityAssets, ActivityButton, ActivityTimestamps, PresenceActivity,
    MAX_TEXT_CHARS,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const RPC_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 8;
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Handshake,
    Frame,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn as_u32(self) -> u32 {
        match self {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = ErrorInfo;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            other => Err(ErrorInfo::new(
                "invalid_opcode",
                format!("unknown frame opcode {}", other),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorInfo {}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Value,
}

pub fn encode_frame<T: Serialize>(opcode: Opcode, payload: &T) -> Result<Vec<u8>, ErrorInfo> {
    let body = serde_json::to_vec(payload).map_err(|err| {
        ErrorInfo::new(
            "serialization_error",
            format!("failed to serialize frame payload: {}", err),
        )
    })?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(frame_too_large(body.len()));
    }

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&opcode.as_u32().to_le_bytes());
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decodes the frame at the front of `buffer`.
///
/// Returns `Ok(None)` while the buffer holds less than one complete frame.
/// On success the second element is the number of bytes consumed.
pub fn decode_frame(buffer: &[u8]) -> Result<Option<(Frame, usize)>, ErrorInfo> {
    if buffer.len() < HEADER_LEN {
        return Ok(None);
    }

    let raw_opcode = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
    let length = u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]) as usize;
    if length > MAX_FRAME_BYTES {
        return Err(frame_too_large(length));
    }
    let opcode = Opcode::try_from(raw_opcode)?;

    let end = HEADER_LEN + length;
    if buffer.len() < end {
        return Ok(None);
    }

    let payload = if length == 0 {
        Value::Null
    } else {
        serde_json::from_slice(&buffer[HEADER_LEN..end]).map_err(|err| {
            ErrorInfo::new(
                "invalid_json",
                format!("frame payload was not valid JSON: {}", err),
            )
        })?
    };

    Ok(Some((Frame { opcode, payload }, end)))
}

fn frame_too_large(length: usize) -> ErrorInfo {
    ErrorInfo::new(
        "frame_too_large",
        format!(
            "frame payload of {} bytes exceeds {} byte limit",
            length, MAX_FRAME_BYTES
        ),
    )
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    pub v: u32,
    pub client_id: String,
}

impl Handshake {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            v: RPC_VERSION,
            client_id: client_id.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    SetActivity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetActivityArgs {
    pub pid: u32,
    /// `None` serializes as `null`, which clears the activity.
    pub activity: Option<PresenceActivity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Command {
    pub cmd: CommandKind,
    pub args: SetActivityArgs,
    pub nonce: String,
}

impl Command {
    pub fn set_activity(pid: u32, activity: PresenceActivity, nonce: impl Into<String>) -> Self {
        Self {
            cmd: CommandKind::SetActivity,
            args: SetActivityArgs {
                pid,
                activity: Some(activity),
            },
            nonce: nonce.into(),
        }
    }

    pub fn clear_activity(pid: u32, nonce: impl Into<String>) -> Self {
        Self {
            cmd: CommandKind::SetActivity,
            args: SetActivityArgs {
                pid,
                activity: None,
            },
            nonce: nonce.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub cmd: String,
    #[serde(default)]
    pub evt: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Response {
    pub fn is_ready(&self) -> bool {
        self.cmd == "DISPATCH" && self.evt.as_deref() == Some("READY")
    }

    pub fn outcome(&self) -> Result<(), ErrorInfo> {
        if self.evt.as_deref() == Some("ERROR") {
            return Err(error_from_payload(self.data.as_ref()));
        }
        Ok(())
    }
}

pub fn parse_response(payload: Value) -> Result<Response, ErrorInfo> {
    serde_json::from_value(payload).map_err(|err| {
        ErrorInfo::new(
            "invalid_response",
            format!("response payload is invalid: {}", err),
        )
    })
}

/// Close frames carry `{"code": .., "message": ..}` explaining why Discord
/// hung up.
pub fn parse_close(payload: &Value) -> ErrorInfo {
    error_from_payload(Some(payload))
}

fn error_from_payload(payload: Option<&Value>) -> ErrorInfo {
    let code = payload
        .and_then(|data| data.get("code"))
        .map(|code| match code {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "unknown".to_string());
    let message = payload
        .and_then(|data| data.get("message"))
        .and_then(|message| message.as_str())
        .unwrap_or("no message")
        .to_string();
    ErrorInfo { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_little_endian_header() {
        let bytes = encode_frame(Opcode::Handshake, &Handshake::new("42")).unwrap();
        assert_eq!(&bytes[0..4], &0u32.to_le_bytes());
        let length = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        assert_eq!(length, bytes.len() - HEADER_LEN);

        let body: Value = serde_json::from_slice(&bytes[HEADER_LEN..]).unwrap();
        assert_eq!(body, json!({"v": 1, "client_id": "42"}));
    }

    #[test]
    fn partial_frames_are_incomplete() {
        let bytes = encode_frame(Opcode::Ping, &json!({"n": 1})).unwrap();
        assert_eq!(decode_frame(&bytes[..3]).unwrap(), None);
        assert_eq!(decode_frame(&bytes[..bytes.len() - 1]).unwrap(), None);
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let mut buffer = encode_frame(Opcode::Ping, &json!({"n": 1})).unwrap();
        let first_len = buffer.len();
        buffer.extend(encode_frame(Opcode::Frame, &json!({"cmd": "DISPATCH"})).unwrap());

        let (first, consumed) = decode_frame(&buffer).unwrap().unwrap();
        assert_eq!(first.opcode, Opcode::Ping);
        assert_eq!(consumed, first_len);

        let (second, _) = decode_frame(&buffer[consumed..]).unwrap().unwrap();
        assert_eq!(second.opcode, Opcode::Frame);
        assert_eq!(second.payload, json!({"cmd": "DISPATCH"}));
    }

    #[test]
    fn rejects_oversized_frame_header() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&1u32.to_le_bytes());
        buffer.extend_from_slice(&((MAX_FRAME_BYTES as u32) + 1).to_le_bytes());
        let err = decode_frame(&buffer).unwrap_err();
        assert_eq!(err.code, "frame_too_large");
    }

    #[test]
    fn rejects_unknown_opcode() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&9u32.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());
        let err = decode_frame(&buffer).unwrap_err();
        assert_eq!(err.code, "invalid_opcode");
    }

    #[test]
    fn clear_command_serializes_null_activity() {
        let command = Command::clear_activity(77, "n-1");
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(
            value,
            json!({"cmd": "SET_ACTIVITY", "args": {"pid": 77, "activity": null}, "nonce": "n-1"})
        );
    }

    #[test]
    fn ready_dispatch_is_recognized() {
        let response =
            parse_response(json!({"cmd": "DISPATCH", "evt": "READY", "data": {"v": 1}})).unwrap();
        assert!(response.is_ready());
        assert!(response.outcome().is_ok());
    }

    #[test]
    fn error_event_maps_to_error_info() {
        let response = parse_response(json!({
            "cmd": "SET_ACTIVITY",
            "evt": "ERROR",
            "nonce": "n-2",
            "data": {"code": 4000, "message": "child \"activity\" fails"}
        }))
        .unwrap();
        let err = response.outcome().unwrap_err();
        assert_eq!(err.code, "4000");
        assert!(err.message.contains("activity"));
    }

    #[test]
    fn close_payload_without_fields_is_unknown() {
        let err = parse_close(&Value::Null);
        assert_eq!(err.code, "unknown");
        assert_eq!(err.message, "no message");
    }
}
