//! Discord IPC client.
//!
//! Speaks the local RPC protocol over Discord's `discord-ipc-N` pipe:
//! handshake once, then `SET_ACTIVITY` commands tagged with a nonce. Writes
//! are blocking; responses are read non-blocking during `run_callbacks` and
//! matched back to their callbacks by nonce, so a tick never waits on
//! Discord.
//!
//! A broken connection is dropped, its pending callbacks are failed, and the
//! next command reconnects. A command Discord never answers is failed after
//! [`PENDING_TICK_LIMIT`] ticks.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::thread;
use std::time::{Duration, Instant};

use presence_core::{ActivityResult, PresenceClient, PresenceError, ResultCallback};
use presence_protocol::{
    decode_frame, encode_frame, parse_close, parse_response, Command, Frame, Handshake, Opcode,
    PresenceActivity,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ipc_pipe::{candidate_paths, IpcPipe};

const HANDSHAKE_TIMEOUT_MS: u64 = 5000;
const HANDSHAKE_POLL_MS: u64 = 100;
const READ_CHUNK_SIZE: usize = 4096;
/// Ticks a command may wait for its response before its callback fails.
pub const PENDING_TICK_LIMIT: u64 = 12;

struct Pending {
    callback: ResultCallback,
    sent_at_tick: u64,
}

pub struct DiscordIpcClient<P> {
    application_id: String,
    connection: Option<Connection<P>>,
    pending: HashMap<String, Pending>,
    next_nonce: u64,
    ticks: u64,
}

impl<P: IpcPipe> DiscordIpcClient<P> {
    pub fn connect(application_id: &str) -> Result<Self, PresenceError> {
        let connection = Connection::open(application_id)?;
        Ok(Self::with_connection(application_id, connection))
    }

    fn with_connection(application_id: &str, connection: Connection<P>) -> Self {
        Self {
            application_id: application_id.to_string(),
            connection: Some(connection),
            pending: HashMap::new(),
            next_nonce: 0,
            ticks: 0,
        }
    }

    fn connection(&mut self) -> Result<&mut Connection<P>, PresenceError> {
        if self.connection.is_none() {
            info!("Reconnecting to Discord");
            self.connection = Some(Connection::open(&self.application_id)?);
        }
        self.connection
            .as_mut()
            .ok_or_else(|| PresenceError::ConnectionClosed("not connected".to_string()))
    }

    fn make_nonce(&mut self) -> String {
        self.next_nonce += 1;
        format!("{}-{}", std::process::id(), self.next_nonce)
    }

    fn send_command(
        &mut self,
        command: Command,
        on_result: ResultCallback,
    ) -> Result<(), PresenceError> {
        let nonce = command.nonce.clone();
        let sent = self
            .connection()
            .and_then(|connection| connection.send(Opcode::Frame, &command));
        match sent {
            Ok(()) => {
                self.pending.insert(
                    nonce,
                    Pending {
                        callback: on_result,
                        sent_at_tick: self.ticks,
                    },
                );
                Ok(())
            }
            Err(err) => {
                self.disconnect(&err);
                Err(err)
            }
        }
    }

    /// Handles one inbound frame. Only a close or a failed pong is an error;
    /// both have already dropped the connection.
    fn dispatch(&mut self, frame: Frame) -> Result<(), PresenceError> {
        match frame.opcode {
            Opcode::Frame => {
                self.complete(frame);
                Ok(())
            }
            Opcode::Ping => {
                let pong = self
                    .connection()
                    .and_then(|connection| connection.send(Opcode::Pong, &frame.payload));
                if let Err(err) = pong {
                    self.disconnect(&err);
                    return Err(err);
                }
                Ok(())
            }
            Opcode::Close => {
                let err = PresenceError::ConnectionClosed(parse_close(&frame.payload).to_string());
                self.disconnect(&err);
                Err(err)
            }
            Opcode::Handshake | Opcode::Pong => Ok(()),
        }
    }

    fn complete(&mut self, frame: Frame) {
        let response = match parse_response(frame.payload) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Ignoring malformed Discord response");
                return;
            }
        };
        let Some(nonce) = response.nonce.clone() else {
            debug!(cmd = %response.cmd, evt = ?response.evt, "Ignoring Discord event");
            return;
        };
        let Some(pending) = self.pending.remove(&nonce) else {
            debug!(nonce = %nonce, "Response for unknown nonce");
            return;
        };
        let result = match response.outcome() {
            Ok(()) => ActivityResult::Ok,
            Err(err) => ActivityResult::Failed {
                code: err.code,
                message: err.message,
            },
        };
        (pending.callback)(result);
    }

    fn expire_stale(&mut self) {
        let now = self.ticks;
        let stale: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, pending)| now.saturating_sub(pending.sent_at_tick) > PENDING_TICK_LIMIT)
            .map(|(nonce, _)| nonce.clone())
            .collect();

        for nonce in stale {
            if let Some(pending) = self.pending.remove(&nonce) {
                warn!(nonce = %nonce, "Discord never answered command");
                (pending.callback)(ActivityResult::Failed {
                    code: "timed_out".to_string(),
                    message: format!("no response within {} ticks", PENDING_TICK_LIMIT),
                });
            }
        }
    }

    /// Drops the connection and fails every callback still waiting on it.
    fn disconnect(&mut self, reason: &PresenceError) {
        if self.connection.take().is_some() {
            warn!(error = %reason, "Discord connection lost");
        }
        for (_, pending) in self.pending.drain() {
            (pending.callback)(ActivityResult::Failed {
                code: "connection_closed".to_string(),
                message: reason.to_string(),
            });
        }
    }
}

impl<P: IpcPipe> PresenceClient for DiscordIpcClient<P> {
    fn run_callbacks(&mut self) -> Result<(), PresenceError> {
        self.ticks += 1;
        let Some(connection) = self.connection.as_mut() else {
            return Ok(());
        };

        let (frames, read_status) = connection.drain_available();
        for frame in frames {
            self.dispatch(frame)?;
        }
        if let Err(err) = read_status {
            self.disconnect(&err);
            return Err(err);
        }

        self.expire_stale();
        Ok(())
    }

    fn update_activity(
        &mut self,
        activity: &PresenceActivity,
        on_result: ResultCallback,
    ) -> Result<(), PresenceError> {
        activity.validate()?;
        let nonce = self.make_nonce();
        let command = Command::set_activity(std::process::id(), activity.clone(), nonce);
        self.send_command(command, on_result)
    }

    fn clear_activity(&mut self, on_result: ResultCallback) -> Result<(), PresenceError> {
        let nonce = self.make_nonce();
        let command = Command::clear_activity(std::process::id(), nonce);
        self.send_command(command, on_result)
    }
}

struct Connection<P> {
    pipe: P,
    buffer: Vec<u8>,
}

impl<P: IpcPipe> Connection<P> {
    /// Tries every candidate pipe until one completes the handshake.
    fn open(application_id: &str) -> Result<Self, PresenceError> {
        let mut last_error = None;
        for path in candidate_paths() {
            let pipe = match P::open(&path) {
                Ok(pipe) => pipe,
                Err(_) => continue,
            };
            debug!(path = %path.display(), "Connected to Discord IPC pipe");

            let mut connection = Connection::new(pipe);
            match connection.handshake(application_id) {
                Ok(()) => return Ok(connection),
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "Discord handshake failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            PresenceError::Client("no Discord IPC pipe found".to_string())
        }))
    }

    fn new(pipe: P) -> Self {
        Self {
            pipe,
            buffer: Vec::new(),
        }
    }

    fn handshake(&mut self, application_id: &str) -> Result<(), PresenceError> {
        self.send(Opcode::Handshake, &Handshake::new(application_id))?;

        let deadline = Instant::now() + Duration::from_millis(HANDSHAKE_TIMEOUT_MS);
        loop {
            while let Some(frame) = self.take_frame()? {
                match frame.opcode {
                    Opcode::Frame => {
                        let response = parse_response(frame.payload)?;
                        if response.is_ready() {
                            return Ok(());
                        }
                        response.outcome()?;
                    }
                    Opcode::Close => {
                        return Err(PresenceError::ConnectionClosed(
                            parse_close(&frame.payload).to_string(),
                        ));
                    }
                    Opcode::Ping => self.send(Opcode::Pong, &frame.payload)?,
                    Opcode::Handshake | Opcode::Pong => {}
                }
            }

            if Instant::now() >= deadline {
                return Err(PresenceError::Client(
                    "timed out waiting for Discord READY".to_string(),
                ));
            }
            if self.fill()? == 0 {
                thread::sleep(Duration::from_millis(HANDSHAKE_POLL_MS));
            }
        }
    }

    fn send<T: Serialize>(&mut self, opcode: Opcode, payload: &T) -> Result<(), PresenceError> {
        let bytes = encode_frame(opcode, payload)?;
        self.pipe
            .write_all(&bytes)
            .and_then(|()| self.pipe.flush())
            .map_err(|err| match err.kind() {
                ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
                    PresenceError::ConnectionClosed(err.to_string())
                }
                _ => PresenceError::io("write IPC frame", err),
            })
    }

    /// Reads once into the buffer. Returns the number of bytes read; zero
    /// means nothing was available yet.
    fn fill(&mut self) -> Result<usize, PresenceError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match self.pipe.read_available(&mut chunk) {
            Ok(0) => Err(PresenceError::ConnectionClosed(
                "Discord closed the IPC pipe".to_string(),
            )),
            Ok(n) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(0)
            }
            Err(err) if matches!(err.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset) => {
                Err(PresenceError::ConnectionClosed(err.to_string()))
            }
            Err(err) => Err(PresenceError::io("read IPC frame", err)),
        }
    }

    /// A framing error leaves the stream position unknown, so it is reported
    /// as an error rather than skipped.
    fn take_frame(&mut self) -> Result<Option<Frame>, PresenceError> {
        match decode_frame(&self.buffer)? {
            Some((frame, consumed)) => {
                self.buffer.drain(..consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Collects every complete frame that has already arrived, without
    /// blocking. Frames read before a failure are still returned alongside
    /// it.
    fn drain_available(&mut self) -> (Vec<Frame>, Result<(), PresenceError>) {
        let mut status = Ok(());
        loop {
            match self.fill() {
                Ok(0) => break,
                Ok(_) => continue,
                Err(err) => {
                    status = Err(err);
                    break;
                }
            }
        }

        let mut frames = Vec::new();
        loop {
            match self.take_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(err) => {
                    if status.is_ok() {
                        status = Err(err);
                    }
                    break;
                }
            }
        }
        (frames, status)
    }
}
