// MIT License - Copyright (c) 2026 Peter Wright

//! Low-level connection to the bridge's telnet port.
//!
//! One [`Connection`] owns the socket, the login handshake and the read
//! buffer. Reads are serialized by the read-side lock, writes by the
//! write-side lock; the handshake holds both, write lock first. That
//! acquisition order is fixed: the read-dispatch loop only ever takes the
//! read lock, so taking the write lock first during open can never deadlock
//! against it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex as StdMutex;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{LipError, Result};
use crate::protocol::{self, Frame};

const READ_CHUNK: usize = 1024;

const PROMPT_LOGIN: &[u8] = b"login: ";
const PROMPT_PASSWORD: &[u8] = b"password: ";
const PROMPT_READY: &[u8] = b"GNET> ";

/// Connection lifecycle state.
///
/// Transitions are `Closed -> Opening -> Opened -> Closed` (on disconnect)
/// or `Opening -> Closed` (on a failed connect or handshake). Only one
/// opening pass can be in flight at a time: the handshake runs with both
/// locks held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Closed = 0,
    Opening = 1,
    Opened = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Opening,
            2 => Self::Opened,
            _ => Self::Closed,
        }
    }
}

/// Credentials captured at first open and reused verbatim on reconnect.
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    host: String,
    port: u16,
    username: Vec<u8>,
    password: Vec<u8>,
}

/// Result of one [`Connection::read_frame`] call.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A decoded notification frame.
    Frame(Frame),
    /// The connection is not open; nothing was read.
    NotConnected,
    /// The peer closed the connection; state has been reset to Closed.
    Disconnected,
}

struct ReadState {
    half: Option<OwnedReadHalf>,
    buffer: Vec<u8>,
    scanned: usize,
}

struct WriteState {
    half: Option<OwnedWriteHalf>,
}

/// Owns the socket, read buffer and the two connection locks.
pub struct Connection {
    state: AtomicU8,
    reader: Mutex<ReadState>,
    writer: Mutex<WriteState>,
    credentials: StdMutex<Option<Credentials>>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Closed as u8),
            reader: Mutex::new(ReadState {
                half: None,
                buffer: Vec::new(),
                scanned: 0,
            }),
            writer: Mutex::new(WriteState { half: None }),
            credentials: StdMutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the connection is open and authenticated.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Opened
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Open a telnet connection to the bridge and run the login handshake.
    ///
    /// Idempotent: returns immediately when the state is not Closed. The
    /// state check happens before the locks are taken so a redundant open
    /// never waits behind a read in progress.
    pub async fn open(&self, host: &str, port: u16, username: &[u8], password: &[u8]) -> Result<()> {
        if self.state() != ConnectionState::Closed {
            return Ok(());
        }

        let mut writer = self.writer.lock().await;
        let mut reader = self.reader.lock().await;
        if self.state() != ConnectionState::Closed {
            return Ok(());
        }
        self.set_state(ConnectionState::Opening);

        *self.credentials.lock().unwrap() = Some(Credentials {
            host: host.to_string(),
            port,
            username: username.to_vec(),
            password: password.to_vec(),
        });

        let stream = match TcpStream::connect((host, port)).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Error opening connection to bridge {}:{}: {}", host, port, e);
                self.set_state(ConnectionState::Closed);
                return Err(LipError::Io(e));
            }
        };

        let (read_half, write_half) = stream.into_split();
        reader.half = Some(read_half);
        reader.buffer.clear();
        reader.scanned = 0;
        writer.half = Some(write_half);

        match handshake(&mut reader, &mut writer, username, password).await {
            Ok(()) => {
                self.set_state(ConnectionState::Opened);
                info!("Connected to bridge {}:{}", host, port);
                Ok(())
            }
            Err(e) => {
                warn!("Login handshake with bridge {} failed: {}", host, e);
                reader.half = None;
                reader.buffer.clear();
                reader.scanned = 0;
                writer.half = None;
                self.set_state(ConnectionState::Closed);
                Err(e)
            }
        }
    }

    /// Reopen using the credentials stored by the first open.
    pub async fn reopen(&self) -> Result<()> {
        let credentials = self
            .credentials
            .lock()
            .unwrap()
            .clone()
            .ok_or(LipError::NotOpen)?;
        self.open(
            &credentials.host,
            credentials.port,
            &credentials.username,
            &credentials.password,
        )
        .await
    }

    /// Read the next notification frame.
    ///
    /// Holds the read lock for the duration of the call. Lines that do not
    /// decode as frames (prompt echoes, malformed numerics) are consumed
    /// and skipped; the call only returns once a frame decodes, the peer
    /// disconnects, or the connection turns out not to be open.
    pub async fn read_frame(&self) -> ReadOutcome {
        let mut guard = self.reader.lock().await;
        if self.state() != ConnectionState::Opened {
            return ReadOutcome::NotConnected;
        }
        let reader = &mut *guard;

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = protocol::scan_frame(&mut reader.buffer, &mut reader.scanned) {
                return ReadOutcome::Frame(frame);
            }
            let half = match reader.half.as_mut() {
                Some(half) => half,
                None => return ReadOutcome::Disconnected,
            };
            match half.read(&mut chunk).await {
                Ok(0) => {
                    debug!("Empty read from bridge (clean disconnect)");
                    break;
                }
                Ok(n) => reader.buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    warn!("Error reading from bridge: {}", e);
                    break;
                }
            }
        }

        reader.half = None;
        reader.buffer.clear();
        reader.scanned = 0;
        self.set_state(ConnectionState::Closed);
        ReadOutcome::Disconnected
    }

    /// Write one line, terminated with CRLF, and flush.
    ///
    /// Holds the write lock for the duration. A no-op when the connection
    /// is not open; a write failure is logged and swallowed, as the protocol
    /// has no acknowledgement to retry against.
    pub async fn write_line(&self, line: &[u8]) {
        let mut writer = self.writer.lock().await;
        if self.state() != ConnectionState::Opened {
            return;
        }
        if let Err(e) = write_crlf_line(&mut writer, line).await {
            warn!("Error writing to bridge: {}", e);
        }
    }

    /// Close the socket and reset to Closed.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let mut reader = self.reader.lock().await;
        self.set_state(ConnectionState::Closed);
        reader.half = None;
        reader.buffer.clear();
        reader.scanned = 0;
        writer.half = None;
    }
}

/// Run the three-prompt login exchange. The caller holds both locks.
async fn handshake(
    reader: &mut ReadState,
    writer: &mut WriteState,
    username: &[u8],
    password: &[u8],
) -> Result<()> {
    read_until(reader, PROMPT_LOGIN).await?;
    write_crlf_line(writer, username).await?;
    read_until(reader, PROMPT_PASSWORD).await?;
    write_crlf_line(writer, password).await?;
    read_until(reader, PROMPT_READY).await?;
    Ok(())
}

/// Read until `needle` appears in the buffer, then consume through it.
async fn read_until(reader: &mut ReadState, needle: &[u8]) -> Result<()> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if let Some(pos) = find(&reader.buffer, needle) {
            reader.buffer.drain(..pos + needle.len());
            reader.scanned = 0;
            return Ok(());
        }
        let half = reader.half.as_mut().ok_or(LipError::Disconnected)?;
        match half.read(&mut chunk).await {
            Ok(0) => return Err(LipError::Disconnected),
            Ok(n) => reader.buffer.extend_from_slice(&chunk[..n]),
            Err(e) => return Err(LipError::Io(e)),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn write_crlf_line(writer: &mut WriteState, line: &[u8]) -> Result<()> {
    let half = writer.half.as_mut().ok_or(LipError::Disconnected)?;
    half.write_all(line).await?;
    half.write_all(b"\r\n").await?;
    half.flush().await?;
    Ok(())
}
