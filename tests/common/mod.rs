//! Scripted session for driving the bulk paths without a server.
#![allow(dead_code)]

use std::collections::VecDeque;

use mysql_bulk::constant::{CapabilityFlags, ColumnType};
use mysql_bulk::error::{Error, Result};

/// Records everything the bulk paths send and answers from a script of
/// pre-built server payloads.
pub struct MockSession {
    pub replies: VecDeque<(u8, Vec<u8>)>,
    pub commands: Vec<Vec<u8>>,
    pub frames: Vec<(u8, Vec<u8>)>,
    pub flushes: usize,
    pub capabilities: CapabilityFlags,
    pub max_allowed_packet: u64,
}

impl MockSession {
    pub fn new() -> Self {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();
        Self {
            replies: VecDeque::new(),
            commands: Vec::new(),
            frames: Vec::new(),
            flushes: 0,
            capabilities: CapabilityFlags::CLIENT_PROTOCOL_41
                | CapabilityFlags::CLIENT_LOCAL_FILES
                | CapabilityFlags::CLIENT_DEPRECATE_EOF,
            max_allowed_packet: 64 * 1024 * 1024,
        }
    }

    pub fn without_local_capability(mut self) -> Self {
        self.capabilities.remove(CapabilityFlags::CLIENT_LOCAL_FILES);
        self
    }

    pub fn with_max_allowed_packet(mut self, bound: u64) -> Self {
        self.max_allowed_packet = bound;
        self
    }

    pub fn push_reply(&mut self, sequence_id: u8, payload: Vec<u8>) {
        self.replies.push_back((sequence_id, payload));
    }

    /// SQL text of the n-th command sent (COM_QUERY byte stripped).
    pub fn command_text(&self, index: usize) -> &str {
        assert_eq!(self.commands[index][0], 0x03, "expected COM_QUERY");
        std::str::from_utf8(&self.commands[index][1..]).unwrap()
    }

    /// Concatenated payloads of all non-empty data frames.
    pub fn streamed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (_, frame) in &self.frames {
            out.extend_from_slice(frame);
        }
        out
    }

    fn pop_reply(&mut self, buffer: &mut Vec<u8>) -> Result<u8> {
        match self.replies.pop_front() {
            Some((sequence_id, payload)) => {
                buffer.clear();
                buffer.extend_from_slice(&payload);
                Ok(sequence_id)
            }
            None => Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "script exhausted",
            ))),
        }
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl mysql_bulk::sync::Session for MockSession {
    fn send_command(&mut self, payload: &[u8]) -> Result<()> {
        self.commands.push(payload.to_vec());
        Ok(())
    }

    fn send_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()> {
        self.frames.push((sequence_id, payload.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn receive_packet(&mut self, buffer: &mut Vec<u8>) -> Result<u8> {
        self.pop_reply(buffer)
    }

    fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    fn max_allowed_packet(&self) -> u64 {
        self.max_allowed_packet
    }

    fn in_transaction(&self) -> bool {
        false
    }
}

impl mysql_bulk::tokio::Session for MockSession {
    async fn send_command(&mut self, payload: &[u8]) -> Result<()> {
        mysql_bulk::sync::Session::send_command(self, payload)
    }

    async fn send_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()> {
        mysql_bulk::sync::Session::send_frame(self, sequence_id, payload)
    }

    async fn flush(&mut self) -> Result<()> {
        mysql_bulk::sync::Session::flush(self)
    }

    async fn receive_packet(&mut self, buffer: &mut Vec<u8>) -> Result<u8> {
        self.pop_reply(buffer)
    }

    fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    fn max_allowed_packet(&self) -> u64 {
        self.max_allowed_packet
    }

    fn in_transaction(&self) -> bool {
        false
    }
}

// ─── server payload builders ─────────────────────────────────────────────

fn push_lenenc_small(out: &mut Vec<u8>, value: u64) {
    assert!(value < 251, "test payloads only use one-byte lenenc");
    out.push(value as u8);
}

fn push_lenenc_str(out: &mut Vec<u8>, text: &str) {
    push_lenenc_small(out, text.len() as u64);
    out.extend_from_slice(text.as_bytes());
}

/// OK packet with the given affected-row count.
pub fn ok_packet(affected_rows: u64) -> Vec<u8> {
    let mut out = vec![0x00];
    push_lenenc_small(&mut out, affected_rows);
    push_lenenc_small(&mut out, 0); // last_insert_id
    out.extend_from_slice(&0x0002u16.to_le_bytes()); // autocommit
    out.extend_from_slice(&0u16.to_le_bytes()); // warnings
    out
}

/// OK packet with the 0xFE header that terminates a result set under
/// CLIENT_DEPRECATE_EOF.
pub fn eof_ok_packet() -> Vec<u8> {
    let mut out = ok_packet(0);
    out[0] = 0xFE;
    out
}

pub fn err_packet(error_code: u16, message: &str) -> Vec<u8> {
    let mut out = vec![0xFF];
    out.extend_from_slice(&error_code.to_le_bytes());
    out.push(b'#');
    out.extend_from_slice(b"HY000");
    out.extend_from_slice(message.as_bytes());
    out
}

pub fn local_infile_request(filename: &str) -> Vec<u8> {
    let mut out = vec![0xFB];
    out.extend_from_slice(filename.as_bytes());
    out
}

/// Column definition packet for the schema probe.
pub fn column_definition(
    name: &str,
    column_type: ColumnType,
    charset: u16,
    flags: u16,
) -> Vec<u8> {
    let mut out = Vec::new();
    push_lenenc_str(&mut out, "def");
    push_lenenc_str(&mut out, "test"); // schema
    push_lenenc_str(&mut out, "t"); // table alias
    push_lenenc_str(&mut out, "t"); // table
    push_lenenc_str(&mut out, name); // name alias
    push_lenenc_str(&mut out, name); // name
    push_lenenc_small(&mut out, 0x0C);
    out.extend_from_slice(&charset.to_le_bytes());
    out.extend_from_slice(&255u32.to_le_bytes()); // column_length
    out.push(column_type as u8);
    out.extend_from_slice(&flags.to_le_bytes());
    out.push(0); // decimals
    out.extend_from_slice(&0u16.to_le_bytes()); // reserved
    out
}

/// Queue the reply sequence of a `SELECT * FROM t LIMIT 0` schema probe.
pub fn push_schema_replies(session: &mut MockSession, columns: &[(&str, ColumnType, u16, u16)]) {
    let mut seq = 1u8;
    session.push_reply(seq, vec![columns.len() as u8]);
    for (name, column_type, charset, flags) in columns {
        seq = seq.wrapping_add(1);
        session.push_reply(seq, column_definition(name, *column_type, *charset, *flags));
    }
    session.push_reply(seq.wrapping_add(1), eof_ok_packet());
}

/// Charset ids used by the scripted schemas.
pub const UTF8MB4: u16 = 45;
pub const BINARY: u16 = 63;
