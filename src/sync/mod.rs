//! Blocking front-end: the session seam and a stream adapter.

pub mod infile;

use std::io::{BufReader, Read, Write};

use crate::constant::{CapabilityFlags, DEFAULT_MAX_ALLOWED_PACKET, MAX_PAYLOAD_LENGTH};
use crate::error::{Error, Result};
use crate::protocol::packet::{build_command_packets, write_packet_header_array};

/// A connected, authenticated, command-ready MySQL session.
///
/// The bulk paths borrow the session exclusively for one operation; the wire
/// protocol is half-duplex, so concurrent operations on one session are the
/// caller's responsibility to serialize.
pub trait Session {
    /// Send a command payload as packet(s) starting at sequence id 0,
    /// splitting at the 16 MiB boundary.
    fn send_command(&mut self, payload: &[u8]) -> Result<()>;

    /// Send one pre-framed packet with an explicit sequence id.
    fn send_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Read the next packet payload into `buffer`, reassembling payloads
    /// that span multiple packets. Returns the last packet's sequence id.
    fn receive_packet(&mut self, buffer: &mut Vec<u8>) -> Result<u8>;

    /// Capabilities negotiated for this session.
    fn capabilities(&self) -> CapabilityFlags;

    /// The server-advertised `max_allowed_packet` bound.
    fn max_allowed_packet(&self) -> u64;

    /// Whether a transaction is currently open on this session.
    fn in_transaction(&self) -> bool;
}

/// [`Session`] over any connected byte stream.
///
/// The caller is responsible for the handshake and authentication; this
/// adapter only frames packets.
pub struct StreamSession<S: Read + Write> {
    stream: BufReader<S>,
    /// Reusable buffer for assembling complete packets with headers
    packet_buf: Vec<u8>,
    capabilities: CapabilityFlags,
    max_allowed_packet: u64,
    in_transaction: bool,
}

impl<S: Read + Write> StreamSession<S> {
    pub fn new(stream: S, capabilities: CapabilityFlags) -> Self {
        Self {
            stream: BufReader::new(stream),
            packet_buf: Vec::new(),
            capabilities,
            max_allowed_packet: DEFAULT_MAX_ALLOWED_PACKET,
            in_transaction: false,
        }
    }

    /// Override the assumed `max_allowed_packet` with the server's value.
    pub fn with_max_allowed_packet(mut self, bound: u64) -> Self {
        self.max_allowed_packet = bound;
        self
    }

    pub fn set_in_transaction(&mut self, in_transaction: bool) {
        self.in_transaction = in_transaction;
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

impl<S: Read + Write> Session for StreamSession<S> {
    fn send_command(&mut self, payload: &[u8]) -> Result<()> {
        build_command_packets(&mut self.packet_buf, payload);
        self.stream.get_mut().write_all(&self.packet_buf)?;
        self.stream.get_mut().flush()?;
        Ok(())
    }

    fn send_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()> {
        debug_assert!(payload.len() <= MAX_PAYLOAD_LENGTH);
        let header = write_packet_header_array(sequence_id, payload.len());
        self.stream.get_mut().write_all(&header)?;
        self.stream.get_mut().write_all(payload)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.get_mut().flush()?;
        Ok(())
    }

    fn receive_packet(&mut self, buffer: &mut Vec<u8>) -> Result<u8> {
        read_payload(&mut self.stream, buffer)
    }

    fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    fn max_allowed_packet(&self) -> u64 {
        self.max_allowed_packet
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

/// Read a complete MySQL payload, concatenating packets if they span
/// multiple 16MB chunks. Returns the sequence id of the last packet read.
pub(crate) fn read_payload<R: Read>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header = [0u8; 4];
    reader.read_exact(&mut header).map_err(Error::IoError)?;

    let length = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut sequence_id = header[3];

    buffer.resize(length, 0);
    reader.read_exact(buffer).map_err(Error::IoError)?;

    let mut current_length = length;
    while current_length == MAX_PAYLOAD_LENGTH {
        reader.read_exact(&mut header).map_err(Error::IoError)?;

        current_length = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
        sequence_id = header[3];

        let prev_len = buffer.len();
        buffer.resize(prev_len + current_length, 0);
        reader
            .read_exact(&mut buffer[prev_len..])
            .map_err(Error::IoError)?;
    }

    Ok(sequence_id)
}
