//! Async front-end on the tokio runtime: the session seam and a stream
//! adapter. Mirrors the blocking front-end.

pub mod infile;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::constant::{CapabilityFlags, DEFAULT_MAX_ALLOWED_PACKET, MAX_PAYLOAD_LENGTH};
use crate::error::{Error, Result};
use crate::protocol::packet::{build_command_packets, write_packet_header_array};

/// A connected, authenticated, command-ready MySQL session (async).
///
/// See [`crate::sync::Session`] for the contract; only the suspension points
/// differ.
#[allow(async_fn_in_trait)]
pub trait Session {
    /// Send a command payload as packet(s) starting at sequence id 0,
    /// splitting at the 16 MiB boundary.
    async fn send_command(&mut self, payload: &[u8]) -> Result<()>;

    /// Send one pre-framed packet with an explicit sequence id.
    async fn send_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;

    /// Read the next packet payload into `buffer`, reassembling payloads
    /// that span multiple packets. Returns the last packet's sequence id.
    async fn receive_packet(&mut self, buffer: &mut Vec<u8>) -> Result<u8>;

    fn capabilities(&self) -> CapabilityFlags;

    fn max_allowed_packet(&self) -> u64;

    fn in_transaction(&self) -> bool;
}

/// [`Session`] over any connected async byte stream.
pub struct StreamSession<S: AsyncRead + AsyncWrite + Unpin> {
    stream: BufReader<S>,
    /// Reusable buffer for assembling complete packets with headers
    packet_buf: Vec<u8>,
    capabilities: CapabilityFlags,
    max_allowed_packet: u64,
    in_transaction: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> StreamSession<S> {
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

impl<S: AsyncRead + AsyncWrite + Unpin> Session for StreamSession<S> {
    async fn send_command(&mut self, payload: &[u8]) -> Result<()> {
        build_command_packets(&mut self.packet_buf, payload);
        self.stream.get_mut().write_all(&self.packet_buf).await?;
        self.stream.get_mut().flush().await?;
        Ok(())
    }

    async fn send_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()> {
        debug_assert!(payload.len() <= MAX_PAYLOAD_LENGTH);
        let header = write_packet_header_array(sequence_id, payload.len());
        self.stream.get_mut().write_all(&header).await?;
        self.stream.get_mut().write_all(payload).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.stream.get_mut().flush().await?;
        Ok(())
    }

    async fn receive_packet(&mut self, buffer: &mut Vec<u8>) -> Result<u8> {
        read_payload(&mut self.stream, buffer).await
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

/// Read a complete MySQL payload asynchronously, concatenating packets if
/// they span multiple 16MB chunks. Returns the last packet's sequence id.
pub(crate) async fn read_payload<R: AsyncRead + Unpin>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> Result<u8> {
    buffer.clear();

    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await.map_err(Error::IoError)?;

    let length = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut sequence_id = header[3];

    buffer.resize(length, 0);
    reader.read_exact(buffer).await.map_err(Error::IoError)?;

    let mut current_length = length;
    while current_length == MAX_PAYLOAD_LENGTH {
        reader.read_exact(&mut header).await.map_err(Error::IoError)?;

        current_length = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
        sequence_id = header[3];

        let prev_len = buffer.len();
        buffer.resize(prev_len + current_length, 0);
        reader
            .read_exact(&mut buffer[prev_len..])
            .await
            .map_err(Error::IoError)?;
    }

    Ok(sequence_id)
}
