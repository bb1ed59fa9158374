use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::MAX_PAYLOAD_LENGTH;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }
}

/// Build a packet header as a stack-allocated array
#[inline]
pub fn write_packet_header_array(sequence_id: u8, payload_length: usize) -> [u8; 4] {
    let len = (payload_length as u32).to_le_bytes();
    [len[0], len[1], len[2], sequence_id]
}


/// Assemble a command payload into framed packets starting at sequence id 0,
/// splitting into 16MB chunks with a trailing empty packet when the length is
/// an exact multiple.
pub(crate) fn build_command_packets(out: &mut Vec<u8>, payload: &[u8]) {
    out.clear();

    let mut sequence_id = 0_u8;
    let mut remaining = payload;
    loop {
        let chunk_size = remaining.len().min(MAX_PAYLOAD_LENGTH);
        let (chunk, rest) = remaining.split_at(chunk_size);
        out.extend_from_slice(&write_packet_header_array(sequence_id, chunk_size));
        out.extend_from_slice(chunk);
        sequence_id = sequence_id.wrapping_add(1);
        remaining = rest;

        if remaining.is_empty() {
            // an exact-multiple payload needs an empty terminator packet
            if chunk_size == MAX_PAYLOAD_LENGTH {
                out.extend_from_slice(&write_packet_header_array(sequence_id, 0));
            }
            return;
        }
    }
}

/// Splits an outgoing byte stream into wire frames of at most
/// [`MAX_PAYLOAD_LENGTH`] bytes, tracking the sequence id across frames.
///
/// Callers feed bytes with [`FrameChunker::extend`], drain full frames as
/// they become available, and flush the remainder when the stream ends. The
/// empty end-of-transfer frame is the caller's responsibility (the LOCAL
/// INFILE drivers always send it, even for an empty stream).
#[derive(Debug)]
pub struct FrameChunker {
    buf: Vec<u8>,
    sequence_id: u8,
    total_bytes: u64,
}

impl FrameChunker {
    pub fn new(sequence_id: u8) -> Self {
        Self {
            buf: Vec::new(),
            sequence_id,
            total_bytes: 0,
        }
    }

    /// Append stream bytes to the frame buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.total_bytes += data.len() as u64;
    }

    /// Sequence id of the next frame to send.
    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }

    /// Total number of stream bytes accepted so far.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn has_full_frame(&self) -> bool {
        self.buf.len() >= MAX_PAYLOAD_LENGTH
    }

    /// The next max-sized frame payload. Only valid while
    /// [`FrameChunker::has_full_frame`] returns true.
    pub fn full_frame(&self) -> &[u8] {
        &self.buf[..MAX_PAYLOAD_LENGTH]
    }

    /// Drop a sent full frame and bump the sequence id.
    pub fn advance_full_frame(&mut self) {
        self.buf.drain(..MAX_PAYLOAD_LENGTH);
        self.sequence_id = self.sequence_id.wrapping_add(1);
    }

    /// Bytes below the frame boundary, flushed as the last data frame.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Drop the sent partial frame and bump the sequence id.
    pub fn consume_pending(&mut self) {
        self.buf.clear();
        self.sequence_id = self.sequence_id.wrapping_add(1);
    }

    /// Throw away unsent bytes without advancing the sequence id.
    ///
    /// Used when the stream failed mid-row: only the end-of-transfer frame
    /// follows, so the server never sees a torn row.
    pub fn discard_pending(&mut self) {
        let dropped = self.buf.len() as u64;
        self.buf.clear();
        self.total_bytes -= dropped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn command_packets_small_payload() {
        let mut out = Vec::new();
        build_command_packets(&mut out, b"abc");
        assert_eq!(&out[..4], &[3, 0, 0, 0]);
        assert_eq!(&out[4..], b"abc");
    }

    #[test]
    fn command_packets_exact_multiple_gets_empty_terminator() {
        let payload = vec![7u8; MAX_PAYLOAD_LENGTH];
        let mut out = Vec::new();
        build_command_packets(&mut out, &payload);
        assert_eq!(out.len(), 4 + MAX_PAYLOAD_LENGTH + 4);
        assert_eq!(&out[..4], &[0xFF, 0xFF, 0xFF, 0]);
        let trailer = &out[4 + MAX_PAYLOAD_LENGTH..];
        assert_eq!(trailer, &[0, 0, 0, 1]);
    }

    #[test]
    fn header_length_round_trip() {
        let header = PacketHeader::encode(0xFF_FFFF, 3);
        assert_eq!(header.length(), 0xFF_FFFF);
        assert_eq!(header.sequence_id, 3);

        let raw = write_packet_header_array(7, 5);
        assert_eq!(raw, [5, 0, 0, 7]);
    }

    #[test]
    fn chunker_splits_at_the_frame_boundary() {
        let mut chunker = FrameChunker::new(2);
        let data = vec![0xAB; MAX_PAYLOAD_LENGTH + 10];
        chunker.extend(&data);

        assert!(chunker.has_full_frame());
        assert_eq!(chunker.full_frame().len(), MAX_PAYLOAD_LENGTH);
        assert_eq!(chunker.sequence_id(), 2);

        chunker.advance_full_frame();
        assert!(!chunker.has_full_frame());
        assert_eq!(chunker.pending(), &[0xAB; 10]);
        assert_eq!(chunker.sequence_id(), 3);

        chunker.consume_pending();
        assert!(chunker.pending().is_empty());
        assert_eq!(chunker.sequence_id(), 4);
        assert_eq!(chunker.total_bytes(), (MAX_PAYLOAD_LENGTH + 10) as u64);
    }

    #[test]
    fn chunker_exact_multiple_leaves_no_partial() {
        let mut chunker = FrameChunker::new(0);
        let data = vec![1; MAX_PAYLOAD_LENGTH];
        chunker.extend(&data);
        assert!(chunker.has_full_frame());
        chunker.advance_full_frame();
        assert!(chunker.pending().is_empty());
    }

    #[test]
    fn discard_keeps_sequence_id() {
        let mut chunker = FrameChunker::new(9);
        chunker.extend(b"half a row");
        chunker.discard_pending();
        assert!(chunker.pending().is_empty());
        assert_eq!(chunker.sequence_id(), 9);
        assert_eq!(chunker.total_bytes(), 0);
    }
}
