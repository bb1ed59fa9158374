//! Blocking driver for the LOCAL INFILE exchange.
//!
//! After the statement is sent the server either answers directly (OK/ERR)
//! or requests the file with a `0xFB` packet. From there the client streams
//! data frames, terminates with an empty frame even when nothing was sent,
//! and reads the final OK/ERR. Failures on the client side complete the
//! exchange first so the session returns to command-ready state.

use tracing::instrument;

use super::Session;
use crate::constant::CapabilityFlags;
use crate::copy::DestinationColumn;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::loader::push_identifier;
use crate::protocol::command::query::{QueryResponse, read_query_response, write_query};
use crate::protocol::command::{ColumnDefinition, ColumnDefinitionBytes};
use crate::protocol::packet::FrameChunker;
use crate::protocol::response::{OkPayload, check_resultset_terminator, read_ok_or_err};

/// Outcome of sending the statement.
pub(crate) enum InfileBegun<'a, S: Session> {
    /// The server answered without requesting data (unusual but legal).
    Answered(OkPayload),
    /// The server asked for the file; stream through the sink.
    Streaming(InfileSink<'a, S>),
}

/// Send the statement and wait for the server's request.
#[instrument(skip_all)]
pub(crate) fn begin<'a, S: Session>(
    session: &'a mut S,
    statement: &str,
    deadline: Deadline,
) -> Result<InfileBegun<'a, S>> {
    deadline.check()?;
    tracing::debug!(
        in_transaction = session.in_transaction(),
        "sending LOAD DATA statement"
    );

    let mut payload = Vec::with_capacity(statement.len() + 1);
    write_query(&mut payload, statement);
    session.send_command(&payload)?;

    let mut buf = Vec::new();
    let seq = session.receive_packet(&mut buf)?;
    match read_query_response(&buf)? {
        QueryResponse::Ok(ok) => Ok(InfileBegun::Answered(OkPayload::try_from(ok)?)),
        // the echoed filename is advisory; stream whatever source was configured
        QueryResponse::LocalInfileRequest(_request) => Ok(InfileBegun::Streaming(InfileSink {
            session,
            chunker: FrameChunker::new(seq.wrapping_add(1)),
            deadline,
        })),
        QueryResponse::ResultSet { .. } => Err(Error::InvalidPacket),
    }
}

/// Streams file bytes to the server as framed packets.
pub(crate) struct InfileSink<'a, S: Session> {
    session: &'a mut S,
    chunker: FrameChunker,
    deadline: Deadline,
}

impl<S: Session> InfileSink<'_, S> {
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.deadline.check()?;
        self.chunker.extend(data);
        while self.chunker.has_full_frame() {
            let seq = self.chunker.sequence_id();
            self.session.send_frame(seq, self.chunker.full_frame())?;
            self.chunker.advance_full_frame();
        }
        Ok(())
    }

    /// Complete the exchange and read the final reply.
    ///
    /// Buffered bytes are flushed first, or discarded when the feed failed so
    /// the server never sees a torn row. The empty end-of-transfer frame is
    /// always sent, and the final reply is always drained; only then does a
    /// feed failure take precedence over the server's answer.
    #[instrument(skip_all)]
    pub fn finish(mut self, fed: Result<()>) -> Result<OkPayload> {
        if fed.is_err() {
            self.chunker.discard_pending();
        }
        if !self.chunker.pending().is_empty() {
            let seq = self.chunker.sequence_id();
            self.session.send_frame(seq, self.chunker.pending())?;
            self.chunker.consume_pending();
        }
        let seq = self.chunker.sequence_id();
        self.session.send_frame(seq, &[])?;
        self.session.flush()?;

        let mut buf = Vec::new();
        self.session.receive_packet(&mut buf)?;
        let reply = read_ok_or_err(&buf);
        fed?;
        reply
    }
}

/// Execute a statement that expects a plain OK/ERR answer
/// (`LOAD DATA` without LOCAL).
pub(crate) fn execute_simple<S: Session>(
    session: &mut S,
    statement: &str,
    deadline: Deadline,
) -> Result<OkPayload> {
    deadline.check()?;

    let mut payload = Vec::with_capacity(statement.len() + 1);
    write_query(&mut payload, statement);
    session.send_command(&payload)?;

    let mut buf = Vec::new();
    session.receive_packet(&mut buf)?;
    match read_query_response(&buf)? {
        QueryResponse::Ok(ok) => OkPayload::try_from(ok),
        QueryResponse::ResultSet { .. } | QueryResponse::LocalInfileRequest(_) => {
            Err(Error::InvalidPacket)
        }
    }
}

/// Probe the destination with `SELECT * FROM t LIMIT 0` and collect its
/// column metadata.
#[instrument(skip_all)]
pub(crate) fn fetch_destination_schema<S: Session>(
    session: &mut S,
    table: &str,
    deadline: Deadline,
) -> Result<Vec<DestinationColumn>> {
    deadline.check()?;

    let mut sql = String::from("SELECT * FROM ");
    push_identifier(&mut sql, table);
    sql.push_str(" LIMIT 0");

    let mut payload = Vec::with_capacity(sql.len() + 1);
    write_query(&mut payload, &sql);
    session.send_command(&payload)?;

    let mut buf = Vec::new();
    session.receive_packet(&mut buf)?;
    let column_count = match read_query_response(&buf)? {
        QueryResponse::ResultSet { column_count } => column_count as usize,
        QueryResponse::Ok(_) | QueryResponse::LocalInfileRequest(_) => {
            return Err(Error::InvalidPacket);
        }
    };

    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        session.receive_packet(&mut buf)?;
        let definition = ColumnDefinition::try_from(ColumnDefinitionBytes(&buf))?;
        let name = simdutf8::basic::from_utf8(definition.name_alias)
            .map_err(|_| Error::InvalidPacket)?
            .to_string();
        columns.push(DestinationColumn {
            name,
            column_type: definition.tail.column_type()?,
            flags: definition.tail.flags()?,
            charset: definition.tail.charset(),
        });
    }

    if !session
        .capabilities()
        .contains(CapabilityFlags::CLIENT_DEPRECATE_EOF)
    {
        // EOF between the column definitions and the (empty) row stream
        session.receive_packet(&mut buf)?;
        check_resultset_terminator(&buf)?;
    }
    session.receive_packet(&mut buf)?;
    check_resultset_terminator(&buf)?;

    Ok(columns)
}

/// Stream a client-side file. The path is opened only now, after the server
/// requested data, so a missing file still completes the exchange cleanly.
pub(crate) fn feed_file<S: Session>(path: &str, sink: &mut InfileSink<'_, S>) -> Result<()> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.to_string(),
        },
        _ => Error::IoError(e),
    })?;
    feed_reader(&mut file, sink)
}

pub(crate) fn feed_reader<S: Session, R: std::io::Read>(
    reader: &mut R,
    sink: &mut InfileSink<'_, S>,
) -> Result<()> {
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        sink.write(&chunk[..n])?;
    }
}
