//! Row-level bulk copy front-end.
//!
//! `BulkCopy` writes every row of a [`RowSource`](crate::source::RowSource)
//! to a destination table by synthesizing a `LOAD DATA LOCAL INFILE`
//! exchange: destination columns are discovered with a `LIMIT 0` probe, the
//! rows are rendered into an escaped TSV stream on the fly, and binary
//! destination columns round-trip through `UNHEX` of a hex-encoded user
//! variable.

use std::time::Duration;

use crate::constant::{BINARY_CHARSET, ColumnFlags, ColumnType, MAX_PAYLOAD_LENGTH};
use crate::encode::{TextFormat, encode_hex, encode_value};
use crate::error::{EncodeError, Error, Result};
use crate::loader::{push_escaped_str, push_identifier};
use crate::source::RowFields;
use crate::value::Value;

/// Source name echoed by the server in the LOCAL INFILE request; never opened.
const BULK_COPY_SOURCE_NAME: &str = "bulk_copy.csv";

/// Pairs a source column ordinal with a destination column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCopyColumnMapping {
    pub source_ordinal: usize,
    pub destination_column: String,
}

impl BulkCopyColumnMapping {
    pub fn new(source_ordinal: usize, destination_column: impl Into<String>) -> Self {
        Self {
            source_ordinal,
            destination_column: destination_column.into(),
        }
    }
}

/// Progress notification passed to the rows-copied handler.
///
/// Setting `abort` stops the feed after the current row; the exchange still
/// terminates cleanly and the server keeps every row already streamed.
#[derive(Debug)]
pub struct RowsCopiedEvent {
    pub rows_copied: u64,
    pub abort: bool,
}

pub(crate) type RowsCopiedHandler<'h> = Option<Box<dyn FnMut(&mut RowsCopiedEvent) + 'h>>;

/// Copies all rows of a row source into a destination table.
pub struct BulkCopy<'h> {
    pub destination_table_name: String,
    /// End-to-end bound on the whole copy.
    pub bulk_copy_timeout: Option<Duration>,
    /// Invoke the handler every this many rows; 0 disables notifications.
    pub notify_after: u64,
    /// Explicit column mappings; empty means map by ordinal.
    pub column_mappings: Vec<BulkCopyColumnMapping>,
    rows_copied: u64,
    handler: RowsCopiedHandler<'h>,
}

impl std::fmt::Debug for BulkCopy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkCopy")
            .field("destination_table_name", &self.destination_table_name)
            .field("bulk_copy_timeout", &self.bulk_copy_timeout)
            .field("notify_after", &self.notify_after)
            .field("column_mappings", &self.column_mappings)
            .field("rows_copied", &self.rows_copied)
            .finish_non_exhaustive()
    }
}

impl<'h> BulkCopy<'h> {
    pub fn new(destination_table_name: impl Into<String>) -> Self {
        Self {
            destination_table_name: destination_table_name.into(),
            bulk_copy_timeout: None,
            notify_after: 0,
            column_mappings: Vec::new(),
            rows_copied: 0,
            handler: None,
        }
    }

    /// Rows copied by the last call; the server-reported count on success.
    pub fn rows_copied(&self) -> u64 {
        self.rows_copied
    }

    /// Install the progress handler invoked every `notify_after` rows.
    pub fn on_rows_copied(&mut self, handler: impl FnMut(&mut RowsCopiedEvent) + 'h) {
        self.handler = Some(Box::new(handler));
    }

    fn validate(&self) -> Result<()> {
        if self.destination_table_name.is_empty() {
            return Err(Error::BadConfigError(
                "destination table name is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "sync")]
impl<'h> BulkCopy<'h> {
    /// Write every row of `source` to the destination table.
    ///
    /// Returns the number of rows the server reports as affected.
    pub fn write_to_server<S, R>(&mut self, session: &mut S, source: &mut R) -> Result<u64>
    where
        S: crate::sync::Session,
        R: crate::source::RowSource,
    {
        use crate::sync::infile;

        self.validate()?;
        crate::loader::check_local_capability(session.capabilities())?;
        let deadline = crate::deadline::Deadline::after(self.bulk_copy_timeout);
        self.rows_copied = 0;

        let destination =
            infile::fetch_destination_schema(session, &self.destination_table_name, deadline)?;
        let plan = CopyPlan::resolve(&destination, source.column_count(), &self.column_mappings)?;
        let statement = plan.statement(&self.destination_table_name);
        let max_row = max_row_payload(session.max_allowed_packet());

        let notify_after = self.notify_after;
        let handler = &mut self.handler;
        let mut progress = Progress::new(notify_after);

        let ok = match infile::begin(session, &statement, deadline)? {
            infile::InfileBegun::Answered(ok) => ok,
            infile::InfileBegun::Streaming(mut sink) => {
                let fed = feed_rows(&mut sink, source, &plan, max_row, handler, &mut progress);
                sink.finish(fed)?
            }
        };

        progress.finish(handler);
        self.rows_copied = ok.affected_rows;
        Ok(ok.affected_rows)
    }
}

#[cfg(feature = "tokio")]
impl<'h> BulkCopy<'h> {
    /// Async form of [`BulkCopy::write_to_server`].
    pub async fn write_to_server_async<S, R>(
        &mut self,
        session: &mut S,
        source: &mut R,
    ) -> Result<u64>
    where
        S: crate::tokio::Session,
        R: crate::source::AsyncRowSource,
    {
        use crate::tokio::infile;

        self.validate()?;
        crate::loader::check_local_capability(session.capabilities())?;
        let deadline = crate::deadline::Deadline::after(self.bulk_copy_timeout);
        self.rows_copied = 0;

        let destination =
            infile::fetch_destination_schema(session, &self.destination_table_name, deadline)
                .await?;
        let plan = CopyPlan::resolve(&destination, source.column_count(), &self.column_mappings)?;
        let statement = plan.statement(&self.destination_table_name);
        let max_row = max_row_payload(session.max_allowed_packet());

        let notify_after = self.notify_after;
        let handler = &mut self.handler;
        let mut progress = Progress::new(notify_after);

        let ok = match infile::begin(session, &statement, deadline).await? {
            infile::InfileBegun::Answered(ok) => ok,
            infile::InfileBegun::Streaming(mut sink) => {
                let fed =
                    feed_rows_async(&mut sink, source, &plan, max_row, handler, &mut progress)
                        .await;
                sink.finish(fed).await?
            }
        };

        progress.finish(handler);
        self.rows_copied = ok.affected_rows;
        Ok(ok.affected_rows)
    }
}

/// Row counter and notification cadence of one copy call.
struct Progress {
    notify_after: u64,
    sent: u64,
    last_notified: u64,
}

impl Progress {
    fn new(notify_after: u64) -> Self {
        Self {
            notify_after,
            sent: 0,
            last_notified: 0,
        }
    }

    /// Count one sent row; returns `true` when the handler asked to abort.
    fn row_sent(&mut self, handler: &mut RowsCopiedHandler<'_>) -> bool {
        self.sent += 1;
        if self.notify_after > 0 && self.sent % self.notify_after == 0 {
            self.last_notified = self.sent;
            return fire_rows_copied(handler, self.sent);
        }
        false
    }

    /// One trailing notification with the final count, unless that count was
    /// already the last boundary.
    fn finish(&mut self, handler: &mut RowsCopiedHandler<'_>) {
        if self.notify_after > 0 && self.sent > self.last_notified {
            self.last_notified = self.sent;
            fire_rows_copied(handler, self.sent);
        }
    }
}

fn fire_rows_copied(handler: &mut RowsCopiedHandler<'_>, rows_copied: u64) -> bool {
    let mut event = RowsCopiedEvent {
        rows_copied,
        abort: false,
    };
    if let Some(handler) = handler.as_mut() {
        handler(&mut event);
    }
    event.abort
}

#[cfg(feature = "sync")]
fn feed_rows<S, R>(
    sink: &mut crate::sync::infile::InfileSink<'_, S>,
    source: &mut R,
    plan: &CopyPlan,
    max_row: usize,
    handler: &mut RowsCopiedHandler<'_>,
    progress: &mut Progress,
) -> Result<()>
where
    S: crate::sync::Session,
    R: crate::source::RowSource,
{
    let mut row_buf = Vec::new();
    while source.advance()? {
        row_buf.clear();
        encode_plan_row(&mut row_buf, source, plan, max_row, progress.sent)?;
        sink.write(&row_buf)?;
        if progress.row_sent(handler) {
            break;
        }
    }
    Ok(())
}

#[cfg(feature = "tokio")]
async fn feed_rows_async<S, R>(
    sink: &mut crate::tokio::infile::InfileSink<'_, S>,
    source: &mut R,
    plan: &CopyPlan,
    max_row: usize,
    handler: &mut RowsCopiedHandler<'_>,
    progress: &mut Progress,
) -> Result<()>
where
    S: crate::tokio::Session,
    R: crate::source::AsyncRowSource,
{
    let mut row_buf = Vec::new();
    while source.advance().await? {
        row_buf.clear();
        encode_plan_row(&mut row_buf, source, plan, max_row, progress.sent)?;
        sink.write(&row_buf).await?;
        if progress.row_sent(handler) {
            break;
        }
    }
    Ok(())
}

/// A destination column discovered from the `LIMIT 0` probe.
#[derive(Debug, Clone)]
pub(crate) struct DestinationColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub charset: u16,
}

impl DestinationColumn {
    /// Binary destinations receive hex data through `UNHEX(@colN)`.
    pub fn is_binary(&self) -> bool {
        (self.charset == BINARY_CHARSET
            && self.column_type.is_string_family()
            && self.flags.contains(ColumnFlags::BINARY_FLAG))
            || self.column_type == ColumnType::MYSQL_TYPE_GEOMETRY
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CopyEntry {
    pub source_ordinal: usize,
    pub destination: String,
    pub destination_type: ColumnType,
    pub hex: bool,
}

/// Resolved column mapping of one copy call.
#[derive(Debug, Clone)]
pub(crate) struct CopyPlan {
    pub entries: Vec<CopyEntry>,
}

impl CopyPlan {
    pub fn resolve(
        destination: &[DestinationColumn],
        source_columns: usize,
        mappings: &[BulkCopyColumnMapping],
    ) -> Result<Self> {
        let mut entries = Vec::new();

        if mappings.is_empty() {
            // by ordinal over the shorter side; unmapped destination columns
            // keep their SQL defaults
            let count = source_columns.min(destination.len());
            for (ordinal, column) in destination.iter().take(count).enumerate() {
                entries.push(CopyEntry {
                    source_ordinal: ordinal,
                    destination: column.name.clone(),
                    destination_type: column.column_type,
                    hex: column.is_binary(),
                });
            }
        } else {
            for mapping in mappings {
                if mapping.source_ordinal >= source_columns {
                    return Err(Error::BadConfigError(format!(
                        "column count mismatch: mapping references source ordinal {} but the source has {} columns",
                        mapping.source_ordinal, source_columns
                    )));
                }
                let column = destination
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(&mapping.destination_column))
                    .ok_or_else(|| {
                        Error::BadConfigError(format!(
                            "unknown destination column `{}`",
                            mapping.destination_column
                        ))
                    })?;
                if entries
                    .iter()
                    .any(|e: &CopyEntry| e.destination.eq_ignore_ascii_case(&column.name))
                {
                    return Err(Error::BadConfigError(format!(
                        "duplicate destination column `{}` in mapping",
                        column.name
                    )));
                }
                entries.push(CopyEntry {
                    source_ordinal: mapping.source_ordinal,
                    destination: column.name.clone(),
                    destination_type: column.column_type,
                    hex: column.is_binary(),
                });
            }
        }

        if entries.is_empty() {
            return Err(Error::BadConfigError(
                "no columns to copy".to_string(),
            ));
        }
        Ok(Self { entries })
    }

    /// The synthesized `LOAD DATA LOCAL INFILE` statement.
    pub fn statement(&self, table: &str) -> String {
        let mut sql = String::from("LOAD DATA LOCAL INFILE '");
        push_escaped_str(&mut sql, BULK_COPY_SOURCE_NAME);
        sql.push_str("' INTO TABLE ");
        push_identifier(&mut sql, table);
        sql.push_str(
            " CHARACTER SET utf8mb4 FIELDS TERMINATED BY '\\t' ESCAPED BY '\\\\' LINES TERMINATED BY '\\n' (",
        );
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            if entry.hex {
                sql.push_str(&format!("@col{index}"));
            } else {
                push_identifier(&mut sql, &entry.destination);
            }
        }
        sql.push(')');

        let mut first_assignment = true;
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.hex {
                continue;
            }
            sql.push_str(if first_assignment { " SET " } else { ", " });
            first_assignment = false;
            push_identifier(&mut sql, &entry.destination);
            sql.push_str(&format!(" = UNHEX(@col{index})"));
        }
        sql
    }
}

/// Effective cap on one encoded row: a row must fit in a single packet and
/// stay under the server's `max_allowed_packet`.
pub(crate) fn max_row_payload(max_allowed_packet: u64) -> usize {
    (max_allowed_packet.min(MAX_PAYLOAD_LENGTH as u64)) as usize
}

/// Render one mapped row, terminators included, enforcing the row-size cap.
pub(crate) fn encode_plan_row<R: RowFields + ?Sized>(
    out: &mut Vec<u8>,
    source: &R,
    plan: &CopyPlan,
    max_row: usize,
    row_index: u64,
) -> Result<()> {
    const FORMAT: TextFormat = TextFormat::bulk_copy();

    for (index, entry) in plan.entries.iter().enumerate() {
        if index > 0 {
            out.push(FORMAT.field_terminator);
        }
        let value = source.field(entry.source_ordinal);
        if entry.hex {
            match value {
                Value::Null => {
                    out.push(FORMAT.escape);
                    out.push(b'N');
                }
                Value::Bytes(bytes) => encode_hex(out, bytes),
                _ => {
                    return Err(Error::Encode {
                        row_index,
                        column: entry.destination.clone(),
                        source: EncodeError::TypeMismatch {
                            expected: entry.destination_type,
                        },
                    });
                }
            }
        } else if matches!(value, Value::Bytes(_)) {
            // raw bytes only travel hex-encoded; map them to a binary column
            return Err(Error::Encode {
                row_index,
                column: entry.destination.clone(),
                source: EncodeError::TypeMismatch {
                    expected: entry.destination_type,
                },
            });
        } else {
            encode_value(out, value, &FORMAT).map_err(|source| Error::Encode {
                row_index,
                column: entry.destination.clone(),
                source,
            })?;
        }
        if out.len() > max_row {
            return Err(Error::RowTooLarge {
                row_index,
                source: EncodeError::UnsupportedValue(
                    "encoded row exceeds the maximum packet payload",
                ),
            });
        }
    }
    out.push(FORMAT.line_terminator);
    Ok(())
}
