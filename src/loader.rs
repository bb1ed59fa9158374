//! `LOAD DATA [LOCAL] INFILE` front-end.

use std::time::Duration;

use smart_default::SmartDefault;

use crate::constant::CapabilityFlags;
use crate::error::{Error, Result};

/// Placeholder source name sent in the statement when loading from a stream.
/// The server echoes it back in the LOCAL INFILE request; it is never opened.
pub(crate) const STREAM_SOURCE_NAME: &str = "stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPriority {
    #[default]
    None,
    LowPriority,
    Concurrent,
}

/// What the server does with rows that collide with existing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictOption {
    #[default]
    None,
    Ignore,
    Replace,
}

/// Drives a `LOAD DATA [LOCAL] INFILE` statement.
///
/// The struct is plain configuration; a load borrows the session for the
/// duration of the call and snapshots the options when it starts.
///
/// ```no_run
/// # use mysql_bulk::BulkLoader;
/// let mut loader = BulkLoader::new("measurements");
/// loader.file_name = Some("/data/batch.tsv".to_string());
/// loader.number_of_lines_to_skip = 1;
/// ```
#[derive(Debug, Clone, SmartDefault)]
pub struct BulkLoader {
    /// Path of the source file. Client-side when `local`, server-side otherwise.
    pub file_name: Option<String>,
    /// Destination table. Required.
    pub table_name: String,
    /// Optional `CHARACTER SET` clause.
    pub character_set: Option<String>,
    /// Whether the client streams the file (`LOAD DATA LOCAL INFILE`).
    #[default(true)]
    pub local: bool,
    pub priority: LoadPriority,
    pub conflict: ConflictOption,
    #[default(vec![b'\t'])]
    pub field_terminator: Vec<u8>,
    #[default(vec![b'\n'])]
    pub line_terminator: Vec<u8>,
    pub field_quotation_character: Option<u8>,
    pub field_quotation_optional: bool,
    #[default(Some(b'\\'))]
    pub escape_character: Option<u8>,
    /// `LINES STARTING BY` prefix.
    pub lines_prefix: Option<String>,
    pub number_of_lines_to_skip: u32,
    /// Target column references; names, or user variables starting with `@`.
    pub columns: Vec<String>,
    /// `SET col = expr` assignments, passed through verbatim.
    pub expressions: Vec<String>,
    /// End-to-end bound on the whole load.
    pub timeout: Option<Duration>,
}

impl BulkLoader {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(Error::BadConfigError("table name is required".to_string()));
        }
        if self.field_terminator.is_empty() || self.line_terminator.is_empty() {
            return Err(Error::BadConfigError(
                "field and line terminators must not be empty".to_string(),
            ));
        }
        if !self.field_terminator.is_ascii() || !self.line_terminator.is_ascii() {
            return Err(Error::BadConfigError(
                "field and line terminators must be ASCII".to_string(),
            ));
        }
        if let Some(charset) = &self.character_set
            && !charset
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(Error::BadConfigError(format!(
                "invalid character set name: {charset:?}"
            )));
        }
        if self.columns.iter().any(|c| c.is_empty()) {
            return Err(Error::BadConfigError(
                "column references must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Compose the statement for the given source name.
    pub(crate) fn statement(&self, source_name: &str) -> String {
        let mut sql = String::from("LOAD DATA");
        match self.priority {
            LoadPriority::None => {}
            LoadPriority::LowPriority => sql.push_str(" LOW_PRIORITY"),
            LoadPriority::Concurrent => sql.push_str(" CONCURRENT"),
        }
        if self.local {
            sql.push_str(" LOCAL");
        }
        sql.push_str(" INFILE '");
        push_escaped_str(&mut sql, source_name);
        sql.push('\'');
        match self.conflict {
            ConflictOption::None => {}
            ConflictOption::Ignore => sql.push_str(" IGNORE"),
            ConflictOption::Replace => sql.push_str(" REPLACE"),
        }
        sql.push_str(" INTO TABLE ");
        push_identifier(&mut sql, &self.table_name);
        if let Some(charset) = &self.character_set {
            sql.push_str(" CHARACTER SET ");
            sql.push_str(charset);
        }
        sql.push_str(" FIELDS TERMINATED BY '");
        push_escaped_bytes(&mut sql, &self.field_terminator);
        sql.push('\'');
        if let Some(quote) = self.field_quotation_character {
            if self.field_quotation_optional {
                sql.push_str(" OPTIONALLY");
            }
            sql.push_str(" ENCLOSED BY '");
            push_escaped_bytes(&mut sql, &[quote]);
            sql.push('\'');
        }
        if let Some(escape) = self.escape_character {
            sql.push_str(" ESCAPED BY '");
            push_escaped_bytes(&mut sql, &[escape]);
            sql.push('\'');
        }
        sql.push_str(" LINES");
        if let Some(prefix) = &self.lines_prefix {
            sql.push_str(" STARTING BY '");
            push_escaped_str(&mut sql, prefix);
            sql.push('\'');
        }
        sql.push_str(" TERMINATED BY '");
        push_escaped_bytes(&mut sql, &self.line_terminator);
        sql.push('\'');
        if self.number_of_lines_to_skip > 0 {
            sql.push_str(&format!(" IGNORE {} LINES", self.number_of_lines_to_skip));
        }
        if !self.columns.is_empty() {
            sql.push_str(" (");
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                if column.starts_with('@') {
                    sql.push_str(column);
                } else {
                    push_identifier(&mut sql, column);
                }
            }
            sql.push(')');
        }
        if !self.expressions.is_empty() {
            sql.push_str(" SET ");
            for (i, expression) in self.expressions.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(expression);
            }
        }
        sql
    }
}

#[cfg(feature = "sync")]
impl BulkLoader {
    /// Execute the load, streaming `file_name` when `local` is set.
    ///
    /// Returns the number of rows the server reports as affected.
    pub fn load<S: crate::sync::Session>(&self, session: &mut S) -> Result<u64> {
        use crate::sync::infile;

        self.validate()?;
        let file = self.file_name.clone().ok_or_else(|| {
            Error::BadConfigError(
                "no file name configured; use load_from_stream for a stream source".to_string(),
            )
        })?;
        let deadline = crate::deadline::Deadline::after(self.timeout);
        let statement = self.statement(&file);

        if !self.local {
            return infile::execute_simple(session, &statement, deadline)
                .map(|ok| ok.affected_rows);
        }

        check_local_capability(session.capabilities())?;
        let ok = match infile::begin(session, &statement, deadline)? {
            infile::InfileBegun::Answered(ok) => ok,
            infile::InfileBegun::Streaming(mut sink) => {
                let fed = infile::feed_file(&file, &mut sink);
                sink.finish(fed)?
            }
        };
        Ok(ok.affected_rows)
    }

    /// Execute the load streaming from an arbitrary byte source.
    /// Only valid with `local = true`.
    pub fn load_from_stream<S, R>(&self, session: &mut S, source: &mut R) -> Result<u64>
    where
        S: crate::sync::Session,
        R: std::io::Read,
    {
        use crate::sync::infile;

        self.validate()?;
        self.validate_stream_source()?;
        check_local_capability(session.capabilities())?;
        let deadline = crate::deadline::Deadline::after(self.timeout);
        let statement = self.statement(STREAM_SOURCE_NAME);

        let ok = match infile::begin(session, &statement, deadline)? {
            infile::InfileBegun::Answered(ok) => ok,
            infile::InfileBegun::Streaming(mut sink) => {
                let fed = infile::feed_reader(source, &mut sink);
                sink.finish(fed)?
            }
        };
        Ok(ok.affected_rows)
    }
}

#[cfg(feature = "tokio")]
impl BulkLoader {
    /// Async form of [`BulkLoader::load`].
    pub async fn load_async<S: crate::tokio::Session>(&self, session: &mut S) -> Result<u64> {
        use crate::tokio::infile;

        self.validate()?;
        let file = self.file_name.clone().ok_or_else(|| {
            Error::BadConfigError(
                "no file name configured; use load_from_stream_async for a stream source"
                    .to_string(),
            )
        })?;
        let deadline = crate::deadline::Deadline::after(self.timeout);
        let statement = self.statement(&file);

        if !self.local {
            return infile::execute_simple(session, &statement, deadline)
                .await
                .map(|ok| ok.affected_rows);
        }

        check_local_capability(session.capabilities())?;
        let ok = match infile::begin(session, &statement, deadline).await? {
            infile::InfileBegun::Answered(ok) => ok,
            infile::InfileBegun::Streaming(mut sink) => {
                let fed = infile::feed_file(&file, &mut sink).await;
                sink.finish(fed).await?
            }
        };
        Ok(ok.affected_rows)
    }

    /// Async form of [`BulkLoader::load_from_stream`].
    pub async fn load_from_stream_async<S, R>(&self, session: &mut S, source: &mut R) -> Result<u64>
    where
        S: crate::tokio::Session,
        R: tokio::io::AsyncRead + Unpin,
    {
        use crate::tokio::infile;

        self.validate()?;
        self.validate_stream_source()?;
        check_local_capability(session.capabilities())?;
        let deadline = crate::deadline::Deadline::after(self.timeout);
        let statement = self.statement(STREAM_SOURCE_NAME);

        let ok = match infile::begin(session, &statement, deadline).await? {
            infile::InfileBegun::Answered(ok) => ok,
            infile::InfileBegun::Streaming(mut sink) => {
                let fed = infile::feed_reader(source, &mut sink).await;
                sink.finish(fed).await?
            }
        };
        Ok(ok.affected_rows)
    }
}

impl BulkLoader {
    fn validate_stream_source(&self) -> Result<()> {
        if !self.local {
            return Err(Error::BadConfigError(
                "a stream source requires local = true".to_string(),
            ));
        }
        if self.file_name.is_some() {
            return Err(Error::BadConfigError(
                "both a file name and a stream source are configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fail before sending a LOCAL statement the session would reject.
pub(crate) fn check_local_capability(capabilities: CapabilityFlags) -> Result<()> {
    if capabilities.contains(CapabilityFlags::CLIENT_LOCAL_FILES) {
        Ok(())
    } else {
        Err(Error::BadConfigError(
            "the session does not permit LOAD DATA LOCAL INFILE".to_string(),
        ))
    }
}

/// Append a backtick-quoted identifier, doubling embedded backticks.
pub(crate) fn push_identifier(out: &mut String, name: &str) {
    out.push('`');
    for c in name.chars() {
        if c == '`' {
            out.push('`');
        }
        out.push(c);
    }
    out.push('`');
}

/// Append string-literal content with MySQL escapes.
pub(crate) fn push_escaped_str(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            '\x1a' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
}

/// Append ASCII delimiter bytes as string-literal content.
pub(crate) fn push_escaped_bytes(out: &mut String, bytes: &[u8]) {
    for &b in bytes {
        push_escaped_str(out, (b as char).encode_utf8(&mut [0; 4]));
    }
}
