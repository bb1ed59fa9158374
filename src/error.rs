use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    /// The configured local source file does not exist on the client side.
    ///
    /// A file missing on the *server* side (`local = false`) is reported by
    /// the server itself and surfaces as [`Error::ServerError`].
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("malformed packet from server")]
    InvalidPacket,

    #[error("unexpected end of packet")]
    UnexpectedEof,

    /// A single encoded row does not fit in one protocol packet.
    #[error("row {row_index} exceeds the maximum packet payload: {source}")]
    RowTooLarge {
        row_index: u64,
        source: EncodeError,
    },

    /// A field value could not be rendered for the destination column.
    #[error("cannot encode row {row_index}, column `{column}`: {source}")]
    Encode {
        row_index: u64,
        column: String,
        source: EncodeError,
    },

    #[error("operation timed out")]
    Timeout,

    #[error("A bug in mysql-bulk: {0}")]
    LibraryBug(color_eyre::Report),
}

/// Field-level failures raised while rendering values into row text.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("unsupported value: {0}")]
    UnsupportedValue(&'static str),

    #[error("value cannot be encoded for a {expected:?} column")]
    TypeMismatch {
        expected: crate::constant::ColumnType,
    },
}

impl<'buf> From<ErrPayloadBytes<'buf>> for Error {
    fn from(value: ErrPayloadBytes) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

impl From<core::convert::Infallible> for Error {
    fn from(err: core::convert::Infallible) -> Self {
        match err {}
    }
}

impl<Src, Dst: ?Sized> From<zerocopy::CastError<Src, Dst>> for Error {
    fn from(err: zerocopy::CastError<Src, Dst>) -> Self {
        Self::LibraryBug(color_eyre::eyre::eyre!("{:#?}", err))
    }
}
