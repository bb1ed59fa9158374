//! Bulk ingestion for MySQL and MariaDB.
//!
//! Two cooperating paths insert large volumes of rows without per-row
//! statement overhead:
//!
//! - [`BulkLoader`] drives `LOAD DATA [LOCAL] INFILE`, streaming a local
//!   file or an arbitrary byte stream to the server when `LOCAL` is set.
//! - [`BulkCopy`] writes every row of a [`RowSource`] to a destination
//!   table by synthesizing an equivalent `LOAD DATA LOCAL INFILE` exchange,
//!   with column mapping, per-value escaping, and progress notifications.
//!
//! Both borrow an already-connected session (the [`sync::Session`] /
//! [`tokio::Session`] seam); connection establishment, authentication, and
//! ordinary query execution live outside this crate.

pub mod constant;
mod copy;
mod deadline;
mod encode;
pub mod error;
mod loader;
pub mod protocol;
mod source;
mod value;

pub use copy::{BulkCopy, BulkCopyColumnMapping, RowsCopiedEvent};
pub use encode::{TextFormat, encode_value};
pub use loader::{BulkLoader, ConflictOption, LoadPriority};
pub use source::{AsyncRowSource, IterSource, MemoryTable, RowFields, RowSource, SourceColumn};
pub use value::{Date, Datetime, Time, Value};

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;

#[cfg(test)]
mod encode_test;
