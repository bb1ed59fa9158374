//! Row sources consumed by the bulk copy path.
//!
//! A source is a forward-only cursor over rows of tagged values with a
//! declared column layout. [`MemoryTable`] covers the in-memory case;
//! [`IterSource`] adapts any fallible row iterator, which is the shape a
//! protocol row-cursor adapter plugs into.

use core::future::Future;

use auto_impl::auto_impl;

use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Column layout and current-row access shared by sync and async sources.
///
/// The accessors are only meaningful after an `advance` returned `true`.
#[auto_impl(&mut, Box)]
pub trait RowFields {
    fn column_count(&self) -> usize;

    fn column_name(&self, index: usize) -> &str;

    fn column_type(&self, index: usize) -> ColumnType;

    /// Field of the current row by ordinal.
    fn field(&self, index: usize) -> &Value;
}

/// Forward-only cursor over typed rows.
///
/// A source is borrowed for the duration of one bulk copy and never retained.
#[auto_impl(&mut, Box)]
pub trait RowSource: RowFields {
    /// Move to the next row. Returns `false` once the source is exhausted.
    fn advance(&mut self) -> Result<bool>;
}

/// Async counterpart of [`RowSource`] with a suspending `advance`.
///
/// Every synchronous source is trivially usable from the async path.
pub trait AsyncRowSource: RowFields {
    fn advance(&mut self) -> impl Future<Output = Result<bool>>;
}

impl<T: RowSource> AsyncRowSource for T {
    fn advance(&mut self) -> impl Future<Output = Result<bool>> {
        core::future::ready(RowSource::advance(self))
    }
}

/// Declared column of a row source.
#[derive(Debug, Clone)]
pub struct SourceColumn {
    pub name: String,
    pub column_type: ColumnType,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// An in-memory table of typed rows.
#[derive(Debug, Default)]
pub struct MemoryTable {
    columns: Vec<SourceColumn>,
    rows: Vec<Vec<Value>>,
    next_row: usize,
}

impl MemoryTable {
    pub fn new(columns: Vec<SourceColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            next_row: 0,
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::BadConfigError(format!(
                "row has {} fields but the table declares {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl RowFields for MemoryTable {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> &str {
        &self.columns[index].name
    }

    fn column_type(&self, index: usize) -> ColumnType {
        self.columns[index].column_type
    }

    fn field(&self, index: usize) -> &Value {
        &self.rows[self.next_row - 1][index]
    }
}

impl RowSource for MemoryTable {
    fn advance(&mut self) -> Result<bool> {
        if self.next_row < self.rows.len() {
            self.next_row += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Adapts a fallible row iterator into a [`RowSource`].
pub struct IterSource<I> {
    columns: Vec<SourceColumn>,
    iter: I,
    current: Vec<Value>,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Result<Vec<Value>>>,
{
    pub fn new(columns: Vec<SourceColumn>, iter: I) -> Self {
        Self {
            columns,
            iter,
            current: Vec::new(),
        }
    }
}

impl<I> RowFields for IterSource<I>
where
    I: Iterator<Item = Result<Vec<Value>>>,
{
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> &str {
        &self.columns[index].name
    }

    fn column_type(&self, index: usize) -> ColumnType {
        self.columns[index].column_type
    }

    fn field(&self, index: usize) -> &Value {
        &self.current[index]
    }
}

impl<I> RowSource for IterSource<I>
where
    I: Iterator<Item = Result<Vec<Value>>>,
{
    fn advance(&mut self) -> Result<bool> {
        match self.iter.next() {
            Some(row) => {
                let row = row?;
                if row.len() != self.columns.len() {
                    return Err(Error::BadConfigError(format!(
                        "cursor row has {} fields but the source declares {} columns",
                        row.len(),
                        self.columns.len()
                    )));
                }
                self.current = row;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
