//! Logical values accepted by the bulk ingestion paths.
//!
//! Every field handed to the row encoder carries its logical type, which is
//! enough to pick an encoding without consulting the destination schema.

/// A tagged field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Signed integer (TINYINT, SMALLINT, INT, BIGINT)
    SignedInt(i64),
    /// Unsigned integer (TINYINT UNSIGNED .. BIGINT UNSIGNED)
    UnsignedInt(u64),
    /// FLOAT - 4-byte floating point
    Float(f32),
    /// DOUBLE - 8-byte floating point
    Double(f64),
    /// DECIMAL/NEWDECIMAL in canonical decimal text
    Decimal(String),
    /// BOOL/TINYINT(1)
    Bool(bool),
    /// DATE
    Date(Date),
    /// TIME (time of day)
    Time(Time),
    /// DATETIME/TIMESTAMP, no timezone
    Datetime(Datetime),
    /// Character data (CHAR, VARCHAR, TEXT, JSON)
    Text(String),
    /// Binary data (BINARY, VARBINARY, BLOB); always hex-encoded on the wire
    Bytes(Vec<u8>),
    /// UUID/GUID, rendered in canonical 8-4-4-4-12 lowercase form
    Uuid([u8; 16]),
    /// ENUM/SET member, encoded exactly like text
    EnumValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Fractional seconds; zero means no fraction is written.
    pub microsecond: u32,
}

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
            microsecond: 0,
        }
    }

    pub fn with_microsecond(mut self, microsecond: u32) -> Self {
        self.microsecond = microsecond;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datetime {
    pub date: Date,
    pub time: Time,
}

impl Datetime {
    pub fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::SignedInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::SignedInt(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UnsignedInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UnsignedInt(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Value::Date(v)
    }
}

impl From<Time> for Value {
    fn from(v: Time) -> Self {
        Value::Time(v)
    }
}

impl From<Datetime> for Value {
    fn from(v: Datetime) -> Self {
        Value::Datetime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(feature = "with-uuid")]
impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(*v.as_bytes())
    }
}

#[cfg(feature = "with-chrono")]
impl From<chrono::NaiveDate> for Value {
    fn from(v: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        Value::Date(Date::new(v.year() as u16, v.month() as u8, v.day() as u8))
    }
}

#[cfg(feature = "with-chrono")]
impl From<chrono::NaiveTime> for Value {
    fn from(v: chrono::NaiveTime) -> Self {
        use chrono::Timelike;
        Value::Time(
            Time::new(v.hour() as u8, v.minute() as u8, v.second() as u8)
                .with_microsecond(v.nanosecond() / 1_000),
        )
    }
}

#[cfg(feature = "with-chrono")]
impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        use chrono::{Datelike, Timelike};
        Value::Datetime(Datetime::new(
            Date::new(v.year() as u16, v.month() as u8, v.day() as u8),
            Time::new(v.hour() as u8, v.minute() as u8, v.second() as u8)
                .with_microsecond(v.nanosecond() / 1_000),
        ))
    }
}

#[cfg(feature = "with-rust-decimal")]
impl From<rust_decimal::Decimal> for Value {
    fn from(v: rust_decimal::Decimal) -> Self {
        Value::Decimal(v.to_string())
    }
}
