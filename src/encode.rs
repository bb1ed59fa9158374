//! Row-text encoding for `LOAD DATA` streams.
//!
//! Values are rendered into the line format the server parses according to
//! the `FIELDS ... ESCAPED BY` clauses of the statement. The synthesized
//! bulk-copy statement always uses tab/newline/backslash, so
//! [`TextFormat::bulk_copy`] is the profile the copy path runs with; the
//! encoder stays parameterized so callers with custom delimiters reuse it.

use crate::error::EncodeError;
use crate::value::{Date, Time, Value};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Delimiter profile of one LOAD DATA line format.
#[derive(Debug, Clone, Copy)]
pub struct TextFormat {
    /// First byte of the field terminator; escaped inside field data.
    pub field_terminator: u8,
    /// First byte of the line terminator; escaped inside field data.
    pub line_terminator: u8,
    /// Optional quotation byte wrapped around text fields.
    pub quote: Option<u8>,
    /// Escape prefix byte.
    pub escape: u8,
}

impl TextFormat {
    /// The fixed profile of the synthesized bulk-copy statement.
    pub const fn bulk_copy() -> Self {
        Self {
            field_terminator: b'\t',
            line_terminator: b'\n',
            quote: None,
            escape: b'\\',
        }
    }
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::bulk_copy()
    }
}

/// Append the row-text form of one tagged value.
pub fn encode_value(
    out: &mut Vec<u8>,
    value: &Value,
    format: &TextFormat,
) -> Result<(), EncodeError> {
    match value {
        Value::Null => {
            out.push(format.escape);
            out.push(b'N');
        }
        Value::SignedInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::UnsignedInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Float(v) => {
            if !v.is_finite() {
                return Err(EncodeError::UnsupportedValue(
                    "non-finite floating point value",
                ));
            }
            out.extend_from_slice(v.to_string().as_bytes());
        }
        Value::Double(v) => {
            if !v.is_finite() {
                return Err(EncodeError::UnsupportedValue(
                    "non-finite floating point value",
                ));
            }
            out.extend_from_slice(v.to_string().as_bytes());
        }
        Value::Decimal(text) => {
            let canonical = text
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'));
            if text.is_empty() || !canonical {
                return Err(EncodeError::UnsupportedValue(
                    "decimal text is not canonical",
                ));
            }
            out.extend_from_slice(text.as_bytes());
        }
        Value::Bool(v) => out.push(if *v { b'1' } else { b'0' }),
        Value::Date(date) => encode_date(out, date),
        Value::Time(time) => encode_time(out, time),
        Value::Datetime(datetime) => {
            encode_date(out, &datetime.date);
            out.push(b' ');
            encode_time(out, &datetime.time);
        }
        Value::Text(text) | Value::EnumValue(text) => {
            encode_text(out, text.as_bytes(), format);
        }
        Value::Bytes(bytes) => encode_hex(out, bytes),
        Value::Uuid(bytes) => encode_uuid(out, bytes),
    }
    Ok(())
}

/// Append bytes as lowercase hex, the form `UNHEX` reverses on the server.
pub fn encode_hex(out: &mut Vec<u8>, bytes: &[u8]) {
    out.reserve(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize]);
        out.push(HEX_DIGITS[(b & 0x0F) as usize]);
    }
}

fn encode_uuid(out: &mut Vec<u8>, bytes: &[u8; 16]) {
    // canonical 8-4-4-4-12 grouping
    for (i, &b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push(b'-');
        }
        out.push(HEX_DIGITS[(b >> 4) as usize]);
        out.push(HEX_DIGITS[(b & 0x0F) as usize]);
    }
}

fn encode_date(out: &mut Vec<u8>, date: &Date) {
    out.extend_from_slice(
        format!("{:04}-{:02}-{:02}", date.year, date.month, date.day).as_bytes(),
    );
}

fn encode_time(out: &mut Vec<u8>, time: &Time) {
    out.extend_from_slice(format!("{:02}:{:02}:{:02}", time.hour, time.minute, time.second).as_bytes());
    if time.microsecond > 0 {
        out.extend_from_slice(format!(".{:06}", time.microsecond).as_bytes());
    }
}

fn encode_text(out: &mut Vec<u8>, bytes: &[u8], format: &TextFormat) {
    if let Some(quote) = format.quote {
        out.push(quote);
    }
    for &b in bytes {
        if b == 0 {
            // NUL must become escape + '0'; a raw NUL would terminate the field
            out.push(format.escape);
            out.push(b'0');
        } else if b == format.escape
            || Some(b) == format.quote
            || b == b'\n'
            || b == b'\r'
            || b == b'\t'
            || b == format.field_terminator
            || b == format.line_terminator
        {
            out.push(format.escape);
            out.push(b);
        } else {
            out.push(b);
        }
    }
    if let Some(quote) = format.quote {
        out.push(quote);
    }
}
