use crate::encode::{TextFormat, encode_value};
use crate::error::EncodeError;
use crate::value::{Date, Datetime, Time, Value};

fn encoded(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_value(&mut out, value, &TextFormat::bulk_copy()).unwrap();
    out
}

/// Undo field-level escaping, the way the server parses field data.
fn unescape(encoded: &[u8], escape: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut bytes = encoded.iter().copied();
    while let Some(b) = bytes.next() {
        if b == escape {
            match bytes.next() {
                Some(b'0') => out.push(0),
                Some(b'n') => out.push(b'\n'),
                Some(other) => out.push(other),
                None => panic!("dangling escape byte"),
            }
        } else {
            out.push(b);
        }
    }
    out
}

#[test]
fn null_is_escaped_n() {
    assert_eq!(encoded(&Value::Null), b"\\N");
}

#[test]
fn integers_are_plain_decimal() {
    assert_eq!(encoded(&Value::SignedInt(-42)), b"-42");
    assert_eq!(encoded(&Value::SignedInt(0)), b"0");
    assert_eq!(encoded(&Value::UnsignedInt(18446744073709551615)), b"18446744073709551615");
    assert_eq!(encoded(&Value::Bool(true)), b"1");
    assert_eq!(encoded(&Value::Bool(false)), b"0");
}

#[test]
fn floats_round_trip_through_shortest_form() {
    let out = encoded(&Value::Double(std::f64::consts::PI));
    let text = std::str::from_utf8(&out).unwrap();
    assert_eq!(text.parse::<f64>().unwrap(), std::f64::consts::PI);

    let out = encoded(&Value::Float(1.25));
    assert_eq!(out, b"1.25");
}

#[test]
fn non_finite_floats_are_rejected() {
    let mut out = Vec::new();
    let err = encode_value(&mut out, &Value::Double(f64::NAN), &TextFormat::bulk_copy())
        .unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedValue(_)));

    let err = encode_value(
        &mut out,
        &Value::Float(f32::INFINITY),
        &TextFormat::bulk_copy(),
    )
    .unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedValue(_)));
}

#[test]
fn decimal_text_passes_through() {
    assert_eq!(encoded(&Value::Decimal("-12345.6789".to_string())), b"-12345.6789");

    let mut out = Vec::new();
    let err = encode_value(
        &mut out,
        &Value::Decimal("12,3".to_string()),
        &TextFormat::bulk_copy(),
    )
    .unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedValue(_)));
}

#[test]
fn temporal_values_use_server_literals() {
    assert_eq!(encoded(&Value::Date(Date::new(2024, 2, 9))), b"2024-02-09");
    assert_eq!(encoded(&Value::Time(Time::new(7, 5, 3))), b"07:05:03");
    assert_eq!(
        encoded(&Value::Time(Time::new(23, 59, 59).with_microsecond(12))),
        b"23:59:59.000012"
    );
    assert_eq!(
        encoded(&Value::Datetime(Datetime::new(
            Date::new(2024, 12, 31),
            Time::new(8, 30, 0),
        ))),
        b"2024-12-31 08:30:00"
    );
}

#[test]
fn text_escapes_specials_and_round_trips() {
    let raw = "a\tb\nc\\d\re\0f";
    let out = encoded(&Value::Text(raw.to_string()));
    assert_eq!(out, b"a\\\tb\\\nc\\\\d\\\re\\0f");
    assert_eq!(unescape(&out, b'\\'), raw.as_bytes());
}

#[test]
fn quoted_text_wraps_and_escapes_the_quote() {
    let format = TextFormat {
        field_terminator: b',',
        line_terminator: b'\n',
        quote: Some(b'\''),
        escape: b'\\',
    };
    let mut out = Vec::new();
    encode_value(&mut out, &Value::Text("it's".to_string()), &format).unwrap();
    assert_eq!(out, b"'it\\'s'");
}

#[test]
fn custom_field_terminator_is_escaped() {
    let format = TextFormat {
        field_terminator: b',',
        line_terminator: b'\n',
        quote: None,
        escape: b'\\',
    };
    let mut out = Vec::new();
    encode_value(&mut out, &Value::Text("a,b".to_string()), &format).unwrap();
    assert_eq!(out, b"a\\,b");
    assert_eq!(unescape(&out, b'\\'), b"a,b");
}

#[test]
fn bytes_are_lowercase_hex() {
    let out = encoded(&Value::Bytes(vec![0x00, 0x1F, 0xAB, 0xFF]));
    assert_eq!(out, b"001fabff");
}

#[test]
fn uuid_is_canonical() {
    let out = encoded(&Value::Uuid([
        0x55, 0x0e, 0x84, 0x00, 0xe2, 0x9b, 0x41, 0xd4, 0xa7, 0x16, 0x44, 0x66, 0x55, 0x44,
        0x00, 0x00,
    ]));
    assert_eq!(out, b"550e8400-e29b-41d4-a716-446655440000");
}

#[test]
fn enum_values_encode_like_text() {
    assert_eq!(encoded(&Value::EnumValue("red".to_string())), b"red");
}
