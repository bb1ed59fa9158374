use crate::constant::CommandByte;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::{ErrPayloadBytes, OkPayloadBytes};

/// Write COM_QUERY command
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Read COM_QUERY response
/// This can be:
/// - 0xFF: ERR packet (error occurred)
/// - 0x00: OK packet (query succeeded without result set)
/// - 0xFB: LOCAL INFILE request (server asks the client to stream a file)
/// - Otherwise: Result set (first byte is column count as length-encoded integer)
pub fn read_query_response(payload: &[u8]) -> Result<QueryResponse<'_>> {
    if payload.is_empty() {
        return Err(Error::InvalidPacket);
    }

    match payload[0] {
        0xFF => Err(ErrPayloadBytes(payload).into()),
        0x00 => Ok(QueryResponse::Ok(OkPayloadBytes(payload))),
        0xFB => Ok(QueryResponse::LocalInfileRequest(LocalInfileRequestBytes(
            &payload[1..],
        ))),
        _ => {
            let (column_count, _rest) = read_int_lenenc(payload)?;
            Ok(QueryResponse::ResultSet { column_count })
        }
    }
}

/// Query response variants
#[derive(Debug)]
pub enum QueryResponse<'a> {
    Ok(OkPayloadBytes<'a>),
    ResultSet { column_count: u64 },
    LocalInfileRequest(LocalInfileRequestBytes<'a>),
}

/// The filename part of a LOCAL INFILE request packet (0xFB || filename).
///
/// The name echoes whatever the client put in the statement; it is advisory
/// and the streaming side ignores it.
#[derive(Debug, Clone, Copy)]
pub struct LocalInfileRequestBytes<'a>(pub &'a [u8]);

impl<'a> LocalInfileRequestBytes<'a> {
    pub fn filename(&self) -> &'a [u8] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_local_infile_request() {
        let mut payload = vec![0xFB];
        payload.extend_from_slice(b"bulk_copy.csv");

        match read_query_response(&payload).unwrap() {
            QueryResponse::LocalInfileRequest(request) => {
                assert_eq!(request.filename(), b"bulk_copy.csv");
            }
            other => panic!("expected local infile request, got {other:?}"),
        }
    }

    #[test]
    fn classifies_result_set_header() {
        match read_query_response(&[0x03]).unwrap() {
            QueryResponse::ResultSet { column_count } => assert_eq!(column_count, 3),
            other => panic!("expected result set, got {other:?}"),
        }
    }

    #[test]
    fn write_query_prefixes_command_byte() {
        let mut out = Vec::new();
        write_query(&mut out, "SELECT 1");
        assert_eq!(out[0], 0x03);
        assert_eq!(&out[1..], b"SELECT 1");
    }
}
