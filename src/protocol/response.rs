use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// The payload part of OK packet
#[derive(Debug, Clone, Copy)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

impl<'a> OkPayloadBytes<'a> {
    pub fn bytes(&self) -> &[u8] {
        self.0
    }
}

/// The OK packet parsed from OkPayloadBytes
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.bytes())?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, data) = read_int_lenenc(data)?;
        let (last_insert_id, data) = read_int_lenenc(data)?;
        let (status_flags, data) = read_int_2(data)?;
        let (warnings, _data) = read_int_2(data)?;

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
        })
    }
}

#[derive(Debug)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

/// The ERR packet parsed from ErrPayloadBytes
#[derive(Debug, Clone, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        debug_assert_eq!(header, 0xFF);

        let (error_code, data) = read_int_2(data)?;

        // marker is '#'
        let (_sql_state_marker, data) = read_string_fix(data, 1)?;
        let (sql_state, data) = read_string_fix(data, 5)?;

        Ok(ErrPayload {
            error_code,
            sql_state: String::from_utf8_lossy(sql_state).to_string(),
            message: String::from_utf8_lossy(data).to_string(), // string<EOF>
        })
    }
}

/// Accept the packet that closes a result set: EOF (`0xFE`) or, with
/// `CLIENT_DEPRECATE_EOF`, an OK packet with the `0xFE` header. ERR aborts.
pub fn check_resultset_terminator(payload: &[u8]) -> Result<()> {
    match payload.first() {
        Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
        Some(0x00 | 0xFE) => Ok(()),
        _ => Err(Error::InvalidPacket),
    }
}

/// Classify a reply that must be either OK (0x00 or 0xFE) or ERR (0xFF).
///
/// This is the shape of every terminal reply in the LOAD DATA exchange.
pub fn read_ok_or_err(payload: &[u8]) -> Result<OkPayload> {
    match payload.first() {
        Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
        Some(0x00 | 0xFE) => OkPayload::try_from(OkPayloadBytes(payload)),
        _ => Err(Error::InvalidPacket),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_payload() {
        // OK, affected_rows = 5, last_insert_id = 0, autocommit, no warnings
        let payload = [0x00, 0x05, 0x00, 0x02, 0x00, 0x00, 0x00];
        let ok = read_ok_or_err(&payload).unwrap();
        assert_eq!(ok.affected_rows, 5);
        assert_eq!(ok.last_insert_id, 0);
        assert!(
            ok.status_flags
                .contains(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT)
        );
    }

    #[test]
    fn parses_err_payload() {
        let mut payload = vec![0xFF, 0x1D, 0x00, b'#'];
        payload.extend_from_slice(b"HY000");
        payload.extend_from_slice(b"File 'x.csv' not found (Errcode: 2)");

        let err = read_ok_or_err(&payload).unwrap_err();
        match err {
            Error::ServerError(err) => {
                assert_eq!(err.error_code, 29);
                assert_eq!(err.sql_state, "HY000");
                assert!(err.message.contains("not found"));
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            read_ok_or_err(&[0x42]),
            Err(Error::InvalidPacket)
        ));
    }
}
