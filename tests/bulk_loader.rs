#![cfg(feature = "sync")]

mod common;

use std::io::Cursor;
use std::time::Duration;

use common::*;
use mysql_bulk::constant::MAX_PAYLOAD_LENGTH;
use mysql_bulk::error::Error;
use mysql_bulk::{BulkLoader, ConflictOption};
use pretty_assertions::assert_eq;

fn temp_file(name: &str, contents: &[u8]) -> String {
    let path = std::env::temp_dir().join(format!("mysql_bulk_{}_{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn local_load_streams_the_file() {
    let path = temp_file("rows.csv", b"1,'two-1','three-1'\n2,'two-2','three-2'\n");

    let mut session = MockSession::new();
    session.push_reply(1, local_infile_request(&path));
    session.push_reply(4, ok_packet(2));

    let mut loader = BulkLoader::new("dst");
    loader.file_name = Some(path.clone());
    loader.field_terminator = vec![b','];
    loader.field_quotation_character = Some(b'\'');
    loader.field_quotation_optional = true;

    let affected = loader.load(&mut session).unwrap();
    assert_eq!(affected, 2);

    // the statement reflects the configured delimiters
    let sql = session.command_text(0).to_string();
    assert!(sql.starts_with("LOAD DATA LOCAL INFILE '"));
    assert!(sql.contains("INTO TABLE `dst`"));
    assert!(sql.contains("FIELDS TERMINATED BY ',' OPTIONALLY ENCLOSED BY '\\''"));

    // file bytes in one data frame, then the end-of-transfer frame
    assert_eq!(session.frames.len(), 2);
    assert_eq!(session.frames[0].0, 2);
    assert_eq!(
        session.frames[0].1,
        b"1,'two-1','three-1'\n2,'two-2','three-2'\n"
    );
    assert_eq!(session.frames[1], (3, Vec::new()));
    assert!(session.replies.is_empty());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_local_file_still_completes_the_exchange() {
    let mut session = MockSession::new();
    session.push_reply(1, local_infile_request("gone.csv"));
    session.push_reply(3, ok_packet(0));

    let mut loader = BulkLoader::new("dst");
    loader.file_name = Some("/tmp/definitely-does-not-exist-mysql-bulk.csv".to_string());
    loader.timeout = Some(Duration::from_secs(3));

    let err = loader.load(&mut session).unwrap_err();
    assert!(matches!(err, Error::FileNotFound { path } if path.contains("does-not-exist")));

    // only the end-of-transfer frame went out, and the final reply was drained
    assert_eq!(session.frames, vec![(2, Vec::new())]);
    assert!(session.replies.is_empty());
}

#[test]
fn stream_source_on_an_exact_frame_boundary() {
    let mut session = MockSession::new();
    session.push_reply(1, local_infile_request("stream"));
    session.push_reply(4, ok_packet(0));

    let loader = BulkLoader::new("dst");
    let mut source = Cursor::new(vec![0x55u8; MAX_PAYLOAD_LENGTH]);
    loader.load_from_stream(&mut session, &mut source).unwrap();

    // one full frame, then the mandatory empty frame
    assert_eq!(session.frames.len(), 2);
    assert_eq!(session.frames[0].0, 2);
    assert_eq!(session.frames[0].1.len(), MAX_PAYLOAD_LENGTH);
    assert_eq!(session.frames[1], (3, Vec::new()));
}

#[test]
fn stream_source_above_the_frame_boundary() {
    let mut session = MockSession::new();
    session.push_reply(1, local_infile_request("stream"));
    session.push_reply(5, ok_packet(0));

    let loader = BulkLoader::new("dst");
    let mut source = Cursor::new(vec![0x55u8; MAX_PAYLOAD_LENGTH + 5]);
    loader.load_from_stream(&mut session, &mut source).unwrap();

    assert_eq!(session.frames.len(), 3);
    assert_eq!(session.frames[0].1.len(), MAX_PAYLOAD_LENGTH);
    assert_eq!(session.frames[1].1.len(), 5);
    assert_eq!(session.frames[2], (4, Vec::new()));
}

#[test]
fn empty_stream_sends_only_the_end_of_transfer_frame() {
    let mut session = MockSession::new();
    session.push_reply(1, local_infile_request("stream"));
    session.push_reply(3, ok_packet(0));

    let loader = BulkLoader::new("dst");
    let mut source = Cursor::new(Vec::new());
    let affected = loader.load_from_stream(&mut session, &mut source).unwrap();
    assert_eq!(affected, 0);
    assert_eq!(session.frames, vec![(2, Vec::new())]);
}

#[test]
fn server_side_load_propagates_the_server_error() {
    let mut session = MockSession::new();
    session.push_reply(
        1,
        err_packet(29, "File '/tmp/does-not-exist.csv' not found (Errcode: 2)"),
    );

    let mut loader = BulkLoader::new("dst");
    loader.local = false;
    loader.file_name = Some("/tmp/does-not-exist.csv".to_string());
    loader.conflict = ConflictOption::Ignore;

    let err = loader.load(&mut session).unwrap_err();
    match err {
        Error::ServerError(server) => {
            assert_eq!(server.error_code, 29);
            assert!(server.message.contains("not found"));
        }
        other => panic!("expected server error, got {other:?}"),
    }

    assert!(!session.command_text(0).contains("LOCAL"));
    assert!(session.frames.is_empty());
    assert!(session.replies.is_empty());
}

#[test]
fn local_load_requires_the_capability() {
    let mut session = MockSession::new().without_local_capability();

    let mut loader = BulkLoader::new("dst");
    loader.file_name = Some("x.csv".to_string());

    let err = loader.load(&mut session).unwrap_err();
    assert!(matches!(err, Error::BadConfigError(_)));
    assert!(session.commands.is_empty());
}

#[test]
fn stream_source_conflicts_with_a_file_name() {
    let mut session = MockSession::new();
    let mut loader = BulkLoader::new("dst");
    loader.file_name = Some("x.csv".to_string());

    let mut source = Cursor::new(b"data".to_vec());
    let err = loader
        .load_from_stream(&mut session, &mut source)
        .unwrap_err();
    assert!(matches!(err, Error::BadConfigError(_)));
    assert!(session.commands.is_empty());
}

/// Reader that outlives the configured deadline before producing data.
struct SlowReader {
    produced: bool,
}

impl std::io::Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.produced {
            return Ok(0);
        }
        std::thread::sleep(Duration::from_millis(60));
        self.produced = true;
        buf[0] = b'x';
        Ok(1)
    }
}

#[test]
fn timeout_mid_stream_finishes_the_exchange_first() {
    let mut session = MockSession::new();
    session.push_reply(1, local_infile_request("stream"));
    session.push_reply(3, ok_packet(0));

    let mut loader = BulkLoader::new("dst");
    loader.timeout = Some(Duration::from_millis(10));

    let mut source = SlowReader { produced: false };
    let err = loader
        .load_from_stream(&mut session, &mut source)
        .unwrap_err();
    assert!(matches!(err, Error::Timeout));

    // the pending byte was discarded; only the end-of-transfer frame went out
    assert_eq!(session.frames, vec![(2, Vec::new())]);
    assert!(session.replies.is_empty());
}
