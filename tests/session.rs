// Integration tests for session lifecycle: teardown drains every upload.

use anyhow::Result;
use objbridge::testing::{FailingSink, RecordingSink, ScriptedHandle, TempConfigFile};
use objbridge::*;
use std::io::{Read, Write};
use std::sync::Arc;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn session_with(client: &Arc<FakeObjectClient>) -> Session {
    init_logging();
    Session::new(Repository::new("bucket", "/path/to"), client.clone())
}

#[test]
fn test_close_without_uploads_is_noop() -> Result<()> {
    let client = Arc::new(FakeObjectClient::new());
    let session = session_with(&client);

    session.open()?;
    let report = session.close()?;

    assert_eq!(report, DrainReport::default());
    assert!(!session.take_interrupted());
    Ok(())
}

#[test]
fn test_close_waits_for_upload_and_empties_registry() -> Result<()> {
    let client = Arc::new(FakeObjectClient::new());
    let session = session_with(&client);

    let mut writer = session.open_for_write("key", 5)?;
    writer.write_all(b"hello")?;
    writer.close()?;
    assert_eq!(session.pending_uploads(), 1);

    let report = session.close()?;

    assert_eq!(report.drained, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(session.pending_uploads(), 0);
    assert_eq!(
        client.object_data("bucket", "path/to/key"),
        Some(b"hello".to_vec())
    );
    Ok(())
}

#[test]
fn test_interrupted_wait_still_closes_and_removes() -> Result<()> {
    let client = Arc::new(FakeObjectClient::new());
    client.interrupt_waits(true);
    let session = session_with(&client);

    let mut writer = session.open_for_write("key", 5)?;
    writer.write_all(b"hello")?;

    let report = session.close()?;

    assert_eq!(report.interrupted, 1);
    assert_eq!(report.drained, 1);
    assert_eq!(session.pending_uploads(), 0);
    assert!(writer.is_closed());
    assert!(session.take_interrupted());
    assert!(!session.take_interrupted());
    Ok(())
}

#[test]
fn test_failed_transfer_does_not_fail_close() -> Result<()> {
    let client = Arc::new(FakeObjectClient::new());
    client.fail_transfers(true);
    let session = session_with(&client);

    let mut writer = session.open_for_write("key", 3)?;
    writer.write_all(b"abc")?;
    drop(writer);

    let report = session.close()?;

    assert_eq!(report.failed, 1);
    assert_eq!(session.pending_uploads(), 0);
    assert_eq!(client.object_data("bucket", "path/to/key"), None);
    Ok(())
}

#[test]
fn test_close_failure_is_connection_failure() -> Result<()> {
    let client = Arc::new(FakeObjectClient::new());
    let session = session_with(&client);

    let mut writer = session.open_for_write("key", 2)?;
    writer.write_all(b"ok")?;
    drop(writer);
    session
        .registry()
        .add(Box::new(ScriptedHandle::completed(1_000)), Box::new(FailingSink));

    let err = session.close().unwrap_err();

    assert!(matches!(err, BridgeError::ConnectionFailure { .. }));
    assert_eq!(session.pending_uploads(), 0);
    assert_eq!(client.object_data("bucket", "path/to/key"), Some(b"ok".to_vec()));
    Ok(())
}

#[test]
fn test_stop_at_first_failure_keeps_later_entries() -> Result<()> {
    let client = Arc::new(FakeObjectClient::new());
    let config = BridgeConfig {
        drain_policy: DrainPolicy::StopAtFirstFailure,
        ..BridgeConfig::default()
    };
    let session = Session::with_config(Repository::new("bucket", "/"), client, config);

    let before = RecordingSink::new();
    let before_closes = before.closes();
    let registry = session.registry();
    registry.add(Box::new(ScriptedHandle::completed(1)), Box::new(before));
    registry.add(Box::new(ScriptedHandle::completed(2)), Box::new(FailingSink));
    registry.add(
        Box::new(ScriptedHandle::completed(3)),
        Box::new(RecordingSink::new()),
    );

    let err = session.close().unwrap_err();

    assert!(matches!(err, BridgeError::ConnectionFailure { .. }));
    assert_eq!(before_closes.get(), 1);
    assert_eq!(session.pending_uploads(), 1);
    assert!(registry.contains(TransferId(3)));
    Ok(())
}

#[test]
fn test_stream_provider_round_trip() -> Result<()> {
    let client = Arc::new(FakeObjectClient::new());
    let mut session = session_with(&client);
    session.open_connection()?;

    let pom = Resource::new("com/acme/app/1.0/app-1.0.pom").with_content_length(11);
    let mut output = OutputData::new(pom);
    session.fill_output_data(&mut output)?;
    let mut stream = output.take_output_stream().expect("stream should be set");
    stream.write_all(b"<project/>\n")?;
    drop(stream);
    session.close_connection()?;

    let mut input = InputData::new(Resource::new("com/acme/app/1.0/app-1.0.pom"));
    session.fill_input_data(&mut input)?;
    assert_eq!(input.resource().content_length, 11);

    let mut body = String::new();
    input
        .take_input_stream()
        .expect("stream should be set")
        .read_to_string(&mut body)?;
    assert_eq!(body, "<project/>\n");
    Ok(())
}

#[test]
fn test_session_from_config_file() -> Result<()> {
    let file = TempConfigFile::new(r#"{"pipe_buffer_size": 16, "drain_policy": "best_effort"}"#)?;
    let config = BridgeConfig::from_json_file(file.path())?;
    let client = Arc::new(FakeObjectClient::new());
    let repository = Repository::new("bucket", "/repo");
    let session = Session::with_config(repository, client.clone(), config);

    let mut writer = session.open_for_write("blob", 100)?;
    writer.write_all(&[9u8; 100])?;
    drop(writer);
    session.close()?;

    assert_eq!(session.config().pipe_buffer_size, 16);
    assert_eq!(client.object_data("bucket", "repo/blob"), Some(vec![9u8; 100]));
    Ok(())
}
