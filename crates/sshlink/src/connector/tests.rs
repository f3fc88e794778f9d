//! Unit tests for the connector

use super::*;
use crate::DefaultResponseHandler;
use sshlink_transport::test_utils::{MockCommand, MockTransport};
use std::io::{self, Read};
use tempfile::TempDir;

fn connector(transport: MockTransport) -> SshConnector<MockTransport> {
    SshConnector::with_transport(ConnectorConfig::new("mock.example.com", "deploy", "secret"), transport)
}

#[test]
fn test_connect_with_valid_password() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()));

    assert!(conn.connect().unwrap());
    assert!(conn.is_authenticated());
}

#[test]
fn test_connect_with_wrong_password_returns_false() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()).accept_password("other"));

    assert!(!conn.connect().unwrap());
    assert!(!conn.is_authenticated());
    assert!(matches!(conn.exec_cmd("true"), Err(SshlinkError::NotConnected)));
}

#[test]
fn test_connect_io_failure_propagates() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()).unreachable());

    let err = conn.connect().unwrap_err();
    assert!(matches!(err, SshlinkError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionRefused));
}

#[test]
fn test_connect_passes_timeouts() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();
    let config = ConnectorConfig::new("h", "u", "secret").with_connect_timeout(std::time::Duration::from_secs(7));
    let mut conn = SshConnector::with_transport(config, transport);

    conn.connect().unwrap();
    let options = log.snapshot().last_options.unwrap();
    assert_eq!(options.connect_timeout, Some(std::time::Duration::from_secs(7)));
    assert_eq!(options.session_timeout, None);
}

#[test]
fn test_connect_passes_sub_second_timeouts() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();
    let config = ConnectorConfig::new("h", "u", "secret")
        .with_connect_timeout(std::time::Duration::from_millis(500))
        .with_session_timeout(std::time::Duration::from_millis(750));
    let mut conn = SshConnector::with_transport(config, transport);

    conn.connect().unwrap();
    let options = log.snapshot().last_options.unwrap();
    assert_eq!(options.connect_timeout, Some(std::time::Duration::from_millis(500)));
    assert_eq!(options.session_timeout, Some(std::time::Duration::from_millis(750)));
}

#[test]
fn test_close_without_connect_is_noop() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();
    let mut conn = connector(transport);

    conn.close();
    conn.close();
    assert_eq!(log.snapshot().disconnects, 0);
}

#[test]
fn test_close_after_failed_auth_is_noop() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path()).accept_password("other");
    let log = transport.log();
    let mut conn = connector(transport);

    assert!(!conn.connect().unwrap());
    conn.close();
    assert_eq!(log.snapshot().disconnects, 0);
}

#[test]
fn test_close_releases_connection() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();
    let mut conn = connector(transport);

    conn.connect().unwrap();
    conn.close();
    assert_eq!(log.snapshot().disconnects, 1);
    assert!(!conn.is_authenticated());
    assert!(matches!(conn.exec_cmd("true"), Err(SshlinkError::NotConnected)));
}

#[test]
fn test_drop_closes_connection() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();

    {
        let mut conn = connector(transport);
        conn.connect().unwrap();
    }
    assert_eq!(log.snapshot().disconnects, 1);
}

#[test]
fn test_reconnect_replaces_connection() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();
    let mut conn = connector(transport);

    conn.connect().unwrap();
    conn.connect().unwrap();

    let snapshot = log.snapshot();
    assert_eq!(snapshot.connects, 2);
    assert_eq!(snapshot.disconnects, 1);
    assert!(conn.is_authenticated());
}

#[test]
fn test_exec_without_connect_fails() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()));

    assert!(matches!(conn.exec_cmd("ls"), Err(SshlinkError::NotConnected)));
    assert!(matches!(conn.open_session(), Err(SshlinkError::NotConnected)));
}

#[test]
fn test_exec_reports_success_and_exit_code() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(
        MockTransport::new(remote.path())
            .on_command("true", MockCommand::output(""))
            .on_command("false", MockCommand::output("").with_exit_status(1)),
    );
    conn.connect().unwrap();

    let status = conn.exec_cmd("true").unwrap();
    assert!(status.success());
    assert_eq!(status.message(), None);
    assert_eq!(status.exit_code(), Some(0));

    // Normal termination counts as success even with a non-zero code.
    let status = conn.exec_cmd("false").unwrap();
    assert!(status.success());
    assert_eq!(status.exit_code(), Some(1));
}

#[test]
fn test_exec_killed_by_signal() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(
        MockTransport::new(remote.path()).on_command("sleep 100", MockCommand::output("").killed_by("TERM")),
    );
    conn.connect().unwrap();

    let status = conn.exec_cmd("sleep 100").unwrap();
    assert!(!status.success());
    assert_eq!(status.message(), Some("TERM"));
}

#[test]
fn test_each_exec_opens_and_closes_a_session() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();
    let mut conn = connector(transport);
    conn.connect().unwrap();

    conn.exec_cmd("one").unwrap();
    conn.exec_cmd("two").unwrap();

    let snapshot = log.snapshot();
    assert_eq!(snapshot.commands, vec!["one", "two"]);
    assert_eq!(snapshot.sessions_opened, 2);
    assert_eq!(snapshot.sessions_closed, 2);
}

#[test]
fn test_session_closed_when_exec_fails() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path()).on_command("nope", MockCommand::rejected());
    let log = transport.log();
    let mut conn = connector(transport);
    conn.connect().unwrap();

    assert!(matches!(conn.exec_cmd("nope"), Err(SshlinkError::Io(_))));
    assert_eq!(log.snapshot().sessions_closed, 1);
}

#[test]
fn test_session_closed_when_handler_fails() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path()).on_command("cat", MockCommand::output("x\n"));
    let log = transport.log();
    let mut conn = connector(transport);
    conn.connect().unwrap();

    let mut failing = |_: &mut dyn RemoteSession| -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "handler gave up"))
    };
    let err = conn.exec_cmd_with("cat", &mut failing).unwrap_err();

    assert!(matches!(err, SshlinkError::Io(ref e) if e.to_string() == "handler gave up"));
    assert_eq!(log.snapshot().sessions_closed, 1);
}

#[test]
fn test_handler_sees_open_session() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()).on_command("hostname", MockCommand::output("box\n")));
    conn.connect().unwrap();

    let mut seen = String::new();
    let mut capture = |session: &mut dyn RemoteSession| -> io::Result<()> {
        assert!(!session.is_closed());
        session.stdout().read_to_string(&mut seen)?;
        Ok(())
    };
    conn.exec_cmd_with("hostname", &mut capture).unwrap();

    assert_eq!(seen, "box\n");
}

#[test]
fn test_exec_with_default_handler_queues_lines() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(
        MockTransport::new(remote.path()).on_command("seq 3", MockCommand::output("1\n2\n3\n").with_stderr("noise\n")),
    );
    conn.connect().unwrap();

    let (mut handler, mut rx) = DefaultResponseHandler::unbounded();
    let status = conn.exec_cmd_with("seq 3", &mut handler).unwrap();

    assert!(status.success());
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    assert_eq!(lines, vec!["1", "2", "3"]);
}

#[test]
fn test_transfers_require_connection() {
    let remote = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()));

    assert!(matches!(conn.download("/a", local.path()), Err(SshlinkError::NotConnected)));
    assert!(matches!(conn.upload(local.path().join("a"), "/"), Err(SshlinkError::NotConnected)));
    assert!(matches!(conn.upload_bytes(b"x", "a", "/"), Err(SshlinkError::NotConnected)));
    assert!(matches!(
        conn.download_many(["/a", "/b"], local.path()),
        Err(SshlinkError::NotConnected)
    ));
}

#[test]
fn test_upload_uses_configured_mode() {
    let remote = TempDir::new().unwrap();
    let transport = MockTransport::new(remote.path());
    let log = transport.log();
    let config = ConnectorConfig::new("h", "u", "secret").with_file_mode(0o640);
    let mut conn = SshConnector::with_transport(config, transport);
    conn.connect().unwrap();

    conn.upload_bytes(b"x", "a.txt", "/").unwrap();
    assert_eq!(log.snapshot().upload_modes, vec![0o640]);
}

#[test]
fn test_setters_affect_next_connect() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()).accept_password("rotated"));

    assert!(!conn.connect().unwrap());

    conn.set_password("rotated");
    conn.set_username("ops");
    conn.set_host("other.example.com");
    conn.set_port(2200);
    assert!(conn.connect().unwrap());

    assert_eq!(conn.password(), "rotated");
    assert_eq!(conn.username(), "ops");
    assert_eq!(conn.host(), "other.example.com");
    assert_eq!(conn.port(), 2200);
    assert_eq!(conn.config().port, 2200);
}

#[test]
fn test_transport_accessors() {
    let remote = TempDir::new().unwrap();
    let mut conn = connector(MockTransport::new(remote.path()));

    assert!(!conn.transport().is_connected());
    conn.connect().unwrap();
    assert!(conn.transport_mut().is_connected());
}
