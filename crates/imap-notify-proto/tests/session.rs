//! Session and supervisor tests against scripted servers.
//!
//! Each script is a `tokio_test::io::Mock` that expects the client's exact
//! bytes and replays canned server responses. Time is paused, so debounce
//! windows and backoff delays run instantly and deterministically.

#![allow(clippy::unwrap_used)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_test::io::{Builder, Mock};

use imap_notify_proto::{
    supervisor, ConnectionProfile, Connector, Dispatcher, Error, ErrorKind, Mailbox, MailboxSelection,
    ReconnectPolicy, Result, Secret, Security, Session, SessionPolicy, SessionState,
};

/// Hands out one prepared script per connection attempt.
struct ScriptConnector {
    scripts: VecDeque<Mock>,
    connects: usize,
}

impl ScriptConnector {
    fn new(scripts: impl IntoIterator<Item = Mock>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            connects: 0,
        }
    }
}

impl Connector for ScriptConnector {
    type Stream = Mock;

    async fn connect(&mut self, profile: &ConnectionProfile) -> Result<Mock> {
        self.connects += 1;
        self.scripts.pop_front().ok_or_else(|| Error::Connect {
            address: profile.address(),
            message: "connection refused".to_string(),
        })
    }

    async fn upgrade(&mut self, stream: Mock, _host: &str) -> Result<Mock> {
        Ok(stream)
    }
}

const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 NOTIFY] Dovecot ready.\r\n";
const LOGIN: &[u8] = b"A0001 LOGIN alice secret\r\n";
const LOGIN_OK: &[u8] = b"A0001 OK [CAPABILITY IMAP4rev1 NOTIFY IDLE] Logged in\r\n";
const ALL_EVENTS: &str = "(MessageNew MessageExpunge FlagChange MailboxName SubscriptionChange)";

fn notify_line(tag: &str, target: &str) -> Vec<u8> {
    format!("{tag} NOTIFY SET (SELECTED (MessageNew MessageExpunge FlagChange)) ({target} {ALL_EVENTS})\r\n")
        .into_bytes()
}

fn profile(mailboxes: &[&str]) -> ConnectionProfile {
    ConnectionProfile::builder("imap.example.com", "alice", Secret::new("secret"))
        .security(Security::Implicit)
        .mailboxes(MailboxSelection::named(mailboxes.iter().copied()))
        .build()
}

/// Script of a successful handshake watching INBOX only; NOTIFY is A0003.
fn inbox_handshake(builder: &mut Builder) -> &mut Builder {
    builder
        .read(GREETING)
        .write(LOGIN)
        .read(LOGIN_OK)
        .write(b"A0002 EXAMINE INBOX\r\n")
        .read(b"* 3 EXISTS\r\n* OK [UIDVALIDITY 1] UIDs valid\r\nA0002 OK [READ-ONLY] Examine completed\r\n")
        .write(&notify_line("A0003", "MAILBOXES (INBOX)"))
        .read(b"A0003 OK NOTIFY completed\r\n")
}

fn counter() -> (Rc<Cell<u32>>, impl FnMut()) {
    let calls = Rc::new(Cell::new(0));
    let inner = Rc::clone(&calls);
    (calls, move || inner.set(inner.get() + 1))
}

#[tokio::test(start_paused = true)]
async fn test_handshake_watches_all_selected_mailboxes() {
    let mock = Builder::new()
        .read(GREETING)
        .write(LOGIN)
        .read(LOGIN_OK)
        .write(b"A0002 EXAMINE INBOX\r\n")
        .read(b"* 12 EXISTS\r\n* 0 RECENT\r\nA0002 OK [READ-ONLY] Examine completed\r\n")
        .write(b"A0003 EXAMINE Sent\r\n")
        .read(b"* 4 EXISTS\r\nA0003 OK [READ-ONLY] Examine completed\r\n")
        .write(&notify_line("A0004", "MAILBOXES (INBOX Sent)"))
        .read(b"A0004 OK NOTIFY completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);

    let session = Session::connect(&mut connector, &profile(&["INBOX", "Sent"]), SessionPolicy::default())
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Watching);
    assert_eq!(session.watched(), &[Mailbox::inbox(), Mailbox::new("Sent")]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_select_is_skipped() {
    let mock = Builder::new()
        .read(GREETING)
        .write(LOGIN)
        .read(LOGIN_OK)
        .write(b"A0002 EXAMINE INBOX\r\n")
        .read(b"A0002 OK [READ-ONLY] Examine completed\r\n")
        .write(b"A0003 EXAMINE Sent\r\n")
        .read(b"A0003 NO [NONEXISTENT] Mailbox doesn't exist: Sent\r\n")
        .write(&notify_line("A0004", "MAILBOXES (INBOX)"))
        .read(b"A0004 OK NOTIFY completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);

    let session = Session::connect(&mut connector, &profile(&["INBOX", "Sent"]), SessionPolicy::default())
        .await
        .unwrap();

    assert_eq!(session.watched(), &[Mailbox::inbox()]);
}

#[tokio::test(start_paused = true)]
async fn test_no_selectable_mailbox_fails_without_notify() {
    let mock = Builder::new()
        .read(GREETING)
        .write(LOGIN)
        .read(LOGIN_OK)
        .write(b"A0002 EXAMINE Archive\r\n")
        .read(b"A0002 NO [NONEXISTENT] Unknown mailbox\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);

    let err = Session::connect(&mut connector, &profile(&["Archive"]), SessionPolicy::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::NoMailboxes), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_login_rejected_is_auth_error() {
    let mock = Builder::new()
        .read(GREETING)
        .write(LOGIN)
        .read(b"A0001 NO [AUTHENTICATIONFAILED] Authentication failed.\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);

    let err = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(!err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_bye_greeting_is_connect_error() {
    let mock = Builder::new().read(b"* BYE Too many connections\r\n").build();
    let mut connector = ScriptConnector::new([mock]);

    let err = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::Connect);
}

#[tokio::test(start_paused = true)]
async fn test_missing_notify_capability_is_unsupported() {
    let mock = Builder::new()
        .read(b"* OK [CAPABILITY IMAP4rev1 IDLE] ready\r\n")
        .write(LOGIN)
        .read(b"A0001 OK [CAPABILITY IMAP4rev1 IDLE] Logged in\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);

    let err = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::Unsupported("NOTIFY")), "{err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_notify_reports_bad_events() {
    let mock = Builder::new()
        .read(GREETING)
        .write(LOGIN)
        .read(LOGIN_OK)
        .write(b"A0002 EXAMINE INBOX\r\n")
        .read(b"A0002 OK [READ-ONLY] Examine completed\r\n")
        .write(&notify_line("A0003", "MAILBOXES (INBOX)"))
        .read(b"A0003 NO [BADEVENT (MessageNew MessageExpunge)] Unsupported event\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);

    let err = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .err()
        .unwrap();

    match err {
        Error::Rejected { command, text } => {
            assert_eq!(command, "NOTIFY");
            assert!(text.contains("MessageNew MessageExpunge"), "{text}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_starttls_then_capability_refresh() {
    let mock = Builder::new()
        .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] ready\r\n")
        .write(b"A0001 STARTTLS\r\n")
        .read(b"A0001 OK Begin TLS negotiation now\r\n")
        .write(b"A0002 CAPABILITY\r\n")
        .read(b"* CAPABILITY IMAP4rev1 LITERAL+ NOTIFY\r\nA0002 OK Capability completed\r\n")
        .write(b"A0003 LOGIN alice secret\r\n")
        .read(b"A0003 OK Logged in\r\n")
        .write(b"A0004 CAPABILITY\r\n")
        .read(b"* CAPABILITY IMAP4rev1 LITERAL+ NOTIFY\r\nA0004 OK Capability completed\r\n")
        .write(&notify_line("A0005", "SUBSCRIBED"))
        .read(b"A0005 OK NOTIFY completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let profile = ConnectionProfile::builder("imap.example.com", "alice", Secret::new("secret"))
        .security(Security::StartTls)
        .build();

    let session = Session::connect(&mut connector, &profile, SessionPolicy::default())
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Watching);
    assert!(session.watched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_starttls_missing_is_unsupported() {
    let mock = Builder::new()
        .read(b"* OK [CAPABILITY IMAP4rev1 NOTIFY] ready\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let profile = ConnectionProfile::builder("imap.example.com", "alice", Secret::new("secret")).build();

    let err = Session::connect(&mut connector, &profile, SessionPolicy::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::Unsupported("STARTTLS")), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn test_preauth_skips_login() {
    let mock = Builder::new()
        .read(b"* PREAUTH [CAPABILITY IMAP4rev1 NOTIFY] Logged in as alice\r\n")
        .write(&notify_line("A0001", "PERSONAL"))
        .read(b"A0001 OK NOTIFY completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let profile = ConnectionProfile::builder("imap.example.com", "alice", Secret::new("secret"))
        .security(Security::Implicit)
        .mailboxes(MailboxSelection::All)
        .build();

    let session = Session::connect(&mut connector, &profile, SessionPolicy::default())
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Watching);
}

#[tokio::test(start_paused = true)]
async fn test_preauth_with_starttls_is_unsupported() {
    let mock = Builder::new()
        .read(b"* PREAUTH [CAPABILITY IMAP4rev1 STARTTLS NOTIFY] Logged in as alice\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let profile = ConnectionProfile::builder("imap.example.com", "alice", Secret::new("secret"))
        .security(Security::StartTls)
        .mailboxes(MailboxSelection::All)
        .build();

    let err = Session::connect(&mut connector, &profile, SessionPolicy::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::Unsupported(_)), "{err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_three_exists_fire_one_callback() {
    let mock = inbox_handshake(&mut Builder::new())
        .wait(Duration::from_millis(100))
        .read(b"* 4 EXISTS\r\n")
        .wait(Duration::from_millis(400))
        .read(b"* 5 EXISTS\r\n")
        .wait(Duration::from_millis(500))
        .read(b"* 6 EXISTS\r\n")
        .write(b"A0004 LOGOUT\r\n")
        .read(b"* BYE Logging out\r\nA0004 OK Logout completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let start = Instant::now();

    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .unwrap();

    let fired = Rc::new(Cell::new(None));
    let fired_at = Rc::clone(&fired);
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), move || {
        assert!(fired_at.get().is_none(), "callback fired twice");
        fired_at.set(Some(start.elapsed()));
    });

    let (tx, mut rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        tx.send(true).unwrap();
    });

    session.watch(&mut dispatcher, &mut rx).await.unwrap();

    assert_eq!(dispatcher.bursts(), 1);
    // Quiet for 2 s after the last EXISTS at 1 s.
    let at = fired.get().unwrap();
    assert!(at >= Duration::from_secs(3) && at < Duration::from_millis(3100), "{at:?}");
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_changes_before_notify_completion_open_burst() {
    let mock = Builder::new()
        .read(GREETING)
        .write(LOGIN)
        .read(LOGIN_OK)
        .write(b"A0002 EXAMINE INBOX\r\n")
        .read(b"A0002 OK [READ-ONLY] Examine completed\r\n")
        .write(&notify_line("A0003", "MAILBOXES (INBOX)"))
        .read(b"* STATUS Sent (MESSAGES 3)\r\nA0003 OK NOTIFY completed\r\n")
        .read(b"* OK Still here\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .unwrap();
    let (calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, mut rx) = watch::channel(false);

    assert!(!dispatcher.is_pending());
    session.watch_step(&mut dispatcher, &mut rx).await.unwrap();

    assert!(dispatcher.is_pending());
    assert_eq!(calls.get(), 0);
    assert_eq!(session.state(), SessionState::Watching);
}

#[tokio::test(start_paused = true)]
async fn test_read_timeout_keeps_watching() {
    let mock = inbox_handshake(&mut Builder::new())
        .wait(Duration::from_secs(40))
        .read(b"* OK Still here\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .unwrap();
    let (calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, mut rx) = watch::channel(false);

    let start = Instant::now();
    let step = session.watch_step(&mut dispatcher, &mut rx).await.unwrap();
    assert_eq!(step, imap_notify_proto::connection::WatchStep::Continue);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(30) && waited < Duration::from_secs(31), "{waited:?}");
    assert_eq!(session.state(), SessionState::Watching);

    // The untagged OK arrives later and is noise.
    session.watch_step(&mut dispatcher, &mut rx).await.unwrap();
    assert_eq!(session.state(), SessionState::Watching);
    assert!(!dispatcher.is_pending());
    assert_eq!(calls.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_fails_session() {
    let mock = inbox_handshake(&mut Builder::new())
        .read(b"* 7 EXISTS\r\n")
        .read(b"A9999 OK stray completion\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .unwrap();
    let (_calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, mut rx) = watch::channel(false);

    let err = session.watch(&mut dispatcher, &mut rx).await.err().unwrap();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(session.state(), SessionState::Failed);
    assert!(dispatcher.is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_unsolicited_bye_fails_session() {
    let mock = inbox_handshake(&mut Builder::new())
        .read(b"* BYE Server shutting down\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .unwrap();
    let (_calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, mut rx) = watch::channel(false);

    let err = session.watch(&mut dispatcher, &mut rx).await.err().unwrap();

    assert!(matches!(err, Error::Bye(_)), "{err:?}");
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_overflow_reissues_notify() {
    let mock = inbox_handshake(&mut Builder::new())
        .read(b"* OK [NOTIFICATIONOVERFLOW] Too many events\r\n")
        .write(&notify_line("A0004", "MAILBOXES (INBOX)"))
        .read(b"A0004 OK NOTIFY completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .unwrap();
    let (_calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, mut rx) = watch::channel(false);

    session.watch_step(&mut dispatcher, &mut rx).await.unwrap();
    assert!(dispatcher.is_pending());
    session.watch_step(&mut dispatcher, &mut rx).await.unwrap();
    assert_eq!(session.state(), SessionState::Watching);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_logs_out() {
    let mock = inbox_handshake(&mut Builder::new())
        .write(b"A0004 LOGOUT\r\n")
        .read(b"* BYE Logging out\r\nA0004 OK Logout completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), SessionPolicy::default())
        .await
        .unwrap();
    let (calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (tx, mut rx) = watch::channel(false);

    tx.send(true).unwrap();
    let step = session.watch_step(&mut dispatcher, &mut rx).await.unwrap();

    assert_eq!(step, imap_notify_proto::connection::WatchStep::Shutdown);
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(calls.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_noop_after_idle() {
    let policy = SessionPolicy {
        keepalive: Duration::from_secs(60),
        ..SessionPolicy::default()
    };
    let mock = inbox_handshake(&mut Builder::new())
        .wait(Duration::from_secs(60))
        .write(b"A0004 NOOP\r\n")
        .read(b"A0004 OK NOOP completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let mut session = Session::connect(&mut connector, &profile(&["INBOX"]), policy)
        .await
        .unwrap();
    let (calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, mut rx) = watch::channel(false);

    // Two read timeouts (30 s each) up to the keepalive deadline, then the
    // NOOP, then its completion.
    for _ in 0..4 {
        session.watch_step(&mut dispatcher, &mut rx).await.unwrap();
    }
    assert_eq!(session.state(), SessionState::Watching);
    assert_eq!(calls.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_reconnects_after_connection_loss() {
    // First connection drops right after NOTIFY is accepted.
    let first = inbox_handshake(&mut Builder::new()).build();
    let second = inbox_handshake(&mut Builder::new())
        .write(b"A0004 LOGOUT\r\n")
        .read(b"* BYE Logging out\r\nA0004 OK Logout completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([first, second]);
    let (calls, callback) = counter();
    let policy = SessionPolicy::default();
    let mut dispatcher = Dispatcher::new(policy.debounce, callback);
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        tx.send(true).unwrap();
    });

    supervisor::run(
        &mut connector,
        &profile(&["INBOX"]),
        &policy,
        &ReconnectPolicy::default(),
        &mut dispatcher,
        rx,
    )
    .await
    .unwrap();

    assert_eq!(connector.connects, 2);
    // One refresh burst per successful connect.
    assert_eq!(calls.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_once_stops_after_first_burst() {
    // A connect refresh would fire at 2 s and log out before the EXISTS.
    let mock = inbox_handshake(&mut Builder::new())
        .wait(Duration::from_secs(5))
        .read(b"* 4 EXISTS\r\n")
        .write(b"A0004 LOGOUT\r\n")
        .read(b"* BYE Logging out\r\nA0004 OK Logout completed\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let (calls, callback) = counter();
    let (tx, _rx) = watch::channel(false);
    let start = Instant::now();

    supervisor::run_once(
        &mut connector,
        &profile(&["INBOX"]),
        &SessionPolicy::default(),
        &ReconnectPolicy::default(),
        callback,
        tx,
    )
    .await
    .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(connector.connects, 1);
    // EXISTS at 5 s plus the 2 s debounce window.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(7) && elapsed < Duration::from_millis(7100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_stops_on_auth_failure() {
    let mock = Builder::new()
        .read(GREETING)
        .write(LOGIN)
        .read(b"A0001 NO [AUTHENTICATIONFAILED] Authentication failed.\r\n")
        .build();
    let mut connector = ScriptConnector::new([mock]);
    let (calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, rx) = watch::channel(false);

    let err = supervisor::run(
        &mut connector,
        &profile(&["INBOX"]),
        &SessionPolicy::default(),
        &ReconnectPolicy::default(),
        &mut dispatcher,
        rx,
    )
    .await
    .err()
    .unwrap();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(connector.connects, 1);
    assert_eq!(calls.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_gives_up_after_attempt_budget() {
    let mut connector = ScriptConnector::new(Vec::<Mock>::new());
    let (_calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (_tx, rx) = watch::channel(false);
    let reconnect = ReconnectPolicy {
        max_attempts: Some(2),
        ..ReconnectPolicy::default()
    };
    let start = Instant::now();

    let err = supervisor::run(
        &mut connector,
        &profile(&["INBOX"]),
        &SessionPolicy::default(),
        &reconnect,
        &mut dispatcher,
        rx,
    )
    .await
    .err()
    .unwrap();

    assert_eq!(err.kind(), ErrorKind::Connect);
    assert_eq!(connector.connects, 3);
    // Two jittered delays: 2 s and 4 s, each within 20 %.
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(4800) && waited <= Duration::from_millis(7200), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_shutdown_before_connect() {
    let mut connector = ScriptConnector::new(Vec::<Mock>::new());
    let (calls, callback) = counter();
    let mut dispatcher = Dispatcher::new(Duration::from_secs(2), callback);
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    supervisor::run(
        &mut connector,
        &profile(&["INBOX"]),
        &SessionPolicy::default(),
        &ReconnectPolicy::default(),
        &mut dispatcher,
        rx,
    )
    .await
    .unwrap();

    assert_eq!(connector.connects, 0);
    assert_eq!(calls.get(), 0);
}
