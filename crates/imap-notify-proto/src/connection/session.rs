//! One connection's lifecycle: handshake, NOTIFY and the watch loop.

#![allow(clippy::missing_errors_doc)]

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::Instant;

use super::config::{ConnectionProfile, Security, SessionPolicy};
use super::state::SessionState;
use super::stream::Connector;
use super::transport::Transport;
use crate::codec::Codec;
use crate::command::{Command, CommandKind, MailboxFilter, NotifyRequest};
use crate::dispatch::Dispatcher;
use crate::event::ServerEvent;
use crate::types::{Capability, Mailbox, MailboxSelection, ResponseCode, Status};
use crate::{Error, Result};

/// Tagged outcome of a command run during the handshake.
#[derive(Debug)]
struct Completion {
    outcome: Status,
    code: Option<ResponseCode>,
    text: String,
}

impl Completion {
    /// Server text, with a BADEVENT list spelled out.
    fn describe(&self) -> String {
        match &self.code {
            Some(ResponseCode::BadEvent(events)) => {
                format!("{} (unsupported events: {})", self.text, events.join(" "))
            }
            _ => self.text.clone(),
        }
    }
}

/// Result of one pass through the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStep {
    /// Still watching.
    Continue,
    /// Shutdown was requested; the session logged out and is disconnected.
    Shutdown,
}

/// A single connection watching mailboxes with NOTIFY.
///
/// Created by [`Session::connect`], which runs the whole handshake and
/// leaves the session in [`SessionState::Watching`].
pub struct Session<S> {
    transport: Transport<S>,
    codec: Codec,
    state: SessionState,
    policy: SessionPolicy,
    capabilities: Vec<Capability>,
    watched: Vec<Mailbox>,
    notify: Option<NotifyRequest>,
    outgoing: VecDeque<Vec<u8>>,
    early_changes: usize,
    last_activity: Instant,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Connects, authenticates, selects the mailboxes and issues NOTIFY.
    ///
    /// On failure the connection is closed before the error is returned.
    pub async fn connect<C>(connector: &mut C, profile: &ConnectionProfile, policy: SessionPolicy) -> Result<Self>
    where
        C: Connector<Stream = S>,
    {
        let address = profile.address();
        tracing::info!(%address, security = ?profile.security, "Connecting");

        let stream = tokio::time::timeout(policy.command_timeout, connector.connect(profile))
            .await
            .map_err(|_| Error::Connect {
                address: address.clone(),
                message: format!("timed out after {:?}", policy.command_timeout),
            })??;

        let mut session = Self {
            transport: Transport::new(stream),
            codec: Codec::new(),
            state: SessionState::Connecting,
            policy,
            capabilities: Vec::new(),
            watched: Vec::new(),
            notify: None,
            outgoing: VecDeque::new(),
            early_changes: 0,
            last_activity: Instant::now(),
        };

        match session.establish(connector, profile).await {
            Ok(()) => Ok(session),
            Err(err) => Err(session.fail(err).await),
        }
    }

    async fn establish<C>(&mut self, connector: &mut C, profile: &ConnectionProfile) -> Result<()>
    where
        C: Connector<Stream = S>,
    {
        let preauth = self.read_greeting(&profile.address()).await?;

        if profile.security == Security::StartTls {
            // STARTTLS is only valid before authentication.
            if preauth {
                return Err(Error::Unsupported("STARTTLS on a pre-authenticated connection"));
            }
            self.start_tls(connector, &profile.host).await?;
        }

        if preauth {
            tracing::info!("Server pre-authenticated the connection");
            self.transition(SessionState::Selecting);
        } else {
            self.login(profile).await?;
        }

        self.ensure_capabilities().await?;
        if !self.has_capability(&Capability::Notify) {
            return Err(Error::Unsupported("NOTIFY"));
        }

        self.transition(SessionState::Selecting);
        let filter = self.select_mailboxes(&profile.mailboxes).await?;
        self.start_notify(filter).await
    }

    async fn read_greeting(&mut self, address: &str) -> Result<bool> {
        let connect_error = |message: String| Error::Connect {
            address: address.to_string(),
            message,
        };

        let raw = self
            .transport
            .read_line(self.policy.command_timeout)
            .await
            .map_err(|e| connect_error(format!("no greeting: {e}")))?;

        match self.codec.decode(&raw) {
            ServerEvent::Condition { status, code, text } if status == Status::Ok || status == Status::PreAuth => {
                tracing::debug!(greeting = %text, "Server greeting");
                if let Some(ResponseCode::Capability(caps)) = code {
                    self.capabilities = caps;
                }
                Ok(status == Status::PreAuth)
            }
            ServerEvent::Bye { text } => Err(connect_error(format!("server refused connection: {text}"))),
            other => Err(Error::Protocol(format!("Unexpected greeting: {other:?}"))),
        }
    }

    async fn start_tls<C>(&mut self, connector: &mut C, host: &str) -> Result<()>
    where
        C: Connector<Stream = S>,
    {
        self.ensure_capabilities().await?;
        if !self.has_capability(&Capability::StartTls) {
            return Err(Error::Unsupported("STARTTLS"));
        }

        let completion = self.execute(Command::StartTls).await?;
        if completion.outcome != Status::Ok {
            return Err(Error::Rejected {
                command: "STARTTLS",
                text: completion.text,
            });
        }

        let plain = self.transport.take_stream()?;
        let tls = connector.upgrade(plain, host).await?;
        self.transport = Transport::new(tls);
        // Capabilities learned before TLS must not be trusted.
        self.capabilities.clear();
        tracing::debug!("STARTTLS negotiated");
        Ok(())
    }

    async fn login(&mut self, profile: &ConnectionProfile) -> Result<()> {
        self.ensure_capabilities().await?;
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::Auth("server does not allow LOGIN on this connection".to_string()));
        }
        self.codec
            .set_literal_plus(self.has_capability(&Capability::LiteralPlus));

        self.transition(SessionState::Authenticating);
        let completion = self
            .execute(Command::Login {
                username: profile.username.clone(),
                password: profile.secret.clone(),
            })
            .await?;

        if completion.outcome != Status::Ok {
            tracing::warn!(username = %profile.username, reason = %completion.text, "Login rejected");
            return Err(Error::Auth(completion.text));
        }
        tracing::info!(username = %profile.username, "Logged in");

        // Capabilities usually grow after login.
        match completion.code {
            Some(ResponseCode::Capability(caps)) => self.capabilities = caps,
            _ => {
                self.capabilities.clear();
                self.ensure_capabilities().await?;
            }
        }
        Ok(())
    }

    async fn ensure_capabilities(&mut self) -> Result<()> {
        if self.capabilities.is_empty() {
            let completion = self.execute(Command::Capability).await?;
            if completion.outcome != Status::Ok {
                return Err(Error::Rejected {
                    command: "CAPABILITY",
                    text: completion.text,
                });
            }
        }
        Ok(())
    }

    async fn select_mailboxes(&mut self, selection: &MailboxSelection) -> Result<MailboxFilter> {
        let mailboxes = match selection {
            MailboxSelection::All => return Ok(MailboxFilter::Personal),
            MailboxSelection::Subscribed => return Ok(MailboxFilter::Subscribed),
            MailboxSelection::Named(mailboxes) => mailboxes,
        };

        for mailbox in mailboxes {
            let command = if self.policy.read_only {
                Command::Examine {
                    mailbox: mailbox.clone(),
                }
            } else {
                Command::Select {
                    mailbox: mailbox.clone(),
                }
            };
            let completion = self.execute(command).await?;
            if completion.outcome == Status::Ok {
                tracing::debug!(%mailbox, "Mailbox selected");
                self.watched.push(mailbox.clone());
            } else {
                tracing::warn!(%mailbox, reason = %completion.text, "Cannot select mailbox, skipping it");
            }
        }

        if self.watched.is_empty() {
            return Err(Error::NoMailboxes);
        }
        Ok(MailboxFilter::Mailboxes(self.watched.clone()))
    }

    async fn start_notify(&mut self, filter: MailboxFilter) -> Result<()> {
        let request = NotifyRequest::new(filter, self.policy.events.clone());
        let completion = self.execute(Command::Notify(request.clone())).await?;
        if completion.outcome != Status::Ok {
            return Err(Error::Rejected {
                command: "NOTIFY",
                text: completion.describe(),
            });
        }

        self.notify = Some(request);
        self.transition(SessionState::Watching);
        tracing::info!(mailboxes = ?self.watched_names(), "Watching for changes");
        Ok(())
    }

    /// Sends a command and reads until its tagged completion.
    async fn execute(&mut self, command: Command) -> Result<Completion> {
        let encoded = self.codec.encode(&command);
        tracing::trace!(command = %encoded.display, "C:");

        let mut parts = encoded.parts.iter();
        if let Some(first) = parts.next() {
            self.transport.write_line(first).await?;
        }

        loop {
            let raw = self.transport.read_line(self.policy.command_timeout).await?;
            match self.codec.decode(&raw) {
                ServerEvent::CommandComplete {
                    tag,
                    outcome,
                    code,
                    text,
                    ..
                } if tag == encoded.tag => {
                    if let Some(ResponseCode::Capability(caps)) = &code {
                        self.capabilities.clone_from(caps);
                    }
                    tracing::debug!(command = %encoded.kind, %outcome, %text, "Command completed");
                    return Ok(Completion { outcome, code, text });
                }
                ServerEvent::Continuation { .. } => match parts.next() {
                    Some(part) => self.transport.write_line(part).await?,
                    None => return Err(Error::Protocol("Unexpected continuation request".to_string())),
                },
                ServerEvent::Capability(caps) => self.capabilities = caps,
                ServerEvent::Bye { text } => {
                    if encoded.kind != CommandKind::Logout {
                        return Err(Error::Bye(text));
                    }
                }
                ServerEvent::Malformed { raw, reason } => {
                    tracing::warn!(%raw, %reason, "Malformed response");
                    return Err(Error::Protocol(reason));
                }
                event => {
                    if encoded.kind == CommandKind::Notify && event.is_change() {
                        self.early_changes += 1;
                    }
                    tracing::trace!(?event, "Untagged response during {}", encoded.kind);
                }
            }
        }
    }

    /// Runs the watch loop until shutdown is requested or the connection
    /// fails.
    ///
    /// Returns `Ok(())` after a clean shutdown (LOGOUT sent, transport
    /// closed). On error the session is [`SessionState::Failed`] and the
    /// transport is closed.
    pub async fn watch<F: FnMut()>(
        &mut self,
        dispatcher: &mut Dispatcher<F>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            match self.watch_step(dispatcher, shutdown).await? {
                WatchStep::Continue => {}
                WatchStep::Shutdown => return Ok(()),
            }
        }
    }

    /// One pass of the watch loop: fire a due burst, send a keepalive if
    /// needed, then wait for one response, a shutdown request or the next
    /// deadline.
    pub async fn watch_step<F: FnMut()>(
        &mut self,
        dispatcher: &mut Dispatcher<F>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<WatchStep> {
        if self.state != SessionState::Watching {
            return Err(Error::InvalidState(format!("cannot watch while {}", self.state)));
        }
        if std::mem::take(&mut self.early_changes) > 0 {
            dispatcher.trigger();
        }
        if *shutdown.borrow_and_update() {
            self.logout().await;
            return Ok(WatchStep::Shutdown);
        }

        dispatcher.fire_if_due();

        let now = Instant::now();
        let keepalive_at = self.last_activity + self.policy.keepalive;
        if now >= keepalive_at {
            tracing::debug!("Connection idle, sending NOOP");
            if let Err(err) = self.send(&Command::Noop).await {
                return Err(self.fail(err).await);
            }
            return Ok(WatchStep::Continue);
        }

        let mut wait = self
            .policy
            .read_timeout
            .min(keepalive_at.saturating_duration_since(now));
        if let Some(deadline) = dispatcher.deadline() {
            wait = wait.min(deadline.saturating_duration_since(now));
        }

        let read = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    tracing::debug!("Shutdown sender dropped");
                    self.logout().await;
                    return Ok(WatchStep::Shutdown);
                }
                return Ok(WatchStep::Continue);
            }
            read = self.transport.read_line(wait) => read,
        };

        match read {
            Ok(raw) => {
                self.last_activity = Instant::now();
                let event = self.codec.decode(&raw);
                if let Err(err) = self.handle_event(event, dispatcher).await {
                    return Err(self.fail(err).await);
                }
                Ok(WatchStep::Continue)
            }
            Err(Error::Timeout(_)) => Ok(WatchStep::Continue),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn handle_event<F: FnMut()>(&mut self, event: ServerEvent, dispatcher: &mut Dispatcher<F>) -> Result<()> {
        match &event {
            ServerEvent::Malformed { raw, reason } => {
                tracing::warn!(%raw, %reason, "Malformed response");
                return Err(Error::Protocol(reason.clone()));
            }
            ServerEvent::Bye { text } => return Err(Error::Bye(text.clone())),
            ServerEvent::CommandComplete {
                kind: CommandKind::Notify,
                outcome,
                text,
                ..
            } if *outcome != Status::Ok => {
                return Err(Error::Rejected {
                    command: "NOTIFY",
                    text: text.clone(),
                });
            }
            ServerEvent::CommandComplete { kind, outcome, text, .. } if *outcome != Status::Ok => {
                tracing::warn!(command = %kind, %outcome, %text, "Command failed");
            }
            ServerEvent::Continuation { .. } => {
                if let Some(part) = self.outgoing.pop_front() {
                    self.transport.write_line(&part).await?;
                }
            }
            ServerEvent::Condition {
                status: Status::No | Status::Bad,
                text,
                ..
            } => tracing::warn!(%text, "Server warning"),
            _ => {}
        }

        dispatcher.on_event(&event);

        if event.is_overflow() {
            tracing::warn!("Server dropped notifications, re-issuing NOTIFY");
            if let Some(request) = self.notify.clone() {
                self.send(&Command::Notify(request)).await?;
            }
        }
        Ok(())
    }

    /// Writes a command without waiting for its completion; the watch loop
    /// picks up the response.
    async fn send(&mut self, command: &Command) -> Result<()> {
        let encoded = self.codec.encode(command);
        tracing::trace!(command = %encoded.display, "C:");
        let mut parts = encoded.parts.into_iter();
        if let Some(first) = parts.next() {
            self.transport.write_line(&first).await?;
        }
        self.outgoing.extend(parts);
        self.last_activity = Instant::now();
        Ok(())
    }

    /// Best-effort LOGOUT, then closes the transport. Errors are ignored.
    pub async fn logout(&mut self) {
        if !self.transport.is_closed() {
            let logout = tokio::time::timeout(self.policy.command_timeout, self.execute(Command::Logout)).await;
            match logout {
                Ok(Ok(_)) => tracing::debug!("Logged out"),
                Ok(Err(err)) => tracing::debug!(error = %err, "LOGOUT failed"),
                Err(_) => tracing::debug!("LOGOUT timed out"),
            }
        }
        self.transport.close().await;
        self.transition(SessionState::Disconnected);
    }

    async fn fail(&mut self, err: Error) -> Error {
        tracing::warn!(state = %self.state, error = %err, "Session failed");
        self.transition(SessionState::Failed);
        self.transport.close().await;
        err
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "Unusual state transition");
        }
        tracing::debug!(from = %self.state, to = %next, "State change");
        self.state = next;
    }

    fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    fn watched_names(&self) -> Vec<&str> {
        self.watched.iter().map(Mailbox::as_str).collect()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Mailboxes whose selection succeeded. Empty for the `All` and
    /// `Subscribed` selections.
    #[must_use]
    pub fn watched(&self) -> &[Mailbox] {
        &self.watched
    }

    /// Capabilities last announced by the server.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }
}
