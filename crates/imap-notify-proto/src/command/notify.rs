//! `NOTIFY` (RFC 5465) arguments.

use std::fmt;

use thiserror::Error;

use crate::types::Mailbox;

/// An RFC 5465 event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyEvent {
    /// New message in a mailbox.
    MessageNew,
    /// Message expunged.
    MessageExpunge,
    /// Flags of a message changed.
    FlagChange,
    /// Annotation of a message changed.
    AnnotationChange,
    /// Mailbox created, deleted or renamed.
    MailboxName,
    /// Mailbox subscribed or unsubscribed.
    SubscriptionChange,
    /// Mailbox metadata changed.
    MailboxMetadataChange,
    /// Server metadata changed.
    ServerMetadataChange,
}

impl NotifyEvent {
    const ALL: [Self; 8] = [
        Self::MessageNew,
        Self::MessageExpunge,
        Self::FlagChange,
        Self::AnnotationChange,
        Self::MailboxName,
        Self::SubscriptionChange,
        Self::MailboxMetadataChange,
        Self::ServerMetadataChange,
    ];

    /// Parses an event name, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str().eq_ignore_ascii_case(name))
    }

    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageNew => "MessageNew",
            Self::MessageExpunge => "MessageExpunge",
            Self::FlagChange => "FlagChange",
            Self::AnnotationChange => "AnnotationChange",
            Self::MailboxName => "MailboxName",
            Self::SubscriptionChange => "SubscriptionChange",
            Self::MailboxMetadataChange => "MailboxMetadataChange",
            Self::ServerMetadataChange => "ServerMetadataChange",
        }
    }

    /// True for events about individual messages, the only kind allowed on
    /// the `SELECTED` filter.
    #[must_use]
    pub const fn is_message_event(self) -> bool {
        matches!(
            self,
            Self::MessageNew | Self::MessageExpunge | Self::FlagChange | Self::AnnotationChange
        )
    }
}

impl fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an event list cannot be sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSetError {
    /// Name is not an RFC 5465 event.
    #[error("Unknown NOTIFY event: {0}")]
    Unknown(String),
    /// No events given.
    #[error("NOTIFY event list is empty")]
    Empty,
    /// `FlagChange`/`AnnotationChange` without both message events.
    #[error("{0} requires MessageNew and MessageExpunge")]
    MissingMessageEvents(NotifyEvent),
    /// Only one of `MessageNew` and `MessageExpunge`.
    #[error("MessageNew and MessageExpunge must be requested together, got only {0}")]
    UnpairedMessageEvent(NotifyEvent),
}

/// Validated, duplicate-free list of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSet(Vec<NotifyEvent>);

impl EventSet {
    /// Builds a set from event names.
    ///
    /// # Errors
    ///
    /// Fails on unknown names, an empty list, `MessageNew` without
    /// `MessageExpunge` (or the reverse), or `FlagChange` /
    /// `AnnotationChange` without both of them.
    pub fn from_names<I, S>(names: I) -> Result<Self, EventSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let events = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                NotifyEvent::parse(name).ok_or_else(|| EventSetError::Unknown(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(events)
    }

    /// Builds a set from parsed events.
    ///
    /// # Errors
    ///
    /// See [`EventSet::from_names`].
    pub fn new(events: impl IntoIterator<Item = NotifyEvent>) -> Result<Self, EventSetError> {
        let mut unique = Vec::new();
        for event in events {
            if !unique.contains(&event) {
                unique.push(event);
            }
        }
        if unique.is_empty() {
            return Err(EventSetError::Empty);
        }
        let set = Self(unique);
        if !set.message_events().is_empty() {
            set.check_dependencies()?;
        }
        Ok(set)
    }

    fn check_dependencies(&self) -> Result<(), EventSetError> {
        let complete = self.contains(NotifyEvent::MessageNew) && self.contains(NotifyEvent::MessageExpunge);
        for dependent in [NotifyEvent::FlagChange, NotifyEvent::AnnotationChange] {
            if self.contains(dependent) && !complete {
                return Err(EventSetError::MissingMessageEvents(dependent));
            }
        }
        for event in [NotifyEvent::MessageNew, NotifyEvent::MessageExpunge] {
            if self.contains(event) && !complete {
                return Err(EventSetError::UnpairedMessageEvent(event));
            }
        }
        Ok(())
    }

    /// Returns true if the event is in the set.
    #[must_use]
    pub fn contains(&self, event: NotifyEvent) -> bool {
        self.0.contains(&event)
    }

    /// Iterates over the events in order.
    pub fn iter(&self) -> impl Iterator<Item = NotifyEvent> + '_ {
        self.0.iter().copied()
    }

    /// The message-level subset, used for the `SELECTED` filter.
    #[must_use]
    pub fn message_events(&self) -> Vec<NotifyEvent> {
        self.iter().filter(|e| e.is_message_event()).collect()
    }
}

impl Default for EventSet {
    fn default() -> Self {
        Self(vec![
            NotifyEvent::MessageNew,
            NotifyEvent::MessageExpunge,
            NotifyEvent::FlagChange,
            NotifyEvent::MailboxName,
            NotifyEvent::SubscriptionChange,
        ])
    }
}

/// Which mailboxes the second filter of `NOTIFY SET` covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxFilter {
    /// Every mailbox in the user's personal namespace.
    Personal,
    /// Every subscribed mailbox.
    Subscribed,
    /// An explicit list.
    Mailboxes(Vec<Mailbox>),
}

/// Arguments of `NOTIFY SET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequest {
    /// Mailbox filter.
    pub filter: MailboxFilter,
    /// Events requested for the filter; the `SELECTED` filter receives the
    /// message-level subset.
    pub events: EventSet,
}

impl NotifyRequest {
    /// Creates a request.
    #[must_use]
    pub const fn new(filter: MailboxFilter, events: EventSet) -> Self {
        Self { filter, events }
    }
}
