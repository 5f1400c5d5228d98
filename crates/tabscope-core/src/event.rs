#![forbid(unsafe_code)]

//! Event records and immutable snapshots.
//!
//! An [`Event`] is the well-formed, strongly typed form of one application
//! event. The event source hands us loosely typed [`RawEvent`] records; those
//! are validated once, when a [`Snapshot`] is built, and anything without a
//! usable timestamp is set aside in [`Snapshot::rejected`] instead of leaking
//! into windowing, layout, or statistics.
//!
//! Snapshots never change after construction. Every derived view (trees,
//! windows, lanes) is a pure function of a snapshot plus configuration, and
//! [`Snapshot::fingerprint`] is the identity those views are memoized under.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Identifier of an event, unique within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl EventId {
    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tab grouping key. One hierarchy root and one lane exist per distinct tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl TabId {
    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tab {}", self.0)
    }
}

/// Millisecond-precision instant, counted from the Unix epoch (UTC).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The epoch itself.
    pub const EPOCH: Self = Self(0);

    /// Build a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// Epoch milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Absolute distance to `other` in milliseconds.
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Offset by a signed number of milliseconds, saturating at the i64 range.
    #[must_use]
    pub const fn saturating_add_millis(self, delta: i64) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Parse the textual forms event sources emit.
    ///
    /// Accepted: RFC 3339 (`2024-05-01T09:00:01.250Z`), ISO 8601 without an
    /// offset (read as UTC), a bare calendar date (midnight UTC), or an integer
    /// count of epoch milliseconds.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
            return Self::from_datetime(dt);
        }
        if let Ok(dt) = PrimitiveDateTime::parse(text, &Iso8601::DEFAULT) {
            return Self::from_datetime(dt.assume_utc());
        }
        if let Ok(date) = Date::parse(text, format_description!("[year]-[month]-[day]")) {
            return Self::from_datetime(date.midnight().assume_utc());
        }
        text.parse::<i64>().ok().map(Self)
    }

    fn from_datetime(dt: OffsetDateTime) -> Option<Self> {
        let ms = dt.unix_timestamp_nanos().div_euclid(1_000_000);
        i64::try_from(ms).ok().map(Self)
    }

    fn to_datetime(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * 1_000_000).ok()
    }

    /// Wall-clock `HH:MM:SS` in UTC.
    #[must_use]
    pub fn format_hms(self) -> String {
        self.to_datetime()
            .and_then(|dt| dt.format(format_description!("[hour]:[minute]:[second]")).ok())
            .unwrap_or_else(|| "--:--:--".to_string())
    }

    /// Wall-clock `HH:MM:SS.mmm` in UTC.
    #[must_use]
    pub fn format_precise(self) -> String {
        self.to_datetime()
            .and_then(|dt| {
                dt.format(format_description!(
                    "[hour]:[minute]:[second].[subsecond digits:3]"
                ))
                .ok()
            })
            .unwrap_or_else(|| "--:--:--.---".to_string())
    }

    /// Whether this instant lies inside the calendar range the formatter
    /// supports (years -9999 through 9999).
    #[must_use]
    pub fn is_calendar(self) -> bool {
        self.to_datetime().is_some()
    }

    /// RFC 3339 in UTC with millisecond precision, e.g. `2024-05-01T09:00:01.25Z`.
    /// `None` outside the calendar range the formatter supports.
    #[must_use]
    pub fn format_rfc3339(self) -> Option<String> {
        self.to_datetime().and_then(|dt| dt.format(&Rfc3339).ok())
    }
}

/// Coarse scope tag carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// No scope: the event is an action.
    #[default]
    None,
    Page,
    Left,
    Widget,
}

impl Scope {
    /// Interpret a loosely typed scope tag. Unknown tags read as [`Scope::None`].
    #[must_use]
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("page") => Self::Page,
            Some("left") => Self::Left,
            Some("widget") => Self::Widget,
            _ => Self::None,
        }
    }

    /// Whether events with this scope open a container.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Page | Self::Left)
    }

    /// Lowercase tag, `None` for unscoped events.
    #[must_use]
    pub const fn tag(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Page => Some("page"),
            Self::Left => Some("left"),
            Self::Widget => Some("widget"),
        }
    }
}

/// One immutable, well-formed application event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub user_id: u64,
    pub label: String,
    pub parent_id: Option<EventId>,
    pub scope: Scope,
    pub tab_id: TabId,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an unscoped, unparented event with an empty label.
    #[must_use]
    pub fn new(id: u64, tab_id: u64, timestamp_ms: i64) -> Self {
        Self {
            id: EventId(id),
            user_id: 0,
            label: String::new(),
            parent_id: None,
            scope: Scope::None,
            tab_id: TabId(tab_id),
            timestamp: Timestamp::from_millis(timestamp_ms),
        }
    }

    /// Set the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the parent pointer.
    #[must_use]
    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent_id = Some(EventId(parent));
        self
    }

    /// Set the label text.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the user id.
    #[must_use]
    pub fn with_user(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }

    /// Ordering key used everywhere events are sorted: time, then id.
    #[must_use]
    pub fn order_key(&self) -> (Timestamp, EventId) {
        (self.timestamp, self.id)
    }

    /// Breadcrumb such as `Tab 3 → page → checkout`.
    #[must_use]
    pub fn hierarchy_path(&self) -> String {
        let mut path = self.tab_id.to_string();
        if let Some(tag) = self.scope.tag() {
            path.push_str(" → ");
            path.push_str(tag);
        }
        path.push_str(" → ");
        path.push_str(&self.label);
        path
    }
}

/// Timestamp as it arrives from the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// Loosely typed event record as produced by the event source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: u64,
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    pub tab_id: u64,
    #[serde(default)]
    pub date: Option<RawTimestamp>,
}

impl TryFrom<RawEvent> for Event {
    type Error = EventError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let id = EventId(raw.id);
        let timestamp = match raw.date {
            None => return Err(EventError::MissingTimestamp { id }),
            Some(RawTimestamp::Millis(ms)) => Timestamp::from_millis(ms),
            Some(RawTimestamp::Text(text)) => match Timestamp::parse(&text) {
                Some(ts) => ts,
                None => return Err(EventError::InvalidTimestamp { id, value: text }),
            },
        };
        Ok(Self {
            id,
            user_id: raw.user_id,
            label: raw.action.or(raw.property).unwrap_or_default(),
            parent_id: raw.parent_id.map(EventId),
            scope: Scope::from_tag(raw.scope.as_deref()),
            tab_id: TabId(raw.tab_id),
            timestamp,
        })
    }
}

/// Why a raw record could not become an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    MissingTimestamp { id: EventId },
    InvalidTimestamp { id: EventId, value: String },
    /// Timestamp parses but lies outside years -9999 through 9999.
    OutOfRange { id: EventId, millis: i64 },
}

impl EventError {
    /// Id of the offending record.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::MissingTimestamp { id }
            | Self::InvalidTimestamp { id, .. }
            | Self::OutOfRange { id, .. } => *id,
        }
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTimestamp { id } => write!(f, "event {id} has no timestamp"),
            Self::InvalidTimestamp { id, value } => {
                write!(f, "event {id} has unparseable timestamp {value:?}")
            }
            Self::OutOfRange { id, millis } => {
                write!(f, "event {id} timestamp {millis} ms is outside the calendar range")
            }
        }
    }
}

impl std::error::Error for EventError {}

// Windows, axes and RFC 3339 export all assume a representable calendar date.
fn within_calendar(event: Event) -> Result<Event, EventError> {
    if event.timestamp.is_calendar() {
        Ok(event)
    } else {
        Err(EventError::OutOfRange {
            id: event.id,
            millis: event.timestamp.as_millis(),
        })
    }
}

/// Content hash identifying a snapshot for memoization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotFingerprint(pub u64);

/// Immutable set of events that every derived view is computed from.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    events: Vec<Arc<Event>>,
    rejected: Vec<EventError>,
    fingerprint: SnapshotFingerprint,
}

impl Snapshot {
    /// Build a snapshot from already well-formed events. Events outside the
    /// calendar range are set aside in [`rejected`](Self::rejected).
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self::collect(events.into_iter().map(Ok))
    }

    /// Validate raw records; malformed ones are kept aside in [`rejected`](Self::rejected).
    #[must_use]
    pub fn from_raw(records: impl IntoIterator<Item = RawEvent>) -> Self {
        Self::collect(records.into_iter().map(Event::try_from))
    }

    fn collect(results: impl Iterator<Item = Result<Event, EventError>>) -> Self {
        let mut events = Vec::new();
        let mut rejected = Vec::new();
        for result in results {
            match result.and_then(within_calendar) {
                Ok(event) => events.push(Arc::new(event)),
                Err(err) => {
                    crate::warn!(event_id = err.event_id().get(), error = %err, "rejected malformed event");
                    rejected.push(err);
                }
            }
        }
        Self::assemble(events, rejected)
    }

    fn assemble(events: Vec<Arc<Event>>, rejected: Vec<EventError>) -> Self {
        let mut hasher = DefaultHasher::new();
        events.len().hash(&mut hasher);
        for event in &events {
            event.hash(&mut hasher);
        }
        let fingerprint = SnapshotFingerprint(hasher.finish());
        crate::debug!(
            events = events.len(),
            rejected = rejected.len(),
            fingerprint = fingerprint.0,
            "snapshot assembled"
        );
        Self {
            events,
            rejected,
            fingerprint,
        }
    }

    /// Well-formed events, in source order.
    #[must_use]
    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    /// Records excluded because their timestamp was missing or unparseable.
    #[must_use]
    pub fn rejected(&self) -> &[EventError] {
        &self.rejected
    }

    /// Content identity used as a memoization key.
    #[must_use]
    pub const fn fingerprint(&self) -> SnapshotFingerprint {
        self.fingerprint
    }

    /// Number of well-formed events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the snapshot has no well-formed events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Earliest and latest timestamps, if any.
    #[must_use]
    pub fn time_bounds(&self) -> Option<(Timestamp, Timestamp)> {
        let first = self.events.first()?.timestamp;
        Some(self.events.iter().fold((first, first), |(lo, hi), e| {
            (lo.min(e.timestamp), hi.max(e.timestamp))
        }))
    }
}
