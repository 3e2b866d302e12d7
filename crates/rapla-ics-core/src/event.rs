//! Calendar document and event types.
//!
//! A [`CalendarDocument`] is the in-memory form of one iCalendar payload: the
//! calendar-level header fields in [`CalendarMetadata`] plus an ordered list
//! of [`CalendarEvent`]s. Documents are built per acquisition run, pass through
//! merge/filter stages and are serialized once.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::time::EventTime;

/// Calendar-level header fields carried over between documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarMetadata {
    /// `PRODID`
    pub product_id: Option<String>,
    /// `VERSION`
    pub version: Option<String>,
    /// `CALSCALE`
    pub scale: Option<String>,
    /// `METHOD`
    pub method: Option<String>,
    /// `X-WR-CALNAME`
    pub name: Option<String>,
    /// `X-WR-TIMEZONE`
    pub timezone: Option<String>,
}

impl CalendarMetadata {
    /// Creates metadata with the given product identifier and version 2.0.
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: Some(product_id.into()),
            version: Some("2.0".to_string()),
            ..Self::default()
        }
    }

    /// Builder method to set the display time zone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Builder method to set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One schedule entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Identifier (`UID`). Missing in scraped and some malformed events.
    pub uid: Option<String>,
    /// Title (`SUMMARY`).
    pub summary: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Location (usually the room).
    pub location: Option<String>,
    /// Categories, in source order.
    pub categories: Vec<String>,
    /// Canonical URL.
    pub url: Option<String>,
    /// `CREATED`
    pub created: Option<DateTime<Utc>>,
    /// `LAST-MODIFIED`
    pub last_modified: Option<DateTime<Utc>>,
    /// `DTSTAMP`
    pub stamp: Option<DateTime<Utc>>,
    /// Start time.
    pub start: Option<EventTime>,
    /// End time.
    pub end: Option<EventTime>,
}

impl CalendarEvent {
    /// Creates an event with a title and a start/end pair.
    pub fn new(summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            summary: Some(summary.into()),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Builder method to set the identifier.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the `DTSTAMP`.
    pub fn with_stamp(mut self, stamp: DateTime<Utc>) -> Self {
        self.stamp = Some(stamp);
        self
    }

    /// Returns the identifier, or an empty string when absent.
    pub fn uid_key(&self) -> &str {
        self.uid.as_deref().unwrap_or("")
    }

    /// Returns the title, or an empty string when absent.
    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }
}

/// An iCalendar document: metadata plus ordered events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarDocument {
    /// Calendar-level header fields.
    pub metadata: CalendarMetadata,
    /// Events in document order.
    pub events: Vec<CalendarEvent>,
    /// Raw `VTIMEZONE` components of the source, one per TZID, carried as is.
    pub timezones: Vec<String>,
}

impl CalendarDocument {
    /// Creates an empty document with the given metadata.
    pub fn new(metadata: CalendarMetadata) -> Self {
        Self {
            metadata,
            events: Vec::new(),
            timezones: Vec::new(),
        }
    }

    /// Appends an event.
    pub fn push(&mut self, event: CalendarEvent) {
        self.events.push(event);
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when the document has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops every event whose non-empty UID was already seen.
    ///
    /// First occurrence wins. Returns the dropped UIDs in encounter order.
    pub fn dedup_by_uid(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dropped = Vec::new();
        self.events.retain(|event| match event.uid.as_deref() {
            Some(uid) if !uid.is_empty() => {
                if seen.insert(uid.to_string()) {
                    true
                } else {
                    debug!(uid = %uid, "Dropping duplicate event");
                    dropped.push(uid.to_string());
                    false
                }
            }
            _ => true,
        });
        dropped
    }
}
