//! Keyword allowlist filtering of calendar documents.

use chrono_tz::Tz;
use tracing::{debug, info};

use crate::event::{CalendarDocument, CalendarEvent, CalendarMetadata};

/// Default keywords: lectures, exercises (`Übung`) and lab sessions.
pub const DEFAULT_KEYWORDS: &[&str] = &["Vorlesung", "Üb", "Praktikum"];

/// Keeps events whose title contains at least one keyword.
///
/// Matching is a case-insensitive substring test, not a whole-word match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl KeywordFilter {
    /// Creates a filter from the given keywords. Blank keywords are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Returns the normalized (lowercase) keywords.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns true if `title` contains any keyword.
    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }

    /// Builds a new document with only the matching events.
    ///
    /// Metadata and time zone definitions are carried over, with the display
    /// zone defaulting to `tz`.
    /// Each kept event is rebuilt from a fixed field list and its times are
    /// expressed in `tz`. Later events repeating a UID are dropped.
    pub fn apply(&self, document: &CalendarDocument, tz: Tz) -> CalendarDocument {
        let metadata = CalendarMetadata {
            timezone: document
                .metadata
                .timezone
                .clone()
                .or_else(|| Some(tz.name().to_string())),
            ..document.metadata.clone()
        };

        let mut filtered = CalendarDocument::new(metadata);
        filtered.timezones = document.timezones.clone();
        for event in &document.events {
            if self.matches(event.title()) {
                filtered.push(retain_fields(event, tz));
            } else {
                debug!(summary = %event.title(), "Event filtered out");
            }
        }
        filtered.dedup_by_uid();

        info!(
            kept = filtered.len(),
            total = document.len(),
            "Filtered events by keyword"
        );
        filtered
    }
}

/// Copies the fields that make up an event's public contract.
fn retain_fields(event: &CalendarEvent, tz: Tz) -> CalendarEvent {
    CalendarEvent {
        uid: event.uid.clone(),
        summary: event.summary.clone(),
        description: event.description.clone(),
        location: event.location.clone(),
        categories: event.categories.clone(),
        url: event.url.clone(),
        created: event.created,
        last_modified: event.last_modified,
        stamp: event.stamp,
        start: event.start.as_ref().map(|t| t.in_zone(tz)),
        end: event.end.as_ref().map(|t| t.in_zone(tz)),
    }
}
