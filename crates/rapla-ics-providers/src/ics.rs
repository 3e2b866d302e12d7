//! ICS/iCalendar codec.
//!
//! Converts between raw iCalendar payloads and [`CalendarDocument`], and hosts
//! the payload-level keyword filter.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
    Property,
};
use tracing::{debug, warn};

use rapla_ics_core::{CalendarDocument, CalendarEvent, CalendarMetadata, EventTime, KeywordFilter};

use crate::error::{ProviderError, ProviderResult};
use crate::http::is_calendar_payload;

/// Parses a payload into an `icalendar` calendar.
///
/// Fails with a parse error when the marker is missing, when a line is not a
/// content line, or when `BEGIN`/`END` do not nest up to `END:VCALENDAR`.
pub fn parse_calendar(payload: &[u8]) -> ProviderResult<Calendar> {
    if !is_calendar_payload(payload) {
        return Err(ProviderError::parse("Payload is not an iCalendar document"));
    }
    let text = String::from_utf8_lossy(payload);
    let text = text.trim_start_matches('\u{feff}');

    check_structure(text)
        .map_err(|e| ProviderError::parse(format!("Malformed ICS content: {}", e)))?;

    text.parse::<Calendar>()
        .map_err(|e| ProviderError::parse(format!("Failed to parse ICS content: {}", e)))
}

/// Parses a payload into a [`CalendarDocument`].
pub fn parse_document(payload: &[u8]) -> ProviderResult<CalendarDocument> {
    let calendar = parse_calendar(payload)?;

    let mut document = CalendarDocument::new(read_metadata(&calendar));
    extend_timezones(&mut document.timezones, timezone_blocks(payload));
    for component in calendar.iter() {
        if let CalendarComponent::Event(event) = component {
            document.push(read_event(event));
        }
    }

    debug!(
        events = document.len(),
        timezones = document.timezones.len(),
        "Parsed calendar document"
    );
    Ok(document)
}

/// Serializes a document to iCalendar bytes.
///
/// The output depends only on the document: events without UID or stamp are
/// written without `UID` or `DTSTAMP`.
pub fn render_document(document: &CalendarDocument) -> Vec<u8> {
    let mut calendar = Calendar::empty();
    write_metadata(&mut calendar, &document.metadata);

    let mut absent = Vec::with_capacity(document.len());
    for event in &document.events {
        let ical = write_event(event);
        absent.push(Absent::of(&ical));
        calendar.push(ical);
    }
    serialize(&calendar, &absent, &document.timezones)
}

/// Keeps only events whose title matches `filter`, normalized to `tz`.
pub fn filter_payload(payload: &[u8], filter: &KeywordFilter, tz: Tz) -> ProviderResult<Vec<u8>> {
    let document = parse_document(payload)?;
    let filtered = filter.apply(&document, tz);
    Ok(render_document(&filtered))
}

/// Properties a VEVENT did not carry before serialization.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Absent {
    uid: bool,
    stamp: bool,
}

impl Absent {
    pub(crate) fn of(event: &Event) -> Self {
        Self {
            uid: event.property_value("UID").is_none(),
            stamp: event.property_value("DTSTAMP").is_none(),
        }
    }

    fn drops(self, line: &str) -> bool {
        (self.uid && line.starts_with("UID:")) || (self.stamp && line.starts_with("DTSTAMP:"))
    }
}

/// Writes `calendar` with `timezones` ahead of its first component.
///
/// `icalendar` fills in a random `UID` and the current time as `DTSTAMP` for
/// events lacking them. `absent` holds one entry per VEVENT in order; the
/// filled-in lines of those events are left out again.
pub(crate) fn serialize(calendar: &Calendar, absent: &[Absent], timezones: &[String]) -> Vec<u8> {
    let text = calendar.to_string();
    let extra: usize = timezones.iter().map(String::len).sum();
    let mut out = String::with_capacity(text.len() + extra);

    let mut events = absent.iter().copied();
    let mut current = Absent::default();
    let mut pending = Some(timezones);
    let mut depth = 0usize;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        let begin = content.starts_with("BEGIN:");
        let end = content.starts_with("END:");

        if depth == 1
            && (begin || end)
            && let Some(blocks) = pending.take()
        {
            blocks.iter().for_each(|block| out.push_str(block));
        }

        if begin {
            depth += 1;
            if depth == 2 && content == "BEGIN:VEVENT" {
                current = events.next().unwrap_or_default();
            }
        } else if end {
            if depth == 2 {
                current = Absent::default();
            }
            depth = depth.saturating_sub(1);
        } else if depth == 2 && current.drops(content) {
            continue;
        }
        out.push_str(line);
    }

    out.into_bytes()
}

/// Checks that every line is a content line and that components nest.
fn check_structure(text: &str) -> Result<(), String> {
    let mut open: Vec<String> = Vec::new();
    let mut closed = false;

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        if line.trim().is_empty() || line.starts_with([' ', '\t']) {
            continue;
        }
        if closed {
            return Err(format!("content after END:VCALENDAR on line {}", number));
        }

        let Some(split) = line.find([':', ';']) else {
            return Err(format!("line {} is not a content line", number));
        };
        let name = &line[..split];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("invalid property name on line {}", number));
        }
        let value = line[split + 1..].trim().to_ascii_uppercase();

        if name.eq_ignore_ascii_case("BEGIN") {
            if open.is_empty() && value != "VCALENDAR" {
                return Err(format!("BEGIN:{} outside VCALENDAR on line {}", value, number));
            }
            open.push(value);
        } else if name.eq_ignore_ascii_case("END") {
            if open.pop().as_deref() != Some(value.as_str()) {
                return Err(format!("unbalanced END:{} on line {}", value, number));
            }
            closed = open.is_empty();
        } else if open.is_empty() {
            return Err(format!("property outside VCALENDAR on line {}", number));
        }
    }

    if closed {
        Ok(())
    } else {
        Err("missing END:VCALENDAR".to_string())
    }
}

/// Extracts the raw VTIMEZONE components of a payload, CRLF-terminated.
pub(crate) fn timezone_blocks(payload: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(payload);
    let mut blocks = Vec::new();
    let mut block: Option<String> = None;

    for line in text.lines() {
        if line.trim().eq_ignore_ascii_case("BEGIN:VTIMEZONE") {
            block = Some(String::new());
        }
        let Some(current) = block.as_mut() else {
            continue;
        };
        current.push_str(line);
        current.push_str("\r\n");
        if line.trim().eq_ignore_ascii_case("END:VTIMEZONE") {
            blocks.extend(block.take());
        }
    }
    blocks
}

/// Appends `blocks` to `timezones`, skipping TZIDs already present.
pub(crate) fn extend_timezones(timezones: &mut Vec<String>, blocks: Vec<String>) {
    for block in blocks {
        let tzid = timezone_id(&block);
        if timezones.iter().all(|known| timezone_id(known) != tzid) {
            timezones.push(block);
        }
    }
}

fn timezone_id(block: &str) -> Option<&str> {
    block
        .lines()
        .find_map(|line| line.strip_prefix("TZID:"))
        .map(str::trim)
}

/// Reads the calendar-level header fields.
fn read_metadata(calendar: &Calendar) -> CalendarMetadata {
    let mut metadata = CalendarMetadata::default();
    for property in &calendar.properties {
        let value = Some(property.value().to_string());
        match property.key().to_ascii_uppercase().as_str() {
            "PRODID" => metadata.product_id = value,
            "VERSION" => metadata.version = value,
            "CALSCALE" => metadata.scale = value,
            "METHOD" => metadata.method = value,
            "X-WR-CALNAME" => metadata.name = value,
            "X-WR-TIMEZONE" => metadata.timezone = value,
            _ => {}
        }
    }
    metadata
}

fn write_metadata(calendar: &mut Calendar, metadata: &CalendarMetadata) {
    let fields = [
        ("PRODID", &metadata.product_id),
        ("VERSION", &metadata.version),
        ("CALSCALE", &metadata.scale),
        ("METHOD", &metadata.method),
        ("X-WR-CALNAME", &metadata.name),
        ("X-WR-TIMEZONE", &metadata.timezone),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            calendar.append_property(Property::new(key, value.as_str()));
        }
    }
}

/// Converts a VEVENT into a [`CalendarEvent`].
pub fn read_event(event: &Event) -> CalendarEvent {
    let categories = event
        .property_value("CATEGORIES")
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    CalendarEvent {
        uid: event.get_uid().map(str::to_string),
        summary: event.get_summary().map(str::to_string),
        description: event.get_description().map(str::to_string),
        location: event.get_location().map(str::to_string),
        categories,
        url: event.property_value("URL").map(str::to_string),
        created: event.property_value("CREATED").and_then(parse_utc_stamp),
        last_modified: event
            .property_value("LAST-MODIFIED")
            .and_then(parse_utc_stamp),
        stamp: event.get_timestamp(),
        start: event.get_start().map(convert_date_time),
        end: event.get_end().map(convert_date_time),
    }
}

/// Converts a [`CalendarEvent`] into a VEVENT.
pub fn write_event(event: &CalendarEvent) -> Event {
    let mut ical = Event::new();

    if let Some(ref uid) = event.uid {
        ical.uid(uid);
    }
    if let Some(ref summary) = event.summary {
        ical.summary(summary);
    }
    if let Some(ref description) = event.description {
        ical.description(description);
    }
    if let Some(ref location) = event.location {
        ical.location(location);
    }
    if !event.categories.is_empty() {
        ical.add_property("CATEGORIES", &event.categories.join(","));
    }
    if let Some(ref url) = event.url {
        ical.add_property("URL", url.as_str());
    }
    if let Some(stamp) = event.stamp {
        ical.timestamp(stamp);
    }
    if let Some(created) = event.created {
        ical.add_property("CREATED", &format_utc_stamp(created));
    }
    if let Some(modified) = event.last_modified {
        ical.add_property("LAST-MODIFIED", &format_utc_stamp(modified));
    }
    if let Some(ref start) = event.start {
        ical.starts(to_date_perhaps_time(start));
    }
    if let Some(ref end) = event.end {
        ical.ends(to_date_perhaps_time(end));
    }

    ical
}

/// Converts icalendar DatePerhapsTime to EventTime.
///
/// A `TZID` that is not an IANA name is treated as floating, so that it is
/// later anchored in the configured zone.
fn convert_date_time(dt: DatePerhapsTime) -> EventTime {
    match dt {
        DatePerhapsTime::Date(date) => EventTime::from_date(date),
        DatePerhapsTime::DateTime(cdt) => match cdt {
            CalendarDateTime::Utc(dt) => EventTime::from_utc(dt),
            CalendarDateTime::Floating(naive) => EventTime::Floating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                match tzid.trim_start_matches('/').parse::<Tz>() {
                    Ok(tz) => EventTime::from_local(date_time, tz),
                    Err(_) => {
                        warn!(tzid = %tzid, "Unknown TZID, treating time as floating");
                        EventTime::Floating(date_time)
                    }
                }
            }
        },
    }
}

fn to_date_perhaps_time(time: &EventTime) -> DatePerhapsTime {
    match time {
        EventTime::Date(date) => DatePerhapsTime::Date(*date),
        EventTime::Floating(naive) => DatePerhapsTime::DateTime(CalendarDateTime::Floating(*naive)),
        EventTime::Zoned(dt) if dt.timezone() == Tz::UTC => {
            DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt.with_timezone(&Utc)))
        }
        EventTime::Zoned(dt) => DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone {
            date_time: dt.naive_local(),
            tzid: dt.timezone().name().to_string(),
        }),
    }
}

/// Parses a UTC iCalendar timestamp such as `20250205T100000Z`.
///
/// Values without the `Z` suffix are read as UTC too; date-only values map to
/// midnight.
fn parse_utc_stamp(s: &str) -> Option<chrono::DateTime<Utc>> {
    let s = s.trim();

    if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        let date = NaiveDate::parse_from_str(s, "%Y%m%d").ok()?;
        return Some(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
    }

    let dt = NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%dT%H%M%S").ok()?;
    Some(Utc.from_utc_datetime(&dt))
}

fn format_utc_stamp(dt: chrono::DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}
