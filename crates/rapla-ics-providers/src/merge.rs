//! Merging of several iCalendar exports into one.

use std::collections::HashSet;

use icalendar::{Calendar, CalendarComponent, Component, Property};
use tracing::{debug, info};

use crate::error::ProviderResult;
use crate::ics::{Absent, extend_timezones, parse_calendar, serialize, timezone_blocks};

/// Product identifier of merged calendars.
pub const MERGE_PRODUCT_ID: &str = "-//Rapla Merge//ICS//DE";

/// Result of [`merge_calendars`].
#[derive(Debug, Clone)]
pub struct Merged {
    /// The combined iCalendar payload.
    pub payload: Vec<u8>,
    /// Number of events in the payload.
    pub event_count: usize,
    /// UIDs of events dropped because an earlier event carried them.
    pub duplicate_uids: Vec<String>,
}

/// Combines `payloads` into one calendar, keeping the first event per UID.
///
/// Events are visited in payload order, then document order. An event without
/// UID counts as UID `""`, so only the first UID-less event survives. VEVENTs
/// are copied whole; other components are not carried over.
///
/// # Errors
///
/// Fails with a parse error if any payload is not a well-formed calendar.
pub fn merge_calendars<P: AsRef<[u8]>>(payloads: &[P]) -> ProviderResult<Merged> {
    let mut merged = Calendar::empty();
    merged.append_property(Property::new("PRODID", MERGE_PRODUCT_ID));
    merged.append_property(Property::new("VERSION", "2.0"));

    let mut seen = HashSet::new();
    let mut duplicate_uids = Vec::new();
    let mut event_count = 0;
    let mut absent = Vec::new();
    let mut timezones = Vec::new();

    for payload in payloads {
        let calendar = parse_calendar(payload.as_ref())?;
        extend_timezones(&mut timezones, timezone_blocks(payload.as_ref()));
        for component in calendar.iter() {
            let CalendarComponent::Event(event) = component else {
                continue;
            };
            let uid = event.get_uid().unwrap_or("").to_string();
            if seen.insert(uid.clone()) {
                absent.push(Absent::of(event));
                merged.push(event.clone());
                event_count += 1;
            } else {
                debug!(uid = %uid, "Dropping duplicate event while merging");
                duplicate_uids.push(uid);
            }
        }
    }

    info!(
        sources = payloads.len(),
        events = event_count,
        duplicates = duplicate_uids.len(),
        "Merged calendar exports"
    );

    Ok(Merged {
        payload: serialize(&merged, &absent, &timezones),
        event_count,
        duplicate_uids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::ics::parse_document;
    use crate::ics::tests::sample_ics;

    fn uids(payload: &[u8]) -> Vec<String> {
        parse_document(payload)
            .unwrap()
            .events
            .into_iter()
            .map(|e| e.uid.unwrap_or_default())
            .collect()
    }

    #[test]
    fn same_uid_keeps_first_source() {
        let a = sample_ics("-//A//EN", &[("id", "Vorlesung aus A")]);
        let b = sample_ics("-//B//EN", &[("id", "Vorlesung aus B")]);

        let merged = merge_calendars(&[a, b]).unwrap();
        let doc = parse_document(&merged.payload).unwrap();

        assert_eq!(doc.len(), 1);
        assert_eq!(doc.events[0].title(), "Vorlesung aus A");
        assert_eq!(merged.duplicate_uids, vec!["id"]);
    }

    #[test]
    fn disjoint_uids_add_up() {
        let a = sample_ics("-//A//EN", &[("a1", "Vorlesung"), ("a2", "Übung")]);
        let b = sample_ics("-//B//EN", &[("b1", "Praktikum")]);

        let merged = merge_calendars(&[a, b]).unwrap();

        assert_eq!(merged.event_count, 3);
        assert_eq!(uids(&merged.payload), vec!["a1", "a2", "b1"]);
        assert!(merged.duplicate_uids.is_empty());
    }

    #[test]
    fn merged_calendar_has_own_identity() {
        let a = sample_ics("-//A//EN", &[("a", "Vorlesung")]);
        let b = sample_ics("-//B//EN", &[("b", "Vorlesung")]);

        let merged = merge_calendars(&[a, b]).unwrap();
        let doc = parse_document(&merged.payload).unwrap();

        assert_eq!(doc.metadata.product_id.as_deref(), Some(MERGE_PRODUCT_ID));
        assert_eq!(doc.metadata.version.as_deref(), Some("2.0"));
        assert!(doc.metadata.name.is_none());
    }

    #[test]
    fn missing_uids_count_as_empty_identifier() {
        let a = sample_ics("-//A//EN", &[("", "Vorlesung 1"), ("", "Vorlesung 2")]);

        let merged = merge_calendars(&[a]).unwrap();

        assert_eq!(merged.event_count, 1);
        assert_eq!(merged.duplicate_uids, vec![""]);
    }

    #[test]
    fn uid_less_events_stay_without_uid() {
        let a = sample_ics("-//A//EN", &[("", "Vorlesung")]);
        let b = sample_ics("-//B//EN", &[("b", "Übung")]);

        let first = merge_calendars(&[a.clone(), b.clone()]).unwrap();
        let second = merge_calendars(&[a, b]).unwrap();
        let text = String::from_utf8(first.payload.clone()).unwrap();

        assert_eq!(first.payload, second.payload);
        assert_eq!(text.matches("UID:").count(), 1);
        assert_eq!(uids(&first.payload), vec!["", "b"]);
    }

    #[test]
    fn timezones_are_carried_once_per_tzid() {
        let vtimezone = "BEGIN:VTIMEZONE\r\n\
                         TZID:Europe/Berlin\r\n\
                         BEGIN:STANDARD\r\n\
                         DTSTART:19701025T030000\r\n\
                         TZOFFSETFROM:+0200\r\n\
                         TZOFFSETTO:+0100\r\n\
                         END:STANDARD\r\n\
                         END:VTIMEZONE\r\n";
        let with_zone = |prodid: &str, uid: &str| {
            sample_ics(prodid, &[(uid, "Vorlesung")])
                .replacen("BEGIN:VEVENT", &format!("{}BEGIN:VEVENT", vtimezone), 1)
        };

        let merged = merge_calendars(&[with_zone("-//A//EN", "a"), with_zone("-//B//EN", "b")])
            .unwrap();
        let text = String::from_utf8(merged.payload).unwrap();

        assert_eq!(text.matches("BEGIN:VTIMEZONE").count(), 1);
        assert!(text.contains(vtimezone));
        assert!(text.find("BEGIN:VTIMEZONE") < text.find("BEGIN:VEVENT"));
        assert_eq!(uids(text.as_bytes()), vec!["a", "b"]);
    }

    #[test]
    fn malformed_input_fails() {
        let a = sample_ics("-//A//EN", &[("a", "Vorlesung")]);
        let err = merge_calendars(&[a.into_bytes(), b"<html></html>".to_vec()]).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ParseError);
    }

    #[test]
    fn marker_without_calendar_body_fails() {
        let a = sample_ics("-//A//EN", &[("a", "Vorlesung")]);
        let junk = b"BEGIN:VCALENDAR\r\nthis is junk\r\n<html>".to_vec();

        let err = merge_calendars(&[a.into_bytes(), junk]).unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::ParseError);
    }
}
