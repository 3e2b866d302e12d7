//! Date and time-range heuristics for rendered schedule pages.
//!
//! Rapla week views print day headers like `Mo 12.11.` or `12.11.2025` and
//! reservation blocks like `10:00 - 11:30 Lineare Algebra`. The helpers here
//! recognise those fragments in plain text; walking the markup is left to the
//! scraper.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use regex::Regex;

/// `day.month` with an optional two- or four-digit year.
static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\.(\d{1,2})(?:\.(\d{4}|\d{2}))?").expect("Invalid date regex")
});

/// `H:MM - H:MM` on a 24-hour clock; hyphen or en dash.
static TIME_RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\s*[-–]\s*([01]?\d|2[0-3]):([0-5]\d)\b")
        .expect("Invalid time range regex")
});

/// Characters trimmed from both ends of a title once the time range is cut out.
const TITLE_SEPARATORS: &[char] = &[' ', '-', '–', ':'];

/// A time range found in a text fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    /// Start wall-clock time.
    pub start: NaiveTime,
    /// End wall-clock time.
    pub end: NaiveTime,
    /// Byte span of the match in the searched text.
    pub span: Range<usize>,
}

impl TimeRange {
    /// Returns the text that remains once the matched range is removed,
    /// with surrounding separators trimmed and whitespace collapsed.
    pub fn title_from(&self, text: &str) -> String {
        let matched = &text[self.span.clone()];
        let stripped = text.replace(matched, " ");
        collapse_whitespace(&stripped)
            .trim_matches(TITLE_SEPARATORS)
            .to_string()
    }
}

/// Finds the first `H:MM - H:MM` range in `text`.
pub fn find_time_range(text: &str) -> Option<TimeRange> {
    let caps = TIME_RANGE_REGEX.captures(text)?;
    let whole = caps.get(0)?;
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let start = NaiveTime::from_hms_opt(number(1)?, number(2)?, 0)?;
    let end = NaiveTime::from_hms_opt(number(3)?, number(4)?, 0)?;

    Some(TimeRange {
        start,
        end,
        span: whole.range(),
    })
}

/// Parses the first `day.month(.year)?` fragment in `text`.
///
/// A two-digit year is taken as 20xx; a missing year is the year of `today`.
/// Only the first fragment is considered, and an impossible date (`31.02.`)
/// yields `None`.
pub fn find_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = DATE_REGEX.captures(text)?;
    let day = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let year = match caps.get(3) {
        Some(y) if y.as_str().len() == 4 => y.as_str().parse::<i32>().ok()?,
        Some(y) => 2000 + y.as_str().parse::<i32>().ok()?,
        None => today.year(),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Collects the distinct valid dates of `texts`, sorted ascending.
pub fn week_dates<'a, I>(texts: I, today: NaiveDate) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut days: Vec<NaiveDate> = texts
        .into_iter()
        .filter_map(|text| find_date(text, today))
        .collect();
    days.sort();
    days.dedup();
    days
}

/// Picks the week day an undated reservation most likely belongs to.
///
/// This is the earliest date that is not more than one day in the past,
/// falling back to the earliest date overall. `dates` must be sorted.
pub fn nearest_week_day(dates: &[NaiveDate], today: NaiveDate) -> Option<NaiveDate> {
    let threshold = today - Duration::days(1);
    dates
        .iter()
        .copied()
        .find(|date| *date >= threshold)
        .or_else(|| dates.first().copied())
}

/// Joins whitespace runs into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn finds_time_range_with_spaces() {
        let range = find_time_range("10:00 - 11:30 Lineare Algebra").unwrap();
        assert_eq!(range.start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(range.end, NaiveTime::from_hms_opt(11, 30, 0).unwrap());
        assert_eq!(range.span, 0..13);
    }

    #[test]
    fn finds_single_digit_hour_and_en_dash() {
        let range = find_time_range("Analysis 8:15–9:45").unwrap();
        assert_eq!(range.start, NaiveTime::from_hms_opt(8, 15, 0).unwrap());
        assert_eq!(range.end, NaiveTime::from_hms_opt(9, 45, 0).unwrap());
    }

    #[test]
    fn rejects_out_of_range_clock() {
        assert!(find_time_range("25:00 - 26:00").is_none());
        assert!(find_time_range("no times here").is_none());
    }

    #[test]
    fn title_trims_separators() {
        let text = "10:00 - 11:30 Lineare Algebra";
        let range = find_time_range(text).unwrap();
        assert_eq!(range.title_from(text), "Lineare Algebra");

        let text = "Vorlesung Mathe: 08:00-09:30";
        let range = find_time_range(text).unwrap();
        assert_eq!(range.title_from(text), "Vorlesung Mathe");
    }

    #[test]
    fn title_collapses_inner_gap() {
        let text = "Praktikum 13:00 - 15:00 Physik";
        let range = find_time_range(text).unwrap();
        assert_eq!(range.title_from(text), "Praktikum Physik");
    }

    #[test]
    fn date_with_four_digit_year() {
        let today = date(2024, 1, 1);
        assert_eq!(find_date("Mi 12.11.2025", today), Some(date(2025, 11, 12)));
    }

    #[test]
    fn date_with_two_digit_year() {
        let today = date(2024, 1, 1);
        assert_eq!(find_date("12.11.25", today), Some(date(2025, 11, 12)));
    }

    #[test]
    fn date_without_year_uses_current_year() {
        let today = date(2025, 10, 1);
        assert_eq!(find_date("Mo 10.11.", today), Some(date(2025, 11, 10)));
    }

    #[test]
    fn invalid_date_is_skipped() {
        let today = date(2025, 10, 1);
        assert_eq!(find_date("31.02.2025", today), None);
    }

    #[test]
    fn week_dates_are_distinct_and_sorted() {
        let today = date(2025, 11, 1);
        let days = week_dates(["Mi 12.11.", "Mo 10.11.", "12.11.2025", "Raum A"], today);
        assert_eq!(days, vec![date(2025, 11, 10), date(2025, 11, 12)]);
    }

    #[test]
    fn nearest_week_day_prefers_upcoming() {
        let days = [date(2025, 11, 10), date(2025, 11, 11), date(2025, 11, 12)];
        assert_eq!(
            nearest_week_day(&days, date(2025, 11, 12)),
            Some(date(2025, 11, 11))
        );
        assert_eq!(
            nearest_week_day(&days, date(2025, 11, 1)),
            Some(date(2025, 11, 10))
        );
    }

    #[test]
    fn nearest_week_day_falls_back_to_earliest() {
        let days = [date(2025, 11, 10), date(2025, 11, 11)];
        assert_eq!(
            nearest_week_day(&days, date(2025, 12, 24)),
            Some(date(2025, 11, 10))
        );
        assert_eq!(nearest_week_day(&[], date(2025, 12, 24)), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("Übung", 2), "Üb");
    }
}
