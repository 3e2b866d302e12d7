//! HTML-to-calendar fallback for schedule pages without a usable export.
//!
//! Best effort only. Reservation blocks are recognised by their
//! `H:MM - H:MM` text; the day comes from date text near the block or, failing
//! that, from the day headers of the week view. Nested elements that carry the
//! same text produce duplicate events, which is accepted.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info};
use url::Url;

use rapla_ics_core::dates::{collapse_whitespace, truncate_chars};
use rapla_ics_core::{
    CalendarDocument, CalendarEvent, CalendarMetadata, EventTime, find_date, find_time_range,
    localize, nearest_week_day, week_dates,
};

use crate::error::ProviderResult;
use crate::http::Fetcher;
use crate::ics::render_document;

/// Product identifier of scraped calendars.
pub const SCRAPE_PRODUCT_ID: &str = "-//Rapla HTML Scrape//ICS//DE";

/// Elements that may hold a day header.
const HEADER_SELECTOR: &str = "th, div, span";

/// Elements that may hold a reservation block.
const CANDIDATE_SELECTOR: &str = "div, td, li, span";

/// How many levels above a block are searched for a date.
const MAX_ANCESTOR_HOPS: usize = 5;

/// Longest title taken from the parent element's text.
const MAX_FALLBACK_TITLE_CHARS: usize = 80;

/// Title of a block whose text carried nothing but the time.
const DEFAULT_TITLE: &str = "Vorlesung";

/// A reservation block recognised in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedBlock {
    /// Title inferred from the surrounding text.
    pub title: String,
    /// Day the block was assigned to.
    pub date: NaiveDate,
    /// Start wall-clock time.
    pub start: NaiveTime,
    /// End wall-clock time.
    pub end: NaiveTime,
}

impl ScrapedBlock {
    /// Turns the block into an event in `tz`.
    ///
    /// An end that is not after the start is pushed one hour later; if that
    /// is still not after the start, the event lasts one hour. The stamp is
    /// the start instant, so the same page always renders the same bytes.
    pub fn to_event(&self, tz: Tz) -> CalendarEvent {
        let start = localize(self.date.and_time(self.start), tz);
        let mut end = localize(self.date.and_time(self.end), tz);

        if end <= start {
            debug!(title = %self.title, "End not after start, adding one hour");
            end += Duration::hours(1);
            if end <= start {
                end = start + Duration::hours(1);
            }
        }

        CalendarEvent::new(
            self.title.clone(),
            EventTime::Zoned(start),
            EventTime::Zoned(end),
        )
        .with_stamp(start.with_timezone(&Utc))
    }
}

/// Fetches `url` and scrapes it into an iCalendar payload.
///
/// # Errors
///
/// Only the page fetch can fail; a page without recognisable blocks yields
/// an empty calendar.
pub async fn scrape_html(
    fetcher: &dyn Fetcher,
    url: &Url,
    tz: Tz,
    today: NaiveDate,
) -> ProviderResult<Vec<u8>> {
    let body = fetcher.get(url.as_str()).await?;
    let document = scrape_document(&String::from_utf8_lossy(&body), tz, today);
    info!(events = document.len(), "Scraped events from HTML");
    Ok(render_document(&document))
}

/// Scrapes an HTML page into a calendar document.
pub fn scrape_document(html: &str, tz: Tz, today: NaiveDate) -> CalendarDocument {
    let metadata = CalendarMetadata::new(SCRAPE_PRODUCT_ID).with_timezone(tz.name());
    let mut document = CalendarDocument::new(metadata);
    for block in extract_blocks(html, today) {
        document.push(block.to_event(tz));
    }
    document
}

/// Finds reservation blocks and resolves their dates.
///
/// `today` anchors year-less dates and the choice among week headers.
pub fn extract_blocks(html: &str, today: NaiveDate) -> Vec<ScrapedBlock> {
    let document = Html::parse_document(html);
    let headers = header_dates(&document, today);
    debug!(days = ?headers, "Week days from headers");

    let selector = Selector::parse(CANDIDATE_SELECTOR).expect("candidate selector should be valid");
    let mut blocks = Vec::new();

    for element in document.select(&selector) {
        let Some(text) = single_text(element) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let Some(range) = find_time_range(&text) else {
            continue;
        };

        let title = block_title(element, &text, &range);
        let date = nearby_date(element, today).or_else(|| nearest_week_day(&headers, today));
        let Some(date) = date else {
            debug!(title = %title, "No date for block, skipping");
            continue;
        };

        blocks.push(ScrapedBlock {
            title,
            date,
            start: range.start,
            end: range.end,
        });
    }

    blocks
}

/// Distinct day-header dates of the page, ascending.
fn header_dates(document: &Html, today: NaiveDate) -> Vec<NaiveDate> {
    let selector = Selector::parse(HEADER_SELECTOR).expect("header selector should be valid");
    let texts: Vec<String> = document.select(&selector).filter_map(single_text).collect();
    week_dates(texts.iter().map(String::as_str), today)
}

/// Title of a block: its text minus the time, else `title`, else parent text.
fn block_title(element: ElementRef<'_>, text: &str, range: &rapla_ics_core::TimeRange) -> String {
    let title = range.title_from(text);
    if !title.is_empty() {
        return title;
    }

    if let Some(attr) = element.value().attr("title")
        && !attr.trim().is_empty()
    {
        return attr.trim().to_string();
    }

    let parent = element.parent().map(node_text).unwrap_or_default();
    let parent = truncate_chars(&parent, MAX_FALLBACK_TITLE_CHARS);
    if parent.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        parent
    }
}

/// Looks for a date in the neighbourhood of `element`.
///
/// At each of up to [`MAX_ANCESTOR_HOPS`] levels the previous sibling, the
/// next sibling and the parent are checked, in that order.
fn nearby_date(element: ElementRef<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let mut current: NodeRef<'_, Node> = *element;

    for _ in 0..MAX_ANCESTOR_HOPS {
        let neighbours = [
            current.prev_sibling(),
            current.next_sibling(),
            current.parent(),
        ];
        for node in neighbours.into_iter().flatten() {
            if let Some(date) = find_date(&node_text(node), today) {
                return Some(date);
            }
        }
        current = current.parent()?;
    }

    None
}

/// Text of an element that holds a single run of text.
///
/// The element must have exactly one child, which is either text or another
/// element satisfying the same rule. Whitespace is collapsed.
fn single_text(element: ElementRef<'_>) -> Option<String> {
    let mut node: NodeRef<'_, Node> = *element;
    loop {
        let mut children = node.children();
        let child = children.next()?;
        if children.next().is_some() {
            return None;
        }
        match child.value() {
            Node::Text(text) => return Some(collapse_whitespace(text)),
            Node::Element(_) => node = child,
            _ => return None,
        }
    }
}

/// All text below `node` (including `node` itself if it is text).
fn node_text(node: NodeRef<'_, Node>) -> String {
    let parts: Vec<&str> = node
        .descendants()
        .filter_map(|n| n.value().as_text().map(|text| &**text))
        .collect();
    collapse_whitespace(&parts.join(" "))
}
