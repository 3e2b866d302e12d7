//! Export link discovery in schedule pages.
//!
//! Rapla pages advertise their iCal export either as a
//! `<link rel="alternate" type="text/calendar">` header or as a plain anchor
//! (`?page=ical&...`, `*.ics`).

use std::collections::BTreeSet;

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::diagnostics::Diagnostics;
use crate::http::Fetcher;

/// Fetches `page_url` and returns the export links it advertises.
///
/// Fails soft: a fetch error yields an empty list and a diagnostic entry.
pub async fn discover_export_links(
    fetcher: &dyn Fetcher,
    page_url: &Url,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let body = match fetcher.get(page_url.as_str()).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %page_url, error = %e, "Could not fetch schedule page for link discovery");
            diagnostics.record_failure(page_url.as_str(), &e);
            return Vec::new();
        }
    };

    let links = find_export_links(&String::from_utf8_lossy(&body), page_url);
    debug!(count = links.len(), "Discovered export links");
    links
}

/// Extracts absolute export URLs from an HTML document.
///
/// The result is deduplicated and sorted.
pub fn find_export_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = BTreeSet::new();

    let alternate = Selector::parse("link[href]").expect("link selector should be valid");
    for element in document.select(&alternate) {
        let rel = element.value().attr("rel").unwrap_or("").to_lowercase();
        let kind = element.value().attr("type").unwrap_or("").to_lowercase();
        if rel.contains("alternate")
            && kind.contains("calendar")
            && let Some(url) = resolve(base, element.value().attr("href"))
        {
            links.insert(url);
        }
    }

    let anchors = Selector::parse("a[href]").expect("anchor selector should be valid");
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let lower = href.trim().to_lowercase();
        if (lower.contains("ical") || lower.ends_with(".ics"))
            && let Some(url) = resolve(base, Some(href))
        {
            links.insert(url);
        }
    }

    links.into_iter().collect()
}

/// Resolves an `href` against the page URL.
fn resolve(base: &Url, href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() {
        return None;
    }
    match base.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!(href = %href, error = %e, "Skipping unresolvable link");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StaticFetcher;

    fn base() -> Url {
        Url::parse("https://rapla.example.org/rapla?page=calendar&user=prof&file=kurs").unwrap()
    }

    #[test]
    fn finds_alternate_link() {
        let html = r#"<html><head>
            <link rel="alternate" type="text/calendar" href="/rapla/ical/kurs.ics">
            <link rel="stylesheet" type="text/css" href="/style.css">
            </head><body></body></html>"#;

        assert_eq!(
            find_export_links(html, &base()),
            vec!["https://rapla.example.org/rapla/ical/kurs.ics"]
        );
    }

    #[test]
    fn finds_ical_anchor() {
        let html = r#"<body><a href="/rapla?page=ical&user=prof&file=kurs">iCal Export</a>
            <a href="/rapla?page=calendar&day=1">Weiter</a></body>"#;

        assert_eq!(
            find_export_links(html, &base()),
            vec!["https://rapla.example.org/rapla?page=ical&user=prof&file=kurs"]
        );
    }

    #[test]
    fn anchor_match_is_case_insensitive_and_accepts_ics_suffix() {
        let html = r#"<body>
            <a href="export/Kurs.ICS">Download</a>
            <a href="?page=iCal">Export</a>
            <a href="https://other.example.com/feed.ics">Feed</a>
            </body>"#;

        insta::assert_snapshot!(
            find_export_links(html, &base()).join(" | "),
            @"https://other.example.com/feed.ics | https://rapla.example.org/export/Kurs.ICS | https://rapla.example.org/rapla?page=iCal"
        );
    }

    #[test]
    fn duplicates_are_merged() {
        let html = r#"<head><link rel="alternate" type="text/calendar" href="/cal.ics"></head>
            <body><a href="/cal.ics">ICS</a><a href="https://rapla.example.org/cal.ics">ICS</a></body>"#;

        assert_eq!(
            find_export_links(html, &base()),
            vec!["https://rapla.example.org/cal.ics"]
        );
    }

    #[test]
    fn page_without_exports_yields_nothing() {
        let html = "<html><body><div>10:00 - 11:30 Analysis</div></body></html>";
        assert!(find_export_links(html, &base()).is_empty());
    }

    #[tokio::test]
    async fn discovery_fails_soft() {
        let fetcher = StaticFetcher::new().with_status(base().as_str(), 500);
        let mut diagnostics = Diagnostics::new();

        let links = discover_export_links(&fetcher, &base(), &mut diagnostics).await;

        assert!(links.is_empty());
        assert_eq!(diagnostics.failed.len(), 1);
        assert_eq!(diagnostics.failed[0].url, base().as_str());
    }

    #[tokio::test]
    async fn discovery_fetches_page() {
        let html = r#"<a href="/rapla?page=ical&user=prof&file=kurs">iCal Export</a>"#;
        let fetcher = StaticFetcher::new().with_body(base().as_str(), html);
        let mut diagnostics = Diagnostics::new();

        let links = discover_export_links(&fetcher, &base(), &mut diagnostics).await;

        assert_eq!(
            links,
            vec!["https://rapla.example.org/rapla?page=ical&user=prof&file=kurs"]
        );
        assert!(diagnostics.is_empty());
    }
}
