//! Export URL guessing.
//!
//! Rapla serves the same reservation selection as iCalendar when the page
//! parameter is switched to `ical`; some installations use `format=ical`
//! instead, and some only answer on the `/rapla` servlet path.

use std::collections::BTreeSet;

use tracing::debug;
use url::Url;

use crate::diagnostics::Diagnostics;
use crate::http::{Fetcher, is_calendar_payload};

/// Query parameter overrides that switch a Rapla page into export mode.
pub const EXPORT_PARAMS: &[(&str, &str)] = &[("page", "ical"), ("page", "iCal"), ("format", "ical")];

/// Servlet path used for the path-replacing candidate.
pub const RAPLA_PATH: &str = "/rapla";

/// Builds the candidate export URLs for `base`, in a fixed order.
///
/// One candidate per entry of [`EXPORT_PARAMS`], then one with the path
/// replaced by [`RAPLA_PATH`] and `page=ical`.
pub fn variant_candidates(base: &Url) -> Vec<String> {
    let mut candidates: Vec<String> = EXPORT_PARAMS
        .iter()
        .map(|(key, value)| with_param(base, key, value).to_string())
        .collect();

    let mut alternate = with_param(base, "page", "ical");
    alternate.set_path(RAPLA_PATH);
    candidates.push(alternate.to_string());

    candidates
}

/// Fetches every candidate and returns those serving iCalendar, sorted.
///
/// A failing candidate is recorded and skipped; it never aborts the batch.
pub async fn probe_variants(
    fetcher: &dyn Fetcher,
    base: &Url,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let mut accepted = BTreeSet::new();

    for candidate in variant_candidates(base) {
        match fetcher.get(&candidate).await {
            Ok(body) if is_calendar_payload(&body) => {
                debug!(url = %candidate, "Variant serves iCalendar");
                accepted.insert(candidate);
            }
            Ok(_) => {
                debug!(url = %candidate, "Variant answered without iCalendar");
                diagnostics.record_rejected(candidate);
            }
            Err(e) => {
                debug!(url = %candidate, error = %e, "Variant failed");
                diagnostics.record_failure(candidate, &e);
            }
        }
    }

    accepted.into_iter().collect()
}

/// Returns `base` with `key` set to `value`.
///
/// An existing parameter keeps its position; repeated keys collapse into one.
/// A new parameter is appended.
fn with_param(base: &Url, key: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (k, v) in base.query_pairs().into_owned() {
        match pairs.iter_mut().find(|(existing, _)| *existing == k) {
            Some(pair) => pair.1 = v,
            None => pairs.push((k, v)),
        }
    }

    match pairs.iter_mut().find(|(existing, _)| existing.as_str() == key) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }

    let mut url = base.clone();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StaticFetcher;

    fn base() -> Url {
        Url::parse("https://rapla.example.org/rapla/calendar?page=calendar&user=prof&file=kurs")
            .unwrap()
    }

    #[test]
    fn candidates_follow_known_conventions() {
        assert_eq!(
            variant_candidates(&base()),
            vec![
                "https://rapla.example.org/rapla/calendar?page=ical&user=prof&file=kurs",
                "https://rapla.example.org/rapla/calendar?page=iCal&user=prof&file=kurs",
                "https://rapla.example.org/rapla/calendar?page=calendar&user=prof&file=kurs&format=ical",
                "https://rapla.example.org/rapla?page=ical&user=prof&file=kurs",
            ]
        );
    }

    #[test]
    fn parameter_is_appended_when_missing() {
        let url = Url::parse("https://rapla.example.org/?key=abc").unwrap();
        let candidates = variant_candidates(&url);
        assert_eq!(candidates[0], "https://rapla.example.org/?key=abc&page=ical");
        assert_eq!(candidates[3], "https://rapla.example.org/rapla?key=abc&page=ical");
    }

    #[test]
    fn values_are_reencoded() {
        let url = Url::parse("https://rapla.example.org/rapla?file=Kurs%20A").unwrap();
        let candidates = variant_candidates(&url);
        assert_eq!(
            candidates[0],
            "https://rapla.example.org/rapla?file=Kurs+A&page=ical"
        );
    }

    #[tokio::test]
    async fn probing_keeps_only_calendar_payloads() {
        let candidates = variant_candidates(&base());
        let fetcher = StaticFetcher::new()
            .with_body(&candidates[0], "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")
            .with_body(&candidates[1], "<html>Fehler</html>")
            .with_status(&candidates[2], 500);
        let mut diagnostics = Diagnostics::new();

        let accepted = probe_variants(&fetcher, &base(), &mut diagnostics).await;

        assert_eq!(accepted, vec![candidates[0].clone()]);
        assert_eq!(fetcher.requests(), candidates);
        assert_eq!(diagnostics.rejected, vec![candidates[1].clone()]);
        assert_eq!(diagnostics.failed.len(), 2);
    }
}
