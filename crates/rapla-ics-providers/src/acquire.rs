//! Calendar acquisition for a Rapla schedule page.
//!
//! ```text
//!  discover_export_links ─┐
//!                         ├─► candidates ─► fetch ─► 1 payload  ─► as is
//!  probe_variants ────────┘                       ├► n payloads ─► merge_calendars
//!                                                 └► none       ─► scrape_html / NoExportAvailable
//! ```

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};
use url::Url;

use crate::diagnostics::Diagnostics;
use crate::discover::discover_export_links;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{Fetcher, is_calendar_payload};
use crate::merge::merge_calendars;
use crate::scrape::scrape_html;
use crate::variants::probe_variants;

/// What to do when no export can be confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrapePolicy {
    /// Scrape the rendered page; an empty result is still a calendar.
    #[default]
    Fallback,
    /// Fail with [`crate::ProviderErrorCode::NoExportAvailable`].
    Disabled,
}

/// Where the returned payload came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionSource {
    /// One export, returned byte for byte.
    Export(String),
    /// Several exports merged by UID.
    Merged(Vec<String>),
    /// Events scraped from the schedule page.
    Scraped,
}

/// Result of [`Acquirer::acquire`].
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// The iCalendar payload.
    pub payload: Vec<u8>,
    /// Where the payload came from.
    pub source: AcquisitionSource,
    /// Silently recovered conditions along the way.
    pub diagnostics: Diagnostics,
}

/// Runs the export-first, scrape-last acquisition chain.
pub struct Acquirer {
    fetcher: Box<dyn Fetcher>,
    timezone: Tz,
    scrape: ScrapePolicy,
}

impl Acquirer {
    /// Creates an acquirer with the fallback scrape policy.
    pub fn new(fetcher: impl Fetcher + 'static, timezone: Tz) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            timezone,
            scrape: ScrapePolicy::default(),
        }
    }

    /// Builder method to set the scrape policy.
    pub fn with_scrape_policy(mut self, policy: ScrapePolicy) -> Self {
        self.scrape = policy;
        self
    }

    /// Returns the scrape policy.
    pub fn scrape_policy(&self) -> ScrapePolicy {
        self.scrape
    }

    /// Acquires a calendar for the schedule page at `page_url`.
    ///
    /// # Errors
    ///
    /// - configuration error for an unparsable URL
    /// - parse error if confirmed exports cannot be merged
    /// - `NoExportAvailable` if nothing was confirmed and scraping is
    ///   disabled or the page itself cannot be fetched
    pub async fn acquire(&self, page_url: &str) -> ProviderResult<Acquisition> {
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        self.acquire_at(page_url, today).await
    }

    /// Like [`Acquirer::acquire`], with an explicit reference day for the scraper.
    pub async fn acquire_at(&self, page_url: &str, today: NaiveDate) -> ProviderResult<Acquisition> {
        let url = parse_url(page_url)?;
        let mut diagnostics = Diagnostics::new();

        let candidates = self.candidates(&url, &mut diagnostics).await;
        info!(count = candidates.len(), "Collected export candidates");

        let mut exports = Vec::new();
        for candidate in candidates {
            match self.fetcher.get(&candidate).await {
                Ok(body) if is_calendar_payload(&body) => {
                    debug!(url = %candidate, bytes = body.len(), "Confirmed export");
                    exports.push((candidate, body));
                }
                Ok(_) => {
                    debug!(url = %candidate, "Candidate is not a calendar");
                    diagnostics.record_rejected(candidate);
                }
                Err(e) => {
                    warn!(url = %candidate, error = %e, "Candidate fetch failed");
                    diagnostics.record_failure(candidate, &e);
                }
            }
        }

        match exports.len() {
            0 => self.fallback(&url, today, diagnostics).await,
            1 => {
                let (source, payload) = exports.remove(0);
                info!(url = %source, "Using single export");
                Ok(Acquisition {
                    payload,
                    source: AcquisitionSource::Export(source),
                    diagnostics,
                })
            }
            n => {
                info!(count = n, "Merging exports");
                let (sources, payloads): (Vec<String>, Vec<Vec<u8>>) = exports.into_iter().unzip();
                let merged = merge_calendars(&payloads)?;
                diagnostics.duplicate_uids.extend(merged.duplicate_uids);
                Ok(Acquisition {
                    payload: merged.payload,
                    source: AcquisitionSource::Merged(sources),
                    diagnostics,
                })
            }
        }
    }

    /// Returns the candidate export URLs for `page_url` without fetching them.
    pub async fn export_links(
        &self,
        page_url: &str,
    ) -> ProviderResult<(Vec<String>, Diagnostics)> {
        let url = parse_url(page_url)?;
        let mut diagnostics = Diagnostics::new();
        let candidates = self.candidates(&url, &mut diagnostics).await;
        Ok((candidates, diagnostics))
    }

    /// Union of discovered links and accepted variants, sorted.
    async fn candidates(&self, url: &Url, diagnostics: &mut Diagnostics) -> Vec<String> {
        let discovered = discover_export_links(self.fetcher.as_ref(), url, diagnostics).await;
        let probed = probe_variants(self.fetcher.as_ref(), url, diagnostics).await;

        discovered
            .into_iter()
            .chain(probed)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    async fn fallback(
        &self,
        url: &Url,
        today: NaiveDate,
        diagnostics: Diagnostics,
    ) -> ProviderResult<Acquisition> {
        if self.scrape == ScrapePolicy::Disabled {
            return Err(ProviderError::no_export("No public iCal export available")
                .with_url(url.as_str()));
        }

        info!("No usable export, falling back to HTML scraping");
        let payload = scrape_html(self.fetcher.as_ref(), url, self.timezone, today)
            .await
            .map_err(|e| {
                ProviderError::no_export("No public iCal export available and scraping failed")
                    .with_url(url.as_str())
                    .with_source(e)
            })?;

        Ok(Acquisition {
            payload,
            source: AcquisitionSource::Scraped,
            diagnostics,
        })
    }
}

fn parse_url(page_url: &str) -> ProviderResult<Url> {
    Url::parse(page_url.trim()).map_err(|e| {
        ProviderError::configuration(format!("Invalid source URL '{}': {}", page_url, e))
            .with_source(e)
    })
}
