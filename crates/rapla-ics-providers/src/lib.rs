//! Calendar acquisition from Rapla schedule pages.
//!
//! This crate turns a Rapla page URL into an iCalendar payload:
//!
//! - [`Fetcher`] - HTTP seam, with [`HttpFetcher`] for the network
//! - [`discover_export_links`] / [`probe_variants`] - export candidates
//! - [`merge_calendars`] - UID-deduplicating merge of several exports
//! - [`scrape_html`] - best-effort HTML fallback
//! - [`Acquirer`] - the chain tying them together
//! - [`filter_payload`] - keyword filter over a payload
//!
//! # Architecture
//!
//! ```text
//!            schedule page URL
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!   ┌─────────────┐     ┌─────────────┐
//!   │  discover   │     │  variants   │
//!   └──────┬──────┘     └──────┬──────┘
//!          └─────────┬─────────┘
//!                    ▼
//!             confirmed exports ──── none ──► scrape
//!                    │
//!               1 ◄──┴──► n ──► merge
//!                    │
//!                    ▼
//!           filter_payload() ──► calendar.ics
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rapla_ics_providers::{Acquirer, HttpConfig, HttpFetcher};
//!
//! async fn fetch(url: &str) -> rapla_ics_providers::ProviderResult<Vec<u8>> {
//!     let fetcher = HttpFetcher::new(&HttpConfig::default())?;
//!     let acquirer = Acquirer::new(fetcher, chrono_tz::Europe::Berlin);
//!     Ok(acquirer.acquire(url).await?.payload)
//! }
//! ```

pub mod acquire;
pub mod diagnostics;
pub mod discover;
pub mod error;
pub mod http;
pub mod ics;
pub mod merge;
pub mod scrape;
pub mod variants;

// Re-export main types at crate root
pub use acquire::{Acquirer, Acquisition, AcquisitionSource, ScrapePolicy};
pub use diagnostics::{CandidateFailure, Diagnostics};
pub use discover::{discover_export_links, find_export_links};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use http::{BoxFuture, Fetcher, HttpConfig, HttpFetcher, StaticFetcher, is_calendar_payload};
pub use ics::{filter_payload, parse_calendar, parse_document, render_document};
pub use merge::{MERGE_PRODUCT_ID, Merged, merge_calendars};
pub use scrape::{SCRAPE_PRODUCT_ID, ScrapedBlock, extract_blocks, scrape_document, scrape_html};
pub use variants::{probe_variants, variant_candidates};
