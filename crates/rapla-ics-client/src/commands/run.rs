//! Run command: acquire, filter, write.

use std::path::Path;

use tracing::{info, warn};

use rapla_ics_providers::{
    Acquirer, Acquisition, AcquisitionSource, Diagnostics, filter_payload, parse_document,
};

use crate::commands::{http_acquirer, source_url};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// What a run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Events written to the output file.
    pub events: usize,
    /// Where the payload came from.
    pub source: AcquisitionSource,
    /// Conditions recovered during acquisition.
    pub diagnostics: Diagnostics,
}

/// Downloads the calendar, filters it and writes the output file.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let acquirer = http_acquirer(config)?;
    let summary = run_with(&acquirer, config).await?;

    println!(
        "Wrote {} events to {} ({})",
        summary.events,
        config.output.path.display(),
        describe(&summary.source)
    );
    Ok(())
}

/// Runs acquisition and filtering with a prepared acquirer.
pub async fn run_with(acquirer: &Acquirer, config: &ClientConfig) -> ClientResult<RunSummary> {
    let url = source_url(config)?;
    let tz = config.filter.tz().map_err(ClientError::Config)?;
    let filter = config.filter.keyword_filter();

    let Acquisition {
        payload,
        source,
        diagnostics,
    } = acquirer.acquire(url).await?;
    report(&diagnostics);

    let filtered = filter_payload(&payload, &filter, tz)?;
    let events = parse_document(&filtered)?.len();

    write_output(&config.output.path, &filtered)?;
    info!(
        events,
        path = %config.output.path.display(),
        keywords = ?filter.keywords(),
        "Wrote filtered calendar"
    );

    Ok(RunSummary {
        events,
        source,
        diagnostics,
    })
}

/// Writes `payload` to `path` in a single write, creating parent directories.
pub fn write_output(path: &Path, payload: &[u8]) -> ClientResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, payload)?;
    Ok(())
}

fn report(diagnostics: &Diagnostics) {
    for failure in &diagnostics.failed {
        warn!(url = %failure.url, reason = %failure.reason, "Candidate failed");
    }
    if !diagnostics.rejected.is_empty() {
        info!(count = diagnostics.rejected.len(), "Candidates without iCalendar content");
    }
    if !diagnostics.duplicate_uids.is_empty() {
        warn!(uids = ?diagnostics.duplicate_uids, "Dropped duplicate events while merging");
    }
}

fn describe(source: &AcquisitionSource) -> String {
    match source {
        AcquisitionSource::Export(url) => format!("export {}", url),
        AcquisitionSource::Merged(urls) => format!("merged from {} exports", urls.len()),
        AcquisitionSource::Scraped => "scraped from HTML".to_string(),
    }
}
