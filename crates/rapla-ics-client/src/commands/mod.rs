//! Subcommand implementations.

pub mod config;
pub mod links;
pub mod run;

use rapla_ics_providers::{Acquirer, Fetcher, HttpFetcher};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Returns the configured source URL.
pub(crate) fn source_url(config: &ClientConfig) -> ClientResult<&str> {
    config
        .source
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            ClientError::Config(format!(
                "no source URL; pass --url, set RAPLA_URL or add to {}:\n  \
                 [source]\n  \
                 url = \"https://.../rapla?page=calendar&user=...&file=...\"",
                ClientConfig::default_path().display()
            ))
        })
}

/// Builds an acquirer over the real network.
pub(crate) fn http_acquirer(config: &ClientConfig) -> ClientResult<Acquirer> {
    let fetcher = HttpFetcher::new(&config.http.to_http_config())?;
    acquirer(fetcher, config)
}

/// Builds an acquirer over `fetcher` with the configured zone and policy.
pub(crate) fn acquirer(
    fetcher: impl Fetcher + 'static,
    config: &ClientConfig,
) -> ClientResult<Acquirer> {
    let tz = config.filter.tz().map_err(ClientError::Config)?;
    Ok(Acquirer::new(fetcher, tz).with_scrape_policy(config.acquire.scrape_policy()))
}
