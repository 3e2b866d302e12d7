//! Links command: lists candidate export URLs.

use rapla_ics_providers::Acquirer;

use crate::commands::{http_acquirer, source_url};
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Prints the candidate export URLs of the configured page, one per line.
pub async fn links(config: &ClientConfig) -> ClientResult<()> {
    let acquirer = http_acquirer(config)?;
    for link in collect(&acquirer, config).await? {
        println!("{}", link);
    }
    Ok(())
}

/// Returns the candidate export URLs of the configured page, sorted.
pub async fn collect(acquirer: &Acquirer, config: &ClientConfig) -> ClientResult<Vec<String>> {
    let url = source_url(config)?;
    let (links, diagnostics) = acquirer.export_links(url).await?;
    tracing::debug!(
        failed = diagnostics.failed.len(),
        rejected = diagnostics.rejected.len(),
        "Collected export links"
    );
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::acquirer;
    use rapla_ics_providers::StaticFetcher;

    const PAGE: &str = "https://rapla.example.org/rapla?page=calendar&user=prof&file=kurs";

    #[tokio::test]
    async fn lists_discovered_and_probed_links() {
        let mut config = ClientConfig::default();
        config.source.url = Some(PAGE.to_string());
        let fetcher = StaticFetcher::new()
            .with_body(PAGE, r#"<a href="/export/kurs.ics">ICS</a>"#)
            .with_body(
                "https://rapla.example.org/rapla?page=calendar&user=prof&file=kurs&format=ical",
                "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n",
            );
        let acquirer = acquirer(fetcher, &config).unwrap();

        let links = collect(&acquirer, &config).await.unwrap();

        assert_eq!(
            links,
            vec![
                "https://rapla.example.org/export/kurs.ics",
                "https://rapla.example.org/rapla?page=calendar&user=prof&file=kurs&format=ical",
            ]
        );
    }
}
