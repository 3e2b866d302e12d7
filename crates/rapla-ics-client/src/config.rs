//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/rapla-ics/config.toml` by default. Every value has a default, so
//! a missing file is the same as an empty one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use rapla_ics_core::{DEFAULT_KEYWORDS, KeywordFilter, parse_timezone};
use rapla_ics_providers::{HttpConfig, ScrapePolicy};

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the rapla-ics client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Schedule page settings.
    pub source: SourceSettings,

    /// Output file settings.
    pub output: OutputSettings,

    /// Event filter settings.
    pub filter: FilterSettings,

    /// HTTP settings.
    pub http: HttpSettings,

    /// Acquisition settings.
    pub acquire: AcquireSettings,
}

/// Schedule page settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceSettings {
    /// Rapla schedule page URL.
    pub url: Option<String>,
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Where the filtered calendar is written.
    pub path: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("calendar.ics"),
        }
    }
}

/// Event filter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterSettings {
    /// Case-insensitive summary keywords; an event matching any is kept.
    pub keywords: Vec<String>,

    /// IANA time zone events are normalized into.
    pub timezone: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            timezone: "Europe/Berlin".to_string(),
        }
    }
}

impl FilterSettings {
    /// Builds the keyword filter.
    pub fn keyword_filter(&self) -> KeywordFilter {
        KeywordFilter::new(self.keywords.iter().cloned())
    }

    /// Resolves the configured time zone.
    pub fn tz(&self) -> Result<Tz, String> {
        parse_timezone(&self.timezone)
    }
}

/// HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpSettings {
    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: HttpConfig::DEFAULT_USER_AGENT.to_string(),
            timeout_secs: HttpConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpSettings {
    /// Converts to the fetcher configuration.
    pub fn to_http_config(&self) -> HttpConfig {
        HttpConfig::default()
            .with_user_agent(self.user_agent.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

/// Acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AcquireSettings {
    /// Scrape the page when no export is found.
    pub scrape_fallback: bool,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            scrape_fallback: true,
        }
    }
}

impl AcquireSettings {
    /// Returns the matching scrape policy.
    pub fn scrape_policy(&self) -> ScrapePolicy {
        if self.scrape_fallback {
            ScrapePolicy::Fallback
        } else {
            ScrapePolicy::Disabled
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rapla-ics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.source.url, None);
        assert_eq!(config.output.path, PathBuf::from("calendar.ics"));
        assert_eq!(config.filter.keywords, vec!["Vorlesung", "Üb", "Praktikum"]);
        assert_eq!(config.filter.timezone, "Europe/Berlin");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.acquire.scrape_policy(), ScrapePolicy::Fallback);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_content = r#"
[source]
url = "https://rapla.example.org/rapla?page=calendar&user=prof&file=kurs"

[filter]
keywords = ["Seminar"]
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(
            config.source.url.as_deref(),
            Some("https://rapla.example.org/rapla?page=calendar&user=prof&file=kurs")
        );
        assert_eq!(config.filter.keywords, vec!["Seminar"]);
        assert_eq!(config.filter.timezone, "Europe/Berlin");
        assert_eq!(config.output, OutputSettings::default());
    }

    #[test]
    fn scrape_fallback_can_be_disabled() {
        let config: ClientConfig = toml::from_str("[acquire]\nscrape_fallback = false\n").unwrap();
        assert_eq!(config.acquire.scrape_policy(), ScrapePolicy::Disabled);
    }

    #[test]
    fn http_settings_convert() {
        let settings = HttpSettings {
            user_agent: "test-agent".to_string(),
            timeout_secs: 5,
        };
        let http = settings.to_http_config();
        assert_eq!(http.user_agent, "test-agent");
        assert_eq!(http.timeout, Duration::from_secs(5));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let settings = FilterSettings {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(settings.tz().is_err());
        assert_eq!(FilterSettings::default().tz().unwrap(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\npath = \"out/kurs.ics\"\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.output.path, PathBuf::from("out/kurs.ics"));
    }

    #[test]
    fn load_from_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(ClientConfig::load_from(&missing).unwrap_err().contains("failed to read"));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[filter\n").unwrap();
        assert!(ClientConfig::load_from(&broken).unwrap_err().contains("failed to parse"));
    }

    #[test]
    fn dump_round_trips() {
        let config = ClientConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("rapla-ics/config.toml"));
    }
}
