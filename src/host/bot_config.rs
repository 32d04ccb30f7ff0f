// Process configuration, read once at startup.
//
// `.env` is loaded by `main` before this runs, so everything here comes from
// the environment:
// - `FLEXUS_API_BASEURL`, `FLEXUS_API_KEY`  host REST API
// - `FLEXUS_PERSONA_ID`                     persona this process serves
// - `METRICMASTER_DATA_DIR`                 SQLite files (default `data`)
// - `METRICMASTER_TIMEZONE`                 schedule time zone (default `UTC`)
// - `METRICMASTER_ASSETS_DIR`               marketplace pictures (default `assets`)
// - `GITHUB_TOKEN`                          enables snippet pull requests

use std::path::PathBuf;

use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing {0} environment variable")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub persona_id: Option<String>,
    pub data_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub timezone: Tz,
    pub github_token: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base_url =
            get("FLEXUS_API_BASEURL").ok_or(ConfigError::Missing("FLEXUS_API_BASEURL"))?;
        let api_key = get("FLEXUS_API_KEY").ok_or(ConfigError::Missing("FLEXUS_API_KEY"))?;

        let timezone = match get("METRICMASTER_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                name: "METRICMASTER_TIMEZONE",
                reason: e.to_string(),
            })?,
            None => Tz::UTC,
        };

        Ok(Self {
            api_base_url,
            api_key,
            persona_id: get("FLEXUS_PERSONA_ID"),
            data_dir: get("METRICMASTER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            assets_dir: get("METRICMASTER_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets")),
            timezone,
            github_token: get("GITHUB_TOKEN"),
        })
    }

    pub fn reports_db_path(&self) -> PathBuf {
        self.data_dir.join("reports.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = BotConfig::from_lookup(lookup(&[
            ("FLEXUS_API_BASEURL", "https://flexus.example"),
            ("FLEXUS_API_KEY", "k"),
            ("GITHUB_TOKEN", "  "),
        ]))
        .unwrap();
        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(config.reports_db_path(), PathBuf::from("data/reports.db"));
        assert_eq!(config.github_token, None);
        assert_eq!(config.persona_id, None);
    }

    #[test]
    fn timezone_must_be_an_iana_name() {
        let ok = BotConfig::from_lookup(lookup(&[
            ("FLEXUS_API_BASEURL", "u"),
            ("FLEXUS_API_KEY", "k"),
            ("METRICMASTER_TIMEZONE", "Europe/Oslo"),
        ]))
        .unwrap();
        assert_eq!(ok.timezone, chrono_tz::Europe::Oslo);

        let err = BotConfig::from_lookup(lookup(&[
            ("FLEXUS_API_BASEURL", "u"),
            ("FLEXUS_API_KEY", "k"),
            ("METRICMASTER_TIMEZONE", "Mars/Olympus"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "METRICMASTER_TIMEZONE", .. }));
    }

    #[test]
    fn host_credentials_are_required() {
        assert_eq!(
            BotConfig::from_lookup(lookup(&[("FLEXUS_API_KEY", "k")])).unwrap_err(),
            ConfigError::Missing("FLEXUS_API_BASEURL")
        );
    }
}
