use std::env;
use std::str::FromStr;

use crate::models::PollType;
use crate::presentation::DEFAULT_PREVIEW;
use crate::tally::ChartThresholds;

/// Display knobs shared by the admin and voter views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub thresholds: ChartThresholds,
    /// Responses listed before "show more".
    pub preview: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            thresholds: ChartThresholds::default(),
            preview: DEFAULT_PREVIEW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub view: ViewSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `DATABASE_URL` (default: sqlite:civic_polls.db)
    /// - `POLL_CHART_MAX_LABELS_CHOICE` (default: 6)
    /// - `POLL_CHART_MAX_LABELS_FREE_TEXT` (default: 10)
    /// - `POLL_RESULTS_PREVIEW` (default: 5)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ViewSettings::default();
        let parsed = |key: &str, default: usize| parse_or(lookup(key), default);

        let mut thresholds = defaults.thresholds;
        for poll_type in PollType::ALL {
            let key = if poll_type.is_choice() {
                "POLL_CHART_MAX_LABELS_CHOICE"
            } else {
                "POLL_CHART_MAX_LABELS_FREE_TEXT"
            };
            thresholds = thresholds.with_limit(poll_type, parsed(key, thresholds.max_labels(poll_type)));
        }

        Self {
            database_url: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| "sqlite:civic_polls.db".to_string()),
            view: ViewSettings {
                thresholds,
                preview: parsed("POLL_RESULTS_PREVIEW", defaults.preview),
            },
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.database_url, "sqlite:civic_polls.db");
        assert_eq!(config.view, ViewSettings::default());
        assert_eq!(config.view.thresholds.max_labels(PollType::Binary), 6);
        assert_eq!(config.view.thresholds.max_labels(PollType::FreeText), 10);
        assert_eq!(config.view.preview, 5);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("POLL_CHART_MAX_LABELS_CHOICE", "4"),
            ("POLL_CHART_MAX_LABELS_FREE_TEXT", " 12 "),
            ("POLL_RESULTS_PREVIEW", "3"),
        ]);
        assert_eq!(config.database_url, "sqlite::memory:");
        let expected = ChartThresholds::default()
            .with_limit(PollType::Binary, 4)
            .with_limit(PollType::Ternary, 4)
            .with_limit(PollType::FreeText, 12);
        assert_eq!(config.view.thresholds, expected);
        assert_eq!(config.view.preview, 3);
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = config_from(&[("POLL_CHART_MAX_LABELS_CHOICE", "many"), ("DATABASE_URL", "")]);
        assert_eq!(config.view.thresholds, ChartThresholds::default());
        assert_eq!(config.database_url, "sqlite:civic_polls.db");
    }
}
