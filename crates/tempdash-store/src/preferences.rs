//! Chart preferences: series toggle and time range. In-memory only.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempdash_core::config::{DashboardConfig, MAX_FETCH_LIMIT};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferenceError {
    #[error("Time range must be a number of days, got: {0}")]
    NotANumber(String),
    #[error("Time range of {0} days is outside 1..={max}", max = MAX_FETCH_LIMIT)]
    OutOfRange(usize),
}

/// Number of days shown on the charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeRange(usize);

impl TimeRange {
    pub fn days(days: usize) -> Result<Self, PreferenceError> {
        if (1..=MAX_FETCH_LIMIT).contains(&days) {
            Ok(Self(days))
        } else {
            Err(PreferenceError::OutOfRange(days))
        }
    }

    pub fn as_days(self) -> usize {
        self.0
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self(1)
    }
}

impl FromStr for TimeRange {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days = s
            .trim()
            .parse::<usize>()
            .map_err(|_| PreferenceError::NotANumber(s.to_string()))?;
        Self::days(days)
    }
}

impl TryFrom<String> for TimeRange {
    type Error = PreferenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeRange> for String {
    fn from(range: TimeRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Overlay all days on one axis when off; show them as a continuous series when on
    pub series_toggle: bool,
    pub time_range: TimeRange,
}

/// Watchable preference flags
#[derive(Debug)]
pub struct PreferencesStore {
    state: watch::Sender<Preferences>,
}

impl Default for PreferencesStore {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl PreferencesStore {
    pub fn new(initial: Preferences) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Seed preferences from the dashboard section of the config
    ///
    /// # Errors
    ///
    /// Returns an error if the configured time range is not a valid number of days.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, PreferenceError> {
        Ok(Self::new(Preferences {
            series_toggle: config.series_toggle,
            time_range: config.time_range.parse()?,
        }))
    }

    pub fn set_series_toggle(&self, toggle: bool) {
        let changed = self.state.send_if_modified(|prefs| {
            let changed = prefs.series_toggle != toggle;
            prefs.series_toggle = toggle;
            changed
        });
        if changed {
            tracing::debug!("Series toggle set to {}", toggle);
        }
    }

    pub fn set_time_range(&self, range: TimeRange) {
        let changed = self.state.send_if_modified(|prefs| {
            let changed = prefs.time_range != range;
            prefs.time_range = range;
            changed
        });
        if changed {
            tracing::debug!("Time range set to {} days", range);
        }
    }

    pub fn get(&self) -> Preferences {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Preferences> {
        self.state.subscribe()
    }
}
