//! Site-wide settings injected into every engine call.
//!
//! Nothing in the engine reads process-wide state: a [`Config`] value carries
//! the timezone, slot granularity, display format and cutoff rules, and
//! [`Config::query`] stamps them onto an [`AvailabilityQuery`].

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{EngineError, Result};
use crate::model::{ProviderId, Service};
use crate::slots::AvailabilityQuery;

pub const DEFAULT_SLOT_GRANULARITY_MINUTES: u32 = 30;
pub const DEFAULT_MIN_NOTICE_MINUTES: u32 = 60;
pub const DEFAULT_HORIZON_DAYS: u32 = 60;
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile", into = "ConfigFile")]
pub struct Config {
    pub timezone: Tz,
    pub slot_granularity_minutes: u32,
    /// strftime pattern for `Slot::display_label`.
    pub time_format: String,
    /// Lead time added to `now` before the same-day cutoff is rounded.
    pub min_notice_minutes: u32,
    pub dst_policy: DstPolicy,
    /// Default scan length for the next-available-date lookup.
    pub horizon_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezone: Tz::UTC,
            slot_granularity_minutes: DEFAULT_SLOT_GRANULARITY_MINUTES,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            min_notice_minutes: DEFAULT_MIN_NOTICE_MINUTES,
            dst_policy: DstPolicy::default(),
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl Config {
    /// Parse and validate a JSON settings document. Missing keys take defaults.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidConfig` on malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// # Errors
    /// Returns `EngineError::InvalidConfig` when the granularity is zero or the
    /// time format contains an unknown specifier.
    pub fn validate(&self) -> Result<()> {
        if self.slot_granularity_minutes == 0 {
            return Err(EngineError::InvalidConfig(
                "slot_granularity_minutes must be greater than zero".to_string(),
            ));
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(EngineError::InvalidConfig(format!(
                "invalid time_format: {}",
                self.time_format
            )));
        }
        Ok(())
    }

    /// Build the query for one service/provider/date with these settings.
    pub fn query(
        &self,
        service: Service,
        provider_id: ProviderId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> AvailabilityQuery {
        AvailabilityQuery {
            service,
            provider_id,
            date,
            slot_granularity_minutes: self.slot_granularity_minutes,
            now,
            timezone: self.timezone,
            min_notice_minutes: self.min_notice_minutes,
            time_format: self.time_format.clone(),
            dst_policy: self.dst_policy,
        }
    }
}

/// On-disk shape of [`Config`]; the timezone travels as an IANA name.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    timezone: String,
    slot_granularity_minutes: u32,
    time_format: String,
    min_notice_minutes: u32,
    dst_policy: DstPolicy,
    horizon_days: u32,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Config::default().into()
    }
}

impl From<Config> for ConfigFile {
    fn from(config: Config) -> Self {
        ConfigFile {
            timezone: config.timezone.name().to_string(),
            slot_granularity_minutes: config.slot_granularity_minutes,
            time_format: config.time_format,
            min_notice_minutes: config.min_notice_minutes,
            dst_policy: config.dst_policy,
            horizon_days: config.horizon_days,
        }
    }
}

impl TryFrom<ConfigFile> for Config {
    type Error = EngineError;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let timezone: Tz = file
            .timezone
            .parse()
            .map_err(|_| {
                EngineError::InvalidConfig(format!("unknown timezone: {}", file.timezone))
            })?;
        let config = Config {
            timezone,
            slot_granularity_minutes: file.slot_granularity_minutes,
            time_format: file.time_format,
            min_notice_minutes: file.min_notice_minutes,
            dst_policy: file.dst_policy,
            horizon_days: file.horizon_days,
        };
        config.validate()?;
        Ok(config)
    }
}
