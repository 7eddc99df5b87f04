use attribution::MappingConfig;
use chrono::FixedOffset;
use commerce::StoreCredentials;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use traffic::QuotaPolicy;

const MIN_REFRESH_INTERVAL_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    Load(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no analytics properties configured")]
    NoProperties,

    #[error("empty analytics property id")]
    EmptyPropertyId,

    #[error("refresh interval must be at least 30 seconds")]
    RefreshIntervalTooShort,

    #[error("reporting UTC offset is out of range")]
    InvalidUtcOffset,

    #[error("invalid attribution mappings: {0}")]
    Mappings(#[from] attribution::ValidationError),

    #[error("invalid quota policy: {0}")]
    Quota(#[from] traffic::ValidationError),

    #[error("invalid store credentials: {0}")]
    Stores(#[from] commerce::ValidationError),
}

fn default_target_users_5min() -> u64 {
    50
}

fn default_target_users_30min() -> u64 {
    200
}

fn default_target_views_30min() -> u64 {
    1000
}

/// Heat targets the presentation layer colors its KPI tiles against.
/// Carried in config so every viewer of a property sees the same scale.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct KpiTargets {
    #[serde(default = "default_target_users_5min")]
    pub active_users_5min: u64,

    #[serde(default = "default_target_users_30min")]
    pub active_users_30min: u64,

    #[serde(default = "default_target_views_30min")]
    pub views_30min: u64,
}

impl Default for KpiTargets {
    fn default() -> Self {
        KpiTargets {
            active_users_5min: default_target_users_5min(),
            active_users_30min: default_target_users_30min(),
            views_30min: default_target_views_30min(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ReportingConfig {
    /// Offset of the reporting timezone from UTC, in minutes. Historical
    /// day/week buckets and purchase wall-clock times are evaluated here.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default)]
    pub targets: KpiTargets,
}

impl ReportingConfig {
    pub fn timezone(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or(ConfigError::InvalidUtcOffset)
    }
}

fn default_refresh_interval_secs() -> u64 {
    75
}

/// Top-level dashboard configuration, loaded from one YAML file. All
/// values are read-only inputs; how credentials get into the file is the
/// embedding application's concern.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Analytics properties queried per refresh. More than one property
    /// makes each refresh an atomic multi-property batch.
    pub property_ids: Vec<String>,

    #[serde(default)]
    pub quota: QuotaPolicy,

    #[serde(default)]
    pub stores: Vec<StoreCredentials>,

    pub mappings: MappingConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.property_ids.is_empty() {
            return Err(ConfigError::NoProperties);
        }
        if self.property_ids.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyPropertyId);
        }
        if self.refresh_interval_secs < MIN_REFRESH_INTERVAL_SECS {
            return Err(ConfigError::RefreshIntervalTooShort);
        }
        self.reporting.timezone()?;
        self.quota.validate()?;
        self.mappings.validate()?;
        commerce::config::validate_stores(&self.stores)?;
        Ok(())
    }
}
