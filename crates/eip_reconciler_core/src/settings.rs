use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

pub const CLUSTER_NAME_ENV: &str = "CLUSTER_NAME";
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";
pub const EIP_ALLOCATION_ID_ENV: &str = "EIP_ALLOCATION_ID";
pub const MAX_ATTEMPTS_ENV: &str = "RECONCILE_MAX_ATTEMPTS";
pub const BASE_DELAY_MS_ENV: &str = "RECONCILE_BASE_DELAY_MS";
pub const MAX_DELAY_MS_ENV: &str = "RECONCILE_MAX_DELAY_MS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} has invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Deploy-time settings injected into the function environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    pub cluster: String,
    pub service_name: String,
    pub allocation_id: String,
    pub retry: RetryPolicy,
}

impl ReconcilerSettings {
    /// Builds settings from a variable lookup, usually `std::env::var`.
    ///
    /// Identifiers are only checked for presence; the platform APIs reject
    /// anything malformed.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let cluster = required(&lookup, CLUSTER_NAME_ENV)?;
        let service_name = required(&lookup, SERVICE_NAME_ENV)?;
        let allocation_id = required(&lookup, EIP_ALLOCATION_ID_ENV)?;

        let defaults = RetryPolicy::default();
        let max_attempts: u32 =
            optional_parsed(&lookup, MAX_ATTEMPTS_ENV)?.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigurationError::Invalid {
                name: MAX_ATTEMPTS_ENV,
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        let base_delay = optional_parsed::<u64>(&lookup, BASE_DELAY_MS_ENV)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_delay);
        let max_delay = optional_parsed::<u64>(&lookup, MAX_DELAY_MS_ENV)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay);

        Ok(Self {
            cluster,
            service_name,
            allocation_id,
            retry: RetryPolicy {
                max_attempts,
                base_delay,
                max_delay: max_delay.max(base_delay),
                ..defaults
            },
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigurationError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigurationError::Missing(name)),
    }
}

fn optional_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(name).filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|error: T::Err| ConfigurationError::Invalid {
            name,
            value: raw.clone(),
            reason: error.to_string(),
        })
}
