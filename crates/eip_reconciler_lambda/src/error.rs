use eip_reconciler_core::contract::EventError;
use eip_reconciler_core::settings::ConfigurationError;
use thiserror::Error;

use crate::adapters::{PlatformError, PlatformOperation};

/// Every way an invocation can fail. No-op outcomes are not errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("permanent configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("malformed lifecycle event: {0}")]
    MalformedEvent(#[from] EventError),
    #[error("permanent platform error: {0}")]
    PermanentPlatform(PlatformError),
    #[error("{operation} still failing after {attempts} attempts: {last}")]
    ExhaustedRetries {
        operation: PlatformOperation,
        attempts: u32,
        last: PlatformError,
    },
}

impl ReconcileError {
    /// Stable label used in structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::MalformedEvent(_) => "malformed_event",
            Self::PermanentPlatform(_) => "permanent_platform_error",
            Self::ExhaustedRetries { operation, .. } if operation.is_lookup() => {
                "transient_lookup_failure"
            }
            Self::ExhaustedRetries { .. } => "transient_association_failure",
        }
    }
}
