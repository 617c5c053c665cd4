use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformOperation {
    DescribeTask,
    DescribeContainerInstance,
    ListAddressAssociations,
    AssociateAddress,
}

impl PlatformOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DescribeTask => "describe_task",
            Self::DescribeContainerInstance => "describe_container_instance",
            Self::ListAddressAssociations => "list_address_associations",
            Self::AssociateAddress => "associate_address",
        }
    }

    /// Lookups only read platform state; the association is the one write.
    pub fn is_lookup(self) -> bool {
        !matches!(self, Self::AssociateAddress)
    }
}

impl fmt::Display for PlatformOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeouts, throttling, eventual-consistency misses. Worth retrying.
    Transient,
    Permanent,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct PlatformError {
    pub operation: PlatformOperation,
    pub kind: ErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn transient(operation: PlatformOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(operation: PlatformOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}
