//! Shared Elastic IP reconciliation domain primitives.
//!
//! This crate owns the lifecycle event contract, runtime settings, ARN naming
//! helpers and the retry policy. It intentionally excludes AWS SDK and Lambda
//! runtime concerns, which live in `eip_reconciler_lambda`.

pub mod arn;
pub mod contract;
pub mod retry;
pub mod settings;
