//! AWS-oriented adapters and handlers for Elastic IP reconciliation.
//!
//! This crate owns runtime integration details (the Lambda handler, ECS and
//! EC2 adapters, logging setup) on top of the domain primitives in
//! `eip_reconciler_core`.

pub mod adapters;
pub mod error;
pub mod handlers;
pub mod telemetry;
