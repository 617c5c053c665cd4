use std::time::Duration;

use eip_reconciler_core::arn::{
    cluster_matches, service_group, task_group_matches_service, task_id_from_arn,
};
use eip_reconciler_core::contract::{
    parse_lifecycle_event, EventScreening, LifecycleEvent, ReconcileOutcome, ReconcileReport,
    RunningTaskEvent,
};
use eip_reconciler_core::retry::{Deadline, RetryPolicy};
use eip_reconciler_core::settings::ReconcilerSettings;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::{AddressManager, PlatformError, PlatformOperation, TaskPlatform};
use crate::error::ReconcileError;

const COMPONENT: &str = "eip_reconciler";

/// Platform handles and time budget for one invocation.
pub struct ReconcileDeps<'a, T, A> {
    pub tasks: &'a T,
    pub addresses: &'a A,
    pub sleeper: &'a dyn Fn(Duration),
    pub deadline: Deadline,
}

/// Entry point used by the Lambda binary: settings are read through `lookup`
/// before anything touches the platform.
pub fn handle_event_with_lookup<T, A>(
    payload: Value,
    lookup: impl Fn(&str) -> Option<String>,
    deps: &ReconcileDeps<'_, T, A>,
) -> Result<ReconcileReport, ReconcileError>
where
    T: TaskPlatform,
    A: AddressManager,
{
    let settings = ReconcilerSettings::from_lookup(lookup).inspect_err(|error| {
        error!(
            component = COMPONENT,
            event = "reconcile_failed",
            error_code = "configuration_error",
            error = %error,
            "reconciler is misconfigured"
        );
    })?;
    handle_task_state_event(payload, &settings, deps)
}

pub fn handle_task_state_event<T, A>(
    payload: Value,
    settings: &ReconcilerSettings,
    deps: &ReconcileDeps<'_, T, A>,
) -> Result<ReconcileReport, ReconcileError>
where
    T: TaskPlatform,
    A: AddressManager,
{
    let event = match parse_lifecycle_event(payload) {
        Ok(LifecycleEvent::TaskStateChange(event)) => event,
        Ok(LifecycleEvent::Unrelated {
            source,
            detail_type,
        }) => {
            let outcome = ReconcileOutcome::Ignored {
                reason: format!(
                    "unrelated event {} / {}",
                    source.as_deref().unwrap_or("<none>"),
                    detail_type.as_deref().unwrap_or("<none>")
                ),
            };
            log_outcome(&outcome, None);
            return Ok(ReconcileReport::new(
                &outcome,
                None,
                None,
                &settings.allocation_id,
                0,
            ));
        }
        Err(parse_error) => {
            let failure = ReconcileError::from(parse_error);
            log_failure(&failure, None);
            return Err(failure);
        }
    };

    let event_id = event.event_id.clone();
    let task_arn = event.task_arn.clone();
    info!(
        component = COMPONENT,
        event = "event_received",
        event_id = event_id.as_deref().unwrap_or_default(),
        task_arn = task_arn.as_deref().unwrap_or_default(),
        task_id = task_id(task_arn.as_deref()),
        cluster_arn = event.cluster_arn.as_deref().unwrap_or_default(),
        last_status = event.last_status.as_deref().unwrap_or_default(),
        "received task state change"
    );

    let report = |outcome: &ReconcileOutcome, attempts: u32| {
        log_outcome(outcome, task_arn.as_deref());
        ReconcileReport::new(
            outcome,
            event_id.clone(),
            task_arn.clone(),
            &settings.allocation_id,
            attempts,
        )
    };

    let running = match event.screen(&settings.cluster) {
        Ok(EventScreening::Reconcile(running)) => running,
        Ok(EventScreening::Ignore(reason)) => {
            return Ok(report(&ReconcileOutcome::Ignored { reason }, 0));
        }
        Err(screen_error) => {
            let failure = ReconcileError::from(screen_error);
            log_failure(&failure, task_arn.as_deref());
            return Err(failure);
        }
    };

    let mut calls = RetryingCalls::new(settings.retry, deps);
    match reconcile(&running, settings, deps, &mut calls) {
        Ok(outcome) => Ok(report(&outcome, calls.attempts)),
        Err(failure) => {
            log_failure(&failure, task_arn.as_deref());
            Err(failure)
        }
    }
}

fn reconcile<T, A>(
    event: &RunningTaskEvent,
    settings: &ReconcilerSettings,
    deps: &ReconcileDeps<'_, T, A>,
    calls: &mut RetryingCalls<'_, T, A>,
) -> Result<ReconcileOutcome, ReconcileError>
where
    T: TaskPlatform,
    A: AddressManager,
{
    let cluster = settings.cluster.as_str();
    let task = calls.run(PlatformOperation::DescribeTask, || {
        deps.tasks.describe_task(cluster, &event.task_arn)
    })?;
    let Some(task) = task else {
        return Ok(stale("task is no longer known to the cluster"));
    };
    if !task.is_running() {
        return Ok(stale(format!("task is now {}", task.last_status)));
    }
    if task.is_draining() {
        return Ok(stale(format!(
            "task desired status is {}",
            task.desired_status.as_deref().unwrap_or_default()
        )));
    }
    if let Some(live_cluster) = task
        .cluster_arn
        .as_deref()
        .filter(|arn| !cluster_matches(cluster, arn))
    {
        return Ok(ReconcileOutcome::Ignored {
            reason: format!("task belongs to cluster {live_cluster}"),
        });
    }

    let group = task.group.as_deref().or(event.group.as_deref());
    if !group.is_some_and(|group| task_group_matches_service(group, &settings.service_name)) {
        return Ok(ReconcileOutcome::Ignored {
            reason: format!(
                "task group {} is not {}",
                group.unwrap_or("<none>"),
                service_group(&settings.service_name)
            ),
        });
    }

    let Some(container_instance_arn) = task.container_instance_arn.as_deref() else {
        return Ok(stale("task has no container instance"));
    };
    let host = calls.run(PlatformOperation::DescribeContainerInstance, || {
        deps.tasks
            .container_instance_host(cluster, container_instance_arn)
    })?;
    let Some(instance_id) = host else {
        return Ok(stale("container instance has no host instance"));
    };

    let associations = calls.run(PlatformOperation::ListAddressAssociations, || {
        deps.addresses.associations_for_instance(&instance_id)
    })?;
    if associations
        .iter()
        .any(|association| association.allocation_id == settings.allocation_id)
    {
        return Ok(ReconcileOutcome::AlreadyAssociated { instance_id });
    }

    let association_id = calls.run(PlatformOperation::AssociateAddress, || {
        deps.addresses
            .associate(&settings.allocation_id, &instance_id)
    })?;

    Ok(ReconcileOutcome::Associated {
        instance_id,
        association_id,
    })
}

fn stale(reason: impl Into<String>) -> ReconcileOutcome {
    ReconcileOutcome::StaleEvent {
        reason: reason.into(),
    }
}

/// Runs platform calls under the retry policy and counts every attempt.
struct RetryingCalls<'d, T, A> {
    policy: RetryPolicy,
    deps: &'d ReconcileDeps<'d, T, A>,
    attempts: u32,
}

impl<'d, T, A> RetryingCalls<'d, T, A> {
    fn new(policy: RetryPolicy, deps: &'d ReconcileDeps<'d, T, A>) -> Self {
        Self {
            policy,
            deps,
            attempts: 0,
        }
    }

    fn run<R>(
        &mut self,
        operation: PlatformOperation,
        mut call: impl FnMut() -> Result<R, PlatformError>,
    ) -> Result<R, ReconcileError> {
        let mut failures = 0u32;
        loop {
            self.attempts += 1;
            let failure = match call() {
                Ok(value) => return Ok(value),
                Err(failure) if !failure.is_transient() => {
                    return Err(ReconcileError::PermanentPlatform(failure));
                }
                Err(failure) => failure,
            };

            failures += 1;
            let delay = self
                .policy
                .backoff_after(failures)
                .filter(|delay| self.deps.deadline.allows(*delay));
            let Some(delay) = delay else {
                return Err(ReconcileError::ExhaustedRetries {
                    operation,
                    attempts: failures,
                    last: failure,
                });
            };

            warn!(
                component = COMPONENT,
                event = "platform_call_retry",
                operation = %operation,
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying platform call"
            );
            (self.deps.sleeper)(delay);
        }
    }
}

fn task_id(task_arn: Option<&str>) -> &str {
    task_arn.and_then(task_id_from_arn).unwrap_or_default()
}

fn log_outcome(outcome: &ReconcileOutcome, task_arn: Option<&str>) {
    let task_id = task_id(task_arn);
    let task_arn = task_arn.unwrap_or_default();
    match outcome {
        ReconcileOutcome::Associated {
            instance_id,
            association_id,
        } => info!(
            component = COMPONENT,
            event = "address_associated",
            task_arn,
            task_id,
            instance_id = %instance_id,
            association_id = association_id.as_deref().unwrap_or_default(),
            "static address moved to task host"
        ),
        ReconcileOutcome::AlreadyAssociated { instance_id } => info!(
            component = COMPONENT,
            event = "already_associated",
            task_arn,
            task_id,
            instance_id = %instance_id,
            "static address already on task host"
        ),
        ReconcileOutcome::StaleEvent { reason } => info!(
            component = COMPONENT,
            event = "stale_event",
            task_arn,
            task_id,
            reason = %reason,
            "skipping stale event"
        ),
        ReconcileOutcome::Ignored { reason } => info!(
            component = COMPONENT,
            event = "event_ignored",
            task_arn,
            task_id,
            reason = %reason,
            "event does not concern the proxy service"
        ),
    }
}

fn log_failure(failure: &ReconcileError, task_arn: Option<&str>) {
    error!(
        component = COMPONENT,
        event = "reconcile_failed",
        error_code = failure.code(),
        task_arn = task_arn.unwrap_or_default(),
        task_id = task_id(task_arn),
        error = %failure,
        "reconciliation failed"
    );
}
