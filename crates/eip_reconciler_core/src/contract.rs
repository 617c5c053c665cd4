use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::arn::cluster_matches;

pub const ECS_EVENT_SOURCE: &str = "aws.ecs";
pub const TASK_STATE_CHANGE_DETAIL_TYPE: &str = "ECS Task State Change";
pub const RUNNING_STATUS: &str = "RUNNING";
pub const REPORT_SCHEMA_VERSION: &str = "v1";

/// Raw EventBridge envelope. Only the fields the reconciler reads are kept.
#[derive(Debug, Clone, Deserialize)]
struct EventEnvelope {
    id: Option<String>,
    source: Option<String>,
    #[serde(rename = "detail-type")]
    detail_type: Option<String>,
    detail: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskStateChangeDetail {
    cluster_arn: Option<String>,
    task_arn: Option<String>,
    last_status: Option<String>,
    desired_status: Option<String>,
    group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    TaskStateChange(TaskStateChangeEvent),
    /// Anything that is not an ECS task state change; carried only so the
    /// caller can log what it skipped.
    Unrelated {
        source: Option<String>,
        detail_type: Option<String>,
    },
}

/// Task state change as delivered. Every detail field is optional until the
/// event has been screened, so foreign events never fail on shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStateChangeEvent {
    pub event_id: Option<String>,
    pub cluster_arn: Option<String>,
    pub task_arn: Option<String>,
    pub last_status: Option<String>,
    pub desired_status: Option<String>,
    pub group: Option<String>,
}

/// A screened event for the configured cluster whose task claims to be
/// running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTaskEvent {
    pub event_id: Option<String>,
    pub cluster_arn: String,
    pub task_arn: String,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventScreening {
    Ignore(String),
    Reconcile(RunningTaskEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("malformed event payload: {0}")]
    Malformed(String),
    #[error("event detail is missing required field `{0}`")]
    MissingField(&'static str),
}

pub fn parse_lifecycle_event(payload: Value) -> Result<LifecycleEvent, EventError> {
    if !payload.is_object() {
        return Err(EventError::Malformed(
            "event payload must be a JSON object".to_string(),
        ));
    }
    let envelope: EventEnvelope = serde_json::from_value(payload)
        .map_err(|error| EventError::Malformed(error.to_string()))?;

    let is_task_state_change = envelope.source.as_deref() == Some(ECS_EVENT_SOURCE)
        && envelope.detail_type.as_deref() == Some(TASK_STATE_CHANGE_DETAIL_TYPE);
    if !is_task_state_change {
        return Ok(LifecycleEvent::Unrelated {
            source: envelope.source,
            detail_type: envelope.detail_type,
        });
    }

    let detail: TaskStateChangeDetail =
        serde_json::from_value(envelope.detail.ok_or(EventError::MissingField("detail"))?)
            .map_err(|error| EventError::Malformed(format!("invalid task detail: {error}")))?;

    Ok(LifecycleEvent::TaskStateChange(TaskStateChangeEvent {
        event_id: envelope.id,
        cluster_arn: non_blank(detail.cluster_arn),
        task_arn: non_blank(detail.task_arn),
        last_status: non_blank(detail.last_status),
        desired_status: non_blank(detail.desired_status),
        group: non_blank(detail.group),
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

impl TaskStateChangeEvent {
    /// Filters on status and cluster first; only an event that survives the
    /// filters must carry a task ARN.
    ///
    /// The payload is only trusted for identifiers and coarse filtering; the
    /// live task state is re-read before any address change.
    pub fn screen(self, configured_cluster: &str) -> Result<EventScreening, EventError> {
        let last_status = self.last_status.as_deref().unwrap_or("<none>");
        if last_status != RUNNING_STATUS {
            return Ok(EventScreening::Ignore(format!(
                "task last status is {last_status}"
            )));
        }
        if let Some(desired) = self
            .desired_status
            .as_deref()
            .filter(|desired| *desired != RUNNING_STATUS)
        {
            return Ok(EventScreening::Ignore(format!(
                "task desired status is {desired}"
            )));
        }
        let Some(cluster_arn) = self
            .cluster_arn
            .filter(|arn| cluster_matches(configured_cluster, arn))
        else {
            return Ok(EventScreening::Ignore(format!(
                "event is not for cluster {configured_cluster}"
            )));
        };
        let task_arn = self.task_arn.ok_or(EventError::MissingField("taskArn"))?;

        Ok(EventScreening::Reconcile(RunningTaskEvent {
            event_id: self.event_id,
            cluster_arn,
            task_arn,
            group: self.group,
        }))
    }
}

/// Live view of a task as reported by the orchestration platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescription {
    pub task_arn: String,
    pub cluster_arn: Option<String>,
    pub last_status: String,
    pub desired_status: Option<String>,
    pub group: Option<String>,
    pub container_instance_arn: Option<String>,
}

impl TaskDescription {
    pub fn is_running(&self) -> bool {
        self.last_status == RUNNING_STATUS
    }

    /// A task ECS has been asked to stop still reports RUNNING until its
    /// containers exit; it must not win the address.
    pub fn is_draining(&self) -> bool {
        self.desired_status
            .as_deref()
            .is_some_and(|desired| desired != RUNNING_STATUS)
    }
}

/// One Elastic IP association as reported by the address-management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAssociation {
    pub allocation_id: String,
    pub instance_id: Option<String>,
    pub association_id: Option<String>,
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Associated {
        instance_id: String,
        association_id: Option<String>,
    },
    AlreadyAssociated {
        instance_id: String,
    },
    StaleEvent {
        reason: String,
    },
    Ignored {
        reason: String,
    },
}

impl ReconcileOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Associated { .. } => "associated",
            Self::AlreadyAssociated { .. } => "already_associated",
            Self::StaleEvent { .. } => "stale_event",
            Self::Ignored { .. } => "ignored",
        }
    }

    pub fn instance_id(&self) -> Option<&str> {
        match self {
            Self::Associated { instance_id, .. } | Self::AlreadyAssociated { instance_id } => {
                Some(instance_id.as_str())
            }
            Self::StaleEvent { .. } | Self::Ignored { .. } => None,
        }
    }
}

/// Body returned to the invoking platform for a successful invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_arn: Option<String>,
    pub allocation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub attempts: u32,
}

impl ReconcileReport {
    pub fn new(
        outcome: &ReconcileOutcome,
        event_id: Option<String>,
        task_arn: Option<String>,
        allocation_id: impl Into<String>,
        attempts: u32,
    ) -> Self {
        let (association_id, reason) = match outcome {
            ReconcileOutcome::Associated { association_id, .. } => (association_id.clone(), None),
            ReconcileOutcome::AlreadyAssociated { .. } => (None, None),
            ReconcileOutcome::StaleEvent { reason } | ReconcileOutcome::Ignored { reason } => {
                (None, Some(reason.clone()))
            }
        };
        Self {
            status: outcome.status().to_string(),
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            event_id,
            task_arn,
            allocation_id: allocation_id.into(),
            instance_id: outcome.instance_id().map(str::to_string),
            association_id,
            reason,
            attempts,
        }
    }
}

/// EventBridge rule pattern that routes running-task events of one cluster to
/// the reconciler.
pub fn task_state_event_pattern(cluster_arn: &str) -> Value {
    json!({
        "source": [ECS_EVENT_SOURCE],
        "detail-type": [TASK_STATE_CHANGE_DETAIL_TYPE],
        "detail": {
            "clusterArn": [cluster_arn],
            "lastStatus": [RUNNING_STATUS],
        },
    })
}
