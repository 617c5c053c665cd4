#![allow(dead_code)]

pub mod platform;

use std::collections::HashMap;
use std::time::Duration;

use eip_reconciler_core::contract::ReconcileReport;
use eip_reconciler_core::retry::{Deadline, RetryPolicy};
use eip_reconciler_core::settings::{
    ReconcilerSettings, CLUSTER_NAME_ENV, EIP_ALLOCATION_ID_ENV, SERVICE_NAME_ENV,
};
use eip_reconciler_lambda::error::ReconcileError;
use eip_reconciler_lambda::handlers::reconcile::{
    handle_event_with_lookup, handle_task_state_event, ReconcileDeps,
};
use serde_json::{json, Value};

use platform::FakePlatform;

pub const CLUSTER_NAME: &str = "squid-proxy-dev";
pub const CLUSTER_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:cluster/squid-proxy-dev";
pub const SERVICE_NAME: &str = "squid";
pub const ALLOCATION_ID: &str = "eipalloc-1";

pub fn task_arn(id: &str) -> String {
    format!("arn:aws:ecs:us-east-1:123456789012:task/{CLUSTER_NAME}/{id}")
}

pub fn container_instance_arn(id: &str) -> String {
    format!("arn:aws:ecs:us-east-1:123456789012:container-instance/{CLUSTER_NAME}/{id}")
}

pub fn settings_with_attempts(max_attempts: u32) -> ReconcilerSettings {
    ReconcilerSettings {
        cluster: CLUSTER_NAME.to_string(),
        service_name: SERVICE_NAME.to_string(),
        allocation_id: ALLOCATION_ID.to_string(),
        retry: RetryPolicy::immediate(max_attempts),
    }
}

pub fn running_event(task_id: &str) -> Value {
    json!({
        "version": "0",
        "id": format!("evt-{task_id}"),
        "source": "aws.ecs",
        "detail-type": "ECS Task State Change",
        "account": "123456789012",
        "region": "us-east-1",
        "resources": [task_arn(task_id)],
        "detail": {
            "clusterArn": CLUSTER_ARN,
            "taskArn": task_arn(task_id),
            "lastStatus": "RUNNING",
            "desiredStatus": "RUNNING",
            "group": format!("service:{SERVICE_NAME}")
        }
    })
}

pub fn reconcile(
    platform: &FakePlatform,
    payload: Value,
    settings: &ReconcilerSettings,
) -> Result<ReconcileReport, ReconcileError> {
    let sleeper = |_: Duration| {};
    let deps = ReconcileDeps {
        tasks: platform,
        addresses: platform,
        sleeper: &sleeper,
        deadline: Deadline::none(),
    };
    handle_task_state_event(payload, settings, &deps)
}

pub fn reconcile_with_env(
    platform: &FakePlatform,
    payload: Value,
    env: &[(&str, &str)],
) -> Result<ReconcileReport, ReconcileError> {
    let values: HashMap<String, String> = env
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let sleeper = |_: Duration| {};
    let deps = ReconcileDeps {
        tasks: platform,
        addresses: platform,
        sleeper: &sleeper,
        deadline: Deadline::none(),
    };
    handle_event_with_lookup(payload, |name| values.get(name).cloned(), &deps)
}

pub fn complete_env() -> Vec<(&'static str, &'static str)> {
    vec![
        (CLUSTER_NAME_ENV, CLUSTER_NAME),
        (SERVICE_NAME_ENV, SERVICE_NAME),
        (EIP_ALLOCATION_ID_ENV, ALLOCATION_ID),
    ]
}
