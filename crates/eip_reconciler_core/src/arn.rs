//! Naming helpers for ECS identifiers.
//!
//! ECS ARNs have the shape `arn:<partition>:ecs:<region>:<account>:<resource>`
//! where the resource part is `cluster/<name>`, `task/<cluster>/<id>` (long
//! ARN format) or `task/<id>` (legacy format).

const ARN_FIELD_COUNT: usize = 6;
const SERVICE_GROUP_PREFIX: &str = "service:";

/// Returns the resource part of an ARN (everything after the account field).
pub fn resource_part(arn: &str) -> Option<&str> {
    let mut fields = arn.splitn(ARN_FIELD_COUNT, ':');
    if fields.next()? != "arn" {
        return None;
    }
    let resource = fields.nth(ARN_FIELD_COUNT - 2)?;
    if resource.is_empty() {
        None
    } else {
        Some(resource)
    }
}

pub fn cluster_name_from_arn(cluster_arn: &str) -> Option<&str> {
    let name = resource_part(cluster_arn)?.strip_prefix("cluster/")?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name)
}

/// Last path segment of a task ARN, e.g. `0123abcd` for
/// `arn:aws:ecs:us-east-1:123456789012:task/proxy/0123abcd`.
pub fn task_id_from_arn(task_arn: &str) -> Option<&str> {
    let resource = resource_part(task_arn)?.strip_prefix("task/")?;
    resource.rsplit('/').next().filter(|id| !id.is_empty())
}

/// The configured cluster may be a bare name or a full ARN; the event always
/// carries the ARN.
pub fn cluster_matches(configured_cluster: &str, event_cluster_arn: &str) -> bool {
    let configured = configured_cluster.trim();
    if configured.is_empty() {
        return false;
    }
    if configured.starts_with("arn:") {
        return configured == event_cluster_arn;
    }
    cluster_name_from_arn(event_cluster_arn) == Some(configured)
}

pub fn service_group(service_name: &str) -> String {
    format!("{SERVICE_GROUP_PREFIX}{service_name}")
}

pub fn task_group_matches_service(group: &str, service_name: &str) -> bool {
    group
        .strip_prefix(SERVICE_GROUP_PREFIX)
        .is_some_and(|name| name == service_name)
}
