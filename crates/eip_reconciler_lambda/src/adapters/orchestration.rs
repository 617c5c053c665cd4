use eip_reconciler_core::contract::TaskDescription;

use super::PlatformError;

/// Read-only view of the container orchestration platform.
pub trait TaskPlatform {
    /// `Ok(None)` when the platform no longer knows the task.
    fn describe_task(
        &self,
        cluster: &str,
        task_arn: &str,
    ) -> Result<Option<TaskDescription>, PlatformError>;

    /// Resolves a container instance to the compute instance id backing it.
    fn container_instance_host(
        &self,
        cluster: &str,
        container_instance_arn: &str,
    ) -> Result<Option<String>, PlatformError>;
}
