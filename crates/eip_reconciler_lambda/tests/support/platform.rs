use std::collections::HashMap;
use std::sync::Mutex;

use eip_reconciler_core::contract::{AddressAssociation, TaskDescription};
use eip_reconciler_lambda::adapters::{
    AddressManager, PlatformError, PlatformOperation, TaskPlatform,
};

/// In-memory ECS + EC2 pair. The address map is the single source of truth,
/// like the real address-management API.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    tasks: HashMap<String, TaskDescription>,
    container_hosts: HashMap<String, String>,
    // allocation id -> instance id
    associations: HashMap<String, String>,
    injected_failures: HashMap<PlatformOperation, u32>,
    calls: Vec<PlatformOperation>,
    associate_calls: Vec<(String, String)>,
    next_association: u32,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a running service task on `instance_id`.
    pub fn run_task(&self, task_arn: &str, container_instance_arn: &str, instance_id: &str) {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.tasks.insert(
            task_arn.to_string(),
            TaskDescription {
                task_arn: task_arn.to_string(),
                cluster_arn: Some(super::CLUSTER_ARN.to_string()),
                last_status: "RUNNING".to_string(),
                desired_status: Some("RUNNING".to_string()),
                group: Some("service:squid".to_string()),
                container_instance_arn: Some(container_instance_arn.to_string()),
            },
        );
        state
            .container_hosts
            .insert(container_instance_arn.to_string(), instance_id.to_string());
    }

    pub fn stop_task(&self, task_arn: &str) {
        let mut state = self.state.lock().expect("poisoned mutex");
        if let Some(task) = state.tasks.get_mut(task_arn) {
            task.last_status = "STOPPED".to_string();
            task.desired_status = Some("STOPPED".to_string());
        }
    }

    /// ECS has been asked to stop the task but its containers still run.
    pub fn drain_task(&self, task_arn: &str) {
        let mut state = self.state.lock().expect("poisoned mutex");
        if let Some(task) = state.tasks.get_mut(task_arn) {
            task.desired_status = Some("STOPPED".to_string());
        }
    }

    pub fn attach(&self, allocation_id: &str, instance_id: &str) {
        self.state
            .lock()
            .expect("poisoned mutex")
            .associations
            .insert(allocation_id.to_string(), instance_id.to_string());
    }

    /// The next `count` calls of `operation` fail with a transient error.
    pub fn fail_next(&self, operation: PlatformOperation, count: u32) {
        self.state
            .lock()
            .expect("poisoned mutex")
            .injected_failures
            .insert(operation, count);
    }

    pub fn associated_instance(&self, allocation_id: &str) -> Option<String> {
        self.state
            .lock()
            .expect("poisoned mutex")
            .associations
            .get(allocation_id)
            .cloned()
    }

    pub fn associate_calls(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .expect("poisoned mutex")
            .associate_calls
            .clone()
    }

    pub fn calls(&self) -> Vec<PlatformOperation> {
        self.state.lock().expect("poisoned mutex").calls.clone()
    }

    fn record(&self, operation: PlatformOperation) -> Result<(), PlatformError> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(operation);
        match state.injected_failures.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(PlatformError::transient(operation, "injected throttling"))
            }
            _ => Ok(()),
        }
    }
}

impl TaskPlatform for FakePlatform {
    fn describe_task(
        &self,
        _cluster: &str,
        task_arn: &str,
    ) -> Result<Option<TaskDescription>, PlatformError> {
        self.record(PlatformOperation::DescribeTask)?;
        Ok(self
            .state
            .lock()
            .expect("poisoned mutex")
            .tasks
            .get(task_arn)
            .cloned())
    }

    fn container_instance_host(
        &self,
        _cluster: &str,
        container_instance_arn: &str,
    ) -> Result<Option<String>, PlatformError> {
        self.record(PlatformOperation::DescribeContainerInstance)?;
        Ok(self
            .state
            .lock()
            .expect("poisoned mutex")
            .container_hosts
            .get(container_instance_arn)
            .cloned())
    }
}

impl AddressManager for FakePlatform {
    fn associations_for_instance(
        &self,
        instance_id: &str,
    ) -> Result<Vec<AddressAssociation>, PlatformError> {
        self.record(PlatformOperation::ListAddressAssociations)?;
        let state = self.state.lock().expect("poisoned mutex");
        Ok(state
            .associations
            .iter()
            .filter(|(_, instance)| instance.as_str() == instance_id)
            .map(|(allocation, instance)| AddressAssociation {
                allocation_id: allocation.clone(),
                instance_id: Some(instance.clone()),
                association_id: Some(format!("eipassoc-{allocation}")),
                public_ip: Some("203.0.113.10".to_string()),
            })
            .collect())
    }

    fn associate(
        &self,
        allocation_id: &str,
        instance_id: &str,
    ) -> Result<Option<String>, PlatformError> {
        self.record(PlatformOperation::AssociateAddress)?;
        let mut state = self.state.lock().expect("poisoned mutex");
        state
            .associate_calls
            .push((allocation_id.to_string(), instance_id.to_string()));
        state
            .associations
            .insert(allocation_id.to_string(), instance_id.to_string());
        state.next_association += 1;
        Ok(Some(format!("eipassoc-{:04}", state.next_association)))
    }
}
