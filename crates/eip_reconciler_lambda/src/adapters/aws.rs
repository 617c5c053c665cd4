use std::future::Future;

use aws_sdk_ec2::types::Filter;
use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use eip_reconciler_core::contract::{AddressAssociation, TaskDescription};

use super::{AddressManager, PlatformError, PlatformOperation, TaskPlatform};

const INSTANCE_ID_FILTER: &str = "instance-id";

/// Service error codes that clear up on their own.
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "TooManyRequestsException",
    "ServerException",
    "InternalError",
    "InternalFailure",
    "ServiceUnavailable",
    "Unavailable",
    // EC2 is eventually consistent for freshly launched instances.
    "InvalidInstanceID.NotFound",
];

pub fn is_transient_error_code(code: &str) -> bool {
    TRANSIENT_ERROR_CODES.contains(&code)
}

/// Maps an SDK failure onto the reconciler's retry taxonomy.
///
/// Transport-level failures are always transient; service errors are
/// transient only for the codes in `TRANSIENT_ERROR_CODES`.
pub fn classify_sdk_error<E, R>(operation: PlatformOperation, error: &SdkError<E, R>) -> PlatformError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(error).to_string();
    match error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            PlatformError::transient(operation, message)
        }
        SdkError::ServiceError(context) => {
            if context.err().code().is_some_and(is_transient_error_code) {
                PlatformError::transient(operation, message)
            } else {
                PlatformError::permanent(operation, message)
            }
        }
        _ => PlatformError::permanent(operation, message),
    }
}

fn block_on_sdk<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

pub struct EcsTaskPlatform {
    ecs_client: aws_sdk_ecs::Client,
}

impl EcsTaskPlatform {
    pub fn new(ecs_client: aws_sdk_ecs::Client) -> Self {
        Self { ecs_client }
    }
}

impl TaskPlatform for EcsTaskPlatform {
    fn describe_task(
        &self,
        cluster: &str,
        task_arn: &str,
    ) -> Result<Option<TaskDescription>, PlatformError> {
        let client = self.ecs_client.clone();
        let cluster = cluster.to_string();
        let requested_task = task_arn.to_string();

        let output = block_on_sdk(async move {
            client
                .describe_tasks()
                .cluster(cluster)
                .tasks(requested_task)
                .send()
                .await
        })
        .map_err(|error| classify_sdk_error(PlatformOperation::DescribeTask, &error))?;

        Ok(output.tasks().first().map(|task| TaskDescription {
            task_arn: task.task_arn().unwrap_or(task_arn).to_string(),
            cluster_arn: task.cluster_arn().map(str::to_string),
            last_status: task.last_status().unwrap_or_default().to_string(),
            desired_status: task.desired_status().map(str::to_string),
            group: task.group().map(str::to_string),
            container_instance_arn: task.container_instance_arn().map(str::to_string),
        }))
    }

    fn container_instance_host(
        &self,
        cluster: &str,
        container_instance_arn: &str,
    ) -> Result<Option<String>, PlatformError> {
        let client = self.ecs_client.clone();
        let cluster = cluster.to_string();
        let container_instance = container_instance_arn.to_string();

        let output = block_on_sdk(async move {
            client
                .describe_container_instances()
                .cluster(cluster)
                .container_instances(container_instance)
                .send()
                .await
        })
        .map_err(|error| classify_sdk_error(PlatformOperation::DescribeContainerInstance, &error))?;

        Ok(output
            .container_instances()
            .first()
            .and_then(|instance| instance.ec2_instance_id())
            .map(str::to_string))
    }
}

pub struct Ec2AddressManager {
    ec2_client: aws_sdk_ec2::Client,
}

impl Ec2AddressManager {
    pub fn new(ec2_client: aws_sdk_ec2::Client) -> Self {
        Self { ec2_client }
    }
}

impl AddressManager for Ec2AddressManager {
    fn associations_for_instance(
        &self,
        instance_id: &str,
    ) -> Result<Vec<AddressAssociation>, PlatformError> {
        let client = self.ec2_client.clone();
        let filter = Filter::builder()
            .name(INSTANCE_ID_FILTER)
            .values(instance_id)
            .build();

        let output = block_on_sdk(async move { client.describe_addresses().filters(filter).send().await })
            .map_err(|error| classify_sdk_error(PlatformOperation::ListAddressAssociations, &error))?;

        Ok(output
            .addresses()
            .iter()
            .filter_map(|address| {
                Some(AddressAssociation {
                    allocation_id: address.allocation_id()?.to_string(),
                    instance_id: address.instance_id().map(str::to_string),
                    association_id: address.association_id().map(str::to_string),
                    public_ip: address.public_ip().map(str::to_string),
                })
            })
            .collect())
    }

    fn associate(
        &self,
        allocation_id: &str,
        instance_id: &str,
    ) -> Result<Option<String>, PlatformError> {
        let client = self.ec2_client.clone();
        let allocation_id = allocation_id.to_string();
        let instance_id = instance_id.to_string();

        let output = block_on_sdk(async move {
            client
                .associate_address()
                .allocation_id(allocation_id)
                .instance_id(instance_id)
                .allow_reassociation(true)
                .send()
                .await
        })
        .map_err(|error| classify_sdk_error(PlatformOperation::AssociateAddress, &error))?;

        Ok(output.association_id().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_ec2::error::ErrorMetadata;
    use aws_sdk_ec2::operation::associate_address::AssociateAddressError;

    use super::*;

    fn service_error(code: &str) -> SdkError<AssociateAddressError, ()> {
        SdkError::service_error(
            AssociateAddressError::generic(
                ErrorMetadata::builder()
                    .code(code)
                    .message("service said no")
                    .build(),
            ),
            (),
        )
    }

    #[test]
    fn throttling_and_eventual_consistency_codes_are_transient() {
        for code in ["RequestLimitExceeded", "InvalidInstanceID.NotFound", "Unavailable"] {
            let classified =
                classify_sdk_error(PlatformOperation::AssociateAddress, &service_error(code));
            assert!(classified.is_transient(), "{code} should be transient");
        }
    }

    #[test]
    fn authorization_and_unknown_allocation_are_permanent() {
        for code in ["UnauthorizedOperation", "InvalidAllocationID.NotFound"] {
            let classified =
                classify_sdk_error(PlatformOperation::AssociateAddress, &service_error(code));
            assert!(!classified.is_transient(), "{code} should be permanent");
            assert_eq!(classified.operation, PlatformOperation::AssociateAddress);
        }
    }

    #[test]
    fn timeouts_are_transient() {
        let error: SdkError<AssociateAddressError, ()> = SdkError::timeout_error("deadline hit");
        let classified = classify_sdk_error(PlatformOperation::DescribeTask, &error);
        assert!(classified.is_transient());
        assert_eq!(classified.operation, PlatformOperation::DescribeTask);
    }

    #[test]
    fn construction_failures_are_permanent() {
        let error: SdkError<AssociateAddressError, ()> =
            SdkError::construction_failure("missing allocation id");
        assert!(!classify_sdk_error(PlatformOperation::AssociateAddress, &error).is_transient());
    }
}
