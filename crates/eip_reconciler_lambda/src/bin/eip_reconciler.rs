use std::time::Duration;

use chrono::Utc;
use eip_reconciler_core::contract::ReconcileReport;
use eip_reconciler_core::retry::Deadline;
use eip_reconciler_lambda::adapters::aws::{Ec2AddressManager, EcsTaskPlatform};
use eip_reconciler_lambda::handlers::reconcile::{handle_event_with_lookup, ReconcileDeps};
use eip_reconciler_lambda::telemetry::init_tracing;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

/// Time kept back from the Lambda deadline so a failed invocation can still
/// report its error.
const DEADLINE_HEADROOM: Duration = Duration::from_millis(500);

struct PlatformClients {
    tasks: EcsTaskPlatform,
    addresses: Ec2AddressManager,
}

async fn handle_request(
    clients: &PlatformClients,
    event: LambdaEvent<Value>,
) -> Result<ReconcileReport, Error> {
    let deadline = invocation_deadline(event.context.deadline, Utc::now().timestamp_millis());
    let sleeper = |delay: Duration| tokio::task::block_in_place(|| std::thread::sleep(delay));
    let deps = ReconcileDeps {
        tasks: &clients.tasks,
        addresses: &clients.addresses,
        sleeper: &sleeper,
        deadline,
    };

    handle_event_with_lookup(event.payload, |name| std::env::var(name).ok(), &deps)
        .map_err(|error| Error::from(error.to_string()))
}

/// Converts the runtime's epoch-millisecond deadline into a local budget.
fn invocation_deadline(deadline_epoch_ms: u64, now_epoch_ms: i64) -> Deadline {
    let remaining_ms = i64::try_from(deadline_epoch_ms)
        .unwrap_or(i64::MAX)
        .saturating_sub(now_epoch_ms)
        .max(0);
    let remaining = Duration::from_millis(remaining_ms as u64).saturating_sub(DEADLINE_HEADROOM);
    Deadline::after(remaining)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let clients = PlatformClients {
        tasks: EcsTaskPlatform::new(aws_sdk_ecs::Client::new(&aws_config)),
        addresses: Ec2AddressManager::new(aws_sdk_ec2::Client::new(&aws_config)),
    };
    let clients = &clients;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(clients, event).await
    }))
    .await
}
