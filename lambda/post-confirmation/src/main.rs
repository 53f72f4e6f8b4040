use aws_config::{BehaviorVersion, Region};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use registration_shared::{
    DeadLetterQueueService, DynamoDBService, FailurePolicy, PostConfirmationEvent,
    RegistrationOutcome, RegistrationRecorder, RuntimeConfig,
};

async fn function_handler(
    recorder: &RegistrationRecorder,
    event: LambdaEvent<PostConfirmationEvent>,
) -> Result<PostConfirmationEvent, Error> {
    let (payload, context) = event.into_parts();

    info!("Received post-confirmation event, request ID: {}", context.request_id);
    if let Some(trigger_source) = payload.trigger_source() {
        info!("Trigger source: {}", trigger_source);
    }
    debug!("Event: {:?}", payload);

    match recorder.handle(&payload).await {
        Ok(RegistrationOutcome::Recorded(record)) => {
            info!("Success: user {} recorded", record.user_id);
        }
        Ok(RegistrationOutcome::Skipped) => {
            info!("Nothing was written, no sub on event");
        }
        Ok(RegistrationOutcome::AlreadyRegistered(user_id)) => {
            info!("User {} was already recorded", user_id);
        }
        Ok(RegistrationOutcome::WriteFailed { error, dead_lettered }) => {
            error!("User record not written ({}), dead-lettered: {}", error, dead_lettered);
        }
        Err(e) => {
            error!("Failed to handle post-confirmation: {}", e);
            return Err(e.into());
        }
    }

    // Cognito expects the event back
    Ok(payload)
}

async fn build_recorder(config: &RuntimeConfig) -> RegistrationRecorder {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;

    let dynamodb_client = aws_sdk_dynamodb::Client::new(&sdk_config);
    let store = DynamoDBService::new(dynamodb_client, config.table_name.clone());

    let mut recorder = RegistrationRecorder::new(Arc::new(store))
        .with_write_mode(config.write_mode)
        .with_failure_policy(config.failure_policy);

    if config.failure_policy == FailurePolicy::DeadLetter {
        if let Some(queue_url) = &config.dead_letter_queue_url {
            let sqs_client = aws_sdk_sqs::Client::new(&sdk_config);
            let queue = DeadLetterQueueService::new(sqs_client, queue_url.clone());
            recorder = recorder.with_dead_letter_queue(Arc::new(queue));
        }
    }

    recorder
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    info!("Starting post-confirmation Lambda function");

    let config = RuntimeConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    info!(
        "table={} -- region={} -- write_mode={:?} -- on_write_failure={:?}",
        config.table_name,
        config.region.as_deref().unwrap_or("<default>"),
        config.write_mode,
        config.failure_policy
    );

    // Clients live for the whole process and are shared across invocations
    let recorder = build_recorder(&config).await;

    run(service_fn(|event| function_handler(&recorder, event))).await
}
