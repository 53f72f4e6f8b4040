use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client as SqsClient;

use crate::{FailedRegistration, RegistrationError, RegistrationResult};

/// Destination for registrations whose store write failed.
#[async_trait]
pub trait DeadLetterQueue: Send + Sync {
    /// Returns the queue's message ID.
    async fn send_failed(&self, failed: &FailedRegistration) -> RegistrationResult<String>;
}

/// SQS-backed dead-letter queue
pub struct DeadLetterQueueService {
    client: SqsClient,
    queue_url: String,
}

impl DeadLetterQueueService {
    pub fn new(client: SqsClient, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

fn string_attribute(value: &str) -> RegistrationResult<MessageAttributeValue> {
    MessageAttributeValue::builder()
        .data_type("String")
        .string_value(value)
        .build()
        .map_err(|e| RegistrationError::SQSError(e.to_string()))
}

#[async_trait]
impl DeadLetterQueue for DeadLetterQueueService {
    async fn send_failed(&self, failed: &FailedRegistration) -> RegistrationResult<String> {
        let message_body = serde_json::to_string(failed)?;

        let result = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message_body)
            .message_attributes("FailureKind", string_attribute("UserRecordWrite")?)
            .message_attributes("TableName", string_attribute(&failed.table_name)?)
            .send()
            .await
            .map_err(aws_sdk_sqs::Error::from)?;

        let message_id = result
            .message_id()
            .ok_or_else(|| RegistrationError::SQSError("No message ID returned".to_string()))?;

        tracing::info!(
            "Dead-lettered registration - Message ID: {}, User: {}",
            message_id,
            failed.record.user_id
        );

        Ok(message_id.to_string())
    }
}
