use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    DeadLetterQueue, FailedRegistration, FailurePolicy, PostConfirmationEvent, RegistrationError,
    RegistrationOutcome, RegistrationResult, UserRecord, UserStore, WriteMode,
};

/// Records a user row for every confirmed Cognito sign-up.
pub struct RegistrationRecorder {
    store: Arc<dyn UserStore>,
    dead_letter_queue: Option<Arc<dyn DeadLetterQueue>>,
    write_mode: WriteMode,
    failure_policy: FailurePolicy,
}

impl RegistrationRecorder {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            dead_letter_queue: None,
            write_mode: WriteMode::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_dead_letter_queue(mut self, queue: Arc<dyn DeadLetterQueue>) -> Self {
        self.dead_letter_queue = Some(queue);
        self
    }

    pub async fn handle(
        &self,
        event: &PostConfirmationEvent,
    ) -> RegistrationResult<RegistrationOutcome> {
        self.handle_at(event, Utc::now()).await
    }

    /// Same as `handle`, with an explicit creation time.
    pub async fn handle_at(
        &self,
        event: &PostConfirmationEvent,
        now: DateTime<Utc>,
    ) -> RegistrationResult<RegistrationOutcome> {
        let record = match UserRecord::from_event(event, now) {
            Some(record) => record,
            None => {
                warn!("No sub in user attributes, nothing written to {}", self.store.table_name());
                return Ok(RegistrationOutcome::Skipped);
            }
        };

        info!("Recording user {} in {}", record.user_id, self.store.table_name());

        match self.store.put_user(&record, self.write_mode).await {
            Ok(()) => {
                info!("Successfully recorded user {}", record.user_id);
                Ok(RegistrationOutcome::Recorded(record))
            }
            Err(RegistrationError::AlreadyRegistered(user_id)) => {
                info!("User {} already recorded, keeping existing row", user_id);
                Ok(RegistrationOutcome::AlreadyRegistered(user_id))
            }
            Err(e) => self.on_write_failure(record, e, now).await,
        }
    }

    async fn on_write_failure(
        &self,
        record: UserRecord,
        err: RegistrationError,
        now: DateTime<Utc>,
    ) -> RegistrationResult<RegistrationOutcome> {
        error!("Failed to record user {}: {}", record.user_id, err);

        match self.failure_policy {
            FailurePolicy::Ignore => {
                warn!("Write failure ignored, user {} was not recorded", record.user_id);
                Ok(RegistrationOutcome::WriteFailed {
                    error: err.to_string(),
                    dead_lettered: false,
                })
            }
            FailurePolicy::Propagate => Err(err),
            FailurePolicy::DeadLetter => {
                let queue = self.dead_letter_queue.as_ref().ok_or_else(|| {
                    RegistrationError::ConfigurationError(
                        "Dead-letter policy configured without a queue".to_string(),
                    )
                })?;

                let failed = FailedRegistration {
                    record,
                    table_name: self.store.table_name().to_string(),
                    error: err.to_string(),
                    failed_at: now,
                };

                let dead_lettered = match queue.send_failed(&failed).await {
                    Ok(_) => true,
                    Err(e) => {
                        // Still acknowledged; the record is lost
                        error!("Failed to dead-letter user {}: {}", failed.record.user_id, e);
                        false
                    }
                };

                Ok(RegistrationOutcome::WriteFailed {
                    error: failed.error,
                    dead_lettered,
                })
            }
        }
    }
}
