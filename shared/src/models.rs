use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::RegistrationError;

/// Cognito `PostConfirmation` trigger payload.
///
/// Kept as raw JSON so the event goes back to Cognito exactly as it arrived.
/// Attribute values that are not strings are ignored, never rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostConfirmationEvent {
    fields: Map<String, Value>,
}

impl PostConfirmationEvent {
    fn string_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn user_name(&self) -> Option<&str> {
        self.string_field("userName")
    }

    pub fn trigger_source(&self) -> Option<&str> {
        self.string_field("triggerSource")
    }

    /// `request.userAttributes`, when present as an object.
    pub fn user_attributes(&self) -> Option<&Map<String, Value>> {
        self.fields
            .get("request")
            .and_then(|request| request.get("userAttributes"))
            .and_then(Value::as_object)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.user_attributes()
            .and_then(|attributes| attributes.get(name))
            .and_then(Value::as_str)
    }

    /// Stable Cognito identifier. Empty values count as missing.
    pub fn sub(&self) -> Option<&str> {
        self.attribute("sub").filter(|sub| !sub.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.attribute("email")
    }
}

/// The row written for every confirmed registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub sort_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_date: DateTime<Utc>,
    pub first_login: bool,
}

impl UserRecord {
    pub const SORT_KEY: &'static str = "user";

    pub fn new(user_id: String, email: Option<String>, created_date: DateTime<Utc>) -> Self {
        Self {
            user_id,
            sort_key: Self::SORT_KEY.to_string(),
            email,
            created_date,
            first_login: true,
        }
    }

    /// Build the record for an event, or `None` when the event carries no `sub`.
    pub fn from_event(event: &PostConfirmationEvent, now: DateTime<Utc>) -> Option<Self> {
        let user_id = event.sub()?;
        Some(Self::new(
            user_id.to_string(),
            event.email().map(str::to_string),
            now,
        ))
    }

    /// `createdDate` as stored: ISO-8601, millisecond precision, `Z` suffix.
    pub fn created_date_string(&self) -> String {
        self.created_date.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Unconditional put; redelivery overwrites the existing row.
    #[default]
    Upsert,
    /// Put guarded by `attribute_not_exists(userId)`.
    CreateIfAbsent,
}

impl FromStr for WriteMode {
    type Err = RegistrationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(WriteMode::Upsert),
            "create-if-absent" | "create_if_absent" => Ok(WriteMode::CreateIfAbsent),
            other => Err(RegistrationError::ConfigurationError(format!(
                "Unknown WRITE_MODE '{}' (expected upsert or create-if-absent)",
                other
            ))),
        }
    }
}

/// What to do when the store write fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and report success to Cognito. The record is lost.
    #[default]
    Ignore,
    /// Fail the invocation so Cognito surfaces the error.
    Propagate,
    /// Send the record to an SQS queue, then report success.
    DeadLetter,
}

impl FromStr for FailurePolicy {
    type Err = RegistrationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(FailurePolicy::Ignore),
            "propagate" => Ok(FailurePolicy::Propagate),
            "dead-letter" | "dead_letter" => Ok(FailurePolicy::DeadLetter),
            other => Err(RegistrationError::ConfigurationError(format!(
                "Unknown ON_WRITE_FAILURE '{}' (expected ignore, propagate or dead-letter)",
                other
            ))),
        }
    }
}

/// Dead-letter message body for a record that could not be written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRegistration {
    pub record: UserRecord,
    pub table_name: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    Recorded(UserRecord),
    /// No `sub` on the event; nothing written.
    Skipped,
    /// Conditional write found an existing row.
    AlreadyRegistered(String),
    WriteFailed { error: String, dead_lettered: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_event() -> Value {
        json!({
            "version": "1",
            "region": "us-east-1",
            "userPoolId": "us-east-1_9xasdfasdf3A",
            "userName": "budilov@domain.com",
            "callerContext": {
                "awsSdkVersion": "aws-sdk-unknown-unknown",
                "clientId": "1asdfasdfasdfasdf3hjjgp"
            },
            "triggerSource": "PostConfirmation_ConfirmSignUp",
            "request": {
                "userAttributes": {
                    "sub": "4asdfasfa-944f-4444-9444-e644444444b",
                    "cognito:user_status": "CONFIRMED",
                    "email_verified": "true",
                    "email": "budilov@domain.com"
                }
            },
            "response": {}
        })
    }

    #[test]
    fn test_parse_cognito_event() {
        let event: PostConfirmationEvent = serde_json::from_value(sample_event()).unwrap();

        assert_eq!(event.sub(), Some("4asdfasfa-944f-4444-9444-e644444444b"));
        assert_eq!(event.email(), Some("budilov@domain.com"));
        assert_eq!(event.trigger_source(), Some("PostConfirmation_ConfirmSignUp"));
        assert_eq!(event.user_name(), Some("budilov@domain.com"));
    }

    #[test]
    fn test_event_passes_through_unchanged() {
        let original = sample_event();
        let event: PostConfirmationEvent = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&event).unwrap(), original);
    }

    #[test]
    fn test_non_string_attributes_are_tolerated() {
        let event: PostConfirmationEvent = serde_json::from_value(json!({
            "request": { "userAttributes": { "sub": "abc", "email_verified": true, "email": 42 } }
        }))
        .unwrap();

        assert_eq!(event.sub(), Some("abc"));
        assert_eq!(event.email(), None);
    }

    #[test]
    fn test_null_user_attributes_pass_through() {
        let original = json!({
            "userName": "u",
            "request": { "userAttributes": null },
            "response": {}
        });
        let event: PostConfirmationEvent = serde_json::from_value(original.clone()).unwrap();

        assert_eq!(event.user_attributes(), None);
        assert_eq!(event.sub(), None);
        assert_eq!(serde_json::to_value(&event).unwrap(), original);
    }

    #[test]
    fn test_missing_or_empty_sub() {
        let event: PostConfirmationEvent = serde_json::from_value(json!({
            "request": { "userAttributes": { "sub": "", "email": "a@b.com" } }
        }))
        .unwrap();
        assert_eq!(event.sub(), None);

        let event: PostConfirmationEvent = serde_json::from_value(json!({
            "request": { "userAttributes": { "email": "a@b.com" } }
        }))
        .unwrap();
        assert_eq!(event.sub(), None);

        let event: PostConfirmationEvent = serde_json::from_value(json!({})).unwrap();
        assert_eq!(event.sub(), None);
        assert_eq!(event.email(), None);
    }

    #[test]
    fn test_record_from_event() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let event: PostConfirmationEvent = serde_json::from_value(json!({
            "request": { "userAttributes": { "sub": "abc-123", "email": "a@b.com" } }
        }))
        .unwrap();

        let record = UserRecord::from_event(&event, now).unwrap();
        assert_eq!(record.user_id, "abc-123");
        assert_eq!(record.sort_key, "user");
        assert_eq!(record.email.as_deref(), Some("a@b.com"));
        assert!(record.first_login);
        assert_eq!(record.created_date_string(), "2024-03-01T12:30:00.000Z");
    }

    #[test]
    fn test_record_without_email() {
        let event: PostConfirmationEvent = serde_json::from_value(json!({
            "request": { "userAttributes": { "sub": "abc-123" } }
        }))
        .unwrap();

        let record = UserRecord::from_event(&event, Utc::now()).unwrap();
        assert_eq!(record.email, None);
    }

    #[test]
    fn test_parse_write_mode() {
        assert_eq!("upsert".parse::<WriteMode>().unwrap(), WriteMode::Upsert);
        assert_eq!(" Create-If-Absent ".parse::<WriteMode>().unwrap(), WriteMode::CreateIfAbsent);
        assert!("overwrite".parse::<WriteMode>().is_err());
    }

    #[test]
    fn test_parse_failure_policy() {
        assert_eq!("ignore".parse::<FailurePolicy>().unwrap(), FailurePolicy::Ignore);
        assert_eq!("PROPAGATE".parse::<FailurePolicy>().unwrap(), FailurePolicy::Propagate);
        assert_eq!("dead_letter".parse::<FailurePolicy>().unwrap(), FailurePolicy::DeadLetter);
        assert!(matches!(
            "retry".parse::<FailurePolicy>(),
            Err(RegistrationError::ConfigurationError(_))
        ));
    }
}
