use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("DynamoDB error: {0}")]
    DynamoDBError(String),

    #[error("User already registered: {0}")]
    AlreadyRegistered(String),

    #[error("SQS error: {0}")]
    SQSError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<aws_sdk_dynamodb::Error> for RegistrationError {
    fn from(err: aws_sdk_dynamodb::Error) -> Self {
        RegistrationError::DynamoDBError(err.to_string())
    }
}

impl From<aws_sdk_sqs::Error> for RegistrationError {
    fn from(err: aws_sdk_sqs::Error) -> Self {
        RegistrationError::SQSError(err.to_string())
    }
}

impl From<serde_json::Error> for RegistrationError {
    fn from(err: serde_json::Error) -> Self {
        RegistrationError::SerializationError(err.to_string())
    }
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RegistrationError::DynamoDBError("throttled".to_string());
        assert_eq!(err.to_string(), "DynamoDB error: throttled");

        let err = RegistrationError::ConfigurationError("TABLE_NAME not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: TABLE_NAME not set");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RegistrationError = parse_err.into();
        assert!(matches!(err, RegistrationError::SerializationError(_)));
    }
}
