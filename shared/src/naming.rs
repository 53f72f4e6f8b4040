use crate::{FailurePolicy, RegistrationError, RegistrationResult, WriteMode};

/// Runtime configuration, read once from Lambda environment variables at init.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub table_name: String,
    pub region: Option<String>,
    pub write_mode: WriteMode,
    pub failure_policy: FailurePolicy,
    pub dead_letter_queue_url: Option<String>,
}

impl RuntimeConfig {
    /// Create runtime config from environment variables
    pub fn from_env() -> RegistrationResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> RegistrationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let table_name = match var("TABLE_NAME") {
            Some(table_name) => table_name,
            None => match (var("APP_NAME"), var("ENVIRONMENT")) {
                (Some(app_name), Some(environment)) => {
                    resource_name(&app_name, &environment, "users")
                }
                _ => {
                    return Err(RegistrationError::ConfigurationError(
                        "TABLE_NAME not set (and APP_NAME/ENVIRONMENT unavailable)".to_string(),
                    ))
                }
            },
        };

        let write_mode = var("WRITE_MODE")
            .map(|value| value.parse::<WriteMode>())
            .transpose()?
            .unwrap_or_default();

        let failure_policy = var("ON_WRITE_FAILURE")
            .map(|value| value.parse::<FailurePolicy>())
            .transpose()?
            .unwrap_or_default();

        let dead_letter_queue_url = var("DEAD_LETTER_QUEUE_URL");
        if failure_policy == FailurePolicy::DeadLetter && dead_letter_queue_url.is_none() {
            return Err(RegistrationError::ConfigurationError(
                "ON_WRITE_FAILURE=dead-letter requires DEAD_LETTER_QUEUE_URL".to_string(),
            ));
        }

        Ok(Self {
            table_name,
            region: var("REGION"),
            write_mode,
            failure_policy,
            dead_letter_queue_url,
        })
    }
}

/// Resource name following the {APP_NAME}-{ENVIRONMENT}-{RESOURCE_NAME} pattern
pub fn resource_name(app_name: &str, environment: &str, resource_name: &str) -> String {
    format!("{}-{}-{}", app_name, environment, resource_name)
}
