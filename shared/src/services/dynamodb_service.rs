use async_trait::async_trait;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use std::collections::HashMap;

use crate::{RegistrationError, RegistrationResult, UserRecord, WriteMode};

/// Persistent store for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Write one record. Under `WriteMode::CreateIfAbsent` an existing row
    /// yields `RegistrationError::AlreadyRegistered`.
    async fn put_user(&self, record: &UserRecord, mode: WriteMode) -> RegistrationResult<()>;

    fn table_name(&self) -> &str;
}

pub struct DynamoDBService {
    client: DynamoClient,
    users_table: String,
}

impl DynamoDBService {
    pub fn new(client: DynamoClient, users_table: String) -> Self {
        Self {
            client,
            users_table,
        }
    }
}

/// DynamoDB item for a user record. `email` is omitted when absent.
pub fn user_item(record: &UserRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("userId".to_string(), AttributeValue::S(record.user_id.clone()));
    item.insert("sortKey".to_string(), AttributeValue::S(record.sort_key.clone()));
    if let Some(email) = &record.email {
        item.insert("email".to_string(), AttributeValue::S(email.clone()));
    }
    item.insert("createdDate".to_string(), AttributeValue::S(record.created_date_string()));
    item.insert("firstLogin".to_string(), AttributeValue::Bool(record.first_login));
    item
}

#[async_trait]
impl UserStore for DynamoDBService {
    async fn put_user(&self, record: &UserRecord, mode: WriteMode) -> RegistrationResult<()> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.users_table)
            .set_item(Some(user_item(record)));

        if mode == WriteMode::CreateIfAbsent {
            request = request.condition_expression("attribute_not_exists(userId)");
        }

        request.send().await.map_err(|e| match e.into_service_error() {
            PutItemError::ConditionalCheckFailedException(_) => {
                RegistrationError::AlreadyRegistered(record.user_id.clone())
            }
            other => aws_sdk_dynamodb::Error::from(other).into(),
        })?;

        Ok(())
    }

    fn table_name(&self) -> &str {
        &self.users_table
    }
}
