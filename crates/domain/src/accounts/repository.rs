use std::{collections::HashMap, env};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::Utc;

use super::{Account, ENTITY, PROFILE_COLUMNS};
use crate::{
    auth::{Capability, Role},
    errors::Error,
};

const AUTH_ID_INDEX: &str = "auth_id-index";

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Stores a new account. Fails when the id is already taken.
    async fn insert(&self, account: &Account) -> Result<(), Error>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, Error>;

    async fn find_by_auth_id(&self, auth_id: &str) -> Result<Option<Account>, Error>;

    /// Writes the profile columns of `account`, leaving every other column
    /// as stored.
    async fn save_profile(&self, account: &Account) -> Result<(), Error>;

    /// Sets the courier availability flag, only on delivery accounts.
    async fn set_online(&self, id: &str, online: bool) -> Result<(), Error>;
}

pub struct DynamoAccountRepository {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoAccountRepository {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn from_env(client: aws_sdk_dynamodb::Client) -> Self {
        let table_name =
            env::var("DYNAMODB_ACCOUNTS_TABLE").unwrap_or("medifast-accounts".to_string());

        Self::new(client, table_name)
    }
}

#[async_trait]
impl AccountRepository for DynamoAccountRepository {
    async fn insert(&self, account: &Account) -> Result<(), Error> {
        let item: HashMap<String, AttributeValue> = serde_dynamo::to_item(account)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception())
                {
                    Error::Uniqueness {
                        field: "id".to_string(),
                    }
                } else {
                    Error::persistence(err)
                }
            })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, Error> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(Error::persistence)?;

        match output.item {
            Some(item) => Ok(Some(serde_dynamo::from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn find_by_auth_id(&self, auth_id: &str) -> Result<Option<Account>, Error> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(AUTH_ID_INDEX)
            .key_condition_expression("auth_id = :auth_id")
            .expression_attribute_values(":auth_id", AttributeValue::S(auth_id.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(Error::persistence)?;

        match output.items().first() {
            Some(item) => Ok(Some(serde_dynamo::from_item(item.clone())?)),
            None => Ok(None),
        }
    }

    async fn save_profile(&self, account: &Account) -> Result<(), Error> {
        let mut item: HashMap<String, AttributeValue> = serde_dynamo::to_item(account)?;

        let mut assignments = Vec::with_capacity(PROFILE_COLUMNS.len());
        let mut update = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(account.id.clone()))
            .condition_expression("attribute_exists(id)");

        for (i, column) in PROFILE_COLUMNS.iter().enumerate() {
            let value = item
                .remove(*column)
                .unwrap_or(AttributeValue::Null(true));
            assignments.push(format!("#p{i} = :p{i}"));
            update = update
                .expression_attribute_names(format!("#p{i}"), *column)
                .expression_attribute_values(format!(":p{i}"), value);
        }

        update
            .update_expression(format!("SET {}", assignments.join(", ")))
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception())
                {
                    Error::NotFound {
                        entity: ENTITY.to_string(),
                    }
                } else {
                    Error::persistence(err)
                }
            })?;

        Ok(())
    }

    async fn set_online(&self, id: &str, online: bool) -> Result<(), Error> {
        let now: AttributeValue = serde_dynamo::to_attribute_value(Utc::now())?;

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression("SET is_online = :online, updated_at = :now")
            .condition_expression("#role = :delivery")
            .expression_attribute_names("#role", "role")
            .expression_attribute_values(":online", AttributeValue::Bool(online))
            .expression_attribute_values(":now", now)
            .expression_attribute_values(
                ":delivery",
                AttributeValue::S(Role::Delivery.as_str().to_string()),
            )
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception())
                {
                    Error::Forbidden {
                        capability: Capability::ToggleAvailability,
                    }
                } else {
                    Error::persistence(err)
                }
            })?;

        tracing::info!(account_id = id, online, entity = ENTITY, "Availability updated");
        Ok(())
    }
}
