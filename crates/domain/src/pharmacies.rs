//! Pharmacy reference data shown on the map.

use std::{collections::HashMap, env, sync::Arc};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::{
    auth::{Actor, Capability},
    errors::Error,
    i18n::Locale,
};

pub const DEFAULT_CITY: &str = "vienna";

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pharmacy {
    pub id: String,
    pub name: String,
    /// Persian display name
    pub name_fa: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub is_24h: bool,
    pub phone: Option<String>,
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_true")]
    pub accepts_rx: bool,
    pub created_at: DateTime<Utc>,
}

impl Pharmacy {
    pub fn new(input: NewPharmacy) -> Self {
        Self {
            id: Ulid::new().to_string(),
            name: input.name,
            name_fa: input.name_fa,
            address: input.address,
            latitude: input.latitude,
            longitude: input.longitude,
            is_24h: input.is_24h,
            phone: input.phone,
            city: input.city,
            accepts_rx: input.accepts_rx,
            created_at: Utc::now(),
        }
    }

    pub fn display_name(&self, locale: Locale) -> &str {
        match (locale, self.name_fa.as_deref()) {
            (Locale::Fa, Some(name_fa)) if !name_fa.is_empty() => name_fa,
            _ => &self.name,
        }
    }
}

/// Seed record, as kept in the bundled data file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPharmacy {
    pub name: String,
    pub name_fa: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, rename = "is24h")]
    pub is_24h: bool,
    pub phone: Option<String>,
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_true")]
    pub accepts_rx: bool,
}

/// Pharmacy as rendered on the map for one locale.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MapPin {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_24h: bool,
    pub phone: Option<String>,
    pub accepts_rx: bool,
}

impl MapPin {
    fn new(pharmacy: &Pharmacy, locale: Locale) -> Self {
        Self {
            id: pharmacy.id.clone(),
            name: pharmacy.display_name(locale).to_string(),
            address: pharmacy.address.clone(),
            latitude: pharmacy.latitude,
            longitude: pharmacy.longitude,
            is_24h: pharmacy.is_24h,
            phone: pharmacy.phone.clone(),
            accepts_rx: pharmacy.accepts_rx,
        }
    }
}

#[async_trait]
pub trait PharmacyRepository: Send + Sync {
    async fn list(&self, city: Option<&str>) -> Result<Vec<Pharmacy>, Error>;

    async fn insert(&self, pharmacy: &Pharmacy) -> Result<(), Error>;
}

pub struct DynamoPharmacyRepository {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoPharmacyRepository {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn from_env(client: aws_sdk_dynamodb::Client) -> Self {
        let table_name =
            env::var("DYNAMODB_PHARMACIES_TABLE").unwrap_or("medifast-pharmacies".to_string());

        Self::new(client, table_name)
    }
}

#[async_trait]
impl PharmacyRepository for DynamoPharmacyRepository {
    async fn list(&self, city: Option<&str>) -> Result<Vec<Pharmacy>, Error> {
        let mut pharmacies = Vec::new();
        let mut start_key = None;

        loop {
            let mut scan = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key);

            if let Some(city) = city {
                scan = scan
                    .filter_expression("city = :city")
                    .expression_attribute_values(":city", AttributeValue::S(city.to_string()));
            }

            let output = scan.send().await.map_err(Error::persistence)?;
            for item in output.items() {
                pharmacies.push(serde_dynamo::from_item(item.clone())?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(pharmacies)
    }

    async fn insert(&self, pharmacy: &Pharmacy) -> Result<(), Error> {
        let item: HashMap<String, AttributeValue> = serde_dynamo::to_item(pharmacy)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(Error::persistence)?;

        Ok(())
    }
}

/// Read side of the pharmacy map.
#[derive(Clone)]
pub struct PharmacyDirectory {
    repo: Arc<dyn PharmacyRepository>,
}

impl PharmacyDirectory {
    pub fn new(repo: Arc<dyn PharmacyRepository>) -> Self {
        Self { repo }
    }

    pub async fn map(
        &self,
        actor: &Actor,
        locale: Locale,
        city: Option<&str>,
    ) -> Result<Vec<MapPin>, Error> {
        actor.require(Capability::BrowsePharmacies)?;

        let mut pharmacies = self.repo.list(city).await?;
        pharmacies.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(pharmacies
            .iter()
            .map(|pharmacy| MapPin::new(pharmacy, locale))
            .collect())
    }
}
