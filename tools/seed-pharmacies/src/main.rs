//! Loads pharmacy records into the pharmacies table.
//!
//! Usage: `seed-pharmacies [FILE]`. Without a file the bundled Tehran
//! list is used.

use std::{env, fs};

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use domain::pharmacies::{
    DynamoPharmacyRepository, NewPharmacy, Pharmacy, PharmacyRepository,
};

const BUNDLED: &str = include_str!("../data/pharmacies.json");

fn parse(source: &str) -> Result<Vec<NewPharmacy>> {
    serde_json::from_str(source).context("Invalid pharmacy data")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let records = match env::args().nth(1) {
        Some(path) => {
            let source =
                fs::read_to_string(&path).with_context(|| format!("Cannot read {path}"))?;
            parse(&source)?
        }
        None => parse(BUNDLED)?,
    };

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let repo = DynamoPharmacyRepository::from_env(aws_sdk_dynamodb::Client::new(&config));

    tracing::info!(count = records.len(), "Seeding pharmacies");
    for record in records {
        let pharmacy = Pharmacy::new(record);
        repo.insert(&pharmacy)
            .await
            .with_context(|| format!("Failed to insert {}", pharmacy.name))?;
        tracing::info!(id = %pharmacy.id, name = %pharmacy.name, city = %pharmacy.city, "Inserted");
    }

    tracing::info!("Seeding done");
    Ok(())
}
