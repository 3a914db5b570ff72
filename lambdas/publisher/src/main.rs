//! Forwards request events from the event log stream to Kinesis.

use std::env;

use aws_config::BehaviorVersion;
use aws_lambda_events::{
    dynamodb::{Event, EventRecord},
    streams::{DynamoDbBatchItemFailure, DynamoDbEventResponse},
};
use aws_sdk_kinesis::primitives::Blob;
use domain::{requests::AGGREGATE_TYPE, DomainEvent};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

/// Event log row as written by the DynamoDB event store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EventLogRow {
    aggregate_type_and_id: String,
    aggregate_id_sequence: usize,
    aggregate_type: String,
    aggregate_id: String,
    event_type: String,
    event_version: String,
    #[serde(with = "serde_bytes")]
    payload: Vec<u8>,
    #[serde(with = "serde_bytes")]
    metadata: Vec<u8>,
}

impl TryFrom<EventLogRow> for DomainEvent {
    type Error = String;

    fn try_from(row: EventLogRow) -> Result<Self, Self::Error> {
        let payload =
            String::from_utf8(row.payload).map_err(|e| format!("payload is not UTF-8: {e}"))?;
        let metadata =
            String::from_utf8(row.metadata).map_err(|e| format!("metadata is not UTF-8: {e}"))?;

        Ok(DomainEvent::new(
            row.aggregate_id,
            row.aggregate_type,
            row.aggregate_id_sequence,
            row.event_type,
            row.event_version,
            payload,
            metadata,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let kinesis = aws_sdk_kinesis::Client::new(&config);
    let stream_name =
        env::var("EVENT_STREAM_NAME").unwrap_or("medifast-request-events".to_string());

    lambda_runtime::run(service_fn(|event: LambdaEvent<Event>| async {
        handle(event, &kinesis, &stream_name).await
    }))
    .await
}

async fn handle(
    event: LambdaEvent<Event>,
    kinesis: &aws_sdk_kinesis::Client,
    stream_name: &str,
) -> Result<DynamoDbEventResponse, Error> {
    tracing::info!(records = event.payload.records.len(), "Processing event log batch");

    let mut batch_item_failures = Vec::new();

    // Snapshots and view rows live in other tables; only appends matter here.
    for record in event.payload.records.iter().filter(|r| r.event_name == "INSERT") {
        if let Err(err) = publish(record, kinesis, stream_name).await {
            tracing::error!(event_id = %record.event_id, %err, "Failed to publish event");
            batch_item_failures.push(DynamoDbBatchItemFailure {
                item_identifier: Some(record.event_id.clone()),
            });
        }
    }

    Ok(DynamoDbEventResponse {
        batch_item_failures,
    })
}

/// Decodes a stream record into the feed event, skipping other aggregates.
fn decode(record: &EventRecord) -> Result<Option<DomainEvent>, Error> {
    let row: EventLogRow = serde_dynamo::from_item(record.change.new_image.clone())?;

    if row.aggregate_type != AGGREGATE_TYPE {
        tracing::debug!(aggregate_type = %row.aggregate_type, "Skipping foreign aggregate");
        return Ok(None);
    }

    Ok(Some(row.try_into()?))
}

async fn publish(
    record: &EventRecord,
    kinesis: &aws_sdk_kinesis::Client,
    stream_name: &str,
) -> Result<(), Error> {
    let Some(event) = decode(record)? else {
        return Ok(());
    };

    let data = serde_json::to_string(&event)?;

    // Partitioning by request keeps each request's events in order.
    kinesis
        .put_record()
        .stream_name(stream_name)
        .partition_key(&event.id)
        .data(Blob::new(data))
        .send()
        .await?;

    tracing::info!(
        request_id = %event.id,
        sequence = event.sequence,
        event_type = %event.event_type,
        "Event published"
    );
    Ok(())
}
