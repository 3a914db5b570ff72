use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use super::{Request, RequestStatus, View};
use crate::errors::Error;

/// Column holding the JSON encoded view in the view table.
const PAYLOAD_ATTRIBUTE: &str = "Payload";

/// Listing queries over the requests view table.
#[async_trait]
pub trait RequestIndex: Send + Sync {
    async fn by_status(&self, status: RequestStatus) -> Result<Vec<Request>, Error>;

    async fn by_patient(&self, patient_id: &str) -> Result<Vec<Request>, Error>;

    async fn by_courier(&self, courier_id: &str) -> Result<Vec<Request>, Error>;
}

/// Scans the view table. Payloads are opaque to DynamoDB, so filtering
/// happens after decoding.
pub struct DynamoRequestIndex {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoRequestIndex {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    async fn scan(&self, keep: impl Fn(&Request) -> bool + Send) -> Result<Vec<Request>, Error> {
        let mut requests = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(Error::persistence)?;

            for item in output.items() {
                let Some(AttributeValue::B(payload)) = item.get(PAYLOAD_ATTRIBUTE) else {
                    continue;
                };
                let view: View =
                    serde_json::from_slice(payload.as_ref()).map_err(Error::persistence)?;
                if keep(&view.request) {
                    requests.push(view.request);
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::debug!(table = %self.table_name, count = requests.len(), "Scanned request views");
        Ok(requests)
    }
}

#[async_trait]
impl RequestIndex for DynamoRequestIndex {
    async fn by_status(&self, status: RequestStatus) -> Result<Vec<Request>, Error> {
        self.scan(|request| request.status == status).await
    }

    async fn by_patient(&self, patient_id: &str) -> Result<Vec<Request>, Error> {
        self.scan(|request| request.patient_id == patient_id).await
    }

    async fn by_courier(&self, courier_id: &str) -> Result<Vec<Request>, Error> {
        self.scan(|request| request.courier_id.as_deref() == Some(courier_id))
            .await
    }
}
