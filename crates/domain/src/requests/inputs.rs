use serde::{Deserialize, Serialize};

use super::aggregate::DeliveryStep;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRequestInput {
    pub medicines: String,
    /// Falls back to the patient's saved address when blank
    pub address: Option<String>,
    pub prescription_photo_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvanceStatusInput {
    pub status: DeliveryStep,
}
