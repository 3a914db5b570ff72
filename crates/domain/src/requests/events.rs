use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use super::aggregate::{DeliveryStep, PaymentMethod};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    RequestCreated {
        id: String,
        patient_id: String,
        medicines: String,
        address: String,
        prescription_photo_url: Option<String>,
        payment_method: PaymentMethod,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    },

    RequestAccepted {
        id: String,
        courier_id: String,
        updated_at: DateTime<Utc>,
    },

    StatusAdvanced {
        id: String,
        status: DeliveryStep,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::RequestCreated { .. } => "Request:Created".to_string(),
            Event::RequestAccepted { .. } => "Request:Accepted".to_string(),
            Event::StatusAdvanced { .. } => "Request:StatusAdvanced".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
