use serde::{Deserialize, Serialize};

use super::aggregate::DeliveryStep;
use crate::auth::Actor;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Patient places a new delivery request
    CreateRequest {
        id: String,
        actor: Actor,
        medicines: String,
        /// Already resolved against the patient's saved address
        address: String,
        prescription_photo_url: Option<String>,
        notes: Option<String>,
    },

    /// Courier takes the request
    AcceptRequest { actor: Actor },

    /// Courier sets a delivery step
    AdvanceStatus { actor: Actor, step: DeliveryStep },
}
