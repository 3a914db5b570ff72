use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

use crate::{auth::Capability, errors::Error, i18n::MessageKey};

use super::{Command, Event};

/// Shortest delivery address accepted on a new request.
pub const MIN_ADDRESS_LEN: usize = 5;

/// Delivery request lifecycle status
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for a courier
    #[default]
    Pending,
    /// Courier assigned
    Accepted,
    /// Medicines collected at the pharmacy
    PickedUp,
    /// On the way to the patient
    Delivering,
    /// Handed over
    Delivered,
    /// Stored value only, no command produces it
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::PickedUp => "picked_up",
            RequestStatus::Delivering => "delivering",
            RequestStatus::Delivered => "delivered",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Delivered | RequestStatus::Cancelled)
    }

    pub fn label(self) -> MessageKey {
        match self {
            RequestStatus::Pending => MessageKey::StatusPending,
            RequestStatus::Accepted => MessageKey::StatusAccepted,
            RequestStatus::PickedUp => MessageKey::StatusPickedUp,
            RequestStatus::Delivering => MessageKey::StatusDelivering,
            RequestStatus::Delivered => MessageKey::StatusDelivered,
            RequestStatus::Cancelled => MessageKey::StatusCancelled,
        }
    }

    /// The step a courier is offered next for a request in this status.
    pub fn next_step(self) -> Option<DeliveryStep> {
        match self {
            RequestStatus::Accepted => Some(DeliveryStep::PickedUp),
            RequestStatus::PickedUp => Some(DeliveryStep::Delivering),
            RequestStatus::Delivering => Some(DeliveryStep::Delivered),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses a courier may set with an advance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStep {
    PickedUp,
    Delivering,
    Delivered,
}

impl From<DeliveryStep> for RequestStatus {
    fn from(step: DeliveryStep) -> Self {
        match step {
            DeliveryStep::PickedUp => RequestStatus::PickedUp,
            DeliveryStep::Delivering => RequestStatus::Delivering,
            DeliveryStep::Delivered => RequestStatus::Delivered,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Paid to the courier on delivery
    #[default]
    Cash,
}

/// How an accept treats a request that already left `pending`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AcceptPolicy {
    /// Every accept reassigns the courier, the last one wins
    #[default]
    LastWriteWins,
    /// Only a pending request can be claimed
    ClaimIfPending,
}

impl AcceptPolicy {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "last_write_wins" => Some(AcceptPolicy::LastWriteWins),
            "claim_if_pending" => Some(AcceptPolicy::ClaimIfPending),
            _ => None,
        }
    }
}

/// Delivery request aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Request {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RequestStatus,

    pub patient_id: String,
    pub courier_id: Option<String>,

    pub medicines: String,
    pub address: String,
    pub prescription_photo_url: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

pub const AGGREGATE_TYPE: &str = "Request";

#[derive(Clone, Debug, Default)]
pub struct Services {
    pub accept_policy: AcceptPolicy,
}

impl Services {
    pub fn new(accept_policy: AcceptPolicy) -> Self {
        Self { accept_policy }
    }
}

#[async_trait]
impl Aggregate for Request {
    type Command = Command;
    type Event = Event;
    type Error = Error;
    type Services = Services;

    fn aggregate_type() -> String {
        AGGREGATE_TYPE.to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            Command::CreateRequest {
                id,
                actor,
                medicines,
                address,
                prescription_photo_url,
                notes,
            } => {
                actor.require(Capability::CreateRequest)?;
                self.validate_new()?;

                let medicines = medicines.trim();
                if medicines.is_empty() {
                    return Err(Error::validation("medicines", MessageKey::MedicinesRequired));
                }

                let address = address.trim();
                if address.chars().count() < MIN_ADDRESS_LEN {
                    return Err(Error::validation("address", MessageKey::AddressRequired));
                }

                Ok(vec![Event::RequestCreated {
                    id,
                    patient_id: actor.account_id,
                    medicines: medicines.to_string(),
                    address: address.to_string(),
                    prescription_photo_url: non_blank(prescription_photo_url),
                    payment_method: PaymentMethod::Cash,
                    notes: non_blank(notes),
                    created_at: Utc::now(),
                }])
            }

            Command::AcceptRequest { actor } => {
                actor.require(Capability::AcceptRequest)?;
                self.validate_existing()?;

                if services.accept_policy == AcceptPolicy::ClaimIfPending
                    && self.status != RequestStatus::Pending
                {
                    return Err(Error::InvalidStateTransition {
                        from: self.status.to_string(),
                        to: RequestStatus::Accepted.to_string(),
                    });
                }

                Ok(vec![Event::RequestAccepted {
                    id: self.id.clone(),
                    courier_id: actor.account_id,
                    updated_at: Utc::now(),
                }])
            }

            // No ordering or ownership check: any courier may set any step.
            Command::AdvanceStatus { actor, step } => {
                actor.require(Capability::AdvanceRequest)?;
                self.validate_existing()?;

                Ok(vec![Event::StatusAdvanced {
                    id: self.id.clone(),
                    status: step,
                    updated_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::RequestCreated {
                id,
                patient_id,
                medicines,
                address,
                prescription_photo_url,
                payment_method,
                notes,
                created_at,
            } => {
                self.id = id;
                self.patient_id = patient_id;
                self.medicines = medicines;
                self.address = address;
                self.prescription_photo_url = prescription_photo_url;
                self.payment_method = payment_method;
                self.notes = notes;
                self.status = RequestStatus::Pending;
                self.created_at = created_at;
                self.updated_at = created_at;
            }

            Event::RequestAccepted {
                courier_id,
                updated_at,
                ..
            } => {
                self.courier_id = Some(courier_id);
                self.status = RequestStatus::Accepted;
                self.updated_at = updated_at;
            }

            Event::StatusAdvanced {
                status, updated_at, ..
            } => {
                self.status = status.into();
                self.updated_at = updated_at;
            }
        }
    }
}

impl Request {
    fn validate_new(&self) -> Result<(), Error> {
        if !self.id.is_empty() {
            return Err(Error::Uniqueness {
                field: "id".to_string(),
            });
        }
        Ok(())
    }

    fn validate_existing(&self) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::NotFound {
                entity: AGGREGATE_TYPE.to_string(),
            });
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
