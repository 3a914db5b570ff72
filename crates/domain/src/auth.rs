//! Roles and the capabilities they grant.
//!
//! Every role check in the system goes through [`Role::can`] so the
//! role-to-permission table lives in exactly one place.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{errors::Error, i18n::MessageKey};

/// Account role
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Orders medicines
    #[default]
    Patient,
    /// Courier fulfilling requests
    Delivery,
    /// Operator account, no workflow permissions
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Delivery => "delivery",
            Role::Admin => "admin",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "patient" => Some(Role::Patient),
            "delivery" => Some(Role::Delivery),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Roles that can be chosen on the sign-up form.
    pub fn is_self_registrable(self) -> bool {
        matches!(self, Role::Patient | Role::Delivery)
    }

    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;

        match capability {
            CreateRequest | ViewOwnRequests => self == Role::Patient,
            ViewJobs | AcceptRequest | AdvanceRequest | ToggleAvailability => {
                self == Role::Delivery
            }
            BrowsePharmacies | EditProfile => true,
        }
    }

    pub fn capabilities(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.can(*capability))
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateRequest,
    ViewOwnRequests,
    ViewJobs,
    AcceptRequest,
    AdvanceRequest,
    ToggleAvailability,
    BrowsePharmacies,
    EditProfile,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::CreateRequest,
        Capability::ViewOwnRequests,
        Capability::ViewJobs,
        Capability::AcceptRequest,
        Capability::AdvanceRequest,
        Capability::ToggleAvailability,
        Capability::BrowsePharmacies,
        Capability::EditProfile,
    ];

    /// Message shown when a caller lacks this capability.
    pub fn denied_message(self) -> MessageKey {
        match self {
            Capability::CreateRequest | Capability::ViewOwnRequests => MessageKey::PatientsOnly,
            Capability::ViewJobs
            | Capability::AcceptRequest
            | Capability::AdvanceRequest
            | Capability::ToggleAvailability => MessageKey::CouriersOnly,
            Capability::BrowsePharmacies | Capability::EditProfile => MessageKey::SignInRequired,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::CreateRequest => "create_request",
            Capability::ViewOwnRequests => "view_own_requests",
            Capability::ViewJobs => "view_jobs",
            Capability::AcceptRequest => "accept_request",
            Capability::AdvanceRequest => "advance_request",
            Capability::ToggleAvailability => "toggle_availability",
            Capability::BrowsePharmacies => "browse_pharmacies",
            Capability::EditProfile => "edit_profile",
        };
        f.write_str(name)
    }
}

/// The account behind a command, as seen by the workflow.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Actor {
    pub account_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(account_id: impl Into<String>, role: Role) -> Self {
        Self {
            account_id: account_id.into(),
            role,
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), Error> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(Error::Forbidden { capability })
        }
    }
}
