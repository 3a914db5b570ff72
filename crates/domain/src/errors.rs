use cqrs_es::AggregateError;
use thiserror::Error;

use crate::{auth::Capability, i18n::MessageKey};

/// Field name used for errors that belong to the whole form.
pub const FORM_FIELD: &str = "_form";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Entity not found: {entity}")]
    NotFound { entity: String },

    #[error("Uniqueness conflict: {field}")]
    Uniqueness { field: String },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Forbidden action: {capability}")]
    Forbidden { capability: Capability },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Validation error on {field}: {key}")]
    Validation { field: String, key: MessageKey },

    #[error("Concurrent modification of {entity}")]
    Conflict { entity: String },

    #[error("Identity provider rejected the request: {message}")]
    Identity { message: String },

    #[error("Identity provider unavailable: {message}")]
    IdentityUnavailable { message: String },

    #[error("Object store error: {message}")]
    Storage { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl Error {
    pub fn validation(field: &str, key: MessageKey) -> Self {
        Self::Validation {
            field: field.to_string(),
            key,
        }
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }

    /// Form field the error is reported under.
    pub fn field(&self) -> &str {
        match self {
            Error::Validation { field, .. } => field,
            _ => FORM_FIELD,
        }
    }

    /// Bundle key of the localized message shown to the user.
    pub fn message_key(&self) -> MessageKey {
        match self {
            Error::NotFound { entity } if entity == crate::accounts::ENTITY => {
                MessageKey::AccountNotFound
            }
            Error::NotFound { .. } => MessageKey::NotFound,
            Error::Uniqueness { .. } => MessageKey::AlreadyRegistered,
            Error::Unauthenticated => MessageKey::SignInRequired,
            Error::Forbidden { capability } => capability.denied_message(),
            Error::InvalidStateTransition { .. } => MessageKey::InvalidTransition,
            Error::Validation { key, .. } => *key,
            Error::Conflict { .. } => MessageKey::Conflict,
            Error::Identity { .. }
            | Error::IdentityUnavailable { .. }
            | Error::Storage { .. }
            | Error::Persistence { .. } => MessageKey::Generic,
        }
    }
}

impl From<AggregateError<Error>> for Error {
    fn from(err: AggregateError<Error>) -> Self {
        match err {
            AggregateError::UserError(err) => err,
            AggregateError::AggregateConflict => Error::Conflict {
                entity: crate::requests::AGGREGATE_TYPE.to_string(),
            },
            other => Error::persistence(other),
        }
    }
}

impl From<serde_dynamo::Error> for Error {
    fn from(err: serde_dynamo::Error) -> Self {
        Error::persistence(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_report_their_field() {
        let err = Error::validation("medicines", MessageKey::MedicinesRequired);
        assert_eq!(err.field(), "medicines");
        assert_eq!(err.message_key(), MessageKey::MedicinesRequired);
    }

    #[test]
    fn form_errors_use_the_form_field() {
        assert_eq!(Error::Unauthenticated.field(), FORM_FIELD);
        assert_eq!(
            Error::Forbidden {
                capability: Capability::AcceptRequest
            }
            .message_key(),
            MessageKey::CouriersOnly
        );
    }

    #[test]
    fn missing_accounts_have_their_own_message() {
        let err = Error::NotFound {
            entity: crate::accounts::ENTITY.to_string(),
        };
        assert_eq!(err.message_key(), MessageKey::AccountNotFound);
    }
}
