use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{
    i18n::{Locale, Messages},
    Error,
};
use serde_json::{json, Map};

/// Domain error rendered in the caller's locale.
#[derive(Debug)]
pub struct AppError {
    pub locale: Locale,
    pub error: Error,
}

impl AppError {
    pub fn new(locale: Locale, error: Error) -> Self {
        Self { locale, error }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Uniqueness { .. }
            | Error::Conflict { .. }
            | Error::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            Error::Identity { .. } => StatusCode::BAD_REQUEST,
            Error::IdentityUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Error::Storage { .. } | Error::Persistence { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match &self.error {
            Error::Identity { message } => message.clone(),
            error => Messages::get(self.locale, error.message_key()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.error, "Request failed");
        } else {
            tracing::info!(error = %self.error, status = status.as_u16(), "Request rejected");
        }

        let mut fields = Map::new();
        fields.insert(self.error.field().to_string(), json!([self.message()]));

        let body = json!({ "error": fields });
        (status, Json(body)).into_response()
    }
}

/// Attaches the locale to domain results.
pub trait Localize<T> {
    fn localize(self, locale: Locale) -> Result<T, AppError>;
}

impl<T> Localize<T> for Result<T, Error> {
    fn localize(self, locale: Locale) -> Result<T, AppError> {
        self.map_err(|error| AppError::new(locale, error))
    }
}
