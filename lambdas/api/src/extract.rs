use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{
        multipart::Multipart, rejection::JsonRejection, FromRequest, FromRequestParts, Request,
    },
    http::{header, request::Parts, HeaderMap, Uri},
};
use domain::{
    accounts::Account, errors::FORM_FIELD, i18n::Locale, i18n::MessageKey, storage::Upload, Error,
};

use crate::{
    error::{AppError, Localize},
    state::AppState,
};

/// Locale from the first path segment.
#[derive(Clone, Copy, Debug)]
pub struct Lang(pub Locale);

pub fn locale_of(parts: &Parts) -> Locale {
    locale_of_uri(&parts.uri)
}

fn locale_of_uri(uri: &Uri) -> Locale {
    let segment = uri.path().trim_start_matches('/').split('/').next();
    Locale::negotiate(segment)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Lang {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Lang(locale_of(parts)))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Access token from the `Authorization` header, if any.
pub struct BearerToken(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BearerToken(bearer_token(&parts.headers)))
    }
}

/// The signed-in account. Rejects with 401 without a valid token and 404
/// when the identity has no account row.
pub struct CurrentAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let locale = locale_of(parts);
        let token = bearer_token(&parts.headers);

        let account = state
            .accounts
            .current(token.as_deref())
            .await
            .localize(locale)?;

        Ok(CurrentAccount(account))
    }
}

/// JSON request body. Malformed or mistyped bodies are rejected with the
/// localized form error.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let locale = locale_of_uri(req.uri());

        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::new(locale, rejected_json(rejection))),
        }
    }
}

fn rejected_json(rejection: JsonRejection) -> Error {
    tracing::warn!(
        status = rejection.status().as_u16(),
        reason = %rejection.body_text(),
        "Rejected JSON body"
    );
    Error::validation(FORM_FIELD, MessageKey::Generic)
}

/// Text fields and files of a multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Upload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, Error> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(malformed)?;
                    form.files.insert(
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field.text().await.map_err(malformed)?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Non-empty text value.
    pub fn optional(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for FormData {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let locale = locale_of_uri(req.uri());

        let multipart = Multipart::from_request(req, state).await.map_err(|rejection| {
            tracing::warn!(reason = %rejection.body_text(), "Rejected multipart body");
            AppError::new(locale, Error::validation(FORM_FIELD, MessageKey::Generic))
        })?;

        FormData::read(multipart).await.localize(locale)
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> Error {
    tracing::warn!(%err, "Malformed multipart body");
    Error::validation(FORM_FIELD, MessageKey::Generic)
}
