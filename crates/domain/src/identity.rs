//! Identity provider contract and its GoTrue (Supabase Auth) adapter.
//!
//! The provider owns credentials and sessions. The application only keeps
//! the stable subject id it hands back and links it to an account row.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Error;

/// Tokens returned by a successful sign-in.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    /// Stable subject id of the signed-in identity
    pub subject: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers credentials and returns the new subject id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, Error>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error>;

    /// Resolves an access token to its subject. `None` when the token is
    /// unknown or expired.
    async fn subject(&self, access_token: &str) -> Result<Option<String>, Error>;

    async fn sign_out(&self, access_token: &str) -> Result<(), Error>;
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
    user: UserPayload,
}

/// Client for the GoTrue REST API.
#[derive(Clone, Debug)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoTrueClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = request
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(unavailable)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status, "Identity provider rejected the request");

        Err(failure(status, &body))
    }
}

fn unavailable(err: impl std::fmt::Display) -> Error {
    tracing::error!(%err, "Identity provider unreachable");
    Error::IdentityUnavailable {
        message: err.to_string(),
    }
}

/// Client errors carry the provider's message for the user; server errors
/// are the provider's fault and stay opaque.
fn failure(status: u16, body: &str) -> Error {
    if status >= 500 {
        return Error::IdentityUnavailable {
            message: format!("HTTP {status}"),
        };
    }

    Error::Identity {
        message: rejection_message(body).unwrap_or_else(|| format!("HTTP {status}")),
    }
}

/// Pulls the human readable message out of a GoTrue error body.
fn rejection_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    ["msg", "error_description", "message", "error"]
        .into_iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .map(str::to_string)
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(unavailable)
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, Error> {
        let request = self
            .http
            .post(self.url("signup"))
            .json(&json!({ "email": email, "password": password }));

        let body: Value = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(unavailable)?;

        // With e-mail confirmation on the body is the user itself, otherwise
        // a session that embeds it.
        let user = body.get("user").cloned().unwrap_or(body);
        let user: UserPayload = decode(user)?;

        tracing::info!(subject = %user.id, "Identity registered");
        Ok(user.id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let request = self
            .http
            .post(self.url("token?grant_type=password"))
            .json(&json!({ "email": email, "password": password }));

        let body: Value = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(unavailable)?;
        let token: TokenPayload = decode(body)?;

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            subject: token.user.id,
        })
    }

    async fn subject(&self, access_token: &str) -> Result<Option<String>, Error> {
        let response = self
            .http
            .get(self.url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => {
                let user: UserPayload = response.json().await.map_err(unavailable)?;
                Ok(Some(user.id))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Ok(None),
            status => {
                let status = status.as_u16();
                let body = response.text().await.unwrap_or_default();
                Err(failure(status, &body))
            }
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        let request = self.http.post(self.url("logout")).bearer_auth(access_token);

        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_messages_are_surfaced() {
        assert_eq!(
            rejection_message(r#"{"code":400,"msg":"User already registered"}"#).as_deref(),
            Some("User already registered")
        );
        assert_eq!(
            rejection_message(
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            )
            .as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(rejection_message("<html>"), None);
    }

    #[test]
    fn provider_outages_are_not_user_errors() {
        assert_eq!(
            failure(503, "<html>Service Unavailable</html>"),
            Error::IdentityUnavailable {
                message: "HTTP 503".to_string()
            }
        );
        assert_eq!(
            failure(422, r#"{"msg":"Password should be at least 6 characters"}"#),
            Error::Identity {
                message: "Password should be at least 6 characters".to_string()
            }
        );
        assert_eq!(
            failure(429, ""),
            Error::Identity {
                message: "HTTP 429".to_string()
            }
        );
    }

    #[test]
    fn base_url_is_normalized() {
        let client = GoTrueClient::new("https://abc.supabase.co/", "anon");
        assert_eq!(client.url("signup"), "https://abc.supabase.co/auth/v1/signup");
    }
}
