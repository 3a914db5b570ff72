use std::collections::HashMap;

use axum::http::{header, HeaderMap, HeaderValue};
use domain::settings::{SettingKey, SettingsBackend};

const MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

/// Settings kept in browser cookies. Writes are collected and sent back
/// as `Set-Cookie` headers.
#[derive(Debug, Default)]
pub struct CookieSettings {
    values: HashMap<String, String>,
    changed: Vec<String>,
}

impl CookieSettings {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let values = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| SettingKey::ALL.iter().any(|key| key.name() == *name))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Self {
            values,
            changed: Vec::new(),
        }
    }

    pub fn set_cookie_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for name in &self.changed {
            let Some(value) = self.values.get(name) else {
                continue;
            };
            let cookie = format!("{name}={value}; Path=/; Max-Age={MAX_AGE_SECS}; SameSite=Lax");
            if let Ok(cookie) = HeaderValue::from_str(&cookie) {
                headers.append(header::SET_COOKIE, cookie);
            }
        }

        headers
    }
}

impl SettingsBackend for CookieSettings {
    fn read(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
        if !self.changed.iter().any(|name| name == key) {
            self.changed.push(key.to_string());
        }
    }
}
