//! Client-held settings: senior mode and the first-visit consent.
//!
//! Values live wherever the client keeps them (cookies for the HTTP API,
//! a plain map in tests). All reads and writes go through [`SettingsStore`]
//! so keys and encodings are defined once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingKey {
    SeniorMode,
    Consent,
}

impl SettingKey {
    pub const ALL: [SettingKey; 2] = [SettingKey::SeniorMode, SettingKey::Consent];

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::SeniorMode => "medifast_senior_mode",
            SettingKey::Consent => "medifast_consent_v1",
        }
    }
}

const SENIOR_ON: &str = "1";
const SENIOR_OFF: &str = "0";
const CONSENT_ACCEPTED: &str = "accepted";

/// Raw key/value storage behind the settings.
pub trait SettingsBackend {
    fn read(&self, key: &str) -> Option<String>;

    fn write(&mut self, key: &str, value: String);
}

impl SettingsBackend for HashMap<String, String> {
    fn read(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}

/// Consent dialog steps, shown in order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStep {
    /// Confirms the visitor is 18 or older
    Age,
    /// Health data processing consent
    Gdpr,
}

/// What the consent dialog should show next.
#[derive(Clone, Copy, Debug, Serialize, Eq, PartialEq)]
pub struct ConsentPrompt {
    pub accepted: bool,
    /// Step to show, `None` once accepted
    pub step: Option<ConsentStep>,
    pub declined: bool,
}

impl ConsentPrompt {
    fn accepted() -> Self {
        Self {
            accepted: true,
            step: None,
            declined: false,
        }
    }

    fn at(step: ConsentStep, declined: bool) -> Self {
        Self {
            accepted: false,
            step: Some(step),
            declined,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Eq, PartialEq)]
pub struct ClientSettings {
    pub senior_mode: bool,
    pub consent: ConsentPrompt,
}

pub struct SettingsStore<B> {
    backend: B,
}

impl<B: SettingsBackend> SettingsStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn senior_mode(&self) -> bool {
        self.backend.read(SettingKey::SeniorMode.name()).as_deref() == Some(SENIOR_ON)
    }

    pub fn set_senior_mode(&mut self, enabled: bool) {
        let value = if enabled { SENIOR_ON } else { SENIOR_OFF };
        self.backend
            .write(SettingKey::SeniorMode.name(), value.to_string());
    }

    /// Flips senior mode and returns the new value.
    pub fn toggle_senior_mode(&mut self) -> bool {
        let enabled = !self.senior_mode();
        self.set_senior_mode(enabled);
        enabled
    }

    pub fn consent_accepted(&self) -> bool {
        self.backend.read(SettingKey::Consent.name()).as_deref() == Some(CONSENT_ACCEPTED)
    }

    /// Records the visitor's answer to one consent step. Only accepting the
    /// last step is persisted; declining keeps the dialog on the same step.
    pub fn answer_consent(&mut self, step: ConsentStep, accept: bool) -> ConsentPrompt {
        if self.consent_accepted() {
            return ConsentPrompt::accepted();
        }

        match (step, accept) {
            (step, false) => ConsentPrompt::at(step, true),
            (ConsentStep::Age, true) => ConsentPrompt::at(ConsentStep::Gdpr, false),
            (ConsentStep::Gdpr, true) => {
                self.backend
                    .write(SettingKey::Consent.name(), CONSENT_ACCEPTED.to_string());
                ConsentPrompt::accepted()
            }
        }
    }

    pub fn snapshot(&self) -> ClientSettings {
        let consent = if self.consent_accepted() {
            ConsentPrompt::accepted()
        } else {
            ConsentPrompt::at(ConsentStep::Age, false)
        };

        ClientSettings {
            senior_mode: self.senior_mode(),
            consent,
        }
    }

    pub fn into_inner(self) -> B {
        self.backend
    }
}
