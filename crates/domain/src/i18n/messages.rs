use std::{collections::HashMap, fmt, sync::OnceLock};

use serde::Serialize;
use serde_json::Value;

use super::Locale;

/// Key into the message bundles, rendered as a dotted path.
#[derive(Clone, Copy, Debug, Serialize, Eq, PartialEq, Hash)]
pub enum MessageKey {
    SignInRequired,
    AccountNotFound,
    PatientsOnly,
    CouriersOnly,
    NotFound,
    Conflict,
    Generic,
    InvalidTransition,
    AlreadyRegistered,
    MedicinesRequired,
    AddressRequired,
    InvalidEmail,
    PasswordTooShort,
    PasswordRequired,
    NameRequired,
    PhoneRequired,
    PatientAddressRequired,
    CourierDetailsRequired,
    IdDocumentRequired,
    NoFileSelected,
    InvalidRole,
    StatusPending,
    StatusAccepted,
    StatusPickedUp,
    StatusDelivering,
    StatusDelivered,
    StatusCancelled,
    RequestCreated,
    RequestAccepted,
    StatusUpdated,
    CourierOnline,
    CourierOffline,
    ProfileSaved,
    Registered,
}

impl MessageKey {
    pub const ALL: [MessageKey; 34] = [
        MessageKey::SignInRequired,
        MessageKey::AccountNotFound,
        MessageKey::PatientsOnly,
        MessageKey::CouriersOnly,
        MessageKey::NotFound,
        MessageKey::Conflict,
        MessageKey::Generic,
        MessageKey::InvalidTransition,
        MessageKey::AlreadyRegistered,
        MessageKey::MedicinesRequired,
        MessageKey::AddressRequired,
        MessageKey::InvalidEmail,
        MessageKey::PasswordTooShort,
        MessageKey::PasswordRequired,
        MessageKey::NameRequired,
        MessageKey::PhoneRequired,
        MessageKey::PatientAddressRequired,
        MessageKey::CourierDetailsRequired,
        MessageKey::IdDocumentRequired,
        MessageKey::NoFileSelected,
        MessageKey::InvalidRole,
        MessageKey::StatusPending,
        MessageKey::StatusAccepted,
        MessageKey::StatusPickedUp,
        MessageKey::StatusDelivering,
        MessageKey::StatusDelivered,
        MessageKey::StatusCancelled,
        MessageKey::RequestCreated,
        MessageKey::RequestAccepted,
        MessageKey::StatusUpdated,
        MessageKey::CourierOnline,
        MessageKey::CourierOffline,
        MessageKey::ProfileSaved,
        MessageKey::Registered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::SignInRequired => "errors.signInRequired",
            MessageKey::AccountNotFound => "errors.accountNotFound",
            MessageKey::PatientsOnly => "errors.patientsOnly",
            MessageKey::CouriersOnly => "errors.couriersOnly",
            MessageKey::NotFound => "errors.notFound",
            MessageKey::Conflict => "errors.conflict",
            MessageKey::Generic => "errors.generic",
            MessageKey::InvalidTransition => "errors.invalidTransition",
            MessageKey::AlreadyRegistered => "errors.alreadyRegistered",
            MessageKey::MedicinesRequired => "errors.medicinesRequired",
            MessageKey::AddressRequired => "errors.addressRequired",
            MessageKey::InvalidEmail => "errors.invalidEmail",
            MessageKey::PasswordTooShort => "errors.passwordTooShort",
            MessageKey::PasswordRequired => "errors.passwordRequired",
            MessageKey::NameRequired => "errors.nameRequired",
            MessageKey::PhoneRequired => "errors.phoneRequired",
            MessageKey::PatientAddressRequired => "errors.patientAddressRequired",
            MessageKey::CourierDetailsRequired => "errors.courierDetailsRequired",
            MessageKey::IdDocumentRequired => "errors.idDocumentRequired",
            MessageKey::NoFileSelected => "errors.noFileSelected",
            MessageKey::InvalidRole => "errors.invalidRole",
            MessageKey::StatusPending => "status.pending",
            MessageKey::StatusAccepted => "status.accepted",
            MessageKey::StatusPickedUp => "status.picked_up",
            MessageKey::StatusDelivering => "status.delivering",
            MessageKey::StatusDelivered => "status.delivered",
            MessageKey::StatusCancelled => "status.cancelled",
            MessageKey::RequestCreated => "notices.requestCreated",
            MessageKey::RequestAccepted => "notices.requestAccepted",
            MessageKey::StatusUpdated => "notices.statusUpdated",
            MessageKey::CourierOnline => "notices.online",
            MessageKey::CourierOffline => "notices.offline",
            MessageKey::ProfileSaved => "notices.profileSaved",
            MessageKey::Registered => "notices.registered",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SOURCES: [(Locale, &str); 10] = [
    (Locale::Ar, include_str!("../../messages/ar.json")),
    (Locale::De, include_str!("../../messages/de.json")),
    (Locale::En, include_str!("../../messages/en.json")),
    (Locale::Es, include_str!("../../messages/es.json")),
    (Locale::Fa, include_str!("../../messages/fa.json")),
    (Locale::Fr, include_str!("../../messages/fr.json")),
    (Locale::It, include_str!("../../messages/it.json")),
    (Locale::Ru, include_str!("../../messages/ru.json")),
    (Locale::Tr, include_str!("../../messages/tr.json")),
    (Locale::Uk, include_str!("../../messages/uk.json")),
];

fn bundles() -> &'static HashMap<Locale, Value> {
    static BUNDLES: OnceLock<HashMap<Locale, Value>> = OnceLock::new();

    BUNDLES.get_or_init(|| {
        SOURCES
            .iter()
            .map(|(locale, source)| {
                let bundle = serde_json::from_str(source).unwrap_or_else(|err| {
                    tracing::error!(%locale, %err, "Unreadable message bundle");
                    Value::Null
                });
                (*locale, bundle)
            })
            .collect()
    })
}

fn lookup<'a>(bundle: &'a Value, key: MessageKey) -> Option<&'a str> {
    key.as_str()
        .split('.')
        .try_fold(bundle, |node, segment| node.get(segment))
        .and_then(Value::as_str)
}

/// Static message lookup over the bundled JSON files.
pub struct Messages;

impl Messages {
    /// Full bundle served to clients of `locale`.
    pub fn bundle(locale: Locale) -> &'static Value {
        static EMPTY: Value = Value::Null;

        bundles()
            .get(&locale.bundle_locale())
            .unwrap_or(&EMPTY)
    }

    /// Localized text for `key`, falling back to English, then to the key.
    pub fn get(locale: Locale, key: MessageKey) -> String {
        lookup(Self::bundle(locale), key)
            .or_else(|| lookup(Self::bundle(Locale::En), key))
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bundle_parses() {
        for (locale, _) in SOURCES {
            assert!(Messages::bundle(locale).is_object(), "{locale} bundle");
        }
    }

    #[test]
    fn english_covers_every_key() {
        for key in MessageKey::ALL {
            assert!(
                lookup(Messages::bundle(Locale::En), key).is_some(),
                "missing {key} in en"
            );
        }
    }

    #[test]
    fn every_bundle_covers_every_key() {
        for (locale, _) in SOURCES {
            for key in MessageKey::ALL {
                assert!(
                    lookup(Messages::bundle(locale), key).is_some(),
                    "missing {key} in {locale}"
                );
            }
        }
    }

    #[test]
    fn locales_without_a_file_read_english() {
        assert_eq!(
            Messages::get(Locale::Pt, MessageKey::NotFound),
            Messages::get(Locale::En, MessageKey::NotFound)
        );
    }

    #[test]
    fn messages_are_localized() {
        assert_ne!(
            Messages::get(Locale::De, MessageKey::SignInRequired),
            Messages::get(Locale::En, MessageKey::SignInRequired)
        );
    }
}
