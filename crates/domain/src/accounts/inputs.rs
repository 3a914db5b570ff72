use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::account::compose_address;
use crate::{auth::Role, errors::Error, i18n::MessageKey};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 2;
const MIN_PHONE_LEN: usize = 10;
const MIN_PLZ_LEN: usize = 4;
const MIN_STREET_LEN: usize = 2;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex is valid"));

fn has_min_len(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

fn filled(value: &Option<String>, min: usize) -> bool {
    value.as_deref().is_some_and(|v| has_min_len(v, min))
}

pub(crate) fn check_email(email: &str) -> Result<(), Error> {
    if EMAIL.is_match(email.trim()) {
        Ok(())
    } else {
        Err(Error::validation("email", MessageKey::InvalidEmail))
    }
}

fn check_contact(name: &str, phone: &str) -> Result<(), Error> {
    if !has_min_len(name, MIN_NAME_LEN) {
        return Err(Error::validation("name", MessageKey::NameRequired));
    }
    if !has_min_len(phone, MIN_PHONE_LEN) {
        return Err(Error::validation("phone", MessageKey::PhoneRequired));
    }
    Ok(())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub role: String,
    pub plz: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub vehicle_type: Option<String>,
}

impl SignUpInput {
    /// Checks the form and returns the chosen role. Couriers must attach an
    /// ID document, signalled by `has_id_document`.
    pub fn validate(&self, has_id_document: bool) -> Result<Role, Error> {
        check_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation("password", MessageKey::PasswordTooShort));
        }
        check_contact(&self.name, &self.phone)?;

        let role = Role::from_code(self.role.trim())
            .filter(|role| role.is_self_registrable())
            .ok_or_else(|| Error::validation("role", MessageKey::InvalidRole))?;

        match role {
            Role::Patient => {
                let complete = filled(&self.plz, MIN_PLZ_LEN)
                    && filled(&self.street, MIN_STREET_LEN)
                    && filled(&self.house_number, 1);
                if !complete {
                    return Err(Error::validation("plz", MessageKey::PatientAddressRequired));
                }
            }
            Role::Delivery => {
                if !has_id_document {
                    return Err(Error::validation(
                        "idDocument",
                        MessageKey::IdDocumentRequired,
                    ));
                }
                if !filled(&self.date_of_birth, 1) || !filled(&self.vehicle_type, 1) {
                    return Err(Error::validation(
                        "dateOfBirth",
                        MessageKey::CourierDetailsRequired,
                    ));
                }
            }
            Role::Admin => return Err(Error::validation("role", MessageKey::InvalidRole)),
        }

        Ok(role)
    }

    pub fn address(&self) -> Option<String> {
        compose_address(
            self.street.as_deref(),
            self.house_number.as_deref(),
            self.plz.as_deref(),
        )
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

impl SignInInput {
    pub fn validate(&self) -> Result<(), Error> {
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(Error::validation("password", MessageKey::PasswordRequired));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub plz: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub health_summary: Option<String>,
    pub age: Option<String>,
    pub allergies: Option<String>,
    pub chronic_diseases: Option<String>,
    pub current_meds: Option<String>,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), Error> {
        check_contact(&self.name, &self.phone)?;
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => check_email(email),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient_form() -> SignUpInput {
        SignUpInput {
            email: "maria@example.at".to_string(),
            password: "secret1".to_string(),
            name: "Maria Huber".to_string(),
            phone: "+436641234567".to_string(),
            role: "patient".to_string(),
            plz: Some("1060".to_string()),
            street: Some("Mariahilfer Str.".to_string()),
            house_number: Some("1".to_string()),
            ..Default::default()
        }
    }

    fn courier_form() -> SignUpInput {
        SignUpInput {
            role: "delivery".to_string(),
            plz: None,
            street: None,
            house_number: None,
            date_of_birth: Some("1995-04-02".to_string()),
            vehicle_type: Some("bike".to_string()),
            ..patient_form()
        }
    }

    #[test]
    fn complete_patient_form_passes() {
        assert_eq!(patient_form().validate(false), Ok(Role::Patient));
        assert_eq!(
            patient_form().address().as_deref(),
            Some("Mariahilfer Str. 1, 1060 Wien")
        );
    }

    #[test]
    fn patients_need_a_full_address() {
        let form = SignUpInput {
            plz: Some("106".to_string()),
            ..patient_form()
        };
        let err = form.validate(false).unwrap_err();
        assert_eq!(err.field(), "plz");
        assert_eq!(err.message_key(), MessageKey::PatientAddressRequired);
    }

    #[test]
    fn couriers_need_an_id_document() {
        assert_eq!(courier_form().validate(true), Ok(Role::Delivery));
        assert_eq!(courier_form().validate(false).unwrap_err().field(), "idDocument");
    }

    #[test]
    fn couriers_need_a_vehicle() {
        let form = SignUpInput {
            vehicle_type: Some(" ".to_string()),
            ..courier_form()
        };
        assert_eq!(
            form.validate(true).unwrap_err().message_key(),
            MessageKey::CourierDetailsRequired
        );
    }

    #[test]
    fn admin_cannot_be_chosen() {
        let form = SignUpInput {
            role: "admin".to_string(),
            ..patient_form()
        };
        assert_eq!(form.validate(false).unwrap_err().field(), "role");
    }

    #[test]
    fn short_password_is_rejected() {
        let form = SignUpInput {
            password: "12345".to_string(),
            ..patient_form()
        };
        assert_eq!(form.validate(false).unwrap_err().field(), "password");
    }

    #[test]
    fn bad_email_is_rejected() {
        let form = SignInInput {
            email: "not-an-email".to_string(),
            password: "x".to_string(),
        };
        assert_eq!(form.validate().unwrap_err().field(), "email");
    }

    #[test]
    fn profile_email_may_be_empty() {
        let form = ProfileInput {
            name: "Ali".to_string(),
            phone: "09121234567".to_string(),
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn profile_needs_a_real_phone() {
        let form = ProfileInput {
            name: "Ali".to_string(),
            phone: "0912".to_string(),
            ..Default::default()
        };
        assert_eq!(form.validate().unwrap_err().field(), "phone");
    }
}
