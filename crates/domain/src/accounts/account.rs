use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::inputs::ProfileInput;
use crate::auth::{Actor, Capability, Role};

pub const ENTITY: &str = "Account";

/// Columns written by a profile save. Role, identity and availability are
/// owned by other operations.
pub const PROFILE_COLUMNS: &[&str] = &[
    "name",
    "phone",
    "email",
    "address",
    "plz",
    "street",
    "house_number",
    "health_summary",
    "age",
    "allergies",
    "chronic_diseases",
    "current_meds",
    "updated_at",
];

/// Row of the accounts table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    /// Subject issued by the identity provider
    pub auth_id: String,
    pub role: Role,

    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub plz: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    // Patient health summary
    pub health_summary: Option<String>,
    pub age: Option<String>,
    pub allergies: Option<String>,
    pub chronic_diseases: Option<String>,
    pub current_meds: Option<String>,

    // Courier data
    pub date_of_birth: Option<String>,
    pub id_document_url: Option<String>,
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub is_online: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        auth_id: impl Into<String>,
        role: Role,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Ulid::new().to_string(),
            auth_id: auth_id.into(),
            role,
            name: name.into(),
            phone: phone.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id.clone(), self.role)
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.role.capabilities()
    }

    /// Merges a validated profile form. Absent fields keep their value.
    pub fn merge_profile(&mut self, input: ProfileInput) {
        let address = compose_address(
            input.street.as_deref(),
            input.house_number.as_deref(),
            input.plz.as_deref(),
        )
        .or(input.address);

        self.name = input.name.trim().to_string();
        self.phone = input.phone.trim().to_string();

        if let Some(email) = input.email {
            self.email = Some(email.trim().to_string()).filter(|e| !e.is_empty());
        }

        merge(&mut self.address, address);
        merge(&mut self.plz, input.plz);
        merge(&mut self.street, input.street);
        merge(&mut self.house_number, input.house_number);
        merge(&mut self.health_summary, input.health_summary);
        merge(&mut self.age, input.age);
        merge(&mut self.allergies, input.allergies);
        merge(&mut self.chronic_diseases, input.chronic_diseases);
        merge(&mut self.current_meds, input.current_meds);

        self.updated_at = Utc::now();
    }

    /// Copies the [`PROFILE_COLUMNS`] of `other` onto this row.
    pub fn take_profile(&mut self, other: &Account) {
        self.name = other.name.clone();
        self.phone = other.phone.clone();
        self.email = other.email.clone();
        self.address = other.address.clone();
        self.plz = other.plz.clone();
        self.street = other.street.clone();
        self.house_number = other.house_number.clone();
        self.health_summary = other.health_summary.clone();
        self.age = other.age.clone();
        self.allergies = other.allergies.clone();
        self.chronic_diseases = other.chronic_diseases.clone();
        self.current_meds = other.current_meds.clone();
        self.updated_at = other.updated_at;
    }
}

fn merge(field: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = Some(value);
    }
}

/// `"{street} {house_number}, {plz} Wien"` when all three parts are present.
pub fn compose_address<'a>(
    street: Option<&'a str>,
    house_number: Option<&'a str>,
    plz: Option<&'a str>,
) -> Option<String> {
    let part = |value: Option<&'a str>| value.map(str::trim).filter(|v| !v.is_empty());

    match (part(street), part(house_number), part(plz)) {
        (Some(street), Some(house_number), Some(plz)) => {
            Some(format!("{street} {house_number}, {plz} Wien"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ProfileInput {
        ProfileInput {
            name: "Maria Huber".to_string(),
            phone: "+436641234567".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn address_is_composed_from_its_parts() {
        assert_eq!(
            compose_address(Some("Mariahilfer Str."), Some("1"), Some("1060")),
            Some("Mariahilfer Str. 1, 1060 Wien".to_string())
        );
        assert_eq!(compose_address(Some("Ring"), None, Some("1010")), None);
        assert_eq!(compose_address(Some("Ring"), Some(" "), Some("1010")), None);
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut account = Account::new("auth-1", Role::Patient, "Maria", "+436640000000");
        account.allergies = Some("Penicillin".to_string());
        account.address = Some("Ring 1, 1010 Wien".to_string());

        account.merge_profile(ProfileInput {
            current_meds: Some("Metformin".to_string()),
            ..profile()
        });

        assert_eq!(account.name, "Maria Huber");
        assert_eq!(account.allergies.as_deref(), Some("Penicillin"));
        assert_eq!(account.current_meds.as_deref(), Some("Metformin"));
        assert_eq!(account.address.as_deref(), Some("Ring 1, 1010 Wien"));
    }

    #[test]
    fn structured_address_wins_over_free_text() {
        let mut account = Account::new("auth-1", Role::Patient, "Maria", "+436640000000");

        account.merge_profile(ProfileInput {
            address: Some("somewhere".to_string()),
            street: Some("Landstraßer Hauptstr.".to_string()),
            house_number: Some("12".to_string()),
            plz: Some("1030".to_string()),
            ..profile()
        });

        assert_eq!(
            account.address.as_deref(),
            Some("Landstraßer Hauptstr. 12, 1030 Wien")
        );
    }

    #[test]
    fn blank_email_clears_it() {
        let mut account = Account::new("auth-1", Role::Patient, "Maria", "+436640000000");
        account.email = Some("maria@example.at".to_string());

        account.merge_profile(ProfileInput {
            email: Some(String::new()),
            ..profile()
        });

        assert_eq!(account.email, None);
    }
}
