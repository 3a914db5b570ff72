use std::sync::Arc;

use super::{Account, AccountRepository, ProfileInput, SignInInput, SignUpInput, ENTITY};
use crate::{
    auth::{Capability, Role},
    errors::Error,
    identity::{IdentityProvider, Session},
    storage::{Bucket, Upload, Uploader},
};

/// Sign-up, sessions and profile maintenance.
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    identity: Arc<dyn IdentityProvider>,
    uploader: Uploader,
}

fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        identity: Arc<dyn IdentityProvider>,
        uploader: Uploader,
    ) -> Self {
        Self {
            accounts,
            identity,
            uploader,
        }
    }

    /// Registers the identity and creates the account row. A courier's ID
    /// document goes to the private bucket; if that upload fails the
    /// account is still created without it.
    pub async fn sign_up(
        &self,
        input: SignUpInput,
        id_document: Option<Upload>,
    ) -> Result<Account, Error> {
        let id_document = id_document.filter(|upload| !upload.is_empty());
        let role = input.validate(id_document.is_some())?;

        let subject = self
            .identity
            .sign_up(input.email.trim(), &input.password)
            .await?;

        if self.accounts.find_by_auth_id(&subject).await?.is_some() {
            return Err(Error::Uniqueness {
                field: "email".to_string(),
            });
        }

        let mut id_document_url = None;
        if let (Role::Delivery, Some(upload)) = (role, &id_document) {
            match self.uploader.upload(Bucket::IdDocuments, &subject, upload).await {
                Ok(url) => id_document_url = Some(url),
                Err(err) => {
                    tracing::warn!(%subject, %err, "ID document upload failed, continuing without it")
                }
            }
        }

        let address = input.address();
        let mut account = Account::new(subject, role, input.name.trim(), input.phone.trim());
        account.email = Some(input.email.trim().to_string());
        account.address = address;
        account.plz = filled(input.plz);
        account.street = filled(input.street);
        account.house_number = filled(input.house_number);
        account.date_of_birth = filled(input.date_of_birth);
        account.vehicle_type = filled(input.vehicle_type);
        account.id_document_url = id_document_url;

        self.accounts.insert(&account).await?;
        tracing::info!(account_id = %account.id, role = %account.role, "Account registered");

        Ok(account)
    }

    pub async fn sign_in(&self, input: SignInInput) -> Result<Session, Error> {
        input.validate()?;

        let session = self
            .identity
            .sign_in(input.email.trim(), &input.password)
            .await?;
        tracing::info!(subject = %session.subject, "Signed in");

        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        self.identity.sign_out(access_token).await
    }

    /// Account behind a bearer token.
    pub async fn current(&self, access_token: Option<&str>) -> Result<Account, Error> {
        let access_token = access_token.ok_or(Error::Unauthenticated)?;
        let subject = self
            .identity
            .subject(access_token)
            .await?
            .ok_or(Error::Unauthenticated)?;

        self.accounts
            .find_by_auth_id(&subject)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: ENTITY.to_string(),
            })
    }

    pub async fn update_profile(
        &self,
        account: &Account,
        input: ProfileInput,
    ) -> Result<Account, Error> {
        account.actor().require(Capability::EditProfile)?;
        input.validate()?;

        let mut updated = account.clone();
        updated.merge_profile(input);
        self.accounts.save_profile(&updated).await?;
        tracing::info!(account_id = %updated.id, "Profile updated");

        self.accounts
            .find_by_id(&account.id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: ENTITY.to_string(),
            })
    }

    pub async fn set_online(&self, account: &Account, online: bool) -> Result<Account, Error> {
        account.actor().require(Capability::ToggleAvailability)?;

        self.accounts.set_online(&account.id, online).await?;

        self.accounts
            .find_by_id(&account.id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: ENTITY.to_string(),
            })
    }

    /// Stores a file under the caller's identity subject.
    pub async fn upload(
        &self,
        account: &Account,
        bucket: Bucket,
        upload: &Upload,
    ) -> Result<String, Error> {
        self.uploader.upload(bucket, &account.auth_id, upload).await
    }
}
