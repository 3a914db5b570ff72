//! In-memory adapters for every outbound port, used by tests and local runs.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use cqrs_es::{
    mem_store::MemStore,
    persist::{PersistenceError, ViewContext, ViewRepository},
};
use ulid::Ulid;

use crate::{
    accounts::{Account, AccountRepository, ENTITY},
    auth::{Capability, Role},
    errors::Error,
    identity::{IdentityProvider, Session},
    pharmacies::{Pharmacy, PharmacyRepository},
    requests::{cqrs, Request, RequestIndex, RequestStatus, RequestWorkflow, Services, View, ViewRepo},
    storage::{Bucket, ObjectStore, Upload},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryAccounts {
    rows: Mutex<HashMap<String, Account>>,
}

#[async_trait]
impl AccountRepository for MemoryAccounts {
    async fn insert(&self, account: &Account) -> Result<(), Error> {
        let mut rows = lock(&self.rows);
        if rows.contains_key(&account.id) {
            return Err(Error::Uniqueness {
                field: "id".to_string(),
            });
        }
        rows.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, Error> {
        Ok(lock(&self.rows).get(id).cloned())
    }

    async fn find_by_auth_id(&self, auth_id: &str) -> Result<Option<Account>, Error> {
        Ok(lock(&self.rows)
            .values()
            .find(|account| account.auth_id == auth_id)
            .cloned())
    }

    async fn save_profile(&self, account: &Account) -> Result<(), Error> {
        match lock(&self.rows).get_mut(&account.id) {
            Some(stored) => {
                stored.take_profile(account);
                Ok(())
            }
            None => Err(Error::NotFound {
                entity: ENTITY.to_string(),
            }),
        }
    }

    async fn set_online(&self, id: &str, online: bool) -> Result<(), Error> {
        let mut rows = lock(&self.rows);
        match rows.get_mut(id) {
            Some(account) if account.role == Role::Delivery => {
                account.is_online = online;
                account.updated_at = chrono::Utc::now();
                Ok(())
            }
            _ => Err(Error::Forbidden {
                capability: Capability::ToggleAvailability,
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryPharmacies {
    rows: Mutex<Vec<Pharmacy>>,
}

#[async_trait]
impl PharmacyRepository for MemoryPharmacies {
    async fn list(&self, city: Option<&str>) -> Result<Vec<Pharmacy>, Error> {
        Ok(lock(&self.rows)
            .iter()
            .filter(|pharmacy| city.map_or(true, |city| pharmacy.city == city))
            .cloned()
            .collect())
    }

    async fn insert(&self, pharmacy: &Pharmacy) -> Result<(), Error> {
        lock(&self.rows).push(pharmacy.clone());
        Ok(())
    }
}

/// Request view table, also answering the listing queries.
#[derive(Default)]
pub struct MemoryRequestViews {
    rows: Mutex<HashMap<String, (View, i64)>>,
}

impl MemoryRequestViews {
    fn filter(&self, keep: impl Fn(&Request) -> bool) -> Vec<Request> {
        lock(&self.rows)
            .values()
            .map(|(view, _)| &view.request)
            .filter(|request| keep(request))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ViewRepository<View, Request> for MemoryRequestViews {
    async fn load(&self, view_id: &str) -> Result<Option<View>, PersistenceError> {
        Ok(lock(&self.rows).get(view_id).map(|(view, _)| view.clone()))
    }

    async fn load_with_context(
        &self,
        view_id: &str,
    ) -> Result<Option<(View, ViewContext)>, PersistenceError> {
        Ok(lock(&self.rows).get(view_id).map(|(view, version)| {
            (
                view.clone(),
                ViewContext::new(view_id.to_string(), *version),
            )
        }))
    }

    async fn update_view(&self, view: View, context: ViewContext) -> Result<(), PersistenceError> {
        let mut rows = lock(&self.rows);
        let current = rows.get(&context.view_instance_id).map_or(0, |(_, v)| *v);
        if current != context.version {
            return Err(PersistenceError::OptimisticLockError);
        }
        rows.insert(context.view_instance_id, (view, context.version + 1));
        Ok(())
    }
}

#[async_trait]
impl RequestIndex for MemoryRequestViews {
    async fn by_status(&self, status: RequestStatus) -> Result<Vec<Request>, Error> {
        Ok(self.filter(|request| request.status == status))
    }

    async fn by_patient(&self, patient_id: &str) -> Result<Vec<Request>, Error> {
        Ok(self.filter(|request| request.patient_id == patient_id))
    }

    async fn by_courier(&self, courier_id: &str) -> Result<Vec<Request>, Error> {
        Ok(self.filter(|request| request.courier_id.as_deref() == Some(courier_id)))
    }
}

struct Credential {
    password: String,
    subject: String,
}

#[derive(Default)]
pub struct MemoryIdentity {
    users: Mutex<HashMap<String, Credential>>,
    sessions: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, Error> {
        let mut users = lock(&self.users);
        if users.contains_key(email) {
            return Err(Error::Identity {
                message: "User already registered".to_string(),
            });
        }

        let subject = Ulid::new().to_string();
        users.insert(
            email.to_string(),
            Credential {
                password: password.to_string(),
                subject: subject.clone(),
            },
        );
        Ok(subject)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let subject = match lock(&self.users).get(email) {
            Some(credential) if credential.password == password => credential.subject.clone(),
            _ => {
                return Err(Error::Identity {
                    message: "Invalid login credentials".to_string(),
                })
            }
        };

        let access_token = Ulid::new().to_string();
        lock(&self.sessions).insert(access_token.clone(), subject.clone());

        Ok(Session {
            access_token,
            refresh_token: Ulid::new().to_string(),
            expires_in: 3600,
            subject,
        })
    }

    async fn subject(&self, access_token: &str) -> Result<Option<String>, Error> {
        Ok(lock(&self.sessions).get(access_token).cloned())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        lock(&self.sessions).remove(access_token);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<Vec<(Bucket, String)>>,
    failing: bool,
}

impl MemoryObjectStore {
    /// A store that rejects every write.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).iter().map(|(_, key)| key.clone()).collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, bucket: Bucket, key: &str, _upload: &Upload) -> Result<String, Error> {
        if self.failing {
            return Err(Error::storage("object store unavailable"));
        }

        lock(&self.objects).push((bucket, key.to_string()));
        let folder = match bucket {
            Bucket::Prescriptions => "prescriptions",
            Bucket::IdDocuments => "id-documents",
        };
        Ok(format!("memory://{folder}/{key}"))
    }
}

/// Request workflow over an in-memory event store and view table.
pub fn request_workflow(accounts: Arc<dyn AccountRepository>, services: Services) -> RequestWorkflow {
    let views = Arc::new(MemoryRequestViews::default());
    let repo: ViewRepo = views.clone();
    let framework = cqrs::framework(MemStore::<Request>::default(), repo.clone(), services);

    RequestWorkflow::new(Arc::new(framework), repo, views, accounts)
}
