use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use cqrs_es::{CqrsFramework, EventStore};
use serde::Serialize;
use ulid::Ulid;

use super::{
    inputs::CreateRequestInput, Command, DeliveryStep, Milestone, Request, RequestIndex,
    RequestStatus, View, ViewRepo, AGGREGATE_TYPE,
};
use crate::{
    accounts::AccountRepository,
    auth::{Actor, Capability},
    errors::Error,
};

/// Executes request commands, whatever event store sits behind them.
#[async_trait]
pub trait CommandBus: Send + Sync {
    async fn dispatch(
        &self,
        request_id: &str,
        command: Command,
        metadata: HashMap<String, String>,
    ) -> Result<(), Error>;
}

#[async_trait]
impl<ES> CommandBus for CqrsFramework<Request, ES>
where
    ES: EventStore<Request> + Send + Sync,
    ES::AC: Send,
{
    async fn dispatch(
        &self,
        request_id: &str,
        command: Command,
        metadata: HashMap<String, String>,
    ) -> Result<(), Error> {
        self.execute_with_metadata(request_id, command, metadata)
            .await
            .map_err(Error::from)
    }
}

/// Pending request as listed on the jobs board.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PendingJob {
    #[serde(flatten)]
    pub request: Request,
    pub patient_name: String,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct JobsBoard {
    pub pending: Vec<PendingJob>,
    pub mine: Vec<Request>,
}

/// Role-gated entry points of the request lifecycle.
#[derive(Clone)]
pub struct RequestWorkflow {
    commands: Arc<dyn CommandBus>,
    views: ViewRepo,
    index: Arc<dyn RequestIndex>,
    accounts: Arc<dyn AccountRepository>,
}

fn command_metadata() -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("command_id".to_string(), Ulid::new().to_string());
    metadata
}

impl RequestWorkflow {
    pub fn new(
        commands: Arc<dyn CommandBus>,
        views: ViewRepo,
        index: Arc<dyn RequestIndex>,
        accounts: Arc<dyn AccountRepository>,
    ) -> Self {
        Self {
            commands,
            views,
            index,
            accounts,
        }
    }

    pub async fn create(&self, actor: &Actor, input: CreateRequestInput) -> Result<Request, Error> {
        actor.require(Capability::CreateRequest)?;

        let address = match input.address.filter(|a| !a.trim().is_empty()) {
            Some(address) => address,
            None => self
                .accounts
                .find_by_id(&actor.account_id)
                .await?
                .and_then(|account| account.address)
                .unwrap_or_default(),
        };

        let id = Ulid::new().to_string();
        let command = Command::CreateRequest {
            id: id.clone(),
            actor: actor.clone(),
            medicines: input.medicines,
            address,
            prescription_photo_url: input.prescription_photo_url,
            notes: input.notes,
        };

        self.commands.dispatch(&id, command, command_metadata()).await?;
        tracing::info!(request_id = %id, patient_id = %actor.account_id, "Request created");

        self.load(&id).await
    }

    pub async fn accept(&self, actor: &Actor, request_id: &str) -> Result<Request, Error> {
        let command = Command::AcceptRequest {
            actor: actor.clone(),
        };

        self.commands
            .dispatch(request_id, command, command_metadata())
            .await?;
        tracing::info!(request_id, courier_id = %actor.account_id, "Request accepted");

        self.load(request_id).await
    }

    pub async fn advance(
        &self,
        actor: &Actor,
        request_id: &str,
        step: DeliveryStep,
    ) -> Result<Request, Error> {
        let command = Command::AdvanceStatus {
            actor: actor.clone(),
            step,
        };

        self.commands
            .dispatch(request_id, command, command_metadata())
            .await?;
        tracing::info!(request_id, status = %RequestStatus::from(step), "Request advanced");

        self.load(request_id).await
    }

    /// Request detail for its owning patient. Other callers get not found.
    pub async fn detail(&self, actor: &Actor, request_id: &str) -> Result<Request, Error> {
        Ok(self.view(actor, request_id).await?.request)
    }

    /// Status changes of the patient's request, oldest first.
    pub async fn timeline(
        &self,
        actor: &Actor,
        request_id: &str,
    ) -> Result<Vec<Milestone>, Error> {
        Ok(self.view(actor, request_id).await?.timeline)
    }

    /// Read model of the patient's request, with its timeline.
    pub async fn view(&self, actor: &Actor, request_id: &str) -> Result<View, Error> {
        actor.require(Capability::ViewOwnRequests)?;

        let view = self.load_view(request_id).await?;
        if view.request.patient_id != actor.account_id {
            return Err(not_found());
        }
        Ok(view)
    }

    /// The patient's requests, newest first.
    pub async fn history(&self, actor: &Actor) -> Result<Vec<Request>, Error> {
        actor.require(Capability::ViewOwnRequests)?;

        let mut requests = self.index.by_patient(&actor.account_id).await?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    pub async fn jobs(&self, actor: &Actor) -> Result<JobsBoard, Error> {
        actor.require(Capability::ViewJobs)?;

        let mut pending = Vec::new();
        for request in self.index.by_status(RequestStatus::Pending).await? {
            // Requests whose patient row is gone are not listed.
            if let Some(patient) = self.accounts.find_by_id(&request.patient_id).await? {
                pending.push(PendingJob {
                    request,
                    patient_name: patient.name,
                });
            }
        }
        pending.sort_by(|a, b| a.request.created_at.cmp(&b.request.created_at));

        let mut mine = self.index.by_courier(&actor.account_id).await?;
        mine.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(JobsBoard { pending, mine })
    }

    async fn load(&self, request_id: &str) -> Result<Request, Error> {
        Ok(self.load_view(request_id).await?.request)
    }

    async fn load_view(&self, request_id: &str) -> Result<View, Error> {
        self.views
            .load(request_id)
            .await
            .map_err(Error::persistence)?
            .ok_or_else(not_found)
    }
}

fn not_found() -> Error {
    Error::NotFound {
        entity: AGGREGATE_TYPE.to_string(),
    }
}
