use std::sync::Arc;

use async_trait::async_trait;
use cqrs_es::{
    persist::{PersistenceError, ViewContext, ViewRepository},
    Aggregate, EventEnvelope, View as CqrsView,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Request, RequestStatus, AGGREGATE_TYPE};

/// A status the request reached, with the courier holding it at that time.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Milestone {
    pub status: RequestStatus,
    pub courier_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// Row of the requests view table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct View {
    pub aggregate_type: String,
    pub command_id: String,
    pub id: String,
    pub request: Request,
    /// One entry per event, oldest first. A reassigned request shows one
    /// `accepted` entry per courier.
    #[serde(default)]
    pub timeline: Vec<Milestone>,
}

impl CqrsView<Request> for View {
    fn update(&mut self, event: &EventEnvelope<Request>) {
        self.id.clone_from(&event.aggregate_id);
        self.aggregate_type = AGGREGATE_TYPE.to_string();
        self.command_id = event
            .metadata
            .get("command_id")
            .cloned()
            .unwrap_or_default();
        self.request.apply(event.payload.clone());

        self.timeline.push(Milestone {
            status: self.request.status,
            courier_id: self.request.courier_id.clone(),
            at: self.request.updated_at,
        });
    }
}

pub type ViewRepo = Arc<dyn ViewRepository<View, Request>>;

pub struct Query {
    repo: ViewRepo,
}

impl Query {
    pub fn new(repo: ViewRepo) -> Self {
        Self { repo }
    }

    async fn update(
        &self,
        request_id: &str,
        events: &[EventEnvelope<Request>],
    ) -> Result<(), PersistenceError> {
        let (mut view, view_context) = match self.repo.load_with_context(request_id).await? {
            None => {
                let view_context = ViewContext::new(request_id.to_string(), 0);
                (Default::default(), view_context)
            }
            Some((view, context)) => (view, context),
        };

        for event in events {
            view.update(event);
        }

        self.repo.update_view(view, view_context).await
    }
}

#[async_trait]
impl cqrs_es::Query<Request> for Query {
    async fn dispatch(&self, request_id: &str, events: &[EventEnvelope<Request>]) {
        if let Err(err) = self.update(request_id, events).await {
            tracing::error!(request_id, %err, "Request view update failed");
        }
    }
}
