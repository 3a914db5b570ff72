use std::{env, sync::Arc};

use cqrs_es::{persist::PersistedEventStore, CqrsFramework, EventStore};
use dynamo_es::{DynamoEventRepository, DynamoViewRepository};

use super::{index::DynamoRequestIndex, Query, Request, Services, ViewRepo};

pub type RequestCqrs = CqrsFramework<Request, PersistedEventStore<DynamoEventRepository, Request>>;

/// Builds the framework over any event store, with the view projection attached.
pub fn framework<ES>(store: ES, repo: ViewRepo, services: Services) -> CqrsFramework<Request, ES>
where
    ES: EventStore<Request>,
{
    let query = Box::new(Query::new(repo));

    CqrsFramework::new(store, vec![query], services)
}

pub fn init(
    client: aws_sdk_dynamodb::Client,
    repo: ViewRepo,
    services: Services,
) -> Arc<RequestCqrs> {
    let event_log_table = env::var("DYNAMODB_EVENT_LOG_TABLE")
        .unwrap_or("medifast-event-log".to_string());

    let event_snapshots_table = env::var("DYNAMODB_EVENT_SNAPSHOTS_TABLE")
        .unwrap_or("medifast-event-snapshots".to_string());

    let store: PersistedEventStore<DynamoEventRepository, Request> =
        PersistedEventStore::new_snapshot_store(
            DynamoEventRepository::new(client)
                .with_tables(&event_log_table, &event_snapshots_table),
            5,
        );

    Arc::new(framework(store, repo, services))
}

fn view_table() -> String {
    env::var("DYNAMODB_REQUESTS_VIEW_TABLE").unwrap_or("medifast-requests-view".to_string())
}

pub fn init_repo(client: aws_sdk_dynamodb::Client) -> ViewRepo {
    Arc::new(DynamoViewRepository::new(&view_table(), client))
}

pub fn init_index(client: aws_sdk_dynamodb::Client) -> Arc<DynamoRequestIndex> {
    Arc::new(DynamoRequestIndex::new(client, view_table()))
}
