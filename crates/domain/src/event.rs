use derive_new::new;
use serde::{Deserialize, Serialize};

/// Event log entry as published on the event stream.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, new)]
pub struct DomainEvent {
    pub id: String,
    pub aggregate_type: String,
    pub sequence: usize,
    pub event_type: String,
    pub event_version: String,
    /// JSON encoded event payload
    pub payload: String,
    /// JSON encoded metadata map
    pub metadata: String,
}
