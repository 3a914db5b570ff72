/// Request aggregate
pub mod aggregate;

/// Commands
pub mod commands;

/// Events
pub mod events;

/// Input DTOs
pub mod inputs;

/// View (read model)
pub mod view;

/// Listing queries over the view table
pub mod index;

/// CQRS setup
pub mod cqrs;

/// Role-gated entry points
pub mod workflow;

pub use aggregate::{
    AcceptPolicy, DeliveryStep, PaymentMethod, Request, RequestStatus, Services, AGGREGATE_TYPE,
};
pub use commands::Command;
pub use events::Event;
pub use index::RequestIndex;
pub use view::{Milestone, Query, View, ViewRepo};
pub use workflow::{CommandBus, JobsBoard, PendingJob, RequestWorkflow};
