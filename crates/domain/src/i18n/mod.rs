//! Locale negotiation and message bundles

mod locale;
mod messages;

pub use locale::{Direction, Locale};
pub use messages::{MessageKey, Messages};
