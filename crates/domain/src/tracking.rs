//! Re-fetch policy for the request tracking page.

use std::time::Duration;

use serde::Serialize;

use crate::requests::RequestStatus;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Whether the client keeps polling a request, and how often.
#[derive(Clone, Copy, Debug, Serialize, Eq, PartialEq)]
pub struct TrackingPoll {
    pub active: bool,
    pub interval_ms: u64,
}

impl TrackingPoll {
    pub fn for_status(status: RequestStatus) -> Self {
        Self {
            active: !status.is_terminal(),
            interval_ms: POLL_INTERVAL.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polls_until_terminal() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::PickedUp,
            RequestStatus::Delivering,
        ] {
            assert_eq!(
                TrackingPoll::for_status(status),
                TrackingPoll {
                    active: true,
                    interval_ms: 5000
                }
            );
        }

        assert!(!TrackingPoll::for_status(RequestStatus::Delivered).active);
        assert!(!TrackingPoll::for_status(RequestStatus::Cancelled).active);
    }
}
