//! Transition engine deciding when a repository alert fires
//!
//! The engine is a pure function over the record as of cycle start and the
//! freshly probed visibility. It performs no I/O and has no cross-entity
//! coupling, so callers may process entities in any order.

use super::record::{AlertRecord, Visibility};

/// Outcome of evaluating one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the notifier should be invoked for this entity
    pub should_alert: bool,
    /// Record to store after this cycle
    pub record: AlertRecord,
}

/// Decide whether an entity alerts and compute its next record.
///
/// A missing prior record counts as never alerted. The flag only ever moves
/// from `false` to `true`, and only on a `Public` observation.
pub fn decide(prior: Option<&AlertRecord>, visibility: Visibility) -> Decision {
    let prior = prior.copied().unwrap_or_default();

    if visibility.is_public() && !prior.alert_sent {
        Decision {
            should_alert: true,
            record: AlertRecord::sent(),
        }
    } else {
        Decision {
            should_alert: false,
            record: prior,
        }
    }
}
