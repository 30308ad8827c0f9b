//! Alert decision and delivery
//!
//! Decides, per tracked repository, whether the public alert fires this
//! cycle, and delivers it to the configured notification target.

pub mod engine;
pub mod notifier;
pub mod record;

pub use engine::{decide, Decision};
pub use notifier::{Notifier, NotifierError, Notify};
pub use record::{AlertRecord, EntityId, NotifyTarget, StateSnapshot, Visibility};
