//! Repowatch: one-time alerts when watched GitHub repositories go public
//!
//! Each invocation runs a single cycle: probe every tracked repository,
//! alert for those seen public for the first time, and persist a state
//! snapshot so later invocations never alert for the same repository again.
//!
//! # Features
//!
//! - **Conservative probing**: 404s, rate limits, timeouts and malformed
//!   responses all count as "not public yet"
//! - **At most one alert per repository**: the per-repository flag only ever
//!   moves from unsent to sent
//! - **Deterministic state file**: sorted keys, so unchanged state is
//!   byte-identical and never republished
//! - **Pluggable durable store**: git commit-and-push or a mirror file
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use repowatch::alerts::{Notifier, NotifyTarget};
//! use repowatch::probe::GitHubProber;
//! use repowatch::storage::{FilePublisher, StateStore};
//! use repowatch::Coordinator;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let prober = GitHubProber::new("https://api.github.com", None, Duration::from_secs(10))?;
//! let notifier = Notifier::new(NotifyTarget::Log, "https://github.com", Duration::from_secs(10))?;
//! let coordinator = Coordinator::new(
//!     prober,
//!     notifier,
//!     StateStore::new("state.json"),
//!     FilePublisher::new("state.json.durable"),
//! );
//!
//! let report = coordinator.run_cycle(&["owner/repo".to_string()]).await?;
//! println!("Alerted: {:?}", report.alerted);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod coordinator;
pub mod probe;
pub mod storage;

// Re-export commonly used types
pub use alerts::{decide, AlertRecord, Decision, Visibility};
pub use config::{load_tracked, ConfigError, WatchConfig};
pub use coordinator::{Coordinator, CycleError, CycleReport};
