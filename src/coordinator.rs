//! One polling cycle over all tracked repositories

use crate::alerts::{decide, EntityId, Notify};
use crate::probe::{probe_all, VisibilityProber};
use crate::storage::{publish_if_changed, reconcile, DurableStatePublisher, StateStore};
use crate::storage::{PublishError, StateError};

/// Summary of a completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Entities tracked this cycle
    pub tracked: usize,
    /// Records created for entities seen for the first time
    pub newly_tracked: usize,
    /// Entities whose alert fired this cycle, in config order
    pub alerted: Vec<EntityId>,
    /// Alerts whose delivery failed; their records still flipped
    pub notify_failures: usize,
    /// Whether the snapshot was published
    pub published: bool,
}

/// Runs cycles against a prober, notifier, state store and publisher
pub struct Coordinator<P, N, D> {
    prober: P,
    notifier: N,
    store: StateStore,
    publisher: D,
    publish_attempts: u32,
}

impl<P, N, D> Coordinator<P, N, D>
where
    P: VisibilityProber,
    N: Notify,
    D: DurableStatePublisher,
{
    pub fn new(prober: P, notifier: N, store: StateStore, publisher: D) -> Self {
        Self {
            prober,
            notifier,
            store,
            publisher,
            publish_attempts: 1,
        }
    }

    /// Set the total number of publish attempts
    pub fn with_publish_attempts(mut self, attempts: u32) -> Self {
        self.publish_attempts = attempts.max(1);
        self
    }

    /// Run one cycle.
    ///
    /// Probe and notification failures are isolated per entity. Corrupt state,
    /// a failed save, or a failed publish abort the cycle.
    pub async fn run_cycle(&self, entities: &[EntityId]) -> Result<CycleReport, CycleError> {
        let mut state = self.store.load().await?;
        let newly_tracked = reconcile(&mut state, entities);

        let observations = probe_all(&self.prober, entities).await;

        let mut report = CycleReport {
            tracked: entities.len(),
            newly_tracked,
            ..Default::default()
        };

        // Decisions are applied one entity at a time
        for (entity, visibility) in entities.iter().zip(observations) {
            let decision = decide(state.get(entity), visibility);
            state.insert(entity.clone(), decision.record);

            if decision.should_alert {
                tracing::info!(entity = %entity, "Repository is now public");
                report.alerted.push(entity.clone());
            }
        }

        // Flipped records hit disk before any alert goes out. A crash or failed
        // save here can lose an alert but never send one twice.
        let bytes = self.store.save(&state).await?;

        for entity in &report.alerted {
            if let Err(e) = self.notifier.notify(entity).await {
                report.notify_failures += 1;
                tracing::error!(
                    entity = %entity,
                    error = %e,
                    "Failed to send notification; alert will not be retried"
                );
            }
        }

        report.published = publish_if_changed(&self.publisher, &bytes, self.publish_attempts)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to publish state; next cycle may re-alert");
                CycleError::Publish(e)
            })?;

        Ok(report)
    }
}

/// Cycle-level failures
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Publish error: {0}")]
    Publish(PublishError),
}
