//! Visibility probing
//!
//! A prober reduces whatever the status source returns into a
//! [`Visibility`]. Probes never fail: every anomaly is logged and reported as
//! `NotPublic`, so a transient error can never be mistaken for a public repo.

pub mod github;

pub use github::GitHubProber;

use async_trait::async_trait;

use crate::alerts::Visibility;

/// Source of visibility observations for tracked entities
#[async_trait]
pub trait VisibilityProber: Send + Sync {
    async fn probe(&self, entity: &str) -> Visibility;
}

/// Probe every entity concurrently, returning results in input order
pub async fn probe_all<P>(prober: &P, entities: &[String]) -> Vec<Visibility>
where
    P: VisibilityProber + ?Sized,
{
    let futures: Vec<_> = entities
        .iter()
        .map(|entity| prober.probe(entity))
        .collect();

    futures::future::join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct PublicSet(HashSet<&'static str>);

    #[async_trait]
    impl VisibilityProber for PublicSet {
        async fn probe(&self, entity: &str) -> Visibility {
            if self.0.contains(entity) {
                Visibility::Public
            } else {
                Visibility::NotPublic
            }
        }
    }

    #[tokio::test]
    async fn test_probe_all_preserves_order() {
        let prober = PublicSet(["b/y"].into_iter().collect());
        let entities = vec!["a/x".to_string(), "b/y".to_string(), "c/z".to_string()];

        let results = probe_all(&prober, &entities).await;
        assert_eq!(
            results,
            vec![Visibility::NotPublic, Visibility::Public, Visibility::NotPublic]
        );
    }

    #[tokio::test]
    async fn test_probe_all_empty() {
        let prober = PublicSet(HashSet::new());
        assert!(probe_all(&prober, &[]).await.is_empty());
    }
}
