use crate::core::disambiguation::{disambiguate, ProbeStrategy, Probed};
use crate::domain::model::TrackingInfo;
use crate::domain::ports::Carrier;
use crate::utils::error::{Result, TrackingError};
use std::sync::{Arc, PoisonError, RwLock};

/// Carriers keyed by short name, kept in registration order.
///
/// Registration is expected at startup, but the list sits behind a lock so a
/// replacement during a resolve is seen either entirely or not at all.
pub struct CarrierRegistry {
    carriers: RwLock<Vec<Arc<dyn Carrier>>>,
    strategy: ProbeStrategy,
}

impl Default for CarrierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CarrierRegistry {
    pub fn new() -> Self {
        Self::with_probe_strategy(ProbeStrategy::default())
    }

    pub fn with_probe_strategy(strategy: ProbeStrategy) -> Self {
        Self {
            carriers: RwLock::new(Vec::new()),
            strategy,
        }
    }

    /// Inserts `carrier`, replacing any carrier with the same short name.
    /// A replacement keeps the original slot in probe order.
    pub fn register(&self, carrier: Arc<dyn Carrier>) {
        let mut carriers = self.carriers.write().unwrap_or_else(PoisonError::into_inner);
        match carriers
            .iter()
            .position(|existing| existing.short_name() == carrier.short_name())
        {
            Some(idx) => {
                tracing::debug!(carrier = carrier.short_name(), "Replacing registered carrier");
                carriers[idx] = carrier;
            }
            None => {
                tracing::debug!(carrier = carrier.short_name(), "Registering carrier");
                carriers.push(carrier);
            }
        }
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn Carrier>> {
        self.snapshot()
            .into_iter()
            .find(|carrier| carrier.short_name() == short_name)
    }

    pub fn short_names(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(|c| c.short_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.carriers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn probe_strategy(&self) -> ProbeStrategy {
        self.strategy
    }

    fn snapshot(&self) -> Vec<Arc<dyn Carrier>> {
        self.carriers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Carriers whose format check accepts the number, in registration order.
    pub fn candidates(&self, tracking_number: &str) -> Vec<Arc<dyn Carrier>> {
        self.snapshot()
            .into_iter()
            .filter(|carrier| carrier.identify(tracking_number))
            .collect()
    }

    /// Finds the carrier for `tracking_number`.
    ///
    /// A unique format match wins outright. Several matches go through the
    /// disambiguation probe. Fails only with `UnsupportedTrackingNumber` or
    /// `InvalidTrackingNumber`.
    pub async fn resolve(&self, tracking_number: &str) -> Result<Arc<dyn Carrier>> {
        self.resolve_probed(tracking_number)
            .await
            .map(|(carrier, _)| carrier)
    }

    /// Like [`resolve`](Self::resolve), also returning the tracking data a
    /// disambiguation probe already fetched.
    pub(crate) async fn resolve_probed(
        &self,
        tracking_number: &str,
    ) -> Result<(Arc<dyn Carrier>, Option<TrackingInfo>)> {
        let mut candidates = self.candidates(tracking_number);
        match candidates.len() {
            0 => {
                tracing::debug!(tracking_number, "No carrier recognizes tracking number");
                Err(TrackingError::unsupported(tracking_number))
            }
            1 => {
                let carrier = candidates.remove(0);
                tracing::debug!(tracking_number, carrier = carrier.short_name(), "Identified carrier");
                Ok((carrier, None))
            }
            _ => {
                let Probed { carrier, info } =
                    disambiguate(tracking_number, &candidates, self.strategy).await?;
                Ok((carrier, Some(info)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeCarrier;

    #[tokio::test]
    async fn test_unique_match_resolves_without_probing() {
        let registry = CarrierRegistry::new();
        let ten = FakeCarrier::new("TEN").accepting_len(10);
        registry.register(Arc::new(ten.clone()));
        registry.register(Arc::new(FakeCarrier::new("TWELVE").accepting_len(12)));

        let carrier = registry.resolve("1234567890").await.unwrap();
        assert_eq!(carrier.short_name(), "TEN");
        assert_eq!(ten.track_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_match_is_unsupported() {
        let registry = CarrierRegistry::new();
        registry.register(Arc::new(FakeCarrier::new("TEN").accepting_len(10)));

        let err = registry.resolve("123").await.err().unwrap();
        assert!(matches!(err, TrackingError::UnsupportedTrackingNumber { .. }));
    }

    #[tokio::test]
    async fn test_empty_registry_is_unsupported() {
        let registry = CarrierRegistry::new();
        assert!(registry.is_empty());
        let err = registry.resolve("1234567890").await.err().unwrap();
        assert!(matches!(err, TrackingError::UnsupportedTrackingNumber { .. }));
    }

    #[tokio::test]
    async fn test_multiple_matches_are_disambiguated() {
        let registry = CarrierRegistry::new();
        let first = FakeCarrier::new("FIRST").accepting_len(10).failing();
        registry.register(Arc::new(first.clone()));
        registry.register(Arc::new(FakeCarrier::new("SECOND").accepting_len(10)));

        let carrier = registry.resolve("1234567890").await.unwrap();
        assert_eq!(carrier.short_name(), "SECOND");
        assert_eq!(first.track_calls(), 1);
    }

    #[tokio::test]
    async fn test_reregistration_replaces_in_place() {
        let registry = CarrierRegistry::new();
        registry.register(Arc::new(FakeCarrier::new("A").accepting_len(10)));
        registry.register(Arc::new(FakeCarrier::new("B").accepting_len(12)));
        registry.register(Arc::new(FakeCarrier::new("A").accepting_len(11)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.short_names(), vec!["A", "B"]);
        assert!(registry.resolve("1234567890").await.is_err());
        let carrier = registry.resolve("12345678901").await.unwrap();
        assert_eq!(carrier.short_name(), "A");
    }

    #[tokio::test]
    async fn test_replacement_track_decides_the_probe() {
        let registry = CarrierRegistry::new();
        let stale = FakeCarrier::new("A").accepting_len(10).failing();
        let other = FakeCarrier::new("B").accepting_len(10);
        registry.register(Arc::new(stale.clone()));
        registry.register(Arc::new(other.clone()));

        let fresh = FakeCarrier::new("A").accepting_len(10);
        registry.register(Arc::new(fresh.clone()));

        // A keeps its first slot, so its new track() wins before B is asked.
        let carrier = registry.resolve("1234567890").await.unwrap();
        assert_eq!(carrier.short_name(), "A");
        assert_eq!(stale.track_calls(), 0);
        assert_eq!(fresh.track_calls(), 1);
        assert_eq!(other.track_calls(), 0);
    }

    #[test]
    fn test_get_by_short_name() {
        let registry = CarrierRegistry::new();
        registry.register(Arc::new(FakeCarrier::new("A").accepting_len(10)));
        assert!(registry.get("A").is_some());
        assert!(registry.get("Z").is_none());
    }
}
