use crate::core::registry::CarrierRegistry;
use crate::domain::model::TrackingInfo;
use crate::domain::ports::Carrier;
use crate::utils::error::{Result, TrackingError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// One tracking number bound to its (lazily resolved) carrier.
pub struct Package {
    tracking_number: String,
    registry: Option<Arc<CarrierRegistry>>,
    carrier: OnceCell<Arc<dyn Carrier>>,
    // Data fetched by a disambiguation probe, handed to the first track().
    probed: Mutex<Option<TrackingInfo>>,
}

impl Package {
    pub fn new(tracking_number: impl Into<String>, registry: Arc<CarrierRegistry>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            registry: Some(registry),
            carrier: OnceCell::new(),
            probed: Mutex::new(None),
        }
    }

    /// A package whose carrier is already known; no registry lookup happens.
    pub fn with_carrier(tracking_number: impl Into<String>, carrier: Arc<dyn Carrier>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            registry: None,
            carrier: OnceCell::new_with(Some(carrier)),
            probed: Mutex::new(None),
        }
    }

    pub fn tracking_number(&self) -> &str {
        &self.tracking_number
    }

    /// Resolves the carrier on first use and memoizes it.
    pub async fn carrier(&self) -> Result<Arc<dyn Carrier>> {
        let carrier = self
            .carrier
            .get_or_try_init(|| async {
                let registry = self
                    .registry
                    .as_ref()
                    .ok_or_else(|| TrackingError::unsupported(&self.tracking_number))?;
                let (carrier, probed) = registry.resolve_probed(&self.tracking_number).await?;
                *self.probed.lock().unwrap_or_else(PoisonError::into_inner) = probed;
                Ok::<_, TrackingError>(carrier)
            })
            .await?;
        Ok(Arc::clone(carrier))
    }

    pub async fn track(&self) -> Result<TrackingInfo> {
        let carrier = self.carrier().await?;
        let probed = self
            .probed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match probed {
            Some(info) => Ok(info),
            None => carrier.track(&self.tracking_number).await,
        }
    }

    pub async fn url(&self) -> Result<String> {
        let carrier = self.carrier().await?;
        Ok(carrier.url(&self.tracking_number))
    }

    pub async fn is_delivered(&self) -> Result<bool> {
        let info = self.track().await?;
        let carrier = self.carrier().await?;
        carrier.is_delivered(&self.tracking_number, Some(&info)).await
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("tracking_number", &self.tracking_number)
            .field("carrier", &self.carrier.get().map(|c| c.short_name()))
            .finish()
    }
}
