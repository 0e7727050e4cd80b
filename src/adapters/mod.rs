// Adapters layer: concrete carriers and the HTTP transport they talk through.

pub mod canada_post;
pub mod dhl;
pub mod fedex;
pub mod http;
pub mod prestige;
pub mod ups;
pub mod usps;
pub mod wire;

use crate::core::registry::CarrierRegistry;
use crate::domain::model::TrackingInfo;
use crate::domain::ports::{Carrier, ConfigProvider, Transport};
use crate::utils::error::{Result, TrackingError};
use std::sync::Arc;

pub use canada_post::CanadaPostCarrier;
pub use dhl::DhlCarrier;
pub use fedex::FedexCarrier;
pub use http::HttpTransport;
pub use prestige::PrestigeCarrier;
pub use ups::UpsCarrier;
pub use usps::UspsCarrier;

/// Guard at the top of every `track()`: rejects numbers the carrier does
/// not identify before any I/O happens.
pub fn require_identified(carrier: &dyn Carrier, tracking_number: &str) -> Result<()> {
    if carrier.identify(tracking_number) {
        Ok(())
    } else {
        Err(TrackingError::invalid(tracking_number))
    }
}

/// Last step of every `track()`: refuses empty records and applies the
/// delivered verdict (which pins `delivery_date` to `last_update`).
pub fn finalize(carrier: &dyn Carrier, mut info: TrackingInfo) -> Result<TrackingInfo> {
    if !info.has_events() {
        return Err(TrackingError::api(format!(
            "{} returned no tracking events for {}",
            carrier.short_name(),
            info.tracking_number
        )));
    }
    let delivered = carrier.delivered_marker().matches(info.status());
    info.set_delivered(delivered);
    tracing::debug!(
        carrier = carrier.short_name(),
        tracking_number = %info.tracking_number,
        events = info.events().len(),
        delivered,
        "Normalized tracking response"
    );
    Ok(info)
}

/// Every carrier this crate ships, in probe order.
pub fn default_carriers(
    config: Arc<dyn ConfigProvider>,
    transport: Arc<dyn Transport>,
) -> Vec<Arc<dyn Carrier>> {
    vec![
        Arc::new(UpsCarrier::new(Arc::clone(&config), Arc::clone(&transport))),
        Arc::new(FedexCarrier::new(Arc::clone(&config), Arc::clone(&transport))),
        Arc::new(UspsCarrier::new(Arc::clone(&config), Arc::clone(&transport))),
        Arc::new(DhlCarrier::new(Arc::clone(&config), Arc::clone(&transport))),
        Arc::new(CanadaPostCarrier::new(Arc::clone(&config), Arc::clone(&transport))),
        Arc::new(PrestigeCarrier::new(config, transport)),
    ]
}

pub fn register_default_carriers(
    registry: &CarrierRegistry,
    config: Arc<dyn ConfigProvider>,
    transport: Arc<dyn Transport>,
) {
    for carrier in default_carriers(config, transport) {
        registry.register(carrier);
    }
    tracing::debug!("Registered carriers: {:?}", registry.short_names());
}
