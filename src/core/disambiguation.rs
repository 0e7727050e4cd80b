//! Resolution of numbers whose format more than one carrier accepts.
//!
//! Format checks cannot separate, e.g., a FedEx SmartPost number from a
//! USPS one, so each candidate is asked to actually track the number. The
//! first candidate in registration order whose probe succeeds wins,
//! regardless of which probe finishes first.

use crate::domain::model::TrackingInfo;
use crate::domain::ports::Carrier;
use crate::utils::error::{Result, TrackingError};
use futures::future::join_all;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeStrategy {
    /// Probe one candidate at a time, stopping at the first success.
    #[default]
    Sequential,
    /// Launch every probe at once, then pick by registration order.
    Concurrent,
}

/// A candidate that confirmed the number, with the data its probe fetched.
pub struct Probed {
    pub carrier: Arc<dyn Carrier>,
    pub info: TrackingInfo,
}

/// Probes `carriers` (in the given order) for `tracking_number`.
///
/// Fails with `InvalidTrackingNumber` when no carrier accepts the number's
/// format, without touching the network, and with
/// `UnsupportedTrackingNumber` when every probe fails. Probe failures are
/// logged and swallowed.
pub async fn disambiguate(
    tracking_number: &str,
    carriers: &[Arc<dyn Carrier>],
    strategy: ProbeStrategy,
) -> Result<Probed> {
    let candidates: Vec<Arc<dyn Carrier>> = carriers
        .iter()
        .filter(|carrier| carrier.identify(tracking_number))
        .cloned()
        .collect();

    if candidates.is_empty() {
        return Err(TrackingError::invalid(tracking_number));
    }

    tracing::debug!(
        tracking_number,
        candidates = ?candidates.iter().map(|c| c.short_name()).collect::<Vec<_>>(),
        ?strategy,
        "Probing ambiguous tracking number"
    );

    match strategy {
        ProbeStrategy::Sequential => {
            for carrier in candidates {
                match carrier.track(tracking_number).await {
                    Ok(info) => return Ok(confirmed(tracking_number, carrier, info)),
                    Err(err) => log_miss(tracking_number, carrier.as_ref(), &err),
                }
            }
        }
        ProbeStrategy::Concurrent => {
            let results = join_all(candidates.iter().map(|c| c.track(tracking_number))).await;
            let mut winner = None;
            for (carrier, result) in candidates.into_iter().zip(results) {
                match result {
                    Ok(info) if winner.is_none() => winner = Some((carrier, info)),
                    Ok(_) => {}
                    Err(err) => log_miss(tracking_number, carrier.as_ref(), &err),
                }
            }
            if let Some((carrier, info)) = winner {
                return Ok(confirmed(tracking_number, carrier, info));
            }
        }
    }

    Err(TrackingError::unsupported(tracking_number))
}

fn confirmed(tracking_number: &str, carrier: Arc<dyn Carrier>, info: TrackingInfo) -> Probed {
    tracing::info!(tracking_number, carrier = carrier.short_name(), "Probe confirmed carrier");
    Probed { carrier, info }
}

fn log_miss(tracking_number: &str, carrier: &dyn Carrier, err: &TrackingError) {
    tracing::warn!(
        tracking_number,
        carrier = carrier.short_name(),
        error = %err,
        "Probe did not confirm carrier"
    );
}
