use crate::domain::model::TrackingInfo;
use crate::domain::ports::Carrier;
use crate::utils::error::{Result, TrackingError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory carrier that accepts numbers of one length.
#[derive(Clone)]
pub struct FakeCarrier {
    name: &'static str,
    accepted_len: usize,
    fail: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FakeCarrier {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            accepted_len: 0,
            fail: false,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn accepting_len(mut self, len: usize) -> Self {
        self.accepted_len = len;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn track_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Carrier for FakeCarrier {
    fn short_name(&self) -> &'static str {
        self.name
    }

    fn identify(&self, tracking_number: &str) -> bool {
        tracking_number.len() == self.accepted_len
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        if !self.identify(tracking_number) {
            return Err(TrackingError::invalid(tracking_number));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(TrackingError::number(format!("{} does not know {}", self.name, tracking_number)));
        }
        let mut info = TrackingInfo::new(tracking_number, self.name);
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap_or_default();
        info.create_event(ts, "Springfield,IL,US", "In transit");
        Ok(info)
    }

    fn url(&self, tracking_number: &str) -> String {
        format!("https://track.example/{}/{}", self.name, tracking_number)
    }
}
