use crate::domain::model::{DeliveredMarker, TrackingInfo};
use crate::utils::error::{ConfigError, Result};
use async_trait::async_trait;

/// Capability set every carrier plugin implements.
#[async_trait]
pub trait Carrier: Send + Sync {
    /// Unique registry key, e.g. "UPS".
    fn short_name(&self) -> &'static str;

    fn long_name(&self) -> &'static str {
        self.short_name()
    }

    /// Pure format/checksum check. Never fails; non-matching input is `false`.
    fn identify(&self, tracking_number: &str) -> bool;

    /// Fetches and normalizes tracking data. Callers must only pass numbers
    /// this carrier identifies; implementations reject others with
    /// `InvalidTrackingNumber` before any I/O.
    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo>;

    /// Public tracking page. Pure formatting.
    fn url(&self, tracking_number: &str) -> String;

    fn delivered_marker(&self) -> DeliveredMarker {
        DeliveredMarker::EndsWith
    }

    async fn is_delivered(
        &self,
        tracking_number: &str,
        tracking_info: Option<&TrackingInfo>,
    ) -> Result<bool> {
        match tracking_info {
            Some(info) => Ok(info
                .latest_event()
                .map(|event| self.delivered_marker().matches(&event.detail))
                .unwrap_or(false)),
            None => {
                let info = self.track(tracking_number).await?;
                Ok(self.delivered_marker().matches(info.status()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A carrier request, independent of the HTTP client that executes it.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.into()),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Wire-level collaborator. Returns the raw response body; transport
/// failures map to `Network`, non-success statuses to `Api`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<String>;
}

pub trait ConfigProvider: Send + Sync {
    /// Looks up `namespace.keys...`; absent values fail with
    /// [`ConfigError::KeyNotFound`].
    fn get_value(&self, namespace: &str, keys: &[&str]) -> std::result::Result<String, ConfigError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeCarrier;
    use chrono::NaiveDate;

    #[test]
    fn test_is_delivered_uses_supplied_record() {
        let carrier = FakeCarrier::new("TEN").accepting_len(10);
        let mut info = TrackingInfo::new("1234567890", "TEN");
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        info.create_event(ts, "Dayton,OH", "Package delivered");

        let delivered =
            tokio_test::block_on(carrier.is_delivered("1234567890", Some(&info))).unwrap();
        assert!(delivered);
        assert_eq!(carrier.track_calls(), 0);
    }

    #[test]
    fn test_is_delivered_tracks_when_no_record_given() {
        let carrier = FakeCarrier::new("TEN").accepting_len(10);
        let delivered = tokio_test::block_on(carrier.is_delivered("1234567890", None)).unwrap();
        assert!(!delivered);
        assert_eq!(carrier.track_calls(), 1);
    }

    #[test]
    fn test_post_request_is_json() {
        let request = HttpRequest::post("http://localhost/track", "{}").header("X-Trace", "1");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.body.as_deref(), Some("{}"));
    }
}
