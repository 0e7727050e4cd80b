use crate::adapters::wire::{join_location, parse_date, OneOrMany};
use crate::adapters::{finalize, require_identified};
use crate::config::{CarrierConfig, DictConfig};
use crate::core::identify;
use crate::domain::model::{DeliveredMarker, TrackingEvent, TrackingInfo};
use crate::domain::ports::{Carrier, ConfigProvider, HttpRequest, Transport};
use crate::utils::error::{Result, TrackingError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;

const SHORT_NAME: &str = "FedEx";
const DEFAULT_API_URL: &str = "https://ws.fedex.com/web-services/track";

const STATUS_DELIVERED: &str = "DL";
const CODE_NOT_FOUND: &str = "9040";
const SEVERITY_SUCCESS: &str = "SUCCESS";
// Only the estimate's date counts; FedEx commits to end of business.
const ESTIMATE_HOUR: u32 = 18;

pub struct FedexCarrier {
    config: CarrierConfig,
    transport: Arc<dyn Transport>,
}

impl FedexCarrier {
    pub fn new(config: Arc<dyn ConfigProvider>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: CarrierConfig::new(
                SHORT_NAME,
                config,
                DictConfig::new().with_value(SHORT_NAME, "api_url", DEFAULT_API_URL),
            ),
            transport,
        }
    }

    fn build_request(&self, tracking_number: &str) -> Result<HttpRequest> {
        let body = serde_json::json!({
            "WebAuthenticationDetail": {
                "UserCredential": {
                    "Key": self.config.value("key")?,
                    "Password": self.config.value("password")?,
                },
            },
            "ClientDetail": {
                "AccountNumber": self.config.value("account_number")?,
                "MeterNumber": self.config.value("meter_number")?,
            },
            "PackageIdentifier": {
                "Type": "TRACKING_NUMBER_OR_DOORTAG",
                "Value": tracking_number,
            },
            "IncludeDetailedScans": true,
        });
        Ok(HttpRequest::post(self.config.value("api_url")?, body.to_string()))
    }

    fn parse_response(&self, raw: &str, tracking_number: &str) -> Result<TrackingInfo> {
        let reply: TrackReply = serde_json::from_str(raw)?;

        let detail_notices = reply.track_details.iter().filter_map(|d| d.notification.as_ref());
        if let Some(notice) = reply
            .notifications
            .iter()
            .chain(detail_notices)
            .find(|n| n.code == CODE_NOT_FOUND)
        {
            return Err(TrackingError::number(notice.describe()));
        }
        if reply.highest_severity != SEVERITY_SUCCESS {
            let message = reply
                .notifications
                .first()
                .map(Notification::describe)
                .unwrap_or_else(|| reply.highest_severity.clone());
            return Err(TrackingError::api(message));
        }

        let detail = reply
            .track_details
            .into_iter()
            .next()
            .ok_or_else(|| TrackingError::number(format!("No track details for {}", tracking_number)))?;

        let delivered = detail.status_code.as_deref() == Some(STATUS_DELIVERED);
        let delivery_date = if delivered {
            detail
                .actual_delivery_timestamp
                .as_deref()
                .map(parse_timestamp)
                .transpose()?
        } else {
            detail
                .estimated_delivery_timestamp
                .as_deref()
                .map(parse_estimate)
                .transpose()?
        };

        let mut info = TrackingInfo::new(
            tracking_number,
            detail.service_type.clone().unwrap_or_else(|| SHORT_NAME.to_string()),
        )
        .with_delivery_date(delivery_date);

        let events = detail.events.into_vec();
        if delivered {
            if let Some(description) = events.first().and_then(|e| e.status_exception_description.clone()) {
                info.extra.insert("delivery_detail".to_string(), description.into());
            }
        }

        for event in &events {
            let location = event
                .address
                .as_ref()
                .map(Address::render)
                .unwrap_or_else(|| "UNKNOWN".to_string());
            info.add_event(
                TrackingEvent::new(
                    parse_timestamp(&event.timestamp)?,
                    location,
                    event.event_description.clone(),
                )
                .with_extra("event_type", event.event_type.clone().unwrap_or_default()),
            );
        }

        // Summary-only replies: build the single event from the status block.
        if !info.has_events() {
            if let Some(status) = &detail.status_detail {
                let timestamp = match (&status.creation_time, &detail.actual_delivery_timestamp) {
                    (Some(ts), _) | (None, Some(ts)) => parse_timestamp(ts)?,
                    (None, None) => {
                        return Err(TrackingError::api("FedEx status without timestamp"));
                    }
                };
                let location = match (&status.location, delivered, &detail.actual_delivery_address) {
                    (Some(address), _, _) => address.render(),
                    (None, true, Some(address)) => address.render(),
                    _ => "UNKNOWN".to_string(),
                };
                info.create_event(timestamp, location, status.description.clone());
            }
        }

        Ok(info)
    }
}

/// Carrier-local wall-clock time; the offset is dropped.
fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| TrackingError::api(format!("Unparseable FedEx timestamp '{}': {}", value, e)))
}

fn parse_estimate(value: &str) -> Result<NaiveDateTime> {
    let date = match parse_timestamp(value) {
        Ok(timestamp) => timestamp.date(),
        Err(_) => parse_date(value, "%Y-%m-%d", "EstimatedDeliveryTimestamp")?,
    };
    date.and_hms_opt(ESTIMATE_HOUR, 0, 0)
        .ok_or_else(|| TrackingError::api("Invalid estimate hour"))
}

#[async_trait]
impl Carrier for FedexCarrier {
    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    fn long_name(&self) -> &'static str {
        "Federal Express"
    }

    fn identify(&self, tracking_number: &str) -> bool {
        identify::fedex(tracking_number)
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        require_identified(self, tracking_number)?;
        let request = self.build_request(tracking_number)?;
        let raw = self.transport.send(request).await?;
        let info = self.parse_response(&raw, tracking_number)?;
        finalize(self, info)
    }

    fn url(&self, tracking_number: &str) -> String {
        format!("http://www.fedex.com/Tracking?tracknumbers={}", tracking_number)
    }

    fn delivered_marker(&self) -> DeliveredMarker {
        DeliveredMarker::Equals
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrackReply {
    highest_severity: String,
    #[serde(default)]
    notifications: Vec<Notification>,
    #[serde(default)]
    track_details: Vec<TrackDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Notification {
    #[serde(default)]
    severity: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl Notification {
    fn describe(&self) -> String {
        format!("{} {}: {}", self.severity, self.code, self.message)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrackDetail {
    notification: Option<Notification>,
    status_code: Option<String>,
    status_detail: Option<StatusDetail>,
    service_type: Option<String>,
    actual_delivery_timestamp: Option<String>,
    estimated_delivery_timestamp: Option<String>,
    actual_delivery_address: Option<Address>,
    #[serde(default)]
    events: OneOrMany<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusDetail {
    creation_time: Option<String>,
    description: String,
    location: Option<Address>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Event {
    timestamp: String,
    event_type: Option<String>,
    event_description: String,
    status_exception_description: Option<String>,
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Address {
    city: Option<String>,
    state_or_province_code: Option<String>,
    country_code: Option<String>,
}

impl Address {
    fn render(&self) -> String {
        join_location([
            self.city.as_deref(),
            self.state_or_province_code.as_deref(),
            self.country_code.as_deref(),
        ])
    }
}
