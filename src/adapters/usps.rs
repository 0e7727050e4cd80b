use crate::adapters::wire::{join_location, parse_date, parse_time, OneOrMany};
use crate::adapters::{finalize, require_identified};
use crate::config::{CarrierConfig, DictConfig};
use crate::core::identify;
use crate::domain::model::{TrackingEvent, TrackingInfo};
use crate::domain::ports::{Carrier, ConfigProvider, HttpRequest, Transport};
use crate::utils::error::{ConfigError, Result, TrackingError};
use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;

const SHORT_NAME: &str = "USPS";

const SERVERS: [(&str, &str); 4] = [
    ("production", "http://production.shippingapis.com/ShippingAPI.dll"),
    ("test", "http://testing.shippingapis.com/ShippingAPITest.dll"),
    ("secure", "https://secure.shippingapis.com/ShippingAPI.dll"),
    ("secure_test", "https://secure.shippingapis.com/ShippingAPITest.dll"),
];

// USPS never names the service; the number prefix does.
const SERVICE_TYPES: [(&str, &str); 5] = [
    ("EA", "express mail"),
    ("EC", "express mail international"),
    ("CP", "priority mail international"),
    ("RA", "registered mail"),
    ("RF", "registered foreign"),
];

pub struct UspsCarrier {
    config: CarrierConfig,
    transport: Arc<dyn Transport>,
}

impl UspsCarrier {
    pub fn new(config: Arc<dyn ConfigProvider>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: CarrierConfig::new(
                SHORT_NAME,
                config,
                DictConfig::new().with_value(SHORT_NAME, "server", "production"),
            ),
            transport,
        }
    }

    fn endpoint(&self) -> Result<String> {
        if let Some(url) = self.config.optional_value("api_url")? {
            return Ok(url);
        }
        let server = self.config.value("server")?;
        SERVERS
            .iter()
            .find(|(name, _)| *name == server)
            .map(|(_, url)| url.to_string())
            .ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "USPS.server".to_string(),
                    value: server.clone(),
                    reason: "expected production, test, secure or secure_test".to_string(),
                }
                .into()
            })
    }

    fn build_request(&self, tracking_number: &str) -> Result<HttpRequest> {
        let xml = format!(
            r#"<TrackFieldRequest USERID="{}"><TrackID ID="{}"/></TrackFieldRequest>"#,
            self.config.value("userid")?,
            tracking_number
        );
        Ok(HttpRequest::get(self.endpoint()?)
            .query("API", "TrackV2")
            .query("XML", xml))
    }

    fn parse_response(&self, raw: &str, tracking_number: &str) -> Result<TrackingInfo> {
        let reply: Reply = serde_json::from_str(raw)?;

        // System-level fault, e.g. a bad USERID.
        if let Some(error) = reply.error {
            return Err(TrackingError::api(error.description));
        }
        let track_info = reply
            .track_response
            .ok_or_else(|| TrackingError::api("USPS response without TrackResponse"))?
            .track_info;
        if let Some(error) = track_info.error {
            return Err(TrackingError::number(error.description));
        }
        let summary = track_info
            .track_summary
            .ok_or_else(|| TrackingError::api("USPS response without TrackSummary"))?;

        let service = SERVICE_TYPES
            .iter()
            .find(|(prefix, _)| tracking_number.starts_with(prefix))
            .map(|(_, description)| *description)
            .unwrap_or(SHORT_NAME);
        let mut info = TrackingInfo::new(tracking_number, service);

        // The summary is the newest scan and is not repeated in the details.
        info.add_event(summary.to_event()?);
        for node in track_info.track_detail.into_vec() {
            info.add_event(node.to_event()?);
        }

        Ok(info)
    }
}

#[async_trait]
impl Carrier for UspsCarrier {
    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    fn long_name(&self) -> &'static str {
        "U.S. Postal Service"
    }

    fn identify(&self, tracking_number: &str) -> bool {
        identify::usps(tracking_number)
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        require_identified(self, tracking_number)?;
        let request = self.build_request(tracking_number)?;
        let raw = self.transport.send(request).await?;
        let info = self.parse_response(&raw, tracking_number)?;
        finalize(self, info)
    }

    fn url(&self, tracking_number: &str) -> String {
        format!(
            "http://trkcnfrm1.smi.usps.com/PTSInternetWeb/InterLabelInquiry.do?origTrackNum={}",
            tracking_number
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reply {
    error: Option<ErrorNode>,
    track_response: Option<TrackResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorNode {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrackResponse {
    track_info: TrackInfoNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrackInfoNode {
    error: Option<ErrorNode>,
    track_summary: Option<EventNode>,
    #[serde(default)]
    track_detail: OneOrMany<EventNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EventNode {
    event: String,
    event_date: String,
    #[serde(default)]
    event_time: String,
    event_city: Option<String>,
    event_state: Option<String>,
    event_country: Option<String>,
}

impl EventNode {
    fn timestamp(&self) -> Result<NaiveDateTime> {
        let date = parse_date(&self.event_date, "%B %d, %Y", "EventDate")?;
        let time = if self.event_time.trim().is_empty() {
            NaiveTime::MIN
        } else {
            parse_time(&self.event_time, "%I:%M %p", "EventTime")?
        };
        Ok(date.and_time(time))
    }

    fn location(&self) -> String {
        let country = self
            .event_country
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("US");
        join_location([
            self.event_city.as_deref(),
            self.event_state.as_deref(),
            Some(country),
        ])
    }

    fn to_event(&self) -> Result<TrackingEvent> {
        Ok(TrackingEvent::new(
            self.timestamp()?,
            self.location(),
            self.event.clone(),
        ))
    }
}
