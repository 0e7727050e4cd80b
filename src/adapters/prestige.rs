use crate::adapters::wire::{join_location, parse_date, parse_time};
use crate::adapters::{finalize, require_identified};
use crate::config::{CarrierConfig, DictConfig};
use crate::core::identify;
use crate::domain::model::{DeliveredMarker, TrackingInfo};
use crate::domain::ports::{Carrier, ConfigProvider, HttpRequest, Transport};
use crate::utils::error::{Result, TrackingError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;

const SHORT_NAME: &str = "Prestige";
const NAMESPACE: &str = "PS";
const DEFAULT_API_URL: &str = "http://www.prestigedelivery.com/TrackingHandler.ashx";

/// Regional courier in the US Midwest.
pub struct PrestigeCarrier {
    config: CarrierConfig,
    transport: Arc<dyn Transport>,
}

impl PrestigeCarrier {
    pub fn new(config: Arc<dyn ConfigProvider>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: CarrierConfig::new(
                NAMESPACE,
                config,
                DictConfig::new().with_value(NAMESPACE, "api_url", DEFAULT_API_URL),
            ),
            transport,
        }
    }

    fn build_request(&self, tracking_number: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::get(self.config.value("api_url")?).query("trackingNumbers", tracking_number))
    }

    fn parse_response(&self, raw: &str, tracking_number: &str) -> Result<TrackingInfo> {
        let packages: Vec<Package> = serde_json::from_str(raw)?;
        let package = packages
            .into_iter()
            .next()
            .ok_or_else(|| TrackingError::number(format!("Prestige has no record of {}", tracking_number)))?;

        // Newest event first.
        if let Some(first) = package.tracking_event_history.first() {
            if first.event_code.starts_with("ERROR_") {
                return Err(TrackingError::api(format!(
                    "{}: {}",
                    first.event_code,
                    first.event_code_desc.trim()
                )));
            }
        }

        let delivery_date = package
            .tracking_event_history
            .first()
            .and_then(|e| e.schd_date_time.as_deref())
            .map(parse_ms_date)
            .transpose()?;
        let number = if package.tracking_number.trim().is_empty() {
            tracking_number.to_string()
        } else {
            package.tracking_number.trim().to_string()
        };
        let mut info = TrackingInfo::new(number, SHORT_NAME).with_delivery_date(delivery_date);

        for event in &package.tracking_event_history {
            let date = parse_date(&event.server_date, "%m/%d/%Y", "serverDate")?;
            let time = parse_time(&event.server_time, "%I:%M %p", "serverTime")?;
            info.create_event(
                date.and_time(time),
                join_location([Some(event.el_city.as_str()), Some(event.el_state.as_str())]),
                event.event_code_desc.trim(),
            );
        }

        Ok(info)
    }
}

/// Parses the ASP.NET `/Date(1388552400000)/` form as UTC.
fn parse_ms_date(value: &str) -> Result<NaiveDateTime> {
    let invalid = || TrackingError::api(format!("Unparseable SchdDateTime '{}'", value));
    let inner = value
        .trim()
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
        .ok_or_else(invalid)?;
    let digits_end = inner
        .char_indices()
        .find(|&(idx, c)| !(c.is_ascii_digit() || (idx == 0 && c == '-')))
        .map(|(idx, _)| idx)
        .unwrap_or(inner.len());
    let millis: i64 = inner[..digits_end].parse().map_err(|_| invalid())?;
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .ok_or_else(invalid)
}

#[async_trait]
impl Carrier for PrestigeCarrier {
    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    fn long_name(&self) -> &'static str {
        "Prestige Delivery Systems, Inc"
    }

    fn identify(&self, tracking_number: &str) -> bool {
        identify::prestige(tracking_number)
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        require_identified(self, tracking_number)?;
        let request = self.build_request(tracking_number)?;
        let raw = self.transport.send(request).await?;
        let info = self.parse_response(&raw, tracking_number)?;
        finalize(self, info)
    }

    fn url(&self, tracking_number: &str) -> String {
        format!("http://www.prestigedelivery.com/trackpackage.aspx?{}", tracking_number)
    }

    fn delivered_marker(&self) -> DeliveredMarker {
        DeliveredMarker::Equals
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Package {
    #[serde(default)]
    tracking_number: String,
    #[serde(default)]
    tracking_event_history: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "EventCode", default)]
    event_code: String,
    #[serde(rename = "EventCodeDesc", default)]
    event_code_desc: String,
    #[serde(rename = "ELCity", default)]
    el_city: String,
    #[serde(rename = "ELState", default)]
    el_state: String,
    #[serde(rename = "serverDate", default)]
    server_date: String,
    #[serde(rename = "serverTime", default)]
    server_time: String,
    #[serde(rename = "SchdDateTime")]
    schd_date_time: Option<String>,
}
