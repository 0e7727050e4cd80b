use crate::adapters::wire::{parse_datetime, OneOrMany};
use crate::adapters::{finalize, require_identified};
use crate::config::{CarrierConfig, DictConfig};
use crate::core::identify;
use crate::domain::model::{TrackingEvent, TrackingInfo};
use crate::domain::ports::{Carrier, ConfigProvider, HttpRequest, Transport};
use crate::utils::error::{ConfigError, Result, TrackingError};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc, Weekday};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const SHORT_NAME: &str = "DHL";

const SERVERS: [(&str, &str); 2] = [
    ("production", "xmlpi-ea.dhl.com"),
    ("test", "xmlpitest-ea.dhl.com"),
];

const NO_SHIPMENTS: &str = "no shipments found";

pub struct DhlCarrier {
    config: CarrierConfig,
    transport: Arc<dyn Transport>,
}

impl DhlCarrier {
    pub fn new(config: Arc<dyn ConfigProvider>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: CarrierConfig::new(SHORT_NAME, config, Self::defaults()),
            transport,
        }
    }

    // DHL's public sandbox credentials.
    fn defaults() -> DictConfig {
        DictConfig::new()
            .with_value(SHORT_NAME, "site_id", "DServiceVal")
            .with_value(SHORT_NAME, "password", "testServVal")
            .with_value(SHORT_NAME, "server", "test")
            .with_value(SHORT_NAME, "lang", "en")
    }

    fn endpoint(&self) -> Result<String> {
        if let Some(url) = self.config.optional_value("api_url")? {
            return Ok(url);
        }
        let server = self.config.value("server")?;
        SERVERS
            .iter()
            .find(|(name, _)| *name == server)
            .map(|(_, host)| format!("https://{}/XMLShippingServlet", host))
            .ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "DHL.server".to_string(),
                    value: server.clone(),
                    reason: "expected production or test".to_string(),
                }
                .into()
            })
    }

    /// Current time, second precision. A configured `utc_offset` is used as
    /// is; otherwise US Eastern time with daylight saving applies.
    fn message_time(&self) -> Result<String> {
        let now = Utc::now();
        let offset = match self.config.optional_value("utc_offset")? {
            Some(raw) => raw.parse::<FixedOffset>().map_err(|_| ConfigError::InvalidValue {
                field: "DHL.utc_offset".to_string(),
                value: raw.clone(),
                reason: "expected an offset like -05:00".to_string(),
            })?,
            None => eastern_offset(now),
        };
        Ok(now
            .with_timezone(&offset)
            .format("%Y-%m-%dT%H:%M:%S%:z")
            .to_string())
    }

    fn message_reference(&self, awb_number: &str, message_time: &str) -> Result<String> {
        let material = [
            awb_number.to_string(),
            message_time.to_string(),
            self.config.value("site_id")?,
            self.config.value("password")?,
        ]
        .join("|");
        let digest = format!("{:x}", Sha256::digest(material.as_bytes()));
        Ok(digest[..32].to_string())
    }

    fn build_request(&self, tracking_number: &str, message_time: &str) -> Result<HttpRequest> {
        let body = serde_json::json!({
            "KnownTrackingRequest": {
                "Request": {
                    "ServiceHeader": {
                        "MessageTime": message_time,
                        "MessageReference": self.message_reference(tracking_number, message_time)?,
                        "SiteID": self.config.value("site_id")?,
                        "Password": self.config.value("password")?,
                    },
                },
                "LanguageCode": self.config.value("lang")?,
                "AWBNumber": tracking_number,
                "LevelOfDetails": "ALL_CHECK_POINTS",
                "PiecesEnabled": "S",
            },
        });
        Ok(HttpRequest::post(self.endpoint()?, body.to_string()))
    }

    fn parse_response(&self, raw: &str, tracking_number: &str) -> Result<TrackingInfo> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        let awb = envelope
            .tracking_response
            .awb_info
            .into_vec()
            .into_iter()
            .reduce(|found, next| {
                if found.awb_number == tracking_number { found } else { next }
            })
            .ok_or_else(|| TrackingError::api("DHL response without AWBInfo"))?;

        if !awb.status.action_status.eq_ignore_ascii_case("success") {
            let message = awb
                .status
                .condition
                .into_vec()
                .into_iter()
                .map(|c| c.condition_data.trim().to_string())
                .find(|data| !data.is_empty())
                .unwrap_or(awb.status.action_status);
            return Err(if message.to_lowercase().contains(NO_SHIPMENTS) {
                TrackingError::number(message)
            } else {
                TrackingError::api(message)
            });
        }

        let shipment = awb.shipment_info.unwrap_or_default();
        let service = shipment
            .product_name
            .clone()
            .unwrap_or_else(|| SHORT_NAME.to_string());
        let mut info = TrackingInfo::new(
            if awb.awb_number.is_empty() { tracking_number.to_string() } else { awb.awb_number },
            service,
        );

        for event in shipment.shipment_event.into_vec() {
            let timestamp = parse_datetime(
                &format!("{}T{}", event.date.trim(), event.time.trim()),
                "%Y-%m-%dT%H:%M:%S",
                "ShipmentEvent.Date",
            )?;
            let area = event.service_area.description.as_str();
            info.add_event(
                TrackingEvent::new(
                    timestamp,
                    area_location(area),
                    clean_detail(&event.service_event.description, area),
                )
                .with_extra("event_code", event.service_event.event_code.as_str())
                .with_extra("service_area_code", event.service_area.service_area_code.as_str()),
            );
        }

        Ok(info)
    }
}

/// "NEW YORK CITY - NY - USA" -> "NEW YORK CITY,NY,USA".
fn area_location(area: &str) -> String {
    let parts: Vec<&str> = area
        .split('-')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        "UNKNOWN".to_string()
    } else {
        parts.join(",")
    }
}

/// DHL repeats the service area inside the description and ends it with a
/// dangling preposition ("Arrived at Sort Facility at").
fn clean_detail(description: &str, area: &str) -> String {
    let flattened = description.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut detail = if area.trim().is_empty() {
        flattened
    } else {
        flattened.replace(area.trim(), "")
    };
    loop {
        let trimmed = detail.trim_end();
        let stripped = trimmed
            .strip_suffix(" in")
            .or_else(|| trimmed.strip_suffix(" at"));
        match stripped {
            Some(rest) => detail = rest.to_string(),
            None => return trimmed.trim_start().to_string(),
        }
    }
}

/// US Eastern offset at `now`: EDT from 02:00 on the second Sunday of March
/// until 02:00 on the first Sunday of November, EST otherwise.
fn eastern_offset(now: DateTime<Utc>) -> FixedOffset {
    let year = now.year();
    let switch = |month: u32, nth: u8, utc_hour: u32| {
        NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, nth)
            .and_then(|day| day.and_hms_opt(utc_hour, 0, 0))
            .map(|at| at.and_utc())
    };
    let hours = match (switch(3, 2, 7), switch(11, 1, 6)) {
        (Some(start), Some(end)) if now >= start && now < end => 4,
        _ => 5,
    };
    FixedOffset::west_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

#[async_trait]
impl Carrier for DhlCarrier {
    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    fn identify(&self, tracking_number: &str) -> bool {
        identify::dhl(tracking_number)
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        require_identified(self, tracking_number)?;
        let request = self.build_request(tracking_number, &self.message_time()?)?;
        let raw = self.transport.send(request).await?;
        let info = self.parse_response(&raw, tracking_number)?;
        finalize(self, info)
    }

    fn url(&self, tracking_number: &str) -> String {
        format!(
            "http://www.dhl.com/content/g0/en/express/tracking.shtml?brand=DHL&AWB={}",
            tracking_number
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    tracking_response: TrackingResponse,
}

#[derive(Debug, Deserialize)]
struct TrackingResponse {
    #[serde(rename = "AWBInfo", default)]
    awb_info: OneOrMany<AwbInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwbInfo {
    #[serde(rename = "AWBNumber", default)]
    awb_number: String,
    status: AwbStatus,
    shipment_info: Option<ShipmentInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwbStatus {
    action_status: String,
    #[serde(default)]
    condition: OneOrMany<Condition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Condition {
    #[serde(default)]
    condition_data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShipmentInfo {
    product_name: Option<String>,
    #[serde(default)]
    shipment_event: OneOrMany<ShipmentEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShipmentEvent {
    date: String,
    time: String,
    service_event: ServiceEvent,
    #[serde(default)]
    service_area: ServiceArea,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceEvent {
    #[serde(default)]
    event_code: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceArea {
    #[serde(default)]
    service_area_code: String,
    #[serde(default)]
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::HttpTransport;
    use crate::config::NullConfig;

    fn carrier() -> DhlCarrier {
        DhlCarrier::new(Arc::new(NullConfig), Arc::new(HttpTransport::new()))
    }

    #[test]
    fn test_clean_detail() {
        assert_eq!(
            clean_detail("Arrived at Sort\n  Facility LEIPZIG - GERMANY at", "LEIPZIG - GERMANY"),
            "Arrived at Sort Facility"
        );
        assert_eq!(clean_detail("Delivered - Signed for by", ""), "Delivered - Signed for by");
        assert_eq!(clean_detail("Processed in", ""), "Processed");
        // Words containing "at"/"in" survive.
        assert_eq!(clean_detail("Clearance event waiting", ""), "Clearance event waiting");
    }

    #[test]
    fn test_area_location() {
        assert_eq!(area_location("CINCINNATI HUB - CINCINNATI HUB,OH - USA"), "CINCINNATI HUB,CINCINNATI HUB,OH,USA");
        assert_eq!(area_location(" - "), "UNKNOWN");
    }

    #[test]
    fn test_message_reference_is_32_hex_chars() {
        let carrier = carrier();
        let reference = carrier
            .message_reference("1234567890", "2024-03-01T10:00:00-05:00")
            .unwrap();
        assert_eq!(reference.len(), 32);
        assert!(reference.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(
            reference,
            carrier
                .message_reference("1234567890", "2024-03-01T10:00:01-05:00")
                .unwrap()
        );
    }

    #[test]
    fn test_message_time_uses_configured_offset() {
        let carrier = DhlCarrier::new(
            Arc::new(DictConfig::new().with_value("DHL", "utc_offset", "+09:00")),
            Arc::new(HttpTransport::new()),
        );
        assert!(carrier.message_time().unwrap().ends_with("+09:00"));
    }

    #[test]
    fn test_eastern_offset_follows_daylight_saving() {
        use chrono::TimeZone;
        let at = |m, d, h| eastern_offset(Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap());

        assert_eq!(at(1, 15, 12).to_string(), "-05:00");
        assert_eq!(at(7, 1, 12).to_string(), "-04:00");
        // 2024 switches on March 10 and November 3.
        assert_eq!(at(3, 10, 6).to_string(), "-05:00");
        assert_eq!(at(3, 10, 7).to_string(), "-04:00");
        assert_eq!(at(11, 3, 5).to_string(), "-04:00");
        assert_eq!(at(11, 3, 6).to_string(), "-05:00");
    }

    #[test]
    fn test_request_uses_sandbox_defaults() {
        let request = carrier()
            .build_request("1234567890", "2024-03-01T10:00:00-05:00")
            .unwrap();
        assert_eq!(request.url, "https://xmlpitest-ea.dhl.com/XMLShippingServlet");
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body["KnownTrackingRequest"]["Request"]["ServiceHeader"]["SiteID"],
            "DServiceVal"
        );
        assert_eq!(body["KnownTrackingRequest"]["AWBNumber"], "1234567890");
    }

    #[test]
    fn test_successful_response_is_normalized() {
        let raw = r#"{"TrackingResponse": {"AWBInfo": {
            "AWBNumber": "1234567890",
            "Status": {"ActionStatus": "success"},
            "ShipmentInfo": {
                "ProductName": "EXPRESS WORLDWIDE",
                "ShipmentEvent": [
                    {"Date": "2024-03-01", "Time": "09:00:00",
                     "ServiceEvent": {"EventCode": "PU", "Description": "Shipment picked up"},
                     "ServiceArea": {"ServiceAreaCode": "LEJ", "Description": "LEIPZIG - GERMANY"}},
                    {"Date": "2024-03-03", "Time": "14:30:00",
                     "ServiceEvent": {"EventCode": "OK", "Description": "Delivered"},
                     "ServiceArea": {"ServiceAreaCode": "NYC", "Description": "NEW YORK - USA"}}
                ]
            }
        }}}"#;

        let carrier = carrier();
        let info = finalize(&carrier, carrier.parse_response(raw, "1234567890").unwrap()).unwrap();
        assert_eq!(info.service, "EXPRESS WORLDWIDE");
        assert_eq!(info.location(), "NEW YORK,USA");
        assert!(info.is_delivered);
        assert_eq!(info.delivery_date, Some(info.last_update()));
        assert_eq!(info.events()[0].extra["event_code"], "PU");
    }

    #[test]
    fn test_no_shipments_is_number_failure() {
        let raw = r#"{"TrackingResponse": {"AWBInfo": {
            "AWBNumber": "1234567890",
            "Status": {"ActionStatus": "No Shipments Found",
                       "Condition": {"ConditionCode": "209", "ConditionData": "No Shipments Found for AWBNumber 1234567890"}}
        }}}"#;
        let err = carrier().parse_response(raw, "1234567890").unwrap_err();
        assert!(matches!(err, TrackingError::Number { .. }));
    }

    #[test]
    fn test_other_failure_is_api_failure() {
        let raw = r#"{"TrackingResponse": {"AWBInfo": {
            "Status": {"ActionStatus": "Failure",
                       "Condition": [{"ConditionCode": "111", "ConditionData": "Error in parsing request XML"}]}
        }}}"#;
        let err = carrier().parse_response(raw, "1234567890").unwrap_err();
        assert!(matches!(err, TrackingError::Api { .. }));
        assert!(err.to_string().contains("parsing request"));
    }
}
