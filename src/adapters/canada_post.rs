use crate::adapters::wire::{join_location, parse_date, parse_datetime, parse_time, OneOrMany};
use crate::adapters::{finalize, require_identified};
use crate::config::{CarrierConfig, DictConfig};
use crate::core::identify;
use crate::domain::model::{TrackingEvent, TrackingInfo};
use crate::domain::ports::{Carrier, ConfigProvider, HttpRequest, Transport};
use crate::utils::error::{Result, TrackingError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

const SHORT_NAME: &str = "CAPost";
const NAMESPACE: &str = "CanadaPost";
const DEFAULT_API_URL: &str = "https://soa-gw.canadapost.ca/vis/track";

const CODE_NO_HISTORY: &str = "004";

/// Endpoint plus the pre-encoded credentials, built once per carrier.
#[derive(Debug, Clone)]
struct Client {
    endpoint: String,
    authorization: String,
}

impl Client {
    fn request(&self, tracking_number: &str, resource: &str) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/pin/{}/{}",
            self.endpoint.trim_end_matches('/'),
            tracking_number,
            resource
        ))
        .header("Authorization", self.authorization.as_str())
        .header("Accept", "application/json")
        .header("Accept-Language", "en-CA")
    }
}

pub struct CanadaPostCarrier {
    config: CarrierConfig,
    transport: Arc<dyn Transport>,
    client: OnceLock<Client>,
}

impl CanadaPostCarrier {
    pub fn new(config: Arc<dyn ConfigProvider>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: CarrierConfig::new(
                NAMESPACE,
                config,
                DictConfig::new().with_value(NAMESPACE, "api_url", DEFAULT_API_URL),
            ),
            transport,
            client: OnceLock::new(),
        }
    }

    /// Missing credentials are reported on every call rather than cached.
    fn client(&self) -> Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let credentials = format!(
            "{}:{}",
            self.config.value("username")?,
            self.config.value("password")?
        );
        let client = Client {
            endpoint: self.config.value("api_url")?,
            authorization: format!("Basic {}", STANDARD.encode(credentials)),
        };
        tracing::debug!(endpoint = %client.endpoint, "Created CanadaPost client");
        Ok(self.client.get_or_init(|| client))
    }

    fn parse_response(&self, summary_raw: &str, detail_raw: &str, tracking_number: &str) -> Result<TrackingInfo> {
        let summary: SummaryReply = serde_json::from_str(summary_raw)?;
        check_messages(summary.messages)?;
        let detail: DetailReply = serde_json::from_str(detail_raw)?;
        check_messages(detail.messages)?;

        let detail = detail
            .tracking_detail
            .ok_or_else(|| TrackingError::api("CanadaPost response without tracking-detail"))?;

        let delivery_date = match detail.expected_delivery_date.as_deref() {
            Some(date) if !date.trim().is_empty() => {
                parse_date(date, "%Y-%m-%d", "expected-delivery-date")?.and_hms_opt(0, 0, 0)
            }
            _ => None,
        };
        let mut info = TrackingInfo::new(
            tracking_number,
            detail.service_name.unwrap_or_else(|| NAMESPACE.to_string()),
        )
        .with_delivery_date(delivery_date);

        // Occurrences arrive newest first; add_event sorts them.
        for occurrence in detail.significant_events.occurrence.into_vec() {
            let date = parse_date(&occurrence.event_date, "%Y-%m-%d", "event-date")?;
            let time = parse_time(&occurrence.event_time, "%H:%M:%S", "event-time")?;
            info.add_event(
                TrackingEvent::new(
                    date.and_time(time),
                    join_location([
                        occurrence.event_site.as_deref(),
                        occurrence.event_province.as_deref(),
                    ]),
                    occurrence.event_description,
                )
                .with_extra("event_identifier", occurrence.event_identifier.unwrap_or_default()),
            );
        }

        if !info.has_events() {
            let pin = summary
                .tracking_summary
                .and_then(|s| s.pin_summary.into_vec().into_iter().next());
            if let Some(pin) = pin {
                info.create_event(
                    parse_datetime(&pin.event_date_time, "%Y%m%d:%H%M%S", "event-date-time")?,
                    join_location([pin.event_location.as_deref()]),
                    pin.event_description,
                );
            }
        }

        Ok(info)
    }
}

fn check_messages(messages: Option<Messages>) -> Result<()> {
    let Some(messages) = messages else {
        return Ok(());
    };
    let messages = messages.message.into_vec();
    let text = messages
        .iter()
        .map(|m| format!("{}: {}", m.code, m.description))
        .collect::<Vec<_>>()
        .join("; ");
    if messages.iter().any(|m| m.code == CODE_NO_HISTORY) {
        Err(TrackingError::number(text))
    } else {
        Err(TrackingError::api(text))
    }
}

#[async_trait]
impl Carrier for CanadaPostCarrier {
    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    fn long_name(&self) -> &'static str {
        NAMESPACE
    }

    fn identify(&self, tracking_number: &str) -> bool {
        identify::canada_post(tracking_number)
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        require_identified(self, tracking_number)?;
        let client = self.client()?;
        let (summary, detail) = tokio::try_join!(
            self.transport.send(client.request(tracking_number, "summary")),
            self.transport.send(client.request(tracking_number, "detail")),
        )?;
        let info = self.parse_response(&summary, &detail, tracking_number)?;
        finalize(self, info)
    }

    fn url(&self, tracking_number: &str) -> String {
        format!(
            "http://www.canadapost.ca/cpotools/apps/track/personal/findByTrackNumber?trackingNumber={}&LOCALE=en",
            tracking_number
        )
    }
}

#[derive(Debug, Deserialize)]
struct Messages {
    #[serde(default)]
    message: OneOrMany<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SummaryReply {
    messages: Option<Messages>,
    tracking_summary: Option<TrackingSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TrackingSummary {
    #[serde(default)]
    pin_summary: OneOrMany<PinSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PinSummary {
    event_date_time: String,
    event_location: Option<String>,
    #[serde(default)]
    event_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DetailReply {
    messages: Option<Messages>,
    tracking_detail: Option<TrackingDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TrackingDetail {
    expected_delivery_date: Option<String>,
    service_name: Option<String>,
    #[serde(default)]
    significant_events: SignificantEvents,
}

#[derive(Debug, Default, Deserialize)]
struct SignificantEvents {
    #[serde(default)]
    occurrence: OneOrMany<Occurrence>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Occurrence {
    event_identifier: Option<String>,
    event_date: String,
    event_time: String,
    event_description: String,
    event_site: Option<String>,
    event_province: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::HttpTransport;
    use crate::config::NullConfig;

    fn carrier() -> CanadaPostCarrier {
        CanadaPostCarrier::new(Arc::new(NullConfig), Arc::new(HttpTransport::new()))
    }

    const SUMMARY: &str = r#"{"tracking-summary": {"pin-summary": {
        "pin": "1234567890123456", "event-date-time": "20240305:101500",
        "event-location": "OTTAWA", "event-description": "Item out for delivery"}}}"#;

    #[test]
    fn test_occurrences_are_sorted_oldest_first() {
        let detail = r#"{"tracking-detail": {
            "expected-delivery-date": "2024-03-06",
            "service-name": "Expedited Parcels",
            "significant-events": {"occurrence": [
                {"event-identifier": "1496", "event-date": "2024-03-06", "event-time": "13:02:11",
                 "event-description": "Item successfully delivered", "event-site": "OTTAWA", "event-province": "ON"},
                {"event-identifier": "0174", "event-date": "2024-03-04", "event-time": "08:30:00",
                 "event-description": "Item processed", "event-site": "MISSISSAUGA", "event-province": "ON"}
            ]}
        }}"#;

        let carrier = carrier();
        let info = finalize(
            &carrier,
            carrier.parse_response(SUMMARY, detail, "1234567890123456").unwrap(),
        )
        .unwrap();
        assert_eq!(info.events()[0].detail, "Item processed");
        assert_eq!(info.location(), "OTTAWA,ON");
        assert_eq!(info.service, "Expedited Parcels");
        assert!(info.is_delivered);
        assert_eq!(info.delivery_date, Some(info.last_update()));
    }

    #[test]
    fn test_summary_fills_in_when_detail_is_empty() {
        let detail = r#"{"tracking-detail": {"service-name": "Regular Parcel"}}"#;
        let info = carrier()
            .parse_response(SUMMARY, detail, "1234567890123456")
            .unwrap();
        assert_eq!(info.events().len(), 1);
        assert_eq!(info.status(), "Item out for delivery");
        assert_eq!(
            info.last_update().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-03-05 10:15:00"
        );
        assert_eq!(info.delivery_date, None);
    }

    #[test]
    fn test_no_history_message_is_number_failure() {
        let summary = r#"{"messages": {"message": {"code": "004", "description": "No Pin History"}}}"#;
        let err = carrier()
            .parse_response(summary, "{}", "1234567890123456")
            .unwrap_err();
        assert!(matches!(err, TrackingError::Number { .. }));
    }

    #[test]
    fn test_other_messages_are_api_failures() {
        let detail = r#"{"messages": {"message": [{"code": "E002", "description": "AA004: You cannot mail on behalf of the requested customer."}]}}"#;
        let err = carrier()
            .parse_response(SUMMARY, detail, "1234567890123456")
            .unwrap_err();
        assert!(matches!(err, TrackingError::Api { .. }));
    }

    #[test]
    fn test_client_is_built_once_with_basic_auth() {
        let carrier = CanadaPostCarrier::new(
            Arc::new(
                DictConfig::new()
                    .with_value("CanadaPost", "username", "user")
                    .with_value("CanadaPost", "password", "pass"),
            ),
            Arc::new(HttpTransport::new()),
        );
        let first = carrier.client().unwrap() as *const Client;
        let second = carrier.client().unwrap() as *const Client;
        assert_eq!(first, second);

        let request = carrier.client().unwrap().request("1234567890123456", "detail");
        assert_eq!(request.url, "https://soa-gw.canadapost.ca/vis/track/pin/1234567890123456/detail");
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string())));
    }

    #[test]
    fn test_missing_credentials_are_api_failures() {
        let err = carrier().client().unwrap_err();
        assert!(err.to_string().contains("CanadaPost.username"));
    }
}
