use crate::adapters::wire::{join_location, parse_date, parse_time, OneOrMany};
use crate::adapters::{finalize, require_identified};
use crate::config::{CarrierConfig, DictConfig};
use crate::core::identify;
use crate::domain::model::{TrackingEvent, TrackingInfo};
use crate::domain::ports::{Carrier, ConfigProvider, HttpRequest, Transport};
use crate::utils::error::{Result, TrackingError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const SHORT_NAME: &str = "UPS";
const DEFAULT_API_URL: &str = "https://wwwcie.ups.com/ups.app/xml/Track";

// Basic service, handed to the local post office: no delivery scan ever.
const SERVICE_BASIC: &str = "031";
const STATUS_DELIVERED: &str = "D";
const STATUS_MANIFEST: &str = "M";
const NOT_FOUND_CODES: [&str; 2] = ["151018", "151044"];

pub struct UpsCarrier {
    config: CarrierConfig,
    transport: Arc<dyn Transport>,
}

impl UpsCarrier {
    pub fn new(config: Arc<dyn ConfigProvider>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: CarrierConfig::new(SHORT_NAME, config, Self::defaults()),
            transport,
        }
    }

    fn defaults() -> DictConfig {
        DictConfig::new()
            .with_value(SHORT_NAME, "lang", "en-US")
            .with_value(SHORT_NAME, "api_url", DEFAULT_API_URL)
    }

    fn build_request(&self, tracking_number: &str) -> Result<HttpRequest> {
        let body = serde_json::json!({
            "AccessRequest": {
                "AccessLicenseNumber": self.config.value("license_number")?,
                "UserId": self.config.value("user_id")?,
                "Password": self.config.value("password")?,
            },
            "Lang": self.config.value("lang")?,
            "TrackRequest": {
                "Request": {
                    "TransactionReference": { "RequestAction": "Track" },
                    "RequestOption": "1",
                },
                "TrackingNumber": tracking_number,
            },
        });
        Ok(HttpRequest::post(self.config.value("api_url")?, body.to_string()))
    }

    fn parse_response(&self, raw: &str, tracking_number: &str) -> Result<TrackingInfo> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        let root = envelope.track_response;

        if let Some(error) = root.response.error {
            let message = format!("{}: {}", error.error_code, error.error_description);
            return Err(if NOT_FOUND_CODES.contains(&error.error_code.as_str()) {
                TrackingError::number(message)
            } else {
                TrackingError::api(message)
            });
        }
        let shipment = root.shipment.ok_or_else(|| {
            TrackingError::api(format!(
                "Response without shipment (status {} {})",
                root.response.response_status_code, root.response.response_status_description
            ))
        })?;

        let service_code = shipment.service.code.as_str();
        // Newest activity first.
        let activities = shipment.package.activity.into_vec();
        let latest_status = activities
            .first()
            .map(|a| a.status.status_type.code.clone())
            .unwrap_or_default();

        let mut info = TrackingInfo::new(
            tracking_number,
            format!("UPS {}", shipment.service.description),
        );
        info.extra
            .insert("service_code".to_string(), service_code.into());

        for (idx, activity) in activities.iter().enumerate() {
            let status_code = activity.status.status_type.code.as_str();
            let location = if status_code == STATUS_MANIFEST {
                "N/A".to_string()
            } else if idx == 0 && service_code == SERVICE_BASIC {
                shipment
                    .ship_to
                    .as_ref()
                    .map(|ship_to| ship_to.address.render())
                    .unwrap_or_else(|| activity.activity_location.address.render())
            } else {
                activity.activity_location.address.render()
            };

            let date = parse_date(&activity.date, "%Y%m%d", "Activity.Date")?;
            let time = parse_time(&activity.time, "%H%M%S", "Activity.Time")?;
            let mut event = TrackingEvent::new(
                date.and_time(time),
                location,
                activity.status.status_type.description.clone(),
            )
            .with_extra("status_code", status_code);
            if let Some(description) = &activity.activity_location.description {
                event = event.with_extra("delivery_detail", description.as_str());
            }
            info.add_event(event);
        }

        if !info.has_events() {
            return Err(TrackingError::api("UPS response carried no activity"));
        }

        info.delivery_date = if service_code == SERVICE_BASIC || latest_status == STATUS_DELIVERED {
            Some(info.last_update())
        } else if let Some(date) = &shipment.package.rescheduled_delivery_date {
            parse_date(date, "%Y%m%d", "RescheduledDeliveryDate")?.and_hms_opt(0, 0, 0)
        } else if let Some(date) = &shipment.scheduled_delivery_date {
            parse_date(date, "%Y%m%d", "ScheduledDeliveryDate")?.and_hms_opt(0, 0, 0)
        } else {
            None
        };

        Ok(info)
    }
}

#[async_trait]
impl Carrier for UpsCarrier {
    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    fn identify(&self, tracking_number: &str) -> bool {
        identify::ups(tracking_number)
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
            "http://wwwapps.ups.com/WebTracking/processInputRequest?TypeOfInquiryNumber=T&InquiryNumber1={}",
            tracking_number
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    track_response: TrackResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrackResponse {
    response: ResponseStatus,
    shipment: Option<Shipment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseStatus {
    #[serde(default)]
    response_status_code: String,
    #[serde(default)]
    response_status_description: String,
    error: Option<ResponseError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseError {
    error_code: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Shipment {
    service: Service,
    ship_to: Option<ShipTo>,
    scheduled_delivery_date: Option<String>,
    package: Package,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Service {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShipTo {
    address: Address,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Address {
    city: Option<String>,
    state_province_code: Option<String>,
    country_code: Option<String>,
}

impl Address {
    fn render(&self) -> String {
        join_location([
            self.city.as_deref(),
            self.state_province_code.as_deref(),
            self.country_code.as_deref(),
        ])
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Package {
    rescheduled_delivery_date: Option<String>,
    #[serde(default)]
    activity: OneOrMany<Activity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Activity {
    #[serde(default)]
    activity_location: ActivityLocation,
    status: Status,
    date: String,
    time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ActivityLocation {
    #[serde(default)]
    address: Address,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Status {
    status_type: StatusType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusType {
    code: String,
    description: String,
}
