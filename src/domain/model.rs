use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Carrier-specific fields that have no slot in the canonical record.
pub type Extra = BTreeMap<String, serde_json::Value>;

/// A single status change reported by a carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub timestamp: NaiveDateTime,
    pub location: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Extra,
}

impl TrackingEvent {
    pub fn new(
        timestamp: NaiveDateTime,
        location: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            location: location.into(),
            detail: detail.into(),
            extra: Extra::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Normalized tracking result every adapter produces.
///
/// `events` is private so it can only grow through [`TrackingInfo::add_event`],
/// which keeps it sorted ascending by timestamp. Events with equal timestamps
/// keep their insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingInfo {
    pub tracking_number: String,
    pub delivery_date: Option<NaiveDateTime>,
    pub service: String,
    pub is_delivered: bool,
    events: Vec<TrackingEvent>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Extra,
}

impl TrackingInfo {
    pub fn new(tracking_number: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            delivery_date: None,
            service: service.into(),
            is_delivered: false,
            events: Vec::new(),
            extra: Extra::new(),
        }
    }

    pub fn with_delivery_date(mut self, delivery_date: Option<NaiveDateTime>) -> Self {
        self.delivery_date = delivery_date;
        self
    }

    pub fn create_event(
        &mut self,
        timestamp: NaiveDateTime,
        location: impl Into<String>,
        detail: impl Into<String>,
    ) -> &TrackingEvent {
        self.add_event(TrackingEvent::new(timestamp, location, detail))
    }

    /// Inserts in timestamp order. On a delivered record `delivery_date`
    /// follows the new `last_update`.
    pub fn add_event(&mut self, event: TrackingEvent) -> &TrackingEvent {
        let idx = self
            .events
            .partition_point(|existing| existing.timestamp <= event.timestamp);
        self.events.insert(idx, event);
        if self.is_delivered {
            self.delivery_date = Some(self.last_update());
        }
        &self.events[idx]
    }

    pub fn events(&self) -> &[TrackingEvent] {
        &self.events
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// The event with the greatest timestamp, if any.
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.events.last()
    }

    /// # Panics
    ///
    /// Panics when the record holds no events. Adapters never return such a
    /// record from a successful `track()`.
    fn latest(&self) -> &TrackingEvent {
        match self.events.last() {
            Some(event) => event,
            None => panic!(
                "TrackingInfo for {} has no events; derived fields are undefined",
                self.tracking_number
            ),
        }
    }

    /// Detail text of the latest event. Panics on an empty record.
    pub fn status(&self) -> &str {
        &self.latest().detail
    }

    /// Location of the latest event. Panics on an empty record.
    pub fn location(&self) -> &str {
        &self.latest().location
    }

    /// Timestamp of the latest event. Panics on an empty record.
    pub fn last_update(&self) -> NaiveDateTime {
        self.latest().timestamp
    }

    /// Records the delivery verdict; a delivered shipment's delivery date is
    /// its last update.
    pub fn set_delivered(&mut self, delivered: bool) {
        self.is_delivered = delivered;
        if delivered {
            self.delivery_date = Some(self.last_update());
        }
    }
}

/// How an adapter decides "delivered" from the latest event's detail text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveredMarker {
    Equals,
    EndsWith,
}

impl DeliveredMarker {
    const MARKER: &'static str = "delivered";

    pub fn matches(&self, detail: &str) -> bool {
        let detail = detail.trim().to_lowercase();
        match self {
            DeliveredMarker::Equals => detail == Self::MARKER,
            DeliveredMarker::EndsWith => detail.ends_with(Self::MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_events_read_back_sorted() {
        let mut info = TrackingInfo::new("1Z12345E0205271688", "UPS Ground");
        info.create_event(at(3), "C", "third");
        info.create_event(at(1), "A", "first");
        info.create_event(at(2), "B", "second");

        let hours: Vec<_> = info.events().iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(hours, vec!["first", "second", "third"]);
        assert_eq!(info.last_update(), at(3));
        assert_eq!(info.status(), "third");
        assert_eq!(info.location(), "C");
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let mut info = TrackingInfo::new("x", "svc");
        info.create_event(at(1), "A", "one");
        info.create_event(at(1), "B", "two");
        assert_eq!(info.status(), "two");
    }

    #[test]
    fn test_set_delivered_pins_delivery_date() {
        let mut info = TrackingInfo::new("x", "svc").with_delivery_date(Some(at(23)));
        info.create_event(at(5), "Here", "Delivered");
        info.set_delivered(true);
        assert!(info.is_delivered);
        assert_eq!(info.delivery_date, Some(info.last_update()));
    }

    #[test]
    fn test_event_after_delivery_moves_delivery_date() {
        let mut info = TrackingInfo::new("x", "svc");
        info.create_event(at(5), "Here", "Delivered");
        info.set_delivered(true);
        info.create_event(at(9), "Here", "Signature on file");
        assert_eq!(info.delivery_date, Some(at(9)));
        assert_eq!(info.delivery_date, Some(info.last_update()));

        // An older scan leaves it alone.
        info.create_event(at(2), "There", "Picked up");
        assert_eq!(info.delivery_date, Some(at(9)));
    }

    #[test]
    fn test_not_delivered_keeps_estimate() {
        let mut info = TrackingInfo::new("x", "svc").with_delivery_date(Some(at(23)));
        info.create_event(at(5), "Here", "In transit");
        info.set_delivered(false);
        assert_eq!(info.delivery_date, Some(at(23)));
    }

    #[test]
    #[should_panic(expected = "has no events")]
    fn test_status_on_empty_record_panics() {
        let info = TrackingInfo::new("x", "svc");
        let _ = info.status();
    }

    #[test]
    fn test_delivered_marker() {
        assert!(DeliveredMarker::Equals.matches("DELIVERED"));
        assert!(!DeliveredMarker::Equals.matches("Item delivered"));
        assert!(DeliveredMarker::EndsWith.matches("Item successfully delivered"));
        assert!(!DeliveredMarker::EndsWith.matches("Out for delivery"));
    }

    #[test]
    fn test_extra_fields_serialize() {
        let event = TrackingEvent::new(at(1), "A", "scan").with_extra("code", "AR");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["extra"]["code"], "AR");
    }
}
