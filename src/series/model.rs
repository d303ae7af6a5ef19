use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// Canonical event categories.
///
/// Scraped pages and configuration use human labels ("Shard Skirmish"), the
/// output always carries the canonical code ("SKIRMISH").
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EventType {
    Anomaly,
    Skirmish,
}

impl EventType {
    /// Maps a label as it appears on announcement pages.
    pub fn from_source_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "anomaly" => Some(EventType::Anomaly),
            "shard skirmish" => Some(EventType::Skirmish),
            _ => None,
        }
    }

    /// Accepts either a source label or a canonical code.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        Self::from_source_label(value).or_else(|| value.trim().parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub event_type: EventType,
    pub name: String,
    pub date: NaiveDateTime,
    pub series_id: String,
    pub id: Option<String>,
    pub timezone: Option<String>,
    pub country_code: Option<String>,
    pub parent: Option<String>,
}

impl EventRecord {
    pub fn new(
        latitude: f64,
        longitude: f64,
        event_type: EventType,
        name: String,
        date: NaiveDateTime,
        series_id: String,
    ) -> Self {
        Self {
            latitude,
            longitude,
            event_type,
            name,
            date,
            series_id,
            id: None,
            timezone: None,
            country_code: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: String) -> Self {
        self.parent = Some(parent);
        self
    }
}

pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// A finalized record, as written to the output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub series_id: String,
    pub event_type: EventType,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSites {
    pub sites: Vec<Site>,
}

pub type SeriesOutput = BTreeMap<String, SeriesSites>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn should_map_source_labels_case_insensitively() {
        assert_eq!(
            EventType::from_source_label("Shard Skirmish"),
            Some(EventType::Skirmish)
        );
        assert_eq!(
            EventType::from_source_label("ANOMALY"),
            Some(EventType::Anomaly)
        );
        assert_eq!(EventType::from_source_label("Skirmish Shard"), None);
    }

    #[test_log::test]
    fn should_accept_canonical_codes_leniently() {
        assert_eq!(EventType::parse_lenient("skirmish"), Some(EventType::Skirmish));
        assert_eq!(EventType::parse_lenient("Anomaly"), Some(EventType::Anomaly));
        assert_eq!(EventType::parse_lenient("storm"), None);
    }

    #[test_log::test]
    fn should_serialize_canonical_code() {
        let code: &'static str = EventType::Skirmish.into();

        assert_eq!(code, "SKIRMISH");
        assert_eq!(
            serde_json::to_string(&EventType::Anomaly).unwrap(),
            "\"ANOMALY\""
        );
    }

    #[test_log::test]
    fn should_reject_out_of_range_coordinates() {
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(!is_valid_coordinate(90.5, 0.0));
        assert!(!is_valid_coordinate(0.0, -180.1));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
    }
}
