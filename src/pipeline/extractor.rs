use crate::series::dto::ANNOUNCEMENT_DATE_FORMAT;
use crate::series::model::{is_valid_coordinate, EventRecord, EventType};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use thiserror::Error;
use tracing::debug;

lazy_static! {
    static ref MARKER_REGEX: Regex = Regex::new(
        r"(?P<lat>-?\d+(?:\.\d+)?),\s*(?P<lng>-?\d+(?:\.\d+)?)\]\)\.bindPopup\('(?P<type>(?i:shard skirmish|anomaly))<br\s*/?> ?(?P<city>.+?)<br\s*/?>(?P<date>.+?)'"
    )
    .expect("Failed to create marker regex");
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unknown event type label '{0}'")]
    UnknownEventType(String),
    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),
    #[error("coordinates out of range ({latitude}, {longitude})")]
    CoordinatesOutOfRange { latitude: f64, longitude: f64 },
    #[error("invalid marker date '{0}'")]
    InvalidDate(String),
}

/// Reads every map marker declared in an announcement page.
///
/// A page without markers yields no records; a marker that matches but
/// cannot be interpreted fails the whole page.
pub fn extract_markers(
    page_text: &str,
    series_id: &str,
) -> Result<Vec<EventRecord>, ExtractionError> {
    let records = MARKER_REGEX
        .captures_iter(page_text)
        .map(|marker| {
            let latitude = parse_coordinate(&marker["lat"])?;
            let longitude = parse_coordinate(&marker["lng"])?;

            if !is_valid_coordinate(latitude, longitude) {
                return Err(ExtractionError::CoordinatesOutOfRange {
                    latitude,
                    longitude,
                });
            }

            let event_type = EventType::from_source_label(&marker["type"])
                .ok_or_else(|| ExtractionError::UnknownEventType(marker["type"].to_string()))?;

            let raw_date = marker["date"].trim();
            let date = NaiveDate::parse_from_str(raw_date, ANNOUNCEMENT_DATE_FORMAT)
                .map_err(|_| ExtractionError::InvalidDate(raw_date.to_string()))?;

            Ok(EventRecord::new(
                latitude,
                longitude,
                event_type,
                decode_popup_text(&marker["city"]),
                date.and_time(chrono::NaiveTime::MIN),
                series_id.to_string(),
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Extracted {} markers for series {}", records.len(), series_id);

    Ok(records)
}

fn parse_coordinate(value: &str) -> Result<f64, ExtractionError> {
    value
        .parse()
        .map_err(|_| ExtractionError::InvalidCoordinate(value.to_string()))
}

/// Popups are HTML, so localities may contain entities or inline tags.
fn decode_popup_text(raw: &str) -> String {
    Html::parse_fragment(raw)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}
