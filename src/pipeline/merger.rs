use crate::series::dto::{Component, SeriesDefinition, SiteConfig};
use crate::series::model::{is_valid_coordinate, EventRecord, EventType};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

const START_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("unknown event type '{0}' in component")]
    UnknownEventType(String),
    #[error("invalid start time '{start_time}' for {event_type}")]
    InvalidStartTime {
        event_type: EventType,
        start_time: String,
    },
    #[error("site '{0}' has no coordinates")]
    MissingCoordinates(String),
    #[error("site '{name}' has coordinates out of range ({latitude}, {longitude})")]
    CoordinatesOutOfRange {
        name: String,
        latitude: f64,
        longitude: f64,
    },
}

/// Appends the series' scheduled sites to the scraped ones.
///
/// When the series has components, every record's date also gets the
/// component's canonical start time for its event type.
pub fn merge_schedule(
    series: &SeriesDefinition,
    scraped: Vec<EventRecord>,
) -> Result<Vec<EventRecord>, MergeError> {
    let scraped_count = scraped.len();
    let mut records = scraped;

    for component in &series.components {
        let event_type = parse_event_type(component)?;

        for entry in &component.schedule {
            for site in entry.sites() {
                records.extend(flatten_site(site, event_type, entry.date, &series.id)?);
            }
        }
    }

    if !series.components.is_empty() {
        let start_times = start_times(&series.components)?;

        for record in records.iter_mut() {
            let start_time = start_times
                .get(&record.event_type)
                .copied()
                .unwrap_or(NaiveTime::MIN);

            record.date = record.date.date().and_time(start_time);
        }
    }

    debug!(
        "Merged {} scraped and {} scheduled records for series {}",
        scraped_count,
        records.len() - scraped_count,
        series.id
    );

    Ok(records)
}

fn parse_event_type(component: &Component) -> Result<EventType, MergeError> {
    EventType::parse_lenient(&component.event_type)
        .ok_or_else(|| MergeError::UnknownEventType(component.event_type.clone()))
}

/// First declared start time wins when several components share a type.
fn start_times(components: &[Component]) -> Result<HashMap<EventType, NaiveTime>, MergeError> {
    let mut start_times = HashMap::new();

    for component in components {
        let event_type = parse_event_type(component)?;

        if let Some(start_time) = &component.start_time {
            let time = NaiveTime::parse_from_str(start_time.trim(), START_TIME_FORMAT).map_err(
                |_| MergeError::InvalidStartTime {
                    event_type,
                    start_time: start_time.clone(),
                },
            )?;

            start_times.entry(event_type).or_insert(time);
        }
    }

    Ok(start_times)
}

/// Composite sites expand into one record per fragment, each pointing back at
/// the composite by name.
fn flatten_site(
    site: &SiteConfig,
    event_type: EventType,
    date: NaiveDate,
    series_id: &str,
) -> Result<Vec<EventRecord>, MergeError> {
    if site.fragments.is_empty() {
        return Ok(vec![site_record(site, &site.name, event_type, date, series_id)?]);
    }

    site.fragments
        .iter()
        .map(|fragment| {
            let name = if fragment.name.trim().is_empty() {
                &site.name
            } else {
                &fragment.name
            };

            site_record(fragment, name, event_type, date, series_id)
                .map(|record| record.with_parent(site.name.clone()))
        })
        .collect()
}

fn site_record(
    site: &SiteConfig,
    name: &str,
    event_type: EventType,
    date: NaiveDate,
    series_id: &str,
) -> Result<EventRecord, MergeError> {
    let (latitude, longitude) = match (site.latitude, site.longitude) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        _ => return Err(MergeError::MissingCoordinates(name.to_string())),
    };

    if !is_valid_coordinate(latitude, longitude) {
        return Err(MergeError::CoordinatesOutOfRange {
            name: name.to_string(),
            latitude,
            longitude,
        });
    }

    Ok(EventRecord::new(
        latitude,
        longitude,
        event_type,
        name.to_string(),
        date.and_time(NaiveTime::MIN),
        series_id.to_string(),
    ))
}
