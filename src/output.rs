use crate::series::model::{SeriesOutput, Site};
use itertools::Itertools;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

pub const DOCUMENT_FILE_NAME: &str = "processed_series_data.json";
pub const EVENTS_FILE_NAME: &str = "events.csv";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed writing output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed serializing document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed writing events table: {0}")]
    Csv(#[from] csv::Error),
}

/// Flat row of the events table; every column is always present.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRow<'a> {
    id: &'a str,
    series_id: &'a str,
    event_type: &'static str,
    name: &'a str,
    latitude: f64,
    longitude: f64,
    date: &'a str,
    timezone: Option<&'a str>,
    country_code: Option<&'a str>,
    parent: Option<&'a str>,
}

impl<'a> From<&'a Site> for EventRow<'a> {
    fn from(site: &'a Site) -> Self {
        Self {
            id: &site.id,
            series_id: &site.series_id,
            event_type: site.event_type.into(),
            name: &site.name,
            latitude: site.latitude,
            longitude: site.longitude,
            date: &site.date,
            timezone: site.timezone.as_deref(),
            country_code: site.country_code.as_deref(),
            parent: site.parent.as_deref(),
        }
    }
}

pub fn render_document(document: &SeriesOutput) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Every site of every series, ordered by local date, then series, then id.
pub fn sorted_sites(document: &SeriesOutput) -> Vec<&Site> {
    document
        .values()
        .flat_map(|series| series.sites.iter())
        .sorted_by(|a, b| {
            a.date
                .get(..19)
                .cmp(&b.date.get(..19))
                .then_with(|| a.series_id.cmp(&b.series_id))
                .then_with(|| a.id.cmp(&b.id))
        })
        .collect()
}

/// Replaces the previous snapshot in `dir` with this run's document and
/// events table.
#[instrument(skip(document))]
pub fn write_snapshot(dir: &Path, document: &SeriesOutput) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(dir)?;

    let document_path = dir.join(DOCUMENT_FILE_NAME);
    fs::write(&document_path, render_document(document)?)?;

    let mut events = csv::Writer::from_path(dir.join(EVENTS_FILE_NAME))?;
    for site in sorted_sites(document) {
        events.serialize(EventRow::from(site))?;
    }
    events.flush()?;

    info!("Wrote snapshot to {}", document_path.display());

    Ok(document_path)
}
