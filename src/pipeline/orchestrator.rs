use super::extractor::{extract_markers, ExtractionError};
use super::identifier::assign_ids;
use super::merger::{merge_schedule, MergeError};
use super::resolver::resolve_site;
use super::validator::{summarize, SeriesSummary};
use crate::fetch::api::{FetchError, PageSource};
use crate::geo::GeoLookup;
use crate::series::dto::SeriesDefinition;
use crate::series::model::{SeriesOutput, SeriesSites, Site};
use futures::{stream, StreamExt};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("series has an empty id")]
    EmptyId,
    #[error("couldn't fetch announcement page: {0}")]
    Fetch(#[from] FetchError),
    #[error("couldn't read announcement markers: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("couldn't merge schedule: {0}")]
    Merge(#[from] MergeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFailure {
    pub series_id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub document: SeriesOutput,
    pub summaries: BTreeMap<String, SeriesSummary>,
    pub failures: Vec<SeriesFailure>,
}

impl RunReport {
    pub fn total_sites(&self) -> usize {
        self.document.values().map(|series| series.sites.len()).sum()
    }
}

pub struct Pipeline<S, G> {
    source: S,
    geo: G,
    concurrency: usize,
}

impl<S: PageSource, G: GeoLookup> Pipeline<S, G> {
    pub fn new(source: S, geo: G, concurrency: usize) -> Self {
        Self {
            source,
            geo,
            concurrency,
        }
    }

    /// Series run one at a time unless the page source tolerates parallel
    /// uncached fetches.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency > 1 && !self.source.supports_concurrent_fetches() {
            warn!(
                "Page source isn't safe for concurrent fetches, ignoring concurrency of {}",
                self.concurrency
            );
            return 1;
        }

        self.concurrency.max(1)
    }

    pub async fn run(&self, series: &[SeriesDefinition]) -> RunReport {
        let limit = self.effective_concurrency();

        info!("Processing {} series ({} at a time)", series.len(), limit);

        let mut outcomes = stream::iter(series.iter().enumerate())
            .map(|(index, definition)| async move {
                (index, definition, self.process_series(definition).await)
            })
            .buffer_unordered(limit)
            .collect::<Vec<_>>()
            .await;
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut report = RunReport::default();

        for (_, definition, outcome) in outcomes {
            let series_id = definition.id.clone();

            if report.document.contains_key(&series_id) {
                warn!("Duplicate series id {}, keeping the first", series_id);
                continue;
            }

            let sites = match outcome {
                Ok(sites) => {
                    report
                        .summaries
                        .insert(series_id.clone(), summarize(&series_id, &sites));
                    sites
                }
                Err(err) => {
                    error!("Series '{}' ({}) failed: {}", definition.name, series_id, err);
                    report.failures.push(SeriesFailure {
                        series_id: series_id.clone(),
                        reason: err.to_string(),
                    });
                    Vec::new()
                }
            };

            if !series_id.trim().is_empty() {
                report.document.insert(series_id, SeriesSites { sites });
            }
        }

        info!(
            "Processed {} series, {} sites, {} failed",
            report.document.len(),
            report.total_sites(),
            report.failures.len()
        );

        report
    }

    #[instrument(skip_all, fields(series = %series.id))]
    pub async fn process_series(&self, series: &SeriesDefinition) -> Result<Vec<Site>, SeriesError> {
        if series.id.trim().is_empty() {
            return Err(SeriesError::EmptyId);
        }

        let scraped = match &series.url {
            Some(url) => {
                let page = self.source.fetch(url).await?;
                extract_markers(&page, &series.id)?
            }
            None => Vec::new(),
        };

        let mut records = merge_schedule(series, scraped)?;

        if records.is_empty() {
            info!("No sites for series '{}'", series.name);
            return Ok(Vec::new());
        }

        assign_ids(&mut records);

        Ok(records
            .into_iter()
            .map(|record| resolve_site(&self.geo, record))
            .collect())
    }
}
