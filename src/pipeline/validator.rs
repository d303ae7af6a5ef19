use crate::series::model::Site;
use itertools::Itertools;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesSummary {
    pub sites: usize,
    pub missing_timezone: usize,
    pub missing_country: usize,
    pub empty_slugs: usize,
    /// Groups of sites sharing the exact same coordinates.
    pub co_located: usize,
}

pub fn summarize(series_id: &str, sites: &[Site]) -> SeriesSummary {
    let summary = SeriesSummary {
        sites: sites.len(),
        missing_timezone: sites.iter().filter(|s| s.timezone.is_none()).count(),
        missing_country: sites.iter().filter(|s| s.country_code.is_none()).count(),
        empty_slugs: sites.iter().filter(|s| has_empty_slug(s)).count(),
        co_located: sites
            .iter()
            .map(|s| (s.latitude.to_bits(), s.longitude.to_bits()))
            .counts()
            .values()
            .filter(|&&count| count > 1)
            .count(),
    };

    info!("Series {}: {} sites", series_id, summary.sites);

    if summary.missing_timezone > 0 {
        warn!(
            "Series {}: {} sites without timezone",
            series_id, summary.missing_timezone
        );
    }
    if summary.missing_country > 0 {
        warn!(
            "Series {}: {} sites without country",
            series_id, summary.missing_country
        );
    }
    if summary.empty_slugs > 0 {
        warn!(
            "Series {}: {} sites with an empty locality slug",
            series_id, summary.empty_slugs
        );
    }
    if summary.co_located > 0 {
        warn!(
            "Series {}: {} groups of co-located sites",
            series_id, summary.co_located
        );
    }

    summary
}

/// Slugs never start with a hyphen, so an empty one leaves `<series>-` bare or
/// directly followed by a date or counter suffix.
fn has_empty_slug(site: &Site) -> bool {
    match site.id.strip_prefix(site.series_id.as_str()) {
        Some(rest) => rest == "-" || rest.starts_with("--"),
        None => false,
    }
}
