use anomalyatlas::config::env_loader::{load_config, load_series_metadata};
use anomalyatlas::config::model::GeoConfig;
use anomalyatlas::fetch::api::HttpSource;
use anomalyatlas::fetch::cache::{CachedSource, DiskCache};
use anomalyatlas::geo::GeoLookup;
use anomalyatlas::output::write_snapshot;
use anomalyatlas::pipeline::orchestrator::Pipeline;
use anomalyatlas::tracing::setup_loki;
use std::time::Instant;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loki = setup_loki().await;
    let started = Instant::now();

    let config = load_config()?;
    let metadata = load_series_metadata(&config.series_metadata_path)?;
    let geo = build_geo_lookup(&config.geo_config)?;

    let cache = DiskCache::new(&config.fetch_config.cache_dir, config.fetch_config.cache_ttl);
    info!("Caching pages in {}", cache.dir().display());

    let source = CachedSource::new(HttpSource::new(config.fetch_config.max_retries), cache);
    let pipeline = Pipeline::new(source, geo, config.series_concurrency);

    let report = pipeline.run(&metadata.series).await;
    let path = write_snapshot(&config.output_dir, &report.document)?;

    for failure in &report.failures {
        warn!("Series {} produced no sites: {}", failure.series_id, failure.reason);
    }

    info!(
        "Saved {} series, {} sites to {} in {:.2} seconds",
        report.document.len(),
        report.total_sites(),
        path.display(),
        started.elapsed().as_secs_f64()
    );

    if let Some(loki) = loki {
        loki.shutdown().await;
    }

    Ok(())
}

#[cfg(feature = "offline-geo")]
fn build_geo_lookup(config: &GeoConfig) -> anyhow::Result<Box<dyn GeoLookup>> {
    info!("Using embedded timezone and places data");

    Ok(Box::new(anomalyatlas::geo::offline::OfflineGeo::new(
        config.max_distance_km,
    )))
}

#[cfg(not(feature = "offline-geo"))]
fn build_geo_lookup(config: &GeoConfig) -> anyhow::Result<Box<dyn GeoLookup>> {
    match &config.gazetteer_path {
        Some(path) => Ok(Box::new(anomalyatlas::geo::gazetteer::Gazetteer::load(
            path,
            config.max_distance_km,
        )?)),
        None => {
            warn!("GAZETTEER_PATH not set, sites will have no timezone or country");
            Ok(Box::new(anomalyatlas::geo::NoGeo))
        }
    }
}
