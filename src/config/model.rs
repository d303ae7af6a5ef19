use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub series_metadata_path: PathBuf,
    pub output_dir: PathBuf,
    pub geo_config: GeoConfig,
    pub fetch_config: FetchConfig,
    pub series_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct GeoConfig {
    pub gazetteer_path: Option<PathBuf>,
    pub max_distance_km: f64,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub max_retries: u32,
}
