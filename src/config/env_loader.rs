use crate::config::model::{Config, FetchConfig, GeoConfig};
use crate::series::dto::SeriesMetadata;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

const DEFAULT_SERIES_METADATA_PATH: &str = "conf/series_metadata.json";
const DEFAULT_OUTPUT_DIR: &str = "gen";
const DEFAULT_CACHE_DIR: &str = ".cache/pages";
const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;
const DEFAULT_MAX_DISTANCE_KM: f64 = 250.0;
const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config '{name}': expected {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("couldn't read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("couldn't parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn load_config() -> Result<Config, ConfigError> {
    let series_concurrency: usize = load_parsed_config(
        "SERIES_CONCURRENCY",
        1,
        "a positive integer",
    )?;
    if series_concurrency == 0 {
        return Err(ConfigError::Invalid {
            name: "SERIES_CONCURRENCY",
            expected: "a positive integer",
            value: "0".to_string(),
        });
    }

    let max_distance_km: f64 = load_parsed_config(
        "GAZETTEER_MAX_DISTANCE_KM",
        DEFAULT_MAX_DISTANCE_KM,
        "a distance in kilometers",
    )?;
    let cache_ttl_secs: u64 = load_parsed_config(
        "CACHE_TTL_SECS",
        DEFAULT_CACHE_TTL_SECS,
        "a number of seconds",
    )?;

    Ok(Config {
        series_metadata_path: load_path_config(
            "SERIES_METADATA_PATH",
            DEFAULT_SERIES_METADATA_PATH,
        ),
        output_dir: load_path_config("OUTPUT_DIR", DEFAULT_OUTPUT_DIR),
        geo_config: GeoConfig {
            gazetteer_path: env::var("GAZETTEER_PATH").ok().map(PathBuf::from),
            max_distance_km,
        },
        fetch_config: FetchConfig {
            cache_dir: load_path_config("CACHE_DIR", DEFAULT_CACHE_DIR),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            max_retries: load_parsed_config(
                "HTTP_MAX_RETRIES",
                DEFAULT_MAX_RETRIES,
                "an integer number",
            )?,
        },
        series_concurrency,
    })
}

#[instrument]
pub fn load_series_metadata(path: &Path) -> Result<SeriesMetadata, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let metadata = parse_series_metadata(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Loaded {} series definitions", metadata.series.len());

    Ok(metadata)
}

pub fn parse_series_metadata(content: &str) -> Result<SeriesMetadata, serde_json::Error> {
    serde_json::from_str(content)
}

fn load_path_config(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn load_parsed_config<T: FromStr>(
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_config_value(name, &value, expected),
        Err(_) => Ok(default),
    }
}

fn parse_config_value<T: FromStr>(
    name: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}
