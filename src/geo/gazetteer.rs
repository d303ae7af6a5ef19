use super::{GeoError, GeoLookup};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locality {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Nearest-named-locality lookup over a list of known places.
///
/// Points farther than `max_distance_km` from every locality are unresolved.
#[derive(Debug)]
pub struct Gazetteer {
    localities: Vec<Locality>,
    max_distance_km: f64,
}

impl Gazetteer {
    pub fn new(localities: Vec<Locality>, max_distance_km: f64) -> Self {
        Self {
            localities,
            max_distance_km,
        }
    }

    #[instrument]
    pub fn load(path: &Path, max_distance_km: f64) -> Result<Self, GeoError> {
        let content = std::fs::read_to_string(path)?;
        let localities = serde_json::from_str::<Vec<Locality>>(&content)?;

        info!("Loaded {} localities", localities.len());

        Ok(Self::new(localities, max_distance_km))
    }

    pub fn nearest_locality(&self, latitude: f64, longitude: f64) -> Option<&Locality> {
        self.localities
            .iter()
            .map(|locality| {
                (
                    locality,
                    haversine_km(latitude, longitude, locality.latitude, locality.longitude),
                )
            })
            .filter(|(_, distance)| *distance <= self.max_distance_km)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(locality, _)| locality)
    }
}

impl GeoLookup for Gazetteer {
    fn timezone_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError> {
        Ok(self
            .nearest_locality(latitude, longitude)
            .and_then(|locality| locality.timezone.clone()))
    }

    fn country_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError> {
        Ok(self
            .nearest_locality(latitude, longitude)
            .and_then(|locality| locality.country_code.clone()))
    }
}

pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}
