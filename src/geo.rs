pub mod gazetteer;
#[cfg(feature = "offline-geo")]
pub mod offline;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("lookup failed for ({latitude}, {longitude}): {reason}")]
    Lookup {
        latitude: f64,
        longitude: f64,
        reason: String,
    },
    #[error("failed reading gazetteer: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid gazetteer: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Offline lookups answering "which zone / which country is this point in".
///
/// `Ok(None)` means the point is not covered (open sea, unmapped area).
pub trait GeoLookup: Send + Sync {
    fn timezone_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError>;

    fn country_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError>;
}

impl<T: GeoLookup + ?Sized> GeoLookup for Box<T> {
    fn timezone_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError> {
        (**self).timezone_of(latitude, longitude)
    }

    fn country_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError> {
        (**self).country_of(latitude, longitude)
    }
}

/// Resolves nothing; every site keeps a bare local timestamp.
pub struct NoGeo;

impl GeoLookup for NoGeo {
    fn timezone_of(&self, _latitude: f64, _longitude: f64) -> Result<Option<String>, GeoError> {
        Ok(None)
    }

    fn country_of(&self, _latitude: f64, _longitude: f64) -> Result<Option<String>, GeoError> {
        Ok(None)
    }
}
