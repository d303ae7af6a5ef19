use super::gazetteer::haversine_km;
use super::{GeoError, GeoLookup};
use reverse_geocoder::ReverseGeocoder;
use tzf_rs::DefaultFinder;

/// Embedded timezone polygons and populated-places data; no network access.
///
/// A point only gets a country when its nearest populated place lies within
/// `max_distance_km`, so open sea stays unresolved.
pub struct OfflineGeo {
    timezones: DefaultFinder,
    places: ReverseGeocoder,
    max_distance_km: f64,
}

impl OfflineGeo {
    pub fn new(max_distance_km: f64) -> Self {
        Self {
            timezones: DefaultFinder::new(),
            places: ReverseGeocoder::new(),
            max_distance_km,
        }
    }
}

impl GeoLookup for OfflineGeo {
    fn timezone_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError> {
        let name = self.timezones.get_tz_name(longitude, latitude);

        Ok((!name.is_empty()).then(|| name.to_string()))
    }

    fn country_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError> {
        let nearest = self.places.search((latitude, longitude)).record;

        if haversine_km(latitude, longitude, nearest.lat, nearest.lon) > self.max_distance_km {
            return Ok(None);
        }

        let code = nearest.cc.trim();

        Ok((!code.is_empty()).then(|| code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn should_resolve_a_city_centre() {
        let geo = OfflineGeo::new(250.0);

        assert_eq!(
            geo.timezone_of(48.85, 2.35).unwrap().as_deref(),
            Some("Europe/Paris")
        );
        assert_eq!(geo.country_of(48.85, 2.35).unwrap().as_deref(), Some("FR"));
    }

    #[test_log::test]
    fn should_resolve_southern_hemisphere_points() {
        let geo = OfflineGeo::new(250.0);

        assert_eq!(
            geo.timezone_of(-41.28, 174.77).unwrap().as_deref(),
            Some("Pacific/Auckland")
        );
        assert_eq!(geo.country_of(-41.28, 174.77).unwrap().as_deref(), Some("NZ"));
    }

    #[test_log::test]
    fn when_point_is_mid_ocean_should_have_no_country() {
        let geo = OfflineGeo::new(250.0);

        assert_eq!(geo.country_of(-30.0, -130.0).unwrap(), None);
    }
}
