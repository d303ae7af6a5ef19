use crate::geo::GeoLookup;
use crate::series::model::{is_valid_coordinate, EventRecord, Site};
use chrono::offset::LocalResult;
use chrono::{NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use tracing::warn;

const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Attaches timezone and country to a record and renders its timestamp.
///
/// Lookup failures only leave the affected field empty.
pub fn resolve_site<G: GeoLookup + ?Sized>(geo: &G, record: EventRecord) -> Site {
    let id = record.id.clone().unwrap_or_default();

    let (timezone, country_code) = if is_valid_coordinate(record.latitude, record.longitude) {
        (
            resolve_timezone(geo, &id, record.latitude, record.longitude),
            resolve_country(geo, &id, record.latitude, record.longitude),
        )
    } else {
        warn!("Site {} has invalid coordinates, skipping geo lookups", id);
        (None, None)
    };

    Site {
        date: format_local_timestamp(record.date, timezone),
        timezone: timezone.map(|tz| tz.name().to_string()),
        country_code,
        id,
        series_id: record.series_id,
        event_type: record.event_type,
        name: record.name,
        latitude: record.latitude,
        longitude: record.longitude,
        parent: record.parent,
    }
}

fn resolve_timezone<G: GeoLookup + ?Sized>(
    geo: &G,
    id: &str,
    latitude: f64,
    longitude: f64,
) -> Option<Tz> {
    match geo.timezone_of(latitude, longitude) {
        Ok(Some(name)) => match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(err) => {
                warn!("Site {}: unknown timezone '{}' ({})", id, name, err);
                None
            }
        },
        Ok(None) => {
            warn!("Site {}: no timezone at ({}, {})", id, latitude, longitude);
            None
        }
        Err(err) => {
            warn!("Site {}: timezone lookup failed: {}", id, err);
            None
        }
    }
}

fn resolve_country<G: GeoLookup + ?Sized>(
    geo: &G,
    id: &str,
    latitude: f64,
    longitude: f64,
) -> Option<String> {
    match geo.country_of(latitude, longitude) {
        Ok(Some(code)) => Some(code),
        Ok(None) => {
            warn!("Site {}: no country at ({}, {})", id, latitude, longitude);
            None
        }
        Err(err) => {
            warn!("Site {}: country lookup failed: {}", id, err);
            None
        }
    }
}

/// Renders the local wall-clock time, followed by the zone's UTC offset on
/// that date when the zone is known.
///
/// The wall-clock value is never shifted. Repeated local times take the
/// earlier offset; skipped ones take the offset of that instant read as UTC.
pub fn format_local_timestamp(local: NaiveDateTime, timezone: Option<Tz>) -> String {
    let wall_clock = local.format(LOCAL_TIMESTAMP_FORMAT);

    match timezone {
        None => wall_clock.to_string(),
        Some(tz) => {
            let offset = match tz.offset_from_local_datetime(&local) {
                LocalResult::Single(offset) => offset,
                LocalResult::Ambiguous(earliest, _) => earliest,
                LocalResult::None => tz.offset_from_utc_datetime(&local),
            };

            format!("{}{}", wall_clock, offset.fix())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoError;
    use crate::series::model::EventType;
    use chrono::NaiveDate;

    struct FixedGeo {
        timezone: Option<&'static str>,
        country: Option<&'static str>,
        fail_country: bool,
    }

    impl GeoLookup for FixedGeo {
        fn timezone_of(&self, _: f64, _: f64) -> Result<Option<String>, GeoError> {
            Ok(self.timezone.map(str::to_string))
        }

        fn country_of(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeoError> {
            if self.fail_country {
                return Err(GeoError::Lookup {
                    latitude,
                    longitude,
                    reason: "index unavailable".to_string(),
                });
            }

            Ok(self.country.map(str::to_string))
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn record() -> EventRecord {
        let mut record = EventRecord::new(
            48.85,
            2.35,
            EventType::Anomaly,
            "Paris, France".to_string(),
            at(2030, 6, 15, 14, 0),
            "test".to_string(),
        );
        record.id = Some("test-paris".to_string());
        record
    }

    #[test_log::test]
    fn should_format_bare_local_time_without_timezone() {
        assert_eq!(
            format_local_timestamp(at(2030, 1, 1, 14, 0), None),
            "2030-01-01T14:00:00"
        );
    }

    #[test_log::test]
    fn should_use_offset_in_force_on_that_date() {
        let paris = chrono_tz::Europe::Paris;

        assert_eq!(
            format_local_timestamp(at(2030, 1, 1, 14, 0), Some(paris)),
            "2030-01-01T14:00:00+01:00"
        );
        assert_eq!(
            format_local_timestamp(at(2030, 6, 15, 14, 0), Some(paris)),
            "2030-06-15T14:00:00+02:00"
        );
        assert_eq!(
            format_local_timestamp(at(2025, 10, 25, 14, 0), Some(chrono_tz::Pacific::Auckland)),
            "2025-10-25T14:00:00+13:00"
        );
        assert_eq!(
            format_local_timestamp(at(2025, 8, 16, 14, 0), Some(chrono_tz::UTC)),
            "2025-08-16T14:00:00+00:00"
        );
    }

    #[test_log::test]
    fn should_keep_wall_clock_across_dst_transitions() {
        let paris = chrono_tz::Europe::Paris;

        // 2030-03-31 02:30 does not exist in Paris, 2030-10-27 02:30 happens twice
        assert_eq!(
            format_local_timestamp(at(2030, 3, 31, 2, 30), Some(paris)),
            "2030-03-31T02:30:00+02:00"
        );
        assert_eq!(
            format_local_timestamp(at(2030, 10, 27, 2, 30), Some(paris)),
            "2030-10-27T02:30:00+02:00"
        );
    }

    #[test_log::test]
    fn should_attach_timezone_and_country() {
        let geo = FixedGeo {
            timezone: Some("Europe/Paris"),
            country: Some("FR"),
            fail_country: false,
        };

        let site = resolve_site(&geo, record());

        assert_eq!(site.id, "test-paris");
        assert_eq!(site.timezone.as_deref(), Some("Europe/Paris"));
        assert_eq!(site.country_code.as_deref(), Some("FR"));
        assert_eq!(site.date, "2030-06-15T14:00:00+02:00");
    }

    #[test_log::test]
    fn when_country_lookup_fails_should_keep_the_rest() {
        let geo = FixedGeo {
            timezone: Some("Europe/Paris"),
            country: Some("FR"),
            fail_country: true,
        };

        let site = resolve_site(&geo, record());

        assert_eq!(site.country_code, None);
        assert_eq!(site.timezone.as_deref(), Some("Europe/Paris"));
    }

    #[test_log::test]
    fn when_timezone_is_unknown_should_fall_back_to_bare_time() {
        let geo = FixedGeo {
            timezone: Some("Mars/Olympus_Mons"),
            country: None,
            fail_country: false,
        };

        let site = resolve_site(&geo, record());

        assert_eq!(site.timezone, None);
        assert_eq!(site.country_code, None);
        assert_eq!(site.date, "2030-06-15T14:00:00");
    }
}
