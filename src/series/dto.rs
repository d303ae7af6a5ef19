use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer};
use serde_either::SingleOrVec;
use serde_json::Value;

/// Format used by announcement pages, e.g. "16 Aug 2025".
pub const ANNOUNCEMENT_DATE_FORMAT: &str = "%d %b %Y";
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
pub struct SeriesMetadata {
    pub series: Vec<SeriesDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEntry {
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    pub sites: SingleOrVec<SiteConfig>,
}

impl ScheduleEntry {
    pub fn sites(&self) -> Vec<&SiteConfig> {
        match &self.sites {
            SingleOrVec::Single(site) => vec![site],
            SingleOrVec::Vec(sites) => sites.iter().collect(),
        }
    }
}

// Note: a site with fragments is a composite and its own coordinates are unused.
// Coordinates carry no serde default so an empty array is never read as a single site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(alias = "lng")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fragments: Vec<SiteConfig>,
}

/// Accepts both ISO dates and the announcement format.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, ANNOUNCEMENT_DATE_FORMAT))
        .ok()
}

fn deserialize_date<'de, D>(d: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::String(s) => parse_date(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid schedule date '{}'", s))),
        unknown => Err(de::Error::custom(format!(
            "expected a date string, found {}",
            unknown
        ))),
    }
}
