use crate::series::model::EventRecord;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

const DATE_SUFFIX_FORMAT: &str = "%Y%m%d";

lazy_static! {
    static ref DISALLOWED_CHARS: Regex =
        Regex::new(r"[^a-z0-9_\s-]").expect("Failed to create slug filter regex");
    static ref SEPARATOR_RUNS: Regex =
        Regex::new(r"[\s_-]+").expect("Failed to create slug separator regex");
}

/// Lowercase ASCII slug with single hyphens between words.
pub fn slugify(text: &str) -> String {
    let ascii = voca_rs::manipulate::latinise(text).to_lowercase();
    let filtered = DISALLOWED_CHARS.replace_all(&ascii, "");

    SEPARATOR_RUNS
        .replace_all(&filtered, "-")
        .trim_matches('-')
        .to_string()
}

/// Series id plus the slug of the first comma-separated part of the name.
pub fn base_id(series_id: &str, name: &str) -> String {
    let primary_locality = name.split(',').next().unwrap_or_default();

    format!("{}-{}", series_id, slugify(primary_locality))
}

/// Gives every record an id unique within the slice.
///
/// Records sharing a base id are told apart by their date; records that still
/// clash after that get a running counter in record order.
pub fn assign_ids(records: &mut [EventRecord]) {
    let base_ids = records
        .iter()
        .map(|record| base_id(&record.series_id, &record.name))
        .collect::<Vec<_>>();
    let occurrences = base_ids.iter().counts();

    // Unique base ids keep their bare form, so suffixed ids must route around them.
    let mut taken = occurrences
        .iter()
        .filter(|(_, count)| **count == 1)
        .map(|(base, _)| (*base).clone())
        .collect::<HashSet<String>>();

    for (record, base) in records.iter_mut().zip(base_ids.iter()) {
        if base.ends_with('-') {
            warn!(
                "Record '{}' in series {} has an empty locality slug",
                record.name, record.series_id
            );
        }

        if occurrences[base] == 1 {
            record.id = Some(base.clone());
            continue;
        }

        let candidate = format!("{}-{}", base, record.date.format(DATE_SUFFIX_FORMAT));
        let id = next_free_id(&candidate, &taken);

        if id != candidate {
            warn!(
                "Id {} already taken in series {}, using {}",
                candidate, record.series_id, id
            );
        }

        taken.insert(id.clone());
        record.id = Some(id);
    }
}

fn next_free_id(candidate: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(candidate) {
        return candidate.to_string();
    }

    (2..)
        .map(|counter| format!("{}-{}", candidate, counter))
        .find(|id| !taken.contains(id))
        .unwrap_or_else(|| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::model::EventType;
    use chrono::NaiveDate;

    fn record(name: &str, y: i32, m: u32, d: u32) -> EventRecord {
        EventRecord::new(
            48.85,
            2.35,
            EventType::Anomaly,
            name.to_string(),
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
            "test".to_string(),
        )
    }

    fn ids(records: &[EventRecord]) -> Vec<&str> {
        records.iter().filter_map(|r| r.id.as_deref()).collect()
    }

    #[test_log::test]
    fn should_slugify_locality_names() {
        assert_eq!(slugify("Example City"), "example-city");
        assert_eq!(slugify("  São Paulo "), "sao-paulo");
        assert_eq!(slugify("Houston TX"), "houston-tx");
        assert_eq!(slugify("St. John's -- Old_Town"), "st-johns-old-town");
        assert_eq!(slugify("Zürich"), "zurich");
    }

    #[test_log::test]
    fn should_use_only_text_before_first_comma() {
        assert_eq!(base_id("test", "Portland, OR, USA"), "test-portland");
        assert_eq!(
            base_id("2025-plusbeta", "The Hague, Netherlands"),
            "2025-plusbeta-the-hague"
        );
    }

    #[test_log::test]
    fn should_keep_unique_ids_unsuffixed() {
        let mut records = vec![record("Example City", 2030, 1, 1), record("Paris, France", 2030, 1, 1)];

        assign_ids(&mut records);

        assert_eq!(ids(&records), vec!["test-example-city", "test-paris"]);
    }

    #[test_log::test]
    fn should_suffix_colliding_ids_with_date() {
        let mut records = vec![
            record("Paris", 2030, 1, 1),
            record("Lyon", 2030, 1, 1),
            record("Paris, France", 2030, 6, 15),
        ];

        assign_ids(&mut records);

        assert_eq!(
            ids(&records),
            vec!["test-paris-20300101", "test-lyon", "test-paris-20300615"]
        );
    }

    #[test_log::test]
    fn when_locality_and_date_match_should_add_counter() {
        let mut records = vec![
            record("Paris", 2030, 1, 1),
            record("Paris", 2030, 1, 1),
            record("Paris", 2030, 1, 1),
        ];

        assign_ids(&mut records);

        assert_eq!(
            ids(&records),
            vec![
                "test-paris-20300101",
                "test-paris-20300101-2",
                "test-paris-20300101-3"
            ]
        );
    }

    #[test_log::test]
    fn when_dated_id_matches_a_unique_base_should_keep_the_base_bare() {
        let mut records = vec![
            record("Paris", 2030, 1, 1),
            record("Paris", 2030, 1, 15),
            record("Paris 20300101", 2030, 1, 3),
        ];

        assign_ids(&mut records);

        assert_eq!(
            ids(&records),
            vec![
                "test-paris-20300101-2",
                "test-paris-20300115",
                "test-paris-20300101"
            ]
        );
    }

    #[test_log::test]
    fn when_name_is_empty_should_produce_bare_series_prefix() {
        let mut records = vec![record("", 2030, 1, 1)];

        assign_ids(&mut records);

        assert_eq!(ids(&records), vec!["test-"]);
    }

    #[test_log::test]
    fn should_be_stable_across_runs() {
        let mut first = vec![record("Paris", 2030, 1, 1), record("Paris", 2030, 6, 15)];
        let mut second = first.clone();

        assign_ids(&mut first);
        assign_ids(&mut second);

        assert_eq!(first, second);
    }
}
