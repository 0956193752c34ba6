//! Substitution builders
//!
//! Each builder turns part of the metadata into the text that fills one
//! staging template slot. Entries are joined with a newline and two spaces so
//! they line up under the YAML key the slot sits beneath.

use autovault_core::{Metadata, MetadataError, NameDictionary, Satellite};
use crate::error::StagingError;
use crate::template::{slot, Substitutions, Template};

/// Separator between entries of one slot
pub const ENTRY_SEPARATOR: &str = "\n  ";

const HASHDIFF_COLUMN_SEPARATOR: &str = "\n      ";
const LINK_KEY_SEPARATOR: &str = "\n   ";

/// Satellites whose column list contains this are left out of the hash diffs
const NULL_MARKER: &str = "null";

/// Fixed derived columns added to every staging model
pub const DERIVED_COLUMNS: [&str; 3] = [
    r#"EFFECTIVE_FROM: "LOAD_DATETIME""#,
    r#"START_DATE: "LOAD_DATETIME""#,
    r#"END_DATE: "TO_DATE('9999-12-31')""#,
];

/// Join entries with [`ENTRY_SEPARATOR`]
pub fn join_entries<I, S>(entries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| entry.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

/// `<database>_<schema>: "<versioned source name>"`
pub fn source_substitution(metadata: &Metadata) -> Result<String, MetadataError> {
    Ok(format!(
        "{}: \"{}\"",
        metadata.get_source_model_name()?,
        metadata.get_versioned_source_name()?
    ))
}

pub fn derived_columns_substitution() -> String {
    join_entries(DERIVED_COLUMNS)
}

/// `<HUB>_HK: "<business key>"`, with the hub's alias replacing the key when set
pub fn hashkey_substitution(metadata: &Metadata, hub: &str) -> Result<String, MetadataError> {
    let mut primary_key = metadata.get_hub_business_key(hub)?;

    if let Some(alias) = metadata.get_topic(hub)?.alias.as_deref() {
        if !alias.is_empty() {
            primary_key = alias;
        }
    }

    Ok(format!("{}_HK: \"{}\"", hub, primary_key))
}

/// Hash key entries for every hub
pub fn hub_substitutions(metadata: &Metadata, hubs: &[&str]) -> Result<String, MetadataError> {
    let entries = hubs
        .iter()
        .map(|hub| hashkey_substitution(metadata, hub))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(hubs = hubs.len(), "built hub hash keys");

    Ok(join_entries(entries))
}

/// Hash diff entry for one satellite, `None` when it carries the null marker
pub fn sat_hashdiff_substitution(
    template: &Template,
    satellite: &Satellite,
) -> Result<Option<String>, StagingError> {
    let mut columns: Vec<&str> = satellite.payload.keys().map(String::as_str).collect();
    columns.sort_unstable();

    let column_list = columns
        .iter()
        .map(|column| format!("- \"{}\"", column))
        .collect::<Vec<_>>()
        .join(HASHDIFF_COLUMN_SEPARATOR);

    if column_list.contains(NULL_MARKER) {
        tracing::debug!(satellite = %satellite.business_definition, "skipping null satellite");
        return Ok(None);
    }

    let mut substitutions = Substitutions::new();
    substitutions.insert(
        slot::HASHDIFF_NAME.to_string(),
        format!("{}_HASHDIFF", satellite.business_definition),
    );
    substitutions.insert(slot::COLUMNS.to_string(), column_list);

    Ok(Some(template.render(&substitutions)?))
}

/// Hash diff entries for the satellites of one hub
///
/// If the hub's first satellite is skipped the whole block is empty, even when
/// later satellites would produce entries.
pub fn hub_sat_substitutions(
    metadata: &Metadata,
    template: &Template,
    hub: &str,
) -> Result<String, StagingError> {
    let satellites = &metadata.get_topic(hub)?.business_attributes;

    let entries = satellites
        .iter()
        .map(|satellite| sat_hashdiff_substitution(template, satellite))
        .collect::<Result<Vec<_>, _>>()?;

    if !matches!(entries.first(), Some(Some(_))) {
        return Ok(String::new());
    }

    Ok(join_entries(entries.into_iter().flatten()))
}

/// Hash diff entries for every hub
pub fn sat_substitutions(metadata: &Metadata, template: &Template) -> Result<String, StagingError> {
    let blocks = metadata
        .get_hubs_from_business_topics()?
        .into_iter()
        .map(|hub| hub_sat_substitutions(metadata, template, hub))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(join_entries(blocks))
}

/// Hash key of the link joining every hub of the source
///
/// Only sources with more than one hub get a link; the dictionary is loaded
/// on demand so single-hub sources never need one.
pub fn link_substitutions<F>(
    metadata: &Metadata,
    hubs: &[&str],
    load_dictionary: F,
) -> Result<String, StagingError>
where
    F: FnOnce() -> Result<NameDictionary, StagingError>,
{
    if hubs.len() <= 1 {
        return Ok(String::new());
    }

    let dictionary = load_dictionary()?;
    let abbreviations = hubs
        .iter()
        .map(|hub| dictionary.abbreviation(hub))
        .collect::<Result<Vec<_>, _>>()?;

    let link_name = format!("{}_{}", abbreviations.join("_"), metadata.get_unit_of_work()?);

    let keys = hubs
        .iter()
        .map(|hub| metadata.get_hub_business_key(hub).map(|key| format!("- \"{}\"", key)))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(link = %link_name, "built link hash key");

    Ok(format!(
        "{}_HK:{}{}",
        link_name,
        LINK_KEY_SEPARATOR,
        keys.join(LINK_KEY_SEPARATOR)
    ))
}

/// `<alias>: "<business keys>"` for every topic that declares an alias
pub fn alias_substitutions(metadata: &Metadata) -> Result<String, MetadataError> {
    let entries = metadata
        .get_business_topics()?
        .values()
        .filter_map(|topic| {
            let alias = topic.alias.as_ref()?;
            let keys: String = topic.business_keys.keys().map(String::as_str).collect();
            Some(format!("{}: \"{}\"", alias, keys))
        });

    Ok(join_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateKind;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = include_str!("../../../fixtures/source_metadata/test_v1.json");

    fn sample() -> Metadata {
        Metadata::from_json_str(SAMPLE).unwrap()
    }

    fn hashdiff_template() -> Template {
        Template::parse(TemplateKind::SatHashdiff, "${hashdiff_name}:\n    ${columns}").unwrap()
    }

    fn dictionary(json: &str) -> impl FnOnce() -> Result<NameDictionary, StagingError> + '_ {
        move || NameDictionary::from_json_str("./name_dictionary.json", json).map_err(StagingError::from)
    }

    fn no_dictionary() -> Result<NameDictionary, StagingError> {
        panic!("dictionary must not be loaded for a single hub")
    }

    #[test]
    fn source_and_derived_columns() {
        assert_eq!(source_substitution(&sample()).unwrap(), "AUTOVAULT_PUBLIC: \"TEST_V1\"");
        assert_eq!(
            derived_columns_substitution(),
            "EFFECTIVE_FROM: \"LOAD_DATETIME\"\n  START_DATE: \"LOAD_DATETIME\"\n  END_DATE: \"TO_DATE('9999-12-31')\""
        );
    }

    #[test]
    fn hub_hash_keys() {
        let metadata = sample();
        let hubs = metadata.get_hubs_from_business_topics().unwrap();

        assert_eq!(
            hub_substitutions(&metadata, &hubs).unwrap(),
            "HUB1_HK: \"pk1\"\n  HUB2_HK: \"pk2\""
        );
    }

    #[test]
    fn alias_replaces_key_for_its_own_hub_only() {
        let metadata = Metadata::from_json_str(
            r#"{"business_topics": {
                "HUB1": {"business_keys": {"pk1": "STRING"}},
                "HUB2": {"business_keys": {"pk2": "STRING"}, "alias": "HUB2_KEY"}
            }}"#,
        )
        .unwrap();

        assert_eq!(hashkey_substitution(&metadata, "HUB1").unwrap(), "HUB1_HK: \"pk1\"");
        assert_eq!(hashkey_substitution(&metadata, "HUB2").unwrap(), "HUB2_HK: \"HUB2_KEY\"");
    }

    #[test]
    fn unknown_hub_hash_key() {
        let err = hashkey_substitution(&sample(), "HUB3").unwrap_err();
        assert!(matches!(err, MetadataError::UnknownHub { .. }));
    }

    #[test]
    fn hashdiff_columns_are_sorted() {
        let satellite: Satellite = serde_json::from_str(
            r#"{"business_definition": "SAT9", "payload": {"b": "STRING", "a": "STRING"}}"#,
        )
        .unwrap();

        let entry = sat_hashdiff_substitution(&hashdiff_template(), &satellite)
            .unwrap()
            .unwrap();
        assert_eq!(entry, "SAT9_HASHDIFF:\n    - \"a\"\n      - \"b\"");
    }

    #[test]
    fn hashdiff_for_sample() {
        let metadata = sample();
        assert_eq!(
            sat_substitutions(&metadata, &hashdiff_template()).unwrap(),
            "SAT1_HASHDIFF:\n    - \"sat1_col1\"\n      - \"sat1_col2\"\n  \
             SAT2_HASHDIFF:\n    - \"sat2_col1\"\n  \
             SAT3_HASHDIFF:\n    - \"sat3_col1\""
        );
    }

    #[test]
    fn null_first_satellite_empties_the_hub_block() {
        let metadata = Metadata::from_json_str(
            r#"{"business_topics": {"HUB1": {"business_keys": {"pk1": "STRING"}, "business_attributes": [
                {"business_definition": "EMPTY", "payload": {"null": "null"}},
                {"business_definition": "SAT2", "payload": {"col": "STRING"}}
            ]}}}"#,
        )
        .unwrap();

        assert_eq!(hub_sat_substitutions(&metadata, &hashdiff_template(), "HUB1").unwrap(), "");
    }

    #[test]
    fn null_data_type_in_first_satellite_empties_the_hub_block() {
        let metadata = Metadata::from_json_str(
            r#"{"business_topics": {"HUB1": {"business_keys": {"pk1": "STRING"}, "business_attributes": [
                {"business_definition": "EMPTY", "payload": {"null": null}},
                {"business_definition": "SAT2", "payload": {"col": "STRING"}}
            ]}}}"#,
        )
        .unwrap();

        assert_eq!(hub_sat_substitutions(&metadata, &hashdiff_template(), "HUB1").unwrap(), "");
    }

    #[test]
    fn null_later_satellite_is_dropped() {
        let metadata = Metadata::from_json_str(
            r#"{"business_topics": {"HUB1": {"business_keys": {"pk1": "STRING"}, "business_attributes": [
                {"business_definition": "SAT1", "payload": {"col": "STRING"}},
                {"business_definition": "SAT2", "payload": {"nullable_flag": "BOOLEAN"}},
                {"business_definition": "SAT3", "payload": {"other": "STRING"}}
            ]}}}"#,
        )
        .unwrap();

        assert_eq!(
            hub_sat_substitutions(&metadata, &hashdiff_template(), "HUB1").unwrap(),
            "SAT1_HASHDIFF:\n    - \"col\"\n  SAT3_HASHDIFF:\n    - \"other\""
        );
    }

    #[test]
    fn null_marker_is_case_sensitive() {
        let satellite: Satellite = serde_json::from_str(
            r#"{"business_definition": "SAT1", "payload": {"NULL_REASON": "STRING"}}"#,
        )
        .unwrap();

        assert!(sat_hashdiff_substitution(&hashdiff_template(), &satellite)
            .unwrap()
            .is_some());
    }

    #[test]
    fn hub_without_satellites() {
        let metadata =
            Metadata::from_json_str(r#"{"business_topics": {"HUB1": {"business_keys": {"pk1": "STRING"}}}}"#)
                .unwrap();
        assert_eq!(sat_substitutions(&metadata, &hashdiff_template()).unwrap(), "");
    }

    #[test]
    fn link_for_two_hubs() {
        let metadata = sample();
        let hubs = metadata.get_hubs_from_business_topics().unwrap();

        let link = link_substitutions(&metadata, &hubs, dictionary(r#"{"HUB1": "h1", "HUB2": "h2"}"#))
            .unwrap();
        assert_eq!(link, "h1_h2_UOW_HK:\n   - \"pk1\"\n   - \"pk2\"");
    }

    #[test]
    fn single_hub_has_no_link() {
        let metadata = Metadata::from_json_str(
            r#"{"unit_of_work": "UOW", "business_topics": {"HUB1": {"business_keys": {"pk1": "STRING"}}}}"#,
        )
        .unwrap();
        let hubs = metadata.get_hubs_from_business_topics().unwrap();

        assert_eq!(link_substitutions(&metadata, &hubs, no_dictionary).unwrap(), "");
    }

    #[test]
    fn link_requires_every_hub_in_dictionary() {
        let metadata = sample();
        let hubs = metadata.get_hubs_from_business_topics().unwrap();

        let err = link_substitutions(&metadata, &hubs, dictionary(r#"{"HUB1": "h1"}"#)).unwrap_err();
        match err {
            StagingError::Metadata(MetadataError::MissingDictionaryEntry { hub, dictionary }) => {
                assert_eq!(hub, "HUB2");
                assert_eq!(dictionary, "./name_dictionary.json");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn alias_columns() {
        let metadata = Metadata::from_json_str(
            r#"{"business_topics": {
                "HUB1": {"business_keys": {"pk1": "STRING"}},
                "HUB2": {"business_keys": {"order_id": "STRING", "line_no": "NUMBER"}, "alias": "ORDER_KEY"},
                "HUB3": {"business_keys": {"pk3": "STRING"}, "alias": "HUB3_KEY"}
            }}"#,
        )
        .unwrap();

        assert_eq!(
            alias_substitutions(&metadata).unwrap(),
            "ORDER_KEY: \"order_idline_no\"\n  HUB3_KEY: \"pk3\""
        );
        assert_eq!(alias_substitutions(&sample()).unwrap(), "");
    }
}
