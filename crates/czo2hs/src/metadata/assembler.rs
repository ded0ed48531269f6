use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::error::MetadataError;
use crate::metadata::creator::CreatorResolver;
use crate::metadata::{Coverage, MetadataBundle, SpatialCoverage, TemporalCoverage};
use crate::source::SourceRecord;

/// Keyword sources, pipe-delimited in the export.
pub const KEYWORD_COLUMNS: [&str; 4] = ["VARIABLES", "TOPICS", "KEYWORDS", "CZOS"];

/// Columns carried verbatim as resource-level extended metadata.
pub const EXTRA_METADATA_COLUMNS: [&str; 13] = [
    "czo_id",
    "subtitle",
    "CZOS",
    "FIELD_AREAS",
    "location",
    "TOPICS",
    "sub_topic",
    "KEYWORDS",
    "VARIABLES",
    "description",
    "comments",
    "RELATED_DATASETS",
    "date_range_comments",
];

const SPATIAL_BOUND_COLUMNS: [&str; 4] = ["north_lat", "south_lat", "east_long", "west_long"];

/// Builds the metadata bundle from one raw row. Pure with respect to the
/// record: no I/O, deterministic, so repeated calls yield identical bundles.
pub fn assemble(
    record: &SourceRecord,
    creators: &dyn CreatorResolver,
) -> Result<MetadataBundle, MetadataError> {
    record.required("czo_id")?;
    let czos = record.required("CZOS")?;

    let title = format!("{}:{}", czos, record.required("title")?);
    let abstract_text = build_abstract(record)?;
    let keywords = build_keywords(record)?;

    let creator = creators.resolve(
        czos,
        record.required("creator")?,
        record.required("contact")?,
    );

    let coverage = build_coverage(record)?;

    let mut extra_metadata = BTreeMap::new();
    for column in EXTRA_METADATA_COLUMNS {
        if let Some(value) = record.get(column) {
            extra_metadata.insert(column.to_string(), value.to_string());
        }
    }

    Ok(MetadataBundle {
        title,
        abstract_text,
        keywords,
        creator,
        coverage,
        extra_metadata,
    })
}

/// Fixed labeled sections in a fixed order; the date-range section is
/// appended only when present and non-empty.
fn build_abstract(record: &SourceRecord) -> Result<String, MetadataError> {
    let mut text = format!(
        "{czos} \n\n\
         {subtitle} \n\n\
         [Description]\n {description} \n\n\
         [Comments]\n {comments} \n\n\
         [Variables]\n {variables} \n\n",
        czos = record.required("CZOS")?,
        subtitle = record.required("subtitle")?,
        description = record.required("description")?,
        comments = record.required("comments")?,
        variables = record.required("VARIABLES")?,
    );

    if let Some(date_range_comments) = record.non_blank("date_range_comments") {
        let _ = write!(
            text,
            "[Date Range Comments] \n {}\n\n",
            date_range_comments
        );
    }

    Ok(text)
}

fn build_keywords(record: &SourceRecord) -> Result<BTreeSet<String>, MetadataError> {
    let mut keywords = BTreeSet::new();
    for column in KEYWORD_COLUMNS {
        for keyword in record.required(column)?.split('|') {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() {
                keywords.insert(keyword);
            }
        }
    }
    Ok(keywords)
}

/// Spatial box plus temporal period, built together: the remote API erases
/// one when the other is submitted alone, so they are either both present or
/// both omitted. A row with all coverage columns blank omits coverage; a
/// non-blank non-numeric bound is a format error.
fn build_coverage(record: &SourceRecord) -> Result<Option<Coverage>, MetadataError> {
    for column in SPATIAL_BOUND_COLUMNS {
        record.required(column)?;
    }
    let date_start = record.required("date_start")?;
    let date_end = record.required("date_end")?;

    let all_blank = SPATIAL_BOUND_COLUMNS
        .iter()
        .all(|c| record.non_blank(c).is_none())
        && record.non_blank("date_start").is_none()
        && record.non_blank("date_end").is_none();
    if all_blank {
        return Ok(None);
    }

    let spatial = SpatialCoverage {
        north: record.required_f64("north_lat")?,
        south: record.required_f64("south_lat")?,
        east: record.required_f64("east_long")?,
        west: record.required_f64("west_long")?,
        name: format!(
            "{}-{}",
            record.required("FIELD_AREAS")?,
            record.required("location")?
        ),
    };
    let temporal = TemporalCoverage {
        start: date_start.trim().to_string(),
        end: date_end.trim().to_string(),
    };

    Ok(Some(Coverage { spatial, temporal }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::GroupDirectory;

    const BASE_FIELDS: [(&str, &str); 22] = [
        ("czo_id", "3884"),
        ("CZOS", "Boulder"),
        ("title", "Snow depth survey"),
        ("subtitle", "Annual manual survey"),
        ("description", "Depth measured along transects."),
        ("comments", "QC complete."),
        ("VARIABLES", "Snow Depth|Air Temperature"),
        ("TOPICS", "Snow"),
        ("KEYWORDS", "snow|survey"),
        ("contact", "jane@example.org"),
        ("creator", "Jane Doe"),
        ("date_start", "2015-01-01"),
        ("date_end", "2016-12-31"),
        ("north_lat", "40.1"),
        ("south_lat", "39.9"),
        ("east_long", "-105.2"),
        ("west_long", "-105.6"),
        ("FIELD_AREAS", "Gordon Gulch"),
        ("location", "Upper basin"),
        ("sub_topic", "depth"),
        ("RELATED_DATASETS", ""),
        ("date_range_comments", ""),
    ];

    /// Full record with the given columns overridden. An override to
    /// `"<absent>"` removes the column entirely.
    fn record_with(overrides: &[(&str, &str)]) -> SourceRecord {
        let mut fields: BTreeMap<String, String> = BASE_FIELDS
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in overrides {
            if *v == "<absent>" {
                fields.remove(*k);
            } else {
                fields.insert(k.to_string(), v.to_string());
            }
        }
        SourceRecord::new(fields)
    }

    fn resolver() -> GroupDirectory {
        GroupDirectory::new(&[crate::config::GroupMapping {
            czo: "boulder".to_string(),
            group: "CZO Boulder".to_string(),
        }])
    }

    #[test]
    fn test_title_is_group_prefixed() {
        let bundle = assemble(&record_with(&[]), &resolver()).unwrap();
        assert_eq!(bundle.title, "Boulder:Snow depth survey");
    }

    #[test]
    fn test_missing_required_field_fails() {
        let record = record_with(&[("description", "<absent>")]);
        let err = assemble(&record, &resolver()).unwrap_err();
        assert!(matches!(err, MetadataError::FieldMissing(f) if f == "description"));
    }

    #[test]
    fn test_keywords_case_folded_deduplicated_no_empty() {
        let record = record_with(&[
            ("VARIABLES", "A|b|A|"),
            ("TOPICS", "C"),
            ("KEYWORDS", ""),
            ("CZOS", ""),
        ]);

        let bundle = assemble(&record, &resolver()).unwrap();
        let expected: BTreeSet<String> =
            ["a", "b", "c"].into_iter().map(String::from).collect();
        assert_eq!(bundle.keywords, expected);
        assert!(!bundle.keywords.contains(""));
    }

    #[test]
    fn test_abstract_sections_in_order() {
        let bundle = assemble(&record_with(&[]), &resolver()).unwrap();
        let desc = bundle.abstract_text.find("[Description]").unwrap();
        let comments = bundle.abstract_text.find("[Comments]").unwrap();
        let variables = bundle.abstract_text.find("[Variables]").unwrap();
        assert!(desc < comments && comments < variables);
        assert!(!bundle.abstract_text.contains("[Date Range Comments]"));
    }

    #[test]
    fn test_abstract_appends_date_range_comments_when_present() {
        let record = record_with(&[("date_range_comments", "Gaps during 2015 winter")]);
        let bundle = assemble(&record, &resolver()).unwrap();
        assert!(bundle
            .abstract_text
            .contains("[Date Range Comments] \n Gaps during 2015 winter"));
    }

    #[test]
    fn test_coverage_combined_and_named() {
        let bundle = assemble(&record_with(&[]), &resolver()).unwrap();
        let coverage = bundle.coverage.unwrap();
        assert_eq!(coverage.spatial.north, 40.1);
        assert_eq!(coverage.spatial.west, -105.6);
        assert_eq!(coverage.spatial.name, "Gordon Gulch-Upper basin");
        assert_eq!(coverage.temporal.start, "2015-01-01");
        assert_eq!(coverage.temporal.end, "2016-12-31");
    }

    #[test]
    fn test_coverage_omitted_when_all_blank() {
        let record = record_with(&[
            ("north_lat", ""),
            ("south_lat", ""),
            ("east_long", ""),
            ("west_long", ""),
            ("date_start", ""),
            ("date_end", ""),
        ]);
        let bundle = assemble(&record, &resolver()).unwrap();
        assert!(bundle.coverage.is_none());
    }

    #[test]
    fn test_non_numeric_bound_is_format_error() {
        let record = record_with(&[("north_lat", "forty")]);
        let err = assemble(&record, &resolver()).unwrap_err();
        assert!(matches!(err, MetadataError::FieldFormat { field, .. } if field == "north_lat"));
    }

    #[test]
    fn test_creator_resolved_through_directory() {
        let bundle = assemble(&record_with(&[]), &resolver()).unwrap();
        assert_eq!(bundle.creator.name, "Jane Doe");
        assert_eq!(bundle.creator.organization, "CZO Boulder");
        assert_eq!(bundle.creator.email, "jane@example.org");
    }

    #[test]
    fn test_extra_metadata_allow_list_only() {
        let bundle = assemble(&record_with(&[]), &resolver()).unwrap();
        assert_eq!(bundle.extra_metadata.get("czo_id").unwrap(), "3884");
        assert_eq!(bundle.extra_metadata.get("sub_topic").unwrap(), "depth");
        // Coordinates are coverage, not extended metadata.
        assert!(!bundle.extra_metadata.contains_key("north_lat"));
        assert!(!bundle.extra_metadata.contains_key("contact"));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let record = record_with(&[]);
        let resolver = resolver();
        let first = assemble(&record, &resolver).unwrap();
        let second = assemble(&record, &resolver).unwrap();
        assert_eq!(first, second);
    }
}
