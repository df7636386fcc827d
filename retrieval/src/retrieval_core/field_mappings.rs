use crate::services::vector_store::{FieldClause, FilterSpec};
use policyhub_models::Vertical;
use std::collections::BTreeMap;

/// Physical payload fields to OR-match for a logical filter field in one
/// vertical. An empty list means the filter is inapplicable there: it
/// neither restricts nor excludes results.
///
/// This table must match the ingestion metadata schema.
pub fn mapped_fields(logical: &str, vertical: Vertical) -> Vec<&'static str> {
    match (logical, vertical) {
        ("sections", Vertical::Legal) => vec!["section", "sections", "mentioned_sections"],
        ("sections", Vertical::Go) => vec!["mentioned_sections"],
        ("sections", Vertical::Judicial) => vec!["mentioned_sections"],
        ("sections", _) => vec![],

        ("go_number", Vertical::Go) => vec!["go_number"],
        ("go_number", Vertical::Legal) => vec!["mentioned_gos"],
        ("go_number", Vertical::Judicial) => vec!["mentioned_gos"],
        ("go_number", _) => vec![],

        ("year", Vertical::Internet) => vec![],
        ("year", _) => vec!["year"],

        ("department", Vertical::Go) => vec!["department", "departments"],
        ("department", Vertical::Data) => vec!["departments"],
        ("department", Vertical::Schemes) => vec!["departments"],
        ("department", _) => vec![],

        ("case_number", Vertical::Judicial) => vec!["case_number"],
        ("case_number", _) => vec![],

        ("scheme_name", Vertical::Schemes) => vec!["scheme_name"],
        ("scheme_name", Vertical::Go) => vec!["schemes", "mentioned_schemes"],
        ("scheme_name", _) => vec![],

        // Unrecognized logical fields apply nowhere.
        _ => vec![],
    }
}

pub fn filter_applies(logical: &str, vertical: Vertical) -> bool {
    !mapped_fields(logical, vertical).is_empty()
}

/// Translate the plan's logical filters into a store filter for one
/// vertical. Inapplicable logical fields are silently skipped; if nothing
/// applies, no filter is sent at all.
pub fn build_filter_spec(
    logical_filters: &BTreeMap<String, Vec<String>>,
    vertical: Vertical,
) -> Option<FilterSpec> {
    let clauses: Vec<FieldClause> = logical_filters
        .iter()
        .filter_map(|(logical, values)| {
            let fields = mapped_fields(logical, vertical);
            if fields.is_empty() || values.is_empty() {
                return None;
            }
            Some(FieldClause {
                fields: fields.into_iter().map(String::from).collect(),
                values: values.clone(),
            })
        })
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(FilterSpec { clauses })
    }
}
