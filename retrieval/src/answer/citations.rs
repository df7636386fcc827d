use policyhub_models::{BibliographyEntry, RetrievalResult, Vertical};

/// Build a numbered bibliography entry for one context chunk, formatted
/// per vertical:
/// legal `"<source>, Section <n> (<year>)"`, go `"G.O. Ms. No. <n>,
/// <source> (<year>)"`, judicial `"<case>, <source> (<year>)"`, everything
/// else `"<source> (<year>)"`.
pub fn bibliography_entry(result: &RetrievalResult, number: usize) -> BibliographyEntry {
    let payload = &result.payload;
    let source = payload
        .source()
        .unwrap_or_else(|| result.chunk_id.clone());
    let year = payload.year();
    let section = payload.section();
    let go_number = payload.go_number();
    let case_number = payload.case_number();

    let display = match result.vertical {
        Vertical::Legal => {
            let mut parts = vec![source.clone()];
            if let Some(section) = &section {
                parts.push(format!("Section {section}"));
            }
            join_with_year(parts, year)
        }
        Vertical::Go => {
            let mut parts = Vec::new();
            if let Some(number) = &go_number {
                parts.push(format!("G.O. Ms. No. {number}"));
            }
            parts.push(source.clone());
            join_with_year(parts, year)
        }
        Vertical::Judicial => {
            let mut parts = Vec::new();
            if let Some(case) = &case_number {
                parts.push(case.clone());
            }
            parts.push(source.clone());
            join_with_year(parts, year)
        }
        Vertical::Data | Vertical::Schemes | Vertical::Internet => {
            join_with_year(vec![source.clone()], year)
        }
    };

    BibliographyEntry {
        number,
        display,
        vertical: result.vertical,
        source,
        year,
        section,
        go_number,
        case_number,
        url: payload.url(),
    }
}

fn join_with_year(parts: Vec<String>, year: Option<i64>) -> String {
    let mut display = parts.join(", ");
    if let Some(year) = year {
        display.push_str(&format!(" ({year})"));
    }
    display
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyhub_models::ChunkPayload;
    use serde_json::json;

    fn result(vertical: Vertical, payload: serde_json::Value) -> RetrievalResult {
        RetrievalResult::new(
            "chunk-1".to_string(),
            "doc-1".to_string(),
            vertical,
            "content".to_string(),
            0.9,
            ChunkPayload(payload.as_object().unwrap().clone()),
        )
    }

    #[test]
    fn legal_entry_includes_section_and_year() {
        let entry = bibliography_entry(
            &result(
                Vertical::Legal,
                json!({"source": "RTE Act", "section": "12", "year": 2009}),
            ),
            1,
        );
        assert_eq!(entry.display, "RTE Act, Section 12 (2009)");
        assert_eq!(entry.number, 1);
    }

    #[test]
    fn go_entry_leads_with_the_order_number() {
        let entry = bibliography_entry(
            &result(
                Vertical::Go,
                json!({"source": "School Education Dept", "go_number": "26", "year": 2019}),
            ),
            2,
        );
        assert_eq!(entry.display, "G.O. Ms. No. 26, School Education Dept (2019)");
        assert_eq!(entry.go_number.as_deref(), Some("26"));
    }

    #[test]
    fn judicial_entry_leads_with_the_case() {
        let entry = bibliography_entry(
            &result(
                Vertical::Judicial,
                json!({"source": "AP High Court", "case_number": "123/2020", "year": 2020}),
            ),
            3,
        );
        assert_eq!(entry.display, "123/2020, AP High Court (2020)");
    }

    #[test]
    fn missing_source_falls_back_to_chunk_id() {
        let entry = bibliography_entry(&result(Vertical::Data, json!({})), 4);
        assert_eq!(entry.display, "chunk-1");
        assert!(entry.year.is_none());
    }
}
