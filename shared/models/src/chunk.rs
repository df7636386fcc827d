use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Relation kinds recognized in chunk payloads. Only `Supersedes` affects
/// retrieval; the rest are carried through for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Supersedes,
    Amends,
    Cites,
    Implements,
    GovernedBy,
}

impl RelationType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "supersedes" => Some(RelationType::Supersedes),
            "amends" => Some(RelationType::Amends),
            "cites" => Some(RelationType::Cites),
            "implements" => Some(RelationType::Implements),
            "governed_by" => Some(RelationType::GovernedBy),
            _ => None,
        }
    }
}

/// A directed relation from the document owning the payload to a textual
/// target identifier (e.g. "G.O.Ms.No.123"). Targets are resolved to doc
/// ids by the supersession manager; unresolved targets are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub relation_type: RelationType,
    pub target: String,
}

/// The open string → scalar/list payload persisted with every chunk.
///
/// The store schema is controlled by the ingestion pipeline, so this stays
/// a schemaless map behind typed accessors rather than a fixed struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkPayload(pub Map<String, Value>);

impl ChunkPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field, tolerating numeric payloads (GO numbers are stored as
    /// either strings or ints depending on the ingestion run).
    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn int_field(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.0.get(key)?.as_bool()
    }

    /// List-of-strings field; a scalar string is treated as a one-element
    /// list (both shapes occur in the persisted metadata).
    pub fn str_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    // Universal fields

    pub fn chunk_id(&self) -> Option<String> {
        self.str_field("chunk_id")
    }

    pub fn doc_id(&self) -> Option<String> {
        self.str_field("doc_id")
    }

    pub fn content(&self) -> Option<String> {
        self.str_field("text").or_else(|| self.str_field("content"))
    }

    pub fn year(&self) -> Option<i64> {
        self.int_field("year")
    }

    pub fn doc_type(&self) -> Option<String> {
        self.str_field("doc_type")
    }

    pub fn source(&self) -> Option<String> {
        self.str_field("source")
    }

    pub fn url(&self) -> Option<String> {
        self.str_field("url")
    }

    // Vertical-specific fields

    pub fn section(&self) -> Option<String> {
        self.str_field("section")
            .or_else(|| self.str_field("section_number"))
    }

    pub fn act_name(&self) -> Option<String> {
        self.str_field("act_name")
    }

    pub fn go_number(&self) -> Option<String> {
        self.str_field("go_number")
    }

    pub fn department(&self) -> Option<String> {
        self.str_field("department")
    }

    pub fn case_number(&self) -> Option<String> {
        self.str_field("case_number")
    }

    pub fn court(&self) -> Option<String> {
        self.str_field("court").or_else(|| self.str_field("court_name"))
    }

    pub fn scheme_name(&self) -> Option<String> {
        self.str_field("scheme_name")
    }

    /// Relations attached to this chunk's document. Entries with an
    /// unrecognized `relation_type` or missing target are skipped.
    pub fn relations(&self) -> Vec<Relation> {
        let Some(Value::Array(items)) = self.0.get("relations") else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let kind = RelationType::parse(obj.get("relation_type")?.as_str()?)?;
                let target = obj.get("target")?.as_str()?.to_string();
                if target.is_empty() {
                    return None;
                }
                Some(Relation {
                    relation_type: kind,
                    target,
                })
            })
            .collect()
    }
}

impl From<Map<String, Value>> for ChunkPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> ChunkPayload {
        ChunkPayload(value.as_object().unwrap().clone())
    }

    #[test]
    fn numeric_go_number_reads_as_string() {
        let p = payload(json!({"go_number": 26}));
        assert_eq!(p.go_number().as_deref(), Some("26"));
    }

    #[test]
    fn scalar_string_promotes_to_list() {
        let p = payload(json!({"mentioned_sections": "12"}));
        assert_eq!(p.str_list("mentioned_sections"), vec!["12"]);
    }

    #[test]
    fn parses_relations_and_skips_unknown_kinds() {
        let p = payload(json!({
            "relations": [
                {"relation_type": "supersedes", "target": "G.O.Ms.No.190"},
                {"relation_type": "refers", "target": "x"},
                {"relation_type": "cites", "target": ""}
            ]
        }));
        let rels = p.relations();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relation_type, RelationType::Supersedes);
        assert_eq!(rels[0].target, "G.O.Ms.No.190");
    }

    #[test]
    fn year_accepts_string_payloads() {
        let p = payload(json!({"year": "2019"}));
        assert_eq!(p.year(), Some(2019));
    }
}
