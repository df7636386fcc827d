use crate::services::vector_store::VectorStore;
use once_cell::sync::Lazy;
use policyhub_models::{QueryMode, RelationType, RetrievalResult, Vertical};
use regex::Regex;
use std::collections::HashMap;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Downrank factor applied to superseded chunks in DeepThink mode, where
/// they are kept for historical analysis instead of dropped.
const DOWNRANK_FACTOR: f32 = 0.3;

/// Process-wide index of superseded documents.
///
/// Built once by scanning the GO collection: GO numbers map to doc ids,
/// and each `supersedes` relation claims its textual target. Targets that
/// cannot be resolved to a known GO number are dropped; self-loops and
/// arcs that would close a cycle are discarded with a warning.
pub struct SupersessionManager {
    superseded_by: HashMap<String, String>,
}

impl SupersessionManager {
    pub fn empty() -> Self {
        Self {
            superseded_by: HashMap::new(),
        }
    }

    /// Scan the store and build the index. Store failures log and return an
    /// empty index; supersession is an enhancement, not a prerequisite.
    pub async fn build(store: &dyn VectorStore) -> Self {
        let collection = Vertical::Go
            .collection()
            .expect("go is a corpus vertical");
        let payloads = match store.scroll_payloads(collection).await {
            Ok(payloads) => payloads,
            Err(e) => {
                tracing::error!(error = %e, "failed to load supersession data, continuing without");
                return Self::empty();
            }
        };

        // Pass 1: GO number -> doc id. Pass 2: supersession claims.
        let mut number_to_doc: HashMap<String, String> = HashMap::new();
        let mut claims: Vec<(String, String)> = Vec::new();

        for payload in &payloads {
            let Some(doc_id) = payload.doc_id() else {
                continue;
            };
            if let Some(number) = payload.go_number() {
                number_to_doc.insert(number.trim().to_string(), doc_id.clone());
            }
            for relation in payload.relations() {
                if relation.relation_type == RelationType::Supersedes {
                    claims.push((doc_id.clone(), relation.target));
                }
            }
        }

        let mut index = Self::empty();
        let mut unresolved = 0usize;
        for (new_doc, target) in claims {
            let Some(number) = DIGITS.find(&target).map(|m| m.as_str()) else {
                unresolved += 1;
                continue;
            };
            let Some(old_doc) = number_to_doc.get(number) else {
                tracing::debug!(target, "supersession target not resolved, dropping");
                unresolved += 1;
                continue;
            };
            index.add_arc(old_doc.clone(), new_doc);
        }

        tracing::info!(
            superseded = index.superseded_by.len(),
            unresolved,
            "supersession map built"
        );
        index
    }

    /// Add one supersession arc, ignoring self-loops and cycle-closing arcs
    /// (the later arc loses).
    fn add_arc(&mut self, old_doc: String, new_doc: String) {
        if old_doc == new_doc {
            tracing::warn!(doc = %old_doc, "document claims to supersede itself, ignoring");
            return;
        }
        if self.would_cycle(&old_doc, &new_doc) {
            tracing::warn!(
                old = %old_doc,
                new = %new_doc,
                "supersession cycle detected, discarding later arc"
            );
            return;
        }
        self.superseded_by.insert(old_doc, new_doc);
    }

    /// Walk the chain from `new_doc`; if it reaches `old_doc`, the arc
    /// old -> new would close a cycle.
    fn would_cycle(&self, old_doc: &str, new_doc: &str) -> bool {
        let mut current = new_doc;
        let mut hops = 0;
        while let Some(next) = self.superseded_by.get(current) {
            if next == old_doc {
                return true;
            }
            current = next;
            hops += 1;
            if hops > self.superseded_by.len() {
                return true;
            }
        }
        false
    }

    pub fn is_superseded(&self, doc_id: &str) -> bool {
        self.superseded_by.contains_key(doc_id)
    }

    pub fn superseded_by(&self, doc_id: &str) -> Option<&str> {
        self.superseded_by.get(doc_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.superseded_by.len()
    }

    pub fn is_empty(&self) -> bool {
        self.superseded_by.is_empty()
    }

    /// Apply the supersession policy: QA and Brainstorm drop superseded
    /// chunks; DeepThink downranks and marks them so historical analysis
    /// still sees the lineage. Returns the surviving list and the number
    /// dropped.
    pub fn apply(
        &self,
        results: Vec<RetrievalResult>,
        mode: QueryMode,
    ) -> (Vec<RetrievalResult>, usize) {
        if self.superseded_by.is_empty() {
            return (results, 0);
        }

        let mut kept = Vec::with_capacity(results.len());
        let mut dropped = 0usize;

        for mut result in results {
            match self.superseded_by.get(&result.doc_id) {
                None => kept.push(result),
                Some(new_doc) => match mode {
                    QueryMode::DeepThink => {
                        result.score *= DOWNRANK_FACTOR;
                        if let Some(rerank) = result.rerank_score {
                            result.rerank_score = Some(rerank * DOWNRANK_FACTOR);
                        }
                        result.superseded_by = Some(new_doc.clone());
                        kept.push(result);
                    }
                    QueryMode::Qa | QueryMode::Brainstorm => {
                        dropped += 1;
                    }
                },
            }
        }

        if mode == QueryMode::DeepThink {
            policyhub_models::sort_by_score_desc(&mut kept);
        }
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::vector_store::InMemoryStore;
    use policyhub_models::ChunkPayload;
    use serde_json::{json, Map};

    fn go_payload(doc_id: &str, go_number: &str, supersedes: Option<&str>) -> Map<String, serde_json::Value> {
        let mut value = json!({
            "chunk_id": format!("{doc_id}-c1"),
            "doc_id": doc_id,
            "go_number": go_number,
            "text": "order text",
        });
        if let Some(target) = supersedes {
            value["relations"] = json!([{ "relation_type": "supersedes", "target": target }]);
        }
        value.as_object().unwrap().clone()
    }

    async fn build_from(entries: Vec<Map<String, serde_json::Value>>) -> SupersessionManager {
        let store = InMemoryStore::new();
        for (i, payload) in entries.into_iter().enumerate() {
            store.insert("government_orders", format!("p{i}"), vec![1.0], payload);
        }
        SupersessionManager::build(&store).await
    }

    #[tokio::test]
    async fn resolves_textual_targets_to_doc_ids() {
        let manager = build_from(vec![
            go_payload("doc-old", "100", None),
            go_payload("doc-new", "200", Some("G.O.Ms.No.100")),
        ])
        .await;

        assert!(manager.is_superseded("doc-old"));
        assert_eq!(manager.superseded_by("doc-old"), Some("doc-new"));
        assert!(!manager.is_superseded("doc-new"));
    }

    #[tokio::test]
    async fn unresolved_targets_are_ignored() {
        let manager = build_from(vec![go_payload("doc-new", "200", Some("G.O.Ms.No.999"))]).await;
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn self_supersession_is_ignored() {
        let manager = build_from(vec![go_payload("doc-a", "100", Some("G.O.Ms.No.100"))]).await;
        assert!(!manager.is_superseded("doc-a"));
    }

    #[tokio::test]
    async fn cycles_are_broken_by_discarding_the_later_arc() {
        let manager = build_from(vec![
            go_payload("doc-a", "100", Some("G.O.Ms.No.200")),
            go_payload("doc-b", "200", Some("G.O.Ms.No.100")),
        ])
        .await;

        // Exactly one arc survives.
        assert_eq!(manager.len(), 1);
    }

    fn result_for(doc_id: &str, score: f32) -> RetrievalResult {
        RetrievalResult::new(
            format!("{doc_id}-c1"),
            doc_id.to_string(),
            Vertical::Go,
            "text".to_string(),
            score,
            ChunkPayload(Map::new()),
        )
    }

    #[tokio::test]
    async fn qa_drops_superseded_results() {
        let manager = build_from(vec![
            go_payload("doc-old", "100", None),
            go_payload("doc-new", "200", Some("GO 100")),
        ])
        .await;

        let (kept, dropped) = manager.apply(
            vec![result_for("doc-old", 0.9), result_for("doc-new", 0.8)],
            QueryMode::Qa,
        );
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].doc_id, "doc-new");
    }

    #[tokio::test]
    async fn deep_think_downranks_and_marks() {
        let manager = build_from(vec![
            go_payload("doc-old", "100", None),
            go_payload("doc-new", "200", Some("GO 100")),
        ])
        .await;

        let (kept, dropped) = manager.apply(
            vec![result_for("doc-old", 1.0), result_for("doc-new", 0.5)],
            QueryMode::DeepThink,
        );
        assert_eq!(dropped, 0);
        assert_eq!(kept.len(), 2);
        // Downranked below the current order.
        assert_eq!(kept[0].doc_id, "doc-new");
        let old = kept.iter().find(|r| r.doc_id == "doc-old").unwrap();
        assert!((old.score - 0.3).abs() < 1e-6);
        assert_eq!(old.superseded_by.as_deref(), Some("doc-new"));
    }
}
