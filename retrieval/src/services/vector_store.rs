use crate::errors::StoreError;
use crate::services::embedder::cosine_similarity;
use async_trait::async_trait;
use policyhub_config::QdrantConfig;
use policyhub_models::ChunkPayload;
use qdrant_client::client::QdrantClient;
use qdrant_client::qdrant::condition::ConditionOneOf;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors::VectorsOptions;
use qdrant_client::qdrant::{
    Condition, FieldCondition, Filter, Match, ScrollPoints, SearchPoints,
};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// One OR-group: the value set may live in any of several payload fields.
/// Built by the filter mapper from a logical filter field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldClause {
    pub fields: Vec<String>,
    pub values: Vec<String>,
}

/// Conjunction of OR-groups, the only filter grammar the store needs to
/// support.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub clauses: Vec<FieldClause>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// A raw hit from the store, before it is tagged with a vertical.
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub id: String,
    pub score: f32,
    pub payload: Map<String, Value>,
    pub vector: Option<Vec<f32>>,
}

/// Read-only vector store interface. Implementations must be thread-safe;
/// the retriever calls `search` concurrently from per-vertical tasks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<StoreHit>, StoreError>;

    /// Stream every payload in a collection. Used once at startup to build
    /// the supersession index.
    async fn scroll_payloads(&self, collection: &str) -> Result<Vec<ChunkPayload>, StoreError>;
}

// ============================================================================
// QDRANT IMPLEMENTATION
// ============================================================================

/// Qdrant-backed store. Thin wrapper: connection setup, filter translation,
/// and payload conversion; store errors surface as [`StoreError`] and are
/// reduced to empty result sets by the retriever.
pub struct QdrantStore {
    client: QdrantClient,
}

impl QdrantStore {
    pub fn connect(config: &QdrantConfig) -> Result<Self, StoreError> {
        let client = QdrantClient::from_url(&config.url)
            .with_api_key(config.api_key.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::info!(url = %config.url, "qdrant client initialized");
        Ok(Self { client })
    }

    fn build_filter(spec: &FilterSpec) -> Option<Filter> {
        if spec.is_empty() {
            return None;
        }
        let must: Vec<Condition> = spec
            .clauses
            .iter()
            .map(|clause| {
                let mut should = Vec::new();
                for field in &clause.fields {
                    for value in &clause.values {
                        should.push(keyword_condition(field, value));
                        // Year-style fields are stored as integers in some
                        // ingestion runs; match both representations.
                        if let Ok(n) = value.parse::<i64>() {
                            should.push(integer_condition(field, n));
                        }
                    }
                }
                Condition {
                    condition_one_of: Some(ConditionOneOf::Filter(Filter {
                        should,
                        ..Default::default()
                    })),
                }
            })
            .collect();
        Some(Filter {
            must,
            ..Default::default()
        })
    }
}

fn keyword_condition(field: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: field.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(value.to_string())),
            }),
            ..Default::default()
        })),
    }
}

fn integer_condition(field: &str, value: i64) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: field.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Integer(value)),
            }),
            ..Default::default()
        })),
    }
}

fn point_id_to_string(id: Option<qdrant_client::qdrant::PointId>) -> String {
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u,
        None => String::new(),
    }
}

fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> Value {
    match value.kind {
        Some(Kind::NullValue(_)) | None => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d).map(Value::Number).unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(qdrant_value_to_json).collect())
        }
        Some(Kind::StructValue(map)) => Value::Object(
            map.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect(),
        ),
    }
}

fn payload_to_json(payload: HashMap<String, qdrant_client::qdrant::Value>) -> Map<String, Value> {
    payload
        .into_iter()
        .map(|(k, v)| (k, qdrant_value_to_json(v)))
        .collect()
}

fn extract_vector(vectors: Option<qdrant_client::qdrant::Vectors>) -> Option<Vec<f32>> {
    match vectors?.vectors_options? {
        VectorsOptions::Vector(v) => Some(v.data),
        VectorsOptions::Vectors(_) => None,
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<StoreHit>, StoreError> {
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector: vector.to_vec(),
            limit: limit as u64,
            filter: filter.and_then(Self::build_filter),
            score_threshold: (score_threshold > 0.0).then_some(score_threshold),
            with_payload: Some(true.into()),
            with_vectors: Some(true.into()),
            ..Default::default()
        };

        let response = self
            .client
            .search_points(&request)
            .await
            .map_err(|e| StoreError::Search {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(response
            .result
            .into_iter()
            .map(|point| StoreHit {
                id: point_id_to_string(point.id),
                score: point.score,
                payload: payload_to_json(point.payload),
                vector: extract_vector(point.vectors),
            })
            .collect())
    }

    async fn scroll_payloads(&self, collection: &str) -> Result<Vec<ChunkPayload>, StoreError> {
        let mut payloads = Vec::new();
        let mut offset = None;

        loop {
            let request = ScrollPoints {
                collection_name: collection.to_string(),
                limit: Some(512),
                offset: offset.take(),
                with_payload: Some(true.into()),
                with_vectors: Some(false.into()),
                ..Default::default()
            };
            let response =
                self.client
                    .scroll(&request)
                    .await
                    .map_err(|e| StoreError::Scroll {
                        collection: collection.to_string(),
                        message: e.to_string(),
                    })?;

            for point in response.result {
                payloads.push(ChunkPayload::new(payload_to_json(point.payload)));
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(payloads)
    }
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION
// ============================================================================

struct StoredChunk {
    id: String,
    vector: Vec<f32>,
    payload: Map<String, Value>,
}

/// Cosine-scored in-memory store for tests and local development. Honors
/// the same filter grammar and threshold semantics as the Qdrant store.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredChunk>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        collection: &str,
        id: impl Into<String>,
        vector: Vec<f32>,
        payload: Map<String, Value>,
    ) {
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredChunk {
                id: id.into(),
                vector,
                payload,
            });
    }

    fn matches_filter(payload: &Map<String, Value>, spec: &FilterSpec) -> bool {
        spec.clauses.iter().all(|clause| {
            clause.fields.iter().any(|field| match payload.get(field) {
                Some(value) => clause.values.iter().any(|want| value_matches(value, want)),
                None => false,
            })
        })
    }
}

fn value_matches(value: &Value, want: &str) -> bool {
    match value {
        Value::String(s) => s == want,
        Value::Number(n) => n.to_string() == want,
        Value::Array(items) => items.iter().any(|item| value_matches(item, want)),
        _ => false,
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<StoreHit>, StoreError> {
        let collections = self.collections.read().unwrap();
        let Some(chunks) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<StoreHit> = chunks
            .iter()
            .filter(|chunk| match filter {
                Some(spec) if !spec.is_empty() => Self::matches_filter(&chunk.payload, spec),
                _ => true,
            })
            .map(|chunk| StoreHit {
                id: chunk.id.clone(),
                score: cosine_similarity(vector, &chunk.vector),
                payload: chunk.payload.clone(),
                vector: Some(chunk.vector.clone()),
            })
            .filter(|hit| hit.score >= score_threshold)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll_payloads(&self, collection: &str) -> Result<Vec<ChunkPayload>, StoreError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .map(|chunks| {
                chunks
                    .iter()
                    .map(|c| ChunkPayload::new(c.payload.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
