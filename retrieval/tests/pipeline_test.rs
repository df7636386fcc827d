//! End-to-end pipeline tests against an in-memory store, the
//! deterministic hashed embedder, and a scripted LLM: plan → fan out →
//! merge → rerank → coverage → supersession → answer.

use policyhub_retrieval::config::Settings;
use policyhub_retrieval::models::Vertical;
use policyhub_retrieval::services::embedder::cosine_similarity;
use policyhub_retrieval::{
    HashedEmbedder, InMemoryStore, QueryRequest, RetrievalEngine, ScriptedLlm,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const DIMENSION: usize = 128;

fn seed(
    store: &InMemoryStore,
    embedder: &HashedEmbedder,
    collection: &str,
    id: &str,
    payload: serde_json::Value,
) {
    let text = payload["text"].as_str().expect("seed text").to_string();
    store.insert(
        collection,
        id,
        embedder.encode_sync(&text),
        payload.as_object().unwrap().clone(),
    );
}

/// A small but realistic slice of the corpus: two acts, four government
/// orders (one superseded), a judgment, two reports, and five schemes.
fn seeded_store(embedder: &HashedEmbedder) -> InMemoryStore {
    let store = InMemoryStore::new();

    seed(&store, embedder, "legal_documents", "l-rte-12", json!({
        "chunk_id": "l-rte-12", "doc_id": "rte-act-12",
        "text": "Section 12 of the Right to Education Act mandates that private schools \
                 admit children from disadvantaged groups and weaker sections, and the \
                 state reimburses the expenditure for those admissions",
        "source": "RTE Act", "section": "12", "year": 2009, "doc_type": "act"
    }));
    seed(&store, embedder, "legal_documents", "l-rte-21", json!({
        "chunk_id": "l-rte-21", "doc_id": "rte-act-21",
        "text": "Section 21 of the Right to Education Act provides for school management \
                 committees and sets out the functions they perform for the school",
        "source": "RTE Act", "section": "21", "year": 2009, "doc_type": "act"
    }));
    seed(&store, embedder, "legal_documents", "l-edu-act", json!({
        "chunk_id": "l-edu-act", "doc_id": "edu-act",
        "text": "The state education act lays down the administration and governance of \
                 schools and the inspection duties of the education department",
        "source": "AP Education Act", "year": 1982, "doc_type": "act"
    }));

    seed(&store, embedder, "government_orders", "g26", json!({
        "chunk_id": "g26", "doc_id": "go-26",
        "text": "G.O.MS.No.26 of the School Education Department notifies the admission \
                 schedule under section 12 and the reimbursement procedure for the year",
        "source": "School Education Department", "go_number": "26", "year": 2019,
        "doc_type": "government_order"
    }));
    seed(&store, embedder, "government_orders", "g190", json!({
        "chunk_id": "g190", "doc_id": "go-190",
        "text": "G.O.MS.No.190 issues the teacher transfer and posting modalities and the \
                 schedule for the counselling of teachers in the state",
        "source": "School Education Department", "go_number": "190", "year": 2018,
        "doc_type": "government_order"
    }));
    seed(&store, embedder, "government_orders", "g201", json!({
        "chunk_id": "g201", "doc_id": "go-201",
        "text": "G.O.MS.No.201 issues the revised teacher transfer and posting modalities \
                 and supersedes the earlier orders on the subject",
        "source": "School Education Department", "go_number": "201", "year": 2022,
        "doc_type": "government_order",
        "relations": [{"relation_type": "supersedes", "target": "G.O.Ms.No.190"}]
    }));
    seed(&store, embedder, "government_orders", "g-admin", json!({
        "chunk_id": "g-admin", "doc_id": "go-admin",
        "text": "Instructions on the administration and monitoring of schools and the \
                 inspection and compliance duties of district education officers",
        "source": "School Education Department", "go_number": "77", "year": 2021,
        "doc_type": "government_order"
    }));

    seed(&store, embedder, "judicial_documents", "j1", json!({
        "chunk_id": "j1", "doc_id": "wp-123-2020",
        "text": "The high court judgment in the writ petition upholds the admission of \
                 children under section 12 and directs the department to comply",
        "source": "AP High Court", "case_number": "123/2020", "year": 2020,
        "doc_type": "judgment"
    }));

    seed(&store, embedder, "data_reports", "d1", json!({
        "chunk_id": "d1", "doc_id": "udise-2021",
        "text": "The UDISE report presents the enrollment and dropout statistics for the \
                 schools of the state and the participation of children by district",
        "source": "UDISE", "year": 2021, "doc_type": "report", "is_table": true
    }));
    seed(&store, embedder, "data_reports", "d2", json!({
        "chunk_id": "d2", "doc_id": "vacancy-2022",
        "text": "The district wise report presents the teacher vacancy and recruitment \
                 statistics and the posting position for the year",
        "source": "School Education Department", "year": 2022, "doc_type": "report"
    }));

    seed(&store, embedder, "schemes", "s-nadu", json!({
        "chunk_id": "s-nadu", "doc_id": "nadu-nedu",
        "text": "The Nadu Nedu infrastructure programme covers toilet construction and \
                 classroom renovation and drinking water facilities for the schools",
        "source": "Nadu-Nedu", "scheme_name": "Nadu-Nedu", "year": 2021, "doc_type": "scheme"
    }));
    seed(&store, embedder, "schemes", "s-amma", json!({
        "chunk_id": "s-amma", "doc_id": "amma-vodi",
        "text": "The Amma Vodi welfare scheme provides financial assistance to mothers \
                 for the enrollment and retention of children in the schools",
        "source": "Amma Vodi", "scheme_name": "Amma Vodi", "year": 2020, "doc_type": "scheme"
    }));
    seed(&store, embedder, "schemes", "s-global-1", json!({
        "chunk_id": "s-global-1", "doc_id": "global-training",
        "text": "International best practices for teacher training from Finland and \
                 Singapore offer global models for the professional development of teachers",
        "source": "Global Models Review", "year": 2023, "doc_type": "scheme"
    }));
    seed(&store, embedder, "schemes", "s-global-2", json!({
        "chunk_id": "s-global-2", "doc_id": "global-training-dup",
        "text": "International best practices for teacher training from Finland and \
                 Singapore offer global models for the continuing development of teachers",
        "source": "Global Models Review", "year": 2023, "doc_type": "scheme"
    }));
    seed(&store, embedder, "schemes", "s-train", json!({
        "chunk_id": "s-train", "doc_id": "training-calendar",
        "text": "The teacher training and capacity building programme schedules workshops \
                 for the in service teachers of the state during the academic year",
        "source": "SCERT", "year": 2022, "doc_type": "scheme"
    }));

    store
}

async fn engine() -> (RetrievalEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    let embedder = HashedEmbedder::new(DIMENSION);
    let store = seeded_store(&embedder);

    let mut settings = Settings::default();
    settings.embedding.dimension = DIMENSION;
    settings.cache.llm_dir = dir.path().join("llm");

    let engine = RetrievalEngine::new(
        settings,
        Arc::new(store),
        Arc::new(HashedEmbedder::new(DIMENSION)),
        Some(Arc::new(ScriptedLlm)),
        None,
    )
    .await
    .unwrap();
    (engine, dir)
}

#[tokio::test]
async fn section_lookup_answers_from_legal() {
    let (engine, _dir) = engine().await;
    let response = engine
        .query(QueryRequest::for_query("What is Section 12 of RTE Act?"))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.query.mode, "qa");
    assert!(response.query.mode_confidence >= 0.85);
    assert_eq!(response.search.verticals_searched[0], "legal");
    assert_eq!(response.trace.plan["filters"]["sections"][0], "12");

    assert!(!response.results.is_empty());
    assert!(response.results.iter().any(|r| r.text.contains("Section 12")));

    assert!(response.answer.text.contains("[1]"));
    assert_eq!(response.answer.bibliography[0].vertical, Vertical::Legal);
}

#[tokio::test]
async fn go_lookup_filters_by_number_and_year() {
    let (engine, _dir) = engine().await;
    let response = engine
        .query(QueryRequest::for_query("G.O.MS.No.26 Dated 16-02-2019"))
        .await
        .unwrap();

    assert_eq!(response.query.mode, "qa");
    assert!(response
        .search
        .verticals_searched
        .contains(&"go".to_string()));
    assert_eq!(response.trace.plan["filters"]["go_number"][0], "26");
    assert_eq!(response.trace.plan["filters"]["year"][0], "2019");

    let top = &response.results[0];
    assert_eq!(top.metadata["go_number"], "26");
    assert!(response.answer.citations.contains(&1));

    // Nothing superseded may survive in the top results under QA.
    for result in response.results.iter().take(3) {
        assert_ne!(result.id, "g190");
    }
}

#[tokio::test]
async fn deep_think_covers_the_corpus() {
    let (engine, _dir) = engine().await;
    let mut request = QueryRequest::for_query(
        "Analyze the complete teacher recruitment and posting policy framework",
    );
    request.mode = Some("deep_think".to_string());
    let response = engine.query(request).await.unwrap();

    assert!(response.search.verticals_searched.len() >= 4);
    assert!(response
        .trace
        .predicted_categories
        .contains(&"teacher".to_string()));
    assert!(response
        .trace
        .predicted_categories
        .contains(&"governance".to_string()));

    let report = response.trace.coverage_report.as_ref().unwrap();
    assert!(report.coverage_score >= 0.5, "coverage {}", report.coverage_score);

    assert!(response.results.len() >= 10, "got {}", response.results.len());
    assert!(response.answer.text.len() > 1500);
    assert!(response.answer.bibliography.len() >= 3);

    // Every bracketed citation resolves to a bibliography entry.
    for citation in &response.answer.citations {
        assert!(*citation >= 1 && *citation <= response.answer.bibliography.len());
    }
}

#[tokio::test]
async fn brainstorm_stays_diverse() {
    let (engine, _dir) = engine().await;
    let mut request = QueryRequest::for_query("Innovative ideas to improve teacher training");
    request.mode = Some("brainstorm".to_string());
    let response = engine.query(request).await.unwrap();

    assert_eq!(response.search.verticals_searched[0], "schemes");
    assert_eq!(response.trace.plan["use_internet"], false);

    // At least 80% of the final results are unique in content: count
    // results that near-duplicate an earlier one via the hashed vectors.
    let embedder = HashedEmbedder::new(DIMENSION);
    let vectors: Vec<Vec<f32>> = response
        .results
        .iter()
        .map(|r| embedder.encode_sync(&r.text))
        .collect();
    let mut duplicates = 0;
    for i in 0..vectors.len() {
        if (0..i).any(|j| cosine_similarity(&vectors[i], &vectors[j]) > 0.85) {
            duplicates += 1;
        }
    }
    let unique_fraction =
        (vectors.len() - duplicates) as f32 / vectors.len().max(1) as f32;
    assert!(unique_fraction >= 0.8, "unique fraction {unique_fraction}");

    let lower = response.answer.text.to_lowercase();
    assert!(
        ["innovative", "global", "international", "best practice"]
            .iter()
            .any(|kw| lower.contains(kw)),
        "answer lacks ideation vocabulary: {lower}"
    );
}

#[tokio::test]
async fn infrastructure_query_gets_keyword_boost() {
    let (engine, _dir) = engine().await;
    let response = engine
        .query(QueryRequest::for_query("Nadu-Nedu infrastructure development"))
        .await
        .unwrap();

    let boosted_in_top5 = response.results.iter().take(5).any(|r| {
        r.metadata
            .get("bm25_boost")
            .and_then(|v| v.as_f64())
            .map(|b| b > 0.0)
            .unwrap_or(false)
    });
    assert!(boosted_in_top5, "no boosted result in the top 5");

    let report = response.trace.coverage_report.as_ref().unwrap();
    assert!(report.category_coverage["infrastructure"].covered);
}

#[tokio::test]
async fn recency_query_degrades_without_web_backend() {
    let (engine, _dir) = engine().await;
    let response = engine
        .query(QueryRequest::for_query("latest education policy 2025"))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.trace.plan["use_internet"], true);
    assert!(response
        .search
        .verticals_searched
        .contains(&"internet".to_string()));
    assert!(response
        .trace
        .steps
        .iter()
        .any(|s| s.contains("internet: backend not configured")));
}

#[tokio::test]
async fn superseded_orders_never_surface_in_qa() {
    let (engine, _dir) = engine().await;
    let response = engine
        .query(QueryRequest::for_query("teacher transfer posting orders"))
        .await
        .unwrap();

    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert!(ids.contains(&"g201"), "revised order missing: {ids:?}");
    assert!(!ids.contains(&"g190"), "superseded order leaked: {ids:?}");
}

#[tokio::test]
async fn deep_think_keeps_superseded_orders_downranked() {
    let (engine, _dir) = engine().await;
    let mut request = QueryRequest::for_query("history of teacher transfer orders");
    request.mode = Some("deep_think".to_string());
    let response = engine.query(request).await.unwrap();

    let old = response.results.iter().find(|r| r.id == "g190");
    if let Some(old) = old {
        assert_eq!(old.metadata["superseded_by"], "go-201");
        let new_rank = response
            .results
            .iter()
            .position(|r| r.id == "g201")
            .expect("revised order present");
        let old_rank = response.results.iter().position(|r| r.id == "g190").unwrap();
        assert!(new_rank < old_rank, "revised order must outrank the superseded one");
    }
}

#[tokio::test]
async fn every_result_belongs_to_a_searched_vertical() {
    let (engine, _dir) = engine().await;
    for query in [
        "What is Section 12 of RTE Act?",
        "Nadu-Nedu infrastructure development",
        "teacher transfer posting orders",
    ] {
        let response = engine.query(QueryRequest::for_query(query)).await.unwrap();
        for result in &response.results {
            assert!(
                response
                    .search
                    .verticals_searched
                    .contains(&result.vertical.to_string()),
                "result from unsearched vertical for {query}"
            );
        }
    }
}

#[tokio::test]
async fn rerunning_a_query_is_deterministic() {
    let (engine, _dir) = engine().await;
    let request = QueryRequest::for_query("admission of disadvantaged children in schools");

    let first = engine.query(request.clone()).await.unwrap();
    let second = engine.query(request).await.unwrap();

    let first_ids: Vec<&str> = first.results.iter().map(|r| r.id.as_str()).collect();
    let second_ids: Vec<&str> = second.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);

    let first_bib: Vec<&str> = first
        .answer
        .bibliography
        .iter()
        .map(|b| b.display.as_str())
        .collect();
    let second_bib: Vec<&str> = second
        .answer
        .bibliography
        .iter()
        .map(|b| b.display.as_str())
        .collect();
    assert_eq!(first_bib, second_bib);
}
