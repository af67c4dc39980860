//! Request and response bodies exchanged with the Ucotron server.
//!
//! Every response field carries a default, so a payload that omits a field
//! still decodes. [`EntityResponse::neighbors`] is the one field where absence
//! (`None`) and an empty list (`Some(vec![])`) mean different things.

use serde::{Deserialize, Serialize};

/// Free-form JSON metadata attached to memories.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// Request bodies. Absent options are skipped, never sent as null.

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<[i64; 2]>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AugmentRequest<'a> {
    pub context: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LearnRequest<'a> {
    pub output: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Metadata>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateMemoryRequest<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Metadata>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateMemoryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Metadata>,
}

/// Load state of the server's ML models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelStatus {
    pub embedder_loaded: bool,
    pub embedding_model: String,
    pub ner_loaded: bool,
    pub relation_extractor_loaded: bool,
    pub transcriber_loaded: bool,
}

/// Response of `GET /api/v1/health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
    pub instance_role: String,
    pub storage_mode: String,
    pub vector_backend: String,
    pub graph_backend: String,
    pub models: ModelStatus,
}

/// Response of `GET /api/v1/metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsResponse {
    pub instance_id: String,
    pub total_requests: u64,
    pub total_ingestions: u64,
    pub total_searches: u64,
    pub uptime_secs: u64,
}

/// A stored memory node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryResponse {
    pub id: u64,
    pub content: String,
    pub node_type: String,
    pub timestamp: i64,
    pub metadata: Metadata,
}

/// One scored hit from a search or augmentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResultItem {
    pub id: u64,
    pub content: String,
    pub node_type: String,
    /// Combined relevance score.
    pub score: f64,
    pub vector_sim: f64,
    pub graph_centrality: f64,
    pub recency: f64,
}

/// Response of `POST /api/v1/memories/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: u64,
    pub query: String,
}

/// A node adjacent to an entity in the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborResponse {
    pub node_id: u64,
    pub content: String,
    pub edge_type: String,
    pub weight: f64,
}

/// An entity node, optionally with its graph neighbors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityResponse {
    pub id: u64,
    pub content: String,
    pub node_type: String,
    pub timestamp: i64,
    pub metadata: Metadata,
    /// `None` when the server did not report neighbors at all.
    pub neighbors: Option<Vec<NeighborResponse>>,
}

/// Per-stage counters reported after ingesting text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionMetricsResponse {
    pub chunks_processed: u64,
    pub entities_extracted: u64,
    pub relations_extracted: u64,
    pub contradictions_detected: u64,
    pub total_us: u64,
}

/// Response of `POST /api/v1/memories`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateMemoryResponse {
    pub chunk_node_ids: Vec<u64>,
    pub entity_node_ids: Vec<u64>,
    pub edges_created: u64,
    pub metrics: IngestionMetricsResponse,
}

/// Response of `POST /api/v1/augment`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentResponse {
    pub memories: Vec<SearchResultItem>,
    pub entities: Vec<EntityResponse>,
    /// Context ready to be placed in a prompt.
    pub context_text: String,
}

/// Response of `POST /api/v1/learn`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnResponse {
    pub memories_created: u64,
    pub entities_found: u64,
    pub conflicts_found: u64,
}
