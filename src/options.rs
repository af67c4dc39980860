//! Optional parameters for each endpoint.
//!
//! Every field is independently optional. A `None` field is left out of the
//! request entirely; `Some(0)` is sent as `0`.

use crate::types::Metadata;

/// Options for [`Client::search`](crate::Client::search).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub limit: Option<u32>,
    pub node_type: Option<String>,
    /// Inclusive `(from, to)` timestamp bounds.
    pub time_range: Option<(i64, i64)>,
    pub namespace: Option<String>,
}

/// Options for [`Client::augment`](crate::Client::augment).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AugmentOptions {
    pub limit: Option<u32>,
    pub namespace: Option<String>,
}

/// Options for [`Client::learn`](crate::Client::learn).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearnOptions {
    pub metadata: Option<Metadata>,
    pub namespace: Option<String>,
}

/// Options for [`Client::add_memory`](crate::Client::add_memory).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddMemoryOptions {
    pub metadata: Option<Metadata>,
    pub namespace: Option<String>,
}

/// Options for [`Client::update_memory`](crate::Client::update_memory).
///
/// With neither `content` nor `metadata` set the server receives `{}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMemoryOptions {
    pub content: Option<String>,
    pub metadata: Option<Metadata>,
    pub namespace: Option<String>,
}

/// Options for [`Client::list_memories`](crate::Client::list_memories).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListMemoriesOptions {
    pub node_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub namespace: Option<String>,
}

/// Options for [`Client::list_entities`](crate::Client::list_entities).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListEntitiesOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub namespace: Option<String>,
}

/// Namespace override for calls addressing a single node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityOptions {
    pub namespace: Option<String>,
}

impl EntityOptions {
    /// Targets the given namespace.
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }
}
