//! One [`Call`] builder per remote operation.
//!
//! Both clients compose their requests here, so the blocking and async
//! variants send identical requests for identical arguments.

use crate::options::{
    AddMemoryOptions, AugmentOptions, EntityOptions, LearnOptions, ListEntitiesOptions,
    ListMemoriesOptions, SearchOptions, UpdateMemoryOptions,
};
use crate::request::Call;
use crate::types::{
    AugmentRequest, CreateMemoryRequest, LearnRequest, SearchRequest, UpdateMemoryRequest,
};
use crate::Result;
use http::Method;

const HEALTH: &str = "/api/v1/health";
const METRICS: &str = "/api/v1/metrics";
const SEARCH: &str = "/api/v1/memories/search";
const AUGMENT: &str = "/api/v1/augment";
const LEARN: &str = "/api/v1/learn";
const MEMORIES: &str = "/api/v1/memories";
const ENTITIES: &str = "/api/v1/entities";

fn namespace_of(opts: Option<&EntityOptions>) -> Option<&str> {
    opts.and_then(|o| o.namespace.as_deref())
}

pub(crate) fn health() -> Call {
    Call::new(Method::GET, HEALTH)
}

pub(crate) fn metrics() -> Call {
    Call::new(Method::GET, METRICS)
}

pub(crate) fn search(query: &str, opts: Option<&SearchOptions>) -> Result<Call> {
    let default = SearchOptions::default();
    let opts = opts.unwrap_or(&default);
    let body = SearchRequest {
        query,
        limit: opts.limit,
        node_type: opts.node_type.as_deref(),
        time_range: opts.time_range.map(|(from, to)| [from, to]),
    };
    Call::new(Method::POST, SEARCH)
        .with_namespace(opts.namespace.as_deref())
        .with_body(&body)
}

pub(crate) fn augment(context: &str, opts: Option<&AugmentOptions>) -> Result<Call> {
    let default = AugmentOptions::default();
    let opts = opts.unwrap_or(&default);
    let body = AugmentRequest {
        context,
        limit: opts.limit,
    };
    Call::new(Method::POST, AUGMENT)
        .with_namespace(opts.namespace.as_deref())
        .with_body(&body)
}

pub(crate) fn learn(output: &str, opts: Option<&LearnOptions>) -> Result<Call> {
    let default = LearnOptions::default();
    let opts = opts.unwrap_or(&default);
    let body = LearnRequest {
        output,
        metadata: opts.metadata.as_ref(),
    };
    Call::new(Method::POST, LEARN)
        .with_namespace(opts.namespace.as_deref())
        .with_body(&body)
}

pub(crate) fn add_memory(text: &str, opts: Option<&AddMemoryOptions>) -> Result<Call> {
    let default = AddMemoryOptions::default();
    let opts = opts.unwrap_or(&default);
    let body = CreateMemoryRequest {
        text,
        metadata: opts.metadata.as_ref(),
    };
    Call::new(Method::POST, MEMORIES)
        .with_namespace(opts.namespace.as_deref())
        .with_body(&body)
}

pub(crate) fn get_memory(id: u64, opts: Option<&EntityOptions>) -> Call {
    Call::new(Method::GET, format!("{MEMORIES}/{id}")).with_namespace(namespace_of(opts))
}

pub(crate) fn list_memories(opts: Option<&ListMemoriesOptions>) -> Call {
    let default = ListMemoriesOptions::default();
    let opts = opts.unwrap_or(&default);
    Call::new(Method::GET, MEMORIES)
        .with_namespace(opts.namespace.as_deref())
        .with_query_param("node_type", opts.node_type.as_deref())
        .with_query_param("limit", opts.limit)
        .with_query_param("offset", opts.offset)
}

pub(crate) fn update_memory(id: u64, opts: Option<&UpdateMemoryOptions>) -> Result<Call> {
    let default = UpdateMemoryOptions::default();
    let opts = opts.unwrap_or(&default);
    let body = UpdateMemoryRequest {
        content: opts.content.as_deref(),
        metadata: opts.metadata.as_ref(),
    };
    Call::new(Method::PUT, format!("{MEMORIES}/{id}"))
        .with_namespace(opts.namespace.as_deref())
        .with_body(&body)
}

pub(crate) fn delete_memory(id: u64, opts: Option<&EntityOptions>) -> Call {
    Call::new(Method::DELETE, format!("{MEMORIES}/{id}")).with_namespace(namespace_of(opts))
}

pub(crate) fn get_entity(id: u64, opts: Option<&EntityOptions>) -> Call {
    Call::new(Method::GET, format!("{ENTITIES}/{id}")).with_namespace(namespace_of(opts))
}

pub(crate) fn list_entities(opts: Option<&ListEntitiesOptions>) -> Call {
    let default = ListEntitiesOptions::default();
    let opts = opts.unwrap_or(&default);
    Call::new(Method::GET, ENTITIES)
        .with_namespace(opts.namespace.as_deref())
        .with_query_param("limit", opts.limit)
        .with_query_param("offset", opts.offset)
}
