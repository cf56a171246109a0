//! graph-hop-core: Bounded neighborhood expansion over a property graph.
//!
//! Finds the vertices within k hops of a root that satisfy a predicate,
//! grouped by hop distance, computes bounded shortest-path lengths, and
//! hydrates the matched set one batched store call per attribute category.
//! The store sits behind [`GraphPort`]; [`MemoryGraph`] is the in-memory
//! implementation used by tests and the benchmark.

mod assemble;
mod config;
mod error;
mod graph;
mod hydrate;
mod port;
mod predicate;
pub mod queries;
mod traversal;
mod value;

pub use assemble::{assemble, OutputRecord, SortKey};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, PortError, PortResult};
pub use graph::{Edge, MemoryGraph, RelTypeId, VertexInfo, MAX_REL_TYPES};
pub use hydrate::{hydrate, AttributeSpec, HydratedRecord, RelatedEntry};
pub use port::{
    CountingPort, EdgeWalk, GraphPort, Neighbor, OnwardStep, RoundTrips,
    TraversalDirection, WalkRow,
};
pub use predicate::Predicate;
pub use queries::{
    friends, path_length, person_search, recent_messages, recent_messages_with, reply_authors,
    Friend, RecentMessage, ReplyAuthor, RootPost,
};
pub use traversal::{
    expand, shortest_path, shortest_path_length, CancelToken, DistanceBuckets, ExpandRequest,
    Expansion, PathRequest, UNREACHABLE,
};
pub use value::{PropertyBundle, Value, VertexId, VertexLabel};
