//! The graph access port: the only way the engine touches a store.
//!
//! Every method is one round trip. Batched methods (`labels`, `properties`,
//! `walk`) resolve a whole id set in that one trip; the hydrator relies on
//! this to keep its cost independent of the number of matched vertices.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::PortResult;
use crate::value::{PropertyBundle, Value, VertexId, VertexLabel};

/// Which edges to follow during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalDirection {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

impl TraversalDirection {
    pub fn includes_outgoing(self) -> bool {
        matches!(self, TraversalDirection::Outgoing | TraversalDirection::Both)
    }

    pub fn includes_incoming(self) -> bool {
        matches!(self, TraversalDirection::Incoming | TraversalDirection::Both)
    }
}

/// One edge seen from the vertex being expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: VertexId,
    /// Properties stored on the edge (empty when it has none).
    pub properties: PropertyBundle,
}

/// Second hop of a [`EdgeWalk`]: follow one outgoing edge from the related
/// vertex and read a property there (e.g. university -> city name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnwardStep {
    pub edge_label: String,
    pub property: String,
}

/// A batched join: for every source id, every `edge_label` edge in
/// `direction`, with selected edge/target/onward properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeWalk {
    pub edge_label: String,
    pub direction: TraversalDirection,
    pub edge_property: Option<String>,
    pub target_property: Option<String>,
    pub onward: Option<OnwardStep>,
}

impl EdgeWalk {
    /// Walk `edge_label` outgoing without reading any properties.
    pub fn new(edge_label: impl Into<String>) -> Self {
        Self {
            edge_label: edge_label.into(),
            direction: TraversalDirection::Outgoing,
            edge_property: None,
            target_property: None,
            onward: None,
        }
    }

    pub fn direction(mut self, direction: TraversalDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn edge_property(mut self, name: impl Into<String>) -> Self {
        self.edge_property = Some(name.into());
        self
    }

    pub fn target_property(mut self, name: impl Into<String>) -> Self {
        self.target_property = Some(name.into());
        self
    }

    pub fn onward(mut self, edge_label: impl Into<String>, property: impl Into<String>) -> Self {
        self.onward = Some(OnwardStep {
            edge_label: edge_label.into(),
            property: property.into(),
        });
        self
    }
}

/// One traversed edge of an [`EdgeWalk`].
#[derive(Debug, Clone, PartialEq)]
pub struct WalkRow {
    pub source: VertexId,
    pub target: VertexId,
    pub edge_value: Option<Value>,
    pub target_value: Option<Value>,
    pub onward_value: Option<Value>,
}

/// Read-only access to a property graph store.
///
/// Implementations must return empty results (not errors) for ids without
/// edges or properties, and must leave ids that do not exist out of the
/// returned maps.
pub trait GraphPort {
    /// Labels of the given vertices; absent ids are omitted.
    fn labels(&self, ids: &[VertexId]) -> PortResult<HashMap<VertexId, VertexLabel>>;

    /// Edges of one label touching `id` in `direction`.
    fn neighbors(
        &self,
        id: VertexId,
        edge_label: &str,
        direction: TraversalDirection,
    ) -> PortResult<Vec<Neighbor>>;

    /// Selected properties of every id. An empty `names` slice means all.
    fn properties(
        &self,
        ids: &[VertexId],
        names: &[String],
    ) -> PortResult<HashMap<VertexId, PropertyBundle>>;

    /// Resolve an edge walk for every id in one trip.
    fn walk(&self, ids: &[VertexId], walk: &EdgeWalk) -> PortResult<Vec<WalkRow>>;
}

impl<P: GraphPort + ?Sized> GraphPort for &P {
    fn labels(&self, ids: &[VertexId]) -> PortResult<HashMap<VertexId, VertexLabel>> {
        (**self).labels(ids)
    }

    fn neighbors(
        &self,
        id: VertexId,
        edge_label: &str,
        direction: TraversalDirection,
    ) -> PortResult<Vec<Neighbor>> {
        (**self).neighbors(id, edge_label, direction)
    }

    fn properties(
        &self,
        ids: &[VertexId],
        names: &[String],
    ) -> PortResult<HashMap<VertexId, PropertyBundle>> {
        (**self).properties(ids, names)
    }

    fn walk(&self, ids: &[VertexId], walk: &EdgeWalk) -> PortResult<Vec<WalkRow>> {
        (**self).walk(ids, walk)
    }
}

/// Round trips made through a [`CountingPort`], per method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundTrips {
    pub labels: usize,
    pub neighbors: usize,
    pub properties: usize,
    pub walk: usize,
}

impl RoundTrips {
    pub fn total(&self) -> usize {
        self.labels + self.neighbors + self.properties + self.walk
    }

    /// Trips that resolve attribute data (`properties` and `walk`).
    pub fn batched(&self) -> usize {
        self.properties + self.walk
    }
}

/// Decorator that counts round trips made to the wrapped port.
#[derive(Debug)]
pub struct CountingPort<P> {
    inner: P,
    labels: AtomicUsize,
    neighbors: AtomicUsize,
    properties: AtomicUsize,
    walk: AtomicUsize,
}

impl<P: GraphPort> CountingPort<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            labels: AtomicUsize::new(0),
            neighbors: AtomicUsize::new(0),
            properties: AtomicUsize::new(0),
            walk: AtomicUsize::new(0),
        }
    }

    pub fn round_trips(&self) -> RoundTrips {
        RoundTrips {
            labels: self.labels.load(Ordering::Relaxed),
            neighbors: self.neighbors.load(Ordering::Relaxed),
            properties: self.properties.load(Ordering::Relaxed),
            walk: self.walk.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.labels.store(0, Ordering::Relaxed);
        self.neighbors.store(0, Ordering::Relaxed);
        self.properties.store(0, Ordering::Relaxed);
        self.walk.store(0, Ordering::Relaxed);
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: GraphPort> GraphPort for CountingPort<P> {
    fn labels(&self, ids: &[VertexId]) -> PortResult<HashMap<VertexId, VertexLabel>> {
        self.labels.fetch_add(1, Ordering::Relaxed);
        self.inner.labels(ids)
    }

    fn neighbors(
        &self,
        id: VertexId,
        edge_label: &str,
        direction: TraversalDirection,
    ) -> PortResult<Vec<Neighbor>> {
        self.neighbors.fetch_add(1, Ordering::Relaxed);
        self.inner.neighbors(id, edge_label, direction)
    }

    fn properties(
        &self,
        ids: &[VertexId],
        names: &[String],
    ) -> PortResult<HashMap<VertexId, PropertyBundle>> {
        self.properties.fetch_add(1, Ordering::Relaxed);
        self.inner.properties(ids, names)
    }

    fn walk(&self, ids: &[VertexId], walk: &EdgeWalk) -> PortResult<Vec<WalkRow>> {
        self.walk.fetch_add(1, Ordering::Relaxed);
        self.inner.walk(ids, walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;

    #[test]
    fn test_counting_port_counts_each_method() {
        let mut g = MemoryGraph::new();
        g.add_vertex(1, VertexLabel::Person, None);
        g.add_vertex(2, VertexLabel::Person, None);
        g.add_edge_named(1, 2, "knows");

        let port = CountingPort::new(&g);
        port.labels(&[1]).unwrap();
        port.neighbors(1, "knows", TraversalDirection::Outgoing).unwrap();
        port.neighbors(2, "knows", TraversalDirection::Outgoing).unwrap();
        port.properties(&[1, 2], &[]).unwrap();
        port.walk(&[1], &EdgeWalk::new("knows")).unwrap();

        let trips = port.round_trips();
        assert_eq!(trips.labels, 1);
        assert_eq!(trips.neighbors, 2);
        assert_eq!(trips.batched(), 2);
        assert_eq!(trips.total(), 5);

        port.reset();
        assert_eq!(port.round_trips(), RoundTrips::default());
    }

    #[test]
    fn test_direction_flags() {
        assert!(TraversalDirection::Both.includes_outgoing());
        assert!(TraversalDirection::Both.includes_incoming());
        assert!(!TraversalDirection::Outgoing.includes_incoming());
        assert_eq!(TraversalDirection::default(), TraversalDirection::Outgoing);
    }
}
