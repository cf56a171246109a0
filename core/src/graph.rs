use std::collections::HashMap;

use crate::error::PortResult;
use crate::port::{EdgeWalk, GraphPort, Neighbor, TraversalDirection, WalkRow};
use crate::value::{PropertyBundle, Value, VertexId, VertexLabel};

/// Interned edge label index (avoids storing duplicate strings per edge).
pub type RelTypeId = u16;

/// Maximum number of distinct edge labels (u16 range).
pub const MAX_REL_TYPES: usize = u16::MAX as usize + 1;

/// Metadata and properties of a vertex.
#[derive(Debug, Clone)]
pub struct VertexInfo {
    pub label: VertexLabel,
    /// Application-level id (e.g. `person:933`).
    pub iid: Option<String>,
    pub properties: PropertyBundle,
}

/// A directed edge in the adjacency list.
///
/// Edge properties live once in the graph's side table and are shared by
/// the outgoing and incoming copies of the edge.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub target: VertexId,
    pub rel_type: RelTypeId,
    props: Option<u32>,
}

/// In-memory property graph: adjacency lists + vertex metadata + edge label
/// interning.
///
/// Edges are stored bidirectionally: `outgoing[a]` contains edges from a,
/// `incoming[b]` contains edges into b (with `target` pointing back at a).
#[derive(Debug, Default)]
pub struct MemoryGraph {
    outgoing: HashMap<VertexId, Vec<Edge>>,
    incoming: HashMap<VertexId, Vec<Edge>>,
    vertices: HashMap<VertexId, VertexInfo>,
    iid_index: HashMap<String, VertexId>,
    rel_types: Vec<String>,
    rel_type_map: HashMap<String, RelTypeId>,
    edge_props: Vec<PropertyBundle>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for a known graph size.
    pub fn with_capacity(vertex_count: usize, edge_count: usize) -> Self {
        Self {
            outgoing: HashMap::with_capacity(vertex_count),
            incoming: HashMap::with_capacity(vertex_count),
            vertices: HashMap::with_capacity(vertex_count),
            iid_index: HashMap::with_capacity(vertex_count),
            rel_types: Vec::new(),
            rel_type_map: HashMap::new(),
            edge_props: Vec::with_capacity(edge_count / 4),
        }
    }

    /// Intern an edge label, returning its compact id.
    ///
    /// Panics if more than 65536 distinct labels are interned.
    pub fn intern_rel_type(&mut self, rel_type: &str) -> RelTypeId {
        if let Some(&id) = self.rel_type_map.get(rel_type) {
            return id;
        }
        assert!(
            self.rel_types.len() < MAX_REL_TYPES,
            "edge label count exceeded maximum of {}",
            MAX_REL_TYPES
        );
        let id = self.rel_types.len() as RelTypeId;
        self.rel_types.push(rel_type.to_string());
        self.rel_type_map.insert(rel_type.to_string(), id);
        id
    }

    /// Look up an edge label without interning it.
    pub fn rel_type_id(&self, rel_type: &str) -> Option<RelTypeId> {
        self.rel_type_map.get(rel_type).copied()
    }

    /// Resolve a RelTypeId back to its name.
    pub fn rel_type_name(&self, id: RelTypeId) -> Option<&str> {
        self.rel_types.get(id as usize).map(|s| s.as_str())
    }

    pub fn rel_type_count(&self) -> usize {
        self.rel_types.len()
    }

    /// Register a vertex. Re-adding an id replaces its label and iid but
    /// keeps its properties.
    pub fn add_vertex(&mut self, id: VertexId, label: VertexLabel, iid: Option<String>) {
        if let Some(ref aid) = iid {
            self.iid_index.insert(aid.clone(), id);
        }
        let entry = self.vertices.entry(id).or_insert_with(|| VertexInfo {
            label,
            iid: None,
            properties: PropertyBundle::new(),
        });
        entry.label = label;
        entry.iid = iid;
    }

    /// Set a property on an existing vertex. Returns false if the vertex is unknown.
    pub fn set_property(&mut self, id: VertexId, name: &str, value: impl Into<Value>) -> bool {
        match self.vertices.get_mut(&id) {
            Some(info) => {
                info.properties.insert(name.to_string(), value.into());
                true
            }
            None => false,
        }
    }

    /// Add a directed edge. Also inserts into the incoming adjacency list.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, rel_type: RelTypeId) {
        self.push_edge(from, to, rel_type, None);
    }

    /// Add a directed edge carrying properties.
    pub fn add_edge_with_properties(
        &mut self,
        from: VertexId,
        to: VertexId,
        rel_type: RelTypeId,
        properties: PropertyBundle,
    ) {
        let slot = if properties.is_empty() {
            None
        } else {
            self.edge_props.push(properties);
            Some((self.edge_props.len() - 1) as u32)
        };
        self.push_edge(from, to, rel_type, slot);
    }

    /// Add a directed edge by label name, interning the label.
    pub fn add_edge_named(&mut self, from: VertexId, to: VertexId, rel_type: &str) {
        let rt = self.intern_rel_type(rel_type);
        self.add_edge(from, to, rt);
    }

    fn push_edge(&mut self, from: VertexId, to: VertexId, rel_type: RelTypeId, props: Option<u32>) {
        self.outgoing.entry(from).or_default().push(Edge {
            target: to,
            rel_type,
            props,
        });
        self.incoming.entry(to).or_default().push(Edge {
            target: from,
            rel_type,
            props,
        });
    }

    /// Look up a vertex by its application-level id.
    pub fn resolve_iid(&self, iid: &str) -> Option<VertexId> {
        self.iid_index.get(iid).copied()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&VertexInfo> {
        self.vertices.get(&id)
    }

    /// Get outgoing edges for a vertex.
    pub fn neighbors_out(&self, id: VertexId) -> &[Edge] {
        self.outgoing.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get incoming edges for a vertex.
    pub fn neighbors_in(&self, id: VertexId) -> &[Edge] {
        self.incoming.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Properties stored on an edge, if any.
    pub fn edge_properties(&self, edge: &Edge) -> Option<&PropertyBundle> {
        edge.props.and_then(|slot| self.edge_props.get(slot as usize))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(|v| v.len()).sum()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let vertex_mem = self.vertices.len() * (size_of::<VertexId>() + size_of::<VertexInfo>() + 40);
        let prop_mem: usize = self
            .vertices
            .values()
            .map(|v| v.properties.len() * 64)
            .sum::<usize>()
            + self.edge_props.iter().map(|p| p.len() * 64).sum::<usize>();
        let out_edges: usize = self.outgoing.values().map(|v| v.len() * size_of::<Edge>()).sum();
        let in_edges: usize = self.incoming.values().map(|v| v.len() * size_of::<Edge>()).sum();
        let index_mem = self.iid_index.len() * 80;

        vertex_mem + prop_mem + out_edges + in_edges + index_mem
    }

    /// Iterate edges of one label according to a traversal direction.
    ///
    /// Uses boolean flags to avoid Box/dyn dispatch; the compiler turns
    /// this into direct slice iteration.
    fn iter_edges(
        &self,
        id: VertexId,
        rel_type: RelTypeId,
        dir: TraversalDirection,
    ) -> impl Iterator<Item = &Edge> {
        let use_out = dir.includes_outgoing();
        let use_inc = dir.includes_incoming();

        let out_iter = self
            .neighbors_out(id)
            .iter()
            .filter(move |_| use_out);

        let in_iter = self
            .neighbors_in(id)
            .iter()
            .filter(move |_| use_inc);

        out_iter
            .chain(in_iter)
            .filter(move |e| e.rel_type == rel_type)
    }

    fn vertex_property(&self, id: VertexId, name: &str) -> Option<Value> {
        self.vertices
            .get(&id)
            .and_then(|info| info.properties.get(name))
            .cloned()
    }
}

impl GraphPort for MemoryGraph {
    fn labels(&self, ids: &[VertexId]) -> PortResult<HashMap<VertexId, VertexLabel>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.vertices.get(id).map(|info| (*id, info.label)))
            .collect())
    }

    fn neighbors(
        &self,
        id: VertexId,
        edge_label: &str,
        direction: TraversalDirection,
    ) -> PortResult<Vec<Neighbor>> {
        let Some(rt) = self.rel_type_id(edge_label) else {
            return Ok(Vec::new());
        };
        Ok(self
            .iter_edges(id, rt, direction)
            .map(|edge| Neighbor {
                id: edge.target,
                properties: self.edge_properties(edge).cloned().unwrap_or_default(),
            })
            .collect())
    }

    fn properties(
        &self,
        ids: &[VertexId],
        names: &[String],
    ) -> PortResult<HashMap<VertexId, PropertyBundle>> {
        let mut out = HashMap::with_capacity(ids.len());
        for &id in ids {
            let Some(info) = self.vertices.get(&id) else {
                continue;
            };
            let bundle = if names.is_empty() {
                info.properties.clone()
            } else {
                names
                    .iter()
                    .filter_map(|n| info.properties.get(n).map(|v| (n.clone(), v.clone())))
                    .collect()
            };
            out.insert(id, bundle);
        }
        Ok(out)
    }

    fn walk(&self, ids: &[VertexId], walk: &EdgeWalk) -> PortResult<Vec<WalkRow>> {
        let Some(rt) = self.rel_type_id(&walk.edge_label) else {
            return Ok(Vec::new());
        };
        let onward_rt = walk
            .onward
            .as_ref()
            .and_then(|step| self.rel_type_id(&step.edge_label));

        let mut rows = Vec::new();
        for &source in ids {
            for edge in self.iter_edges(source, rt, walk.direction) {
                let edge_value = walk.edge_property.as_deref().and_then(|name| {
                    self.edge_properties(edge).and_then(|p| p.get(name)).cloned()
                });
                let target_value = walk
                    .target_property
                    .as_deref()
                    .and_then(|name| self.vertex_property(edge.target, name));
                let onward_value = match (&walk.onward, onward_rt) {
                    (Some(step), Some(ort)) => self
                        .iter_edges(edge.target, ort, TraversalDirection::Outgoing)
                        .min_by_key(|next| next.target)
                        .and_then(|next| self.vertex_property(next.target, &step.property)),
                    _ => None,
                };
                rows.push(WalkRow {
                    source,
                    target: edge.target,
                    edge_value,
                    target_value,
                    onward_value,
                });
            }
        }
        Ok(rows)
    }
}
