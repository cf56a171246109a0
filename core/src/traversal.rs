use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::port::{GraphPort, TraversalDirection};
use crate::predicate::Predicate;
use crate::value::VertexId;

/// Path length reported when the target is not reachable within `max_hops`.
pub const UNREACHABLE: i64 = -1;

/// Cooperative cancellation flag, checked at every level boundary.
///
/// Clones share the same flag, so a caller can keep one handle and hand
/// another to the traversal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self, depth: u32) -> EngineResult<()> {
        if self.is_cancelled() {
            warn!(depth, "traversal cancelled at level boundary");
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }
}

/// Matched vertex ids grouped by the hop distance at which they were first
/// reached. Each bucket is sorted by id; empty levels are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistanceBuckets {
    buckets: BTreeMap<u32, Vec<VertexId>>,
}

impl DistanceBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids at exactly `distance` hops (empty if none matched there).
    pub fn get(&self, distance: u32) -> &[VertexId] {
        self.buckets
            .get(&distance)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Non-empty buckets in ascending distance order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[VertexId])> {
        self.buckets.iter().map(|(&d, ids)| (d, ids.as_slice()))
    }

    /// All matched ids, by distance then id.
    pub fn ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.buckets.values().flat_map(|ids| ids.iter().copied())
    }

    pub fn distance_of(&self, id: VertexId) -> Option<u32> {
        self.buckets
            .iter()
            .find(|(_, ids)| ids.binary_search(&id).is_ok())
            .map(|(&d, _)| d)
    }

    /// Total number of matched ids across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn insert_level(&mut self, distance: u32, mut ids: Vec<VertexId>) {
        if ids.is_empty() {
            return;
        }
        ids.sort_unstable();
        ids.dedup();
        self.buckets.insert(distance, ids);
    }
}

impl FromIterator<(u32, Vec<VertexId>)> for DistanceBuckets {
    fn from_iter<I: IntoIterator<Item = (u32, Vec<VertexId>)>>(iter: I) -> Self {
        let mut buckets = DistanceBuckets::new();
        for (distance, ids) in iter {
            buckets.insert_level(distance, ids);
        }
        buckets
    }
}

/// Parameters of a bounded breadth-first expansion.
#[derive(Debug, Clone)]
pub struct ExpandRequest {
    pub root: VertexId,
    pub edge_label: String,
    pub direction: TraversalDirection,
    pub max_hops: u32,
    pub predicate: Predicate,
    /// Stop expanding once this many matches are reported; 0 = unbounded.
    pub result_limit: usize,
    /// When false the root may be reported at distance 0.
    pub exclude_root: bool,
    pub cancel: CancelToken,
}

impl ExpandRequest {
    pub fn new(root: VertexId, edge_label: impl Into<String>, max_hops: u32) -> Self {
        Self {
            root,
            edge_label: edge_label.into(),
            direction: TraversalDirection::Outgoing,
            max_hops,
            predicate: Predicate::Any,
            result_limit: 0,
            exclude_root: true,
            cancel: CancelToken::default(),
        }
    }

    pub fn direction(mut self, direction: TraversalDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn limit(mut self, result_limit: usize) -> Self {
        self.result_limit = result_limit;
        self
    }

    pub fn include_root(mut self) -> Self {
        self.exclude_root = false;
        self
    }

    pub fn cancel_on(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn validate(&self) -> EngineResult<()> {
        if self.max_hops < 1 {
            return Err(EngineError::invalid(format!(
                "max_hops must be at least 1, got {}",
                self.max_hops
            )));
        }
        check_edge_label(&self.edge_label)?;
        self.predicate.validate()
    }

    fn limit_reached(&self, reported: usize) -> bool {
        self.result_limit > 0 && reported >= self.result_limit
    }
}

/// Result of [`expand`].
#[derive(Debug, Clone)]
pub struct Expansion {
    pub buckets: DistanceBuckets,
    /// Vertices marked visited, root included.
    pub vertices_visited: usize,
    /// Number of hop levels actually expanded.
    pub levels_expanded: u32,
}

/// Bounded BFS from `req.root` along one edge label, grouping predicate
/// matches by hop distance.
///
/// Neighbors are marked visited the moment they are discovered, before the
/// predicate runs, so each vertex belongs to exactly one level no matter
/// how many paths reach it. The predicate only decides what is reported;
/// every discovered vertex is expanded on the next level. Once the number
/// of reported matches reaches `result_limit`, no further level starts; the
/// level that crossed the limit is kept whole.
pub fn expand<P: GraphPort + ?Sized>(port: &P, req: &ExpandRequest) -> EngineResult<Expansion> {
    req.validate()?;
    ensure_exists(port, &[req.root])?;

    let mut visited: HashSet<VertexId> = HashSet::new();
    let mut buckets = DistanceBuckets::new();
    let mut reported = 0usize;
    let mut levels_expanded = 0u32;

    visited.insert(req.root);
    if !req.exclude_root {
        let matched = filter_level(port, &req.predicate, vec![req.root])?;
        reported += matched.len();
        buckets.insert_level(0, matched);
    }

    let mut frontier: Vec<VertexId> = vec![req.root];

    for depth in 1..=req.max_hops {
        if req.limit_reached(reported) {
            debug!(depth, reported, "result limit reached, skipping remaining levels");
            break;
        }
        if frontier.is_empty() {
            break;
        }
        req.cancel.check(depth)?;

        let mut next: Vec<VertexId> = Vec::new();
        for &vertex in &frontier {
            for neighbor in port.neighbors(vertex, &req.edge_label, req.direction)? {
                if visited.insert(neighbor.id) {
                    next.push(neighbor.id);
                }
            }
        }
        levels_expanded = depth;

        let matched = filter_level(port, &req.predicate, next.clone())?;
        debug!(
            depth,
            discovered = next.len(),
            matched = matched.len(),
            "expanded level"
        );
        reported += matched.len();
        buckets.insert_level(depth, matched);
        frontier = next;
    }

    Ok(Expansion {
        buckets,
        vertices_visited: visited.len(),
        levels_expanded,
    })
}

/// Apply the predicate to one raw level with a single batched property read.
fn filter_level<P: GraphPort + ?Sized>(
    port: &P,
    predicate: &Predicate,
    candidates: Vec<VertexId>,
) -> EngineResult<Vec<VertexId>> {
    if candidates.is_empty() || predicate.is_any() {
        return Ok(candidates);
    }
    let props = port.properties(&candidates, &predicate.property_names())?;
    Ok(candidates
        .into_iter()
        .filter(|id| props.get(id).is_some_and(|p| predicate.matches(p)))
        .collect())
}

/// Parameters of a bounded shortest-path search.
#[derive(Debug, Clone)]
pub struct PathRequest {
    pub source: VertexId,
    pub target: VertexId,
    pub edge_label: String,
    pub direction: TraversalDirection,
    pub max_hops: u32,
    pub cancel: CancelToken,
}

impl PathRequest {
    pub fn new(
        source: VertexId,
        target: VertexId,
        edge_label: impl Into<String>,
        max_hops: u32,
    ) -> Self {
        Self {
            source,
            target,
            edge_label: edge_label.into(),
            direction: TraversalDirection::Outgoing,
            max_hops,
            cancel: CancelToken::default(),
        }
    }

    pub fn direction(mut self, direction: TraversalDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn cancel_on(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Hop count of a shortest `edge_label` path from source to target.
///
/// Returns 0 when source and target are the same id (no store access),
/// [`UNREACHABLE`] when the target is not found within `max_hops`.
/// The depth bound is mandatory: the search always terminates, even on
/// disconnected graphs.
pub fn shortest_path_length<P: GraphPort + ?Sized>(port: &P, req: &PathRequest) -> EngineResult<i64> {
    if req.source == req.target {
        return Ok(0);
    }
    Ok(match search_target(port, req)? {
        Some((depth, _)) => i64::from(depth),
        None => UNREACHABLE,
    })
}

/// One shortest path as a vertex sequence, both endpoints included.
///
/// `None` when the target is not reachable within `max_hops`.
pub fn shortest_path<P: GraphPort + ?Sized>(
    port: &P,
    req: &PathRequest,
) -> EngineResult<Option<Vec<VertexId>>> {
    if req.source == req.target {
        return Ok(Some(vec![req.source]));
    }
    Ok(search_target(port, req)?.map(|(_, parents)| reconstruct_path(&parents, req.source, req.target)))
}

/// Level-synchronous BFS that stops at the level where `target` appears.
/// Returns the depth and the parent pointers of every discovered vertex.
fn search_target<P: GraphPort + ?Sized>(
    port: &P,
    req: &PathRequest,
) -> EngineResult<Option<(u32, HashMap<VertexId, VertexId>)>> {
    if req.max_hops < 1 {
        return Err(EngineError::invalid(format!(
            "max_hops must be at least 1, got {}",
            req.max_hops
        )));
    }
    check_edge_label(&req.edge_label)?;
    ensure_exists(port, &[req.source, req.target])?;

    // Sentinel: source's parent is itself
    let mut parents: HashMap<VertexId, VertexId> = HashMap::new();
    parents.insert(req.source, req.source);
    let mut frontier: Vec<VertexId> = vec![req.source];

    for depth in 1..=req.max_hops {
        if frontier.is_empty() {
            break;
        }
        req.cancel.check(depth)?;

        let mut next: Vec<VertexId> = Vec::new();
        for &vertex in &frontier {
            for neighbor in port.neighbors(vertex, &req.edge_label, req.direction)? {
                if parents.contains_key(&neighbor.id) {
                    continue;
                }
                parents.insert(neighbor.id, vertex);
                if neighbor.id == req.target {
                    debug!(depth, visited = parents.len(), "target found");
                    return Ok(Some((depth, parents)));
                }
                next.push(neighbor.id);
            }
        }
        debug!(depth, discovered = next.len(), "expanded level");
        frontier = next;
    }

    debug!(visited = parents.len(), max_hops = req.max_hops, "target not reached");
    Ok(None)
}

/// Walk parent pointers from `target` back to `source`.
fn reconstruct_path(
    parents: &HashMap<VertexId, VertexId>,
    source: VertexId,
    target: VertexId,
) -> Vec<VertexId> {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        current = parents[&current];
        path.push(current);
    }
    path.reverse();
    path
}

fn check_edge_label(edge_label: &str) -> EngineResult<()> {
    if edge_label.is_empty() {
        return Err(EngineError::invalid("edge label is empty"));
    }
    Ok(())
}

/// Fail with `NotFound` for the first id the store does not know.
pub(crate) fn ensure_exists<P: GraphPort + ?Sized>(port: &P, ids: &[VertexId]) -> EngineResult<()> {
    let labels = port.labels(ids)?;
    match ids.iter().find(|id| !labels.contains_key(id)) {
        Some(&missing) => Err(EngineError::NotFound(missing)),
        None => Ok(()),
    }
}
