//! Social-network read queries built from the engine's primitives.
//!
//! Each query validates its anchor vertex, then issues a fixed number of
//! batched port calls (plus one `walk` and one `labels` call per reply-chain
//! level for [`recent_messages`]).

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::assemble::{assemble, OutputRecord, SortKey};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::hydrate::{hydrate, AttributeSpec};
use crate::port::{EdgeWalk, GraphPort, TraversalDirection};
use crate::predicate::Predicate;
use crate::traversal::{
    ensure_exists, expand, shortest_path_length, CancelToken, ExpandRequest, PathRequest,
};
use crate::value::{cmp_optional, Value, VertexId, VertexLabel};

pub const KNOWS: &str = "knows";
pub const HAS_CREATOR: &str = "hasCreator";
pub const REPLY_OF: &str = "replyOf";
pub const IS_LOCATED_IN: &str = "isLocatedIn";
pub const STUDY_AT: &str = "studyAt";
pub const WORK_AT: &str = "workAt";

const PERSON_SCALARS: [&str; 8] = [
    "lastName",
    "birthday",
    "creationDate",
    "gender",
    "browserUsed",
    "locationIP",
    "email",
    "language",
];

/// Attribute categories reported for each person-search match.
pub fn person_search_categories() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::scalars(PERSON_SCALARS),
        AttributeSpec::single("city", IS_LOCATED_IN, "name"),
        AttributeSpec::repeated("universities", STUDY_AT, "name")
            .with_edge_property("classYear")
            .with_onward(IS_LOCATED_IN, "name"),
        AttributeSpec::repeated("companies", WORK_AT, "name")
            .with_edge_property("workFrom")
            .with_onward(IS_LOCATED_IN, "name"),
    ]
}

/// Persons with the given first name within `config.max_hops` `knows` hops,
/// closest first, then by last name and id.
pub fn person_search<P: GraphPort + ?Sized>(
    port: &P,
    config: &EngineConfig,
    person: VertexId,
    first_name: &str,
) -> EngineResult<Vec<OutputRecord>> {
    let req = ExpandRequest::new(person, KNOWS, config.max_hops)
        .predicate(Predicate::equals("firstName", first_name))
        .limit(config.result_limit);
    let expansion = expand(port, &req)?;

    let ids: Vec<VertexId> = expansion.buckets.ids().collect();
    let hydrated = hydrate(port, &ids, &person_search_categories())?;
    let mut records = assemble(
        &expansion.buckets,
        &hydrated,
        &[SortKey::asc("lastName"), SortKey::Id { descending: false }],
    );
    if config.result_limit > 0 {
        records.truncate(config.result_limit);
    }
    debug!(
        person,
        levels = expansion.levels_expanded,
        matches = records.len(),
        "person search"
    );
    Ok(records)
}

/// Length of the shortest `knows` path between two persons, or
/// [`UNREACHABLE`](crate::UNREACHABLE) beyond `config.path_max_hops`.
pub fn path_length<P: GraphPort + ?Sized>(
    port: &P,
    config: &EngineConfig,
    a: VertexId,
    b: VertexId,
) -> EngineResult<i64> {
    shortest_path_length(port, &PathRequest::new(a, b, KNOWS, config.path_max_hops))
}

/// First message of a reply chain and the person who wrote it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootPost {
    pub post: VertexId,
    pub author: Option<VertexId>,
    pub author_first_name: Option<Value>,
    pub author_last_name: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentMessage {
    pub id: VertexId,
    pub creation_date: Option<DateTime<Utc>>,
    /// Text content, or the image file for image-only posts.
    pub content: Option<Value>,
    /// `None` when the reply chain never reaches a post.
    pub root: Option<RootPost>,
}

/// The person's latest messages with the post each one ultimately replies to.
pub fn recent_messages<P: GraphPort + ?Sized>(
    port: &P,
    config: &EngineConfig,
    person: VertexId,
) -> EngineResult<Vec<RecentMessage>> {
    recent_messages_with(port, config, person, &CancelToken::default())
}

/// [`recent_messages`] with a cancellation token checked per chain level.
pub fn recent_messages_with<P: GraphPort + ?Sized>(
    port: &P,
    config: &EngineConfig,
    person: VertexId,
    cancel: &CancelToken,
) -> EngineResult<Vec<RecentMessage>> {
    ensure_exists(port, &[person])?;

    let mut messages: Vec<VertexId> = port
        .neighbors(person, HAS_CREATOR, TraversalDirection::Incoming)?
        .into_iter()
        .map(|n| n.id)
        .collect();
    messages.sort_unstable();
    messages.dedup();
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    let dates = port.properties(&messages, &["creationDate".to_string()])?;
    let date_of = |id: VertexId| dates.get(&id).and_then(|p| p.get("creationDate"));
    messages.sort_by(|&a, &b| descending(date_of(a), date_of(b)).then_with(|| b.cmp(&a)));
    messages.truncate(config.message_limit);

    let details = hydrate(
        port,
        &messages,
        &[AttributeSpec::scalars(["content", "imageFile", "creationDate"])],
    )?;
    let roots = resolve_root_posts(port, &messages, config.reply_chain_max_hops, cancel)?;

    let root_ids: Vec<VertexId> = sorted_unique(roots.values().copied());
    let authors = first_targets(port, &root_ids, &EdgeWalk::new(HAS_CREATOR))?;
    let author_ids: Vec<VertexId> = sorted_unique(authors.values().copied());
    let names = hydrate(
        port,
        &author_ids,
        &[AttributeSpec::scalars(["firstName", "lastName"])],
    )?;

    Ok(messages
        .into_iter()
        .map(|id| {
            let record = details.get(&id);
            let scalar = |name: &str| record.and_then(|r| r.scalar(name)).cloned();
            let root = roots.get(&id).map(|&post| {
                let author = authors.get(&post).copied();
                let name = |field: &str| {
                    author
                        .and_then(|a| names.get(&a))
                        .and_then(|r| r.scalar(field))
                        .cloned()
                };
                RootPost {
                    post,
                    author,
                    author_first_name: name("firstName"),
                    author_last_name: name("lastName"),
                }
            });
            RecentMessage {
                id,
                creation_date: scalar("creationDate").and_then(|v| v.as_date()),
                content: scalar("content")
                    .filter(|v| v.as_str() != Some(""))
                    .or_else(|| scalar("imageFile")),
                root,
            }
        })
        .collect())
}

/// Walk `replyOf` for all messages in lock step, one level at a time.
///
/// Returns message -> root post. Posts map to themselves. Chains that dead-end
/// or run past `max_hops` are left out.
fn resolve_root_posts<P: GraphPort + ?Sized>(
    port: &P,
    messages: &[VertexId],
    max_hops: u32,
    cancel: &CancelToken,
) -> EngineResult<HashMap<VertexId, VertexId>> {
    let labels = port.labels(messages)?;
    let mut roots: HashMap<VertexId, VertexId> = HashMap::new();
    // message -> vertex its chain has reached so far
    let mut pending: BTreeMap<VertexId, VertexId> = BTreeMap::new();
    for &message in messages {
        match labels.get(&message) {
            Some(VertexLabel::Post) => {
                roots.insert(message, message);
            }
            Some(_) => {
                pending.insert(message, message);
            }
            None => {}
        }
    }

    let reply_of = EdgeWalk::new(REPLY_OF);
    for depth in 1..=max_hops {
        if pending.is_empty() {
            break;
        }
        cancel.check(depth)?;

        let current = sorted_unique(pending.values().copied());
        let parents = first_targets(port, &current, &reply_of)?;
        let parent_ids = sorted_unique(parents.values().copied());
        let parent_labels = port.labels(&parent_ids)?;

        pending.retain(|&message, at| match parents.get(at) {
            None => {
                warn!(message_id = message, depth, "reply chain ends before reaching a post");
                false
            }
            Some(&parent) if parent_labels.get(&parent) == Some(&VertexLabel::Post) => {
                roots.insert(message, parent);
                false
            }
            Some(&parent) => {
                *at = parent;
                true
            }
        });
        debug!(depth, unresolved = pending.len(), "walked reply chain level");
    }

    for message in pending.keys() {
        warn!(message_id = message, max_hops, "reply chain exceeds hop bound, no root post");
    }
    Ok(roots)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Friend {
    pub id: VertexId,
    pub first_name: Option<Value>,
    pub last_name: Option<Value>,
    /// `creationDate` of the `knows` edge.
    pub since: Option<DateTime<Utc>>,
}

/// Direct `knows` neighbors, most recent friendship first, then by id.
pub fn friends<P: GraphPort + ?Sized>(port: &P, person: VertexId) -> EngineResult<Vec<Friend>> {
    ensure_exists(port, &[person])?;

    let mut edges: Vec<(VertexId, Option<Value>)> = port
        .neighbors(person, KNOWS, TraversalDirection::Outgoing)?
        .into_iter()
        .filter(|n| n.id != person)
        .map(|n| (n.id, n.properties.get("creationDate").cloned()))
        .collect();
    edges.sort_by(|a, b| descending(a.1.as_ref(), b.1.as_ref()).then_with(|| a.0.cmp(&b.0)));
    // Parallel edges: keep the most recent.
    let mut seen = HashSet::new();
    edges.retain(|(id, _)| seen.insert(*id));

    let ids: Vec<VertexId> = edges.iter().map(|(id, _)| *id).collect();
    let names = hydrate(port, &ids, &[AttributeSpec::scalars(["firstName", "lastName"])])?;

    Ok(edges
        .into_iter()
        .map(|(id, since)| {
            let name = |field: &str| names.get(&id).and_then(|r| r.scalar(field)).cloned();
            Friend {
                id,
                first_name: name("firstName"),
                last_name: name("lastName"),
                since: since.and_then(|v| v.as_date()),
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyAuthor {
    pub comment: VertexId,
    pub content: Option<Value>,
    pub creation_date: Option<DateTime<Utc>>,
    pub author: Option<VertexId>,
    pub author_first_name: Option<Value>,
    pub author_last_name: Option<Value>,
    /// Whether the reply author knows the author of the replied-to message.
    /// Always false when both are the same person.
    pub knows_original_author: bool,
}

/// Direct replies to a message, newest first, then by author id.
pub fn reply_authors<P: GraphPort + ?Sized>(
    port: &P,
    message: VertexId,
) -> EngineResult<Vec<ReplyAuthor>> {
    ensure_exists(port, &[message])?;

    let creator = EdgeWalk::new(HAS_CREATOR);
    let original_author = first_targets(port, &[message], &creator)?.remove(&message);

    let comments: Vec<VertexId> = sorted_unique(
        port.neighbors(message, REPLY_OF, TraversalDirection::Incoming)?
            .into_iter()
            .map(|n| n.id),
    );
    if comments.is_empty() {
        return Ok(Vec::new());
    }

    let details = hydrate(port, &comments, &[AttributeSpec::scalars(["content", "creationDate"])])?;
    let authors = first_targets(port, &comments, &creator)?;
    let author_ids = sorted_unique(authors.values().copied());
    let names = hydrate(port, &author_ids, &[AttributeSpec::scalars(["firstName", "lastName"])])?;

    let acquaintances: HashSet<VertexId> = match original_author {
        Some(original) => port
            .neighbors(original, KNOWS, TraversalDirection::Outgoing)?
            .into_iter()
            .map(|n| n.id)
            .collect(),
        None => HashSet::new(),
    };

    let mut out: Vec<ReplyAuthor> = comments
        .into_iter()
        .map(|comment| {
            let record = details.get(&comment);
            let author = authors.get(&comment).copied();
            let name = |field: &str| {
                author
                    .and_then(|a| names.get(&a))
                    .and_then(|r| r.scalar(field))
                    .cloned()
            };
            ReplyAuthor {
                comment,
                content: record.and_then(|r| r.scalar("content")).cloned(),
                creation_date: record
                    .and_then(|r| r.scalar("creationDate"))
                    .and_then(|v| v.as_date()),
                author,
                author_first_name: name("firstName"),
                author_last_name: name("lastName"),
                knows_original_author: match author {
                    Some(a) => Some(a) != original_author && acquaintances.contains(&a),
                    None => false,
                },
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.creation_date
            .cmp(&a.creation_date)
            .then_with(|| a.author.cmp(&b.author))
            .then_with(|| a.comment.cmp(&b.comment))
    });
    Ok(out)
}

/// Lowest target id per source for a walk; no store call for an empty set.
fn first_targets<P: GraphPort + ?Sized>(
    port: &P,
    ids: &[VertexId],
    walk: &EdgeWalk,
) -> EngineResult<HashMap<VertexId, VertexId>> {
    let mut out: HashMap<VertexId, VertexId> = HashMap::new();
    if ids.is_empty() {
        return Ok(out);
    }
    for row in port.walk(ids, walk)? {
        out.entry(row.source)
            .and_modify(|t| *t = (*t).min(row.target))
            .or_insert(row.target);
    }
    Ok(out)
}

fn sorted_unique(ids: impl IntoIterator<Item = VertexId>) -> Vec<VertexId> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Descending by value with missing values last.
fn descending(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(x),
        _ => cmp_optional(a, b),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::{EngineError, PortResult};
    use crate::graph::MemoryGraph;
    use crate::port::{CountingPort, Neighbor, WalkRow};
    use crate::value::PropertyBundle;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 3, d, 12, 0, 0).unwrap()
    }

    fn person(g: &mut MemoryGraph, id: VertexId, first: &str, last: &str) {
        g.add_vertex(id, VertexLabel::Person, Some(format!("person:{}", id)));
        g.set_property(id, "firstName", first);
        g.set_property(id, "lastName", last);
    }

    fn knows(g: &mut MemoryGraph, a: VertexId, b: VertexId, since: u32) {
        let rt = g.intern_rel_type(KNOWS);
        for (from, to) in [(a, b), (b, a)] {
            let mut props = PropertyBundle::new();
            props.insert("creationDate".into(), Value::Date(day(since)));
            g.add_edge_with_properties(from, to, rt, props);
        }
    }

    fn message(g: &mut MemoryGraph, id: VertexId, label: VertexLabel, author: VertexId, d: u32) {
        g.add_vertex(id, label, None);
        g.set_property(id, "creationDate", day(d));
        g.set_property(id, "content", format!("message {}", id));
        g.add_edge_named(id, author, HAS_CREATOR);
    }

    /// 1 knows 2 and 3; 2 knows 4. Post 100 by 1, comment chain 101 -> 100
    /// by 2, 102 -> 101 by 3; 103 is a dangling comment by 3.
    fn network() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        person(&mut g, 1, "Anna", "Berg");
        person(&mut g, 2, "Karl", "Zimmer");
        person(&mut g, 3, "Karl", "Adler");
        person(&mut g, 4, "Karl", "Adler");
        knows(&mut g, 1, 2, 5);
        knows(&mut g, 1, 3, 9);
        knows(&mut g, 2, 4, 1);

        message(&mut g, 100, VertexLabel::Post, 1, 1);
        message(&mut g, 101, VertexLabel::Comment, 2, 2);
        message(&mut g, 102, VertexLabel::Comment, 3, 3);
        message(&mut g, 103, VertexLabel::Comment, 3, 4);
        g.add_edge_named(101, 100, REPLY_OF);
        g.add_edge_named(102, 101, REPLY_OF);
        g
    }

    #[test]
    fn test_person_search_orders_by_distance_then_name() {
        let g = network();
        let out = person_search(&g, &EngineConfig::default(), 1, "Karl").unwrap();
        let rows: Vec<(VertexId, u32)> = out.iter().map(|r| (r.id, r.distance)).collect();
        assert_eq!(rows, vec![(3, 1), (2, 1), (4, 2)]);
        assert!(out[0].record.repeated.contains_key("universities"));
        assert!(out[0].record.single.contains_key("city"));
    }

    #[test]
    fn test_person_search_truncates_to_limit() {
        let g = network();
        let config = EngineConfig {
            result_limit: 1,
            ..EngineConfig::default()
        };
        let out = person_search(&g, &config, 1, "Karl").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 3);
    }

    #[test]
    fn test_person_search_round_trips_independent_of_matches() {
        let g = network();
        let port = CountingPort::new(&g);
        person_search(&port, &EngineConfig::default(), 1, "Karl").unwrap();
        assert_eq!(port.round_trips().walk, 3);
        assert_eq!(port.round_trips().labels, 1);
    }

    #[test]
    fn test_path_length() {
        let g = network();
        let config = EngineConfig::default();
        assert_eq!(path_length(&g, &config, 3, 4).unwrap(), 3);
        assert_eq!(path_length(&g, &config, 4, 4).unwrap(), 0);
    }

    #[test]
    fn test_recent_messages_resolve_root_posts() {
        let g = network();
        let out = recent_messages(&g, &EngineConfig::default(), 3).unwrap();
        let ids: Vec<VertexId> = out.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![103, 102]);
        assert_eq!(out[0].root, None);

        let root = out[1].root.as_ref().unwrap();
        assert_eq!(root.post, 100);
        assert_eq!(root.author, Some(1));
        assert_eq!(root.author_first_name, Some(Value::from("Anna")));
        assert_eq!(out[1].creation_date, Some(day(3)));
        assert_eq!(out[1].content, Some(Value::from("message 102")));
    }

    #[test]
    fn test_recent_messages_post_is_own_root() {
        let g = network();
        let out = recent_messages(&g, &EngineConfig::default(), 1).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].root.as_ref().map(|r| r.post), Some(100));
    }

    #[test]
    fn test_recent_messages_limit_and_chain_bound() {
        let g = network();
        let config = EngineConfig {
            message_limit: 1,
            reply_chain_max_hops: 1,
            ..EngineConfig::default()
        };
        // 102 needs two replyOf hops; with a bound of one it has no root.
        let out = recent_messages(&g, &EngineConfig { message_limit: 2, ..config.clone() }, 3).unwrap();
        assert!(out.iter().all(|m| m.root.is_none()));
        let out = recent_messages(&g, &config, 3).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 103);
    }

    #[test]
    fn test_recent_messages_one_walk_per_chain_level() {
        let g = network();
        let port = CountingPort::new(&g);
        recent_messages(&port, &EngineConfig::default(), 3).unwrap();
        // Two chain levels plus the root-author lookup.
        assert_eq!(port.round_trips().walk, 3);
        // Existence check, message labels, one per chain level.
        assert_eq!(port.round_trips().labels, 4);
    }

    #[test]
    fn test_recent_messages_cancelled() {
        let g = network();
        let token = CancelToken::new();
        token.cancel();
        let err = recent_messages_with(&g, &EngineConfig::default(), 3, &token).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn test_recent_messages_image_post_reports_image_file() {
        let mut g = network();
        message(&mut g, 110, VertexLabel::Post, 4, 8);
        g.set_property(110, "content", "");
        g.set_property(110, "imageFile", "photo1.jpg");
        let out = recent_messages(&g, &EngineConfig::default(), 4).unwrap();
        assert_eq!(out[0].id, 110);
        assert_eq!(out[0].content, Some(Value::from("photo1.jpg")));
    }

    /// Port that cancels the shared token on its first `walk` call.
    struct CancelOnWalk<'a> {
        inner: &'a MemoryGraph,
        token: CancelToken,
        walks: Cell<usize>,
    }

    impl GraphPort for CancelOnWalk<'_> {
        fn labels(&self, ids: &[VertexId]) -> PortResult<HashMap<VertexId, VertexLabel>> {
            self.inner.labels(ids)
        }

        fn neighbors(
            &self,
            id: VertexId,
            edge_label: &str,
            direction: TraversalDirection,
        ) -> PortResult<Vec<Neighbor>> {
            self.inner.neighbors(id, edge_label, direction)
        }

        fn properties(
            &self,
            ids: &[VertexId],
            names: &[String],
        ) -> PortResult<HashMap<VertexId, PropertyBundle>> {
            self.inner.properties(ids, names)
        }

        fn walk(&self, ids: &[VertexId], walk: &EdgeWalk) -> PortResult<Vec<WalkRow>> {
            self.walks.set(self.walks.get() + 1);
            self.token.cancel();
            self.inner.walk(ids, walk)
        }
    }

    #[test]
    fn test_recent_messages_cancelled_between_chain_levels() {
        let g = network();
        let token = CancelToken::new();
        let port = CancelOnWalk {
            inner: &g,
            token: token.clone(),
            walks: Cell::new(0),
        };
        // 102 needs two replyOf levels; the token flips during the first.
        let err = recent_messages_with(&port, &EngineConfig::default(), 3, &token).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert_eq!(port.walks.get(), 1);
    }

    #[test]
    fn test_recent_messages_unknown_person() {
        let g = network();
        assert!(matches!(
            recent_messages(&g, &EngineConfig::default(), 999),
            Err(EngineError::NotFound(999))
        ));
    }

    #[test]
    fn test_friends_newest_first() {
        let g = network();
        let out = friends(&g, 1).unwrap();
        let ids: Vec<VertexId> = out.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(out[0].since, Some(day(9)));
        assert_eq!(out[1].last_name, Some(Value::from("Zimmer")));
    }

    #[test]
    fn test_reply_authors_knows_flag() {
        let mut g = network();
        message(&mut g, 104, VertexLabel::Comment, 4, 6);
        message(&mut g, 105, VertexLabel::Comment, 1, 7);
        g.add_edge_named(104, 100, REPLY_OF);
        g.add_edge_named(105, 100, REPLY_OF);

        let out = reply_authors(&g, 100).unwrap();
        let rows: Vec<(VertexId, Option<VertexId>, bool)> = out
            .iter()
            .map(|r| (r.comment, r.author, r.knows_original_author))
            .collect();
        assert_eq!(
            rows,
            vec![(105, Some(1), false), (104, Some(4), false), (101, Some(2), true)]
        );
    }

    #[test]
    fn test_reply_authors_no_replies() {
        let g = network();
        assert!(reply_authors(&g, 103).unwrap().is_empty());
    }
}
