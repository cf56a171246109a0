#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use graph_hop_core::queries::{HAS_CREATOR, IS_LOCATED_IN, KNOWS, REPLY_OF, STUDY_AT, WORK_AT};
use graph_hop_core::{MemoryGraph, PropertyBundle, Value, VertexId, VertexLabel};

pub fn person(g: &mut MemoryGraph, id: VertexId, first: &str, last: &str) {
    g.add_vertex(id, VertexLabel::Person, Some(format!("person:{}", id)));
    g.set_property(id, "firstName", first);
    g.set_property(id, "lastName", last);
    g.set_property(id, "browserUsed", "Firefox");
    g.set_property(id, "email", Value::List(vec![format!("{}@example.org", id)]));
}

pub fn place(g: &mut MemoryGraph, id: VertexId, label: VertexLabel, name: &str) {
    g.add_vertex(id, label, None);
    g.set_property(id, "name", name);
}

fn edge_with(g: &mut MemoryGraph, from: VertexId, to: VertexId, label: &str, name: &str, value: Value) {
    let rt = g.intern_rel_type(label);
    let mut props = PropertyBundle::new();
    props.insert(name.to_string(), value);
    g.add_edge_with_properties(from, to, rt, props);
}

pub fn knows(g: &mut MemoryGraph, a: VertexId, b: VertexId) {
    g.add_edge_named(a, b, KNOWS);
    g.add_edge_named(b, a, KNOWS);
}

/// Small social network rooted at person 1 (Anna Berg).
///
/// ```text
///   1 - 2 - 3 - 5        Karl: 2 (Zimmer), 3 (Adler), 4 (Adler), 5 (Berg)
///    \
///     6 - 4
/// ```
///
/// Person 2 lives in Vienna and studied at TU Wien (2005); person 3 lives in
/// Graz and works at Acme (2010). Post 100 by 2 has reply 101 by 3, which
/// has reply 102 by 5.
pub fn snb_fixture() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    person(&mut g, 1, "Anna", "Berg");
    person(&mut g, 2, "Karl", "Zimmer");
    person(&mut g, 3, "Karl", "Adler");
    person(&mut g, 4, "Karl", "Adler");
    person(&mut g, 5, "Karl", "Berg");
    person(&mut g, 6, "Otto", "Novak");
    knows(&mut g, 1, 2);
    knows(&mut g, 1, 6);
    knows(&mut g, 2, 3);
    knows(&mut g, 6, 4);
    knows(&mut g, 3, 5);

    place(&mut g, 30, VertexLabel::Country, "Austria");
    place(&mut g, 10, VertexLabel::City, "Vienna");
    place(&mut g, 11, VertexLabel::City, "Graz");
    g.add_edge_named(10, 30, IS_LOCATED_IN);
    g.add_edge_named(11, 30, IS_LOCATED_IN);
    g.add_edge_named(2, 10, IS_LOCATED_IN);
    g.add_edge_named(3, 11, IS_LOCATED_IN);

    place(&mut g, 20, VertexLabel::University, "TU Wien");
    g.add_edge_named(20, 10, IS_LOCATED_IN);
    edge_with(&mut g, 2, 20, STUDY_AT, "classYear", Value::Int(2005));

    place(&mut g, 40, VertexLabel::Company, "Acme");
    g.add_edge_named(40, 30, IS_LOCATED_IN);
    edge_with(&mut g, 3, 40, WORK_AT, "workFrom", Value::Int(2010));

    for (id, label, author, secs) in [
        (100, VertexLabel::Post, 2, 1_330_000_000),
        (101, VertexLabel::Comment, 3, 1_330_000_100),
        (102, VertexLabel::Comment, 5, 1_330_000_200),
    ] {
        g.add_vertex(id, label, None);
        g.set_property(id, "content", format!("message {}", id));
        if let Some(date) = chrono::DateTime::from_timestamp(secs, 0) {
            g.set_property(id, "creationDate", date);
        }
        g.add_edge_named(id, author, HAS_CREATOR);
    }
    g.add_edge_named(101, 100, REPLY_OF);
    g.add_edge_named(102, 101, REPLY_OF);
    g
}

/// Persons `0..n` joined by directed `knows` edges.
pub fn graph_from_edges(n: u64, edges: &[(u64, u64)]) -> MemoryGraph {
    let mut g = MemoryGraph::with_capacity(n as usize, edges.len());
    for id in 0..n {
        g.add_vertex(id, VertexLabel::Person, None);
    }
    for &(a, b) in edges {
        g.add_edge_named(a, b, KNOWS);
    }
    g
}

/// Exhaustive BFS distances over outgoing edges, used as the oracle.
pub fn bfs_distances(n: u64, edges: &[(u64, u64)], root: u64) -> HashMap<u64, u32> {
    let mut adj: Vec<Vec<u64>> = vec![Vec::new(); n as usize];
    for &(a, b) in edges {
        adj[a as usize].push(b);
    }
    let mut dist = HashMap::new();
    dist.insert(root, 0u32);
    let mut queue = VecDeque::from([root]);
    while let Some(v) = queue.pop_front() {
        let d = dist[&v];
        for &w in &adj[v as usize] {
            if !dist.contains_key(&w) {
                dist.insert(w, d + 1);
                queue.push_back(w);
            }
        }
    }
    dist
}
