mod common;

use std::collections::HashSet;

use graph_hop_core::queries::{person_search_categories, KNOWS};
use graph_hop_core::{
    assemble, expand, hydrate, shortest_path, shortest_path_length, CountingPort, ExpandRequest,
    PathRequest, Predicate, SortKey, VertexId, UNREACHABLE,
};
use proptest::prelude::*;

use common::{bfs_distances, graph_from_edges};

/// (vertex count, directed edges, root, hop bound)
fn random_graph() -> impl Strategy<Value = (u64, Vec<(u64, u64)>, u64, u32)> {
    (2u64..40).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, 0..n), 0..120),
            0..n,
            1u32..8,
        )
    })
}

proptest! {
    #[test]
    fn path_to_self_is_zero((n, edges, root, hops) in random_graph()) {
        let g = graph_from_edges(n, &edges);
        prop_assert_eq!(shortest_path_length(&g, &PathRequest::new(root, root, KNOWS, hops)).unwrap(), 0);
    }

    #[test]
    fn path_length_matches_exhaustive_bfs(
        (n, edges, root, hops) in random_graph(),
        target_seed in any::<u64>(),
    ) {
        let g = graph_from_edges(n, &edges);
        let target = target_seed % n;
        let oracle = bfs_distances(n, &edges, root);
        let expected = match oracle.get(&target) {
            Some(&d) if d <= hops => i64::from(d),
            _ => UNREACHABLE,
        };
        let req = PathRequest::new(root, target, KNOWS, hops);
        prop_assert_eq!(shortest_path_length(&g, &req).unwrap(), expected);

        // A reconstructed path has the same length and only uses real edges.
        let edge_set: HashSet<(u64, u64)> = edges.iter().copied().collect();
        match shortest_path(&g, &req).unwrap() {
            Some(path) => {
                prop_assert_eq!(path.len() as i64 - 1, expected);
                prop_assert_eq!(path[0], root);
                prop_assert_eq!(*path.last().unwrap(), target);
                for pair in path.windows(2) {
                    prop_assert!(edge_set.contains(&(pair[0], pair[1])));
                }
            }
            None => prop_assert_eq!(expected, UNREACHABLE),
        }
    }

    #[test]
    fn buckets_hold_each_vertex_once_at_its_bfs_distance((n, edges, root, hops) in random_graph()) {
        let g = graph_from_edges(n, &edges);
        let result = expand(&g, &ExpandRequest::new(root, KNOWS, hops)).unwrap();
        let oracle = bfs_distances(n, &edges, root);

        let mut seen = HashSet::new();
        for (distance, ids) in result.buckets.iter() {
            for &id in ids {
                prop_assert!(seen.insert(id), "vertex {} reported twice", id);
                prop_assert_eq!(oracle.get(&id).copied(), Some(distance));
            }
        }
        prop_assert!(!seen.contains(&root));

        let expected: HashSet<VertexId> = oracle
            .iter()
            .filter(|(&id, &d)| id != root && d >= 1 && d <= hops)
            .map(|(&id, _)| id)
            .collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn predicate_filters_reports_but_not_reachability(
        (n, edges, root, hops) in random_graph(),
        karls in prop::collection::vec(any::<bool>(), 40),
    ) {
        let mut g = graph_from_edges(n, &edges);
        for id in 0..n {
            let name = if karls[id as usize] { "Karl" } else { "Anna" };
            g.set_property(id, "firstName", name);
        }
        let req = ExpandRequest::new(root, KNOWS, hops).predicate(Predicate::equals("firstName", "Karl"));
        let result = expand(&g, &req).unwrap();
        let oracle = bfs_distances(n, &edges, root);

        let expected: HashSet<VertexId> = oracle
            .iter()
            .filter(|(&id, &d)| id != root && d >= 1 && d <= hops && karls[id as usize])
            .map(|(&id, _)| id)
            .collect();
        let got: HashSet<VertexId> = result.buckets.ids().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn hydration_is_one_round_trip_per_category(
        (n, edges, _root, _hops) in random_graph(),
        picks in prop::collection::vec(any::<u64>(), 1..20),
    ) {
        let g = graph_from_edges(n, &edges);
        let ids: Vec<VertexId> = picks.iter().map(|p| p % n).collect();
        let categories = person_search_categories();
        let port = CountingPort::new(&g);
        let records = hydrate(&port, &ids, &categories).unwrap();
        prop_assert_eq!(port.round_trips().total(), categories.len());
        for id in &ids {
            let record = &records[id];
            prop_assert!(record.single.contains_key("city"));
            prop_assert!(record.repeated.contains_key("universities"));
            prop_assert!(record.repeated.contains_key("companies"));
        }
    }

    #[test]
    fn assembled_output_is_deterministic((n, edges, root, hops) in random_graph()) {
        let g = graph_from_edges(n, &edges);
        let run = || {
            let expansion = expand(&g, &ExpandRequest::new(root, KNOWS, hops)).unwrap();
            let ids: Vec<VertexId> = expansion.buckets.ids().collect();
            let hydrated = hydrate(&g, &ids, &person_search_categories()).unwrap();
            serde_json::to_string(&assemble(&expansion.buckets, &hydrated, &[SortKey::asc("lastName")])).unwrap()
        };
        prop_assert_eq!(run(), run());
    }
}
