//! Directed dependency graph with bounded cycle enumeration.
//!
//! Cycles are never stored in the graph itself; [`DepGraph::cycles`]
//! enumerates them on demand.

use std::collections::{BTreeMap, BTreeSet};

use crate::lex::ImportKind;

/// Upper bound on enumerated cycles, guarding against dense graphs.
const MAX_CYCLES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: ImportKind,
    pub line: usize,
}

/// Adjacency-list graph over file paths (or autoload names).
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
    edges: Vec<Edge>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: &str) {
        self.adjacency.entry(node.to_string()).or_default();
    }

    pub fn add_edge(&mut self, from: &str, to: &str, kind: ImportKind, line: usize) {
        self.add_node(to);
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            line,
        });
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    /// All recorded edges, sorted.
    pub fn edges(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.iter().collect();
        edges.sort();
        edges
    }

    /// First recorded edge between two nodes.
    pub fn edge(&self, from: &str, to: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.from == from && e.to == to)
            .min_by_key(|e| e.line)
    }

    pub fn successors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(node)
            .into_iter()
            .flat_map(|s| s.iter().map(String::as_str))
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.adjacency.get(from).is_some_and(|s| s.contains(to))
    }

    /// Efferent coupling: distinct nodes this one depends on.
    pub fn out_degree(&self, node: &str) -> usize {
        self.adjacency.get(node).map(|s| s.len()).unwrap_or(0)
    }

    /// Afferent coupling per node: distinct nodes depending on it.
    pub fn in_degrees(&self) -> BTreeMap<&str, usize> {
        let mut counts: BTreeMap<&str, usize> = self.nodes().map(|n| (n, 0)).collect();
        for targets in self.adjacency.values() {
            for t in targets {
                if let Some(c) = counts.get_mut(t.as_str()) {
                    *c += 1;
                }
            }
        }
        counts
    }

    /// Elementary cycles of length 2..=`max_depth`, each reported once and
    /// rotated to start at its smallest node. A cycle whose node set
    /// strictly contains another reported cycle's node set is dropped, as
    /// are cycles over the same node set in a different order.
    pub fn cycles(&self, max_depth: usize) -> Vec<Vec<String>> {
        let mut found: Vec<Vec<String>> = Vec::new();
        let mut seen_sets: BTreeSet<Vec<String>> = BTreeSet::new();

        for start in self.adjacency.keys() {
            let mut path = vec![start.clone()];
            self.search(start, start, max_depth, &mut path, &mut found, &mut seen_sets);
            if found.len() >= MAX_CYCLES {
                break;
            }
        }

        let sets: Vec<BTreeSet<&String>> = found.iter().map(|c| c.iter().collect()).collect();
        let mut minimal: Vec<Vec<String>> = found
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                !sets
                    .iter()
                    .enumerate()
                    .any(|(j, other)| *i != j && other.len() < sets[*i].len() && other.is_subset(&sets[*i]))
            })
            .map(|(_, c)| c.clone())
            .collect();
        minimal.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        minimal
    }

    fn search(
        &self,
        start: &str,
        node: &str,
        max_depth: usize,
        path: &mut Vec<String>,
        found: &mut Vec<Vec<String>>,
        seen_sets: &mut BTreeSet<Vec<String>>,
    ) {
        if found.len() >= MAX_CYCLES {
            return;
        }
        for next in self.successors(node) {
            if next == start {
                if path.len() >= 2 {
                    let mut key = path.clone();
                    key.sort();
                    if seen_sets.insert(key) {
                        found.push(path.clone());
                    }
                }
                continue;
            }
            // Only visit nodes greater than the start so each cycle is
            // found from its smallest member.
            if next < start || path.len() >= max_depth || path.iter().any(|p| p == next) {
                continue;
            }
            path.push(next.to_string());
            self.search(start, next, max_depth, path, found, seen_sets);
            path.pop();
        }
    }
}

/// Deterministic topological order. At each step the first node (in the
/// given order) whose dependencies are all placed is emitted; nodes left
/// over by a cycle are appended in the given order. Returns the order and
/// whether every node was placed by dependency.
pub fn topo_order(order: &[String], deps: &BTreeMap<String, BTreeSet<String>>) -> (Vec<String>, bool) {
    let known: BTreeSet<&String> = order.iter().collect();
    let mut placed: Vec<String> = Vec::with_capacity(order.len());
    let mut placed_set: BTreeSet<&str> = BTreeSet::new();

    loop {
        let next = order.iter().find(|name| {
            !placed_set.contains(name.as_str())
                && deps
                    .get(*name)
                    .map(|d| {
                        d.iter()
                            .filter(|dep| known.contains(dep))
                            .all(|dep| placed_set.contains(dep.as_str()))
                    })
                    .unwrap_or(true)
        });
        match next {
            Some(name) => {
                placed.push(name.clone());
                placed_set.insert(name.as_str());
            }
            None => break,
        }
    }

    let complete = placed.len() == order.len();
    for name in order {
        if !placed_set.contains(name.as_str()) {
            placed.push(name.clone());
        }
    }
    (placed, complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DepGraph {
        let mut g = DepGraph::new();
        for (from, to) in edges {
            g.add_edge(from, to, ImportKind::Preload, 1);
        }
        g
    }

    #[test]
    fn test_two_cycle_reported_once() {
        let g = graph(&[("a.gd", "b.gd"), ("b.gd", "a.gd")]);
        assert_eq!(g.cycles(10), vec![vec!["a.gd".to_string(), "b.gd".to_string()]]);
    }

    #[test]
    fn test_superset_cycles_are_dropped() {
        // a <-> b plus a -> b -> c -> a
        let g = graph(&[("a", "b"), ("b", "a"), ("b", "c"), ("c", "a")]);
        let cycles = g.cycles(10);
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn test_depth_limit() {
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")]);
        assert!(g.cycles(3).is_empty());
        assert_eq!(g.cycles(4).len(), 1);
    }

    #[test]
    fn test_disjoint_cycles() {
        let g = graph(&[("a", "b"), ("b", "a"), ("c", "d"), ("d", "e"), ("e", "c")]);
        let cycles = g.cycles(10);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[1], vec!["c", "d", "e"]);
    }

    #[test]
    fn test_degrees() {
        let g = graph(&[("ui", "sim"), ("game", "sim"), ("ui", "game")]);
        assert_eq!(g.out_degree("ui"), 2);
        assert_eq!(g.in_degrees()["sim"], 2);
        assert_eq!(g.in_degrees()["ui"], 0);
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn deps(list: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_topo_order() {
        let order = names(&["Audio", "Settings", "Main"]);
        let d = deps(&[("Audio", &["Settings"]), ("Main", &["Audio", "Settings"])]);
        let (result, complete) = topo_order(&order, &d);
        assert_eq!(result, names(&["Settings", "Audio", "Main"]));
        assert!(complete);
    }

    #[test]
    fn test_topo_order_with_cycle_appends_rest() {
        let order = names(&["Audio", "Settings", "Main"]);
        let d = deps(&[
            ("Audio", &["Settings", "Main"]),
            ("Main", &["Audio", "Settings"]),
        ]);
        let (result, complete) = topo_order(&order, &d);
        assert_eq!(result, names(&["Settings", "Audio", "Main"]));
        assert!(!complete);
    }
}
