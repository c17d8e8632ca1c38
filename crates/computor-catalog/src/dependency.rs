//! Dependency graph maintenance: normalizing `meta.testDependencies`
//! into `ExampleDependency` rows, and cycle detection over the
//! transitive closure via DFS in application memory (the design notes
//! either DFS or a recursive-closure query is acceptable; DFS is used
//! here since the graph is already loaded for planning in the common
//! case).

use std::collections::{HashMap, HashSet};

use computor_core::error::ComputorError;
use uuid::Uuid;

/// An adjacency view of `example_dependency` rows: `example_id ->
/// [depends_id]`. Built once per check/plan from a DB query.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    edges: HashMap<Uuid, Vec<Uuid>>,
}

impl DependencyGraph {
    pub fn from_edges(edges: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (from, to) in edges {
            map.entry(from).or_default().push(to);
        }
        Self { edges: map }
    }

    pub fn add_edge(&mut self, from: Uuid, to: Uuid) {
        self.edges.entry(from).or_default().push(to);
    }

    fn neighbors(&self, node: Uuid) -> &[Uuid] {
        self.edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Would inserting `example_id -> depends_id` create a cycle in
    /// the transitive closure? `example_id == depends_id` is itself
    /// already a cycle (§3 invariant).
    pub fn would_cycle(&self, example_id: Uuid, depends_id: Uuid) -> bool {
        if example_id == depends_id {
            return true;
        }
        // A cycle is created iff `example_id` is reachable from
        // `depends_id` in the existing graph.
        self.is_reachable(depends_id, example_id)
    }

    fn is_reachable(&self, from: Uuid, to: Uuid) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.extend(self.neighbors(node).iter().copied());
        }
        false
    }

    /// Validates the whole graph has no cycle (used after bulk loads,
    /// e.g. catalog synchronization of a multi-example archive).
    pub fn check_acyclic(&self) -> Result<(), ComputorError> {
        let mut visiting = HashSet::new();
        let mut done = HashSet::new();

        for &node in self.edges.keys() {
            if !done.contains(&node) && self.has_cycle_from(node, &mut visiting, &mut done) {
                return Err(ComputorError::DependencyCycle(format!(
                    "cycle detected reachable from example {node}"
                )));
            }
        }
        Ok(())
    }

    fn has_cycle_from(
        &self,
        node: Uuid,
        visiting: &mut HashSet<Uuid>,
        done: &mut HashSet<Uuid>,
    ) -> bool {
        if done.contains(&node) {
            return false;
        }
        if !visiting.insert(node) {
            return true;
        }
        for &next in self.neighbors(node) {
            if self.has_cycle_from(next, visiting, done) {
                return true;
            }
        }
        visiting.remove(&node);
        done.insert(node);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_direct_cycle() {
        let a = Uuid::new_v4();
        assert!(DependencyGraph::default().would_cycle(a, a));
    }

    #[test]
    fn detects_transitive_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let graph = DependencyGraph::from_edges([(a, b), (b, c)]);
        // a -> b -> c, now would c -> a create a cycle?
        assert!(graph.would_cycle(c, a));
        assert!(!graph.would_cycle(a, c));
    }

    #[test]
    fn acyclic_graph_passes_check() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let graph = DependencyGraph::from_edges([(a, b), (b, c)]);
        assert!(graph.check_acyclic().is_ok());
    }

    #[test]
    fn cyclic_graph_fails_check() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let graph = DependencyGraph::from_edges([(a, b), (b, c), (c, a)]);
        assert!(graph.check_acyclic().is_err());
    }
}
