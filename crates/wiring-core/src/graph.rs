//! Directed graph kernel with layered topological staging
//!
//! Nodes are interned into an arena (`Vec<N>` plus an index map) and edges
//! are stored as adjacency sets of arena indices. An edge `a -> b` reads
//! "`a` depends on `b`", so `b` is always placed in an earlier stage than `a`.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// Raised when staging stalls with unplaced nodes left over
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cyclic connection in graph: {} node(s) cannot be staged", .remaining.len())]
pub struct GraphCycleError<N: Debug> {
    /// Nodes that could not be placed in any stage
    pub remaining: Vec<N>,
}

/// Directed graph over copyable node handles
#[derive(Debug, Clone)]
pub struct DirectedGraph<N> {
    nodes: Vec<N>,
    index: HashMap<N, usize>,
    targets: Vec<BTreeSet<usize>>,
}

impl<N> DirectedGraph<N>
where
    N: Copy + Eq + Hash + Ord + Debug,
{
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            targets: Vec::new(),
        }
    }

    /// Build a graph from a node list and an edge list
    ///
    /// Edge endpoints that are missing from `nodes` are added as nodes.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = N>,
        edges: impl IntoIterator<Item = (N, N)>,
    ) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        for (source, target) in edges {
            graph.add_edge(source, target);
        }
        graph
    }

    /// Add a node, returning its arena index
    pub fn add_node(&mut self, node: N) -> usize {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(node);
        self.index.insert(node, idx);
        self.targets.push(BTreeSet::new());
        idx
    }

    /// Add a `source -> target` edge; duplicate edges are ignored
    pub fn add_edge(&mut self, source: N, target: N) {
        let s = self.add_node(source);
        let t = self.add_node(target);
        self.targets[s].insert(t);
    }

    pub fn contains_node(&self, node: &N) -> bool {
        self.index.contains_key(node)
    }

    pub fn contains_edge(&self, source: &N, target: &N) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => self.targets[s].contains(&t),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.targets.iter().map(BTreeSet::len).sum()
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// All edges as `(source, target)` pairs
    pub fn edges(&self) -> Vec<(N, N)> {
        self.targets
            .iter()
            .enumerate()
            .flat_map(|(s, targets)| targets.iter().map(move |&t| (self.nodes[s], self.nodes[t])))
            .collect()
    }

    /// Nodes that `node` points at (what it depends on)
    pub fn targets_of(&self, node: &N) -> BTreeSet<N> {
        self.index
            .get(node)
            .map(|&idx| self.targets[idx].iter().map(|&t| self.nodes[t]).collect())
            .unwrap_or_default()
    }

    /// Nodes pointing at `node` (its dependents)
    pub fn sources_of(&self, node: &N) -> BTreeSet<N> {
        let Some(&idx) = self.index.get(node) else {
            return BTreeSet::new();
        };
        self.targets
            .iter()
            .enumerate()
            .filter(|(_, targets)| targets.contains(&idx))
            .map(|(s, _)| self.nodes[s])
            .collect()
    }

    /// Iterate stages lazily
    pub fn stages(&self) -> StageIterator<'_, N> {
        StageIterator::new(self)
    }

    /// Collect every stage, failing on the first stall
    pub fn topological_stages(&self) -> Result<Vec<BTreeSet<N>>, GraphCycleError<N>> {
        self.stages().collect()
    }
}

impl<N> Default for DirectedGraph<N>
where
    N: Copy + Eq + Hash + Ord + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Kahn-style layered iterator over a [`DirectedGraph`]
///
/// Each item is the set of nodes whose every target has already been
/// emitted. Once the frontier runs dry while nodes remain unplaced, the
/// iterator yields a single [`GraphCycleError`] and then stops.
pub struct StageIterator<'g, N> {
    graph: &'g DirectedGraph<N>,
    /// Number of not-yet-placed targets per node
    pending: Vec<usize>,
    /// Reverse adjacency: who depends on each node
    dependents: Vec<Vec<usize>>,
    frontier: Vec<usize>,
    placed: usize,
    done: bool,
}

impl<'g, N> StageIterator<'g, N>
where
    N: Copy + Eq + Hash + Ord + Debug,
{
    fn new(graph: &'g DirectedGraph<N>) -> Self {
        let count = graph.nodes.len();
        let mut dependents = vec![Vec::new(); count];
        let mut pending = vec![0; count];
        for (source, targets) in graph.targets.iter().enumerate() {
            pending[source] = targets.len();
            for &target in targets {
                dependents[target].push(source);
            }
        }
        let frontier = (0..count).filter(|&idx| pending[idx] == 0).collect();
        Self {
            graph,
            pending,
            dependents,
            frontier,
            placed: 0,
            done: false,
        }
    }
}

impl<N> Iterator for StageIterator<'_, N>
where
    N: Copy + Eq + Hash + Ord + Debug,
{
    type Item = Result<BTreeSet<N>, GraphCycleError<N>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.placed == self.graph.nodes.len() {
            return None;
        }

        if self.frontier.is_empty() {
            self.done = true;
            let remaining = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, left)| **left > 0)
                .map(|(idx, _)| self.graph.nodes[idx])
                .collect();
            return Some(Err(GraphCycleError { remaining }));
        }

        let stage = std::mem::take(&mut self.frontier);
        for &node in &stage {
            for &dependent in &self.dependents[node] {
                self.pending[dependent] -= 1;
                if self.pending[dependent] == 0 {
                    self.frontier.push(dependent);
                }
            }
        }
        self.placed += stage.len();

        Some(Ok(stage.into_iter().map(|idx| self.graph.nodes[idx]).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[u32]) -> BTreeSet<u32> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_new_graph() {
        let graph: DirectedGraph<u32> = DirectedGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.topological_stages().unwrap().len(), 0);
    }

    #[test]
    fn test_add_edge_adds_nodes() {
        let mut graph = DirectedGraph::new();
        graph.add_edge(1u32, 2);
        graph.add_edge(1, 2);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge(&1, &2));
        assert!(!graph.contains_edge(&2, &1));
    }

    #[test]
    fn test_targets_and_sources() {
        let graph = DirectedGraph::from_parts([1u32, 2, 3], [(1, 2), (1, 3), (2, 3)]);

        assert_eq!(graph.targets_of(&1), set(&[2, 3]));
        assert_eq!(graph.sources_of(&3), set(&[1, 2]));
        assert!(graph.targets_of(&42).is_empty());
    }

    #[test]
    fn test_independent_nodes_share_stage() {
        let graph = DirectedGraph::from_parts([1u32, 2, 3], []);
        let stages = graph.topological_stages().unwrap();

        assert_eq!(stages, vec![set(&[1, 2, 3])]);
    }

    #[test]
    fn test_diamond_layering() {
        // 4 depends on 2 and 3, which both depend on 1
        let graph = DirectedGraph::from_parts([1u32, 2, 3, 4], [(4, 2), (4, 3), (2, 1), (3, 1)]);
        let stages = graph.topological_stages().unwrap();

        assert_eq!(stages, vec![set(&[1]), set(&[2, 3]), set(&[4])]);
    }

    #[test]
    fn test_targets_always_in_earlier_stage() {
        let edges = [(5u32, 4), (4, 3), (3, 1), (5, 2), (2, 1), (6, 1)];
        let graph = DirectedGraph::from_parts(1u32..=6, edges);
        let stages = graph.topological_stages().unwrap();

        let stage_of = |node: u32| stages.iter().position(|s| s.contains(&node)).unwrap();
        for (source, target) in graph.edges() {
            assert!(stage_of(target) < stage_of(source));
        }
    }

    #[test]
    fn test_two_node_cycle() {
        let graph = DirectedGraph::from_parts([1u32, 2], [(1, 2), (2, 1)]);
        let result = graph.topological_stages();

        let err = result.unwrap_err();
        assert_eq!(err.remaining, vec![1, 2]);
        assert!(err.to_string().contains("Cyclic connection"));
    }

    #[test]
    fn test_cycle_after_valid_prefix() {
        // 0 is placeable, then 1 -> 2 -> 3 -> 1 stalls
        let graph = DirectedGraph::from_parts([0u32, 1, 2, 3], [(1, 2), (2, 3), (3, 1), (1, 0)]);
        let mut stages = graph.stages();

        assert_eq!(stages.next().unwrap().unwrap(), set(&[0]));
        assert!(stages.next().unwrap().is_err());
        assert!(stages.next().is_none());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let graph = DirectedGraph::from_parts([7u32], [(7, 7)]);
        assert!(graph.topological_stages().is_err());
    }
}
