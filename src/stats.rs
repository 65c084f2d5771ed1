use std::fmt::Display;

use crate::util::Stats;

/// Traversal counters, one sample per step tagged with the number of
/// active lanes at that step. The SIMD width of every sample is 8.
///
/// The plain entry points feed a throwaway instance, so recording costs
/// nothing observable there; the `*_with_stats` entry points route the
/// counters to the embedder.
#[derive(Clone, Debug, Default)]
pub struct TraversalStats {
    /// Inner nodes descended into.
    pub trav_nodes: Stats,
    /// Leaves handed to the primitive intersector.
    pub trav_leaves: Stats,
    /// Primitives tested by the intersector.
    pub trav_prims: Stats,
}

impl TraversalStats {
    pub const WIDTH: usize = 8;

    pub fn new() -> TraversalStats {
        TraversalStats::default()
    }
}

impl Display for TraversalStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Nodes visited (active lanes): {}", self.trav_nodes)?;
        writeln!(f, "Leaves visited (active lanes): {}", self.trav_leaves)?;
        write!(f, "Primitives tested (active lanes): {}", self.trav_prims)
    }
}
