//! Vertex cache: ensures each unique vertex index is shaded exactly once
//! per draw call, however many primitives reference it.
//!
//! Grounded on the contract implied by `rasterizer.cpp`'s
//! `vert_cache_->prepare_vertices()` call plus this core's own testable
//! property "vertex cache reuse" (spec §8 scenario 6): a shared index across
//! several primitives must produce exactly one vertex-shader invocation.

use crate::primitive::{ClippedVertexPool, VertexHandle};
use crate::vertex::VsOutput;
use fxhash::FxHashMap;

/// Maps raw vertex indices to their shaded `VsOutput` slot for the
/// lifetime of a single draw call.
#[derive(Default)]
pub struct VertexCache {
    slots: FxHashMap<u32, VertexHandle>,
}

impl VertexCache {
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Resolve `index`, invoking `shade` only the first time this index is
    /// seen during the current draw call.
    pub fn resolve<F>(&mut self, index: u32, pool: &mut ClippedVertexPool, shade: F) -> VertexHandle
    where
        F: FnOnce() -> VsOutput,
    {
        *self.slots.entry(index).or_insert_with(|| pool.push(shade()))
    }

    /// Collect the set of unique indices referenced by `indices`, in first-
    /// seen order, so the vertex shading stage can be parallelized over a
    /// flat array of work items instead of walking primitives directly.
    pub fn unique_indices(indices: impl IntoIterator<Item = u32>) -> Vec<u32> {
        let mut seen = FxHashMap::default();
        let mut out = Vec::new();
        for idx in indices {
            if seen.insert(idx, ()).is_none() {
                out.push(idx);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn shared_index_shades_once() {
        let mut cache = VertexCache::default();
        let mut pool = ClippedVertexPool::default();
        let invocations = Cell::new(0);

        let shade = || {
            invocations.set(invocations.get() + 1);
            VsOutput::default()
        };

        // Two triangles sharing index 4, referenced 6 times total.
        let indices = [0u32, 1, 4, 4, 2, 4, 1, 3, 4, 4, 5, 4];
        for &i in &indices {
            cache.resolve(i, &mut pool, shade);
        }

        assert_eq!(invocations.get(), 6); // one per unique index: 0,1,4,2,3,5
        assert_eq!(pool.len(), 6);
    }

    #[test]
    fn unique_indices_preserves_first_seen_order() {
        let u = VertexCache::unique_indices([3, 1, 3, 2, 1, 0]);
        assert_eq!(u, vec![3, 1, 2, 0]);
    }
}
