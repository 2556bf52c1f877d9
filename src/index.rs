//! Index fetcher: turns a draw call's `(topology, base_vertex, start_index,
//! prim_count)` plus an optional index buffer into the vertex-index triples
//! the vertex cache should pull, in winding-correct order.
//!
//! Grounded on the original implementation's `index_fetcher::update()` /
//! `fetch_indexes()`: stride is chosen from the index format at bind time,
//! not re-matched per primitive, and `base_vertex` is added once to the
//! unbiased index range rather than to every fetched index.

use crate::primitive::PrimitiveTopology;

/// Width of each element in a bound index buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    const fn stride(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// A bound index buffer, referenced by byte slice rather than a typed
/// resource handle (resource management is out of scope for this core).
pub struct IndexBuffer<'a> {
    pub data: &'a [u8],
    pub format: IndexFormat,
}

impl<'a> IndexBuffer<'a> {
    #[inline]
    fn read(&self, element_index: usize) -> u32 {
        let stride = self.format.stride();
        let offset = element_index * stride;
        match self.format {
            IndexFormat::U16 => {
                u16::from_ne_bytes([self.data[offset], self.data[offset + 1]]) as u32
            }
            IndexFormat::U32 => u32::from_ne_bytes([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                self.data[offset + 3],
            ]),
        }
    }
}

/// Vertex indices for a single fetched primitive, in the order the
/// rasterizer's edge-factor convention expects.
pub type PrimitiveIndices = [u32; 3];

/// The unbiased (`base_vertex` not yet applied) minimum/maximum vertex
/// index touched by a fetch, reported so the vertex cache knows how large a
/// working set to prepare.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndexRange {
    pub min: u32,
    pub max: u32,
}

pub struct IndexFetcher<'a> {
    topology: PrimitiveTopology,
    base_vertex: i32,
    start_index: u32,
    prim_count: u32,
    index_buffer: Option<IndexBuffer<'a>>,
}

impl<'a> IndexFetcher<'a> {
    pub fn new(
        topology: PrimitiveTopology,
        base_vertex: i32,
        start_index: u32,
        prim_count: u32,
        index_buffer: Option<IndexBuffer<'a>>,
    ) -> Self {
        Self { topology, base_vertex, start_index, prim_count, index_buffer }
    }

    /// Fetch every primitive's vertex indices plus the unbiased index range
    /// touched by the draw. For triangle lists the three indices are
    /// returned as bound; for triangle strips, indices 0 and 2 are swapped
    /// on odd primitive ids so winding stays consistent regardless of which
    /// triangle of the strip is being drawn (matches `fetch_indexes`'s
    /// handling of `primitive_topology::triangle_strip`).
    pub fn fetch_all(&self) -> (Vec<PrimitiveIndices>, IndexRange) {
        let mut out = Vec::with_capacity(self.prim_count as usize);
        let mut min = u32::MAX;
        let mut max = 0u32;

        for prim_id in 0..self.prim_count {
            let mut ids = self.raw_ids(prim_id);

            if self.topology.is_strip() && prim_id % 2 == 1 {
                ids.swap(0, 2);
            }

            for &id in &ids {
                min = min.min(id);
                max = max.max(id);
            }
            out.push(ids);
        }

        if out.is_empty() {
            min = 0;
            max = 0;
        }

        (out, IndexRange { min, max: max.max(min) })
    }

    /// Raw (pre-strip-swap) vertex ids for primitive `prim_id`, relative to
    /// `start_index` and with `base_vertex` already folded in: unindexed
    /// draws read straight through, indexed draws go through the bound
    /// index buffer first.
    fn raw_ids(&self, prim_id: u32) -> [u32; 3] {
        let size = self.topology.primitive_size();
        let first = if self.topology.is_strip() {
            self.start_index + prim_id
        } else {
            self.start_index + prim_id * size as u32
        };

        let mut ids = [0u32; 3];
        for i in 0..size {
            let element_index = (first as usize) + i;
            let vertex_index = match &self.index_buffer {
                Some(ib) => ib.read(element_index),
                None => element_index as u32,
            };
            ids[i] = (vertex_index as i64 + self.base_vertex as i64) as u32;
        }
        // Lines only use the first two slots; leave the third as a repeat of
        // the second so downstream code that always reads 3 slots stays safe.
        if size == 2 {
            ids[2] = ids[1];
        }
        ids
    }
}
