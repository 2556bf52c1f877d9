//! Tile binner: decides, for every 64x64 tile a triangle's bounding box
//! overlaps, whether the tile is trivially rejected, trivially accepted, or
//! needs the hierarchical rasterizer to subdivide it.
//!
//! The trivial accept/reject test is ported directly from
//! `rasterizer.cpp::threaded_dispatch_primitive`: for an edge with factors
//! `(a, b, c)` (see `geometry::setup_triangle`), stepping a whole tile in
//! `x`/`y` changes the edge value by `step_x = TILE * a`, `step_y = TILE *
//! b`. The corner of the tile closest to being outside the edge is offset
//! by `mark = (a > 0, b > 0)` tile-widths; evaluating the edge there gives
//! the tile's worst-case (most-positive) value. A tile is rejected if any
//! edge's worst-case value is positive (`evalue(tx, ty) > 0`); it is
//! trivially accepted only if every edge's value, even at the
//! *best*-case corner (`rej_to_acc` away from worst-case), stays
//! non-positive.

pub const TILE_SIZE: i32 = 64;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileCoverage {
    Reject,
    TrivialAccept,
    NeedsSubdivision,
}

struct EdgeTileTest {
    step_x: f32,
    step_y: f32,
    rej_to_acc: f32,
    mark_x: f32,
    mark_y: f32,
    a: f32,
    b: f32,
    c: f32,
}

impl EdgeTileTest {
    fn new((a, b, c): (f32, f32, f32)) -> Self {
        let step_x = TILE_SIZE as f32 * a;
        let step_y = TILE_SIZE as f32 * b;
        let rej_to_acc = -step_x.abs() - step_y.abs();
        Self { step_x, step_y, rej_to_acc, mark_x: if a > 0.0 { 1.0 } else { 0.0 }, mark_y: if b > 0.0 { 1.0 } else { 0.0 }, a, b, c }
    }

    /// Worst-case signed value of the edge function over the tile whose
    /// lower-left corner is at tile coordinates `(tx, ty)` (in tile units,
    /// not pixels). Positive means the tile is fully outside this edge.
    #[inline]
    fn evalue(&self, tx: i32, ty: i32) -> f32 {
        let x = (tx as f32 + self.mark_x) * self.step_x;
        let y = (ty as f32 + self.mark_y) * self.step_y;
        self.c - (x + y)
    }
}

pub struct TileBinner {
    edges: [EdgeTileTest; 3],
}

impl TileBinner {
    pub fn new(edge_factors: [(f32, f32, f32); 3]) -> Self {
        Self { edges: edge_factors.map(EdgeTileTest::new) }
    }

    pub fn classify(&self, tx: i32, ty: i32) -> TileCoverage {
        let mut accept = true;
        for edge in &self.edges {
            let value = edge.evalue(tx, ty);
            if value > 0.0 {
                return TileCoverage::Reject;
            }
            if edge.rej_to_acc < value {
                accept = false;
            }
        }
        if accept {
            TileCoverage::TrivialAccept
        } else {
            TileCoverage::NeedsSubdivision
        }
    }

    /// Raw edge evaluation at an arbitrary pixel position, used by the
    /// hierarchical rasterizer once it has descended below tile
    /// granularity.
    #[inline]
    pub fn edge_value_at_pixel(&self, edge: usize, x: f32, y: f32) -> f32 {
        let e = &self.edges[edge];
        e.c - (e.a * x + e.b * y)
    }

    /// Same trivial-accept/reject test as [`Self::classify`], generalized to
    /// an arbitrary square region of side `size` pixels whose lower-left
    /// corner is at pixel coordinates `(x, y)`. This is what lets the
    /// hierarchical rasterizer core in `raster.rs` reuse one test at every
    /// level of its 64 -> 16 -> 4 -> 1 subdivision.
    pub fn classify_region(&self, x: i32, y: i32, size: i32) -> TileCoverage {
        let mut accept = true;
        for edge in &self.edges {
            let step_x = size as f32 * edge.a;
            let step_y = size as f32 * edge.b;
            let rej_to_acc = -step_x.abs() - step_y.abs();
            let mark_x = if edge.a > 0.0 { 1.0 } else { 0.0 };
            let mark_y = if edge.b > 0.0 { 1.0 } else { 0.0 };
            let value = edge.c - ((x as f32 + mark_x * size as f32) * edge.a + (y as f32 + mark_y * size as f32) * edge.b);
            if value > 0.0 {
                return TileCoverage::Reject;
            }
            if rej_to_acc < value {
                accept = false;
            }
        }
        if accept {
            TileCoverage::TrivialAccept
        } else {
            TileCoverage::NeedsSubdivision
        }
    }
}

/// Pack a `(primitive_id, trivial_accept)` pair into the single `u32` a
/// tile's bin stores per entry, per `threaded_dispatch_primitive`'s
/// `(primitive_id << 1) | trivial_accept` tagging.
#[inline]
pub fn pack_bin_entry(primitive_id: u32, trivial_accept: bool) -> u32 {
    (primitive_id << 1) | (trivial_accept as u32)
}

/// Inverse of [`pack_bin_entry`].
#[inline]
pub fn unpack_bin_entry(entry: u32) -> (u32, bool) {
    (entry >> 1, entry & 1 != 0)
}

/// Per-tile bins of the primitives a draw call's binning pass found
/// overlapping each tile, each entry tagged with whether the tile was
/// trivially accepted for that primitive (skipping the hierarchical
/// re-classification `raster::rasterize_tile` would otherwise redo).
///
/// Primitives are inserted in submission order, so each tile's bin is
/// already sorted ascending by primitive id without an explicit sort pass.
pub struct TileBins {
    tiles_x: i32,
    tiles_y: i32,
    bins: Vec<Vec<u32>>,
}

impl TileBins {
    pub fn new(tiles_x: i32, tiles_y: i32) -> Self {
        Self { tiles_x, tiles_y, bins: vec![Vec::new(); (tiles_x * tiles_y).max(0) as usize] }
    }

    #[inline]
    fn index(&self, tx: i32, ty: i32) -> usize {
        (ty * self.tiles_x + tx) as usize
    }

    /// Classify `primitive_id`'s binner against every tile its bounding box
    /// overlaps, appending a packed bin entry to each tile it is not
    /// rejected from.
    pub fn insert(&mut self, primitive_id: u32, binner: &TileBinner, bounding_box: (f32, f32, f32, f32)) {
        let (tx0, ty0, tx1, ty1) = tile_range(bounding_box, self.tiles_x, self.tiles_y);
        for ty in ty0..ty1 {
            for tx in tx0..tx1 {
                let entry = match binner.classify(tx, ty) {
                    TileCoverage::Reject => continue,
                    TileCoverage::TrivialAccept => pack_bin_entry(primitive_id, true),
                    TileCoverage::NeedsSubdivision => pack_bin_entry(primitive_id, false),
                };
                let idx = self.index(tx, ty);
                self.bins[idx].push(entry);
            }
        }
    }

    /// Packed `(primitive_id, trivial_accept)` entries for tile `(tx, ty)`,
    /// ascending by primitive id.
    pub fn entries(&self, tx: i32, ty: i32) -> &[u32] {
        &self.bins[self.index(tx, ty)]
    }

    pub fn tiles_x(&self) -> i32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> i32 {
        self.tiles_y
    }

    /// Every `(tx, ty)` tile coordinate whose bin is non-empty, in row-major
    /// order, so the renderer's tile dispatch can skip tiles no primitive
    /// touched.
    pub fn occupied_tiles(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.bins.iter().enumerate().filter(|(_, b)| !b.is_empty()).map(move |(i, _)| {
            let i = i as i32;
            (i % self.tiles_x, i / self.tiles_x)
        })
    }
}

/// Bounding-box-to-tile-range conversion shared by the binner and the
/// per-draw dispatch loop.
pub fn tile_range(bounding_box: (f32, f32, f32, f32), tiles_x: i32, tiles_y: i32) -> (i32, i32, i32, i32) {
    let (min_x, min_y, max_x, max_y) = bounding_box;
    let tx0 = ((min_x / TILE_SIZE as f32).floor() as i32).max(0);
    let ty0 = ((min_y / TILE_SIZE as f32).floor() as i32).max(0);
    let tx1 = ((max_x / TILE_SIZE as f32).ceil() as i32).min(tiles_x);
    let ty1 = ((max_y / TILE_SIZE as f32).ceil() as i32).min(tiles_y);
    (tx0, ty0, tx1, ty1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_fully_inside_huge_triangle_is_trivially_accepted() {
        // Edge factors for a triangle covering the whole first-quadrant plane
        // far beyond any reasonable tile range: a=0,b=1,c=huge etc. Instead,
        // synthesize three half-planes whose intersection contains tile (1,1).
        let edges = [
            (1.0, 0.0, 1000.0),  // x <= 1000
            (-1.0, 0.0, 1000.0), // x >= -1000
            (0.0, 1.0, 1000.0),  // y <= 1000
        ];
        let binner = TileBinner::new(edges);
        assert_eq!(binner.classify(1, 1), TileCoverage::TrivialAccept);
    }

    #[test]
    fn tile_outside_bounding_plane_is_rejected() {
        let edges = [(1.0, 0.0, 10.0), (-1.0, 0.0, 1000.0), (0.0, 1.0, 1000.0)];
        let binner = TileBinner::new(edges);
        // Tile far to the right: x well beyond 10, so first edge rejects.
        assert_eq!(binner.classify(20, 0), TileCoverage::Reject);
    }

    #[test]
    fn tile_range_clamps_to_target() {
        let r = tile_range((-10.0, -10.0, 1000.0, 1000.0), 4, 4);
        assert_eq!(r, (0, 0, 4, 4));
    }

    #[test]
    fn bin_entry_packs_and_unpacks() {
        assert_eq!(unpack_bin_entry(pack_bin_entry(7, true)), (7, true));
        assert_eq!(unpack_bin_entry(pack_bin_entry(7, false)), (7, false));
    }

    #[test]
    fn tile_bins_insert_in_ascending_primitive_order() {
        let edges = [(1.0, 0.0, 1000.0), (-1.0, 0.0, 1000.0), (0.0, 1.0, 1000.0)];
        let binner = TileBinner::new(edges);
        let mut bins = TileBins::new(2, 2);
        bins.insert(0, &binner, (0.0, 0.0, 10.0, 10.0));
        bins.insert(1, &binner, (0.0, 0.0, 10.0, 10.0));
        let entries = bins.entries(0, 0);
        assert_eq!(entries.iter().map(|&e| unpack_bin_entry(e).0).collect::<Vec<_>>(), vec![0, 1]);
        assert!(bins.entries(1, 1).is_empty());
        assert_eq!(bins.occupied_tiles().collect::<Vec<_>>(), vec![(0, 0)]);
    }
}
