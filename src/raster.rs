//! Rasterizer core: Larrabee-style hierarchical coverage traversal within a
//! tile, and the per-quad pixel back-end invocation.
//!
//! Grounded on `rasterizer.cpp`'s `rasterize_triangle` / `subdivide_tile` /
//! `draw_full_tile` / `draw_partial_tile` state machine. Each level of the
//! traversal re-tests the same trivial accept/reject edge functions
//! ([`TileBinner::classify_region`]) against a quarter-sized region; a
//! region that is neither fully in nor fully out is split into a 4x4 grid
//! of sub-regions and the process repeats until region size reaches 1
//! pixel (`TVT_PIXEL` in the original), where individual sample coverage is
//! tested. The SIMD dual-implementation in the original source has no
//! counterpart here: only the scalar fallback path is ported, since
//! hand-written SIMD intrinsics aren't how this codebase reaches for
//! performance elsewhere.

use crate::bin::{TileBinner, TileCoverage};
use crate::geometry::{project_vertex, TriangleInfo};
use crate::state::Viewport;
use crate::vertex::VsOutput;

/// Number of MSAA sample slots a [`SampleMask`] reserves per covered pixel,
/// regardless of how many samples are actually active for a given draw.
pub const MAX_SAMPLE_COUNT: usize = 4;

/// Fixed sample positions within a pixel, indexed by sample count.
pub fn sample_pattern(count: u32) -> &'static [(f32, f32)] {
    match count {
        1 => &[(0.5, 0.5)],
        2 => &[(0.25, 0.25), (0.75, 0.75)],
        4 => &[(0.375, 0.125), (0.875, 0.375), (0.125, 0.625), (0.625, 0.875)],
        _ => unreachable!("sample count must be validated to 1, 2 or 4 before rasterization"),
    }
}

/// Per-quad (2x2 pixel block) coverage mask: bit `lane * MAX_SAMPLE_COUNT +
/// sample` records whether `sample` of pixel `lane` (lanes ordered
/// top-left, top-right, bottom-left, bottom-right) is covered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct SampleMask(pub u64);

impl SampleMask {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub fn set(&mut self, lane: usize, sample: usize) {
        self.0 |= 1 << (lane * MAX_SAMPLE_COUNT + sample);
    }

    #[inline]
    pub fn is_set(&self, lane: usize, sample: usize) -> bool {
        self.0 & (1 << (lane * MAX_SAMPLE_COUNT + sample)) != 0
    }

    #[inline]
    pub fn lane_mask(&self, lane: usize, sample_count: u32) -> u32 {
        let shift = lane * MAX_SAMPLE_COUNT;
        ((self.0 >> shift) as u32) & ((1 << sample_count) - 1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn full(sample_count: u32) -> Self {
        let mut mask = Self::EMPTY;
        for lane in 0..4 {
            for s in 0..sample_count as usize {
                mask.set(lane, s);
            }
        }
        mask
    }
}

/// A single 2x2-pixel shading quad: the atomic unit of pixel-shader
/// invocation, needed so `ddx`/`ddy` finite differences are always
/// available within the quad.
pub struct Quad {
    /// Pixel coordinates of the quad's top-left lane.
    pub x: i32,
    pub y: i32,
    pub mask: SampleMask,
}

/// Walk a tile's hierarchical coverage traversal, invoking `on_quad` for
/// every 2x2 quad that has at least one covered sample. `tile_x`/`tile_y`
/// are the tile's pixel-space origin; `tile_extent` is how much of the
/// (possibly target-clamped) tile actually exists. `trivial_accept`, when
/// set by the caller's tile bin entry, skips re-deriving the tile-level
/// classification (already known trivially accepted) and goes straight to
/// emitting full-coverage quads.
pub fn rasterize_tile(
    tile_x: i32,
    tile_y: i32,
    tile_extent: (i32, i32),
    tri: &TriangleInfo,
    binner: &TileBinner,
    sample_count: u32,
    trivial_accept: bool,
    on_quad: &mut dyn FnMut(Quad),
) {
    if trivial_accept {
        emit_full_region(tile_x, tile_y, crate::bin::TILE_SIZE, tile_extent, sample_count, on_quad);
    } else {
        subdivide(tile_x, tile_y, crate::bin::TILE_SIZE, tile_extent, binner, tri, sample_count, on_quad);
    }
}

fn subdivide(
    x: i32,
    y: i32,
    size: i32,
    tile_extent: (i32, i32),
    binner: &TileBinner,
    tri: &TriangleInfo,
    sample_count: u32,
    on_quad: &mut dyn FnMut(Quad),
) {
    if x >= tile_extent.0 || y >= tile_extent.1 {
        return;
    }

    match binner.classify_region(x, y, size) {
        TileCoverage::Reject => {}
        TileCoverage::TrivialAccept => {
            emit_full_region(x, y, size, tile_extent, sample_count, on_quad);
        }
        // A 2x2 quad is the atomic unit of shading (needed so ddx/ddy finite
        // differences are always available): once the hierarchy reaches
        // quad granularity, test all four lanes in a single pass and emit
        // at most one quad, rather than recursing to single pixels.
        TileCoverage::NeedsSubdivision if size == 2 => {
            emit_partial_quad(x, y, tile_extent, binner, sample_count, on_quad);
        }
        TileCoverage::NeedsSubdivision => {
            // Every level subdivides 4x4, except the last (region size 4),
            // which splits 2x2 into quads directly so quad-granularity is
            // always reached without ever subdividing below it.
            let (sub, grid) = if size == 4 { (2, 2) } else { (size / 4, 4) };
            for sub_y in 0..grid {
                for sub_x in 0..grid {
                    subdivide(
                        x + sub_x * sub,
                        y + sub_y * sub,
                        sub,
                        tile_extent,
                        binner,
                        tri,
                        sample_count,
                        on_quad,
                    );
                }
            }
        }
    }
}

/// A region the trivial-accept test has already proven lies entirely
/// inside the triangle: every sample of every pixel is covered, so quads
/// can be emitted with a full mask without per-sample edge tests.
fn emit_full_region(
    x: i32,
    y: i32,
    size: i32,
    tile_extent: (i32, i32),
    sample_count: u32,
    on_quad: &mut dyn FnMut(Quad),
) {
    let full = SampleMask::full(sample_count);
    let mut qy = y;
    while qy < y + size {
        if qy >= tile_extent.1 {
            break;
        }
        let mut qx = x;
        while qx < x + size {
            if qx >= tile_extent.0 {
                break;
            }
            on_quad(Quad { x: qx, y: qy, mask: full });
            qx += 2;
        }
        qy += 2;
    }
}

/// A quad the hierarchy could not trivially classify: test every sample of
/// all four lanes individually against the edge functions and emit the quad
/// once with the resulting (possibly empty, possibly partial) mask. Tested
/// as one unit, never per-pixel, so a quad is shaded at most once (the
/// "no double-shading" property) and ddx/ddy always see all four lanes.
fn emit_partial_quad(
    x: i32,
    y: i32,
    tile_extent: (i32, i32),
    binner: &TileBinner,
    sample_count: u32,
    on_quad: &mut dyn FnMut(Quad),
) {
    let pattern = sample_pattern(sample_count);
    let mut mask = SampleMask::EMPTY;
    for lane in 0..4 {
        let px = x + (lane as i32 & 1);
        let py = y + (lane as i32 >> 1);
        if px >= tile_extent.0 || py >= tile_extent.1 {
            continue;
        }
        for (s, &(sx, sy)) in pattern.iter().enumerate() {
            let fx = px as f32 + sx;
            let fy = py as f32 + sy;
            let covered = (0..3).all(|e| binner.edge_value_at_pixel(e, fx, fy) <= 0.0);
            if covered {
                mask.set(lane, s);
            }
        }
    }
    if !mask.is_empty() {
        on_quad(Quad { x, y, mask });
    }
}

/// Bresenham/DDA line rasterization between two already vertex-shaded
/// endpoints. Lines bypass tile binning entirely: a line's bounding box is
/// thin enough that hierarchical subdivision buys nothing, so this walks
/// pixels directly off the larger of `|dx|`/`|dy|`, attribute-interpolating
/// `VsOutput` linearly between the endpoints by fraction of steps taken.
pub fn rasterize_line_segment(
    a: &VsOutput,
    b: &VsOutput,
    viewport: &Viewport,
    on_pixel: &mut dyn FnMut(i32, i32, VsOutput),
) {
    let sa = project_vertex(a, viewport);
    let sb = project_vertex(b, viewport);

    let dx = sb.pos.x - sa.pos.x;
    let dy = sb.pos.y - sa.pos.y;
    let steps = dx.abs().max(dy.abs()).round().max(1.0) as i32;

    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = (sa.pos.x + dx * t).round() as i32;
        let y = (sa.pos.y + dy * t).round() as i32;
        let attrs = VsOutput::barycentric(&sa.attrs, &sb.attrs, &sa.attrs, [1.0 - t, t, 0.0]);
        on_pixel(x, y, attrs);
    }
}
