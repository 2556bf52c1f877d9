//! Geometry setup: clip-space to screen-space projection, vertex reorder,
//! and per-triangle rasterizer info.
//!
//! Grounded on `rasterizer.cpp::compute_triangle_info` and
//! `viewport_and_project_transform`: the vertex with the smallest
//! `|x|+|y|` in clip space becomes `v0` for interpolation precision, edges
//! are expressed as `(a, b, c)` such that signed distance is
//! `a*x + b*y - c`, and `ddx`/`ddy` are the finite-difference registers used
//! to step the `attr/w` interpolation basis and MSAA sample depths across
//! screen space.
//!
//! Attributes are not screen-linear under perspective projection, so
//! `ddx`/`ddy` are computed over `attr/w` (screen-linear) rather than raw
//! `attr`; the pixel back-end unprojects (`VsOutput::unproject_attrs`) after
//! reconstructing a sample's interpolated register file.

use crate::state::Viewport;
use crate::vertex::VsOutput;
use vek::Vec4;

/// Triangles whose twice-signed-area falls below this (in squared screen
/// pixels) are rejected as degenerate rather than only those with an exact
/// zero area, since `1/area2` blows up on near-zero slivers just as badly
/// as on an exact zero.
const MIN_AREA2: f32 = 1e-4;

/// Screen-space (post-viewport) position and interpolation-ready vertex
/// data for one triangle corner.
#[derive(Clone)]
pub struct ScreenVertex {
    /// `(x, y, z, 1/w)` in screen pixels (`x`, `y`), device depth (`z`), and
    /// the reciprocal `w` carried for perspective-correct interpolation.
    pub pos: Vec4<f32>,
    /// Interpolation basis for this corner: register 0 holds `pos` (so
    /// `ddx`/`ddy` step depth and `1/w` alongside everything else); registers
    /// 1.. hold the vertex shader's attributes pre-multiplied by `1/w`
    /// (`VsOutput::project_attrs`), since that product, unlike the raw
    /// attribute, is linear in screen space.
    pub attrs: VsOutput,
}

/// Per-triangle info the rasterizer core and pixel back-end need: edge
/// equations, bounding box, facing, and screen-space derivatives.
pub struct TriangleInfo {
    pub v: [ScreenVertex; 3],
    pub front_face: bool,
    /// `(min_x, min_y, max_x, max_y)` in screen pixels, already clamped to
    /// the render target.
    pub bounding_box: (f32, f32, f32, f32),
    /// Edge `i` separates vertex `i` from vertex `(i+1)%3`; signed distance
    /// of point `(x, y)` from the edge is `a*x + b*y - c`.
    pub edge_factors: [(f32, f32, f32); 3],
    pub ddx: VsOutput,
    pub ddy: VsOutput,
}

/// Perspective-divide and viewport-transform a single vertex, shared by
/// `setup_triangle` and the line rasterizer's endpoint projection.
pub fn project_vertex(v: &VsOutput, viewport: &Viewport) -> ScreenVertex {
    let clip = v.position();
    let inv_w = 1.0 / clip.w;
    let ndc = Vec4::new(clip.x * inv_w, clip.y * inv_w, clip.z * inv_w, inv_w);
    let sx = (ndc.x * 0.5 + 0.5) * viewport.width + viewport.x;
    let sy = (1.0 - (ndc.y * 0.5 + 0.5)) * viewport.height + viewport.y;
    let sz = ndc.z * 0.5 + 0.5;
    ScreenVertex { pos: Vec4::new(sx, sy, sz, inv_w), attrs: v.clone() }
}

/// Project a clipped triangle (clip space, `w` not yet divided out) into
/// screen space via the perspective divide and the bound viewport, then
/// compute its `TriangleInfo`. Returns `None` for degenerate (near-zero-area)
/// triangles: `|area2| < MIN_AREA2`, not just an exact zero, since `1/area2`
/// blows up just as badly on a sliver as on an exact degenerate.
pub fn setup_triangle(verts: &[VsOutput; 3], viewport: &Viewport) -> Option<TriangleInfo> {
    // Reorder so v0 is the vertex nearest the clip-space origin, for
    // interpolation precision (matches the original's min-distance reorder).
    let min_index = (0..3)
        .min_by(|&a, &b| {
            let da = verts[a].position().x.abs() + verts[a].position().y.abs();
            let db = verts[b].position().x.abs() + verts[b].position().y.abs();
            da.partial_cmp(&db).unwrap()
        })
        .unwrap();

    let ordered: [&VsOutput; 3] =
        [&verts[min_index], &verts[(min_index + 1) % 3], &verts[(min_index + 2) % 3]];

    let screen: Vec<ScreenVertex> = ordered.iter().map(|v| project_vertex(v, viewport)).collect();

    let [p0, p1, p2] = [screen[0].pos, screen[1].pos, screen[2].pos];
    let e01 = (p1.x - p0.x, p1.y - p0.y);
    let e02 = (p2.x - p0.x, p2.y - p0.y);
    let area2 = e01.0 * e02.1 - e01.1 * e02.0;

    if area2.abs() < MIN_AREA2 {
        return None;
    }

    let front_face = area2 < 0.0;

    let edge_factors = [
        edge_factor(p0, p1),
        edge_factor(p1, p2),
        edge_factor(p2, p0),
    ];

    let min_x = p0.x.min(p1.x).min(p2.x).max(0.0);
    let min_y = p0.y.min(p1.y).min(p2.y).max(0.0);
    let max_x = p0.x.max(p1.x).max(p2.x).min(viewport.x + viewport.width);
    let max_y = p0.y.max(p1.y).max(p2.y).min(viewport.y + viewport.height);

    // Build the perspective-correct interpolation basis for each corner:
    // position (screen xy, device z, 1/w) in register 0, `attr/w` in the
    // rest. This product, unlike a raw attribute, varies linearly in screen
    // space, so ddx/ddy computed over it (same finite-difference formula
    // `compute_triangle_info` uses) are exact.
    let basis: Vec<VsOutput> = screen
        .iter()
        .map(|s| {
            let mut b = s.attrs.project_attrs(s.pos.w);
            *b.position_mut() = s.pos;
            b
        })
        .collect();

    let inv_area2 = 1.0 / area2;
    let ddx = basis[1].sub(&basis[0]).scale((p2.y - p0.y) * inv_area2)
        .sub(&basis[2].sub(&basis[0]).scale((p1.y - p0.y) * inv_area2));
    let ddy = basis[2].sub(&basis[0]).scale((p1.x - p0.x) * inv_area2)
        .sub(&basis[1].sub(&basis[0]).scale((p2.x - p0.x) * inv_area2));

    let v = [
        ScreenVertex { pos: p0, attrs: basis[0].clone() },
        ScreenVertex { pos: p1, attrs: basis[1].clone() },
        ScreenVertex { pos: p2, attrs: basis[2].clone() },
    ];

    Some(TriangleInfo { v, front_face, bounding_box: (min_x, min_y, max_x, max_y), edge_factors, ddx, ddy })
}

/// `(a, b, c)` such that the signed distance of `(x, y)` from the edge
/// `start -> end` is `a*x + b*y - c`, per `compute_triangle_info`'s
/// `se`/`ee` convention.
fn edge_factor(start: Vec4<f32>, end: Vec4<f32>) -> (f32, f32, f32) {
    let a = start.y - end.y;
    let b = end.x - start.x;
    let c = end.x * start.y - end.y * start.x;
    (a, b, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_verts(points: [(f32, f32); 3]) -> [VsOutput; 3] {
        let mut out: [VsOutput; 3] = Default::default();
        for (i, (x, y)) in points.iter().enumerate() {
            *out[i].position_mut() = Vec4::new(*x, *y, 0.0, 1.0);
        }
        out
    }

    fn full_screen_viewport() -> Viewport {
        Viewport { x: 0.0, y: 0.0, width: 16.0, height: 16.0, min_depth: 0.0, max_depth: 1.0 }
    }

    #[test]
    fn ccw_triangle_is_front_facing() {
        let verts = tri_verts([(-0.8, -0.8), (0.8, -0.8), (0.0, 0.8)]);
        let info = setup_triangle(&verts, &full_screen_viewport()).unwrap();
        assert!(info.front_face);
    }

    #[test]
    fn zero_area_triangle_is_rejected() {
        let verts = tri_verts([(-0.5, 0.0), (0.5, 0.0), (0.0, 0.0)]);
        assert!(setup_triangle(&verts, &full_screen_viewport()).is_none());
    }

    #[test]
    fn near_degenerate_sliver_is_rejected() {
        // Not exactly collinear, but its screen-space area is far below
        // MIN_AREA2: should still be rejected rather than producing a huge
        // 1/area2 and garbage ddx/ddy.
        let verts = tri_verts([(-0.5, 0.0), (0.5, 0.0), (0.0, 1e-8)]);
        assert!(setup_triangle(&verts, &full_screen_viewport()).is_none());
    }

    #[test]
    fn bounding_box_is_clamped_to_viewport() {
        let verts = tri_verts([(-2.0, -2.0), (2.0, -2.0), (0.0, 2.0)]);
        let info = setup_triangle(&verts, &full_screen_viewport()).unwrap();
        assert!(info.bounding_box.0 >= 0.0);
        assert!(info.bounding_box.2 <= 16.0);
    }
}
