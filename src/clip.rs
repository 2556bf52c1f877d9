//! Frustum clipping.
//!
//! Clips a triangle's three clip-space vertices against the seven canonical
//! clip planes (`w >= epsilon`, `-w <= x <= w`, `-w <= y <= w`, `0 <= z <= w`,
//! the last written as its two one-sided halves `z >= 0` and `z <= w`) with
//! Sutherland-Hodgman, re-triangulating the resulting convex polygon as a
//! fan. User clip planes are not modelled.

use crate::interpolate::Interpolate;
use crate::vertex::VsOutput;
use vek::Vec4;

/// One of the six frustum clip planes, expressed as a signed-distance
/// function of clip-space position. A vertex is inside the plane when the
/// distance is `>= 0`.
#[derive(Copy, Clone)]
enum Plane {
    PosW,
    NegX,
    PosX,
    NegY,
    PosY,
    NegZ,
    PosZ,
}

const PLANES: [Plane; 7] =
    [Plane::PosW, Plane::NegX, Plane::PosX, Plane::NegY, Plane::PosY, Plane::NegZ, Plane::PosZ];

impl Plane {
    #[inline]
    fn distance(self, p: Vec4<f32>) -> f32 {
        match self {
            Plane::PosW => p.w - 1e-5,
            Plane::NegX => p.w + p.x,
            Plane::PosX => p.w - p.x,
            Plane::NegY => p.w + p.y,
            Plane::PosY => p.w - p.y,
            Plane::NegZ => p.z,
            Plane::PosZ => p.w - p.z,
        }
    }
}

fn clip_against<V: Clone + Interpolate>(
    plane: Plane,
    poly: &[(Vec4<f32>, V)],
    out: &mut Vec<(Vec4<f32>, V)>,
) {
    out.clear();
    if poly.is_empty() {
        return;
    }
    for i in 0..poly.len() {
        let (cur_pos, cur_attr) = poly[i].clone();
        let (prev_pos, prev_attr) = poly[(i + poly.len() - 1) % poly.len()].clone();

        let cur_dist = plane.distance(cur_pos);
        let prev_dist = plane.distance(prev_pos);

        if (cur_dist >= 0.0) != (prev_dist >= 0.0) {
            let t = prev_dist / (prev_dist - cur_dist);
            let pos = prev_pos + (cur_pos - prev_pos) * t;
            let attr = V::lerp2(prev_attr, cur_attr.clone(), 1.0 - t, t);
            out.push((pos, attr));
        }

        if cur_dist >= 0.0 {
            out.push((cur_pos, cur_attr));
        }
    }
}

/// Clip a single triangle's three `VsOutput`s against the frustum, emitting
/// the resulting polygon (0 vertices if fully culled, 3..=10 otherwise for a
/// triangle clipped by up to 7 planes) into `out` as a triangle fan
/// `(out[0], out[i], out[i+1])`.
pub fn clip_triangle(verts: &[VsOutput; 3], out: &mut Vec<VsOutput>) {
    out.clear();

    let mut poly: Vec<(Vec4<f32>, VsOutput)> =
        verts.iter().map(|v| (v.position(), v.clone())).collect();
    let mut scratch = Vec::new();

    for &plane in &PLANES {
        clip_against(plane, &poly, &mut scratch);
        std::mem::swap(&mut poly, &mut scratch);
        if poly.is_empty() {
            return;
        }
    }

    out.extend(poly.into_iter().map(|(_, v)| v));
}

impl Interpolate for VsOutput {
    #[inline]
    fn lerp2(a: Self, b: Self, x: f32, y: f32) -> Self {
        VsOutput::barycentric(&a, &b, &a, [x, y, 0.0])
    }

    #[inline]
    fn lerp3(a: Self, b: Self, c: Self, x: f32, y: f32, z: f32) -> Self {
        VsOutput::barycentric(&a, &b, &c, [x, y, z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vert(x: f32, y: f32, z: f32, w: f32) -> VsOutput {
        let mut v = VsOutput::default();
        *v.position_mut() = Vec4::new(x, y, z, w);
        v
    }

    #[test]
    fn fully_inside_triangle_is_unchanged_in_count() {
        let tri = [vert(-0.5, -0.5, 0.5, 1.0), vert(0.5, -0.5, 0.5, 1.0), vert(0.0, 0.5, 0.5, 1.0)];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn fully_outside_triangle_is_culled() {
        let tri = [vert(2.0, 2.0, 2.0, 1.0), vert(3.0, 2.0, 2.0, 1.0), vert(2.0, 3.0, 2.0, 1.0)];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn straddling_triangle_produces_a_polygon() {
        let tri = [vert(-2.0, 0.0, 0.5, 1.0), vert(2.0, 0.0, 0.5, 1.0), vert(0.0, 1.5, 0.5, 1.0)];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert!(out.len() >= 3);
        for v in &out {
            assert!(v.position().x.abs() <= v.position().w + 1e-4);
        }
    }
}
