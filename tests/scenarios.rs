//! End-to-end draw-call scenarios exercising the full pipeline: index fetch,
//! vertex shading, clipping, triangle setup, tile binning, hierarchical
//! rasterization and the framebuffer back-end together, rather than any one
//! module in isolation.

use tile_raster::buffer::{Buffer2d, Target};
use tile_raster::framebuffer::DepthStencilTarget;
use tile_raster::index::IndexFormat;
use tile_raster::pool::WorkerPool;
use tile_raster::primitive::PrimitiveTopology;
use tile_raster::profile::Profiler;
use tile_raster::renderer::Renderer;
use tile_raster::shader::{PsOutput, ShaderPipeline};
use tile_raster::state::{CullMode, DepthStencilDesc, RasterState, RenderState, Viewport};
use tile_raster::vertex::VsInput;
use vek::Vec4;
use std::sync::Arc;

fn viewport(size: usize) -> Viewport {
    Viewport { x: 0.0, y: 0.0, width: size as f32, height: size as f32, min_depth: 0.0, max_depth: 1.0 }
}

fn base_state(topology: PrimitiveTopology, prim_count: u32, size: usize) -> RenderState {
    RenderState {
        topology,
        base_vertex: 0,
        start_index: 0,
        prim_count,
        index_buffer: None,
        index_format: IndexFormat::U32,
        streams: Vec::new(),
        viewport: viewport(size),
        raster_state: RasterState { cull_mode: CullMode::None, fill_mode: tile_raster::state::FillMode::Solid },
        depth_stencil: DepthStencilDesc { depth_enable: false, depth_write: false, ..DepthStencilDesc::default() },
        stencil_ref: 0,
        sample_count: 1,
        ps_outputs_depth: false,
    }
}

fn passthrough_shader() -> ShaderPipeline<(), Vec4<f32>> {
    ShaderPipeline {
        vertex: Arc::new(|_u: &(), input: &VsInput| {
            let mut out = tile_raster::vertex::VsOutput::default();
            *out.position_mut() = input.attribute(0);
            *out.attribute_mut(0) = input.attribute(1);
            out
        }),
        pixel: Arc::new(|_u: &(), attrs: &[tile_raster::vertex::VsOutput; 4], _front_face, _exec_mask| {
            std::array::from_fn(|lane| {
                let mut ps = PsOutput::default();
                ps.color[0] = attrs[lane].attribute(0);
                ps
            })
        }),
        blend: Arc::new(|_old: Vec4<f32>, new: PsOutput| new.color[0]),
        uniform: Arc::new(()),
    }
}

fn vertex(pos: [f32; 4], color: [f32; 4]) -> VsInput {
    let mut v = VsInput::default();
    *v.attribute_mut(0) = Vec4::new(pos[0], pos[1], pos[2], pos[3]);
    *v.attribute_mut(1) = Vec4::new(color[0], color[1], color[2], color[3]);
    v
}

#[test]
fn solid_fill_triangle_covers_its_interior() {
    let renderer = Renderer::new(WorkerPool::new(2));
    let state = base_state(PrimitiveTopology::TriangleList, 1, 8);
    let shader = passthrough_shader();
    let vertices = vec![
        vertex([-0.8, -0.8, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]),
        vertex([0.8, -0.8, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]),
        vertex([0.0, 0.8, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]),
    ];
    let color: Buffer2d<Vec4<f32>> = Buffer2d::fill([8, 8], Vec4::zero());
    let mut profiler = Profiler::default();

    let stats = renderer
        .draw::<(), Vec4<f32>, Buffer2d<Vec4<f32>>>(&state, &shader, &vertices, Some(&color), None, &mut profiler)
        .unwrap();

    assert_eq!(stats.ia_primitives, 1);
    assert!(stats.ps_invocations > 0);
    // Centre of the triangle must be shaded red.
    let centre = unsafe { color.read_exclusive_unchecked(4, 4) };
    assert_eq!(centre, Vec4::new(1.0, 0.0, 0.0, 1.0));
    // A corner well outside the triangle stays clear.
    let corner = unsafe { color.read_exclusive_unchecked(0, 0) };
    assert_eq!(corner, Vec4::zero());
}

#[test]
fn two_full_screen_quads_without_depth_test_blend_in_submission_order() {
    // Depth test disabled: the second quad submitted must win regardless of
    // depth, since nothing stops it from overwriting the first.
    for reverse in [false, true] {
        let renderer = Renderer::new(WorkerPool::new(2));
        let state = base_state(PrimitiveTopology::TriangleList, 2, 4);
        let shader = passthrough_shader();

        let (first_color, second_color) = if reverse { ([0.0, 1.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]) } else { ([1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]) };

        let quad = |z: f32, c: [f32; 4]| {
            vec![
                vertex([-1.0, -1.0, z, 1.0], c),
                vertex([3.0, -1.0, z, 1.0], c),
                vertex([-1.0, 3.0, z, 1.0], c),
            ]
        };
        let mut vertices = quad(0.5, first_color);
        vertices.extend(quad(0.5, second_color));

        let color: Buffer2d<Vec4<f32>> = Buffer2d::fill([4, 4], Vec4::zero());
        let mut profiler = Profiler::default();
        renderer
            .draw::<(), Vec4<f32>, Buffer2d<Vec4<f32>>>(&state, &shader, &vertices, Some(&color), None, &mut profiler)
            .unwrap();

        let pixel = unsafe { color.read_exclusive_unchecked(2, 2) };
        assert_eq!(pixel, Vec4::new(second_color[0], second_color[1], second_color[2], second_color[3]));
    }
}

#[test]
fn triangle_strip_alternates_winding_but_both_triangles_shade() {
    let renderer = Renderer::new(WorkerPool::new(2));
    let mut state = base_state(PrimitiveTopology::TriangleStrip, 2, 8);
    state.raster_state.cull_mode = CullMode::Back;
    let shader = passthrough_shader();

    // A simple quad strip: front faces are consistent regardless of the
    // strip's index-swap on odd primitives.
    let vertices = vec![
        vertex([-0.9, -0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([-0.9, 0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([0.9, -0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([0.9, 0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
    ];
    let color: Buffer2d<Vec4<f32>> = Buffer2d::fill([8, 8], Vec4::zero());
    let mut profiler = Profiler::default();
    let stats = renderer
        .draw::<(), Vec4<f32>, Buffer2d<Vec4<f32>>>(&state, &shader, &vertices, Some(&color), None, &mut profiler)
        .unwrap();

    assert_eq!(stats.ia_primitives, 2);
    let centre = unsafe { color.read_exclusive_unchecked(4, 4) };
    assert_eq!(centre, Vec4::new(1.0, 1.0, 1.0, 1.0));
}

#[test]
fn msaa_four_samples_shades_diagonal_edge_quads() {
    let renderer = Renderer::new(WorkerPool::new(1));
    let mut state = base_state(PrimitiveTopology::TriangleList, 1, 16);
    state.sample_count = 4;
    let shader = passthrough_shader();
    let vertices = vec![
        vertex([-1.0, -1.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([1.0, -1.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([-1.0, 1.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
    ];
    let color: Buffer2d<Vec4<f32>> = Buffer2d::fill([16, 16], Vec4::zero());
    let mut profiler = Profiler::default();
    let stats = renderer
        .draw::<(), Vec4<f32>, Buffer2d<Vec4<f32>>>(&state, &shader, &vertices, Some(&color), None, &mut profiler)
        .unwrap();
    assert!(stats.ps_invocations > 0);
}

#[test]
fn depth_test_keeps_nearer_quad_regardless_of_submission_order() {
    // Near (z=0.2, green) must win over far (z=0.8, red) whichever one is
    // submitted first, since `depth_func=less`/`depth_write=true` is on.
    for near_first in [false, true] {
        let renderer = Renderer::new(WorkerPool::new(2));
        let mut state = base_state(PrimitiveTopology::TriangleList, 2, 4);
        state.depth_stencil.depth_enable = true;
        state.depth_stencil.depth_write = true;
        let shader = passthrough_shader();

        let far = vec![
            vertex([-1.0, -1.0, 0.8, 1.0], [1.0, 0.0, 0.0, 1.0]),
            vertex([3.0, -1.0, 0.8, 1.0], [1.0, 0.0, 0.0, 1.0]),
            vertex([-1.0, 3.0, 0.8, 1.0], [1.0, 0.0, 0.0, 1.0]),
        ];
        let near = vec![
            vertex([-1.0, -1.0, 0.2, 1.0], [0.0, 1.0, 0.0, 1.0]),
            vertex([3.0, -1.0, 0.2, 1.0], [0.0, 1.0, 0.0, 1.0]),
            vertex([-1.0, 3.0, 0.2, 1.0], [0.0, 1.0, 0.0, 1.0]),
        ];
        let mut vertices = if near_first { near } else { far.clone() };
        vertices.extend(if near_first { far } else { near });

        let color: Buffer2d<Vec4<f32>> = Buffer2d::fill([4, 4], Vec4::zero());
        let depth = DepthStencilTarget::new([4, 4]).unwrap();
        let mut profiler = Profiler::default();
        renderer
            .draw::<(), Vec4<f32>, Buffer2d<Vec4<f32>>>(&state, &shader, &vertices, Some(&color), Some(&depth), &mut profiler)
            .unwrap();

        let pixel = unsafe { color.read_exclusive_unchecked(2, 2) };
        assert_eq!(pixel, Vec4::new(0.0, 1.0, 0.0, 1.0));
    }
}

#[test]
fn vertex_cache_shades_a_shared_index_once() {
    let renderer = Renderer::new(WorkerPool::new(2));
    let mut state = base_state(PrimitiveTopology::TriangleList, 2, 8);

    // 6 unique vertex positions, but index 4 is referenced 6 times across
    // the two triangles below (indices chosen to mirror the arrangement
    // vertex_cache.rs's own unit test uses).
    let indices: [u32; 6] = [0, 1, 4, 2, 3, 4];
    let index_bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_ne_bytes()).collect();
    state.index_buffer = Some(Arc::from(index_bytes.into_boxed_slice()));
    state.index_format = IndexFormat::U32;

    let shader = passthrough_shader();
    let vertices = vec![
        vertex([-0.9, -0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([0.9, -0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([-0.9, 0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([0.9, 0.9, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([-0.5, -0.5, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        vertex([0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
    ];
    let color: Buffer2d<Vec4<f32>> = Buffer2d::fill([8, 8], Vec4::zero());
    let mut profiler = Profiler::default();

    let stats = renderer
        .draw::<(), Vec4<f32>, Buffer2d<Vec4<f32>>>(&state, &shader, &vertices, Some(&color), None, &mut profiler)
        .unwrap();

    // 5 unique indices referenced (0,1,4,2,3), index 4 shared by both
    // triangles: the vertex shader must run once per unique index, not once
    // per reference.
    assert_eq!(stats.vs_invocations, 5);
}
