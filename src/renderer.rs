//! Synchronous draw-call front-end: ties the index fetcher, vertex cache,
//! clipper, geometry setup, tile binner, rasterizer core and framebuffer
//! back-end into the `draw()` orchestration a caller actually invokes.
//!
//! Grounded on `rasterizer.cpp::draw()`'s top-level sequence: vertex cache
//! prepare -> geometry setup for every surviving post-clip triangle ->
//! tile-binning pass over all of them -> per-tile rasterize dispatch, tiles
//! run in parallel but each tile processes its primitives in ascending bin
//! order (submission order), which is what keeps blending and depth-stencil
//! writes deterministic without an explicit post-bin sort: two different
//! tiles never touch the same pixel, so only within-tile ordering matters.

use crate::bin::{unpack_bin_entry, TileBinner, TileBins, TILE_SIZE};
use crate::buffer::Target;
use crate::clip::clip_triangle;
use crate::depth_stencil::DepthStencilOps;
use crate::error::{DrawError, DrawResult};
use crate::framebuffer::{DepthStencilTarget, MsaaColorBuffer};
use crate::geometry::{setup_triangle, TriangleInfo};
use crate::index::IndexFetcher;
use crate::math::Lerp;
use crate::pool::WorkerPool;
use crate::profile::Profiler;
use crate::raster::{rasterize_tile, sample_pattern, Quad};
use crate::shader::{PsOutput, ShaderPipeline};
use crate::state::{CullMode, RenderState};
use crate::vertex::{VsInput, VsOutput};

pub struct Renderer {
    pool: WorkerPool,
}

/// Running pipeline statistics for one draw call (spec's timing counters).
#[derive(Default, Clone, Copy, Debug)]
pub struct DrawStatistics {
    pub ia_primitives: u64,
    pub vs_invocations: u64,
    pub clipped_primitives: u64,
    pub ps_invocations: u64,
}

impl Renderer {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    /// `vertices` is the already-assembled vertex-shader input stream (the
    /// input-assembler shim's output); `state.index_buffer`, if bound, is a
    /// raw index buffer in the format named by `state.index_format`.
    pub fn draw<U, Px, T>(
        &self,
        state: &RenderState,
        shader: &ShaderPipeline<U, Px>,
        vertices: &[VsInput],
        color_target: Option<&T>,
        depth_target: Option<&DepthStencilTarget>,
        profiler: &mut Profiler,
    ) -> DrawResult<DrawStatistics>
    where
        U: Send + Sync,
        Px: Clone + Send + Sync + Lerp<f32>,
        T: Target<Texel = Px> + Sync,
    {
        if color_target.is_none() && depth_target.is_none() {
            log::warn!("draw call rejected: no color or depth-stencil target bound");
            return Err(DrawError::NoTargetsBound);
        }
        if let (Some(c), Some(d)) = (color_target, depth_target) {
            if c.size() != d.surface.size() {
                log::warn!("draw call rejected: color target {:?} and depth target {:?} size mismatch", c.size(), d.surface.size());
                return Err(DrawError::TargetSizeMismatch(0));
            }
        }

        let mut stats = DrawStatistics::default();

        log::trace!("draw call: topology={:?} prim_count={}", state.topology, state.prim_count);

        // Each pipeline stage below takes its own `StageGuard` sequentially
        // rather than nesting them under one umbrella "draw" guard: a guard
        // holds its `&mut Profiler` borrow until it drops, so two guards
        // can only ever be siblings, never parent and child, for a given
        // `Profiler` value.
        let index_buffer = state
            .index_buffer
            .as_ref()
            .map(|data| crate::index::IndexBuffer { data: data.as_ref(), format: state.index_format });

        let fetcher = IndexFetcher::new(
            state.topology,
            state.base_vertex,
            state.start_index,
            state.prim_count,
            index_buffer,
        );
        let (prim_indices, index_range) = {
            let _g = profiler.stage("index_fetch");
            fetcher.fetch_all()
        };
        stats.ia_primitives = prim_indices.len() as u64;

        if !prim_indices.is_empty() && index_range.max as usize >= vertices.len() {
            log::error!(
                "draw call references vertex index {} but only {} vertices are bound",
                index_range.max,
                vertices.len()
            );
            return Err(DrawError::VertexIndexOutOfBounds {
                index: index_range.max,
                bound: vertices.len() as u32,
            });
        }

        if !state.topology.is_triangle() {
            // Line topologies are rasterized directly without tile binning
            // (their extent rarely benefits from hierarchical subdivision);
            // see `raster::rasterize_line_segment` for the DDA used here.
            if let Some(color_target) = color_target {
                let _g = profiler.stage("rasterize_lines");
                for ids in &prim_indices {
                    let a = shader.invoke_vertex(&vertices[ids[0] as usize]);
                    let b = shader.invoke_vertex(&vertices[ids[1] as usize]);
                    stats.vs_invocations += 2;
                    crate::raster::rasterize_line_segment(&a, &b, &state.viewport, &mut |x, y, attrs| {
                        let quad = [attrs.clone(), attrs.clone(), attrs.clone(), attrs];
                        let frags = shader.invoke_pixel(&quad, true, 0b0001);
                        stats.ps_invocations += 1;
                        if x >= 0 && y >= 0 && (x as usize) < color_target.size()[0] && (y as usize) < color_target.size()[1] {
                            unsafe {
                                let old = color_target.read_exclusive_unchecked(x as usize, y as usize);
                                color_target.write_exclusive_unchecked(x as usize, y as usize, shader.invoke_blend(old, frags[0].clone()));
                            }
                        }
                    });
                }
            }
            return Ok(stats);
        }

        // Vertex shading, parallelized over unique indices (vertex cache).
        let unique = crate::vertex_cache::VertexCache::unique_indices(
            prim_indices.iter().flat_map(|p| p.iter().copied()),
        );
        let mut shaded: Vec<Option<VsOutput>> = vec![None; vertices.len()];
        {
            let _g = profiler.stage("vertex_shade");
            let shaded_slots = std::sync::Mutex::new(&mut shaded);
            self.pool.dispatch(unique.len(), 64, |range| {
                let mut local = Vec::with_capacity(range.len());
                for &i in &unique[range.clone()] {
                    local.push((i, shader.invoke_vertex(&vertices[i as usize])));
                }
                let mut slots = shaded_slots.lock().unwrap();
                for (i, v) in local {
                    slots[i as usize] = Some(v);
                }
            });
        }
        stats.vs_invocations = unique.len() as u64;
        log::debug!("vertex shading: {} unique vertices across {} threads", unique.len(), self.pool.thread_count());

        let ds_ops = DepthStencilOps::compile(&state.depth_stencil);

        // Geometry setup: clip, fan-triangulate, project and cull every
        // primitive up front, producing a flat, ascending-id list of
        // surviving triangles. This id is the "primitive id" the tile bins
        // below sort by.
        let triangles: Vec<TriangleInfo> = {
            let _g = profiler.stage("geometry_setup");
            let mut triangles = Vec::new();
            for ids in &prim_indices {
                let verts = [
                    shaded[ids[0] as usize].clone().unwrap(),
                    shaded[ids[1] as usize].clone().unwrap(),
                    shaded[ids[2] as usize].clone().unwrap(),
                ];

                let mut clipped = Vec::new();
                clip_triangle(&verts, &mut clipped);
                if clipped.len() < 3 {
                    continue;
                }
                stats.clipped_primitives += 1;

                for i in 1..clipped.len() - 1 {
                    let fan = [clipped[0].clone(), clipped[i].clone(), clipped[i + 1].clone()];
                    let Some(tri) = setup_triangle(&fan, &state.viewport) else { continue };

                    let culled = match state.raster_state.cull_mode {
                        CullMode::None => false,
                        CullMode::Front => tri.front_face,
                        CullMode::Back => !tri.front_face,
                    };
                    if culled {
                        continue;
                    }

                    triangles.push(tri);
                }
            }
            triangles
        };

        if triangles.is_empty() {
            return Ok(stats);
        }

        let target_size = color_target.map(|c| c.size()).or_else(|| depth_target.map(|d| d.surface.size())).unwrap();
        let tiles_x = (target_size[0] as i32 + TILE_SIZE - 1) / TILE_SIZE;
        let tiles_y = (target_size[1] as i32 + TILE_SIZE - 1) / TILE_SIZE;

        // Tile binning: classify every surviving triangle against every
        // tile its bounding box overlaps, tagging each bin entry with
        // whether the tile was trivially accepted so rasterization can skip
        // re-deriving it.
        let bins = {
            let _g = profiler.stage("tile_bin");
            let mut bins = TileBins::new(tiles_x, tiles_y);
            for (id, tri) in triangles.iter().enumerate() {
                let binner = TileBinner::new(tri.edge_factors);
                bins.insert(id as u32, &binner, tri.bounding_box);
            }
            bins
        };

        let msaa_color = color_target.map(MsaaColorBuffer::snapshot_from);
        let ps_invocations = std::sync::atomic::AtomicU64::new(0);

        {
            let _g = profiler.stage("rasterize");
            let occupied: Vec<(i32, i32)> = bins.occupied_tiles().collect();

            self.pool.dispatch(occupied.len(), 1, |range| {
                for idx in range {
                    let (tx, ty) = occupied[idx];
                    let origin_x = tx * TILE_SIZE;
                    let origin_y = ty * TILE_SIZE;
                    let extent_x = (target_size[0] as i32 - origin_x).min(TILE_SIZE);
                    let extent_y = (target_size[1] as i32 - origin_y).min(TILE_SIZE);

                    for &entry in bins.entries(tx, ty) {
                        let (primitive_id, trivial_accept) = unpack_bin_entry(entry);
                        let tri = &triangles[primitive_id as usize];
                        let binner = TileBinner::new(tri.edge_factors);

                        let mut on_quad = |quad: Quad| {
                            let n = self.shade_quad(
                                &quad,
                                tri,
                                state,
                                &ds_ops,
                                shader,
                                msaa_color.as_ref(),
                                depth_target,
                            );
                            ps_invocations.fetch_add(n as u64, std::sync::atomic::Ordering::Relaxed);
                        };
                        rasterize_tile(
                            origin_x,
                            origin_y,
                            (origin_x + extent_x, origin_y + extent_y),
                            tri,
                            &binner,
                            state.sample_count,
                            trivial_accept,
                            &mut on_quad,
                        );
                    }
                }
            });
        }

        stats.ps_invocations += ps_invocations.load(std::sync::atomic::Ordering::Relaxed);

        if let (Some(color_target), Some(msaa_color)) = (color_target, &msaa_color) {
            let _g = profiler.stage("msaa_resolve");
            msaa_color.resolve(color_target, state.sample_count);
        }

        log::trace!(
            "draw call finished: {} clipped triangles, {} pixel shader invocations",
            stats.clipped_primitives,
            stats.ps_invocations
        );
        Ok(stats)
    }

    /// Shade one 2x2 quad: compute every lane's perspective-corrected
    /// attributes (even masked-off ones, so `ddx`/`ddy` always have all four
    /// lanes to work from), run early-Z per covered sample to build the
    /// quad's exec mask, invoke the pixel shader once for the whole quad,
    /// then run the late depth-stencil test and MSAA color write per
    /// covered sample that survived. Returns the number of lanes the
    /// shader actually ran for (its "pixel shader invocation" count).
    #[allow(clippy::too_many_arguments)]
    fn shade_quad<U, Px>(
        &self,
        quad: &Quad,
        tri: &TriangleInfo,
        state: &RenderState,
        ds_ops: &DepthStencilOps,
        shader: &ShaderPipeline<U, Px>,
        msaa_color: Option<&MsaaColorBuffer<Px>>,
        depth_target: Option<&DepthStencilTarget>,
    ) -> u32
    where
        U: Send + Sync,
        Px: Clone + Send + Sync,
    {
        let v0 = &tri.v[0];
        let sample_count = state.sample_count;
        let pattern = sample_pattern(sample_count);
        let early_z = ds_ops.early_z_eligible(state.ps_outputs_depth);

        let mut lane_attrs: [VsOutput; 4] = Default::default();
        let mut sample_depth = [[0.0f32; crate::raster::MAX_SAMPLE_COUNT]; 4];
        let mut early_pass = [[false; crate::raster::MAX_SAMPLE_COUNT]; 4];
        let mut exec_mask = 0u32;

        for lane in 0..4usize {
            let px = quad.x + (lane as i32 & 1);
            let py = quad.y + (lane as i32 >> 1);

            let dx = px as f32 - v0.pos.x;
            let dy = py as f32 - v0.pos.y;
            let raw = v0.attrs.add(&tri.ddx.scale(dx)).add(&tri.ddy.scale(dy));
            let inv_w = raw.position().w;
            lane_attrs[lane] = raw.unproject_attrs(inv_w);

            let covered = quad.mask.lane_mask(lane, sample_count);
            if covered == 0 {
                continue;
            }

            let mut lane_live = false;
            for s in 0..sample_count as usize {
                if covered & (1 << s) == 0 {
                    continue;
                }
                let (sx, sy) = pattern[s];
                let sdx = (px as f32 + sx) - v0.pos.x;
                let sdy = (py as f32 + sy) - v0.pos.y;
                let depth = v0.attrs.add(&tri.ddx.scale(sdx)).add(&tri.ddy.scale(sdy)).position().z;
                sample_depth[lane][s] = depth;

                let passes = if early_z {
                    match depth_target {
                        Some(dt) => unsafe { crate::framebuffer::early_z_test(&state.depth_stencil, dt, px as usize, py as usize, s, depth) },
                        None => true,
                    }
                } else {
                    true
                };
                early_pass[lane][s] = passes;
                lane_live |= passes;
            }
            if lane_live {
                exec_mask |= 1 << lane;
            }
        }

        if exec_mask == 0 {
            return 0;
        }

        let frags = shader.invoke_pixel(&lane_attrs, tri.front_face, exec_mask);
        let mut invocations = 0u32;

        for lane in 0..4usize {
            if exec_mask & (1 << lane) == 0 {
                continue;
            }
            invocations += 1;

            let px = quad.x + (lane as i32 & 1);
            let py = quad.y + (lane as i32 >> 1);
            let frag = &frags[lane];

            for s in 0..sample_count as usize {
                if !early_pass[lane][s] {
                    continue;
                }
                let shaded_depth = frag.depth.unwrap_or(sample_depth[lane][s]);

                let late_passes = if !early_z {
                    match depth_target {
                        Some(dt) => unsafe {
                            crate::framebuffer::full_depth_stencil_test(
                                ds_ops, &state.depth_stencil, dt, tri.front_face, state.stencil_ref, px as usize, py as usize, s, shaded_depth,
                            )
                        },
                        None => true,
                    }
                } else {
                    true
                };
                if !late_passes {
                    continue;
                }

                if let Some(msaa_color) = msaa_color {
                    if (px as usize) < msaa_color.size()[0] && (py as usize) < msaa_color.size()[1] {
                        unsafe {
                            let old = msaa_color.read_sample(px as usize, py as usize, s);
                            let blended = shader.invoke_blend(old, frag.clone());
                            msaa_color.write_sample(px as usize, py as usize, s, blended);
                        }
                    }
                }
            }
        }

        invocations
    }
}

/// A pixel-shaded `PsOutput`'s first color channel, reduced to a concrete
/// pixel type by a caller-supplied blend shader; kept here only as a type
/// alias so downstream modules don't need to import `shader::PsOutput`
/// directly just to name this common case.
pub type DefaultFragment = PsOutput;
