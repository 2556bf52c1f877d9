//! Render state: the immutable snapshot a draw call carries through the
//! pipeline, plus the small state objects (`Viewport`, `RasterState`,
//! `DepthStencilDesc`) bound into it.
//!
//! Grounded on `render_state.h`'s field layout (topology, stream bindings,
//! viewport, raster/depth-stencil state, shaders, targets) and the redesign
//! note replacing its mutable, pointer-heavy struct with an owned,
//! immutable-per-draw snapshot.

use crate::index::IndexFormat;
use crate::primitive::PrimitiveTopology;
use std::sync::Arc;

/// Triangle culling mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Triangle fill mode. Wireframe fill is a Non-goal of the rasterizer core
/// itself (it would require re-deriving line primitives from triangles);
/// the enum is kept so callers can reject it early with a clear error
/// rather than the state silently being ignored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Copy, Clone, Debug)]
pub struct RasterState {
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,
}

impl Default for RasterState {
    fn default() -> Self {
        Self { cull_mode: CullMode::Back, fill_mode: FillMode::Solid }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Comparison function used by both depth and stencil tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareFunction {
    #[inline]
    pub fn test_f32(self, new: f32, old: f32) -> bool {
        match self {
            CompareFunction::Never => false,
            CompareFunction::Less => new < old,
            CompareFunction::Equal => new == old,
            CompareFunction::LessEqual => new <= old,
            CompareFunction::Greater => new > old,
            CompareFunction::NotEqual => new != old,
            CompareFunction::GreaterEqual => new >= old,
            CompareFunction::Always => true,
        }
    }

    #[inline]
    pub fn test_u32(self, new: u32, old: u32) -> bool {
        match self {
            CompareFunction::Never => false,
            CompareFunction::Less => new < old,
            CompareFunction::Equal => new == old,
            CompareFunction::LessEqual => new <= old,
            CompareFunction::Greater => new > old,
            CompareFunction::NotEqual => new != old,
            CompareFunction::GreaterEqual => new >= old,
            CompareFunction::Always => true,
        }
    }
}

/// Stencil buffer modification operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementSaturate,
    DecrementSaturate,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

impl StencilOp {
    #[inline]
    pub fn apply(self, current: u32, reference: u32) -> u32 {
        match self {
            StencilOp::Keep => current,
            StencilOp::Zero => 0,
            StencilOp::Replace => reference,
            StencilOp::IncrementSaturate => current.saturating_add(1),
            StencilOp::DecrementSaturate => current.saturating_sub(1),
            StencilOp::Invert => !current,
            StencilOp::IncrementWrap => current.wrapping_add(1),
            StencilOp::DecrementWrap => current.wrapping_sub(1),
        }
    }
}

/// One face's worth of stencil ops, selected from `DepthStencilDesc` by
/// `front_face`.
#[derive(Copy, Clone, Debug)]
pub struct StencilFaceOps {
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
    pub function: CompareFunction,
}

impl Default for StencilFaceOps {
    fn default() -> Self {
        Self { fail: StencilOp::Keep, depth_fail: StencilOp::Keep, pass: StencilOp::Keep, function: CompareFunction::Always }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DepthStencilDesc {
    pub depth_enable: bool,
    pub depth_write: bool,
    pub depth_function: CompareFunction,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front: StencilFaceOps,
    pub back: StencilFaceOps,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write: true,
            depth_function: CompareFunction::Less,
            stencil_enable: false,
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
            front: StencilFaceOps::default(),
            back: StencilFaceOps::default(),
        }
    }
}

impl DepthStencilDesc {
    pub fn face_ops(&self, front_face: bool) -> &StencilFaceOps {
        if front_face { &self.front } else { &self.back }
    }
}

/// Binding for a single vertex stream.
#[derive(Clone)]
pub struct StreamBinding {
    pub buffer: Arc<[u8]>,
    pub stride: usize,
    pub offset: usize,
}

/// Full immutable render-state snapshot for one draw call.
///
/// Kept as a single owned struct (with `Arc`-shared buffers) rather than a
/// bag of raw pointers into caller-owned state, per this core's redesign
/// note on replacing global/mutable pipeline state with explicit,
/// constructor-supplied arguments.
#[derive(Clone)]
pub struct RenderState {
    pub topology: PrimitiveTopology,
    pub base_vertex: i32,
    pub start_index: u32,
    pub prim_count: u32,
    pub index_buffer: Option<Arc<[u8]>>,
    pub index_format: IndexFormat,
    pub streams: Vec<StreamBinding>,
    pub viewport: Viewport,
    pub raster_state: RasterState,
    pub depth_stencil: DepthStencilDesc,
    pub stencil_ref: u32,
    pub sample_count: u32,
    /// Whether the bound pixel shader writes its own depth, disabling
    /// early-Z for the whole draw (see `DepthStencilOps::early_z_eligible`).
    pub ps_outputs_depth: bool,
}
