//! Shader invocation surface.
//!
//! Replaces the original's virtual-inheritance `shader_object` hierarchy
//! (`cpp_vertex_shader`/`cpp_pixel_shader`/`cpp_blend_shader`, each cloned
//! per worker thread to hold mutable scratch state) with a pair of plain
//! closures plus an explicit per-thread scratch value, per this core's
//! redesign note: an immutable descriptor shared across threads, with
//! per-thread mutable state kept in caller-supplied scratch rather than by
//! cloning the shader object itself.

use crate::vertex::{VsInput, VsOutput};
use std::sync::Arc;

/// Per-pixel shader output: one colour per bound render target.
pub const MAX_RENDER_TARGETS: usize = 8;

#[derive(Clone, Debug)]
pub struct PsOutput {
    pub color: [vek::Vec4<f32>; MAX_RENDER_TARGETS],
    /// Set when the shader writes its own depth, which disables early-Z
    /// for the draw (see `DepthStencilOps::early_z_eligible`).
    pub depth: Option<f32>,
}

impl Default for PsOutput {
    fn default() -> Self {
        Self { color: [vek::Vec4::zero(); MAX_RENDER_TARGETS], depth: None }
    }
}

/// A vertex shader: pure function of per-draw uniforms (closed over) and a
/// single vertex's input attributes.
pub type VertexShaderFn<U> = dyn Fn(&U, &VsInput) -> VsOutput + Send + Sync;

/// A pixel shader: pure function of uniforms, a 2x2 quad's four lanes of
/// interpolated attributes, whether the fragment is front-facing, and an
/// exec mask (bit `lane` set when that lane is live). All four lanes are
/// always invoked together, even when some are masked off, so `ddx`/`ddy`
/// (computable from the other live lanes) stay available to the shader;
/// masked-off lanes' outputs are discarded by the caller.
pub type PixelShaderFn<U> = dyn Fn(&U, &[VsOutput; 4], bool, u32) -> [PsOutput; 4] + Send + Sync;

/// A blend shader: combines a freshly shaded fragment with the target's
/// existing value.
pub type BlendShaderFn<Px> = dyn Fn(Px, PsOutput) -> Px + Send + Sync;

/// Handle to a vertex/pixel shader pair plus an optional blend shader,
/// shared immutably across worker threads.
pub struct ShaderPipeline<U, Px> {
    pub vertex: Arc<VertexShaderFn<U>>,
    pub pixel: Arc<PixelShaderFn<U>>,
    pub blend: Arc<BlendShaderFn<Px>>,
    pub uniform: Arc<U>,
}

impl<U, Px> Clone for ShaderPipeline<U, Px> {
    fn clone(&self) -> Self {
        Self {
            vertex: self.vertex.clone(),
            pixel: self.pixel.clone(),
            blend: self.blend.clone(),
            uniform: self.uniform.clone(),
        }
    }
}

impl<U, Px> ShaderPipeline<U, Px> {
    /// Cheap handle clone for use by a worker thread; shaders themselves
    /// hold no mutable state, so "cloning per thread" here is just bumping
    /// reference counts rather than duplicating shader objects.
    pub fn clone_per_thread(&self) -> Self {
        self.clone()
    }

    #[inline]
    pub fn invoke_vertex(&self, input: &VsInput) -> VsOutput {
        (self.vertex)(&self.uniform, input)
    }

    #[inline]
    pub fn invoke_pixel(&self, attrs: &[VsOutput; 4], front_face: bool, exec_mask: u32) -> [PsOutput; 4] {
        (self.pixel)(&self.uniform, attrs, front_face, exec_mask)
    }

    #[inline]
    pub fn invoke_blend(&self, old: Px, new: PsOutput) -> Px {
        (self.blend)(old, new)
    }
}

/// Input-assembler shim: gathers a vertex's attributes out of bound vertex
/// streams given a per-attribute `(stream_slot, byte_offset)` binding.
///
/// Grounded on `stream_assembler.cpp`'s `element_address`/`fetch_vertex`:
/// only `f32` component formats are modelled (`r32_float` through
/// `r32g32b32a32_float`), since integer vertex formats have no caller in
/// this core's scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeFormat {
    R32Float,
    Rg32Float,
    Rgb32Float,
    Rgba32Float,
}

impl AttributeFormat {
    const fn components(self) -> usize {
        match self {
            AttributeFormat::R32Float => 1,
            AttributeFormat::Rg32Float => 2,
            AttributeFormat::Rgb32Float => 3,
            AttributeFormat::Rgba32Float => 4,
        }
    }
}

#[derive(Clone, Copy)]
pub struct AttributeBinding {
    pub stream_slot: usize,
    pub byte_offset: usize,
    pub format: AttributeFormat,
    /// Default `w` component for formats narrower than 4 floats (1.0 for
    /// position-like semantics, 0.0 for direction-like semantics).
    pub default_w: f32,
}

pub struct IaShim {
    bindings: Vec<AttributeBinding>,
}

impl IaShim {
    pub fn new(bindings: Vec<AttributeBinding>) -> Self {
        Self { bindings }
    }

    /// Fetch one vertex's attributes out of `streams[binding.stream_slot]`
    /// at `stride * vertex_index + binding.byte_offset`.
    pub fn fetch(&self, streams: &[(&[u8], usize)], vertex_index: usize) -> VsInput {
        let mut input = VsInput::default();
        for (reg, binding) in self.bindings.iter().enumerate() {
            let (data, stride) = streams[binding.stream_slot];
            let addr = stride * vertex_index + binding.byte_offset;
            let floats: &[f32] = bytemuck::cast_slice(&data[addr..addr + binding.format.components() * 4]);
            let v = match binding.format {
                AttributeFormat::R32Float => vek::Vec4::new(floats[0], 0.0, 0.0, binding.default_w),
                AttributeFormat::Rg32Float => vek::Vec4::new(floats[0], floats[1], 0.0, binding.default_w),
                AttributeFormat::Rgb32Float => vek::Vec4::new(floats[0], floats[1], floats[2], binding.default_w),
                AttributeFormat::Rgba32Float => vek::Vec4::new(floats[0], floats[1], floats[2], floats[3]),
            };
            *input.attribute_mut(reg) = v;
        }
        input
    }
}
