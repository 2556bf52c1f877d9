//! Error taxonomy for the rasterizer core.
//!
//! Three kinds of failure are distinguished, matching how far from the
//! caller's control each one is: a bad parameter the caller handed us
//! (`DrawError`), a piece of render state that can't be bound as configured
//! (`StateError`), and resource-mapping conflicts that are a normal,
//! expected outcome rather than a bug (`MapResult`). Invariant violations
//! inside the core itself are not represented as `Result` at all: they use
//! `debug_assert!`/`unreachable!` so that a broken invariant is a loud bug,
//! not a value a caller can quietly ignore.

use thiserror::Error;

/// Failures that can occur when submitting a draw call.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("primitive count {0} is not a multiple of the primitive size required by the bound topology")]
    MisalignedPrimitiveCount(usize),

    #[error("draw call references vertex index {index} but only {bound} vertices are bound")]
    VertexIndexOutOfBounds { index: u32, bound: u32 },

    #[error("color target {0} and depth-stencil target have mismatched dimensions")]
    TargetSizeMismatch(usize),

    #[error("no color targets and no depth-stencil target are bound; draw call would have no effect")]
    NoTargetsBound,

    #[error("index buffer is required for indexed draw calls but none is bound")]
    MissingIndexBuffer,
}

/// Failures raised while binding a piece of render state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("unsupported depth-stencil surface format {0:?}")]
    UnsupportedDepthStencilFormat(crate::framebuffer::DepthStencilFormat),

    #[error("vertex output register file requires at least 1 slot (position) but {0} were requested")]
    EmptyRegisterFile(usize),

    #[error("sample count {0} is not one of the supported counts (1, 2, 4)")]
    UnsupportedSampleCount(u32),

    #[error("input layout references register {register} but the bound vertex shader only exposes {available}")]
    RegisterOutOfRange { register: usize, available: usize },
}

/// Outcome of a `map()` call against a resource that may be in use by the
/// rasterizer, mirroring the historical `map_result` enum this core's design
/// is descended from (`succeed` / `failed` / `do_not_wait`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapResult {
    /// The resource was mapped and is safe to read or write.
    Succeed,
    /// The resource could not be mapped (e.g. it is permanently unmappable).
    Failed,
    /// The resource is currently in use by an in-flight draw and the caller
    /// asked not to block; try again later.
    DoNotWait,
}

pub type DrawResult<T> = Result<T, DrawError>;
pub type StateResult<T> = Result<T, StateError>;
