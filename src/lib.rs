//! A tiled, multi-threaded software rasterizer in the spirit of a fixed
//! function D3D10-class pipeline: index fetch, vertex shading with vertex
//! cache dedup, frustum clipping, triangle setup, tile binning, and a
//! hierarchical coverage rasterizer feeding early-Z, depth-stencil and
//! blend stages. Shaders are plain closures rather than a virtual shader
//! object hierarchy, and draw-call state is an owned, immutable snapshot
//! threaded explicitly through the pipeline rather than carried in global
//! mutable state.

pub mod bin;
pub mod buffer;
pub mod clip;
pub mod depth_stencil;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod index;
pub mod interpolate;
pub mod math;
pub mod pool;
pub mod primitive;
pub mod profile;
pub mod raster;
pub mod renderer;
pub mod async_renderer;
pub mod shader;
pub mod state;
pub mod vertex;
pub mod vertex_cache;

pub use buffer::{Buffer, Buffer2d, Target};
pub use error::{DrawError, DrawResult, MapResult, StateError, StateResult};
pub use index::{IndexBuffer, IndexFetcher, IndexFormat};
pub use primitive::PrimitiveTopology;
pub use renderer::{DrawStatistics, Renderer};
pub use shader::ShaderPipeline;
pub use state::RenderState;
pub use vertex::{VsInput, VsOutput};
