//! Framebuffer back-end: per-sample depth/stencil texel access, per-sample
//! early-Z, and the MSAA color resolve, grounded on `framebuffer.cpp`'s
//! `depth_stencil_accessor<rg32f>` and `early_z_test`/`render_sample`.
//!
//! The depth-stencil surface format is always `rg32f`: depth lives in the R
//! channel as `f32`, stencil lives in the G channel bit-cast from `u32`. Per
//! `render_sample`'s per-sample loop, each pixel carries one texel *per MSAA
//! sample slot* rather than one shared texel, so a covered-but-not-resolved
//! sample's depth/stencil state never leaks into a pixel's other samples.

use crate::buffer::{Buffer2d, Target};
use crate::depth_stencil::DepthStencilOps;
use crate::error::{StateError, StateResult};
use crate::math::Lerp;
use crate::raster::MAX_SAMPLE_COUNT;
use crate::state::DepthStencilDesc;

/// The only depth-stencil surface format this core supports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DepthStencilFormat {
    Rg32Float,
}

/// One `rg32f` depth-stencil texel: depth in `.0`, stencil bit-cast in `.1`.
pub type DsTexel = (f32, u32);

/// One pixel's depth-stencil state, one texel per MSAA sample slot.
type DsPixel = [DsTexel; MAX_SAMPLE_COUNT];

pub struct DepthStencilTarget {
    pub surface: Buffer2d<DsPixel>,
    pub format: DepthStencilFormat,
}

impl DepthStencilTarget {
    pub fn new(size: [usize; 2]) -> StateResult<Self> {
        Ok(Self { surface: Buffer2d::fill(size, [(1.0, 0); MAX_SAMPLE_COUNT]), format: DepthStencilFormat::Rg32Float })
    }

    pub fn bind(format: DepthStencilFormat, size: [usize; 2]) -> StateResult<Self> {
        match format {
            DepthStencilFormat::Rg32Float => Ok(Self {
                surface: Buffer2d::fill(size, [(1.0, 0); MAX_SAMPLE_COUNT]),
                format,
            }),
        }
    }

    /// Read sample `sample` of the texel at `(x, y)` with exclusive access
    /// to `(x, y)` assumed (i.e. the caller owns a tile that does not
    /// overlap any other worker's tile).
    ///
    /// # Safety
    /// See [`Target::read_exclusive_unchecked`].
    #[inline]
    pub unsafe fn read(&self, x: usize, y: usize, sample: usize) -> DsTexel {
        self.surface.read_exclusive_unchecked(x, y)[sample]
    }

    /// # Safety
    /// See [`Target::write_exclusive_unchecked`].
    #[inline]
    pub unsafe fn write(&self, x: usize, y: usize, sample: usize, texel: DsTexel) {
        let mut all = self.surface.read_exclusive_unchecked(x, y);
        all[sample] = texel;
        self.surface.write_exclusive_unchecked(x, y, all);
    }

    /// `clear_flag::depth` / `clear_flag::stencil` clear dispatch, matching
    /// `clear_depth_stencil`'s per-flag selective clear, applied to every
    /// sample slot.
    pub fn clear(&mut self, depth: Option<f32>, stencil: Option<u32>) {
        for y in 0..self.surface.size()[1] {
            for x in 0..self.surface.size()[0] {
                let mut cur = self.surface.read([x, y]);
                for texel in &mut cur {
                    texel.0 = depth.unwrap_or(texel.0);
                    texel.1 = stencil.unwrap_or(texel.1);
                }
                *self.surface.get_mut([x, y]) = cur;
            }
        }
    }
}

/// Per-sample early-Z test, run ahead of the pixel shader when
/// [`DepthStencilOps::early_z_eligible`] allows it. On pass, writes the new
/// depth immediately (matching `early_z_test`/`early_z_test_quad`'s
/// fold-in of the write into the test itself, since there is no stencil
/// write to race with when early-Z is eligible).
///
/// # Safety
/// `(x, y)` must lie within a tile exclusively owned by the caller.
#[allow(clippy::too_many_arguments)]
pub unsafe fn early_z_test(
    desc: &DepthStencilDesc,
    target: &DepthStencilTarget,
    x: usize,
    y: usize,
    sample: usize,
    new_depth: f32,
) -> bool {
    let current = target.read(x, y, sample);
    let pass = if desc.depth_enable { desc.depth_function.test_f32(new_depth, current.0) } else { true };
    if pass && desc.depth_write {
        target.write(x, y, sample, (new_depth, current.1));
    }
    pass
}

/// Full (non-early) per-sample depth+stencil test, write and report,
/// matching `render_sample`'s fallback path when early-Z is not eligible.
///
/// # Safety
/// `(x, y)` must lie within a tile exclusively owned by the caller.
#[allow(clippy::too_many_arguments)]
pub unsafe fn full_depth_stencil_test(
    ops: &DepthStencilOps,
    desc: &DepthStencilDesc,
    target: &DepthStencilTarget,
    front_face: bool,
    stencil_ref: u32,
    x: usize,
    y: usize,
    sample: usize,
    new_depth: f32,
) -> bool {
    let current = target.read(x, y, sample);
    let result = ops.test(desc, front_face, stencil_ref, new_depth, current.0, current.1);

    let depth_to_write = result.new_depth.unwrap_or(current.0);
    let stencil_to_write = result.new_stencil.unwrap_or(current.1);
    if result.new_depth.is_some() || result.new_stencil.is_some() {
        target.write(x, y, sample, (depth_to_write, stencil_to_write));
    }

    result.passes
}

/// Per-sample MSAA color storage: `MAX_SAMPLE_COUNT` color slots per pixel,
/// written independently as each covered sample passes its depth-stencil
/// test and averaged down into the real color target by [`Self::resolve`]
/// once a draw call finishes.
pub struct MsaaColorBuffer<Px> {
    surface: Buffer2d<[Px; MAX_SAMPLE_COUNT]>,
}

impl<Px: Clone> MsaaColorBuffer<Px> {
    /// Snapshot `target`'s current contents into a fresh per-sample buffer,
    /// replicating each pixel's existing value across every sample slot so
    /// a sample a draw call never touches still resolves to the
    /// framebuffer's prior contents rather than a cleared default.
    pub fn snapshot_from<T: Target<Texel = Px>>(target: &T) -> Self {
        let size = target.size();
        let mut items = Vec::with_capacity(size[0] * size[1]);
        for y in 0..size[1] {
            for x in 0..size[0] {
                let texel = unsafe { target.read_exclusive_unchecked(x, y) };
                items.push(std::array::from_fn(|_| texel.clone()));
            }
        }
        Self { surface: Buffer2d::from_raw(size, items) }
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.surface.size()
    }

    /// # Safety
    /// `(x, y)` must lie within a tile exclusively owned by the caller.
    #[inline]
    pub unsafe fn read_sample(&self, x: usize, y: usize, sample: usize) -> Px {
        self.surface.read_exclusive_unchecked(x, y)[sample].clone()
    }

    /// # Safety
    /// Same contract as [`Self::read_sample`].
    #[inline]
    pub unsafe fn write_sample(&self, x: usize, y: usize, sample: usize, value: Px) {
        let mut all = self.surface.read_exclusive_unchecked(x, y);
        all[sample] = value;
        self.surface.write_exclusive_unchecked(x, y, all);
    }

    /// Average the first `sample_count` slots of every pixel back into
    /// `target`, via `Lerp`'s incremental two-way average: each further
    /// sample is blended in with weight `1/(i+1)`, which converges to the
    /// unweighted mean of all `sample_count` values.
    pub fn resolve<T: Target<Texel = Px>>(&self, target: &T, sample_count: u32)
    where
        Px: Lerp<f32>,
    {
        let size = self.surface.size();
        for y in 0..size[1] {
            for x in 0..size[0] {
                let samples = self.surface.read([x, y]);
                let mut acc = samples[0].clone();
                for (i, sample) in samples.iter().enumerate().take(sample_count as usize).skip(1) {
                    let factor = 1.0 / (i + 1) as f32;
                    acc = Px::lerp_unchecked(&acc, sample, &factor);
                }
                unsafe { target.write_exclusive_unchecked(x, y, acc) };
            }
        }
    }
}

pub fn validate_format(format: DepthStencilFormat) -> StateResult<()> {
    match format {
        DepthStencilFormat::Rg32Float => Ok(()),
        #[allow(unreachable_patterns)]
        _ => Err(StateError::UnsupportedDepthStencilFormat(format)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_depth_only_leaves_stencil_untouched() {
        let mut target = DepthStencilTarget::new([2, 2]).unwrap();
        unsafe { target.write(0, 0, 0, (0.5, 7)) };
        target.clear(Some(1.0), None);
        assert_eq!(unsafe { target.read(0, 0, 0) }, (1.0, 7));
    }

    #[test]
    fn early_z_write_only_happens_on_pass() {
        let desc = DepthStencilDesc::default();
        let target = DepthStencilTarget::new([1, 1]).unwrap();
        unsafe {
            target.write(0, 0, 0, (0.5, 0));
            assert!(!early_z_test(&desc, &target, 0, 0, 0, 0.8));
            assert_eq!(target.read(0, 0, 0).0, 0.5);
            assert!(early_z_test(&desc, &target, 0, 0, 0, 0.2));
            assert_eq!(target.read(0, 0, 0).0, 0.2);
        }
    }

    #[test]
    fn samples_of_the_same_pixel_are_independent() {
        let target = DepthStencilTarget::new([1, 1]).unwrap();
        unsafe {
            target.write(0, 0, 0, (0.2, 0));
            target.write(0, 0, 1, (0.9, 0));
            assert_eq!(target.read(0, 0, 0).0, 0.2);
            assert_eq!(target.read(0, 0, 1).0, 0.9);
        }
    }

    #[test]
    fn msaa_resolve_averages_sample_colors() {
        let color: Buffer2d<f32> = Buffer2d::fill([1, 1], 0.0);
        let msaa = MsaaColorBuffer::snapshot_from(&color);
        unsafe {
            msaa.write_sample(0, 0, 0, 0.0);
            msaa.write_sample(0, 0, 1, 1.0);
        }
        msaa.resolve(&color, 2);
        assert_eq!(unsafe { color.read_exclusive_unchecked(0, 0) }, 0.5);
    }
}
