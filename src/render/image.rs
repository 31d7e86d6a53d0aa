// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Image Buffers
//!
//! GPU-resident 2D surfaces and the slot type that lazily (re)allocates them.
//!
//! An [`ImageBuffer`] is owned by exactly one slot, stage or host and goes
//! back to the device by value when released. Passes bind buffers through
//! the `Copy` handle [`ImageView`], which carries the id plus the geometry
//! the stages need to compute their mappings.
//!
//! ```text
//!   output size ──► scaled_size(w, h, scale) ──► ImageSlot::ensure()
//!                                                   │ same size/format/mips?
//!                                        yes ◄──────┴──────► no
//!                                   reuse buffer         release old, allocate
//! ```

use crate::error::Result;
use crate::render::device::RenderDevice;
use bitflags::bitflags;
use log::debug;

/// Opaque device-assigned image identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

/// Pixel formats the pipeline works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Uploads, dot-mask tiles and most presentation surfaces
    Rgba8Unorm,
    /// Captured frames and BGRA surfaces
    Bgra8Unorm,
    /// Intermediates; holds signed chroma and HDR bloom
    Rgba16Float,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [
        ImageFormat::Rgba8Unorm,
        ImageFormat::Bgra8Unorm,
        ImageFormat::Rgba16Float,
    ];

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            ImageFormat::Rgba8Unorm | ImageFormat::Bgra8Unorm => 4,
            ImageFormat::Rgba16Float => 8,
        }
    }

    /// 8-bit unorm formats can be uploaded and read back byte-wise.
    pub fn is_unorm8(self) -> bool {
        !matches!(self, ImageFormat::Rgba16Float)
    }
}

bitflags! {
    /// How a buffer may be used by passes and the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const SAMPLED = 1 << 0;
        const RENDER_TARGET = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
    }
}

impl ImageUsage {
    /// Pass intermediates: written by one pass, sampled by the next.
    pub const INTERMEDIATE: ImageUsage = ImageUsage::SAMPLED.union(ImageUsage::RENDER_TARGET);
    /// Buffers filled from the CPU.
    pub const UPLOAD: ImageUsage = ImageUsage::SAMPLED.union(ImageUsage::COPY_DST);
    /// Presentation targets that the recorder copies out of.
    pub const OUTPUT: ImageUsage = ImageUsage::RENDER_TARGET
        .union(ImageUsage::SAMPLED)
        .union(ImageUsage::COPY_SRC);
}

/// Allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub mip_levels: u32,
    pub usage: ImageUsage,
}

impl ImageDesc {
    pub fn new(label: &'static str, width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            label,
            width: width.max(1),
            height: height.max(1),
            format,
            mip_levels: 1,
            usage: ImageUsage::INTERMEDIATE,
        }
    }

    pub fn with_mips(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.clamp(1, mip_count(self.width, self.height));
        self
    }

    pub fn with_usage(mut self, usage: ImageUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Copyable binding handle of an [`ImageBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageView {
    pub id: ImageId,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub mip_levels: u32,
}

impl ImageView {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A device-resident 2D surface. Not `Clone`: one owner at a time.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    id: ImageId,
    label: &'static str,
    width: u32,
    height: u32,
    format: ImageFormat,
    mip_levels: u32,
    usage: ImageUsage,
}

impl ImageBuffer {
    /// Called by devices once the backing storage exists.
    pub fn new(id: ImageId, desc: &ImageDesc) -> Self {
        Self {
            id,
            label: desc.label,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            mip_levels: desc.mip_levels,
            usage: desc.usage,
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn usage(&self) -> ImageUsage {
        self.usage
    }

    pub fn view(&self) -> ImageView {
        ImageView {
            id: self.id,
            width: self.width,
            height: self.height,
            format: self.format,
            mip_levels: self.mip_levels,
        }
    }

    fn matches(&self, width: u32, height: u32, format: ImageFormat, mip_levels: u32) -> bool {
        self.width == width
            && self.height == height
            && self.format == format
            && self.mip_levels == mip_levels
    }
}

/// Smallest normalized extent a source rectangle may have.
pub const MIN_RECT_EXTENT: f32 = 1.0e-4;

/// A sub-rectangle in normalized [0,1] coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Rect {
    fn default() -> Self {
        Rect::UNIT
    }
}

impl Rect {
    pub const UNIT: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp into the unit square with at least `MIN_RECT_EXTENT` per axis.
    pub fn clamped(&self) -> Rect {
        let (x, width) = clamp_axis(self.x, self.width);
        let (y, height) = clamp_axis(self.y, self.height);
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

fn clamp_axis(origin: f32, extent: f32) -> (f32, f32) {
    let origin = if origin.is_finite() { origin } else { 0.0 };
    let extent = if extent.is_finite() { extent } else { 1.0 };
    let origin = origin.clamp(0.0, 1.0 - MIN_RECT_EXTENT);
    let extent = extent.clamp(MIN_RECT_EXTENT, (1.0 - origin).max(MIN_RECT_EXTENT));
    (origin, extent)
}

/// Number of levels in a full mip chain for `width x height`.
pub fn mip_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}

/// `width * scale`, `height * scale` rounded to whole pixels, at least 1.
///
/// Rounding to whole pixels is what lets a slot converge once the output
/// size stops changing.
pub fn scaled_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let quantize = |v: u32| ((v as f32 * scale).round() as u32).max(1);
    (quantize(width), quantize(height))
}

/// One logical buffer of a stage or preset, reallocated only on change.
#[derive(Debug)]
pub struct ImageSlot {
    label: &'static str,
    usage: ImageUsage,
    buffer: Option<ImageBuffer>,
    allocations: u64,
}

impl ImageSlot {
    pub fn new(label: &'static str) -> Self {
        Self::with_usage(label, ImageUsage::INTERMEDIATE)
    }

    pub fn with_usage(label: &'static str, usage: ImageUsage) -> Self {
        Self {
            label,
            usage,
            buffer: None,
            allocations: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Return the current buffer if it already matches, otherwise swap in a
    /// freshly allocated one. On failure the slot is left empty.
    pub fn ensure(
        &mut self,
        device: &mut dyn RenderDevice,
        width: u32,
        height: u32,
        format: ImageFormat,
        mip_levels: u32,
    ) -> Result<ImageView> {
        let desc = ImageDesc::new(self.label, width, height, format)
            .with_mips(mip_levels)
            .with_usage(self.usage);
        if let Some(buffer) = &self.buffer {
            if buffer.matches(desc.width, desc.height, desc.format, desc.mip_levels) {
                return Ok(buffer.view());
            }
        }
        if let Some(old) = self.buffer.take() {
            device.release_image(old);
        }
        let buffer = device.create_image(&desc)?;
        self.allocations += 1;
        debug!(
            "ImageSlot: {} -> {}x{} {:?} mips={}",
            self.label, desc.width, desc.height, desc.format, desc.mip_levels
        );
        let view = buffer.view();
        self.buffer = Some(buffer);
        Ok(view)
    }

    pub fn view(&self) -> Option<ImageView> {
        self.buffer.as_ref().map(|b| b.view())
    }

    pub fn buffer(&self) -> Option<&ImageBuffer> {
        self.buffer.as_ref()
    }

    /// How many times this slot has (re)allocated.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        if let Some(buffer) = self.buffer.take() {
            device.release_image(buffer);
        }
    }
}

/// Write any 8-bit buffer to a PNG file, for tuning sessions.
#[cfg(feature = "image")]
pub fn dump_png(
    device: &mut dyn RenderDevice,
    view: ImageView,
    path: &std::path::Path,
) -> Result<()> {
    use crate::error::PipelineError;

    let mut data = device.read_image(view)?;
    if view.format == ImageFormat::Bgra8Unorm {
        for px in data.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }
    image::save_buffer(
        path,
        &data,
        view.width,
        view.height,
        image::ColorType::Rgba8,
    )
    .map_err(|e| PipelineError::Device(format!("Failed to save image: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::CpuDevice;

    #[test]
    fn test_slot_reuses_matching_buffer() {
        let mut device = CpuDevice::new();
        let mut slot = ImageSlot::new("work");
        let a = slot
            .ensure(&mut device, 64, 32, ImageFormat::Rgba16Float, 1)
            .unwrap();
        let b = slot
            .ensure(&mut device, 64, 32, ImageFormat::Rgba16Float, 1)
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(slot.allocations(), 1);
        assert_eq!(device.stats().live_images, 1);
    }

    #[test]
    fn test_slot_reallocates_on_size_change() {
        let mut device = CpuDevice::new();
        let mut slot = ImageSlot::new("work");
        let a = slot
            .ensure(&mut device, 64, 32, ImageFormat::Rgba16Float, 1)
            .unwrap();
        let b = slot
            .ensure(&mut device, 65, 32, ImageFormat::Rgba16Float, 1)
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(b.size(), (65, 32));
        let c = slot
            .ensure(&mut device, 65, 40, ImageFormat::Rgba16Float, 1)
            .unwrap();
        assert_ne!(b.id, c.id);
        assert_eq!(c.size(), (65, 40));
        assert_eq!(slot.allocations(), 3);
        // old buffers went back to the device
        assert_eq!(device.stats().live_images, 1);
    }

    #[test]
    fn test_slot_reallocates_on_format_or_mips() {
        let mut device = CpuDevice::new();
        let mut slot = ImageSlot::new("work");
        let a = slot
            .ensure(&mut device, 16, 16, ImageFormat::Rgba16Float, 1)
            .unwrap();
        let b = slot
            .ensure(&mut device, 16, 16, ImageFormat::Rgba8Unorm, 1)
            .unwrap();
        assert_ne!(a.id, b.id);
        let c = slot
            .ensure(&mut device, 16, 16, ImageFormat::Rgba8Unorm, 5)
            .unwrap();
        assert_ne!(b.id, c.id);
        assert_eq!(c.mip_levels, 5);
        // asking for more levels than the chain has clamps, so it still matches
        let d = slot
            .ensure(&mut device, 16, 16, ImageFormat::Rgba8Unorm, 99)
            .unwrap();
        assert_eq!(c.id, d.id);
    }

    #[test]
    fn test_slot_failure_leaves_slot_empty_and_retries() {
        let mut device = CpuDevice::new();
        let mut slot = ImageSlot::new("work");
        device.fail_allocations(1);
        assert!(slot
            .ensure(&mut device, 8, 8, ImageFormat::Rgba8Unorm, 1)
            .is_err());
        assert!(slot.view().is_none());
        assert!(slot
            .ensure(&mut device, 8, 8, ImageFormat::Rgba8Unorm, 1)
            .is_ok());
    }

    #[test]
    fn test_mip_count_and_scaled_size() {
        assert_eq!(mip_count(1, 1), 1);
        assert_eq!(mip_count(2, 1), 2);
        assert_eq!(mip_count(256, 100), 9);
        assert_eq!(mip_count(257, 3), 9);
        assert_eq!(scaled_size(1920, 1080, 0.5), (960, 540));
        assert_eq!(scaled_size(3, 3, 0.1), (1, 1));
        assert_eq!(scaled_size(100, 50, f32::NAN), (100, 50));
    }

    #[test]
    fn test_rect_clamped() {
        let r = Rect::new(-0.5, 0.25, 0.0, 2.0).clamped();
        assert_eq!(r.x, 0.0);
        assert_eq!(r.width, MIN_RECT_EXTENT);
        assert_eq!(r.y, 0.25);
        assert_eq!(r.height, 0.75);
        let r = Rect::new(1.0, 0.0, 1.0, f32::NAN).clamped();
        assert!(r.x + r.width <= 1.0 + 1.0e-6);
        assert!(r.width >= MIN_RECT_EXTENT);
        assert_eq!(r.height, 1.0);
        assert_eq!(Rect::UNIT.clamped(), Rect::UNIT);
    }
}
