// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Render Devices
//!
//! [`RenderDevice`] is the seam between the pass graph and the hardware,
//! similar to the `Adapter` trait the terminal and graphics backends share:
//! stages and presets encode [`CommandList`]s against it and never touch a
//! backend type directly.
//!
//! * [`CpuDevice`]: headless reference implementation of every kernel. Used
//!   by the tests and by hosts without a GPU.
//! * `WgpuDevice` (feature `wgpu`): the same kernels as WGSL fragment shaders.
//!
//! The device is created once by the host and handed to the pipeline; there
//! is no global device, queue or shader library.

use crate::error::Result;
use crate::render::image::{ImageBuffer, ImageDesc, ImageView};
use crate::render::pass::{CommandList, PassKind};

mod cpu;
pub use cpu::{CpuDevice, CpuStats};

#[cfg(feature = "wgpu")]
mod gpu;
#[cfg(feature = "wgpu")]
pub use gpu::WgpuDevice;

pub trait RenderDevice {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    fn create_image(&mut self, desc: &ImageDesc) -> Result<ImageBuffer>;

    /// Give a buffer back. Unknown buffers are ignored.
    fn release_image(&mut self, image: ImageBuffer);

    /// Upload level 0 of an 8-bit image. `bytes_per_row` may include padding.
    fn write_image(&mut self, image: ImageView, data: &[u8], bytes_per_row: u32) -> Result<()>;

    /// Copy level 0 of an 8-bit image out, rows tightly packed.
    fn read_image(&mut self, image: ImageView) -> Result<Vec<u8>>;

    /// Build the kernel so later submissions can use it.
    fn compile(&mut self, kind: PassKind) -> Result<()>;

    fn is_compiled(&self, kind: PassKind) -> bool;

    /// Execute one frame's commands in order.
    fn submit(&mut self, commands: CommandList) -> Result<()>;
}

impl<T: RenderDevice + ?Sized> RenderDevice for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<ImageBuffer> {
        (**self).create_image(desc)
    }

    fn release_image(&mut self, image: ImageBuffer) {
        (**self).release_image(image)
    }

    fn write_image(&mut self, image: ImageView, data: &[u8], bytes_per_row: u32) -> Result<()> {
        (**self).write_image(image, data, bytes_per_row)
    }

    fn read_image(&mut self, image: ImageView) -> Result<Vec<u8>> {
        (**self).read_image(image)
    }

    fn compile(&mut self, kind: PassKind) -> Result<()> {
        (**self).compile(kind)
    }

    fn is_compiled(&self, kind: PassKind) -> bool {
        (**self).is_compiled(kind)
    }

    fn submit(&mut self, commands: CommandList) -> Result<()> {
        (**self).submit(commands)
    }
}

/// Compile every kernel in `kinds`, stopping at the first failure.
pub fn compile_all(device: &mut dyn RenderDevice, kinds: &[PassKind]) -> Result<()> {
    for kind in kinds {
        if !device.is_compiled(*kind) {
            device.compile(*kind)?;
        }
    }
    Ok(())
}
