//! Swapchain descriptors and the shared proxy swapchain handle.

use std::fmt;
use std::sync::Arc;

use crate::gpu::{NativeHandle, PixelFormat};

pub const SCALING_STRETCH: u32 = 0;
pub const ALPHA_MODE_UNSPECIFIED: u32 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleDesc {
    pub count: u32,
    pub quality: u32,
}

impl Default for SampleDesc {
    fn default() -> Self {
        Self {
            count: 1,
            quality: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeDesc {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: Rational,
    pub format: PixelFormat,
    pub scanline_ordering: u32,
    pub scaling: u32,
}

/// Descriptor of the older creation path, window and fullscreen state included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacySwapchainDesc {
    pub buffer_desc: ModeDesc,
    pub sample_desc: SampleDesc,
    pub buffer_usage: u32,
    pub buffer_count: u32,
    pub output_window: NativeHandle,
    pub windowed: bool,
    pub swap_effect: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapchainDesc1 {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub stereo: bool,
    pub sample_desc: SampleDesc,
    pub buffer_usage: u32,
    pub buffer_count: u32,
    pub scaling: u32,
    pub swap_effect: u32,
    pub alpha_mode: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullscreenDesc {
    pub refresh_rate: Rational,
    pub scanline_ordering: u32,
    pub scaling: u32,
    pub windowed: bool,
}

impl LegacySwapchainDesc {
    /// Splits into the modern descriptor plus its fullscreen part.
    ///
    /// Stereo is off, scaling is stretch and the alpha mode is left unspecified.
    pub fn to_modern(&self) -> (SwapchainDesc1, FullscreenDesc) {
        let mode = &self.buffer_desc;
        let fullscreen = FullscreenDesc {
            refresh_rate: mode.refresh_rate,
            scanline_ordering: mode.scanline_ordering,
            scaling: mode.scaling,
            windowed: self.windowed,
        };
        let desc = SwapchainDesc1 {
            width: mode.width,
            height: mode.height,
            format: mode.format,
            stereo: false,
            sample_desc: self.sample_desc,
            buffer_usage: self.buffer_usage,
            buffer_count: self.buffer_count,
            scaling: SCALING_STRETCH,
            swap_effect: self.swap_effect,
            alpha_mode: ALPHA_MODE_UNSPECIFIED,
            flags: self.flags,
        };
        (desc, fullscreen)
    }
}

impl From<&LegacySwapchainDesc> for (SwapchainDesc1, FullscreenDesc) {
    #[inline]
    fn from(legacy: &LegacySwapchainDesc) -> Self {
        legacy.to_modern()
    }
}

/// Interface revision the host asks the proxy swapchain for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapchainInterface {
    Swapchain1,
    Swapchain4,
}

/// Reference-counted swapchain object owned by the interpolation backend.
pub trait NativeSwapchain: Send + Sync {
    fn native(&self) -> NativeHandle;

    /// Returns the new reference count.
    fn add_ref(&self) -> u32;

    /// Returns the remaining reference count.
    fn release(&self) -> u32;

    /// `None` when the swapchain cannot describe itself.
    fn buffer_format(&self) -> Option<PixelFormat>;

    fn supports(&self, iface: SwapchainInterface) -> bool;
}

/// One counted reference to the proxy swapchain.
///
/// Cloning takes another reference on the native object, dropping gives it back. The
/// controller keeps one instance; the host presentation layer gets its own clone.
pub struct SwapchainProxy {
    inner: Arc<dyn NativeSwapchain>,
}

impl SwapchainProxy {
    /// Takes over a reference the caller already owns.
    #[inline]
    pub fn adopt(inner: Arc<dyn NativeSwapchain>) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.inner.native()
    }

    #[inline]
    pub fn buffer_format(&self) -> Option<PixelFormat> {
        self.inner.buffer_format()
    }

    #[inline]
    pub fn supports(&self, iface: SwapchainInterface) -> bool {
        self.inner.supports(iface)
    }
}

impl Clone for SwapchainProxy {
    fn clone(&self) -> Self {
        self.inner.add_ref();
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for SwapchainProxy {
    fn drop(&mut self) {
        let remaining = self.inner.release();
        log::trace!(target: "framegen", "proxy swapchain {:?} released, refs={remaining}", self.inner.native());
    }
}

impl fmt::Debug for SwapchainProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapchainProxy")
            .field("native", &self.inner.native())
            .finish()
    }
}
