//! Graphics-API-neutral view of the objects the host hands to the dispatch engine.
//!
//! The engine never creates or interprets GPU objects itself. It only needs identities,
//! descriptors and the ability to reset its own per-frame command lists.

use std::ffi::c_void;
use std::fmt;

use thiserror::Error;

/// Opaque pointer-sized handle to a host object (device, queue, factory, window,
/// command list, resource).
///
/// Stored as an integer so it can cross threads; it is only turned back into a pointer
/// at the FFI boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativeHandle(usize);

impl NativeHandle {
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn from_raw(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Pixel format identifier, numerically the DXGI format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelFormat(pub u32);

impl PixelFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R16G16B16A16_FLOAT: Self = Self(10);
    pub const R10G10B10A2_UNORM: Self = Self(24);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const R16G16_FLOAT: Self = Self(34);
    pub const D32_FLOAT: Self = Self(40);
    pub const B8G8R8A8_UNORM: Self = Self(87);
}

/// Dimensions and format as reported by the resource itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDesc {
    pub width: u64,
    pub height: u32,
    pub format: PixelFormat,
}

/// State a resource is in when the interpolation backend receives it.
///
/// Numeric values follow the D3D12 resource-state bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResourceState {
    NonPixelShaderResource = 0x40,
    CopySource = 0x800,
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("command list slot {slot} creation failed: {message}")]
    CommandListCreation { slot: usize, message: String },

    #[error("command list reset failed: {0}")]
    Reset(String),
}

/// A GPU resource supplied by the host renderer.
pub trait GpuResource: Send + Sync {
    fn native(&self) -> NativeHandle;
    fn desc(&self) -> ResourceDesc;
}

/// One allocator/command-list pair owned by the engine.
pub trait FrameCommandList: Send {
    fn native(&self) -> NativeHandle;

    /// Resets the allocator and reopens the list for recording.
    fn reset(&mut self) -> Result<(), GpuError>;
}

/// Graphics device the engine's contexts are bound to.
pub trait GpuDevice: Send + Sync {
    fn native(&self) -> NativeHandle;
    fn create_frame_command_list(&self, slot: usize) -> Result<Box<dyn FrameCommandList>, GpuError>;
}
