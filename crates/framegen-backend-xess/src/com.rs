use std::ffi::c_void;
use std::mem::MaybeUninit;

use framegen_core::gpu::{NativeHandle, PixelFormat};
use framegen_core::swapchain::{NativeSwapchain, SwapchainInterface};

use crate::ffi::{ComObject, DXGI_SWAP_CHAIN_DESC, IID_IDXGISWAPCHAIN1, IID_IDXGISWAPCHAIN4};

/// Proxy swapchain returned by the interpolation module, seen through its COM vtable.
///
/// Holds no reference of its own; `SwapchainProxy` does the counting.
pub struct ComSwapchain {
    ptr: NativeHandle,
}

impl ComSwapchain {
    /// # Safety
    /// `ptr` must point to a live IDXGISwapChain-derived object for as long as this
    /// value or any reference it hands out is in use.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut c_void) -> Self {
        Self {
            ptr: NativeHandle::from_ptr(ptr),
        }
    }

    #[inline]
    fn object(&self) -> *mut ComObject {
        self.ptr.as_ptr().cast()
    }
}

impl NativeSwapchain for ComSwapchain {
    fn native(&self) -> NativeHandle {
        self.ptr
    }

    fn add_ref(&self) -> u32 {
        let obj = self.object();
        unsafe { ((*(*obj).vtbl).AddRef)(obj.cast()) }
    }

    fn release(&self) -> u32 {
        let obj = self.object();
        unsafe { ((*(*obj).vtbl).Release)(obj.cast()) }
    }

    fn buffer_format(&self) -> Option<PixelFormat> {
        let obj = self.object();
        let mut desc = MaybeUninit::<DXGI_SWAP_CHAIN_DESC>::zeroed();
        let hr = unsafe { ((*(*obj).vtbl).GetDesc)(obj.cast(), desc.as_mut_ptr()) };
        if hr < 0 {
            log::warn!(target: "framegen::xefg", "proxy GetDesc failed: 0x{:X}", hr as u32);
            return None;
        }
        let desc = unsafe { desc.assume_init() };
        Some(PixelFormat(desc.BufferDesc.Format))
    }

    fn supports(&self, iface: SwapchainInterface) -> bool {
        let iid = match iface {
            SwapchainInterface::Swapchain1 => &IID_IDXGISWAPCHAIN1,
            SwapchainInterface::Swapchain4 => &IID_IDXGISWAPCHAIN4,
        };
        let obj = self.object();
        let mut out: *mut c_void = std::ptr::null_mut();
        let hr = unsafe { ((*(*obj).vtbl).QueryInterface)(obj.cast(), iid, &mut out) };
        if hr < 0 || out.is_null() {
            log::debug!(target: "framegen::xefg", "QueryInterface {iface:?} failed: 0x{:X}", hr as u32);
            return false;
        }
        // Drop the reference QueryInterface added.
        let queried = out.cast::<ComObject>();
        unsafe { ((*(*queried).vtbl).Release)(out) };
        true
    }
}
