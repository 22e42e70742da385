//! C ABI of the XeSS-FG swapchain and XeLL modules, plus the slice of DXGI/COM the
//! proxy swapchain wrapper needs.
//!
//! Layouts follow the vendor SDK headers (XeSS-FG 1.x, XeLL 1.x).

#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::{c_char, c_void};

use framegen_core::backend::{BackendError, BackendStatus, BackendWarning};

pub type xefg_handle_t = *mut c_void;
pub type xell_handle_t = *mut c_void;
pub type HRESULT = i32;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xefg_version_t {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub reserved: u16,
}

pub type xell_version_t = xefg_version_t;

pub const XEFG_LOGGING_LEVEL_DEBUG: i32 = 0;
pub const XEFG_LOGGING_LEVEL_INFO: i32 = 1;
pub const XEFG_LOGGING_LEVEL_WARNING: i32 = 2;
pub const XEFG_LOGGING_LEVEL_ERROR: i32 = 3;

pub const XEFG_RES_HUDLESS_COLOR: i32 = 0;
pub const XEFG_RES_MOTION_VECTOR: i32 = 1;
pub const XEFG_RES_DEPTH: i32 = 2;
pub const XEFG_RES_UI: i32 = 3;
pub const XEFG_RES_BACKBUFFER: i32 = 4;

pub const XEFG_RV_UNTIL_NEXT_PRESENT: i32 = 0;
pub const XEFG_RV_ONLY_NOW: i32 = 1;

pub const XEFG_UI_MODE_AUTO: i32 = 0;
pub const XEFG_UI_MODE_NONE: i32 = 1;
pub const XEFG_UI_MODE_BACKBUFFER: i32 = 2;
pub const XEFG_UI_MODE_HUDLESS_UITEXTURE: i32 = 3;
pub const XEFG_UI_MODE_UITEXTURE: i32 = 4;

pub const XEFG_DEBUG_SHOW_ONLY_INTERPOLATION: i32 = 0;
pub const XEFG_DEBUG_TAG_INTERPOLATED_FRAMES: i32 = 1;
pub const XEFG_DEBUG_PRESENT_FAILED_INTERPOLATION: i32 = 2;

pub const XEFG_PRESENT_SUCCESS: i32 = 0;
pub const XEFG_PRESENT_SKIPPED: i32 = 1;
pub const XEFG_PRESENT_RESOURCE_MISMATCH: i32 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xefg_frame_constant_data_t {
    pub viewMatrix: [f32; 16],
    pub projectionMatrix: [f32; 16],
    pub jitterOffsetX: f32,
    pub jitterOffsetY: f32,
    pub motionVectorScaleX: f32,
    pub motionVectorScaleY: f32,
    pub resetHistory: u32,
    pub frameRenderTime: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xefg_2d_t {
    pub x: u32,
    pub y: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xefg_d3d12_resource_data_t {
    pub r#type: i32,
    pub validity: i32,
    pub resourceBase: xefg_2d_t,
    pub resourceSize: xefg_2d_t,
    pub pResource: *mut c_void,
    pub incomingState: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xefg_d3d12_init_params_t {
    pub pApplicationSwapChain: *mut c_void,
    pub initFlags: u32,
    pub maxInterpolatedFrames: u32,
    pub uiMode: i32,
    pub creationNodeMask: u32,
    pub visibleNodeMask: u32,
    pub pTempBufferHeap: *mut c_void,
    pub bufferHeapOffset: u64,
    pub pTempTextureHeap: *mut c_void,
    pub textureHeapOffset: u64,
    pub pPipelineLibrary: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xefg_present_status_t {
    pub framesPresented: u32,
    pub isFrameGenEnabled: u32,
    pub frameGenPresentStatus: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xell_sleep_params_t {
    pub bLowLatencyMode: u32,
    pub bLowLatencyBoost: u32,
    pub minimumIntervalUs: u32,
}

pub const XELL_SIMULATION_START: i32 = 0;
pub const XELL_SIMULATION_END: i32 = 1;
pub const XELL_RENDERSUBMIT_START: i32 = 2;
pub const XELL_RENDERSUBMIT_END: i32 = 3;
pub const XELL_PRESENT_START: i32 = 4;
pub const XELL_PRESENT_END: i32 = 5;

pub const XELL_LOGGING_LEVEL_DEBUG: i32 = 0;
pub const XELL_LOGGING_LEVEL_INFO: i32 = 1;
pub const XELL_LOGGING_LEVEL_WARNING: i32 = 2;
pub const XELL_LOGGING_LEVEL_ERROR: i32 = 3;

/// Entries `xellGetFramesReports` writes per call.
pub const XELL_FRAME_REPORT_COUNT: usize = 64;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xell_frame_report_t {
    pub frameID: u32,
    pub simStartTime: u64,
    pub simEndTime: u64,
    pub renderSubmitStartTime: u64,
    pub renderSubmitEndTime: u64,
    pub presentStartTime: u64,
    pub presentEndTime: u64,
    pub driverStartTime: u64,
    pub driverEndTime: u64,
    pub osRenderQueueStartTime: u64,
    pub osRenderQueueEndTime: u64,
    pub gpuRenderStartTime: u64,
    pub gpuRenderEndTime: u64,
}

pub type xefg_log_callback_t =
    Option<unsafe extern "C" fn(message: *const c_char, level: i32, user_data: *mut c_void)>;
pub type xell_log_callback_t = Option<unsafe extern "C" fn(message: *const c_char, level: i32)>;

// xefgSwapChain* entry points.
pub type PFN_GetVersion = unsafe extern "C" fn(*mut xefg_version_t) -> i32;
pub type PFN_GetProperties = unsafe extern "C" fn(xefg_handle_t, *mut c_void) -> i32;
pub type PFN_TagFrameConstants =
    unsafe extern "C" fn(xefg_handle_t, u32, *const xefg_frame_constant_data_t) -> i32;
pub type PFN_SetEnabled = unsafe extern "C" fn(xefg_handle_t, u32) -> i32;
pub type PFN_SetPresentId = unsafe extern "C" fn(xefg_handle_t, u32) -> i32;
pub type PFN_GetLastPresentStatus =
    unsafe extern "C" fn(xefg_handle_t, *mut xefg_present_status_t) -> i32;
pub type PFN_SetLoggingCallback =
    unsafe extern "C" fn(xefg_handle_t, i32, xefg_log_callback_t, *mut c_void) -> i32;
pub type PFN_Destroy = unsafe extern "C" fn(xefg_handle_t) -> i32;
pub type PFN_SetLatencyReduction = unsafe extern "C" fn(xefg_handle_t, *mut c_void) -> i32;
pub type PFN_SetSceneChangeThreshold = unsafe extern "C" fn(xefg_handle_t, f32) -> i32;
pub type PFN_GetPipelineBuildStatus = unsafe extern "C" fn(xefg_handle_t) -> i32;
pub type PFN_D3D12CreateContext = unsafe extern "C" fn(*mut c_void, *mut xefg_handle_t) -> i32;
pub type PFN_D3D12BuildPipelines = unsafe extern "C" fn(xefg_handle_t, *mut c_void, bool, u32) -> i32;
pub type PFN_D3D12InitFromSwapChain =
    unsafe extern "C" fn(xefg_handle_t, *mut c_void, *const xefg_d3d12_init_params_t) -> i32;
pub type PFN_D3D12InitFromSwapChainDesc = unsafe extern "C" fn(
    xefg_handle_t,
    *mut c_void,
    *const DXGI_SWAP_CHAIN_DESC1,
    *const DXGI_SWAP_CHAIN_FULLSCREEN_DESC,
    *mut c_void,
    *mut c_void,
    *const xefg_d3d12_init_params_t,
) -> i32;
pub type PFN_D3D12GetSwapChainPtr =
    unsafe extern "C" fn(xefg_handle_t, *const GUID, *mut *mut c_void) -> i32;
pub type PFN_D3D12TagFrameResource = unsafe extern "C" fn(
    xefg_handle_t,
    *mut c_void,
    u32,
    *const xefg_d3d12_resource_data_t,
) -> i32;
pub type PFN_D3D12SetDescriptorHeap = unsafe extern "C" fn(xefg_handle_t, *mut c_void, u32) -> i32;
pub type PFN_EnableDebugFeature = unsafe extern "C" fn(xefg_handle_t, i32, u32, *mut c_void) -> i32;

// xell* entry points.
pub type PFN_xellD3D12CreateContext = unsafe extern "C" fn(*mut c_void, *mut xell_handle_t) -> i32;
pub type PFN_xellDestroyContext = unsafe extern "C" fn(xell_handle_t) -> i32;
pub type PFN_xellSetSleepMode = unsafe extern "C" fn(xell_handle_t, *const xell_sleep_params_t) -> i32;
pub type PFN_xellGetSleepMode = unsafe extern "C" fn(xell_handle_t, *mut xell_sleep_params_t) -> i32;
pub type PFN_xellSleep = unsafe extern "C" fn(xell_handle_t, u32) -> i32;
pub type PFN_xellAddMarkerData = unsafe extern "C" fn(xell_handle_t, u32, i32) -> i32;
pub type PFN_xellGetVersion = unsafe extern "C" fn(*mut xell_version_t) -> i32;
pub type PFN_xellSetLoggingCallback =
    unsafe extern "C" fn(xell_handle_t, i32, xell_log_callback_t) -> i32;
pub type PFN_xellGetFramesReports =
    unsafe extern "C" fn(xell_handle_t, *mut xell_frame_report_t) -> i32;

/// Maps an `xefg_swapchain_result_t` code.
pub fn xefg_status(code: i32) -> BackendStatus {
    match code {
        0 => BackendStatus::Success,
        1 => BackendStatus::Warning(BackendWarning::OldDriver),
        2 => BackendStatus::Warning(BackendWarning::TooFewFrames),
        3 => BackendStatus::Warning(BackendWarning::FrameIdMismatch),
        4 => BackendStatus::Warning(BackendWarning::MissingPresentStatus),
        5 => BackendStatus::Warning(BackendWarning::ResourceSizeMismatch),
        c if c > 0 => BackendStatus::Warning(BackendWarning::Unknown(c)),
        c => BackendStatus::Error(xefg_error(c)),
    }
}

fn xefg_error(code: i32) -> BackendError {
    match code {
        -1 => BackendError::UnsupportedDevice,
        -2 => BackendError::UnsupportedDriver,
        -3 => BackendError::Uninitialized,
        -4 => BackendError::InvalidArgument,
        -5 => BackendError::DeviceOutOfMemory,
        -6 => BackendError::Device,
        -7 => BackendError::NotImplemented,
        -8 => BackendError::InvalidContext,
        -9 => BackendError::OperationInProgress,
        -10 => BackendError::Unsupported,
        -11 => BackendError::CantLoadLibrary,
        -12 => BackendError::MismatchInputResources,
        -13 => BackendError::IncorrectOutputResources,
        -14 => BackendError::IncorrectInputResources,
        -15 => BackendError::LatencyReductionUnsupported,
        -16 => BackendError::LatencyReductionFunctionMissing,
        -17 => BackendError::HresultFailure,
        -18 => BackendError::DxgiInvalidCall,
        -19 => BackendError::PointerStillInUse,
        -20 => BackendError::InvalidDescriptorHeap,
        -21 => BackendError::WrongCallOrder,
        c => BackendError::Unknown(c),
    }
}

/// Maps an `xell_result_t` code. XeLL has no warning range.
pub fn xell_status(code: i32) -> BackendStatus {
    let err = match code {
        0 => return BackendStatus::Success,
        -1 => BackendError::UnsupportedDevice,
        -2 => BackendError::UnsupportedDriver,
        -3 => BackendError::Uninitialized,
        -4 => BackendError::InvalidArgument,
        -6 => BackendError::Device,
        -7 => BackendError::NotImplemented,
        -8 => BackendError::InvalidContext,
        -10 => BackendError::Unsupported,
        c => BackendError::Unknown(c),
    };
    BackendStatus::Error(err)
}

// DXGI / COM

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GUID {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

pub const IID_IDXGISWAPCHAIN1: GUID = GUID {
    data1: 0x790a45f7,
    data2: 0x0d42,
    data3: 0x4876,
    data4: [0x98, 0x3a, 0x0a, 0x55, 0xcf, 0xe6, 0xf4, 0xaa],
};

pub const IID_IDXGISWAPCHAIN4: GUID = GUID {
    data1: 0x3d585d5a,
    data2: 0xbd4a,
    data3: 0x489e,
    data4: [0xb1, 0xf4, 0x3d, 0xbc, 0xb6, 0x45, 0x2f, 0xfb],
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DXGI_RATIONAL {
    pub Numerator: u32,
    pub Denominator: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DXGI_SAMPLE_DESC {
    pub Count: u32,
    pub Quality: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DXGI_MODE_DESC {
    pub Width: u32,
    pub Height: u32,
    pub RefreshRate: DXGI_RATIONAL,
    pub Format: u32,
    pub ScanlineOrdering: u32,
    pub Scaling: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DXGI_SWAP_CHAIN_DESC {
    pub BufferDesc: DXGI_MODE_DESC,
    pub SampleDesc: DXGI_SAMPLE_DESC,
    pub BufferUsage: u32,
    pub BufferCount: u32,
    pub OutputWindow: *mut c_void,
    pub Windowed: i32,
    pub SwapEffect: u32,
    pub Flags: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DXGI_SWAP_CHAIN_DESC1 {
    pub Width: u32,
    pub Height: u32,
    pub Format: u32,
    pub Stereo: i32,
    pub SampleDesc: DXGI_SAMPLE_DESC,
    pub BufferUsage: u32,
    pub BufferCount: u32,
    pub Scaling: u32,
    pub SwapEffect: u32,
    pub AlphaMode: u32,
    pub Flags: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DXGI_SWAP_CHAIN_FULLSCREEN_DESC {
    pub RefreshRate: DXGI_RATIONAL,
    pub ScanlineOrdering: u32,
    pub Scaling: u32,
    pub Windowed: i32,
}

/// Leading slots of the IDXGISwapChain vtable, up to `GetDesc`.
#[repr(C)]
pub struct IDXGISwapChainVtbl {
    pub QueryInterface:
        unsafe extern "system" fn(*mut c_void, *const GUID, *mut *mut c_void) -> HRESULT,
    pub AddRef: unsafe extern "system" fn(*mut c_void) -> u32,
    pub Release: unsafe extern "system" fn(*mut c_void) -> u32,
    pub SetPrivateData: *const c_void,
    pub SetPrivateDataInterface: *const c_void,
    pub GetPrivateData: *const c_void,
    pub GetParent: *const c_void,
    pub GetDevice: *const c_void,
    pub Present: *const c_void,
    pub GetBuffer: *const c_void,
    pub SetFullscreenState: *const c_void,
    pub GetFullscreenState: *const c_void,
    pub GetDesc: unsafe extern "system" fn(*mut c_void, *mut DXGI_SWAP_CHAIN_DESC) -> HRESULT,
}

#[repr(C)]
pub struct ComObject {
    pub vtbl: *const IDXGISwapChainVtbl,
}
