use std::ffi::{c_char, c_void, CStr};
use std::sync::Arc;

use framegen_core::backend::{
    BackendError, BackendLogLevel, BackendStatus, BackendVersion, DebugFeature,
    InterpolationBackend, InterpolationCap, InterpolationHandle, PacingHandle, PresentOutcome,
    PresentStatus, SwapchainInitRequest, UiMode,
};
use framegen_core::frame::FrameConstants;
use framegen_core::gpu::NativeHandle;
use framegen_core::swapchain::{FullscreenDesc, NativeSwapchain, SwapchainDesc1};
use framegen_core::sync::HookSuppression;
use framegen_core::tagging::{ResourceKind, ResourceTag, Validity};
use libloading::Library;
use parking_lot::Mutex;

use crate::com::ComSwapchain;
use crate::ffi::*;
use crate::loader::{symbol as sym, LibraryLoadError, LibraryLocator, LibraryOrigin};

pub const XEFG_LIBRARY: &str = "libxess_fg.dll";

#[inline]
fn unresolved(name: &'static str) -> BackendStatus {
    BackendStatus::Error(BackendError::Unresolved(name))
}

struct XefgApi {
    get_version: Option<PFN_GetVersion>,
    get_properties: Option<PFN_GetProperties>,
    tag_frame_constants: Option<PFN_TagFrameConstants>,
    set_enabled: Option<PFN_SetEnabled>,
    set_present_id: Option<PFN_SetPresentId>,
    get_last_present_status: Option<PFN_GetLastPresentStatus>,
    set_logging_callback: Option<PFN_SetLoggingCallback>,
    destroy: Option<PFN_Destroy>,
    set_latency_reduction: Option<PFN_SetLatencyReduction>,
    set_scene_change_threshold: Option<PFN_SetSceneChangeThreshold>,
    get_pipeline_build_status: Option<PFN_GetPipelineBuildStatus>,
    d3d12_create_context: Option<PFN_D3D12CreateContext>,
    d3d12_build_pipelines: Option<PFN_D3D12BuildPipelines>,
    d3d12_init_from_swapchain: Option<PFN_D3D12InitFromSwapChain>,
    d3d12_init_from_swapchain_desc: Option<PFN_D3D12InitFromSwapChainDesc>,
    d3d12_get_swapchain_ptr: Option<PFN_D3D12GetSwapChainPtr>,
    d3d12_tag_frame_resource: Option<PFN_D3D12TagFrameResource>,
    d3d12_set_descriptor_heap: Option<PFN_D3D12SetDescriptorHeap>,
    enable_debug_feature: Option<PFN_EnableDebugFeature>,
}

impl XefgApi {
    unsafe fn resolve(lib: &Library) -> Self {
        unsafe {
            Self {
                get_version: sym(lib, b"xefgSwapChainGetVersion\0"),
                get_properties: sym(lib, b"xefgSwapChainGetProperties\0"),
                tag_frame_constants: sym(lib, b"xefgSwapChainTagFrameConstants\0"),
                set_enabled: sym(lib, b"xefgSwapChainSetEnabled\0"),
                set_present_id: sym(lib, b"xefgSwapChainSetPresentId\0"),
                get_last_present_status: sym(lib, b"xefgSwapChainGetLastPresentStatus\0"),
                set_logging_callback: sym(lib, b"xefgSwapChainSetLoggingCallback\0"),
                destroy: sym(lib, b"xefgSwapChainDestroy\0"),
                set_latency_reduction: sym(lib, b"xefgSwapChainSetLatencyReduction\0"),
                set_scene_change_threshold: sym(lib, b"xefgSwapChainSetSceneChangeThreshold\0"),
                get_pipeline_build_status: sym(lib, b"xefgSwapChainGetPipelineBuildStatus\0"),
                d3d12_create_context: sym(lib, b"xefgSwapChainD3D12CreateContext\0"),
                d3d12_build_pipelines: sym(lib, b"xefgSwapChainD3D12BuildPipelines\0"),
                d3d12_init_from_swapchain: sym(lib, b"xefgSwapChainD3D12InitFromSwapChain\0"),
                d3d12_init_from_swapchain_desc: sym(lib, b"xefgSwapChainD3D12InitFromSwapChainDesc\0"),
                d3d12_get_swapchain_ptr: sym(lib, b"xefgSwapChainD3D12GetSwapChainPtr\0"),
                d3d12_tag_frame_resource: sym(lib, b"xefgSwapChainD3D12TagFrameResource\0"),
                d3d12_set_descriptor_heap: sym(lib, b"xefgSwapChainD3D12SetDescriptorHeap\0"),
                enable_debug_feature: sym(lib, b"xefgSwapChainEnableDebugFeature\0"),
            }
        }
    }

    fn missing(&self) -> Vec<&'static str> {
        let table = [
            ("xefgSwapChainGetVersion", self.get_version.is_some()),
            ("xefgSwapChainGetProperties", self.get_properties.is_some()),
            ("xefgSwapChainTagFrameConstants", self.tag_frame_constants.is_some()),
            ("xefgSwapChainSetEnabled", self.set_enabled.is_some()),
            ("xefgSwapChainSetPresentId", self.set_present_id.is_some()),
            ("xefgSwapChainGetLastPresentStatus", self.get_last_present_status.is_some()),
            ("xefgSwapChainSetLoggingCallback", self.set_logging_callback.is_some()),
            ("xefgSwapChainDestroy", self.destroy.is_some()),
            ("xefgSwapChainSetLatencyReduction", self.set_latency_reduction.is_some()),
            ("xefgSwapChainSetSceneChangeThreshold", self.set_scene_change_threshold.is_some()),
            ("xefgSwapChainGetPipelineBuildStatus", self.get_pipeline_build_status.is_some()),
            ("xefgSwapChainD3D12CreateContext", self.d3d12_create_context.is_some()),
            ("xefgSwapChainD3D12BuildPipelines", self.d3d12_build_pipelines.is_some()),
            ("xefgSwapChainD3D12InitFromSwapChain", self.d3d12_init_from_swapchain.is_some()),
            ("xefgSwapChainD3D12InitFromSwapChainDesc", self.d3d12_init_from_swapchain_desc.is_some()),
            ("xefgSwapChainD3D12GetSwapChainPtr", self.d3d12_get_swapchain_ptr.is_some()),
            ("xefgSwapChainD3D12TagFrameResource", self.d3d12_tag_frame_resource.is_some()),
            ("xefgSwapChainD3D12SetDescriptorHeap", self.d3d12_set_descriptor_heap.is_some()),
            ("xefgSwapChainEnableDebugFeature", self.enable_debug_feature.is_some()),
        ];
        table
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| name)
            .collect()
    }
}

unsafe extern "C" fn log_callback(message: *const c_char, level: i32, _user: *mut c_void) {
    if message.is_null() {
        return;
    }
    let msg = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    match level {
        XEFG_LOGGING_LEVEL_DEBUG => log::debug!(target: "framegen::xefg", "{msg}"),
        XEFG_LOGGING_LEVEL_WARNING => log::warn!(target: "framegen::xefg", "{msg}"),
        XEFG_LOGGING_LEVEL_ERROR => log::error!(target: "framegen::xefg", "{msg}"),
        _ => log::info!(target: "framegen::xefg", "{msg}"),
    }
}

/// XeSS-FG swapchain module resolved at runtime.
pub struct XefgBackend {
    api: XefgApi,
    version: Mutex<BackendVersion>,
    origin: LibraryOrigin,
    _lib: Library,
}

impl XefgBackend {
    /// Loads the module and resolves its entry points.
    ///
    /// Fails unless both the version query and context creation are exported.
    pub fn load(locator: &LibraryLocator, hooks: &HookSuppression) -> Result<Self, LibraryLoadError> {
        let loaded = locator.open(hooks)?;
        let api = unsafe { XefgApi::resolve(&loaded.lib) };

        if api.get_version.is_none() || api.d3d12_create_context.is_none() {
            return Err(LibraryLoadError {
                name: locator.file_name(),
                tried: Vec::new(),
                message: format!("required entry points missing ({:?})", loaded.origin),
            });
        }

        let missing = api.missing();
        if !missing.is_empty() {
            log::debug!(target: "framegen::xefg", "optional entry points missing: {}", missing.join(", "));
        }

        let backend = Self {
            api,
            version: Mutex::new(BackendVersion::ZERO),
            origin: loaded.origin,
            _lib: loaded.lib,
        };
        log::info!(target: "framegen::xefg", "XeSS-FG {} loaded from {:?}", backend.version(), backend.origin);
        Ok(backend)
    }

    #[inline]
    pub fn origin(&self) -> &LibraryOrigin {
        &self.origin
    }

    /// Entry points the module does not export.
    pub fn missing_entry_points(&self) -> Vec<&'static str> {
        self.api.missing()
    }
}

impl InterpolationBackend for XefgBackend {
    fn name(&self) -> &'static str {
        "XeSS-FG"
    }

    fn version(&self) -> BackendVersion {
        let mut cached = self.version.lock();
        if cached.is_zero() {
            if let Some(f) = self.api.get_version {
                let mut raw = xefg_version_t::default();
                if xefg_status(unsafe { f(&mut raw) }).is_ok() {
                    *cached = BackendVersion::new(raw.major, raw.minor, raw.patch);
                }
            }
        }
        *cached
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn supports(&self, cap: InterpolationCap) -> bool {
        let api = &self.api;
        match cap {
            InterpolationCap::SetEnabled => api.set_enabled.is_some(),
            InterpolationCap::TagFrameConstants => api.tag_frame_constants.is_some(),
            InterpolationCap::TagFrameResource => api.d3d12_tag_frame_resource.is_some(),
            InterpolationCap::SetPresentId => api.set_present_id.is_some(),
            InterpolationCap::LastPresentStatus => api.get_last_present_status.is_some(),
            InterpolationCap::LatencyReduction => api.set_latency_reduction.is_some(),
            InterpolationCap::SceneChangeThreshold => api.set_scene_change_threshold.is_some(),
            InterpolationCap::DebugFeatures => api.enable_debug_feature.is_some(),
            InterpolationCap::Logging => api.set_logging_callback.is_some(),
        }
    }

    fn create_context(&self, device: NativeHandle) -> Result<InterpolationHandle, BackendError> {
        let f = self
            .api
            .d3d12_create_context
            .ok_or(BackendError::Unresolved("xefgSwapChainD3D12CreateContext"))?;
        let mut handle: xefg_handle_t = std::ptr::null_mut();
        xefg_status(unsafe { f(device.as_ptr(), &mut handle) }).into_result()?;
        if handle.is_null() {
            return Err(BackendError::InvalidContext);
        }
        Ok(InterpolationHandle(NativeHandle::from_ptr(handle)))
    }

    fn destroy(&self, ctx: InterpolationHandle) -> BackendStatus {
        let Some(f) = self.api.destroy else {
            return unresolved("xefgSwapChainDestroy");
        };
        xefg_status(unsafe { f(ctx.0.as_ptr()) })
    }

    fn set_logging(&self, ctx: InterpolationHandle, level: BackendLogLevel) -> BackendStatus {
        let Some(f) = self.api.set_logging_callback else {
            return unresolved("xefgSwapChainSetLoggingCallback");
        };
        let level = match level {
            BackendLogLevel::Debug => XEFG_LOGGING_LEVEL_DEBUG,
            BackendLogLevel::Warning => XEFG_LOGGING_LEVEL_WARNING,
        };
        xefg_status(unsafe {
            f(ctx.0.as_ptr(), level, Some(log_callback), std::ptr::null_mut())
        })
    }

    fn set_latency_reduction(&self, ctx: InterpolationHandle, pacing: PacingHandle) -> BackendStatus {
        let Some(f) = self.api.set_latency_reduction else {
            return unresolved("xefgSwapChainSetLatencyReduction");
        };
        xefg_status(unsafe { f(ctx.0.as_ptr(), pacing.0.as_ptr()) })
    }

    fn set_enabled(&self, ctx: InterpolationHandle, enabled: bool) -> BackendStatus {
        let Some(f) = self.api.set_enabled else {
            return unresolved("xefgSwapChainSetEnabled");
        };
        xefg_status(unsafe { f(ctx.0.as_ptr(), u32::from(enabled)) })
    }

    fn set_scene_change_threshold(&self, ctx: InterpolationHandle, threshold: f32) -> BackendStatus {
        let Some(f) = self.api.set_scene_change_threshold else {
            return unresolved("xefgSwapChainSetSceneChangeThreshold");
        };
        xefg_status(unsafe { f(ctx.0.as_ptr(), threshold) })
    }

    fn enable_debug_feature(
        &self,
        ctx: InterpolationHandle,
        feature: DebugFeature,
        enable: bool,
    ) -> BackendStatus {
        let Some(f) = self.api.enable_debug_feature else {
            return unresolved("xefgSwapChainEnableDebugFeature");
        };
        let id = match feature {
            DebugFeature::ShowOnlyInterpolation => XEFG_DEBUG_SHOW_ONLY_INTERPOLATION,
            DebugFeature::TagInterpolatedFrames => XEFG_DEBUG_TAG_INTERPOLATED_FRAMES,
            DebugFeature::PresentFailedInterpolation => XEFG_DEBUG_PRESENT_FAILED_INTERPOLATION,
        };
        xefg_status(unsafe { f(ctx.0.as_ptr(), id, u32::from(enable), std::ptr::null_mut()) })
    }

    fn init_from_swapchain_desc(
        &self,
        ctx: InterpolationHandle,
        request: &SwapchainInitRequest,
    ) -> BackendStatus {
        let Some(f) = self.api.d3d12_init_from_swapchain_desc else {
            return unresolved("xefgSwapChainD3D12InitFromSwapChainDesc");
        };

        let desc = desc1_to_ffi(&request.desc);
        let fullscreen = request.fullscreen.as_ref().map(fullscreen_to_ffi);
        let fullscreen_ptr = fullscreen
            .as_ref()
            .map_or(std::ptr::null(), |fs| fs as *const DXGI_SWAP_CHAIN_FULLSCREEN_DESC);
        let params = init_params(request);

        xefg_status(unsafe {
            f(
                ctx.0.as_ptr(),
                request.window.as_ptr(),
                &desc,
                fullscreen_ptr,
                request.queue.as_ptr(),
                request.factory.as_ptr(),
                &params,
            )
        })
    }

    fn swapchain(&self, ctx: InterpolationHandle) -> Result<Arc<dyn NativeSwapchain>, BackendError> {
        let f = self
            .api
            .d3d12_get_swapchain_ptr
            .ok_or(BackendError::Unresolved("xefgSwapChainD3D12GetSwapChainPtr"))?;
        let mut ptr: *mut c_void = std::ptr::null_mut();
        xefg_status(unsafe { f(ctx.0.as_ptr(), &IID_IDXGISWAPCHAIN4, &mut ptr) }).into_result()?;
        if ptr.is_null() {
            return Err(BackendError::Uninitialized);
        }
        Ok(Arc::new(unsafe { ComSwapchain::from_raw(ptr) }))
    }

    fn tag_frame_constants(
        &self,
        ctx: InterpolationHandle,
        present_id: u32,
        constants: &FrameConstants,
    ) -> BackendStatus {
        let Some(f) = self.api.tag_frame_constants else {
            return unresolved("xefgSwapChainTagFrameConstants");
        };
        let data = constants_to_ffi(constants);
        xefg_status(unsafe { f(ctx.0.as_ptr(), present_id, &data) })
    }

    fn tag_frame_resource(
        &self,
        ctx: InterpolationHandle,
        cmd: Option<NativeHandle>,
        present_id: u32,
        tag: &ResourceTag,
    ) -> BackendStatus {
        let Some(f) = self.api.d3d12_tag_frame_resource else {
            return unresolved("xefgSwapChainD3D12TagFrameResource");
        };
        let data = tag_to_ffi(tag);
        let cmd = cmd.unwrap_or(NativeHandle::NULL);
        xefg_status(unsafe { f(ctx.0.as_ptr(), cmd.as_ptr(), present_id, &data) })
    }

    fn set_present_id(&self, ctx: InterpolationHandle, present_id: u32) -> BackendStatus {
        let Some(f) = self.api.set_present_id else {
            return unresolved("xefgSwapChainSetPresentId");
        };
        xefg_status(unsafe { f(ctx.0.as_ptr(), present_id) })
    }

    fn last_present_status(&self, ctx: InterpolationHandle) -> Result<PresentStatus, BackendError> {
        let f = self
            .api
            .get_last_present_status
            .ok_or(BackendError::Unresolved("xefgSwapChainGetLastPresentStatus"))?;
        let mut raw = xefg_present_status_t::default();
        xefg_status(unsafe { f(ctx.0.as_ptr(), &mut raw) }).into_result()?;
        Ok(present_status_from_ffi(&raw))
    }
}

fn desc1_to_ffi(d: &SwapchainDesc1) -> DXGI_SWAP_CHAIN_DESC1 {
    DXGI_SWAP_CHAIN_DESC1 {
        Width: d.width,
        Height: d.height,
        Format: d.format.0,
        Stereo: i32::from(d.stereo),
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: d.sample_desc.count,
            Quality: d.sample_desc.quality,
        },
        BufferUsage: d.buffer_usage,
        BufferCount: d.buffer_count,
        Scaling: d.scaling,
        SwapEffect: d.swap_effect,
        AlphaMode: d.alpha_mode,
        Flags: d.flags,
    }
}

fn fullscreen_to_ffi(f: &FullscreenDesc) -> DXGI_SWAP_CHAIN_FULLSCREEN_DESC {
    DXGI_SWAP_CHAIN_FULLSCREEN_DESC {
        RefreshRate: DXGI_RATIONAL {
            Numerator: f.refresh_rate.numerator,
            Denominator: f.refresh_rate.denominator,
        },
        ScanlineOrdering: f.scanline_ordering,
        Scaling: f.scaling,
        Windowed: i32::from(f.windowed),
    }
}

fn ui_mode_to_ffi(mode: UiMode) -> i32 {
    match mode {
        UiMode::Auto => XEFG_UI_MODE_AUTO,
        UiMode::None => XEFG_UI_MODE_NONE,
        UiMode::Backbuffer => XEFG_UI_MODE_BACKBUFFER,
        UiMode::HudlessUiTexture => XEFG_UI_MODE_HUDLESS_UITEXTURE,
        UiMode::UiTexture => XEFG_UI_MODE_UITEXTURE,
    }
}

/// The module creates the application swapchain itself.
fn init_params(request: &SwapchainInitRequest) -> xefg_d3d12_init_params_t {
    xefg_d3d12_init_params_t {
        pApplicationSwapChain: std::ptr::null_mut(),
        initFlags: request.flags.bits(),
        maxInterpolatedFrames: request.max_interpolated_frames,
        uiMode: ui_mode_to_ffi(request.ui_mode),
        creationNodeMask: 0,
        visibleNodeMask: 0,
        pTempBufferHeap: std::ptr::null_mut(),
        bufferHeapOffset: 0,
        pTempTextureHeap: std::ptr::null_mut(),
        textureHeapOffset: 0,
        pPipelineLibrary: std::ptr::null_mut(),
    }
}

fn constants_to_ffi(c: &FrameConstants) -> xefg_frame_constant_data_t {
    xefg_frame_constant_data_t {
        viewMatrix: c.view,
        projectionMatrix: c.projection,
        jitterOffsetX: c.jitter[0],
        jitterOffsetY: c.jitter[1],
        motionVectorScaleX: c.mv_scale[0],
        motionVectorScaleY: c.mv_scale[1],
        resetHistory: u32::from(c.reset_history),
        frameRenderTime: c.frame_render_time,
    }
}

fn tag_to_ffi(tag: &ResourceTag) -> xefg_d3d12_resource_data_t {
    let kind = match tag.kind {
        ResourceKind::MotionVector => XEFG_RES_MOTION_VECTOR,
        ResourceKind::Depth => XEFG_RES_DEPTH,
        ResourceKind::HudlessColor => XEFG_RES_HUDLESS_COLOR,
        ResourceKind::Backbuffer => XEFG_RES_BACKBUFFER,
    };
    let validity = match tag.validity {
        Validity::UntilNextPresent => XEFG_RV_UNTIL_NEXT_PRESENT,
        Validity::OnlyNow => XEFG_RV_ONLY_NOW,
    };
    xefg_d3d12_resource_data_t {
        r#type: kind,
        validity,
        resourceBase: xefg_2d_t::default(),
        resourceSize: xefg_2d_t {
            x: tag.width,
            y: tag.height,
        },
        pResource: tag.resource.as_ptr(),
        incomingState: tag.incoming_state as u32,
    }
}

fn present_status_from_ffi(raw: &xefg_present_status_t) -> PresentStatus {
    let outcome = match raw.frameGenPresentStatus {
        XEFG_PRESENT_SUCCESS => PresentOutcome::Presented,
        XEFG_PRESENT_RESOURCE_MISMATCH => PresentOutcome::ResourceMismatch,
        _ => PresentOutcome::Skipped,
    };
    PresentStatus {
        frames_presented: raw.framesPresented,
        frame_gen_enabled: raw.isFrameGenEnabled != 0,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegen_core::gpu::{PixelFormat, ResourceState};
    use framegen_core::swapchain::LegacySwapchainDesc;

    #[test]
    fn only_now_tags_carry_copy_source_state() {
        let tag = ResourceTag {
            kind: ResourceKind::Backbuffer,
            resource: NativeHandle::from_raw(0xB0B),
            width: 2560,
            height: 1440,
            validity: Validity::OnlyNow,
            incoming_state: ResourceState::CopySource,
        };
        let data = tag_to_ffi(&tag);
        assert_eq!(data.r#type, XEFG_RES_BACKBUFFER);
        assert_eq!(data.validity, XEFG_RV_ONLY_NOW);
        assert_eq!((data.resourceSize.x, data.resourceSize.y), (2560, 1440));
        assert_eq!((data.resourceBase.x, data.resourceBase.y), (0, 0));
        assert_eq!(data.incomingState, 0x800);
        assert_eq!(data.pResource as usize, 0xB0B);
    }

    #[test]
    fn legacy_descriptor_reaches_the_module_as_desc1() {
        let mut legacy = LegacySwapchainDesc {
            buffer_count: 3,
            windowed: true,
            ..Default::default()
        };
        legacy.buffer_desc.width = 1920;
        legacy.buffer_desc.height = 1080;
        legacy.buffer_desc.format = PixelFormat::R10G10B10A2_UNORM;
        legacy.buffer_desc.refresh_rate.numerator = 144;
        legacy.buffer_desc.refresh_rate.denominator = 1;

        let (desc, fullscreen) = legacy.to_modern();
        let d = desc1_to_ffi(&desc);
        let f = fullscreen_to_ffi(&fullscreen);
        assert_eq!((d.Width, d.Height, d.Format, d.BufferCount), (1920, 1080, 24, 3));
        assert_eq!(d.Stereo, 0);
        assert_eq!(d.SampleDesc.Count, 1);
        assert_eq!((f.RefreshRate.Numerator, f.Windowed), (144, 1));
    }

    #[test]
    fn present_status_maps_outcomes() {
        let raw = xefg_present_status_t {
            framesPresented: 2,
            isFrameGenEnabled: 1,
            frameGenPresentStatus: XEFG_PRESENT_RESOURCE_MISMATCH,
        };
        let status = present_status_from_ffi(&raw);
        assert_eq!(status.frames_presented, 2);
        assert!(status.frame_gen_enabled);
        assert_eq!(status.outcome, PresentOutcome::ResourceMismatch);
    }

    #[test]
    fn constants_keep_history_reset() {
        let c = FrameConstants {
            view: [0.0; 16],
            projection: [0.0; 16],
            jitter: [0.25, -0.25],
            mv_scale: [1920.0, 1080.0],
            reset_history: true,
            frame_render_time: 16.6,
        };
        let data = constants_to_ffi(&c);
        assert_eq!(data.resetHistory, 1);
        assert_eq!(data.jitterOffsetY, -0.25);
        assert_eq!(data.motionVectorScaleX, 1920.0);
    }
}
