use std::ffi::{c_char, CStr};

use framegen_core::backend::{
    BackendError, BackendLogLevel, BackendStatus, BackendVersion, FrameReport, LatencyMarker,
    PacingBackend, PacingCap, PacingHandle, SleepParams,
};
use framegen_core::gpu::NativeHandle;
use framegen_core::sync::HookSuppression;
use libloading::Library;
use parking_lot::Mutex;

use crate::ffi::*;
use crate::loader::{symbol as sym, LibraryLoadError, LibraryLocator, LibraryOrigin};

pub const XELL_LIBRARY: &str = "libxell.dll";

#[inline]
fn unresolved(name: &'static str) -> BackendStatus {
    BackendStatus::Error(BackendError::Unresolved(name))
}

struct XellApi {
    create_context: Option<PFN_xellD3D12CreateContext>,
    destroy_context: Option<PFN_xellDestroyContext>,
    set_sleep_mode: Option<PFN_xellSetSleepMode>,
    get_sleep_mode: Option<PFN_xellGetSleepMode>,
    sleep: Option<PFN_xellSleep>,
    add_marker_data: Option<PFN_xellAddMarkerData>,
    get_version: Option<PFN_xellGetVersion>,
    set_logging_callback: Option<PFN_xellSetLoggingCallback>,
    get_frames_reports: Option<PFN_xellGetFramesReports>,
}

impl XellApi {
    unsafe fn resolve(lib: &Library) -> Self {
        unsafe {
            Self {
                create_context: sym(lib, b"xellD3D12CreateContext\0"),
                destroy_context: sym(lib, b"xellDestroyContext\0"),
                set_sleep_mode: sym(lib, b"xellSetSleepMode\0"),
                get_sleep_mode: sym(lib, b"xellGetSleepMode\0"),
                sleep: sym(lib, b"xellSleep\0"),
                add_marker_data: sym(lib, b"xellAddMarkerData\0"),
                get_version: sym(lib, b"xellGetVersion\0"),
                set_logging_callback: sym(lib, b"xellSetLoggingCallback\0"),
                get_frames_reports: sym(lib, b"xellGetFramesReports\0"),
            }
        }
    }
}

unsafe extern "C" fn log_callback(message: *const c_char, level: i32) {
    if message.is_null() {
        return;
    }
    let msg = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    match level {
        XELL_LOGGING_LEVEL_DEBUG => log::debug!(target: "framegen::xell", "{msg}"),
        XELL_LOGGING_LEVEL_WARNING => log::warn!(target: "framegen::xell", "{msg}"),
        XELL_LOGGING_LEVEL_ERROR => log::error!(target: "framegen::xell", "{msg}"),
        _ => log::info!(target: "framegen::xell", "{msg}"),
    }
}

/// XeLL latency module resolved at runtime.
pub struct XellBackend {
    api: XellApi,
    version: Mutex<BackendVersion>,
    origin: LibraryOrigin,
    _lib: Library,
}

impl XellBackend {
    /// Fails unless context creation is exported.
    pub fn load(locator: &LibraryLocator, hooks: &HookSuppression) -> Result<Self, LibraryLoadError> {
        let loaded = locator.open(hooks)?;
        let api = unsafe { XellApi::resolve(&loaded.lib) };

        if api.create_context.is_none() {
            return Err(LibraryLoadError {
                name: locator.file_name(),
                tried: Vec::new(),
                message: format!("xellD3D12CreateContext missing ({:?})", loaded.origin),
            });
        }

        let backend = Self {
            api,
            version: Mutex::new(BackendVersion::ZERO),
            origin: loaded.origin,
            _lib: loaded.lib,
        };
        log::info!(target: "framegen::xell", "XeLL {} loaded from {:?}", backend.version(), backend.origin);
        Ok(backend)
    }

    #[inline]
    pub fn origin(&self) -> &LibraryOrigin {
        &self.origin
    }
}

impl PacingBackend for XellBackend {
    fn name(&self) -> &'static str {
        "XeLL"
    }

    fn version(&self) -> BackendVersion {
        let mut cached = self.version.lock();
        if cached.is_zero() {
            if let Some(f) = self.api.get_version {
                let mut raw = xell_version_t::default();
                if xell_status(unsafe { f(&mut raw) }).is_ok() {
                    *cached = BackendVersion::new(raw.major, raw.minor, raw.patch);
                }
            }
        }
        *cached
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn supports(&self, cap: PacingCap) -> bool {
        match cap {
            PacingCap::SleepMode => self.api.set_sleep_mode.is_some() && self.api.get_sleep_mode.is_some(),
            PacingCap::Sleep => self.api.sleep.is_some(),
            PacingCap::Markers => self.api.add_marker_data.is_some(),
            PacingCap::FrameReports => self.api.get_frames_reports.is_some(),
            PacingCap::Logging => self.api.set_logging_callback.is_some(),
        }
    }

    fn create_context(&self, device: NativeHandle) -> Result<PacingHandle, BackendError> {
        let f = self
            .api
            .create_context
            .ok_or(BackendError::Unresolved("xellD3D12CreateContext"))?;
        let mut handle: xell_handle_t = std::ptr::null_mut();
        xell_status(unsafe { f(device.as_ptr(), &mut handle) }).into_result()?;
        if handle.is_null() {
            return Err(BackendError::InvalidContext);
        }
        Ok(PacingHandle(NativeHandle::from_ptr(handle)))
    }

    fn destroy_context(&self, ctx: PacingHandle) -> BackendStatus {
        let Some(f) = self.api.destroy_context else {
            return unresolved("xellDestroyContext");
        };
        xell_status(unsafe { f(ctx.0.as_ptr()) })
    }

    fn set_logging(&self, ctx: PacingHandle, level: BackendLogLevel) -> BackendStatus {
        let Some(f) = self.api.set_logging_callback else {
            return unresolved("xellSetLoggingCallback");
        };
        let level = match level {
            BackendLogLevel::Debug => XELL_LOGGING_LEVEL_DEBUG,
            BackendLogLevel::Warning => XELL_LOGGING_LEVEL_WARNING,
        };
        xell_status(unsafe { f(ctx.0.as_ptr(), level, Some(log_callback)) })
    }

    fn set_sleep_mode(&self, ctx: PacingHandle, params: &SleepParams) -> BackendStatus {
        let Some(f) = self.api.set_sleep_mode else {
            return unresolved("xellSetSleepMode");
        };
        let raw = xell_sleep_params_t {
            bLowLatencyMode: u32::from(params.low_latency),
            bLowLatencyBoost: u32::from(params.boost),
            minimumIntervalUs: params.minimum_interval_us,
        };
        xell_status(unsafe { f(ctx.0.as_ptr(), &raw) })
    }

    fn sleep_mode(&self, ctx: PacingHandle) -> Result<SleepParams, BackendError> {
        let f = self
            .api
            .get_sleep_mode
            .ok_or(BackendError::Unresolved("xellGetSleepMode"))?;
        let mut raw = xell_sleep_params_t::default();
        xell_status(unsafe { f(ctx.0.as_ptr(), &mut raw) }).into_result()?;
        Ok(SleepParams {
            low_latency: raw.bLowLatencyMode != 0,
            boost: raw.bLowLatencyBoost != 0,
            minimum_interval_us: raw.minimumIntervalUs,
        })
    }

    fn sleep(&self, ctx: PacingHandle, frame_id: u32) -> BackendStatus {
        let Some(f) = self.api.sleep else {
            return unresolved("xellSleep");
        };
        xell_status(unsafe { f(ctx.0.as_ptr(), frame_id) })
    }

    fn add_marker(&self, ctx: PacingHandle, frame_id: u32, marker: LatencyMarker) -> BackendStatus {
        let Some(f) = self.api.add_marker_data else {
            return unresolved("xellAddMarkerData");
        };
        xell_status(unsafe { f(ctx.0.as_ptr(), frame_id, marker_to_ffi(marker)) })
    }

    fn frame_reports(&self, ctx: PacingHandle) -> Result<Vec<FrameReport>, BackendError> {
        let f = self
            .api
            .get_frames_reports
            .ok_or(BackendError::Unresolved("xellGetFramesReports"))?;
        let mut raw = [xell_frame_report_t::default(); XELL_FRAME_REPORT_COUNT];
        xell_status(unsafe { f(ctx.0.as_ptr(), raw.as_mut_ptr()) }).into_result()?;
        Ok(raw
            .iter()
            .filter(|r| r.frameID != 0)
            .map(report_from_ffi)
            .collect())
    }
}

fn marker_to_ffi(marker: LatencyMarker) -> i32 {
    match marker {
        LatencyMarker::SimulationStart => XELL_SIMULATION_START,
        LatencyMarker::SimulationEnd => XELL_SIMULATION_END,
        LatencyMarker::RenderSubmitStart => XELL_RENDERSUBMIT_START,
        LatencyMarker::RenderSubmitEnd => XELL_RENDERSUBMIT_END,
        LatencyMarker::PresentStart => XELL_PRESENT_START,
        LatencyMarker::PresentEnd => XELL_PRESENT_END,
    }
}

fn report_from_ffi(r: &xell_frame_report_t) -> FrameReport {
    FrameReport {
        frame_id: r.frameID,
        sim_start: r.simStartTime,
        sim_end: r.simEndTime,
        render_submit_start: r.renderSubmitStartTime,
        render_submit_end: r.renderSubmitEndTime,
        present_start: r.presentStartTime,
        present_end: r.presentEndTime,
    }
}
