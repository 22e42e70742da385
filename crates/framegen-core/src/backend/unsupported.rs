use std::sync::Arc;

use super::{
    BackendError, BackendLogLevel, BackendStatus, BackendVersion, DebugFeature,
    FrameReport, InterpolationBackend, InterpolationCap, InterpolationHandle, LatencyMarker,
    PacingBackend, PacingCap, PacingHandle, PresentStatus, SleepParams, SwapchainInitRequest,
};
use crate::frame::FrameConstants;
use crate::gpu::NativeHandle;
use crate::swapchain::NativeSwapchain;
use crate::tagging::ResourceTag;

const MISSING: BackendError = BackendError::Unresolved("module not loaded");

#[inline]
fn missing() -> BackendStatus {
    BackendStatus::Error(MISSING)
}

/// Interpolation backend used when the vendor module could not be resolved.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedInterpolation {
    name: &'static str,
}

impl UnsupportedInterpolation {
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl InterpolationBackend for UnsupportedInterpolation {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> BackendVersion {
        BackendVersion::ZERO
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn supports(&self, _cap: InterpolationCap) -> bool {
        false
    }

    fn create_context(&self, _device: NativeHandle) -> Result<InterpolationHandle, BackendError> {
        Err(MISSING)
    }

    fn destroy(&self, _ctx: InterpolationHandle) -> BackendStatus {
        missing()
    }

    fn set_logging(&self, _ctx: InterpolationHandle, _level: BackendLogLevel) -> BackendStatus {
        missing()
    }

    fn set_latency_reduction(&self, _ctx: InterpolationHandle, _pacing: PacingHandle) -> BackendStatus {
        missing()
    }

    fn set_enabled(&self, _ctx: InterpolationHandle, _enabled: bool) -> BackendStatus {
        missing()
    }

    fn set_scene_change_threshold(&self, _ctx: InterpolationHandle, _threshold: f32) -> BackendStatus {
        missing()
    }

    fn enable_debug_feature(
        &self,
        _ctx: InterpolationHandle,
        _feature: DebugFeature,
        _enable: bool,
    ) -> BackendStatus {
        missing()
    }

    fn init_from_swapchain_desc(
        &self,
        _ctx: InterpolationHandle,
        _request: &SwapchainInitRequest,
    ) -> BackendStatus {
        missing()
    }

    fn swapchain(&self, _ctx: InterpolationHandle) -> Result<Arc<dyn NativeSwapchain>, BackendError> {
        Err(MISSING)
    }

    fn tag_frame_constants(
        &self,
        _ctx: InterpolationHandle,
        _present_id: u32,
        _constants: &FrameConstants,
    ) -> BackendStatus {
        missing()
    }

    fn tag_frame_resource(
        &self,
        _ctx: InterpolationHandle,
        _cmd: Option<NativeHandle>,
        _present_id: u32,
        _tag: &ResourceTag,
    ) -> BackendStatus {
        missing()
    }

    fn set_present_id(&self, _ctx: InterpolationHandle, _present_id: u32) -> BackendStatus {
        missing()
    }

    fn last_present_status(&self, _ctx: InterpolationHandle) -> Result<PresentStatus, BackendError> {
        Err(MISSING)
    }
}

/// Pacing backend used when the vendor module could not be resolved.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedPacing {
    name: &'static str,
}

impl UnsupportedPacing {
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl PacingBackend for UnsupportedPacing {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> BackendVersion {
        BackendVersion::ZERO
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn supports(&self, _cap: PacingCap) -> bool {
        false
    }

    fn create_context(&self, _device: NativeHandle) -> Result<PacingHandle, BackendError> {
        Err(MISSING)
    }

    fn destroy_context(&self, _ctx: PacingHandle) -> BackendStatus {
        missing()
    }

    fn set_logging(&self, _ctx: PacingHandle, _level: BackendLogLevel) -> BackendStatus {
        missing()
    }

    fn set_sleep_mode(&self, _ctx: PacingHandle, _params: &SleepParams) -> BackendStatus {
        missing()
    }

    fn sleep_mode(&self, _ctx: PacingHandle) -> Result<SleepParams, BackendError> {
        Err(MISSING)
    }

    fn sleep(&self, _ctx: PacingHandle, _frame_id: u32) -> BackendStatus {
        missing()
    }

    fn add_marker(&self, _ctx: PacingHandle, _frame_id: u32, _marker: LatencyMarker) -> BackendStatus {
        missing()
    }

    fn frame_reports(&self, _ctx: PacingHandle) -> Result<Vec<FrameReport>, BackendError> {
        Err(MISSING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_reports_zero_version_and_no_caps() {
        let fg = UnsupportedInterpolation::new("XeSS-FG");
        assert_eq!(fg.name(), "XeSS-FG");
        assert!(fg.version().is_zero());
        assert!(!fg.is_initialized());
        assert!(!fg.supports(InterpolationCap::SetPresentId));
        assert!(fg.create_context(NativeHandle::from_raw(0x10)).is_err());

        let ll = UnsupportedPacing::new("XeLL");
        assert!(ll.version().is_zero());
        assert!(!ll.supports(PacingCap::Markers));
        assert!(matches!(
            ll.sleep(PacingHandle(NativeHandle::from_raw(1)), 0),
            BackendStatus::Error(BackendError::Unresolved(_))
        ));
    }
}
