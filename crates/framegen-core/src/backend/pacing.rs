use super::{BackendError, BackendLogLevel, BackendStatus, BackendVersion, PacingHandle};
use crate::gpu::NativeHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacingCap {
    SleepMode,
    Sleep,
    Markers,
    FrameReports,
    Logging,
}

/// Stage of the frame timeline reported to the pacing backend.
///
/// Per frame id the stages must be emitted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LatencyMarker {
    SimulationStart,
    SimulationEnd,
    RenderSubmitStart,
    RenderSubmitEnd,
    PresentStart,
    PresentEnd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SleepParams {
    pub low_latency: bool,
    pub boost: bool,
    /// 0 disables the frame limiter.
    pub minimum_interval_us: u32,
}

/// One entry of the backend's latency report, timestamps in backend ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_id: u32,
    pub sim_start: u64,
    pub sim_end: u64,
    pub render_submit_start: u64,
    pub render_submit_end: u64,
    pub present_start: u64,
    pub present_end: u64,
}

/// Latency-reduction service.
pub trait PacingBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn version(&self) -> BackendVersion;

    fn is_initialized(&self) -> bool;

    fn supports(&self, cap: PacingCap) -> bool;

    fn create_context(&self, device: NativeHandle) -> Result<PacingHandle, BackendError>;

    fn destroy_context(&self, ctx: PacingHandle) -> BackendStatus;

    fn set_logging(&self, ctx: PacingHandle, level: BackendLogLevel) -> BackendStatus;

    fn set_sleep_mode(&self, ctx: PacingHandle, params: &SleepParams) -> BackendStatus;

    fn sleep_mode(&self, ctx: PacingHandle) -> Result<SleepParams, BackendError>;

    /// Blocks the caller for a backend-computed duration.
    fn sleep(&self, ctx: PacingHandle, frame_id: u32) -> BackendStatus;

    fn add_marker(&self, ctx: PacingHandle, frame_id: u32, marker: LatencyMarker) -> BackendStatus;

    fn frame_reports(&self, ctx: PacingHandle) -> Result<Vec<FrameReport>, BackendError>;
}
