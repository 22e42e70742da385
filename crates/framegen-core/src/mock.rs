//! Recording doubles for the backend, device and swapchain interfaces.
//!
//! Every double appends to a shared [`CallLog`], so tests can assert on the exact order of
//! backend calls across components. Built only with the `mock` feature, which the
//! headless diagnostics binary enables.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::{
    BackendError, BackendLogLevel, BackendStatus, BackendVersion, DebugFeature, FrameReport,
    InitFlags, InterpolationBackend, InterpolationCap, InterpolationHandle, LatencyMarker,
    PacingBackend, PacingCap, PacingHandle, PresentOutcome, PresentStatus, SleepParams,
    SwapchainInitRequest, UiMode,
};
use crate::frame::FrameConstants;
use crate::gpu::{
    FrameCommandList, GpuDevice, GpuError, GpuResource, NativeHandle, PixelFormat,
    ResourceDesc, ResourceState,
};
use crate::swapchain::{NativeSwapchain, SwapchainInterface};
use crate::tagging::{ResourceKind, ResourceTag, Validity};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    InterpolationCreate { device: NativeHandle },
    InterpolationDestroy { ctx: InterpolationHandle },
    InterpolationLogging(BackendLogLevel),
    LatencyReduction { ctx: InterpolationHandle, pacing: PacingHandle },
    SetEnabled(bool),
    SceneChangeThreshold(f32),
    DebugFeature(DebugFeature),
    InitFromDesc {
        window: NativeHandle,
        width: u32,
        height: u32,
        buffer_count: u32,
        flags: InitFlags,
        ui_mode: UiMode,
    },
    SwapchainQuery,
    TagConstants { present_id: u32, reset_history: bool },
    TagResource {
        present_id: u32,
        kind: ResourceKind,
        validity: Validity,
        state: ResourceState,
        cmd: Option<NativeHandle>,
    },
    SetPresentId(u32),
    LastPresentStatus,
    SwapchainAddRef { refs: u32 },
    SwapchainRelease { refs: u32 },
    PacingCreate,
    PacingDestroy { ctx: PacingHandle },
    PacingLogging(BackendLogLevel),
    SetSleepMode(SleepParams),
    Sleep { frame_id: u32 },
    Marker { frame_id: u32, marker: LatencyMarker },
    CommandListCreate { slot: usize },
    CommandListReset { slot: usize },
    OverlayCleanup,
}

/// Ordered, shared record of backend calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<BackendCall>>>,
}

impl CallLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }

    pub fn snapshot(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Proxy swapchain with a real reference count.
pub struct FakeSwapchain {
    handle: NativeHandle,
    refs: AtomicU32,
    format: Mutex<Option<PixelFormat>>,
    swapchain1: bool,
    log: CallLog,
}

impl FakeSwapchain {
    pub fn new(log: CallLog, handle: NativeHandle, format: PixelFormat, swapchain1: bool) -> Self {
        Self {
            handle,
            refs: AtomicU32::new(1),
            format: Mutex::new(Some(format)),
            swapchain1,
            log,
        }
    }

    #[inline]
    pub fn refs(&self) -> u32 {
        self.refs.load(Ordering::SeqCst)
    }

    /// Makes the swapchain fail to describe itself.
    pub fn set_format(&self, format: Option<PixelFormat>) {
        *self.format.lock() = format;
    }
}

impl NativeSwapchain for FakeSwapchain {
    fn native(&self) -> NativeHandle {
        self.handle
    }

    fn add_ref(&self) -> u32 {
        let refs = self.refs.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.push(BackendCall::SwapchainAddRef { refs });
        refs
    }

    fn release(&self) -> u32 {
        let refs = self.refs.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        self.log.push(BackendCall::SwapchainRelease { refs });
        refs
    }

    fn buffer_format(&self) -> Option<PixelFormat> {
        *self.format.lock()
    }

    fn supports(&self, iface: SwapchainInterface) -> bool {
        match iface {
            SwapchainInterface::Swapchain4 => true,
            SwapchainInterface::Swapchain1 => self.swapchain1,
        }
    }
}

/// Interpolation backend that records calls and returns configurable results.
pub struct RecordingInterpolation {
    log: CallLog,
    next_ctx: AtomicUsize,
    buffer_format: PixelFormat,
    swapchain1: bool,
    reuse_ctx: bool,
    fail_create: bool,
    fail_init: AtomicUsize,
    fail_destroy: bool,
    swapchain: Mutex<Option<Arc<FakeSwapchain>>>,
    present_status: Mutex<PresentStatus>,
    tag_status: Mutex<BackendStatus>,
    tag_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingInterpolation {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            next_ctx: AtomicUsize::new(0xF600),
            buffer_format: PixelFormat::R8G8B8A8_UNORM,
            swapchain1: true,
            reuse_ctx: false,
            fail_create: false,
            fail_init: AtomicUsize::new(0),
            fail_destroy: false,
            swapchain: Mutex::new(None),
            present_status: Mutex::new(PresentStatus {
                frames_presented: 2,
                frame_gen_enabled: true,
                outcome: PresentOutcome::Presented,
            }),
            tag_status: Mutex::new(BackendStatus::Success),
            tag_delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_buffer_format(mut self, format: PixelFormat) -> Self {
        self.buffer_format = format;
        self
    }

    pub fn without_swapchain1(mut self) -> Self {
        self.swapchain1 = false;
        self
    }

    pub fn failing_context(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_init(self) -> Self {
        self.fail_init.store(usize::MAX, Ordering::SeqCst);
        self
    }

    /// Fails only the next swapchain init.
    pub fn failing_init_once(self) -> Self {
        self.fail_init.store(1, Ordering::SeqCst);
        self
    }

    /// Hands out the same context handle for every create, like a runtime that
    /// recycles freed slots.
    pub fn reusing_context_handle(mut self) -> Self {
        self.reuse_ctx = true;
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    /// Holds every tagging call open for `delay` to widen race windows.
    pub fn with_tag_delay(mut self, delay: Duration) -> Self {
        self.tag_delay = Some(delay);
        self
    }

    pub fn set_present_status(&self, status: PresentStatus) {
        *self.present_status.lock() = status;
    }

    pub fn set_tag_status(&self, status: BackendStatus) {
        *self.tag_status.lock() = status;
    }

    /// The proxy swapchain handed out by the last successful init.
    pub fn proxy(&self) -> Option<Arc<FakeSwapchain>> {
        self.swapchain.lock().clone()
    }

    /// Largest number of tagging calls observed running at once.
    #[inline]
    pub fn max_concurrent_tags(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn tag_section<R>(&self, f: impl FnOnce() -> R) -> R {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        match self.tag_delay {
            Some(d) => thread::sleep(d),
            None => thread::yield_now(),
        }
        let r = f();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        r
    }
}

impl InterpolationBackend for RecordingInterpolation {
    fn name(&self) -> &'static str {
        "XeSS-FG"
    }

    fn version(&self) -> BackendVersion {
        BackendVersion::new(1, 1, 0)
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn supports(&self, _cap: InterpolationCap) -> bool {
        true
    }

    fn create_context(&self, device: NativeHandle) -> Result<InterpolationHandle, BackendError> {
        self.log.push(BackendCall::InterpolationCreate { device });
        if self.fail_create {
            return Err(BackendError::UnsupportedDevice);
        }
        let raw = if self.reuse_ctx {
            self.next_ctx.load(Ordering::SeqCst)
        } else {
            self.next_ctx.fetch_add(1, Ordering::SeqCst)
        };
        Ok(InterpolationHandle(NativeHandle::from_raw(raw)))
    }

    fn destroy(&self, ctx: InterpolationHandle) -> BackendStatus {
        self.log.push(BackendCall::InterpolationDestroy { ctx });
        *self.swapchain.lock() = None;
        if self.fail_destroy {
            return BackendStatus::Error(BackendError::InvalidContext);
        }
        BackendStatus::Success
    }

    fn set_logging(&self, _ctx: InterpolationHandle, level: BackendLogLevel) -> BackendStatus {
        self.log.push(BackendCall::InterpolationLogging(level));
        BackendStatus::Success
    }

    fn set_latency_reduction(&self, ctx: InterpolationHandle, pacing: PacingHandle) -> BackendStatus {
        self.log.push(BackendCall::LatencyReduction { ctx, pacing });
        BackendStatus::Success
    }

    fn set_enabled(&self, _ctx: InterpolationHandle, enabled: bool) -> BackendStatus {
        self.log.push(BackendCall::SetEnabled(enabled));
        BackendStatus::Success
    }

    fn set_scene_change_threshold(&self, _ctx: InterpolationHandle, threshold: f32) -> BackendStatus {
        self.log.push(BackendCall::SceneChangeThreshold(threshold));
        BackendStatus::Success
    }

    fn enable_debug_feature(
        &self,
        _ctx: InterpolationHandle,
        feature: DebugFeature,
        _enable: bool,
    ) -> BackendStatus {
        self.log.push(BackendCall::DebugFeature(feature));
        BackendStatus::Success
    }

    fn init_from_swapchain_desc(
        &self,
        ctx: InterpolationHandle,
        request: &SwapchainInitRequest,
    ) -> BackendStatus {
        self.log.push(BackendCall::InitFromDesc {
            window: request.window,
            width: request.desc.width,
            height: request.desc.height,
            buffer_count: request.desc.buffer_count,
            flags: request.flags,
            ui_mode: request.ui_mode,
        });
        let failing = self
            .fail_init
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failing {
            return BackendStatus::Error(BackendError::DxgiInvalidCall);
        }
        let handle = NativeHandle::from_raw(ctx.0.raw() + 0x1_0000);
        *self.swapchain.lock() = Some(Arc::new(FakeSwapchain::new(
            self.log.clone(),
            handle,
            self.buffer_format,
            self.swapchain1,
        )));
        BackendStatus::Success
    }

    fn swapchain(&self, _ctx: InterpolationHandle) -> Result<Arc<dyn NativeSwapchain>, BackendError> {
        self.log.push(BackendCall::SwapchainQuery);
        let sc = self.swapchain.lock().clone().ok_or(BackendError::Uninitialized)?;
        sc.add_ref();
        Ok(sc as Arc<dyn NativeSwapchain>)
    }

    fn tag_frame_constants(
        &self,
        _ctx: InterpolationHandle,
        present_id: u32,
        constants: &FrameConstants,
    ) -> BackendStatus {
        self.tag_section(|| {
            self.log.push(BackendCall::TagConstants {
                present_id,
                reset_history: constants.reset_history,
            });
            BackendStatus::Success
        })
    }

    fn tag_frame_resource(
        &self,
        _ctx: InterpolationHandle,
        cmd: Option<NativeHandle>,
        present_id: u32,
        tag: &ResourceTag,
    ) -> BackendStatus {
        self.tag_section(|| {
            self.log.push(BackendCall::TagResource {
                present_id,
                kind: tag.kind,
                validity: tag.validity,
                state: tag.incoming_state,
                cmd,
            });
            *self.tag_status.lock()
        })
    }

    fn set_present_id(&self, _ctx: InterpolationHandle, present_id: u32) -> BackendStatus {
        self.tag_section(|| {
            self.log.push(BackendCall::SetPresentId(present_id));
            BackendStatus::Success
        })
    }

    fn last_present_status(&self, _ctx: InterpolationHandle) -> Result<PresentStatus, BackendError> {
        self.log.push(BackendCall::LastPresentStatus);
        Ok(*self.present_status.lock())
    }
}

/// Pacing backend that records calls.
pub struct RecordingPacing {
    log: CallLog,
    fail_create: bool,
    fail_sleep_mode: bool,
    fail_destroy: bool,
    fail_sleep: bool,
    params: Mutex<SleepParams>,
}

impl RecordingPacing {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_create: false,
            fail_sleep_mode: false,
            fail_destroy: false,
            fail_sleep: false,
            params: Mutex::new(SleepParams::default()),
        }
    }

    pub fn failing_context(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn fail_sleep_mode(mut self) -> Self {
        self.fail_sleep_mode = true;
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    pub fn failing_sleep(mut self) -> Self {
        self.fail_sleep = true;
        self
    }
}

impl PacingBackend for RecordingPacing {
    fn name(&self) -> &'static str {
        "XeLL"
    }

    fn version(&self) -> BackendVersion {
        BackendVersion::new(1, 2, 0)
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn supports(&self, _cap: PacingCap) -> bool {
        true
    }

    fn create_context(&self, _device: NativeHandle) -> Result<PacingHandle, BackendError> {
        self.log.push(BackendCall::PacingCreate);
        if self.fail_create {
            return Err(BackendError::UnsupportedDriver);
        }
        Ok(PacingHandle(NativeHandle::from_raw(0xE11)))
    }

    fn destroy_context(&self, ctx: PacingHandle) -> BackendStatus {
        self.log.push(BackendCall::PacingDestroy { ctx });
        if self.fail_destroy {
            return BackendStatus::Error(BackendError::InvalidContext);
        }
        BackendStatus::Success
    }

    fn set_logging(&self, _ctx: PacingHandle, level: BackendLogLevel) -> BackendStatus {
        self.log.push(BackendCall::PacingLogging(level));
        BackendStatus::Success
    }

    fn set_sleep_mode(&self, _ctx: PacingHandle, params: &SleepParams) -> BackendStatus {
        self.log.push(BackendCall::SetSleepMode(*params));
        if self.fail_sleep_mode {
            return BackendStatus::Error(BackendError::InvalidArgument);
        }
        *self.params.lock() = *params;
        BackendStatus::Success
    }

    fn sleep_mode(&self, _ctx: PacingHandle) -> Result<SleepParams, BackendError> {
        Ok(*self.params.lock())
    }

    fn sleep(&self, _ctx: PacingHandle, frame_id: u32) -> BackendStatus {
        self.log.push(BackendCall::Sleep { frame_id });
        if self.fail_sleep {
            return BackendStatus::Error(BackendError::InvalidContext);
        }
        BackendStatus::Success
    }

    fn add_marker(&self, _ctx: PacingHandle, frame_id: u32, marker: LatencyMarker) -> BackendStatus {
        self.log.push(BackendCall::Marker { frame_id, marker });
        BackendStatus::Success
    }

    fn frame_reports(&self, _ctx: PacingHandle) -> Result<Vec<FrameReport>, BackendError> {
        let markers = self.log.count(|c| matches!(c, BackendCall::Marker { .. }));
        Ok(vec![FrameReport {
            frame_id: markers as u32,
            ..Default::default()
        }])
    }
}

/// Device whose command lists live at predictable handles.
pub struct FakeDevice {
    handle: NativeHandle,
    log: CallLog,
    fail_lists: AtomicBool,
}

impl FakeDevice {
    pub fn new(log: CallLog, handle: NativeHandle) -> Self {
        Self {
            handle,
            log,
            fail_lists: AtomicBool::new(false),
        }
    }

    /// Handle the command list for `slot` will have.
    #[inline]
    pub fn command_list_handle(&self, slot: usize) -> NativeHandle {
        NativeHandle::from_raw(self.handle.raw() + 0x100 + slot)
    }

    pub fn fail_command_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }
}

impl GpuDevice for FakeDevice {
    fn native(&self) -> NativeHandle {
        self.handle
    }

    fn create_frame_command_list(&self, slot: usize) -> Result<Box<dyn FrameCommandList>, GpuError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(GpuError::CommandListCreation {
                slot,
                message: "E_OUTOFMEMORY".to_owned(),
            });
        }
        self.log.push(BackendCall::CommandListCreate { slot });
        Ok(Box::new(FakeCommandList {
            handle: self.command_list_handle(slot),
            slot,
            log: self.log.clone(),
        }))
    }
}

pub struct FakeCommandList {
    handle: NativeHandle,
    slot: usize,
    log: CallLog,
}

impl FrameCommandList for FakeCommandList {
    fn native(&self) -> NativeHandle {
        self.handle
    }

    fn reset(&mut self) -> Result<(), GpuError> {
        self.log.push(BackendCall::CommandListReset { slot: self.slot });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FakeResource {
    handle: NativeHandle,
    desc: ResourceDesc,
}

impl FakeResource {
    pub fn new(raw: usize, width: u64, height: u32, format: PixelFormat) -> Self {
        Self {
            handle: NativeHandle::from_raw(raw),
            desc: ResourceDesc {
                width,
                height,
                format,
            },
        }
    }

    #[inline]
    pub fn shared(self) -> Arc<dyn GpuResource> {
        Arc::new(self)
    }
}

impl GpuResource for FakeResource {
    fn native(&self) -> NativeHandle {
        self.handle
    }

    fn desc(&self) -> ResourceDesc {
        self.desc
    }
}

/// Overlay double that records its cleanup.
pub struct RecordingOverlay {
    log: CallLog,
}

impl RecordingOverlay {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl crate::controller::OverlayHook for RecordingOverlay {
    fn cleanup_render_targets(&self) {
        self.log.push(BackendCall::OverlayCleanup);
    }
}
