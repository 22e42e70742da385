//! Frame-generation swapchain: lifecycle state machine and per-frame dispatch.

mod dispatch;
mod drop_impl;
mod lifecycle;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{
    BackendVersion, InterpolationBackend, InterpolationHandle, PacingBackend, PresentStatus,
    UiMode,
};
use crate::frame::{FrameInputs, FrameParams};
use crate::gpu::{FrameCommandList, GpuDevice, NativeHandle};
use crate::lock::{Owner, OwnerLock};
use crate::pacing::PacingAdapter;
use crate::session::Session;
use crate::swapchain::SwapchainProxy;
use crate::tagging::{classify_validity, Validity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    /// Interpolation context exists, no proxy swapchain yet.
    ContextCreated,
    /// Proxy swapchain exists and interpolation is enabled.
    SwapchainActive,
    /// Proxy swapchain exists, interpolation turned off, context retained.
    Disabled,
    Destroyed,
}

/// Overlay renderer that holds render targets on the swapchain buffers.
pub trait OverlayHook: Send + Sync {
    fn cleanup_render_targets(&self);
}

struct ControllerState {
    phase: LifecycleState,
    enabled: bool,
    context: Option<InterpolationHandle>,
    device: Option<Arc<dyn GpuDevice>>,
    proxy: Option<SwapchainProxy>,
    window: Option<NativeHandle>,
    queue: Option<NativeHandle>,
    command_lists: Vec<Box<dyn FrameCommandList>>,
    inputs: FrameInputs,
    params: FrameParams,
    ui_mode: UiMode,
    last_status: PresentStatus,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            phase: LifecycleState::Uninitialized,
            enabled: false,
            context: None,
            device: None,
            proxy: None,
            window: None,
            queue: None,
            command_lists: Vec::new(),
            inputs: FrameInputs::new(),
            params: FrameParams::default(),
            ui_mode: UiMode::Auto,
            last_status: PresentStatus::default(),
        }
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.phase == LifecycleState::SwapchainActive && self.enabled
    }

    fn internal_lists(&self) -> Vec<NativeHandle> {
        self.command_lists.iter().map(|l| l.native()).collect()
    }
}

/// Owns the interpolation context, the pacing context and the proxy swapchain for one
/// host swapchain.
///
/// The submission thread drives [`begin_frame`](Self::begin_frame) and
/// [`dispatch`](Self::dispatch); the present thread drives
/// [`dispatch_hudless`](Self::dispatch_hudless) and the lifecycle calls.
pub struct FrameGenSwapchain {
    session: Session,
    interpolation: Arc<dyn InterpolationBackend>,
    pacing: PacingAdapter,
    lock: OwnerLock,
    frame_id: AtomicU64,
    overlay: Option<Arc<dyn OverlayHook>>,
    state: Mutex<ControllerState>,
}

impl FrameGenSwapchain {
    pub fn new(
        session: Session,
        interpolation: Arc<dyn InterpolationBackend>,
        pacing: Arc<dyn PacingBackend>,
    ) -> Self {
        Self {
            session,
            interpolation,
            pacing: PacingAdapter::new(pacing),
            lock: OwnerLock::new(),
            frame_id: AtomicU64::new(0),
            overlay: None,
            state: Mutex::new(ControllerState::new()),
        }
    }

    #[inline]
    pub fn with_overlay(mut self, overlay: Arc<dyn OverlayHook>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.interpolation.name()
    }

    #[inline]
    pub fn version(&self) -> BackendVersion {
        self.interpolation.version()
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub fn pacing(&self) -> &PacingAdapter {
        &self.pacing
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state.lock().phase
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.lock().is_active()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    #[inline]
    pub fn context(&self) -> Option<InterpolationHandle> {
        self.state.lock().context
    }

    #[inline]
    pub fn window(&self) -> Option<NativeHandle> {
        self.state.lock().window
    }

    /// Host command queue the proxy swapchain presents on.
    #[inline]
    pub fn queue(&self) -> Option<NativeHandle> {
        self.state.lock().queue
    }

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    /// Holder of the cross-thread swapchain lock, if any.
    #[inline]
    pub fn lock_owner(&self) -> Option<Owner> {
        self.lock.owner()
    }

    #[inline]
    pub fn swapchain_lock(&self) -> &OwnerLock {
        &self.lock
    }

    /// Takes effect on the next swapchain creation.
    pub fn set_ui_mode(&self, mode: UiMode) {
        self.state.lock().ui_mode = mode;
    }

    #[inline]
    pub fn ui_mode(&self) -> UiMode {
        self.state.lock().ui_mode
    }

    /// Handles of the engine-owned command lists, one per ring slot.
    pub fn internal_command_lists(&self) -> Vec<NativeHandle> {
        self.state.lock().internal_lists()
    }

    pub fn classify_validity(&self, cmd: Option<NativeHandle>) -> Validity {
        classify_validity(cmd, &self.state.lock().internal_lists())
    }
}

impl fmt::Debug for FrameGenSwapchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        f.debug_struct("FrameGenSwapchain")
            .field("backend", &self.interpolation.name())
            .field("phase", &st.phase)
            .field("enabled", &st.enabled)
            .field("context", &st.context)
            .field("window", &st.window)
            .field("frame_id", &self.frame_id())
            .finish()
    }
}
