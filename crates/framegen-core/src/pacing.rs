//! Latency pacing adapter: owns the pacing context and emits frame timeline markers.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{
    BackendLogLevel, FrameReport, InterpolationBackend, InterpolationCap, InterpolationHandle,
    LatencyMarker, PacingBackend, PacingCap, PacingHandle, SleepParams,
};
use crate::config::FgConfig;
use crate::error::{FgError, FgResult};
use crate::gpu::NativeHandle;

#[derive(Debug, Default)]
struct PacingState {
    context: Option<PacingHandle>,
    linked_to: Option<InterpolationHandle>,
    params: Option<SleepParams>,
}

pub struct PacingAdapter {
    backend: Arc<dyn PacingBackend>,
    state: RwLock<PacingState>,
}

impl PacingAdapter {
    pub fn new(backend: Arc<dyn PacingBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(PacingState::default()),
        }
    }

    #[inline]
    pub fn backend(&self) -> &dyn PacingBackend {
        self.backend.as_ref()
    }

    #[inline]
    pub fn context(&self) -> Option<PacingHandle> {
        self.state.read().context
    }

    #[inline]
    pub fn linked_to(&self) -> Option<InterpolationHandle> {
        self.state.read().linked_to
    }

    /// Creates the pacing context on `device` and applies the configured sleep mode.
    ///
    /// Returns the existing context when one is already live. A sleep mode the backend
    /// rejects is logged and pacing continues with backend defaults.
    pub fn create_context(&self, device: NativeHandle, config: &FgConfig) -> FgResult<PacingHandle> {
        let mut st = self.state.write();
        if let Some(ctx) = st.context {
            return Ok(ctx);
        }

        if !self.backend.is_initialized() {
            return Err(FgError::Initialization(format!(
                "{} module is not available",
                self.backend.name()
            )));
        }

        let ctx = self.backend.create_context(device).map_err(|e| {
            FgError::Initialization(format!("{} context creation failed: {e}", self.backend.name()))
        })?;

        let level = BackendLogLevel::from_config(&config.logging.backend_level);
        let logging = self.backend.set_logging(ctx, level);
        if !logging.is_ok() {
            log::debug!(target: "framegen::xell", "logging callback not installed: {logging}");
        }

        let requested = SleepParams {
            low_latency: true,
            boost: config.pacing.boost,
            minimum_interval_us: config.pacing.min_interval_us,
        };
        let applied = self.backend.set_sleep_mode(ctx, &requested);
        if !applied.is_ok() {
            log::warn!(target: "framegen::xell", "failed to set sleep mode: {applied}");
        }

        st.params = if self.backend.supports(PacingCap::SleepMode) {
            self.backend.sleep_mode(ctx).ok()
        } else if applied.is_ok() {
            Some(requested)
        } else {
            None
        };
        st.context = Some(ctx);
        st.linked_to = None;

        log::info!(
            target: "framegen::xell",
            "{} context created (boost={}, interval={}us)",
            self.backend.name(),
            requested.boost,
            requested.minimum_interval_us
        );
        Ok(ctx)
    }

    /// Blocks for the backend-computed pacing delay. Failures only skip pacing this frame.
    pub fn sleep(&self, frame_id: u32) -> bool {
        let Some(ctx) = self.context() else {
            return false;
        };
        if !self.backend.supports(PacingCap::Sleep) {
            return false;
        }
        let st = self.backend.sleep(ctx, frame_id);
        if !st.is_ok() {
            log::warn!(target: "framegen::xell", "sleep for frame {frame_id} failed: {st}");
        }
        st.is_ok()
    }

    /// Emits a timeline marker. Silent no-op without a context or marker support.
    ///
    /// Stage order per frame id is the caller's obligation.
    pub fn mark(&self, frame_id: u32, marker: LatencyMarker) {
        let Some(ctx) = self.context() else { return };
        if !self.backend.supports(PacingCap::Markers) {
            return;
        }
        let st = self.backend.add_marker(ctx, frame_id, marker);
        if !st.is_ok() {
            log::trace!(target: "framegen::xell", "marker {marker:?} for frame {frame_id} rejected: {st}");
        }
    }

    /// Hands the pacing context to an interpolation context.
    ///
    /// A pacing context already linked elsewhere is recreated first.
    pub fn link(
        &self,
        interpolation: &dyn InterpolationBackend,
        ctx: InterpolationHandle,
        device: NativeHandle,
        config: &FgConfig,
    ) -> bool {
        match self.linked_to() {
            Some(current) if current == ctx => return true,
            Some(previous) => {
                log::info!(
                    target: "framegen::xell",
                    "pacing context was linked to {:?}, recreating for {:?}",
                    previous.0,
                    ctx.0
                );
                self.destroy_context();
                if let Err(e) = self.create_context(device, config) {
                    log::warn!(target: "framegen::xell", "{e}");
                    return false;
                }
            }
            None => {}
        }

        let Some(pacing) = self.context() else {
            return false;
        };
        if !interpolation.supports(InterpolationCap::LatencyReduction) {
            return false;
        }

        let st = interpolation.set_latency_reduction(ctx, pacing);
        if !st.is_ok() {
            log::warn!(target: "framegen::xell", "linking latency reduction failed: {st}");
            return false;
        }
        self.state.write().linked_to = Some(ctx);
        true
    }

    /// Forgets the link to `ctx` once that interpolation context has been destroyed.
    ///
    /// The pacing context stays alive; a backend that hands the same handle out again
    /// gets latency reduction re-applied on the next [`link`](Self::link).
    pub fn unlink(&self, ctx: InterpolationHandle) {
        let mut st = self.state.write();
        if st.linked_to == Some(ctx) {
            st.linked_to = None;
        }
    }

    /// Releases the pacing context. The linked interpolation context must already be gone.
    pub fn destroy_context(&self) -> bool {
        let ctx = {
            let mut st = self.state.write();
            st.linked_to = None;
            st.params = None;
            st.context.take()
        };
        let Some(ctx) = ctx else { return false };

        log::info!(target: "framegen::xell", "destroying {} context", self.backend.name());
        let st = self.backend.destroy_context(ctx);
        if !st.is_ok() {
            log::warn!(target: "framegen::xell", "destroy context failed: {st}");
        }
        true
    }

    /// Sleep parameters in effect after context creation.
    #[inline]
    pub fn sleep_params(&self) -> Option<SleepParams> {
        self.state.read().params
    }

    pub fn frame_reports(&self) -> Vec<FrameReport> {
        let Some(ctx) = self.context() else {
            return Vec::new();
        };
        if !self.backend.supports(PacingCap::FrameReports) {
            return Vec::new();
        }
        self.backend.frame_reports(ctx).unwrap_or_else(|e| {
            log::debug!(target: "framegen::xell", "frame reports unavailable: {e}");
            Vec::new()
        })
    }
}
