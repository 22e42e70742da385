use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use super::{BackendError, BackendLogLevel, BackendStatus, BackendVersion, InterpolationHandle, PacingHandle};
use crate::frame::FrameConstants;
use crate::gpu::NativeHandle;
use crate::swapchain::{FullscreenDesc, NativeSwapchain, SwapchainDesc1};
use crate::tagging::ResourceTag;

/// Optional entry points an interpolation backend may or may not expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpolationCap {
    SetEnabled,
    TagFrameConstants,
    TagFrameResource,
    SetPresentId,
    LastPresentStatus,
    LatencyReduction,
    SceneChangeThreshold,
    DebugFeatures,
    Logging,
}

/// How the backend separates the UI from the scene when interpolating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UiMode {
    #[default]
    Auto,
    None,
    Backbuffer,
    HudlessUiTexture,
    UiTexture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugFeature {
    ShowOnlyInterpolation,
    TagInterpolatedFrames,
    PresentFailedInterpolation,
}

/// Swapchain init flags derived from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InitFlags(u32);

impl InitFlags {
    pub const NONE: Self = Self(0);
    pub const INVERTED_DEPTH: Self = Self(1 << 0);
    pub const USE_NDC_VELOCITY: Self = Self(1 << 1);
    pub const JITTERED_MV: Self = Self(1 << 2);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for InitFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for InitFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Everything the backend needs to build its own swapchain in place of the host's.
#[derive(Debug, Clone)]
pub struct SwapchainInitRequest {
    pub window: NativeHandle,
    pub queue: NativeHandle,
    pub factory: NativeHandle,
    pub desc: SwapchainDesc1,
    pub fullscreen: Option<FullscreenDesc>,
    pub max_interpolated_frames: u32,
    pub ui_mode: UiMode,
    pub flags: InitFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Skipped,
    ResourceMismatch,
}

/// Outcome of the most recent present the backend completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentStatus {
    pub frames_presented: u32,
    pub frame_gen_enabled: bool,
    pub outcome: PresentOutcome,
}

impl Default for PresentStatus {
    fn default() -> Self {
        Self {
            frames_presented: 0,
            frame_gen_enabled: false,
            outcome: PresentOutcome::Skipped,
        }
    }
}

/// Frame interpolation engine.
///
/// Every method maps to one backend entry point. An entry point the module does not export
/// reports `BackendError::Unresolved`.
pub trait InterpolationBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Self-reported version, queried once and cached. Zero when the module is absent.
    fn version(&self) -> BackendVersion;

    fn is_initialized(&self) -> bool;

    fn supports(&self, cap: InterpolationCap) -> bool;

    fn create_context(&self, device: NativeHandle) -> Result<InterpolationHandle, BackendError>;

    fn destroy(&self, ctx: InterpolationHandle) -> BackendStatus;

    fn set_logging(&self, ctx: InterpolationHandle, level: BackendLogLevel) -> BackendStatus;

    fn set_latency_reduction(&self, ctx: InterpolationHandle, pacing: PacingHandle) -> BackendStatus;

    fn set_enabled(&self, ctx: InterpolationHandle, enabled: bool) -> BackendStatus;

    fn set_scene_change_threshold(&self, ctx: InterpolationHandle, threshold: f32) -> BackendStatus;

    fn enable_debug_feature(
        &self,
        ctx: InterpolationHandle,
        feature: DebugFeature,
        enable: bool,
    ) -> BackendStatus;

    fn init_from_swapchain_desc(
        &self,
        ctx: InterpolationHandle,
        request: &SwapchainInitRequest,
    ) -> BackendStatus;

    /// The backend-owned proxy swapchain. The returned object carries one reference.
    fn swapchain(&self, ctx: InterpolationHandle) -> Result<Arc<dyn NativeSwapchain>, BackendError>;

    fn tag_frame_constants(
        &self,
        ctx: InterpolationHandle,
        present_id: u32,
        constants: &FrameConstants,
    ) -> BackendStatus;

    fn tag_frame_resource(
        &self,
        ctx: InterpolationHandle,
        cmd: Option<NativeHandle>,
        present_id: u32,
        tag: &ResourceTag,
    ) -> BackendStatus;

    fn set_present_id(&self, ctx: InterpolationHandle, present_id: u32) -> BackendStatus;

    fn last_present_status(&self, ctx: InterpolationHandle) -> Result<PresentStatus, BackendError>;
}
