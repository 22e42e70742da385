use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::{ControllerState, FrameGenSwapchain, LifecycleState};
use crate::backend::{
    BackendLogLevel, DebugFeature, InitFlags, InterpolationCap, InterpolationHandle,
    SwapchainInitRequest,
};
use crate::config::FgConfig;
use crate::error::{FgError, FgResult};
use crate::frame::BUFFER_COUNT;
use crate::gpu::{FrameCommandList, GpuDevice, NativeHandle};
use crate::lock::Owner;
use crate::swapchain::{
    FullscreenDesc, LegacySwapchainDesc, SwapchainDesc1, SwapchainInterface, SwapchainProxy,
};

fn init_flags(cfg: &FgConfig) -> InitFlags {
    let mut flags = InitFlags::NONE;
    if cfg.interpolation.inverted_depth {
        flags |= InitFlags::INVERTED_DEPTH;
    }
    if cfg.interpolation.ndc_velocity {
        flags |= InitFlags::USE_NDC_VELOCITY;
    }
    if cfg.interpolation.jittered_mv {
        flags |= InitFlags::JITTERED_MV;
    }
    flags
}

impl FrameGenSwapchain {
    /// Creates the interpolation context on `device`, or re-enables the existing one.
    ///
    /// Repeated calls without a destroy in between never create a second context.
    pub fn create_context(
        &self,
        device: Arc<dyn GpuDevice>,
        upscaler: Option<NativeHandle>,
    ) -> FgResult<()> {
        let cfg = self.session.config();
        let mut st = self.state.lock();
        if st.phase == LifecycleState::Destroyed {
            return Err(FgError::Destroyed);
        }

        log::debug!(
            target: "framegen",
            "create_context: device={:?} upscaler={upscaler:?}",
            device.native()
        );

        self.ensure_command_lists(&mut st, device.as_ref())?;
        st.device = Some(Arc::clone(&device));
        self.ensure_pacing(device.native(), &cfg);

        if let Some(ctx) = st.context {
            if self.interpolation.supports(InterpolationCap::SetEnabled) {
                log::debug!(target: "framegen", "re-enabling {}", self.interpolation.name());
                let status = self.interpolation.set_enabled(ctx, true);
                if !status.is_ok() {
                    log::warn!(target: "framegen", "enable failed: {status}");
                }
            }
            st.enabled = true;
            st.phase = if st.proxy.is_some() {
                LifecycleState::SwapchainActive
            } else {
                LifecycleState::ContextCreated
            };
            return Ok(());
        }

        let ctx = self.open_context(device.native(), &cfg)?;
        st.context = Some(ctx);
        st.enabled = true;
        st.phase = LifecycleState::ContextCreated;
        log::info!(target: "framegen", "{} context created", self.interpolation.name());
        Ok(())
    }

    /// Builds the proxy swapchain from the older descriptor form.
    ///
    /// On success the returned handle is the host's own reference.
    pub fn create_swapchain(
        &self,
        factory: NativeHandle,
        queue: NativeHandle,
        desc: &LegacySwapchainDesc,
    ) -> FgResult<SwapchainProxy> {
        log::debug!(target: "framegen", "creating swapchain from legacy descriptor");
        let (desc1, fullscreen) = desc.to_modern();
        self.build_swapchain(
            factory,
            queue,
            desc.output_window,
            desc1,
            Some(fullscreen),
            SwapchainInterface::Swapchain4,
        )
    }

    pub fn create_swapchain1(
        &self,
        factory: NativeHandle,
        queue: NativeHandle,
        window: NativeHandle,
        desc: &SwapchainDesc1,
        fullscreen: Option<&FullscreenDesc>,
    ) -> FgResult<SwapchainProxy> {
        log::debug!(target: "framegen", "creating swapchain from modern descriptor");
        self.build_swapchain(
            factory,
            queue,
            window,
            *desc,
            fullscreen.copied(),
            SwapchainInterface::Swapchain1,
        )
    }

    /// Tears down everything bound to `window`. Other windows are rejected untouched.
    pub fn release_swapchain(&self, window: NativeHandle) -> FgResult<()> {
        let cfg = self.session.config();
        let _guard = cfg
            .swapchain
            .use_mutex
            .then(|| self.lock.lock(Owner::Present));

        let mut st = self.state.lock();
        match st.window {
            Some(bound) if bound == window && !window.is_null() => {}
            bound => {
                return Err(FgError::HandleMismatch {
                    bound,
                    requested: window,
                })
            }
        }

        log::debug!(target: "framegen", "releasing swapchain of window {window:?}");
        if let Some(overlay) = &self.overlay {
            overlay.cleanup_render_targets();
        }

        if st.context.is_some() {
            self.teardown(&mut st, true, true);
        }
        Ok(())
    }

    /// Disables interpolation, and with `destroy` also releases every backend object.
    ///
    /// Teardown always runs to completion; backend failures are only logged.
    pub fn stop_and_destroy_context(&self, destroy: bool, shutdown: bool, use_mutex: bool) {
        let cfg = self.session.config();
        let _guard = (use_mutex && cfg.swapchain.use_mutex).then(|| {
            log::trace!(target: "framegen", "waiting swapchain lock, owner={}", self.lock.owner_token());
            self.lock.lock(Owner::Present)
        });

        let mut st = self.state.lock();
        self.teardown(&mut st, destroy, shutdown);
    }

    pub(super) fn teardown(&self, st: &mut ControllerState, destroy: bool, shutdown: bool) {
        if st.phase == LifecycleState::Destroyed {
            return;
        }
        let shutting_down = shutdown || self.session.is_shutting_down();

        if !shutting_down && st.enabled {
            if let Some(ctx) = st.context {
                if self.interpolation.supports(InterpolationCap::SetEnabled) {
                    let status = self.interpolation.set_enabled(ctx, false);
                    if !status.is_ok() {
                        log::warn!(target: "framegen", "disable failed: {status}");
                    }
                }
                st.enabled = false;
                if st.proxy.is_some() {
                    st.phase = LifecycleState::Disabled;
                }
                log::debug!(target: "framegen", "{} disabled", self.interpolation.name());
            }
        }

        if destroy {
            // Order matters: proxy, then interpolation, then pacing.
            st.proxy = None;

            if let Some(ctx) = st.context.take() {
                log::info!(target: "framegen", "destroying {} swapchain", self.interpolation.name());
                let status = self.interpolation.destroy(ctx);
                if !status.is_ok() {
                    log::warn!(target: "framegen", "interpolation destroy failed: {status}");
                }
            }

            self.pacing.destroy_context();

            st.enabled = false;
            st.window = None;
            st.queue = None;
            st.inputs.clear();
            self.frame_id.store(0, Ordering::Release);
            st.phase = if self.session.is_shutting_down() {
                LifecycleState::Destroyed
            } else {
                LifecycleState::Uninitialized
            };
        }

        if destroy || shutting_down {
            st.command_lists.clear();
        }
    }

    fn build_swapchain(
        &self,
        factory: NativeHandle,
        queue: NativeHandle,
        window: NativeHandle,
        desc: SwapchainDesc1,
        fullscreen: Option<FullscreenDesc>,
        iface: SwapchainInterface,
    ) -> FgResult<SwapchainProxy> {
        let cfg = self.session.config();
        let mut st = self.state.lock();
        if st.phase == LifecycleState::Destroyed {
            return Err(FgError::Destroyed);
        }

        let device = st
            .device
            .clone()
            .or_else(|| self.session.device())
            .ok_or_else(|| FgError::SwapchainCreation("no graphics device bound".to_owned()))?;

        self.ensure_pacing(device.native(), &cfg);

        let (ctx, created) = match st.context {
            Some(ctx) => (ctx, false),
            None => match self.open_context(device.native(), &cfg) {
                Ok(ctx) => (ctx, true),
                Err(e) => {
                    log::error!(target: "framegen", "failed to initialize {}: {e}", self.interpolation.name());
                    return Err(e);
                }
            },
        };

        let request = SwapchainInitRequest {
            window,
            queue,
            factory,
            desc,
            fullscreen,
            max_interpolated_frames: cfg.interpolation.max_interpolated_frames.max(1),
            ui_mode: st.ui_mode,
            flags: init_flags(&cfg),
        };

        let proxy = match self.init_proxy(ctx, &request, iface) {
            Ok(proxy) => proxy,
            Err(e) => {
                log::error!(target: "framegen", "{e}");
                if created {
                    let status = self.interpolation.destroy(ctx);
                    if !status.is_ok() {
                        log::warn!(target: "framegen", "rollback destroy failed: {status}");
                    }
                    self.pacing.unlink(ctx);
                }
                return Err(e);
            }
        };

        if let Err(e) = self.ensure_command_lists(&mut st, device.as_ref()) {
            log::warn!(target: "framegen", "engine command lists unavailable: {e}");
        }

        let host = proxy.clone();
        st.proxy = Some(proxy);
        st.device = Some(device);
        st.context = Some(ctx);
        st.window = Some(window);
        st.queue = Some(queue);
        st.enabled = true;
        st.phase = LifecycleState::SwapchainActive;

        log::info!(
            target: "framegen",
            "{} swapchain created ({}x{}, {} buffers)",
            self.interpolation.name(),
            desc.width,
            desc.height,
            desc.buffer_count
        );
        Ok(host)
    }

    fn init_proxy(
        &self,
        ctx: InterpolationHandle,
        request: &SwapchainInitRequest,
        iface: SwapchainInterface,
    ) -> FgResult<SwapchainProxy> {
        let status = self.interpolation.init_from_swapchain_desc(ctx, request);
        if !status.is_ok() {
            return Err(FgError::SwapchainCreation(format!(
                "init from swapchain desc: {status}"
            )));
        }

        let native = self
            .interpolation
            .swapchain(ctx)
            .map_err(|e| FgError::SwapchainCreation(format!("proxy swapchain query: {e}")))?;
        let proxy = SwapchainProxy::adopt(native);

        if !proxy.supports(iface) {
            return Err(FgError::SwapchainCreation(format!(
                "proxy swapchain does not expose {iface:?}"
            )));
        }
        Ok(proxy)
    }

    /// Creates and configures a fresh interpolation context and links pacing into it.
    fn open_context(&self, device: NativeHandle, cfg: &FgConfig) -> FgResult<InterpolationHandle> {
        let backend = self.interpolation.as_ref();
        if !backend.is_initialized() {
            return Err(FgError::Initialization(format!(
                "{} module is not available",
                backend.name()
            )));
        }

        let ctx = backend
            .create_context(device)
            .map_err(|e| FgError::ContextCreation(format!("{}: {e}", backend.name())))?;

        if backend.supports(InterpolationCap::Logging) {
            let level = BackendLogLevel::from_config(&cfg.logging.backend_level);
            let status = backend.set_logging(ctx, level);
            if !status.is_ok() {
                log::debug!(target: "framegen", "logging callback not installed: {status}");
            }
        }

        self.pacing.link(backend, ctx, device, cfg);
        self.configure(ctx, cfg);
        Ok(ctx)
    }

    fn configure(&self, ctx: InterpolationHandle, cfg: &FgConfig) {
        let backend = self.interpolation.as_ref();
        if backend.supports(InterpolationCap::SceneChangeThreshold) {
            let status =
                backend.set_scene_change_threshold(ctx, cfg.interpolation.scene_change_threshold);
            if !status.is_ok() {
                log::warn!(target: "framegen", "scene change threshold rejected: {status}");
            }
        }

        if !cfg.debug.view || !backend.supports(InterpolationCap::DebugFeatures) {
            return;
        }
        let features = [
            (DebugFeature::ShowOnlyInterpolation, cfg.debug.show_only_interpolation),
            (DebugFeature::TagInterpolatedFrames, cfg.debug.tag_interpolated_frames),
            (
                DebugFeature::PresentFailedInterpolation,
                cfg.debug.present_failed_interpolation,
            ),
        ];
        for (feature, enabled) in features {
            if !enabled {
                continue;
            }
            let status = backend.enable_debug_feature(ctx, feature, true);
            if !status.is_ok() {
                log::warn!(target: "framegen", "debug feature {feature:?} rejected: {status}");
            }
        }
    }

    fn ensure_pacing(&self, device: NativeHandle, cfg: &FgConfig) {
        if self.pacing.context().is_some() {
            return;
        }
        if let Err(e) = self.pacing.create_context(device, cfg) {
            log::warn!(target: "framegen", "latency pacing disabled: {e}");
        }
    }

    fn ensure_command_lists(&self, st: &mut ControllerState, device: &dyn GpuDevice) -> FgResult<()> {
        if !st.command_lists.is_empty() {
            return Ok(());
        }
        let lists = (0..BUFFER_COUNT)
            .map(|slot| device.create_frame_command_list(slot))
            .collect::<Result<Vec<Box<dyn FrameCommandList>>, _>>()?;
        st.command_lists = lists;
        Ok(())
    }
}
