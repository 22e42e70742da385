use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::FrameGenSwapchain;
use crate::backend::{InterpolationCap, InterpolationHandle, LatencyMarker, PresentStatus};
use crate::frame::{slot_index, FrameInput, FrameParams, FrameSlot};
use crate::gpu::{GpuResource, NativeHandle, PixelFormat};
use crate::lock::{Owner, OwnerGuard};
use crate::tagging::{classify_validity, FrameResourceSet, ResourceTagger, Validity};

/// Everything one dispatch needs, copied out of the controller state.
struct FrameSnapshot {
    ctx: InterpolationHandle,
    swapchain_format: Option<PixelFormat>,
    internal_lists: Vec<NativeHandle>,
    own_list: Option<NativeHandle>,
    inputs: FrameSlot,
    params: FrameParams,
}

impl FrameGenSwapchain {
    /// Starts a frame: paces, advances the frame id and reopens this slot's command list.
    pub fn begin_frame(&self) -> u64 {
        let current = self.frame_id.load(Ordering::Acquire);
        self.pacing.sleep(current as u32);

        let frame_id = self.frame_id.fetch_add(1, Ordering::AcqRel) + 1;

        let mut st = self.state.lock();
        if st.is_active() {
            let slot = slot_index(frame_id);
            if let Some(list) = st.command_lists.get_mut(slot) {
                match list.reset() {
                    Ok(()) => log::debug!(target: "framegen", "command list {slot} reset"),
                    Err(e) => log::warn!(target: "framegen", "command list {slot}: {e}"),
                }
            }
        }
        frame_id
    }

    pub fn end_frame(&self) {
        log::trace!(target: "framegen", "frame {} upscale end", self.frame_id());
    }

    /// Render-submission path: tags motion vectors, depth and the output for this frame.
    ///
    /// Returns `false` when there is no context or proxy swapchain to interpolate with.
    /// Individual tag failures are logged and do not change the result.
    pub fn dispatch(
        &self,
        cmd: Option<NativeHandle>,
        output: Option<&dyn GpuResource>,
        frame_time: f64,
    ) -> bool {
        let frame_id = self.frame_id();
        let present_id = frame_id as u32;
        log::debug!(target: "framegen", "dispatch frame {frame_id}");

        let cfg = self.session.config();
        self.pacing.mark(present_id, LatencyMarker::SimulationStart);

        let _guard = cfg.swapchain.use_mutex.then(|| {
            log::trace!(target: "framegen", "waiting swapchain lock, owner={}", self.lock.owner_token());
            self.lock.lock(Owner::Submission)
        });

        self.pacing.mark(present_id, LatencyMarker::SimulationEnd);
        self.pacing.mark(present_id, LatencyMarker::RenderSubmitStart);

        let Some(snap) = self.snapshot(frame_id) else {
            log::debug!(target: "framegen", "frame {frame_id}: no proxy swapchain, skipping");
            self.pacing.mark(present_id, LatencyMarker::RenderSubmitEnd);
            return false;
        };

        let tagger = ResourceTagger::new(self.interpolation.as_ref(), snap.ctx, present_id, cmd);
        tagger.push_constants(&snap.params.constants(frame_time));

        let validity = classify_validity(cmd, &snap.internal_lists);
        let set = FrameResourceSet {
            motion_vectors: snap.inputs.motion_vectors.as_deref(),
            depth: snap.inputs.depth.as_deref(),
            hudless: None,
            output,
        };
        let report = tagger.tag_frame(&set, validity, snap.swapchain_format);
        log::trace!(
            target: "framegen",
            "frame {frame_id}: {validity:?} tagged={} dropped={}",
            report.tagged,
            report.dropped
        );

        self.pacing.mark(present_id, LatencyMarker::RenderSubmitEnd);
        tagger.set_present_id();
        true
    }

    /// Present-thread path for frames composited without the UI.
    ///
    /// Everything is tagged on the engine's own command list and stays valid until the
    /// next present.
    pub fn dispatch_hudless(&self, use_hudless: bool, frame_time: f64) -> bool {
        let frame_id = self.frame_id();
        let present_id = frame_id as u32;
        log::debug!(target: "framegen", "dispatch hudless frame {frame_id}, use_hudless={use_hudless}");

        self.pacing.mark(present_id, LatencyMarker::SimulationStart);
        let _guard = self.hudless_guard();

        self.pacing.mark(present_id, LatencyMarker::SimulationEnd);
        self.pacing.mark(present_id, LatencyMarker::RenderSubmitStart);

        let Some(snap) = self.snapshot(frame_id) else {
            self.pacing.mark(present_id, LatencyMarker::RenderSubmitEnd);
            return false;
        };

        let tagger =
            ResourceTagger::new(self.interpolation.as_ref(), snap.ctx, present_id, snap.own_list);
        let hudless = if use_hudless {
            snap.inputs.hudless.as_deref()
        } else {
            None
        };
        if let Some(h) = hudless {
            log::trace!(target: "framegen", "using hudless {:?}", h.native());
        }

        let set = FrameResourceSet {
            motion_vectors: snap.inputs.motion_vectors.as_deref(),
            depth: snap.inputs.depth.as_deref(),
            hudless,
            output: None,
        };
        tagger.tag_frame(&set, Validity::UntilNextPresent, None);
        tagger.push_constants(&snap.params.constants(frame_time));

        self.pacing.mark(present_id, LatencyMarker::RenderSubmitEnd);
        tagger.set_present_id();
        true
    }

    /// Lock taken by the hudless path.
    ///
    /// By default the present token is acquired like any other critical section. The
    /// legacy rule skips locking while the present token is held and otherwise takes the
    /// submission token, releasing it only because this call acquired it.
    fn hudless_guard(&self) -> Option<OwnerGuard<'_>> {
        let cfg = self.session.config();
        if !cfg.swapchain.use_mutex {
            return None;
        }
        if cfg.swapchain.hudless_legacy_locking {
            if self.lock.owner() == Some(Owner::Present) {
                log::trace!(target: "framegen", "swapchain lock held by present, not locking");
                return None;
            }
            return Some(self.lock.lock(Owner::Submission));
        }
        if let Some(guard) = self.lock.try_lock(Owner::Present) {
            return Some(guard);
        }
        if self.lock.owner() == Some(Owner::Submission) {
            // Deadlocks when called from inside the render submission itself.
            log::warn!(
                target: "framegen",
                "hudless dispatch waiting on the submission lock; enable hudless_legacy_locking if it is nested in render submission"
            );
        } else {
            log::trace!(target: "framegen", "waiting swapchain lock, owner={}", self.lock.owner_token());
        }
        Some(self.lock.lock(Owner::Present))
    }

    pub fn mark_present_start(&self) {
        self.pacing
            .mark(self.frame_id() as u32, LatencyMarker::PresentStart);
    }

    pub fn mark_present_end(&self) {
        self.pacing
            .mark(self.frame_id() as u32, LatencyMarker::PresentEnd);
    }

    /// Backend status of the most recently completed present, passed through unchanged.
    pub fn last_present_status(&self) -> PresentStatus {
        let ctx = self.state.lock().context;
        if let Some(ctx) = ctx {
            if self.interpolation.supports(InterpolationCap::LastPresentStatus) {
                match self.interpolation.last_present_status(ctx) {
                    Ok(status) => {
                        self.state.lock().last_status = status;
                        return status;
                    }
                    Err(e) => log::debug!(target: "framegen", "last present status: {e}"),
                }
            }
        }
        self.state.lock().last_status
    }

    /// Stages an upscaler input for the current frame; `None` clears it.
    pub fn stage_resource(&self, input: FrameInput, resource: Option<Arc<dyn GpuResource>>) {
        let frame_id = self.frame_id();
        self.state.lock().inputs.stage(frame_id, input, resource);
    }

    pub fn set_frame_params(&self, params: FrameParams) {
        self.state.lock().params = params;
    }

    fn snapshot(&self, frame_id: u64) -> Option<FrameSnapshot> {
        let st = self.state.lock();
        let ctx = st.context?;
        let proxy = st.proxy.as_ref()?;
        Some(FrameSnapshot {
            ctx,
            swapchain_format: proxy.buffer_format(),
            internal_lists: st.internal_lists(),
            own_list: st.command_lists.get(slot_index(frame_id)).map(|l| l.native()),
            inputs: st.inputs.slot(frame_id).clone(),
            params: st.params,
        })
    }
}
