//! Per-frame inputs staged by the upscaler and the constants rebuilt from them.

use std::fmt;
use std::sync::Arc;

use crate::gpu::GpuResource;

/// Depth of the internally-owned command list ring and of the staged input ring.
pub const BUFFER_COUNT: usize = 4;

/// Ring slot used by `frame_id`.
#[inline]
pub fn slot_index(frame_id: u64) -> usize {
    (frame_id % BUFFER_COUNT as u64) as usize
}

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Constants pushed to the interpolation backend once per dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConstants {
    pub view: [f32; 16],
    pub projection: [f32; 16],
    pub jitter: [f32; 2],
    pub mv_scale: [f32; 2],
    pub reset_history: bool,
    pub frame_render_time: f32,
}

/// Camera and jitter state last set by the upscaler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub jitter: [f32; 2],
    pub mv_scale: [f32; 2],
    pub reset: bool,
    pub view: Option<[f32; 16]>,
    pub projection: Option<[f32; 16]>,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            jitter: [0.0, 0.0],
            mv_scale: [1.0, 1.0],
            reset: false,
            view: None,
            projection: None,
        }
    }
}

impl FrameParams {
    /// Identity matrices stand in for camera data the host did not supply.
    pub fn constants(&self, frame_time: f64) -> FrameConstants {
        FrameConstants {
            view: self.view.unwrap_or(IDENTITY),
            projection: self.projection.unwrap_or(IDENTITY),
            jitter: self.jitter,
            mv_scale: self.mv_scale,
            reset_history: self.reset,
            frame_render_time: frame_time as f32,
        }
    }
}

/// Inputs the upscaler can hand over for interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameInput {
    MotionVectors,
    Depth,
    Hudless,
}

#[derive(Clone, Default)]
pub struct FrameSlot {
    pub motion_vectors: Option<Arc<dyn GpuResource>>,
    pub depth: Option<Arc<dyn GpuResource>>,
    pub hudless: Option<Arc<dyn GpuResource>>,
}

impl FrameSlot {
    fn entry(&mut self, input: FrameInput) -> &mut Option<Arc<dyn GpuResource>> {
        match input {
            FrameInput::MotionVectors => &mut self.motion_vectors,
            FrameInput::Depth => &mut self.depth,
            FrameInput::Hudless => &mut self.hudless,
        }
    }
}

impl fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handle = |r: &Option<Arc<dyn GpuResource>>| r.as_ref().map(|r| r.native());
        f.debug_struct("FrameSlot")
            .field("motion_vectors", &handle(&self.motion_vectors))
            .field("depth", &handle(&self.depth))
            .field("hudless", &handle(&self.hudless))
            .finish()
    }
}

/// Ring of staged inputs, one slot per in-flight frame.
#[derive(Debug, Clone, Default)]
pub struct FrameInputs {
    slots: [FrameSlot; BUFFER_COUNT],
}

impl FrameInputs {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Passing `None` clears the input for that frame.
    pub fn stage(&mut self, frame_id: u64, input: FrameInput, resource: Option<Arc<dyn GpuResource>>) {
        *self.slots[slot_index(frame_id)].entry(input) = resource;
    }

    #[inline]
    pub fn slot(&self, frame_id: u64) -> &FrameSlot {
        &self.slots[slot_index(frame_id)]
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }
}
