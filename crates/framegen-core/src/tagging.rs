//! Resource tagging: validity classification and forwarding of per-frame resources.

use crate::backend::{InterpolationBackend, InterpolationCap, InterpolationHandle};
use crate::frame::FrameConstants;
use crate::gpu::{GpuResource, NativeHandle, PixelFormat, ResourceState};

/// How long a tagged resource stays meaningful to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Validity {
    /// Produced on an engine-owned list; may be read any time before the next present.
    UntilNextPresent,
    /// Supplied on a host list; must be consumed before the tagging call returns.
    OnlyNow,
}

impl Validity {
    #[inline]
    pub fn incoming_state(self) -> ResourceState {
        match self {
            Self::UntilNextPresent => ResourceState::NonPixelShaderResource,
            Self::OnlyNow => ResourceState::CopySource,
        }
    }
}

/// A null list or one of `internal` means the engine owns the recording.
pub fn classify_validity(cmd: Option<NativeHandle>, internal: &[NativeHandle]) -> Validity {
    match cmd {
        None => Validity::UntilNextPresent,
        Some(h) if h.is_null() || internal.contains(&h) => Validity::UntilNextPresent,
        Some(_) => Validity::OnlyNow,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    MotionVector,
    Depth,
    HudlessColor,
    Backbuffer,
}

/// Backend-facing description of one tagged resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTag {
    pub kind: ResourceKind,
    pub resource: NativeHandle,
    pub width: u32,
    pub height: u32,
    pub validity: Validity,
    pub incoming_state: ResourceState,
}

impl ResourceTag {
    /// Dimensions come from the resource's own descriptor; `None` when the width does not
    /// fit the backend's 32-bit field.
    pub fn describe(
        kind: ResourceKind,
        resource: &dyn GpuResource,
        validity: Validity,
    ) -> Option<Self> {
        let desc = resource.desc();
        let width = u32::try_from(desc.width).ok()?;
        Some(Self {
            kind,
            resource: resource.native(),
            width,
            height: desc.height,
            validity,
            incoming_state: validity.incoming_state(),
        })
    }
}

/// Resources offered for one frame; absent entries are not tagged.
#[derive(Default, Clone, Copy)]
pub struct FrameResourceSet<'a> {
    pub motion_vectors: Option<&'a dyn GpuResource>,
    pub depth: Option<&'a dyn GpuResource>,
    pub hudless: Option<&'a dyn GpuResource>,
    pub output: Option<&'a dyn GpuResource>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagReport {
    pub tagged: u32,
    pub dropped: u32,
}

/// Forwards one frame's resources to the backend under a single present id.
pub struct ResourceTagger<'a> {
    backend: &'a dyn InterpolationBackend,
    ctx: InterpolationHandle,
    present_id: u32,
    cmd: Option<NativeHandle>,
}

impl<'a> ResourceTagger<'a> {
    #[inline]
    pub fn new(
        backend: &'a dyn InterpolationBackend,
        ctx: InterpolationHandle,
        present_id: u32,
        cmd: Option<NativeHandle>,
    ) -> Self {
        Self {
            backend,
            ctx,
            present_id,
            cmd,
        }
    }

    pub fn push_constants(&self, constants: &FrameConstants) -> bool {
        if !self.backend.supports(InterpolationCap::TagFrameConstants) {
            return false;
        }
        let st = self.backend.tag_frame_constants(self.ctx, self.present_id, constants);
        if !st.is_ok() {
            log::warn!(target: "framegen", "frame {}: failed to tag frame constants: {st}", self.present_id);
        }
        st.is_ok()
    }

    /// Tags every present resource. A failed tag is logged and dropped; the rest proceed.
    ///
    /// The output is only forwarded when its format equals `swapchain_format`. Hudless
    /// color is always tagged until-next-present.
    pub fn tag_frame(
        &self,
        set: &FrameResourceSet<'_>,
        validity: Validity,
        swapchain_format: Option<PixelFormat>,
    ) -> TagReport {
        let mut report = TagReport::default();
        if !self.backend.supports(InterpolationCap::TagFrameResource) {
            return report;
        }

        let output = set
            .output
            .filter(|out| swapchain_format == Some(out.desc().format));

        let entries = [
            (ResourceKind::MotionVector, set.motion_vectors, validity),
            (ResourceKind::Depth, set.depth, validity),
            (ResourceKind::HudlessColor, set.hudless, Validity::UntilNextPresent),
            (ResourceKind::Backbuffer, output, validity),
        ];

        for (kind, resource, validity) in entries {
            let Some(resource) = resource else { continue };
            let Some(tag) = ResourceTag::describe(kind, resource, validity) else {
                report.dropped += 1;
                log::warn!(
                    target: "framegen",
                    "frame {}: {kind:?} width {} is out of range, not tagged",
                    self.present_id,
                    resource.desc().width
                );
                continue;
            };
            let st = self
                .backend
                .tag_frame_resource(self.ctx, self.cmd, self.present_id, &tag);
            if st.is_ok() {
                report.tagged += 1;
            } else {
                report.dropped += 1;
                log::warn!(target: "framegen", "frame {}: failed to tag {kind:?}: {st}", self.present_id);
            }
        }

        report
    }

    /// Binds the tags just sent to the upcoming present.
    pub fn set_present_id(&self) {
        if !self.backend.supports(InterpolationCap::SetPresentId) {
            return;
        }
        let st = self.backend.set_present_id(self.ctx, self.present_id);
        if !st.is_ok() {
            log::warn!(target: "framegen", "frame {}: set present id failed: {st}", self.present_id);
        }
    }
}
