mod common;

use common::{desc_1080p, rig, rig_with, Rig, FACTORY, QUEUE};
use framegen_core::backend::{BackendError, LatencyMarker, PresentOutcome};
use framegen_core::frame::slot_index;
use framegen_core::gpu::ResourceState;
use framegen_core::mock::{BackendCall, FakeResource};
use framegen_core::swapchain::SwapchainProxy;
use framegen_core::tagging::ResourceKind;
use framegen_core::{
    BackendStatus, FgConfig, FrameInput, FrameParams, GpuResource, NativeHandle, PixelFormat,
    PresentStatus, Validity,
};

fn active(r: &Rig) -> SwapchainProxy {
    r.sc.create_context(r.device.clone(), None).unwrap();
    r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap()
}

fn stage_inputs(r: &Rig, seed: usize) {
    r.sc.stage_resource(
        FrameInput::MotionVectors,
        Some(FakeResource::new(0xA000 + seed, 1920, 1080, PixelFormat::R16G16_FLOAT).shared()),
    );
    r.sc.stage_resource(
        FrameInput::Depth,
        Some(FakeResource::new(0xA800 + seed, 1920, 1080, PixelFormat::D32_FLOAT).shared()),
    );
}

fn tags(calls: &[BackendCall]) -> Vec<(u32, ResourceKind, Validity, ResourceState, Option<NativeHandle>)> {
    calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::TagResource {
                present_id,
                kind,
                validity,
                state,
                cmd,
            } => Some((*present_id, *kind, *validity, *state, *cmd)),
            _ => None,
        })
        .collect()
}

#[test]
fn three_frames_end_to_end() {
    let mut cfg = FgConfig::default();
    cfg.swapchain.use_mutex = true;
    let r = rig_with(cfg, |fg| fg);

    r.sc.create_context(r.device.clone(), None).unwrap();
    let host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    assert_eq!(host.buffer_format(), Some(PixelFormat::R8G8B8A8_UNORM));

    let out = FakeResource::new(0xB0B, 1920, 1080, PixelFormat::R8G8B8A8_UNORM);
    for _ in 0..3 {
        let id = r.sc.begin_frame();
        stage_inputs(&r, id as usize);
        let output = (id == 2).then_some(&out as &dyn GpuResource);
        assert!(r.sc.dispatch(None, output, 16.6));
    }
    assert_eq!(r.sc.lock_owner(), None);

    let calls = r.log.snapshot();
    assert_eq!(
        r.log.count(|c| matches!(c, BackendCall::TagConstants { .. })),
        3
    );

    let present_ids: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::SetPresentId(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(present_ids, vec![1, 2, 3]);

    let tagged = tags(&calls);
    let backbuffers: Vec<_> = tagged
        .iter()
        .filter(|t| t.1 == ResourceKind::Backbuffer)
        .collect();
    assert_eq!(backbuffers.len(), 1);
    assert_eq!(backbuffers[0].0, 2);
    assert_eq!(tagged.iter().filter(|t| t.1 == ResourceKind::MotionVector).count(), 3);
    assert_eq!(tagged.iter().filter(|t| t.1 == ResourceKind::Depth).count(), 3);
    for (_, _, validity, state, cmd) in &tagged {
        assert_eq!(*validity, Validity::UntilNextPresent);
        assert_eq!(*state, ResourceState::NonPixelShaderResource);
        assert_eq!(*cmd, None);
    }

    drop(host);
    r.log.clear();
    r.sc.stop_and_destroy_context(true, false, true);

    let order: Vec<&str> = r
        .log
        .snapshot()
        .iter()
        .filter_map(|c| match c {
            BackendCall::SwapchainRelease { .. } => Some("swapchain"),
            BackendCall::InterpolationDestroy { .. } => Some("interpolation"),
            BackendCall::PacingDestroy { .. } => Some("pacing"),
            _ => None,
        })
        .collect();
    assert_eq!(order, vec!["swapchain", "interpolation", "pacing"]);
    assert_eq!(r.sc.lock_owner(), None);
}

#[test]
fn tags_for_a_frame_precede_its_present_id() {
    let r = rig();
    let _host = active(&r);

    for _ in 0..2 {
        let id = r.sc.begin_frame();
        stage_inputs(&r, id as usize);
        r.sc.dispatch(None, None, 8.0);
    }

    let calls = r.log.snapshot();
    for id in 1..=2u32 {
        let bound = calls
            .iter()
            .position(|c| *c == BackendCall::SetPresentId(id))
            .unwrap();
        let last_tag = calls
            .iter()
            .rposition(|c| {
                matches!(c, BackendCall::TagResource { present_id, .. } if *present_id == id)
                    || matches!(c, BackendCall::TagConstants { present_id, .. } if *present_id == id)
            })
            .unwrap();
        assert!(last_tag < bound, "frame {id}");
    }
}

#[test]
fn output_with_foreign_format_is_not_tagged() {
    let r = rig_with(FgConfig::default(), |fg| {
        fg.with_buffer_format(PixelFormat::R10G10B10A2_UNORM)
    });
    let _host = active(&r);

    let id = r.sc.begin_frame();
    stage_inputs(&r, id as usize);
    let out = FakeResource::new(0xB0B, 1920, 1080, PixelFormat::R8G8B8A8_UNORM);
    assert!(r.sc.dispatch(None, Some(&out), 16.6));

    let tagged = tags(&r.log.snapshot());
    assert!(tagged.iter().all(|t| t.1 != ResourceKind::Backbuffer));
    assert_eq!(tagged.len(), 2);
}

#[test]
fn output_is_skipped_when_swapchain_cannot_describe_itself() {
    let r = rig();
    let _host = active(&r);
    r.fg.proxy().unwrap().set_format(None);

    r.sc.begin_frame();
    let out = FakeResource::new(0xB0B, 1920, 1080, PixelFormat::R8G8B8A8_UNORM);
    assert!(r.sc.dispatch(None, Some(&out), 16.6));

    assert!(tags(&r.log.snapshot()).is_empty());
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::SetPresentId(_))), 1);
}

#[test]
fn validity_follows_the_recording_command_list() {
    let r = rig();
    let _host = active(&r);

    let id = r.sc.begin_frame();
    stage_inputs(&r, id as usize);

    let foreign = NativeHandle::from_raw(0x7777);
    r.sc.dispatch(Some(foreign), None, 16.6);
    let internal = r.device.command_list_handle(2);
    r.sc.dispatch(Some(internal), None, 16.6);
    r.sc.dispatch(Some(NativeHandle::NULL), None, 16.6);

    let tagged = tags(&r.log.snapshot());
    assert_eq!(tagged.len(), 6);
    for t in &tagged[0..2] {
        assert_eq!((t.2, t.3, t.4), (Validity::OnlyNow, ResourceState::CopySource, Some(foreign)));
    }
    for t in &tagged[2..4] {
        assert_eq!(t.2, Validity::UntilNextPresent);
        assert_eq!(t.4, Some(internal));
    }
    for t in &tagged[4..6] {
        assert_eq!(t.2, Validity::UntilNextPresent);
        assert_eq!(t.3, ResourceState::NonPixelShaderResource);
    }

    assert_eq!(r.sc.classify_validity(Some(foreign)), Validity::OnlyNow);
    assert_eq!(r.sc.classify_validity(None), Validity::UntilNextPresent);
}

#[test]
fn dispatch_without_swapchain_is_a_no_op() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();

    let id = r.sc.begin_frame();
    stage_inputs(&r, id as usize);
    assert!(!r.sc.dispatch(None, None, 16.6));
    assert!(!r.sc.dispatch_hudless(true, 16.6));

    assert_eq!(r.log.count(|c| matches!(c, BackendCall::TagConstants { .. })), 0);
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::TagResource { .. })), 0);
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::SetPresentId(_))), 0);
}

#[test]
fn hudless_tags_on_own_list_until_next_present() {
    let r = rig();
    let _host = active(&r);

    let id = r.sc.begin_frame();
    stage_inputs(&r, id as usize);
    r.sc.stage_resource(
        FrameInput::Hudless,
        Some(FakeResource::new(0xC0C, 1920, 1080, PixelFormat::R8G8B8A8_UNORM).shared()),
    );
    r.log.clear();

    assert!(r.sc.dispatch_hudless(true, 16.6));

    let own = r.device.command_list_handle(slot_index(id));
    let calls = r.log.snapshot();
    let tagged = tags(&calls);
    let kinds: Vec<ResourceKind> = tagged.iter().map(|t| t.1).collect();
    assert_eq!(
        kinds,
        vec![ResourceKind::MotionVector, ResourceKind::Depth, ResourceKind::HudlessColor]
    );
    for t in &tagged {
        assert_eq!(t.2, Validity::UntilNextPresent);
        assert_eq!(t.4, Some(own));
    }

    let last_tag = calls
        .iter()
        .rposition(|c| matches!(c, BackendCall::TagResource { .. }))
        .unwrap();
    let constants = calls
        .iter()
        .position(|c| matches!(c, BackendCall::TagConstants { .. }))
        .unwrap();
    assert!(last_tag < constants);
    assert_eq!(calls.last(), Some(&BackendCall::SetPresentId(id as u32)));

    r.log.clear();
    r.sc.dispatch_hudless(false, 16.6);
    assert!(tags(&r.log.snapshot())
        .iter()
        .all(|t| t.1 != ResourceKind::HudlessColor));
}

#[test]
fn markers_follow_frame_stage_order() {
    let r = rig();
    let _host = active(&r);
    r.log.clear();

    let id = r.sc.begin_frame() as u32;
    r.sc.dispatch(None, None, 16.6);
    r.sc.mark_present_start();
    r.sc.mark_present_end();

    let calls = r.log.snapshot();
    assert_eq!(calls.first(), Some(&BackendCall::Sleep { frame_id: id - 1 }));

    let markers: Vec<LatencyMarker> = calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::Marker { frame_id, marker } if *frame_id == id => Some(*marker),
            _ => None,
        })
        .collect();
    assert_eq!(
        markers,
        vec![
            LatencyMarker::SimulationStart,
            LatencyMarker::SimulationEnd,
            LatencyMarker::RenderSubmitStart,
            LatencyMarker::RenderSubmitEnd,
            LatencyMarker::PresentStart,
            LatencyMarker::PresentEnd,
        ]
    );
    assert!(markers.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn failed_tag_is_dropped_and_frame_continues() {
    let r = rig();
    let _host = active(&r);
    r.fg
        .set_tag_status(BackendStatus::Error(BackendError::InvalidArgument));

    let id = r.sc.begin_frame();
    stage_inputs(&r, id as usize);
    assert!(r.sc.dispatch(None, None, 16.6));

    assert_eq!(tags(&r.log.snapshot()).len(), 2);
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::TagConstants { .. })), 1);
    assert!(r.log.snapshot().contains(&BackendCall::SetPresentId(id as u32)));
}

#[test]
fn reset_flag_reaches_frame_constants() {
    let r = rig();
    let _host = active(&r);

    r.sc.begin_frame();
    r.sc.set_frame_params(FrameParams {
        reset: true,
        ..Default::default()
    });
    r.sc.dispatch(None, None, 16.6);

    assert!(r.log.snapshot().contains(&BackendCall::TagConstants {
        present_id: 1,
        reset_history: true
    }));
}

#[test]
fn present_status_passes_through_unchanged() {
    let r = rig();
    assert_eq!(r.sc.last_present_status(), PresentStatus::default());
    assert_eq!(r.log.count(|c| *c == BackendCall::LastPresentStatus), 0);

    let _host = active(&r);
    let status = PresentStatus {
        frames_presented: 1,
        frame_gen_enabled: false,
        outcome: PresentOutcome::ResourceMismatch,
    };
    r.fg.set_present_status(status);

    assert_eq!(r.sc.last_present_status(), status);
    assert_eq!(r.log.count(|c| *c == BackendCall::LastPresentStatus), 1);
}

#[test]
fn staged_inputs_are_cleared_on_destroy() {
    let r = rig();
    let _host = active(&r);
    let id = r.sc.begin_frame();
    stage_inputs(&r, id as usize);

    r.sc.stop_and_destroy_context(true, false, false);
    let _host = active(&r);
    for _ in 0..id {
        r.sc.begin_frame();
    }
    r.log.clear();
    r.sc.dispatch(None, None, 16.6);

    assert!(tags(&r.log.snapshot()).is_empty());
}
