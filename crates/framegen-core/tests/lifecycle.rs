mod common;

use std::sync::Arc;

use common::{desc_1080p, rig, rig_with, FACTORY, QUEUE, WINDOW};
use framegen_core::backend::{DebugFeature, InitFlags, UiMode};
use framegen_core::mock::{BackendCall, RecordingOverlay, RecordingPacing};
use framegen_core::swapchain::{NativeSwapchain, SwapchainDesc1};
use framegen_core::{FgConfig, FgError, FrameGenSwapchain, LifecycleState, NativeHandle};

fn is_create(c: &BackendCall) -> bool {
    matches!(c, BackendCall::InterpolationCreate { .. })
}

fn destroy_sequence(calls: &[BackendCall]) -> Vec<&'static str> {
    calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::SwapchainRelease { .. } => Some("swapchain"),
            BackendCall::InterpolationDestroy { .. } => Some("interpolation"),
            BackendCall::PacingDestroy { .. } => Some("pacing"),
            _ => None,
        })
        .collect()
}

#[test]
fn repeated_create_context_is_idempotent() {
    let r = rig();

    r.sc.create_context(r.device.clone(), None).unwrap();
    r.sc.create_context(r.device.clone(), None).unwrap();
    assert_eq!(r.sc.state(), LifecycleState::ContextCreated);
    assert!(r.sc.is_enabled());

    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    assert_eq!(r.sc.state(), LifecycleState::SwapchainActive);

    r.sc.create_context(r.device.clone(), None).unwrap();
    assert_eq!(r.sc.state(), LifecycleState::SwapchainActive);
    assert!(r.sc.is_enabled());

    assert_eq!(r.log.count(is_create), 1);
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::PacingCreate)), 1);
    assert!(r.log.count(|c| *c == BackendCall::SetEnabled(true)) >= 1);
}

#[test]
fn disable_keeps_context_and_resumes() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    let ctx = r.sc.context();

    r.sc.stop_and_destroy_context(false, false, false);
    assert_eq!(r.sc.state(), LifecycleState::Disabled);
    assert!(!r.sc.is_enabled());
    assert_eq!(r.sc.context(), ctx);
    assert_eq!(r.log.count(|c| *c == BackendCall::SetEnabled(false)), 1);
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::InterpolationDestroy { .. })), 0);

    r.sc.create_context(r.device.clone(), None).unwrap();
    assert_eq!(r.sc.state(), LifecycleState::SwapchainActive);
    assert_eq!(r.log.count(is_create), 1);
}

#[test]
fn pacing_is_destroyed_after_interpolation_on_every_path() {
    for shutdown in [false, true] {
        let r = rig();
        r.sc.create_context(r.device.clone(), None).unwrap();
        let host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
        drop(host);
        r.log.clear();

        r.sc.stop_and_destroy_context(true, shutdown, true);

        let calls = r.log.snapshot();
        assert_eq!(
            destroy_sequence(&calls),
            vec!["swapchain", "interpolation", "pacing"],
            "shutdown={shutdown}"
        );
        let disabled = calls.contains(&BackendCall::SetEnabled(false));
        assert_eq!(disabled, !shutdown, "shutdown={shutdown}");
        assert_eq!(r.sc.state(), LifecycleState::Uninitialized);
        assert!(r.sc.context().is_none());
        assert!(r.sc.pacing().context().is_none());
    }
}

#[test]
fn host_keeps_its_own_swapchain_reference() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();
    let host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    let native = r.fg.proxy().unwrap();

    // backend + controller + host
    assert_eq!(native.refs(), 3);

    r.sc.stop_and_destroy_context(true, false, false);
    assert_eq!(native.refs(), 2);
    assert_eq!(host.native(), native.native());

    drop(host);
    assert_eq!(native.refs(), 1);
}

#[test]
fn failed_swapchain_rolls_back_lazy_context() {
    let r = rig_with(FgConfig::default(), |fg| fg.failing_init());

    let err = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap_err();
    assert!(matches!(err, FgError::SwapchainCreation(_)));

    assert_eq!(r.sc.state(), LifecycleState::Uninitialized);
    assert!(r.sc.context().is_none());
    assert!(r.sc.window().is_none());

    let calls = r.log.snapshot();
    let created = calls.iter().position(is_create).unwrap();
    let destroyed = calls
        .iter()
        .position(|c| matches!(c, BackendCall::InterpolationDestroy { .. }))
        .unwrap();
    assert!(created < destroyed);
}

#[test]
fn failed_swapchain_keeps_explicit_context() {
    let r = rig_with(FgConfig::default(), |fg| fg.failing_init());
    r.sc.create_context(r.device.clone(), None).unwrap();

    assert!(r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).is_err());
    assert_eq!(r.sc.state(), LifecycleState::ContextCreated);
    assert!(r.sc.context().is_some());
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::InterpolationDestroy { .. })), 0);
}

#[test]
fn context_failure_leaves_state_untouched() {
    let r = rig_with(FgConfig::default(), |fg| fg.failing_context());

    let err = r.sc.create_context(r.device.clone(), None).unwrap_err();
    assert!(matches!(err, FgError::ContextCreation(_)));
    assert_eq!(r.sc.state(), LifecycleState::Uninitialized);
}

#[test]
fn modern_descriptor_requires_swapchain1_interface() {
    let r = rig_with(FgConfig::default(), |fg| fg.without_swapchain1());
    r.sc.create_context(r.device.clone(), None).unwrap();

    let desc = SwapchainDesc1 {
        width: 2560,
        height: 1440,
        buffer_count: 3,
        ..Default::default()
    };
    let err = r
        .sc
        .create_swapchain1(FACTORY, QUEUE, WINDOW, &desc, None)
        .unwrap_err();
    assert!(matches!(err, FgError::SwapchainCreation(_)));

    let native = r.fg.proxy().unwrap();
    assert_eq!(native.refs(), 1);
    assert_eq!(r.sc.state(), LifecycleState::ContextCreated);
}

#[test]
fn release_rejects_foreign_window() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();

    let err = r.sc.release_swapchain(NativeHandle::from_raw(0xBAD)).unwrap_err();
    assert!(matches!(
        err,
        FgError::HandleMismatch {
            bound: Some(WINDOW),
            ..
        }
    ));
    assert_eq!(r.sc.state(), LifecycleState::SwapchainActive);

    assert!(r.sc.release_swapchain(NativeHandle::NULL).is_err());
}

#[test]
fn release_cleans_overlay_before_teardown() {
    let r = rig();
    let sc = FrameGenSwapchain::new(
        r.session.clone(),
        r.fg.clone(),
        Arc::new(RecordingPacing::new(r.log.clone())),
    )
    .with_overlay(Arc::new(RecordingOverlay::new(r.log.clone())));

    sc.create_context(r.device.clone(), None).unwrap();
    let host = sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    drop(host);

    sc.release_swapchain(WINDOW).unwrap();
    assert_eq!(sc.state(), LifecycleState::Uninitialized);

    let calls = r.log.snapshot();
    let overlay = calls
        .iter()
        .position(|c| *c == BackendCall::OverlayCleanup)
        .unwrap();
    let destroy = calls
        .iter()
        .position(|c| matches!(c, BackendCall::InterpolationDestroy { .. }))
        .unwrap();
    assert!(overlay < destroy);
    assert!(!calls.contains(&BackendCall::SetEnabled(false)));

    assert!(sc.release_swapchain(WINDOW).is_err());
}

#[test]
fn swapchain_can_be_recreated_after_release() {
    let r = rig();
    let first = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    drop(first);
    r.sc.release_swapchain(WINDOW).unwrap();

    let _second = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    assert_eq!(r.sc.state(), LifecycleState::SwapchainActive);
    assert_eq!(r.log.count(is_create), 2);
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::PacingCreate)), 2);
}

#[test]
fn session_shutdown_makes_teardown_terminal() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();

    r.session.shutdown().request();
    r.sc.stop_and_destroy_context(true, false, false);

    assert_eq!(r.sc.state(), LifecycleState::Destroyed);
    assert!(!r.log.snapshot().contains(&BackendCall::SetEnabled(false)));
    assert!(matches!(
        r.sc.create_context(r.device.clone(), None),
        Err(FgError::Destroyed)
    ));
}

#[test]
fn frame_id_resets_only_on_destroy() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();

    for expected in 1..=3 {
        assert_eq!(r.sc.begin_frame(), expected);
    }

    r.sc.stop_and_destroy_context(false, false, false);
    assert_eq!(r.sc.frame_id(), 3);

    r.sc.stop_and_destroy_context(true, false, false);
    assert_eq!(r.sc.frame_id(), 0);
}

#[test]
fn begin_frame_resets_ring_slot_only_when_active() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();
    r.sc.begin_frame();
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::CommandListReset { .. })), 0);

    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    let id = r.sc.begin_frame();
    let slot = (id as usize) % framegen_core::BUFFER_COUNT;
    assert!(r.log.snapshot().contains(&BackendCall::CommandListReset { slot }));
}

#[test]
fn drop_tears_everything_down() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();
    let host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    drop(host);
    r.log.clear();

    let log = r.log.clone();
    drop(r);

    assert_eq!(
        destroy_sequence(&log.snapshot()),
        vec!["swapchain", "interpolation", "pacing"]
    );
}

#[test]
fn config_drives_context_and_init_flags() {
    let mut cfg = FgConfig::default();
    cfg.interpolation.inverted_depth = true;
    cfg.interpolation.jittered_mv = true;
    cfg.interpolation.scene_change_threshold = 0.7;
    cfg.debug.view = true;
    cfg.debug.show_only_interpolation = true;

    let r = rig_with(cfg, |fg| fg);
    r.sc.set_ui_mode(UiMode::HudlessUiTexture);
    r.sc.create_context(r.device.clone(), None).unwrap();
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();

    let calls = r.log.snapshot();
    assert!(calls.contains(&BackendCall::SceneChangeThreshold(0.7)));
    assert!(calls.contains(&BackendCall::DebugFeature(DebugFeature::ShowOnlyInterpolation)));
    assert!(!calls.contains(&BackendCall::DebugFeature(DebugFeature::TagInterpolatedFrames)));

    let init = calls
        .iter()
        .find_map(|c| match c {
            BackendCall::InitFromDesc {
                width,
                height,
                buffer_count,
                flags,
                ui_mode,
                window,
            } => Some((*width, *height, *buffer_count, *flags, *ui_mode, *window)),
            _ => None,
        })
        .unwrap();
    assert_eq!((init.0, init.1, init.2), (1920, 1080, 2));
    assert!(init.3.contains(InitFlags::INVERTED_DEPTH | InitFlags::JITTERED_MV));
    assert!(!init.3.contains(InitFlags::USE_NDC_VELOCITY));
    assert_eq!(init.4, UiMode::HudlessUiTexture);
    assert_eq!(init.5, WINDOW);
}

#[test]
fn pacing_is_linked_into_interpolation() {
    let r = rig();
    r.sc.create_context(r.device.clone(), None).unwrap();

    let ctx = r.sc.context().unwrap();
    let pacing = r.sc.pacing().context().unwrap();
    assert!(r
        .log
        .snapshot()
        .contains(&BackendCall::LatencyReduction { ctx, pacing }));
    assert_eq!(r.sc.pacing().linked_to(), Some(ctx));
}

#[test]
fn rolled_back_context_does_not_keep_pacing_link() {
    let r = rig_with(FgConfig::default(), |fg| {
        fg.failing_init_once().reusing_context_handle()
    });

    assert!(r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).is_err());
    assert!(r.sc.context().is_none());
    assert!(r.sc.pacing().context().is_some());
    assert_eq!(r.sc.pacing().linked_to(), None);
    r.log.clear();

    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    let ctx = r.sc.context().unwrap();
    let pacing = r.sc.pacing().context().unwrap();
    assert_eq!(
        r.log.count(|c| matches!(c, BackendCall::LatencyReduction { .. })),
        1
    );
    assert!(r
        .log
        .snapshot()
        .contains(&BackendCall::LatencyReduction { ctx, pacing }));
    assert_eq!(r.sc.pacing().linked_to(), Some(ctx));
}

#[test]
fn failed_interpolation_destroy_still_releases_pacing() {
    let r = rig_with(FgConfig::default(), |fg| fg.failing_destroy());
    r.sc.create_context(r.device.clone(), None).unwrap();
    let host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    drop(host);
    r.log.clear();

    r.sc.stop_and_destroy_context(true, false, false);

    assert_eq!(
        destroy_sequence(&r.log.snapshot()),
        vec!["swapchain", "interpolation", "pacing"]
    );
    assert_eq!(r.sc.state(), LifecycleState::Uninitialized);
    assert!(r.sc.context().is_none());
    assert!(r.sc.pacing().context().is_none());
}

#[test]
fn failed_pacing_destroy_still_finishes_teardown() {
    let r = rig();
    let sc = FrameGenSwapchain::new(
        r.session.clone(),
        r.fg.clone(),
        Arc::new(RecordingPacing::new(r.log.clone()).failing_destroy()),
    );
    sc.create_context(r.device.clone(), None).unwrap();
    let host = sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    drop(host);

    sc.stop_and_destroy_context(true, false, false);
    assert_eq!(sc.state(), LifecycleState::Uninitialized);
    assert!(sc.pacing().context().is_none());
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::PacingDestroy { .. })), 1);
}

#[test]
fn failed_sleep_still_advances_frame_id() {
    let r = rig();
    let sc = FrameGenSwapchain::new(
        r.session.clone(),
        r.fg.clone(),
        Arc::new(RecordingPacing::new(r.log.clone()).failing_sleep()),
    );
    sc.create_context(r.device.clone(), None).unwrap();
    let _host = sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();

    for expected in 1..=3 {
        let previous = sc.frame_id();
        assert_eq!(sc.begin_frame(), previous + 1);
        assert_eq!(sc.frame_id(), expected);
    }
    assert_eq!(r.log.count(|c| matches!(c, BackendCall::Sleep { .. })), 3);
}
