mod common;

use std::thread;
use std::time::Duration;

use common::{desc_1080p, rig_with, Rig, FACTORY, QUEUE};
use framegen_core::mock::FakeResource;
use framegen_core::{FgConfig, FrameInput, LifecycleState, Owner, PixelFormat};

const FRAMES: usize = 24;

fn locked(legacy: bool, tag_delay: Option<Duration>) -> Rig {
    let mut cfg = FgConfig::default();
    cfg.swapchain.use_mutex = true;
    cfg.swapchain.hudless_legacy_locking = legacy;
    let r = rig_with(cfg, |fg| match tag_delay {
        Some(d) => fg.with_tag_delay(d),
        None => fg,
    });
    r.sc.create_context(r.device.clone(), None).unwrap();
    r
}

#[test]
fn submission_and_present_never_overlap() {
    let r = locked(false, Some(Duration::from_micros(300)));
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..FRAMES {
                let id = r.sc.begin_frame();
                r.sc.stage_resource(
                    FrameInput::MotionVectors,
                    Some(FakeResource::new(0xA000 + i, 1920, 1080, PixelFormat::R16G16_FLOAT).shared()),
                );
                r.sc.dispatch(None, None, 16.6);
                let token = r.sc.swapchain_lock().owner_token();
                assert!(token <= 2, "frame {id}: token {token}");
            }
        });
        s.spawn(|| {
            for _ in 0..FRAMES {
                r.sc.mark_present_start();
                r.sc.dispatch_hudless(true, 16.6);
                r.sc.mark_present_end();
                let token = r.sc.swapchain_lock().owner_token();
                assert!(token <= 2);
            }
        });
    });

    assert_eq!(r.fg.max_concurrent_tags(), 1);
    assert_eq!(r.sc.lock_owner(), None);
}

#[test]
fn present_teardown_waits_for_submission() {
    let r = locked(false, None);
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();

    thread::scope(|s| {
        let guard = r.sc.swapchain_lock().lock(Owner::Submission);
        let teardown = s.spawn(|| r.sc.stop_and_destroy_context(false, false, true));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(r.sc.state(), LifecycleState::SwapchainActive);
        assert!(!teardown.is_finished());

        drop(guard);
        teardown.join().unwrap();
    });

    assert_eq!(r.sc.state(), LifecycleState::Disabled);
    assert_eq!(r.sc.lock_owner(), None);
}

#[test]
fn teardown_without_mutex_flag_does_not_lock() {
    let r = locked(false, None);
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();

    let _guard = r.sc.swapchain_lock().lock(Owner::Submission);
    r.sc.stop_and_destroy_context(false, false, false);
    assert_eq!(r.sc.state(), LifecycleState::Disabled);
    assert_eq!(r.sc.lock_owner(), Some(Owner::Submission));
}

#[test]
fn hudless_reenters_a_held_present_lock() {
    for legacy in [false, true] {
        let r = locked(legacy, None);
        let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
        r.sc.begin_frame();

        let guard = r.sc.swapchain_lock().lock(Owner::Present);
        assert!(r.sc.dispatch_hudless(true, 16.6));
        assert_eq!(r.sc.lock_owner(), Some(Owner::Present), "legacy={legacy}");

        drop(guard);
        assert_eq!(r.sc.lock_owner(), None, "legacy={legacy}");
    }
}

#[test]
fn legacy_hudless_releases_only_what_it_took() {
    let r = locked(true, None);
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    r.sc.begin_frame();

    assert!(r.sc.dispatch_hudless(true, 16.6));
    assert_eq!(r.sc.lock_owner(), None);

    let guard = r.sc.swapchain_lock().lock(Owner::Submission);
    assert!(r.sc.dispatch_hudless(true, 16.6));
    assert_eq!(r.sc.lock_owner(), Some(Owner::Submission));
    drop(guard);
    assert_eq!(r.sc.lock_owner(), None);
}

#[test]
fn dispatch_releases_lock_on_early_return() {
    let r = locked(false, None);
    r.sc.begin_frame();

    assert!(!r.sc.dispatch(None, None, 16.6));
    assert_eq!(r.sc.lock_owner(), None);
    assert!(!r.sc.dispatch_hudless(false, 16.6));
    assert_eq!(r.sc.lock_owner(), None);
}

#[test]
fn strict_hudless_waits_out_a_held_submission_lock() {
    let r = locked(false, None);
    let _host = r.sc.create_swapchain(FACTORY, QUEUE, &desc_1080p()).unwrap();
    r.sc.begin_frame();

    thread::scope(|s| {
        let guard = r.sc.swapchain_lock().lock(Owner::Submission);
        let hudless = s.spawn(|| {
            let ok = r.sc.dispatch_hudless(true, 16.6);
            (ok, r.sc.lock_owner())
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!hudless.is_finished());
        assert_eq!(r.sc.lock_owner(), Some(Owner::Submission));

        drop(guard);
        let (ok, owner_after) = hudless.join().unwrap();
        assert!(ok);
        assert_ne!(owner_after, Some(Owner::Submission));
    });

    assert_eq!(r.sc.lock_owner(), None);
}
