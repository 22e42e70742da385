#![allow(dead_code)]

use std::sync::Arc;

use framegen_core::mock::{CallLog, FakeDevice, RecordingInterpolation, RecordingPacing};
use framegen_core::swapchain::{ModeDesc, SampleDesc};
use framegen_core::{FgConfig, FrameGenSwapchain, LegacySwapchainDesc, NativeHandle, PixelFormat, Session};

pub const WINDOW: NativeHandle = NativeHandle::from_raw(0x1000);
pub const FACTORY: NativeHandle = NativeHandle::from_raw(0x2000);
pub const QUEUE: NativeHandle = NativeHandle::from_raw(0x3000);
pub const DEVICE: NativeHandle = NativeHandle::from_raw(0xD000);

pub struct Rig {
    pub log: CallLog,
    pub session: Session,
    pub device: Arc<FakeDevice>,
    pub fg: Arc<RecordingInterpolation>,
    pub sc: FrameGenSwapchain,
}

pub fn rig() -> Rig {
    rig_with(FgConfig::default(), |fg| fg)
}

pub fn rig_with(
    cfg: FgConfig,
    tune: impl FnOnce(RecordingInterpolation) -> RecordingInterpolation,
) -> Rig {
    let log = CallLog::new();
    let session = Session::new(cfg);
    let device = Arc::new(FakeDevice::new(log.clone(), DEVICE));
    session.bind_device(device.clone());

    let fg = Arc::new(tune(RecordingInterpolation::new(log.clone())));
    let pacing = Arc::new(RecordingPacing::new(log.clone()));
    let sc = FrameGenSwapchain::new(session.clone(), fg.clone(), pacing);

    Rig {
        log,
        session,
        device,
        fg,
        sc,
    }
}

pub fn desc_1080p() -> LegacySwapchainDesc {
    LegacySwapchainDesc {
        buffer_desc: ModeDesc {
            width: 1920,
            height: 1080,
            format: PixelFormat::R8G8B8A8_UNORM,
            ..Default::default()
        },
        sample_desc: SampleDesc::default(),
        buffer_count: 2,
        buffer_usage: 0x20,
        output_window: WINDOW,
        windowed: true,
        swap_effect: 4,
        flags: 0,
    }
}
