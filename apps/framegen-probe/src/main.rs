use std::sync::Arc;

use log::{error, info, warn};
use serde_json::json;

use framegen_core::backend::{InterpolationCap, PacingCap};
use framegen_core::mock::{
    BackendCall, CallLog, FakeDevice, FakeResource, RecordingInterpolation, RecordingOverlay,
    RecordingPacing,
};
use framegen_core::swapchain::{ModeDesc, SampleDesc};
use framegen_core::{
    ConfigLoader, ConfigPaths, FgConfig, FgError, FgResult, FrameGenSwapchain, FrameInput, GpuResource,
    InterpolationBackend, LegacySwapchainDesc, NativeHandle, PacingBackend, PixelFormat, Session,
};
use framegen_modules_logging::{ConsoleLogger, ConsoleLoggerConfig};

const WINDOW: NativeHandle = NativeHandle::from_raw(0x1000);
const FACTORY: NativeHandle = NativeHandle::from_raw(0x2000);
const QUEUE: NativeHandle = NativeHandle::from_raw(0x3000);
const DEVICE: NativeHandle = NativeHandle::from_raw(0xD000);

const FRAMES: u64 = 8;

fn main() -> FgResult<()> {
    let mut logger = ConsoleLogger::new(ConsoleLoggerConfig::default());
    logger.init()?;

    let paths = match std::env::args_os().nth(1) {
        Some(file) => ConfigPaths::new(file, None),
        None => ConfigPaths::new("framegen.json", std::env::current_dir().ok()),
    };
    let (cfg, report) = ConfigLoader::load_json(&paths)?;
    match &report.file {
        Some(file) => info!(target: "framegen", "config loaded from '{}'", file.display()),
        None => info!(target: "framegen", "config: defaults"),
    }
    for o in &report.overrides {
        info!(target: "framegen", "config: {} = {} ({:?})", o.key, o.value, o.source);
    }

    let session = Session::new(cfg.clone());
    let fg = framegen_backend_xess::load_interpolation_backend(&session);
    let ll = framegen_backend_xess::load_pacing_backend(&session);

    let dry_run = match drive_headless(cfg) {
        Ok(v) => v,
        Err(e) => {
            error!(target: "framegen", "headless run failed: {e}");
            json!({ "error": e.to_string() })
        }
    };

    let out = json!({
        "config_file": report.file.as_ref().map(|p| p.display().to_string()),
        "interpolation": describe_interpolation(fg.as_ref()),
        "pacing": describe_pacing(ll.as_ref()),
        "headless": dry_run,
    });
    println!("{}", serde_json::to_string_pretty(&out).map_err(|e| FgError::Other(e.to_string()))?);

    session.shutdown().request();
    Ok(())
}

fn describe_interpolation(fg: &dyn InterpolationBackend) -> serde_json::Value {
    let caps = [
        InterpolationCap::SetEnabled,
        InterpolationCap::TagFrameConstants,
        InterpolationCap::TagFrameResource,
        InterpolationCap::SetPresentId,
        InterpolationCap::LastPresentStatus,
        InterpolationCap::LatencyReduction,
        InterpolationCap::SceneChangeThreshold,
        InterpolationCap::DebugFeatures,
        InterpolationCap::Logging,
    ];
    let supported: Vec<String> = caps
        .into_iter()
        .filter(|c| fg.supports(*c))
        .map(|c| format!("{c:?}"))
        .collect();
    info!(target: "framegen", "{} {} initialized={}", fg.name(), fg.version(), fg.is_initialized());
    json!({
        "name": fg.name(),
        "version": fg.version().to_string(),
        "available": fg.is_initialized(),
        "capabilities": supported,
    })
}

fn describe_pacing(ll: &dyn PacingBackend) -> serde_json::Value {
    let caps = [
        PacingCap::SleepMode,
        PacingCap::Sleep,
        PacingCap::Markers,
        PacingCap::FrameReports,
        PacingCap::Logging,
    ];
    let supported: Vec<String> = caps
        .into_iter()
        .filter(|c| ll.supports(*c))
        .map(|c| format!("{c:?}"))
        .collect();
    info!(target: "framegen", "{} {} initialized={}", ll.name(), ll.version(), ll.is_initialized());
    json!({
        "name": ll.name(),
        "version": ll.version().to_string(),
        "available": ll.is_initialized(),
        "capabilities": supported,
    })
}

/// Runs the full lifecycle against recording backends and a fake device, so the
/// configuration can be checked without a GPU.
fn drive_headless(cfg: FgConfig) -> FgResult<serde_json::Value> {
    let log = CallLog::new();
    let use_mutex = cfg.swapchain.use_mutex;
    let session = Session::new(cfg);
    let device = Arc::new(FakeDevice::new(log.clone(), DEVICE));
    session.bind_device(device.clone());

    let fg = Arc::new(RecordingInterpolation::new(log.clone()));
    let pacing = Arc::new(RecordingPacing::new(log.clone()));
    let sc = FrameGenSwapchain::new(session.clone(), fg, pacing)
        .with_overlay(Arc::new(RecordingOverlay::new(log.clone())));

    sc.create_context(device, None)?;
    let host = sc.create_swapchain(FACTORY, QUEUE, &desc_1080p())?;
    info!(target: "framegen", "headless swapchain ready, format {:?}", host.buffer_format());

    let output = FakeResource::new(0xB000, 1920, 1080, PixelFormat::R8G8B8A8_UNORM);
    let mut dispatched = 0u32;
    for _ in 0..FRAMES {
        let id = sc.begin_frame();
        sc.stage_resource(
            FrameInput::MotionVectors,
            Some(FakeResource::new(0xA000 + id as usize, 1920, 1080, PixelFormat::R16G16_FLOAT).shared()),
        );
        sc.stage_resource(
            FrameInput::Depth,
            Some(FakeResource::new(0xA800 + id as usize, 1920, 1080, PixelFormat::D32_FLOAT).shared()),
        );
        if sc.dispatch(None, Some(&output as &dyn GpuResource), 16.6) {
            dispatched += 1;
        } else {
            warn!(target: "framegen", "frame {id} was not dispatched");
        }
        sc.mark_present_start();
        sc.mark_present_end();
    }
    let status = sc.last_present_status();

    drop(host);
    sc.release_swapchain(WINDOW)?;
    sc.stop_and_destroy_context(true, false, use_mutex);

    let calls = log.snapshot();
    let count = |pred: fn(&BackendCall) -> bool| calls.iter().filter(|c| pred(c)).count();
    Ok(json!({
        "frames": FRAMES,
        "dispatched": dispatched,
        "resource_tags": count(|c| matches!(c, BackendCall::TagResource { .. })),
        "present_ids": count(|c| matches!(c, BackendCall::SetPresentId(_))),
        "latency_markers": count(|c| matches!(c, BackendCall::Marker { .. })),
        "last_present": format!("{:?}", status.outcome),
        "final_state": format!("{:?}", sc.state()),
        "backend_calls": calls.len(),
    }))
}

fn desc_1080p() -> LegacySwapchainDesc {
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
