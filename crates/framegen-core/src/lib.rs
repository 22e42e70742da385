pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod lock;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pacing;
pub mod session;
pub mod swapchain;
pub mod sync;
pub mod tagging;

pub use backend::{
    BackendError, BackendStatus, BackendVersion, BackendWarning, InterpolationBackend,
    PacingBackend, PresentStatus, UiMode,
};
pub use config::{ConfigLoader, ConfigPaths, FgConfig};
pub use controller::{FrameGenSwapchain, LifecycleState, OverlayHook};
pub use error::{FgError, FgResult};
pub use frame::{FrameInput, FrameParams, BUFFER_COUNT};
pub use gpu::{GpuDevice, GpuResource, NativeHandle, PixelFormat};
pub use lock::{Owner, OwnerLock};
pub use pacing::PacingAdapter;
pub use session::Session;
pub use swapchain::{LegacySwapchainDesc, SwapchainDesc1, SwapchainProxy};
pub use sync::{HookSuppression, ShutdownToken};
pub use tagging::Validity;
