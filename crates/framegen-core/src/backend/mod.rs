//! Capability-set interfaces for the vendor backends.
//!
//! Each backend module is represented by one implementation of [`InterpolationBackend`] or
//! [`PacingBackend`]. When a module cannot be resolved the loader hands out the
//! `Unsupported*` variant, so call sites never check for absent entry points themselves.

mod interpolation;
mod pacing;
mod status;
mod unsupported;

pub use interpolation::{
    DebugFeature, InitFlags, InterpolationBackend, InterpolationCap, PresentOutcome,
    PresentStatus, SwapchainInitRequest, UiMode,
};
pub use pacing::{FrameReport, LatencyMarker, PacingBackend, PacingCap, SleepParams};
pub use status::{BackendError, BackendStatus, BackendWarning};
pub use unsupported::{UnsupportedInterpolation, UnsupportedPacing};

use crate::gpu::NativeHandle;
use std::fmt;

/// Handle of a live interpolation session inside the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterpolationHandle(pub NativeHandle);

/// Handle of a live latency-pacing session inside the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacingHandle(pub NativeHandle);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl BackendVersion {
    pub const ZERO: Self = Self {
        major: 0,
        minor: 0,
        patch: 0,
    };

    #[inline]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl fmt::Display for BackendVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Verbosity requested from a backend's own logging callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendLogLevel {
    Debug,
    Warning,
}

impl BackendLogLevel {
    /// Anything other than "debug" maps to warnings only.
    pub fn from_config(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("debug") {
            Self::Debug
        } else {
            Self::Warning
        }
    }
}
