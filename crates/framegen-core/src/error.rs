use std::path::PathBuf;

use thiserror::Error;

use crate::gpu::{GpuError, NativeHandle};
use crate::lock::LockError;

/// Crate-wide error.
///
/// Backend result codes never travel through this type on per-frame paths; those are
/// logged at the call site. Only lifecycle transitions surface an `FgError` to the host.
#[derive(Debug, Error)]
pub enum FgError {
    /// Backend module or its required entry points are unavailable.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Backend context creation returned a failure.
    #[error("context creation failed: {0}")]
    ContextCreation(String),

    /// Proxy swapchain creation failed; the host must present natively.
    #[error("swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Release requested for a window this controller is not bound to.
    #[error("window handle mismatch: bound={bound:?} requested={requested:?}")]
    HandleMismatch {
        bound: Option<NativeHandle>,
        requested: NativeHandle,
    },

    /// The controller reached its terminal state.
    #[error("frame generation session is destroyed")]
    Destroyed,

    #[error("gpu error: {0}")]
    Gpu(#[from] GpuError),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("config read failed: path={path:?} err={message}")]
    Config { path: PathBuf, message: String },

    #[error("{0}")]
    Other(String),
}

impl FgError {
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

pub type FgResult<T> = Result<T, FgError>;
