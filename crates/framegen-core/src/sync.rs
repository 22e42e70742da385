use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Cooperative shutdown token.
///
/// The host sets it when the process starts tearing down, so the engine stops calling
/// into backend modules that may already be unloading.
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    #[inline]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn request(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Suppresses the host's own API interception while backend modules are loading.
///
/// Nested suppression is counted; interception resumes when the last guard drops.
#[derive(Clone, Debug, Default)]
pub struct HookSuppression {
    depth: Arc<AtomicUsize>,
}

impl HookSuppression {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn suppress(&self) -> HookSuppressionGuard {
        self.depth.fetch_add(1, Ordering::AcqRel);
        HookSuppressionGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    /// Interception layers consult this before handling a hooked call.
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }
}

#[must_use = "suppression ends when the guard is dropped"]
#[derive(Debug)]
pub struct HookSuppressionGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for HookSuppressionGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}
