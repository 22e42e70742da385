use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::FgConfig;
use crate::gpu::GpuDevice;
use crate::sync::{HookSuppression, ShutdownToken};

struct SessionInner {
    shutdown: ShutdownToken,
    hooks: HookSuppression,
    config: RwLock<Arc<FgConfig>>,
    device: RwLock<Option<Arc<dyn GpuDevice>>>,
}

/// Process-scoped state shared by every frame-generation component.
///
/// Created once by the host at startup and passed to each component; cloning shares the
/// same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(config: FgConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                shutdown: ShutdownToken::new(),
                hooks: HookSuppression::new(),
                config: RwLock::new(Arc::new(config)),
                device: RwLock::new(None),
            }),
        }
    }

    #[inline]
    pub fn shutdown(&self) -> &ShutdownToken {
        &self.inner.shutdown
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_requested()
    }

    #[inline]
    pub fn hooks(&self) -> &HookSuppression {
        &self.inner.hooks
    }

    /// Read-only snapshot of the active configuration.
    #[inline]
    pub fn config(&self) -> Arc<FgConfig> {
        self.inner.config.read().clone()
    }

    pub fn publish_config(&self, config: FgConfig) {
        *self.inner.config.write() = Arc::new(config);
        log::debug!(target: "framegen", "session: configuration snapshot replaced");
    }

    /// Device used when a swapchain is created before an explicit context.
    pub fn bind_device(&self, device: Arc<dyn GpuDevice>) {
        log::debug!(target: "framegen", "session: device {:?} bound", device.native());
        *self.inner.device.write() = Some(device);
    }

    #[inline]
    pub fn device(&self) -> Option<Arc<dyn GpuDevice>> {
        self.inner.device.read().clone()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(FgConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_stable_across_publish() {
        let session = Session::default();
        let before = session.config();

        let mut next = FgConfig::default();
        next.swapchain.use_mutex = true;
        session.publish_config(next);

        assert!(!before.swapchain.use_mutex);
        assert!(session.config().swapchain.use_mutex);
    }

    #[test]
    fn clones_share_shutdown() {
        let a = Session::default();
        let b = a.clone();
        a.shutdown().request();
        assert!(b.is_shutting_down());
        assert!(b.device().is_none());
    }
}
