#![forbid(unsafe_op_in_unsafe_fn)]

pub mod ffi;
pub mod loader;

mod com;
mod xefg;
mod xell;

use std::sync::Arc;

use framegen_core::backend::{
    InterpolationBackend, PacingBackend, UnsupportedInterpolation, UnsupportedPacing,
};
use framegen_core::Session;

pub use com::ComSwapchain;
pub use loader::{LibraryLoadError, LibraryLocator, LibraryOrigin};
pub use xefg::{XefgBackend, XEFG_LIBRARY};
pub use xell::{XellBackend, XELL_LIBRARY};

/// Resolves XeSS-FG for this session, or a backend that refuses every call.
pub fn load_interpolation_backend(session: &Session) -> Arc<dyn InterpolationBackend> {
    let cfg = session.config();
    let locator = LibraryLocator::new(XEFG_LIBRARY, cfg.interpolation.library.as_deref());
    match XefgBackend::load(&locator, session.hooks()) {
        Ok(backend) => {
            let missing = backend.missing_entry_points();
            if !missing.is_empty() {
                log::warn!(target: "framegen::loader", "XeSS-FG is missing {} entry point(s): {}", missing.len(), missing.join(", "));
            }
            Arc::new(backend)
        }
        Err(e) => {
            log::warn!(target: "framegen::loader", "XeSS-FG unavailable, frame generation disabled: {e}");
            Arc::new(UnsupportedInterpolation::new("XeSS-FG"))
        }
    }
}

/// Resolves XeLL for this session, or a backend that refuses every call.
pub fn load_pacing_backend(session: &Session) -> Arc<dyn PacingBackend> {
    let cfg = session.config();
    let locator = LibraryLocator::new(XELL_LIBRARY, cfg.pacing.library.as_deref());
    match XellBackend::load(&locator, session.hooks()) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            log::warn!(target: "framegen::loader", "XeLL unavailable, latency reduction disabled: {e}");
            Arc::new(UnsupportedPacing::new("XeLL"))
        }
    }
}
