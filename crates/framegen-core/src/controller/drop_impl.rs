use super::{FrameGenSwapchain, LifecycleState};

impl Drop for FrameGenSwapchain {
    fn drop(&mut self) {
        log::debug!(target: "framegen", "dropping {} swapchain controller", self.interpolation.name());

        let mut st = self.state.lock();
        self.teardown(&mut st, true, true);
        st.phase = LifecycleState::Destroyed;
    }
}
