//! Host runtime coordination around long native sections
//!
//! A reader may be embedded in a host that holds a global lock while calling
//! in (an interpreter, a GUI event loop). The decode/resample loop does not
//! touch host objects, so the host is released for its duration and
//! reacquired on every exit path, including early error returns.

use std::sync::Arc;
use tracing::trace;

/// Hooks a host runtime provides to let other threads run while we decode.
pub trait HostRuntime: Send + Sync {
    /// Called before the native loop starts
    fn release(&self);

    /// Called once the native loop has finished (success or failure)
    fn reacquire(&self);
}

/// Default host: nothing to release
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl HostRuntime for Detached {
    fn release(&self) {}

    fn reacquire(&self) {}
}

/// RAII guard: releases the host on creation and reacquires it on drop.
pub struct NativeSection {
    host: Arc<dyn HostRuntime>,
}

impl NativeSection {
    pub fn enter(host: Arc<dyn HostRuntime>) -> Self {
        trace!("Entering native section");
        host.release();
        Self { host }
    }
}

impl Drop for NativeSection {
    fn drop(&mut self) {
        self.host.reacquire();
        trace!("Left native section");
    }
}
