use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Cancellation flag shared between the Ctrl+C handler and the tracker.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner()) = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for up to `timeout`. Returns true if woken by `trigger`.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            stopped = cvar
                .wait_timeout(stopped, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        *stopped
    }
}

/// Trigger `shutdown` on SIGINT/Ctrl+C. A second interrupt exits at once,
/// even if the current step is stuck on the network.
pub fn install_ctrlc_handler(shutdown: &Shutdown) -> Result<(), ctrlc::Error> {
    let handle = shutdown.clone();
    ctrlc::set_handler(move || {
        if handle.is_triggered() {
            warn!("Second interrupt, exiting immediately");
            std::process::exit(130);
        }
        info!("Received interrupt, stopping after the current step (Ctrl+C again to force)");
        handle.trigger();
    })
}
