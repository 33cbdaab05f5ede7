use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

/// Handle to a worker running on its own thread.
pub struct WorkerHandle {
    shutdown: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn new(shutdown: Arc<AtomicBool>, thread: JoinHandle<()>) -> Self {
        Self { shutdown, thread }
    }

    /// Asks the worker to stop after its current job.
    pub fn shutdown(&self) {
        info!("Shutting down worker...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Blocks until the worker thread exits.
    pub fn wait(self) {
        if let Err(e) = self.thread.join() {
            error!("Worker panicked: {:?}", e);
        }
    }
}
