//! Shutdown token and exit signal shared by a coalescer handle and its loop

use tokio::sync::watch;
use tracing::debug;

/// Handle side: requests shutdown and waits for the loop to exit
#[derive(Debug)]
pub(crate) struct ShutdownHandle {
    request: watch::Sender<bool>,
    exited: watch::Receiver<bool>,
}

/// Loop side: observes the request and reports exit when dropped
#[derive(Debug)]
pub(crate) struct ShutdownListener {
    request: watch::Receiver<bool>,
    exited: watch::Sender<bool>,
}

/// Create a connected handle/listener pair
pub(crate) fn shutdown_pair() -> (ShutdownHandle, ShutdownListener) {
    let (request_tx, request_rx) = watch::channel(false);
    let (exited_tx, exited_rx) = watch::channel(false);
    (
        ShutdownHandle {
            request: request_tx,
            exited: exited_rx,
        },
        ShutdownListener {
            request: request_rx,
            exited: exited_tx,
        },
    )
}

impl ShutdownHandle {
    /// Request shutdown and wait until the loop has exited
    ///
    /// Safe to call any number of times, from any number of callers; every
    /// call returns only after the loop is gone.
    pub(crate) async fn close(&self) {
        let first = !self.request.send_replace(true);
        debug!(first, "ShutdownHandle::close: called");
        let mut exited = self.exited.clone();
        // Err means the listener is gone, which is also an exit
        let _ = exited.wait_for(|done| *done).await;
        debug!("ShutdownHandle::close: loop exited");
    }

    /// Whether the loop has exited
    pub(crate) fn is_closed(&self) -> bool {
        *self.exited.borrow()
    }
}

impl ShutdownListener {
    /// Resolve once shutdown is requested or the handle is dropped
    pub(crate) async fn requested(&mut self) {
        let _ = self.request.wait_for(|requested| *requested).await;
    }
}

impl Drop for ShutdownListener {
    fn drop(&mut self) {
        self.exited.send_replace(true);
    }
}
