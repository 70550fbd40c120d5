//! Holding a call mid-flight to force interleavings.

use tokio::sync::oneshot;

/// Test-side handle for one held call.
///
/// The call suspends when it starts; [`HeldCall::entered`] resolves once it
/// has, and [`HeldCall::release`] lets it finish.
pub struct HeldCall {
    entered: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

/// Call-side half, consumed by the nullable when the held call starts.
pub struct Gate {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

impl HeldCall {
    pub fn new() -> (Self, Gate) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        (
            Self {
                entered: entered_rx,
                release: release_tx,
            },
            Gate {
                entered: entered_tx,
                release: release_rx,
            },
        )
    }

    /// Wait until the held call has started.
    pub async fn entered(&mut self) {
        let _ = (&mut self.entered).await;
    }

    /// Let the held call complete.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

impl Gate {
    /// Signal arrival, then wait for release. A dropped [`HeldCall`] releases.
    pub async fn pass(self) {
        let _ = self.entered.send(());
        let _ = self.release.await;
    }
}
