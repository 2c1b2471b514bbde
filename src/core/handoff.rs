//! Zero-buffer hand-off between a stream reader task and its single consumer.
//!
//! The sender parks until the consumer has taken the previous fragment, so a
//! slow consumer throttles network reads instead of letting them pile up.
//! Every wait on the producer side races the cancellation token; once the
//! token fires the source reports closure even if a delivery was pending.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFragment {
    pub is_final: bool,
    pub text: String,
}

impl ResponseFragment {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            is_final: false,
            text: text.into(),
        }
    }

    pub fn last(text: impl Into<String>) -> Self {
        Self {
            is_final: true,
            text: text.into(),
        }
    }
}

/// The consumer went away or the generation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("fragment hand-off closed")]
pub struct HandoffClosed;

struct Delivery {
    fragment: ResponseFragment,
    accepted: oneshot::Sender<()>,
}

pub struct FragmentSender {
    tx: mpsc::Sender<Delivery>,
    cancel: CancellationToken,
}

pub struct FragmentSource {
    rx: mpsc::Receiver<Delivery>,
    cancel: CancellationToken,
}

/// Create a connected sender/source pair bound to `cancel`.
pub fn handoff(cancel: CancellationToken) -> (FragmentSender, FragmentSource) {
    let (tx, rx) = mpsc::channel(1);
    (
        FragmentSender {
            tx,
            cancel: cancel.clone(),
        },
        FragmentSource { rx, cancel },
    )
}

impl FragmentSender {
    /// Deliver one fragment and wait until the consumer has accepted it.
    pub async fn deliver(&self, fragment: ResponseFragment) -> Result<(), HandoffClosed> {
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let delivery = Delivery {
            fragment,
            accepted: accepted_tx,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(HandoffClosed),
            sent = self.tx.send(delivery) => sent.map_err(|_| HandoffClosed)?,
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(HandoffClosed),
            accepted = accepted_rx => accepted.map_err(|_| HandoffClosed),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl FragmentSource {
    /// Wait for the next fragment. `None` means the source is closed, either
    /// because the producer finished or because the generation was cancelled.
    pub async fn recv(&mut self) -> Option<ResponseFragment> {
        if self.cancel.is_cancelled() {
            self.rx.close();
            return None;
        }

        let delivery = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.rx.close();
                return None;
            }
            delivery = self.rx.recv() => delivery?,
        };

        if self.cancel.is_cancelled() {
            self.rx.close();
            return None;
        }

        let _ = delivery.accepted.send(());
        Some(delivery.fragment)
    }

    /// Trigger the cancellation token this source was created with.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for FragmentSource {
    fn drop(&mut self) {
        // An abandoned source must never leave the reader parked on a send.
        self.cancel.cancel();
    }
}
