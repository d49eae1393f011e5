use std::sync::mpsc;

use crate::protocol::command::DrawCommand;

/// Producer half of a batch channel. `Send`, so producers may live on other threads.
#[derive(Clone, Debug)]
pub struct BatchSender {
    tx: mpsc::Sender<Vec<DrawCommand>>,
}

impl BatchSender {
    /// Queue a batch. Returns `false` when the receiving session is gone.
    pub fn send(&self, batch: Vec<DrawCommand>) -> bool {
        self.tx.send(batch).is_ok()
    }
}

/// Consumer half of a batch channel, drained by [`Session::pump`](crate::Session::pump).
#[derive(Debug)]
pub struct BatchReceiver {
    rx: mpsc::Receiver<Vec<DrawCommand>>,
}

impl BatchReceiver {
    /// Next pending batch, without blocking.
    pub fn try_next(&self) -> Option<Vec<DrawCommand>> {
        self.rx.try_recv().ok()
    }

    /// Every pending batch, in send order.
    pub fn drain(&self) -> Vec<Vec<DrawCommand>> {
        self.rx.try_iter().collect()
    }
}

/// Ordered channel carrying whole command batches.
pub fn batch_channel() -> (BatchSender, BatchReceiver) {
    let (tx, rx) = mpsc::channel();
    (BatchSender { tx }, BatchReceiver { rx })
}
