use super::{fire_close, CloseCallback, CloseGuard, MessageCallback, Transport};
use crate::dap::lock;
use crate::dap::protocol::Message;
use crate::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// In-process duplex transport, one side per connection.
pub struct MemTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
    on_close: Arc<Mutex<Option<CloseCallback>>>,
    delivery: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl MemTransport {
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (Self::new(tx_b, rx_a), Self::new(tx_a, rx_b))
    }

    fn new(tx: mpsc::UnboundedSender<Message>, rx: mpsc::UnboundedReceiver<Message>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            on_close: Arc::default(),
            delivery: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }
}

impl Transport for MemTransport {
    fn send(&self, message: Message, _should_log: bool) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::TransportClosed);
        }
        let tx = lock(&self.tx);
        let tx = tx.as_ref().ok_or(Error::TransportClosed)?;
        tx.send(message).map_err(|_| Error::TransportClosed)
    }

    /// Must be called inside a tokio runtime, delivery runs on a separate task.
    fn on_message(&self, callback: MessageCallback) {
        let Some(mut rx) = lock(&self.rx).take() else {
            log::warn!(target: "dap", "message callback already set");
            return;
        };
        let close_guard = CloseGuard(self.on_close.clone());
        let task = tokio::spawn(async move {
            let _close_guard = close_guard;
            while let Some(msg) = rx.recv().await {
                callback(msg, Instant::now());
            }
        });
        *lock(&self.delivery) = Some(task);
    }

    fn on_close(&self, callback: CloseCallback) {
        *lock(&self.on_close) = Some(callback);
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        lock(&self.tx).take();
        if let Some(task) = lock(&self.delivery).take() {
            task.abort();
        }
        fire_close(&self.on_close);
    }
}
