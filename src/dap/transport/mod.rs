//! DAP transport abstraction layer.
//!
//! Session engine never touches bytes, it exchanges decoded [`Message`]s with a
//! transport. In-memory duplex ([`mem::MemTransport`]) and `Content-Length`
//! framed streams ([`stream::StreamTransport`], stdio or TCP) are supported.

pub mod mem;
pub mod stream;

use crate::dap::lock;
use crate::dap::protocol::Message;
use crate::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub type MessageCallback = Box<dyn Fn(Message, Instant) + Send + Sync>;
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// Trait for DAP message transport.
///
/// Implementations must deliver inbound messages in the order they were received
/// and must not call the message callback from inside [`Transport::send`].
///
/// [`Transport::send`] is called while the connection holds its send lock and
/// must not log: a logger forwarding records to the client sends through the
/// same connection and would deadlock.
pub trait Transport: Send + Sync {
    /// Queue a message for the peer. `should_log` is false for messages that must
    /// not appear in traffic logs (log output forwarded to the client, for example).
    fn send(&self, message: Message, should_log: bool) -> Result<(), Error>;

    /// Set the receiver of inbound messages together with a monotonic receive time.
    /// Messages received before a callback is set are kept until then.
    fn on_message(&self, callback: MessageCallback);

    /// Set a callback that is called once when the transport stops delivering messages.
    fn on_close(&self, _callback: CloseCallback) {}

    fn close(&self);
}

/// Fires the close callback when the delivery task ends, whether it returns,
/// is aborted or unwinds.
pub(crate) struct CloseGuard(pub(crate) Arc<Mutex<Option<CloseCallback>>>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        fire_close(&self.0);
    }
}

pub(crate) fn fire_close(on_close: &Mutex<Option<CloseCallback>>) {
    let callback = lock(on_close).take();
    if let Some(callback) = callback {
        callback();
    }
}
