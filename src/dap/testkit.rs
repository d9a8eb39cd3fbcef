//! Scripting view of a connection for tests: event listeners and
//! one-shot event futures.

use crate::dap::lock;
use crate::dap::session::listeners::{Listener, ListenerId};
use crate::dap::session::{Connection, Inner, ResponseFuture};
use crate::error::Error;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

#[derive(Clone)]
pub struct TestApi {
    conn: Connection,
}

impl TestApi {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Call `f` with the body of every inbound `event`.
    pub fn on<F>(&self, event: &str, f: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_listener(event, Arc::new(f))
    }

    /// Add a shared listener, adding the same listener again for the same
    /// event returns the existing registration.
    pub fn on_listener(&self, event: &str, listener: Listener) -> ListenerId {
        lock(&self.conn.inner.listeners).add(event, listener)
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        lock(&self.conn.inner.listeners).remove(event, id)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        lock(&self.conn.inner.listeners).count(event)
    }

    /// Wait for the next `event`.
    pub fn once(&self, event: &str) -> Once {
        self.once_matching(event, |_| true)
    }

    /// Wait for the next `event` whose body satisfies `predicate`.
    /// Events rejected by the predicate are skipped.
    pub fn once_matching<P>(&self, event: &str, predicate: P) -> Once
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let weak = self.conn.weak();

        let mut listeners = lock(&self.conn.inner.listeners);
        let id = listeners.reserve_id();
        let event_name = event.to_string();
        let listener: Listener = Arc::new(move |body: &Value| {
            if !predicate(body) {
                return;
            }
            let Some(tx) = lock(&tx).take() else {
                return;
            };
            _ = tx.send(body.clone());
            if let Some(inner) = weak.upgrade() {
                lock(&inner.listeners).remove(&event_name, id);
            }
        });
        // closed flag is raised before listeners are dropped, under the registry lock
        // a dropped listener resolves the future with an error at once
        if !self.conn.is_closed() {
            listeners.add_with_id(event, id, listener);
        }

        Once {
            rx,
            conn: self.conn.weak(),
            event: event.to_string(),
            id,
        }
    }

    /// Send request to the peer, same as [`crate::dap::api::DapApi::request`].
    pub fn request(&self, command: &str, arguments: Value) -> ResponseFuture {
        self.conn.send_request(command, arguments)
    }
}

/// Body of the first matching event. Resolves with [`Error::ConnectionClosed`]
/// if the connection stops first. Dropping the future removes its listener.
#[must_use = "listener is removed when the future is dropped"]
pub struct Once {
    rx: oneshot::Receiver<Value>,
    conn: Weak<Inner>,
    event: String,
    id: ListenerId,
}

impl Future for Once {
    type Output = Result<Value, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| Error::ConnectionClosed))
    }
}

impl Drop for Once {
    fn drop(&mut self) {
        if let Some(inner) = self.conn.upgrade() {
            lock(&inner.listeners).remove(&self.event, self.id);
        }
    }
}
