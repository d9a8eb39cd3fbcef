//! Capability facade of a connection: outgoing requests and events,
//! inbound request handlers.

use crate::dap::lock;
use crate::dap::session::handlers::{handler, Handler, Reply};
use crate::dap::session::{Connection, Inner, ResponseFuture};
use crate::dap::types::{Command, Notification};
use crate::error::{Error, HandlerError};
use serde_json::Value;
use std::future::Future;
use std::sync::Weak;

#[derive(Clone)]
pub struct DapApi {
    conn: Connection,
}

impl DapApi {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Send request to the peer. Request is sent at once, returned future
    /// resolves with the response body or [`Error::RequestFailed`].
    pub fn request(&self, command: &str, arguments: Value) -> ResponseFuture {
        self.conn.send_request(command, arguments)
    }

    /// Send event to the peer.
    pub fn event(&self, event: &str, body: Value) -> Result<(), Error> {
        self.conn.send_event(event, body, true)
    }

    /// Send event to the peer without tracing it in logs.
    /// Used by loggers that forward log records as events.
    pub fn event_unlogged(&self, event: &str, body: Value) -> Result<(), Error> {
        self.conn.send_event(event, body, false)
    }

    /// Set handler for inbound requests with `command`, replacing a previous one.
    ///
    /// # Arguments
    ///
    /// * `command`: request command name
    /// * `f`: async function from request arguments to a [`Reply`]
    pub fn on<F, Fut>(&self, command: &str, f: F) -> Unregister
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        self.on_handler(command, handler(f))
    }

    pub fn on_handler(&self, command: &str, handler: Handler) -> Unregister {
        let generation = lock(&self.conn.inner.handlers).insert(command, handler);
        Unregister {
            conn: self.conn.weak(),
            command: command.to_string(),
            generation,
        }
    }

    /// Remove handler for `command`. Return `false` if there is no handler.
    pub fn off(&self, command: &str) -> bool {
        lock(&self.conn.inner.handlers).remove(command)
    }

    /// Typed version of [`DapApi::request`].
    pub async fn request_typed<C: Command>(
        &self,
        arguments: C::Arguments,
    ) -> Result<C::Response, Error> {
        let arguments = serde_json::to_value(arguments)?;
        let body = self.request(C::COMMAND, arguments).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Typed version of [`DapApi::event`].
    pub fn emit<N: Notification>(&self, body: N::Body) -> Result<(), Error> {
        self.event(N::EVENT, serde_json::to_value(body)?)
    }

    /// Typed version of [`DapApi::on`]. Arguments that don't match
    /// `C::Arguments` fail the request as an internal fault.
    pub fn on_typed<C, F, Fut>(&self, f: F) -> Unregister
    where
        C: Command + 'static,
        F: Fn(C::Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C::Response, HandlerError>> + Send + 'static,
    {
        self.on(C::COMMAND, move |arguments| {
            let call = serde_json::from_value::<C::Arguments>(arguments).map(&f);
            typed_reply::<C, _>(call)
        })
    }
}

async fn typed_reply<C, Fut>(call: Result<Fut, serde_json::Error>) -> Result<Reply, HandlerError>
where
    C: Command,
    Fut: Future<Output = Result<C::Response, HandlerError>>,
{
    let response = call?.await?;
    Ok(Reply::Body(serde_json::to_value(response)?))
}

/// Token of a handler registration.
///
/// Removes the handler only while it is still the registered one, a later
/// [`DapApi::on`] for the same command is not affected by a stale token.
pub struct Unregister {
    conn: Weak<Inner>,
    command: String,
    generation: u64,
}

impl Unregister {
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Return `true` if the handler was removed.
    pub fn unregister(self) -> bool {
        let Some(inner) = self.conn.upgrade() else {
            return false;
        };
        let removed = lock(&inner.handlers).remove_registration(&self.command, self.generation);
        removed
    }
}
