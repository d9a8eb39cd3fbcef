//! DAP connection: sequence numbers, request correlation and inbound dispatch.

pub mod handlers;
pub mod listeners;
pub mod pending;
pub mod seq;

use crate::config::SessionConfig;
use crate::dap::api::DapApi;
use crate::dap::lock;
use crate::dap::protocol::{ErrorMessage, Event, Message, Request, Response};
use crate::dap::telemetry::TelemetryReporter;
use crate::dap::testkit::TestApi;
use crate::dap::transport::Transport;
use crate::error::{Error, HandlerError};
use crate::weak_error;
use handlers::{Handler, HandlerRegistry, Reply};
use listeners::ListenerRegistry;
use pending::PendingRequests;
use seq::SequenceAllocator;
use serde_json::{json, Value};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::{oneshot, watch};

pub(crate) struct Inner {
    transport: Arc<dyn Transport>,
    telemetry: Arc<dyn TelemetryReporter>,
    config: SessionConfig,
    /// Guards allocation of a sequence number together with the hand off to
    /// the transport, so the wire order is the numeric order.
    outbound: Mutex<SequenceAllocator>,
    pub(crate) pending: Mutex<PendingRequests>,
    pub(crate) handlers: Mutex<HandlerRegistry>,
    pub(crate) listeners: Mutex<ListenerRegistry>,
    closed: AtomicBool,
    closed_tx: watch::Sender<bool>,
}

/// Single DAP connection over an injected transport.
///
/// Cloning is cheap, all clones share the same state.
#[derive(Clone)]
pub struct Connection {
    pub(crate) inner: Arc<Inner>,
}

impl Connection {
    /// Create connection and subscribe it to inbound transport messages.
    /// Must be called inside a tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        telemetry: Arc<dyn TelemetryReporter>,
        config: SessionConfig,
    ) -> Self {
        let (closed_tx, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            transport: transport.clone(),
            telemetry,
            config,
            outbound: Mutex::new(SequenceAllocator::default()),
            pending: Mutex::default(),
            handlers: Mutex::default(),
            listeners: Mutex::default(),
            closed: AtomicBool::new(false),
            closed_tx,
        });

        let weak = Arc::downgrade(&inner);
        transport.on_close(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_closed();
            }
        }));
        let weak = Arc::downgrade(&inner);
        transport.on_message(Box::new(move |msg, received_at| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(msg, received_at);
            }
        }));

        Self { inner }
    }

    /// Capability facade of this connection.
    pub fn dap(&self) -> DapApi {
        DapApi::new(self.clone())
    }

    /// Scripting facade of this connection, used by tests.
    pub fn test_api(&self) -> TestApi {
        TestApi::new(self.clone())
    }

    /// Close the transport. Outstanding requests are rejected with
    /// [`Error::ConnectionClosed`] unless disabled in the config.
    pub fn stop(&self) {
        self.inner.transport.close();
        self.inner.handle_closed();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Wait until the connection is stopped or the transport is closed.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed_tx.subscribe();
        _ = rx.wait_for(|closed| *closed).await;
    }

    /// Number of sent requests without a response.
    pub fn pending_requests(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    pub(crate) fn weak(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn send_request(&self, command: &str, arguments: Value) -> ResponseFuture {
        self.inner.send_request(command, arguments)
    }

    pub(crate) fn send_event(
        &self,
        event: &str,
        body: Value,
        should_log: bool,
    ) -> Result<(), Error> {
        self.inner
            .send(
                Message::Event(Event {
                    seq: 0,
                    event: event.to_string(),
                    body,
                }),
                should_log,
            )
            .map(|_| ())
    }
}

impl Inner {
    /// Assign next sequence number and pass message to transport.
    ///
    /// Nothing is logged while the sequence lock is held: a logger that forwards
    /// records to the client sends through this connection too.
    fn send(&self, mut message: Message, should_log: bool) -> Result<i64, Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }

        let (seq, trace) = {
            let mut seq_alloc = lock(&self.outbound);
            let seq = seq_alloc.next();
            message.set_seq(seq);
            let trace = should_log.then(|| format!("{message:?}"));
            self.transport.send(message, should_log)?;
            (seq, trace)
        };
        if let Some(trace) = trace {
            log::trace!(target: "dap", "-> {trace}");
        }
        Ok(seq)
    }

    fn send_request(&self, command: &str, arguments: Value) -> ResponseFuture {
        if self.closed.load(Ordering::Acquire) {
            return ResponseFuture::failed(Error::ConnectionClosed);
        }

        let (tx, rx) = oneshot::channel();
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };

        let sent = {
            let mut seq_alloc = lock(&self.outbound);
            let seq = seq_alloc.next();
            let request = Message::Request(Request {
                seq,
                command: command.to_string(),
                arguments,
            });
            let trace = format!("{request:?}");

            // waiter must exist before the peer is able to answer
            let registered = lock(&self.pending).register(seq, tx);
            registered.and_then(|_| {
                let sent = self.transport.send(request, true);
                if sent.is_err() {
                    lock(&self.pending).take(seq);
                }
                sent.map(|_| trace)
            })
        };

        match sent {
            Ok(trace) => {
                log::trace!(target: "dap", "-> {trace}");
                ResponseFuture::waiting(rx)
            }
            Err(e) => ResponseFuture::failed(e),
        }
    }

    fn handle_closed(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let failed = {
            let mut pending = lock(&self.pending);
            // requests racing with close are refused by the table itself
            pending.close();
            if self.config.fail_pending_on_close {
                pending.fail_all()
            } else {
                0
            }
        };
        if failed > 0 {
            log::debug!(target: "dap", "{failed} pending request(s) rejected, connection closed");
        }
        // no events arrive after close, pending `Once` futures observe a dropped sender;
        // listeners are dropped outside the registry lock
        let listeners = std::mem::take(&mut *lock(&self.listeners));
        drop(listeners);
        self.closed_tx.send_replace(true);
    }

    fn dispatch(self: Arc<Self>, msg: Message, received_at: Instant) {
        log::trace!(target: "dap", "<- {msg:?}");
        match msg {
            Message::Request(req) => self.dispatch_request(req, received_at),
            Message::Response(rsp) => {
                let waiter = lock(&self.pending).take(rsp.request_seq);
                pending::resolve(waiter, &rsp);
            }
            Message::Event(event) => {
                let listeners = lock(&self.listeners).snapshot(&event.event);
                for listener in listeners {
                    // a panicking listener must not stop delivery of later messages
                    let call = panic::catch_unwind(AssertUnwindSafe(|| listener(&event.body)));
                    if call.is_err() {
                        log::error!(target: "dap", "listener of {} event panicked", event.event);
                    }
                }
            }
        }
    }

    fn dispatch_request(self: Arc<Self>, req: Request, received_at: Instant) {
        let handler = lock(&self.handlers).get(&req.command);
        let Some(handler) = handler else {
            self.handle_unknown(req, received_at);
            return;
        };

        tokio::spawn(async move {
            let outcome = run_handler(handler, req.arguments.clone()).await;
            self.respond(&req, outcome, received_at);
        });
    }

    fn handle_unknown(&self, req: Request, received_at: Instant) {
        log::error!(target: "dap", "Unknown request: {}", req.command);
        if self.config.reply_to_unknown_commands {
            let rsp = Response {
                seq: 0,
                request_seq: req.seq,
                command: req.command.clone(),
                success: false,
                message: Some(format!("Unsupported DAP command: {}", req.command)),
                body: None,
            };
            weak_error!(self.send(Message::Response(rsp), true), "send response:");
        }
        self.report(&req.command, received_at, None);
    }

    fn respond(&self, req: &Request, outcome: Result<Reply, HandlerError>, received_at: Instant) {
        let mut rsp = Response {
            seq: 0,
            request_seq: req.seq,
            command: req.command.clone(),
            success: true,
            message: None,
            body: None,
        };

        let failure = match outcome {
            Ok(Reply::Body(body)) => {
                rsp.body = (!body.is_null()).then_some(body);
                None
            }
            Ok(Reply::Error(error)) => {
                rsp.success = false;
                rsp.message = Some(error.format.clone());
                rsp.body = Some(error_body(&error));
                None
            }
            Err(e) => {
                match &e {
                    HandlerError::Internal(err) => {
                        log::error!(target: "dap", "Error processing {}: {err:#}", req.command)
                    }
                    _ => log::warn!(target: "dap", "{} failed: {e}", req.command),
                }
                rsp.success = false;
                rsp.body = Some(error_body(&e.to_error_message(&req.command)));
                Some(e)
            }
        };

        weak_error!(self.send(Message::Response(rsp), true), "send response:");
        self.report(
            &req.command,
            received_at,
            failure.as_ref().map(|e| e as &(dyn std::error::Error + 'static)),
        );
    }

    fn report(
        &self,
        command: &str,
        received_at: Instant,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) {
        let elapsed_ms = received_at.elapsed().as_secs_f64() * 1000.0;
        self.telemetry
            .report_operation(&self.config.telemetry_kind, command, elapsed_ms, error);
    }
}

fn error_body(error: &ErrorMessage) -> Value {
    json!({ "error": error })
}

/// Run handler on its own task, so a panic becomes an internal fault
/// instead of tearing down the dispatcher.
async fn run_handler(handler: Handler, arguments: Value) -> Result<Reply, HandlerError> {
    match tokio::spawn(handler(arguments)).await {
        Ok(outcome) => outcome,
        Err(join_err) => Err(HandlerError::Internal(anyhow::anyhow!(
            "handler panicked: {join_err}"
        ))),
    }
}

/// Eventual result of a sent request: response body, or the failure text
/// of a failed response.
#[must_use = "response is lost if not awaited"]
pub struct ResponseFuture {
    rx: oneshot::Receiver<Result<Value, Error>>,
}

impl ResponseFuture {
    fn waiting(rx: oneshot::Receiver<Result<Value, Error>>) -> Self {
        Self { rx }
    }

    fn failed(err: Error) -> Self {
        let (tx, rx) = oneshot::channel();
        _ = tx.send(Err(err));
        Self { rx }
    }
}

impl Future for ResponseFuture {
    type Output = Result<Value, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(Error::ConnectionClosed)))
    }
}
