use serde_json::Value;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use yadap::config::SessionConfig;
use yadap::dap::protocol::{Event, Message, Request, Response};
use yadap::dap::session::Connection;
use yadap::dap::telemetry::TelemetryReporter;
use yadap::dap::transport::{CloseCallback, MessageCallback, Transport};
use yadap::error::Error;

/// Transport that keeps every sent message and lets a test play the peer.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Message, bool)>>,
    callback: Mutex<Option<MessageCallback>>,
    on_close: Mutex<Option<CloseCallback>>,
    closed: Mutex<bool>,
}

impl RecordingTransport {
    /// Deliver a message to the connection as if it came from the peer.
    pub fn inject(&self, msg: Message) {
        let callback = self.callback.lock().unwrap();
        let callback = callback.as_ref().expect("connection is subscribed");
        callback(msg, Instant::now());
    }

    pub fn inject_request(&self, seq: i64, command: &str, arguments: Value) {
        self.inject(Message::Request(Request {
            seq,
            command: command.to_string(),
            arguments,
        }));
    }

    pub fn inject_event(&self, seq: i64, event: &str, body: Value) {
        self.inject(Message::Event(Event {
            seq,
            event: event.to_string(),
            body,
        }));
    }

    pub fn inject_response(&self, seq: i64, request_seq: i64, success: bool, body: Option<Value>) {
        let command = self
            .sent()
            .into_iter()
            .find_map(|m| match m {
                Message::Request(r) if r.seq == request_seq => Some(r.command),
                _ => None,
            })
            .unwrap_or_default();
        self.inject(Message::Response(Response {
            seq,
            request_seq,
            command,
            success,
            message: None,
            body,
        }));
    }

    /// Simulate the peer going away.
    pub fn disconnect(&self) {
        let callback = self.on_close.lock().unwrap().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn sent_with_flags(&self) -> Vec<(Message, bool)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    /// Wait for a response to the inbound request `request_seq`.
    pub async fn response_to(&self, request_seq: i64) -> Response {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let found = self.sent().into_iter().find_map(|m| match m {
                Message::Response(r) if r.request_seq == request_seq => Some(r),
                _ => None,
            });
            if let Some(rsp) = found {
                return rsp;
            }
            assert!(Instant::now() < deadline, "no response to {request_seq}");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: Message, should_log: bool) -> Result<(), Error> {
        if *self.closed.lock().unwrap() {
            return Err(Error::TransportClosed);
        }
        self.sent.lock().unwrap().push((message, should_log));
        Ok(())
    }

    fn on_message(&self, callback: MessageCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn on_close(&self, callback: CloseCallback) {
        *self.on_close.lock().unwrap() = Some(callback);
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
        self.disconnect();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: String,
    pub name: String,
    pub elapsed_ms: f64,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct RecordingTelemetry {
    operations: Mutex<Vec<Operation>>,
}

impl RecordingTelemetry {
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.lock().unwrap().clone()
    }

    pub async fn wait_operations(&self, count: usize) -> Vec<Operation> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let ops = self.operations();
            if ops.len() >= count {
                return ops;
            }
            assert!(Instant::now() < deadline, "expected {count} operations, got {ops:?}");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl TelemetryReporter for RecordingTelemetry {
    fn report_operation(
        &self,
        kind: &str,
        name: &str,
        elapsed_ms: f64,
        error: Option<&(dyn StdError + 'static)>,
    ) {
        self.operations.lock().unwrap().push(Operation {
            kind: kind.to_string(),
            name: name.to_string(),
            elapsed_ms,
            error: error.map(|e| e.to_string()),
        });
    }
}

pub struct Fixture {
    pub conn: Connection,
    pub transport: Arc<RecordingTransport>,
    pub telemetry: Arc<RecordingTelemetry>,
}

pub fn fixture() -> Fixture {
    fixture_with_config(SessionConfig::default())
}

pub fn fixture_with_config(config: SessionConfig) -> Fixture {
    let transport = Arc::new(RecordingTransport::default());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let conn = Connection::new(transport.clone(), telemetry.clone(), config);
    Fixture {
        conn,
        transport,
        telemetry,
    }
}
