use super::{fire_close, CloseCallback, CloseGuard, MessageCallback, Transport};
use crate::dap::lock;
use crate::dap::protocol::Message;
use crate::dap::tracer::{Direction, FileTracer};
use crate::error::Error;
use crate::weak_error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Largest accepted message payload. A peer announcing more is treated as broken.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

type BoxedReader = BufReader<Box<dyn AsyncRead + Unpin + Send>>;

/// `Content-Length` framed JSON transport over a byte stream (stdio or TCP).
pub struct StreamTransport {
    outbound: Mutex<Option<mpsc::UnboundedSender<(Message, bool)>>>,
    reader: Mutex<Option<BoxedReader>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    on_close: Arc<Mutex<Option<CloseCallback>>>,
    tracer: Option<FileTracer>,
    closed: AtomicBool,
}

impl StreamTransport {
    /// Create transport over a reader/writer pair. If `tracer` is set, all traffic
    /// except messages sent with `should_log = false` is written into it.
    /// Must be called inside a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, tracer: Option<FileTracer>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(writer, rx, tracer.clone()));

        let reader: Box<dyn AsyncRead + Unpin + Send> = Box::new(reader);
        Self {
            outbound: Mutex::new(Some(tx)),
            reader: Mutex::new(Some(BufReader::new(reader))),
            reader_task: Mutex::new(None),
            on_close: Arc::default(),
            tracer,
            closed: AtomicBool::new(false),
        }
    }

    pub fn tcp(stream: TcpStream, tracer: Option<FileTracer>) -> Result<Self, Error> {
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer, tracer))
    }

    pub fn stdio(tracer: Option<FileTracer>) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), tracer)
    }
}

impl Transport for StreamTransport {
    fn send(&self, message: Message, should_log: bool) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::TransportClosed);
        }
        let outbound = lock(&self.outbound);
        let outbound = outbound.as_ref().ok_or(Error::TransportClosed)?;
        outbound
            .send((message, should_log))
            .map_err(|_| Error::TransportClosed)
    }

    fn on_message(&self, callback: MessageCallback) {
        let Some(mut reader) = lock(&self.reader).take() else {
            log::warn!(target: "dap", "message callback already set");
            return;
        };
        let tracer = self.tracer.clone();
        let close_guard = CloseGuard(self.on_close.clone());

        let task = tokio::spawn(async move {
            let _close_guard = close_guard;
            loop {
                let payload = match read_frame(&mut reader).await {
                    Ok(payload) => payload,
                    Err(Error::TransportClosed) => break,
                    Err(e) => {
                        log::warn!(target: "dap", "read DAP message: {e:#}");
                        break;
                    }
                };
                let received_at = Instant::now();
                if let Some(tracer) = &tracer {
                    tracer.traffic(Direction::Inbound, &payload);
                }
                if let Some(msg) = weak_error!(
                    serde_json::from_slice::<Message>(&payload),
                    "skip malformed DAP message:"
                ) {
                    callback(msg, received_at);
                }
            }
        });
        *lock(&self.reader_task) = Some(task);
    }

    fn on_close(&self, callback: CloseCallback) {
        *lock(&self.on_close) = Some(callback);
    }

    /// Stop reading, messages already queued for the peer are still written.
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        lock(&self.outbound).take();
        if let Some(task) = lock(&self.reader_task).take() {
            task.abort();
        }
        fire_close(&self.on_close);
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<(Message, bool)>,
    tracer: Option<FileTracer>,
) {
    while let Some((message, should_log)) = rx.recv().await {
        let payload = match serde_json::to_vec(&message) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!(target: "dap", "serialize DAP message: {e:#}");
                continue;
            }
        };
        if should_log {
            if let Some(tracer) = &tracer {
                tracer.traffic(Direction::Outbound, &payload);
            }
        }
        if let Err(e) = write_frame(&mut writer, &payload).await {
            log::warn!(target: "dap", "write DAP message: {e:#}");
            return;
        }
    }
    _ = writer.shutdown().await;
}

/// Read a single DAP message payload (with Content-Length framing).
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, Error> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let read_n = reader.read_line(&mut line).await?;
        if read_n == 0 {
            return Err(Error::TransportClosed);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some(v) = line.strip_prefix("Content-Length:") {
            content_length = Some(v.trim().parse()?);
        }
    }

    let len = content_length.ok_or(Error::MissingContentLength)?;
    if len > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a single DAP message payload (with Content-Length framing).
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), Error> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
