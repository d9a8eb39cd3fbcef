//! YADAP - Debug Adapter Protocol server of BugStalker.
//!
//! Accepts DAP clients over TCP one at a time, or serves a single client over
//! stdio. Each client gets its own connection, log records of the adapter are
//! forwarded to the client as `output` events.

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use yadap::config::SessionConfig;
use yadap::dap::logger::DapLogger;
use yadap::dap::session::Connection;
use yadap::dap::telemetry::LogReporter;
use yadap::dap::tracer::FileTracer;
use yadap::dap::transport::stream::StreamTransport;
use yadap::dap::types::{
    Capabilities, ConfigurationDone, Disconnect, DisconnectArguments, Empty, Initialize,
    InitializeArguments, Threads, ThreadsResponse,
};
use yadap::error::HandlerError;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1:4711")]
    listen: String,

    /// Exit after the first debug session ends (single-client mode).
    #[clap(long)]
    oneshot: bool,

    /// Optional log file for adapter diagnostics.
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Trace DAP traffic (requests/responses/events) into the log file.
    /// Requires --log-file.
    #[clap(long)]
    trace_dap: bool,

    /// Serve a single session over stdin/stdout instead of TCP.
    #[clap(long)]
    stdio: bool,

    /// Path to session config file (default: ~/.config/bs/yadap.toml)
    #[clap(long, env = "YADAP_CONFIG")]
    config: Option<PathBuf>,
}

fn use_env_logger() {
    let logger = env_logger::Logger::from_default_env();
    let filter = logger.filter();
    yadap::log::LOGGER_SWITCHER.switch(logger, filter);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use_env_logger();

    let args = Args::parse();
    let config = SessionConfig::load(args.config.as_deref());

    let tracer = match &args.log_file {
        Some(path) => Some(
            FileTracer::open(path)
                .with_context(|| format!("open log file {}", path.display()))?,
        ),
        None => None,
    };
    if args.trace_dap && tracer.is_none() {
        warn!(target: "dap", "--trace-dap requires --log-file; tracing disabled");
    }
    let traffic_tracer = tracer.clone().filter(|_| args.trace_dap);

    if args.stdio {
        let transport = StreamTransport::stdio(traffic_tracer);
        return serve(transport, config).await;
    }

    let addr: SocketAddr = args.listen.parse().context("Invalid listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(target: "dap", "yadap listening on {addr}");

    // one client == one debug session
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(err) => {
                warn!(target: "dap", "accept failed: {err:#}");
                continue;
            }
        };
        info!(target: "dap", "DAP client connected: {peer}");
        if let Some(t) = &tracer {
            t.note(&format!("client connected: {peer}"));
        }

        let res = run_session(stream, traffic_tracer.clone(), config.clone()).await;
        if let Err(err) = res {
            warn!(target: "dap", "session ended with error: {err:#}");
            if let Some(t) = &tracer {
                t.note(&format!("session error: {err:#}"));
            }
        } else if let Some(t) = &tracer {
            t.note("session finished OK");
        }

        if args.oneshot {
            break;
        }
    }
    Ok(())
}

async fn run_session(
    stream: TcpStream,
    tracer: Option<FileTracer>,
    config: SessionConfig,
) -> anyhow::Result<()> {
    let transport = StreamTransport::tcp(stream, tracer).context("init DAP I/O")?;
    serve(transport, config).await
}

/// Serve one client until the transport is closed.
async fn serve(transport: StreamTransport, config: SessionConfig) -> anyhow::Result<()> {
    let conn = Connection::new(Arc::new(transport), Arc::new(LogReporter), config);
    let dap = conn.dap();

    dap.on_typed::<Initialize, _, _>(initialize);
    dap.on_typed::<ConfigurationDone, _, _>(configuration_done);
    dap.on_typed::<Threads, _, _>(threads);
    dap.on_typed::<Disconnect, _, _>(disconnect);

    let logger = DapLogger::new(dap);
    let filter = logger.filter();
    yadap::log::LOGGER_SWITCHER.switch(logger, filter);

    conn.closed().await;

    use_env_logger();
    Ok(())
}

async fn initialize(args: InitializeArguments) -> Result<Capabilities, HandlerError> {
    info!(
        target: "dap",
        "initialize from {}",
        args.client_name.as_deref().unwrap_or(&args.adapter_id)
    );
    Ok(Capabilities {
        supports_configuration_done_request: Some(true),
        ..Default::default()
    })
}

async fn configuration_done(_: Empty) -> Result<(), HandlerError> {
    Ok(())
}

/// No debuggee is attached, so there are no threads to report.
async fn threads(_: Empty) -> Result<ThreadsResponse, HandlerError> {
    Ok(ThreadsResponse::default())
}

async fn disconnect(args: DisconnectArguments) -> Result<(), HandlerError> {
    info!(
        target: "dap",
        "disconnect requested (terminate debuggee: {})",
        args.terminate_debuggee.unwrap_or(false)
    );
    Ok(())
}
