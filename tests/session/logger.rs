use crate::common::fixture;
use log::{Level, LevelFilter, Log, Record};
use serde_json::json;
use serial_test::serial;
use yadap::dap::logger::DapLogger;
use yadap::dap::protocol::Message;
use yadap::log::LOGGER_SWITCHER;

struct NopLogger;

impl Log for NopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        false
    }

    fn log(&self, _: &Record) {}

    fn flush(&self) {}
}

#[tokio::test]
async fn test_records_forwarded_as_unlogged_output() {
    let fx = fixture();
    let logger = DapLogger::new(fx.conn.dap());

    logger.log(
        &Record::builder()
            .level(Level::Error)
            .target("dap")
            .module_path(Some("yadap::debugger"))
            .args(format_args!("debuggee exited"))
            .build(),
    );

    let sent = fx.transport.sent_with_flags();
    assert_eq!(sent.len(), 1);
    let (msg, should_log) = &sent[0];
    assert!(!should_log);
    assert_eq!(
        serde_json::to_value(msg).unwrap(),
        json!({
            "seq": 1,
            "type": "event",
            "event": "output",
            "body": {"category": "console", "output": "[ERROR] yadap::debugger debuggee exited\n"},
        })
    );
}

#[tokio::test]
async fn test_stopped_connection_swallows_records() {
    let fx = fixture();
    let logger = DapLogger::new(fx.conn.dap());
    fx.conn.stop();

    logger.log(
        &Record::builder()
            .level(Level::Error)
            .args(format_args!("lost"))
            .build(),
    );
    assert!(fx.transport.sent().is_empty());
}

#[tokio::test]
#[serial]
async fn test_switch_to_dap_logger() {
    let fx = fixture();
    LOGGER_SWITCHER.switch(DapLogger::new(fx.conn.dap()), LevelFilter::Error);

    log::error!(target: "dap", "forwarded record");
    LOGGER_SWITCHER.switch(NopLogger, LevelFilter::Off);
    log::error!(target: "dap", "dropped record");

    let outputs: Vec<String> = fx
        .transport
        .sent()
        .into_iter()
        .filter_map(|m| match m {
            Message::Event(e) if e.event == "output" => e.body["output"].as_str().map(String::from),
            _ => None,
        })
        .collect();
    assert!(outputs.iter().any(|o| o.contains("forwarded record")));
    assert!(!outputs.iter().any(|o| o.contains("dropped record")));
}
