use crate::dap::api::DapApi;
use crate::dap::types::OutputEventBody;
use log::LevelFilter;
use std::fmt::Write as _;

/// Forwards log records to the client as `output` events.
///
/// Events are sent unlogged, otherwise every forwarded record would produce
/// a trace record about itself.
pub struct DapLogger {
    inner: env_logger::Logger,
    api: DapApi,
}

impl DapLogger {
    pub fn new(api: DapApi) -> Self {
        Self {
            inner: env_logger::Logger::from_default_env(),
            api,
        }
    }

    pub fn filter(&self) -> LevelFilter {
        self.inner.filter()
    }
}

impl log::Log for DapLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.matches(record) {
            return;
        }

        let mut output = String::new();
        _ = write!(output, "[{}] ", record.level());
        if let Some(module) = record.module_path() {
            _ = write!(output, "{module} ");
        }
        _ = writeln!(output, "{}", record.args());

        let body = OutputEventBody {
            category: Some("console".to_string()),
            output,
        };
        if let Ok(body) = serde_json::to_value(body) {
            // nowhere to report a failure, the logger itself is the sink
            _ = self.api.event_unlogged("output", body);
        }
    }

    fn flush(&self) {}
}
