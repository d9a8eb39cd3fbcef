use std::error::Error as StdError;

/// Receiver of per-operation outcome and duration.
pub trait TelemetryReporter: Send + Sync {
    fn report_operation(
        &self,
        kind: &str,
        name: &str,
        elapsed_ms: f64,
        error: Option<&(dyn StdError + 'static)>,
    );
}

/// Drops all reports.
pub struct NopReporter;

impl TelemetryReporter for NopReporter {
    fn report_operation(&self, _: &str, _: &str, _: f64, _: Option<&(dyn StdError + 'static)>) {}
}

/// Writes reports into the debug log.
pub struct LogReporter;

impl TelemetryReporter for LogReporter {
    fn report_operation(
        &self,
        kind: &str,
        name: &str,
        elapsed_ms: f64,
        error: Option<&(dyn StdError + 'static)>,
    ) {
        match error {
            None => log::debug!(target: "telemetry", "{kind} {name}: ok in {elapsed_ms:.3}ms"),
            Some(e) => {
                log::debug!(target: "telemetry", "{kind} {name}: failed in {elapsed_ms:.3}ms: {e}")
            }
        }
    }
}
