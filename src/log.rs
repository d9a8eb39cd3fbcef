use log::{LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Process wide logger that can be replaced at runtime, for example by a
/// logger that forwards records to the connected client.
pub static LOGGER_SWITCHER: LoggerSwitcher = LoggerSwitcher::new();

pub struct LoggerSwitcher {
    logger: RwLock<Option<Box<dyn Log>>>,
    installed: AtomicBool,
}

impl LoggerSwitcher {
    const fn new() -> Self {
        Self {
            logger: RwLock::new(None),
            installed: AtomicBool::new(false),
        }
    }

    /// Replace current logger, the first call installs the switcher as the
    /// global `log` logger.
    pub fn switch<L: Log + 'static>(&'static self, logger: L, filter: LevelFilter) {
        let prev = self
            .logger
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Box::new(logger));
        if let Some(prev) = prev {
            prev.flush();
        }

        if !self.installed.swap(true, Ordering::SeqCst) && log::set_logger(self).is_err() {
            eprintln!("logger already installed, switching has no effect");
        }
        log::set_max_level(filter);
    }
}

impl Log for LoggerSwitcher {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let logger = self.logger.read().unwrap_or_else(PoisonError::into_inner);
        logger.as_ref().is_some_and(|l| l.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        let logger = self.logger.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(logger) = logger.as_ref() {
            logger.log(record);
        }
    }

    fn flush(&self) {
        let logger = self.logger.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(logger) = logger.as_ref() {
            logger.flush();
        }
    }
}
