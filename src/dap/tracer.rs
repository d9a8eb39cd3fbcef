use crate::dap::lock;
use crate::error::Error;
use crate::muted_error;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent to the peer.
    Outbound,
    /// Received from the peer.
    Inbound,
}

impl Direction {
    fn marker(self) -> &'static str {
        match self {
            Direction::Outbound => "->",
            Direction::Inbound => "<-",
        }
    }
}

/// Append-only diagnostics file shared by the adapter and its transports.
///
/// Traffic lines are `-> {json}` for outbound and `<- {json}` for inbound payloads.
#[derive(Clone)]
pub struct FileTracer {
    file: Arc<Mutex<File>>,
}

impl FileTracer {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Free form diagnostic line (session start, session errors).
    pub fn note(&self, text: &str) {
        self.write_line(format_args!("{text}"));
    }

    pub fn traffic(&self, direction: Direction, payload: &[u8]) {
        self.write_line(format_args!(
            "{} {}",
            direction.marker(),
            String::from_utf8_lossy(payload)
        ));
    }

    fn write_line(&self, line: std::fmt::Arguments<'_>) {
        let mut file = lock(&self.file);
        muted_error!(writeln!(file, "{line}"), "trace write failed:");
    }
}
