pub mod api;
pub mod logger;
pub mod protocol;
pub mod session;
pub mod telemetry;
pub mod testkit;
pub mod tracer;
pub mod transport;
pub mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, a panic in a user callback must not disable the connection.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
