use crate::dap::protocol::Response;
use crate::error::{soft_assert, Error};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::oneshot;

pub type Completion = oneshot::Sender<Result<Value, Error>>;

/// Requests sent to the peer that still wait for a response.
#[derive(Debug, Default)]
pub struct PendingRequests {
    waiters: HashMap<i64, Completion>,
    closed: bool,
}

impl PendingRequests {
    /// Add a waiter for request `seq`. Fails with [`Error::ConnectionClosed`]
    /// once the table is closed.
    pub fn register(&mut self, seq: i64, completion: Completion) -> Result<(), Error> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        if self.waiters.contains_key(&seq) {
            return Err(Error::DuplicateSequence(seq));
        }
        self.waiters.insert(seq, completion);
        Ok(())
    }

    /// Remove the waiter of a request, it is completed by [`resolve`] outside the table lock.
    pub fn take(&mut self, request_seq: i64) -> Option<Completion> {
        self.waiters.remove(&request_seq)
    }

    /// Refuse new waiters, already registered ones are kept.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Reject all waiters with [`Error::ConnectionClosed`].
    pub fn fail_all(&mut self) -> usize {
        let count = self.waiters.len();
        for (_, waiter) in self.waiters.drain() {
            _ = waiter.send(Err(Error::ConnectionClosed));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

/// Complete a waiter taken for `rsp`. Return `false` if there was no waiter,
/// a stray or duplicate response is reported and otherwise ignored.
pub fn resolve(waiter: Option<Completion>, rsp: &Response) -> bool {
    let Some(waiter) = waiter else {
        soft_assert(false, || {
            format!(
                "Expected callback for request sequence ID {}",
                rsp.request_seq
            )
        });
        return false;
    };

    let result = if rsp.success {
        Ok(rsp.body.clone().unwrap_or(Value::Null))
    } else {
        Err(Error::RequestFailed(rsp.failure_text()))
    };
    // the caller may have lost interest in the result
    _ = waiter.send(result);
    true
}
