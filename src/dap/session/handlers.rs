use crate::dap::protocol::ErrorMessage;
use crate::error::HandlerError;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Successful outcome of an inbound request handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Response body, `Value::Null` means a response without body.
    Body(Value),
    /// Expected, user facing failure (`success: false` with a structured error).
    Error(ErrorMessage),
}

impl Reply {
    pub fn empty() -> Self {
        Reply::Body(Value::Null)
    }
}

impl From<Value> for Reply {
    fn from(body: Value) -> Self {
        Reply::Body(body)
    }
}

pub type HandlerResult = Result<Reply, HandlerError>;
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;
pub type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

struct Entry {
    generation: u64,
    handler: Handler,
}

/// At most one handler per command, the last registration wins.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Entry>,
    generation: u64,
}

impl HandlerRegistry {
    /// Set (or replace) handler for a command. Return registration generation.
    pub fn insert(&mut self, command: &str, handler: Handler) -> u64 {
        self.generation += 1;
        self.handlers.insert(
            command.to_string(),
            Entry {
                generation: self.generation,
                handler,
            },
        );
        self.generation
    }

    pub fn remove(&mut self, command: &str) -> bool {
        self.handlers.remove(command).is_some()
    }

    /// Remove a handler only if it is still the registration `generation`.
    pub fn remove_registration(&mut self, command: &str, generation: u64) -> bool {
        match self.handlers.get(command) {
            Some(entry) if entry.generation == generation => self.remove(command),
            _ => false,
        }
    }

    pub fn get(&self, command: &str) -> Option<Handler> {
        self.handlers.get(command).map(|e| e.handler.clone())
    }
}
