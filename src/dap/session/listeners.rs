use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identity of a listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event name to listeners mapping, delivery is fan-out.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    last_id: u64,
}

impl ListenerRegistry {
    /// Reserve an id for a listener that will be added later via [`Self::add_with_id`].
    pub fn reserve_id(&mut self) -> ListenerId {
        self.last_id += 1;
        ListenerId(self.last_id)
    }

    /// Add listener for an event. Adding the same listener twice return the
    /// existing registration.
    pub fn add(&mut self, event: &str, listener: Listener) -> ListenerId {
        if let Some(id) = self.find(event, &listener) {
            return id;
        }
        let id = self.reserve_id();
        self.add_with_id(event, id, listener);
        id
    }

    pub fn add_with_id(&mut self, event: &str, id: ListenerId, listener: Listener) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
    }

    pub fn remove(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Copy of current listeners of an event, callers invoke them without
    /// holding the registry.
    pub fn snapshot(&self, event: &str) -> Vec<Listener> {
        self.listeners
            .get(event)
            .map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, event: &str) -> usize {
        self.listeners.get(event).map(Vec::len).unwrap_or(0)
    }

    fn find(&self, event: &str, listener: &Listener) -> Option<ListenerId> {
        self.listeners
            .get(event)?
            .iter()
            .find(|(_, l)| Arc::ptr_eq(l, listener))
            .map(|(id, _)| *id)
    }
}
