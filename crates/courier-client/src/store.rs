//! Observable stores.
//!
//! [`Observable`] holds a value plus an explicit observer registry. Every
//! mutation notifies each observer synchronously, in registration order, with
//! the new value. Notifications are never coalesced: N mutations produce N
//! callbacks per observer.
//!
//! [`MessageLog`] is the ordered chat history built on top of it. Its mutators
//! are crate-private; only the client's inbound dispatch writes the log.

use std::fmt;

use courier_proto::ChatMessage;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer<T> = Box<dyn FnMut(&T) + Send>;

/// A value with synchronous change notification.
pub struct Observable<T> {
    value: T,
    observers: Vec<(SubscriptionId, Observer<T>)>,
    next_id: u64,
}

impl<T> Observable<T> {
    /// Wrap an initial value. No observers are notified of it.
    pub fn new(value: T) -> Self {
        Self { value, observers: Vec::new(), next_id: 0 }
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Register an observer. It is called after every later mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Drop every observer registration.
    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Mutate the value in place, then notify.
    pub(crate) fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.notify();
    }

    /// Replace the value, then notify.
    pub(crate) fn set(&mut self, value: T) {
        self.value = value;
        self.notify();
    }

    fn notify(&mut self) {
        for (_, observer) in &mut self.observers {
            observer(&self.value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Ordered chat history of the current room.
///
/// Oldest message first. Mutated only by replace (full reset), append (live
/// message) and prepend (older page). Never deduplicated, never truncated
/// except by replace.
#[derive(Debug)]
pub struct MessageLog {
    inner: Observable<Vec<ChatMessage>>,
}

impl MessageLog {
    /// Empty log.
    pub fn new() -> Self {
        Self { inner: Observable::new(Vec::new()) }
    }

    /// Current messages, oldest first.
    pub fn snapshot(&self) -> &[ChatMessage] {
        self.inner.get()
    }

    /// Number of messages held.
    pub fn len(&self) -> usize {
        self.inner.get().len()
    }

    /// True if no messages are held.
    pub fn is_empty(&self) -> bool {
        self.inner.get().is_empty()
    }

    /// Observe every mutation. The observer receives the full new snapshot.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&Vec<ChatMessage>) + Send + 'static,
    ) -> SubscriptionId {
        self.inner.subscribe(observer)
    }

    /// Remove an observer.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Drop every observer.
    pub fn clear_observers(&mut self) {
        self.inner.clear_observers();
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observer_count()
    }

    pub(crate) fn replace(&mut self, messages: Vec<ChatMessage>) {
        self.inner.set(messages);
    }

    pub(crate) fn append(&mut self, message: ChatMessage) {
        self.inner.update(|log| log.push(message));
    }

    pub(crate) fn prepend(&mut self, messages: Vec<ChatMessage>) {
        self.inner.update(|log| {
            log.splice(0..0, messages);
        });
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn msg(content: &str) -> ChatMessage {
        ChatMessage::new("a", content, 1)
    }

    fn contents(log: &[ChatMessage]) -> Vec<&str> {
        log.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn observers_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut value = Observable::new(0);

        for name in ["first", "second"] {
            let calls = Arc::clone(&calls);
            value.subscribe(move |v| calls.lock().unwrap().push((name, *v)));
        }

        value.set(7);
        assert_eq!(*calls.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn notifications_are_not_coalesced() {
        let count = Arc::new(Mutex::new(0));
        let mut value = Observable::new(false);
        let seen = Arc::clone(&count);
        value.subscribe(move |_| *seen.lock().unwrap() += 1);

        value.set(true);
        value.set(true);
        value.update(|v| *v = false);
        assert_eq!(*count.lock().unwrap(), 3);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let count = Arc::new(Mutex::new(0));
        let mut value = Observable::new(0);
        let seen = Arc::clone(&count);
        let id = value.subscribe(move |_| *seen.lock().unwrap() += 1);

        value.set(1);
        assert!(value.unsubscribe(id));
        assert!(!value.unsubscribe(id));
        value.set(2);

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(value.observer_count(), 0);
    }

    #[test]
    fn log_mutations_keep_order() {
        let mut log = MessageLog::new();
        log.replace(vec![msg("A"), msg("B"), msg("C")]);
        log.append(msg("D"));
        log.prepend(vec![msg("X"), msg("Y")]);

        assert_eq!(contents(log.snapshot()), ["X", "Y", "A", "B", "C", "D"]);
    }

    #[test]
    fn empty_prepend_still_notifies() {
        let count = Arc::new(Mutex::new(0));
        let mut log = MessageLog::new();
        log.replace(vec![msg("A")]);
        let seen = Arc::clone(&count);
        log.subscribe(move |_| *seen.lock().unwrap() += 1);

        log.prepend(Vec::new());
        assert_eq!(contents(log.snapshot()), ["A"]);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn observer_sees_post_mutation_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut log = MessageLog::new();
        let sink = Arc::clone(&seen);
        log.subscribe(move |messages| sink.lock().unwrap().push(messages.len()));

        log.replace(vec![msg("A"), msg("B")]);
        log.append(msg("C"));
        assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
    }
}
