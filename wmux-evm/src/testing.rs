//! Scripted EIP-1193 provider for tests.
//!
//! Responses are keyed by method name. One-shot responses are consumed in
//! order before falling back to the standing response; a method with neither
//! fails with 4200 like a real wallet would.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use wmux::ProviderRpcError;

use crate::provider::{Eip1193Provider, EventListener, ListenerId, ProviderEvent, ProviderFlags};

type Reply = Result<Value, ProviderRpcError>;

#[derive(Default)]
struct Script {
    once: HashMap<String, VecDeque<Reply>>,
    standing: HashMap<String, Reply>,
}

/// An in-memory [`Eip1193Provider`].
#[derive(Default)]
pub struct MockEip1193 {
    flags: ProviderFlags,
    script: Mutex<Script>,
    calls: Mutex<Vec<(String, Value)>>,
    listeners: Mutex<HashMap<ProviderEvent, Vec<(ListenerId, EventListener)>>>,
    next_listener: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockEip1193 {
    /// Creates a provider with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vendor flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ProviderFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Answers every `method` call with `value`.
    #[must_use]
    pub fn respond(self, method: &str, value: Value) -> Self {
        lock(&self.script).standing.insert(method.to_owned(), Ok(value));
        self
    }

    /// Fails every `method` call with `error`.
    #[must_use]
    pub fn fail(self, method: &str, error: ProviderRpcError) -> Self {
        lock(&self.script).standing.insert(method.to_owned(), Err(error));
        self
    }

    /// Answers the next `method` call with `value`.
    #[must_use]
    pub fn respond_once(self, method: &str, value: Value) -> Self {
        self.push_once(method, Ok(value));
        self
    }

    /// Fails the next `method` call with `error`.
    #[must_use]
    pub fn fail_once(self, method: &str, error: ProviderRpcError) -> Self {
        self.push_once(method, Err(error));
        self
    }

    /// Queues a one-shot reply on a shared provider.
    pub fn push_once(&self, method: &str, reply: Result<Value, ProviderRpcError>) {
        lock(&self.script)
            .once
            .entry(method.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// Returns every request seen, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        lock(&self.calls).clone()
    }

    /// Returns the params of every `method` request.
    #[must_use]
    pub fn calls_for(&self, method: &str) -> Vec<Value> {
        lock(&self.calls)
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    /// Returns how many times `method` was requested.
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|(m, _)| m == method).count()
    }

    /// Returns the number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: ProviderEvent) -> usize {
        lock(&self.listeners).get(&event).map_or(0, Vec::len)
    }

    /// Delivers `payload` to every listener for `event`.
    pub fn emit(&self, event: ProviderEvent, payload: &Value) {
        let listeners: Vec<EventListener> = lock(&self.listeners)
            .get(&event)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(payload);
        }
    }
}

#[async_trait]
impl Eip1193Provider for MockEip1193 {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        lock(&self.calls).push((method.to_owned(), params));
        let mut script = lock(&self.script);
        if let Some(reply) = script.once.get_mut(method).and_then(VecDeque::pop_front) {
            return reply;
        }
        script.standing.get(method).cloned().unwrap_or_else(|| {
            Err(ProviderRpcError::new(
                ProviderRpcError::UNSUPPORTED_METHOD,
                format!("The method \"{method}\" does not exist / is not available."),
            ))
        })
    }

    fn on(&self, event: ProviderEvent, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners)
            .entry(event)
            .or_default()
            .push((id, listener));
        id
    }

    fn remove_listener(&self, event: ProviderEvent, id: ListenerId) {
        if let Some(entries) = lock(&self.listeners).get_mut(&event) {
            entries.retain(|(existing, _)| *existing != id);
        }
    }

    fn flags(&self) -> ProviderFlags {
        self.flags
    }
}

impl fmt::Debug for MockEip1193 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEip1193")
            .field("flags", &self.flags)
            .field("calls", &lock(&self.calls).len())
            .finish_non_exhaustive()
    }
}
