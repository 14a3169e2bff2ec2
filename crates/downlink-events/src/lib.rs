//! Typed publish/subscribe for the Downlink simulation core.
//!
//! Components that announce state changes (tasks, pools, challenges,
//! connection steps, connections) each own an [`EventBus`] parameterised by
//! their own event enum. Listeners subscribe by event name and receive the
//! typed payload.
//!
//! # Contract
//!
//! - [`EventBus::on`] registers a listener under a name. Names are
//!   case-insensitive and any number of listeners may share one.
//! - [`EventBus::trigger`] delivers an event synchronously to every listener
//!   registered under the event's name, in registration order.
//! - [`EventBus::off`] removes every listener registered under a name;
//!   [`EventBus::clear`] removes all listeners.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use downlink_events::{Event, EventBus};
//!
//! enum Door {
//!     Opened,
//! }
//!
//! impl Event for Door {
//!     fn name(&self) -> &'static str {
//!         match self {
//!             Self::Opened => "opened",
//!         }
//!     }
//! }
//!
//! let count = Arc::new(AtomicUsize::new(0));
//! let seen = Arc::clone(&count);
//! let mut bus = EventBus::new();
//! bus.on("OPENED", move |_: &Door| {
//!     seen.fetch_add(1, Ordering::SeqCst);
//! });
//! bus.trigger(&Door::Opened);
//! assert_eq!(count.load(Ordering::SeqCst), 1);
//! ```

use std::collections::BTreeMap;

use tracing::trace;

/// An event payload that knows the name listeners subscribe to.
pub trait Event {
    /// The event's name. Matching against listener names ignores case.
    fn name(&self) -> &'static str;
}

/// A boxed listener callback.
type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// A per-component event bus with typed payloads.
pub struct EventBus<E> {
    /// Listeners keyed by lowercased event name, in registration order.
    listeners: BTreeMap<String, Vec<Listener<E>>>,
}

impl<E: Event> EventBus<E> {
    /// Create a bus with no listeners.
    pub const fn new() -> Self {
        Self {
            listeners: BTreeMap::new(),
        }
    }

    /// Register `callback` for events named `name` (case-insensitive).
    pub fn on<F>(&mut self, name: &str, callback: F) -> &mut Self
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.listeners
            .entry(name.to_lowercase())
            .or_default()
            .push(Box::new(callback));
        self
    }

    /// Deliver `event` to every listener registered under its name.
    ///
    /// Returns the number of listeners invoked.
    pub fn trigger(&mut self, event: &E) -> usize {
        let key = event.name().to_lowercase();
        let Some(callbacks) = self.listeners.get_mut(&key) else {
            return 0;
        };
        for callback in callbacks.iter_mut() {
            callback(event);
        }
        trace!(event = %key, listeners = callbacks.len(), "event delivered");
        callbacks.len()
    }

    /// Remove every listener registered under `name`.
    pub fn off(&mut self, name: &str) -> &mut Self {
        self.listeners.remove(&name.to_lowercase());
        self
    }

    /// Remove every listener.
    pub fn clear(&mut self) -> &mut Self {
        self.listeners.clear();
        self
    }

    /// Number of listeners registered under `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .get(&name.to_lowercase())
            .map_or(0, Vec::len)
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> core::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, callbacks)| (name.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Signal {
        Ping(u32),
        Pong,
    }

    impl Event for Signal {
        fn name(&self) -> &'static str {
            match self {
                Self::Ping(_) => "ping",
                Self::Pong => "Pong",
            }
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Arc::clone(&log), log)
    }

    #[test]
    fn trigger_without_listeners_is_silent() {
        let mut bus: EventBus<Signal> = EventBus::new();
        assert_eq!(bus.trigger(&Signal::Pong), 0);
    }

    #[test]
    fn names_are_case_insensitive() {
        let (log, handle) = recorder();
        let mut bus = EventBus::new();
        bus.on("PING", move |e: &Signal| {
            log.lock().unwrap().push(format!("{e:?}"));
        });
        assert_eq!(bus.trigger(&Signal::Ping(3)), 1);
        assert_eq!(*handle.lock().unwrap(), vec!["Ping(3)".to_owned()]);
        assert_eq!(bus.listener_count("Ping"), 1);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let (log, handle) = recorder();
        let first = Arc::clone(&log);
        let second = log;
        let mut bus = EventBus::new();
        bus.on("pong", move |_: &Signal| first.lock().unwrap().push("first".to_owned()))
            .on("pong", move |_: &Signal| second.lock().unwrap().push("second".to_owned()));
        assert_eq!(bus.trigger(&Signal::Pong), 2);
        assert_eq!(
            *handle.lock().unwrap(),
            vec!["first".to_owned(), "second".to_owned()]
        );
    }

    #[test]
    fn listeners_only_see_their_event() {
        let (log, handle) = recorder();
        let mut bus = EventBus::new();
        bus.on("ping", move |e: &Signal| log.lock().unwrap().push(format!("{e:?}")));
        bus.trigger(&Signal::Pong);
        bus.trigger(&Signal::Ping(1));
        assert_eq!(*handle.lock().unwrap(), vec!["Ping(1)".to_owned()]);
    }

    #[test]
    fn off_removes_all_listeners_for_name() {
        let mut bus = EventBus::new();
        bus.on("ping", |_: &Signal| {}).on("ping", |_: &Signal| {});
        bus.on("pong", |_: &Signal| {});
        bus.off("PING");
        assert_eq!(bus.listener_count("ping"), 0);
        assert_eq!(bus.listener_count("pong"), 1);
        assert_eq!(bus.trigger(&Signal::Ping(0)), 0);
    }

    #[test]
    fn clear_removes_everything() {
        let mut bus = EventBus::new();
        bus.on("ping", |_: &Signal| {}).on("pong", |_: &Signal| {});
        bus.clear();
        assert_eq!(bus.listener_count("ping"), 0);
        assert_eq!(bus.listener_count("pong"), 0);
    }

    #[test]
    fn debug_shows_listener_counts() {
        let mut bus = EventBus::new();
        bus.on("ping", |_: &Signal| {});
        let rendered = format!("{bus:?}");
        assert!(rendered.contains("ping"));
    }
}
