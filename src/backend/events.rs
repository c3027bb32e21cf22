//! Process-wide push-event channel fed by the worker bridge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Topics the worker publishes.
pub mod topics {
    pub const DEEP_LINK_ADD_REPOSITORY: &str = "deep-link-add-repository";
    pub const LOG: &str = "log";
}

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

struct Registration {
    id: u64,
    key: Option<&'static str>,
    handler: Handler,
}

#[derive(Default)]
struct BusState {
    topics: HashMap<String, Vec<Registration>>,
    next_id: u64,
}

/// Push-notification channel. Handlers for one emission run in registration
/// order, one at a time, on the emitting task; emissions from the single
/// bridge reader task therefore arrive in worker order.
#[derive(Default)]
pub struct EventBus {
    state: Mutex<BusState>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` for `topic`. The registration lives until the
    /// returned guard is dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        topic: &str,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> EventSubscription {
        self.register(topic, None, Arc::new(handler))
    }

    /// Keyed registration: subscribing again with the same `(topic, key)`
    /// replaces the earlier handler instead of adding a second one.
    pub fn subscribe_keyed(
        self: &Arc<Self>,
        topic: &str,
        key: &'static str,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> EventSubscription {
        self.register(topic, Some(key), Arc::new(handler))
    }

    /// Typed registration. Payloads that do not decode as `T` are logged and
    /// dropped before they reach `handler`.
    pub fn subscribe_decoded<T: DeserializeOwned>(
        self: &Arc<Self>,
        topic: &str,
        key: &'static str,
        handler: impl Fn(T) + Send + Sync + 'static,
    ) -> EventSubscription {
        let topic_name = topic.to_string();
        self.subscribe_keyed(topic, key, move |payload| {
            match serde_json::from_value::<T>(payload.clone()) {
                Ok(event) => handler(event),
                Err(error) => {
                    log::warn!("dropping malformed {topic_name:?} event payload: {error}");
                }
            }
        })
    }

    fn register(
        self: &Arc<Self>,
        topic: &str,
        key: Option<&'static str>,
        handler: Handler,
    ) -> EventSubscription {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;

        let registrations = state.topics.entry(topic.to_string()).or_default();
        if key.is_some() {
            registrations.retain(|registration| registration.key != key);
        }
        registrations.push(Registration { id, key, handler });

        EventSubscription {
            bus: Arc::downgrade(self),
            topic: topic.to_string(),
            id,
        }
    }

    /// Deliver `payload` to every current subscriber of `topic`.
    pub fn emit(&self, topic: &str, payload: &Value) {
        let handlers: Vec<Handler> = {
            let state = self.state.lock().unwrap();
            state
                .topics
                .get(topic)
                .map(|registrations| {
                    registrations
                        .iter()
                        .map(|registration| registration.handler.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        for handler in handlers {
            handler(payload);
        }
    }

    fn unsubscribe(&self, topic: &str, id: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(registrations) = state.topics.get_mut(topic) {
            registrations.retain(|registration| registration.id != id);
            if registrations.is_empty() {
                state.topics.remove(topic);
            }
        }
    }
}

/// Deregisters its `(topic, handler)` pair on drop.
#[must_use = "dropping the subscription immediately deregisters the handler"]
pub struct EventSubscription {
    bus: Weak<EventBus>,
    topic: String,
    id: u64,
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(&self.topic, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&Value) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |payload: &Value| {
            sink.lock().unwrap().push(payload.to_string());
        })
    }

    #[test]
    fn delivers_in_emission_and_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        let _a = bus.subscribe("log", move |payload| {
            first.lock().unwrap().push(format!("a:{payload}"));
        });
        let second = seen.clone();
        let _b = bus.subscribe("log", move |payload| {
            second.lock().unwrap().push(format!("b:{payload}"));
        });

        bus.emit("log", &json!(1));
        bus.emit("log", &json!(2));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:1", "b:1", "a:2", "b:2"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn dropping_the_guard_deregisters() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();

        let subscription = bus.subscribe("log", handler);
        bus.emit("log", &json!("first"));
        drop(subscription);
        bus.emit("log", &json!("second"));

        assert_eq!(*seen.lock().unwrap(), vec!["\"first\"".to_string()]);
    }

    #[test]
    fn emitting_unknown_topic_is_a_no_op() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let _subscription = bus.subscribe("log", handler);

        bus.emit("deep-link-add-repository", &Value::Null);

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn keyed_registration_is_idempotent() {
        let bus = EventBus::new();
        let (first_seen, first) = recorder();
        let (second_seen, second) = recorder();

        let _original = bus.subscribe_keyed("log", "toast", first);
        let _replacement = bus.subscribe_keyed("log", "toast", second);

        bus.emit("log", &json!("entry"));

        assert!(first_seen.lock().unwrap().is_empty());
        assert_eq!(second_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn decoded_subscription_fails_closed_on_shape_mismatch() {
        #[derive(Debug, Deserialize)]
        struct Entry {
            message: String,
        }

        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = bus.subscribe_decoded::<Entry>("log", "decode", move |entry| {
            sink.lock().unwrap().push(entry.message);
        });

        bus.emit("log", &json!({"unexpected": true}));
        bus.emit("log", &json!({"message": "valid"}));

        assert_eq!(*seen.lock().unwrap(), vec!["valid".to_string()]);
    }
}
