//! Draining subscription queues.

use crate::registry::RegistryState;
use crate::types::{Document, Message, SubscriptionId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Reason recorded for ids that are not registered.
pub const NOT_FOUND: &str = "Subscription not found.";

/// Messages drained by one poll, grouped by subscription and channel.
#[derive(Clone, Debug, Default)]
pub struct PollResult {
    /// Only subscriptions that had something queued appear here.
    pub messages: BTreeMap<SubscriptionId, BTreeMap<String, Vec<Message>>>,
    /// Ids that could not be polled and why.
    pub errors: BTreeMap<SubscriptionId, String>,
}

impl PollResult {
    /// Documents drained for one subscription on one channel, in publish order.
    pub fn documents(&self, id: SubscriptionId, channel: &str) -> Vec<&Document> {
        self.messages
            .get(&id)
            .and_then(|channels| channels.get(channel))
            .map(|messages| messages.iter().map(|m| &*m.document).collect())
            .unwrap_or_default()
    }

    /// Total number of drained messages.
    pub fn message_count(&self) -> usize {
        self.messages
            .values()
            .flat_map(|channels| channels.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Wire shape: `{messages: {id: {channel: [doc...]}}, errors: {id: reason}}`.
    pub fn to_json(&self) -> Value {
        let mut messages = Map::new();
        for (id, channels) in &self.messages {
            let mut by_channel = Map::new();
            for (channel, queued) in channels {
                let docs = queued
                    .iter()
                    .map(|m| Value::Object((*m.document).clone()))
                    .collect();
                by_channel.insert(channel.clone(), Value::Array(docs));
            }
            messages.insert(id.to_hex(), Value::Object(by_channel));
        }

        let errors = self
            .errors
            .iter()
            .map(|(id, reason)| (id.to_hex(), Value::String(reason.clone())))
            .collect();

        let mut out = Map::new();
        out.insert("messages".to_string(), Value::Object(messages));
        out.insert("errors".to_string(), Value::Object(errors));
        Value::Object(out)
    }
}

/// Drain each named subscription. Must run under the registry read lock.
///
/// Each queue is swapped out under its own lock, so a concurrent publish
/// lands wholly in this result or wholly in the next one.
pub fn drain(state: &RegistryState, ids: &[SubscriptionId]) -> PollResult {
    let mut result = PollResult::default();
    let unique: BTreeSet<SubscriptionId> = ids.iter().copied().collect();

    for id in unique {
        let Some(subscription) = state.get(id) else {
            result.errors.insert(id, NOT_FOUND.to_string());
            continue;
        };

        let drained = subscription.drain();
        if drained.is_empty() {
            continue;
        }

        let channels = result.messages.entry(id).or_default();
        for message in drained {
            channels
                .entry(message.channel.to_string())
                .or_default()
                .push(message);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::publish::fan_out;
    use crate::registry::SubscriptionRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn doc(value: Value) -> Arc<Document> {
        match value {
            Value::Object(map) => Arc::new(map),
            _ => panic!("not an object"),
        }
    }

    fn setup() -> (SubscriptionRegistry, SubscriptionId) {
        let registry = SubscriptionRegistry::new();
        let id = registry
            .register("A", None, None, None, OverflowPolicy::DropOldest)
            .unwrap();
        (registry, id)
    }

    #[test]
    fn test_drain_groups_by_channel() {
        let (registry, id) = setup();
        for i in 0..3 {
            fan_out(&registry.read(), "A", doc(json!({"count": i})));
        }

        let result = drain(&registry.read(), &[id]);
        let counts: Vec<i64> = result
            .documents(id, "A")
            .iter()
            .map(|d| d["count"].as_i64().unwrap())
            .collect();
        assert_eq!(counts, vec![0, 1, 2]);
        assert_eq!(result.message_count(), 3);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_second_drain_is_empty() {
        let (registry, id) = setup();
        fan_out(&registry.read(), "A", doc(json!({"a": 1})));

        assert_eq!(drain(&registry.read(), &[id]).message_count(), 1);
        let again = drain(&registry.read(), &[id]);
        assert!(again.is_empty());
        assert!(!again.messages.contains_key(&id));
    }

    #[test]
    fn test_unknown_id_is_partial_failure() {
        let (registry, id) = setup();
        fan_out(&registry.read(), "A", doc(json!({"a": 1})));

        let ghost = SubscriptionId(999);
        let result = drain(&registry.read(), &[ghost, id]);
        assert_eq!(result.errors.get(&ghost).map(String::as_str), Some(NOT_FOUND));
        assert_eq!(result.documents(id, "A").len(), 1);
    }

    #[test]
    fn test_duplicate_ids_drain_once() {
        let (registry, id) = setup();
        fan_out(&registry.read(), "A", doc(json!({"a": 1})));

        let result = drain(&registry.read(), &[id, id]);
        assert_eq!(result.message_count(), 1);
    }

    #[test]
    fn test_to_json_shape() {
        let (registry, id) = setup();
        fan_out(&registry.read(), "A", doc(json!({"body": "hello"})));

        let ghost = SubscriptionId(42);
        let wire = drain(&registry.read(), &[id, ghost]).to_json();
        assert_eq!(wire["messages"][id.to_hex()]["A"], json!([{"body": "hello"}]));
        assert_eq!(wire["errors"][ghost.to_hex()], json!(NOT_FOUND));
    }
}
