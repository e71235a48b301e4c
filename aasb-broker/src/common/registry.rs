/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */


use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use derive_new::new;
use tracing::trace;

use crate::common::SubscriberFn;

/// Exact, case-sensitive `(topic, action)` key.
#[derive(new, Debug, Clone, PartialEq, Eq, Hash)]
struct SubscriptionKey {
    topic: String,
    action: String,
}

/// Token identifying one registered callback. Pass it to
/// [`Broker::unsubscribe`](crate::common::Broker::unsubscribe) to remove exactly
/// that callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    topic: String,
    action: String,
    id: u64,
}

impl SubscriptionHandle {
    /// The topic the callback is registered on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The action the callback is registered on.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The registry-wide id of the callback.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.topic, self.action, self.id)
    }
}

#[derive(new, Clone)]
pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) callback: SubscriberFn,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// The subscription table: `(topic, action)` to callbacks in registration order.
///
/// Mutations hold a shard lock only for the duration of the table update.
/// [`lookup`](Self::lookup) returns a snapshot, so callbacks are always invoked
/// with no table lock held and may re-enter the broker freely.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    next_id: AtomicU64,
    table: DashMap<SubscriptionKey, Vec<Subscriber>>,
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("keys", &self.table.len())
            .finish()
    }
}

impl SubscriptionRegistry {
    pub(crate) fn subscribe(
        &self,
        topic: &str,
        action: &str,
        callback: SubscriberFn,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.table
            .entry(SubscriptionKey::new(topic.to_string(), action.to_string()))
            .or_default()
            .push(Subscriber::new(id, callback));
        trace!(topic, action, subscription_id = id, "Subscription added");
        SubscriptionHandle {
            topic: topic.to_string(),
            action: action.to_string(),
            id,
        }
    }

    /// Removes exactly the callback behind `handle`. Returns `false` if it was
    /// already gone.
    pub(crate) fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let key = SubscriptionKey::new(handle.topic.clone(), handle.action.clone());
        let removed = match self.table.get_mut(&key) {
            Some(mut subscribers) => {
                let before = subscribers.len();
                subscribers.retain(|subscriber| subscriber.id != handle.id);
                before != subscribers.len()
            }
            None => false,
        };
        // the RefMut above is released before touching the map again
        self.table.remove_if(&key, |_, subscribers| subscribers.is_empty());
        trace!(subscription = %handle, removed, "Unsubscribe");
        removed
    }

    /// Callbacks for `(topic, action)` in registration order. Empty when
    /// nothing is registered.
    pub(crate) fn lookup(&self, topic: &str, action: &str) -> Vec<Subscriber> {
        self.table
            .get(&SubscriptionKey::new(topic.to_string(), action.to_string()))
            .map(|subscribers| subscribers.clone())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, topic: &str, action: &str) -> usize {
        self.table
            .get(&SubscriptionKey::new(topic.to_string(), action.to_string()))
            .map_or(0, |subscribers| subscribers.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn noop() -> SubscriberFn {
        Arc::new(|_: &crate::message::Message| -> anyhow::Result<()> { Ok(()) })
    }

    #[test]
    fn lookup_preserves_registration_order() {
        let registry = SubscriptionRegistry::default();
        let first = registry.subscribe("Audio", "play", noop());
        let second = registry.subscribe("Audio", "play", noop());
        let ids: Vec<u64> = registry
            .lookup("Audio", "play")
            .iter()
            .map(|subscriber| subscriber.id)
            .collect();
        assert_eq!(ids, vec![first.id(), second.id()]);
    }

    #[test]
    fn keys_are_exact_and_case_sensitive() {
        let registry = SubscriptionRegistry::default();
        registry.subscribe("Audio", "play", noop());
        assert!(registry.lookup("audio", "play").is_empty());
        assert!(registry.lookup("Audio", "Play").is_empty());
        assert!(registry.lookup("Audio", "*").is_empty());
        assert_eq!(registry.count("Audio", "play"), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_callback() {
        let registry = SubscriptionRegistry::default();
        let first = registry.subscribe("Audio", "play", noop());
        let second = registry.subscribe("Audio", "play", noop());

        assert!(registry.unsubscribe(&first));
        assert!(!registry.unsubscribe(&first));
        let remaining = registry.lookup("Audio", "play");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id());

        assert!(registry.unsubscribe(&second));
        assert_eq!(registry.count("Audio", "play"), 0);
    }
}
