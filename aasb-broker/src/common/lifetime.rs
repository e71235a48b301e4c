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


use std::sync::{Arc, Weak};

use tracing::debug;

use crate::common::{BrokerStats, SubscriberFn};
use crate::message::Message;

/// Wraps `handler` so it only runs while `owner` is alive.
///
/// The returned callback holds a [`Weak`] reference to `owner`, so the
/// subscription table never keeps an adapter alive. On each delivery it tries
/// to upgrade. If the owner has been dropped the delivery is skipped, logged
/// at debug level, and counted as orphaned; the callback still returns `Ok`
/// because a late delivery racing teardown is expected.
pub(crate) fn guard<T, F>(owner: &Arc<T>, stats: Arc<BrokerStats>, handler: F) -> SubscriberFn
where
    T: Send + Sync + 'static,
    F: Fn(&T, &Message) -> anyhow::Result<()> + Send + Sync + 'static,
{
    let owner: Weak<T> = Arc::downgrade(owner);
    Arc::new(move |message: &Message| match owner.upgrade() {
        Some(owner) => handler(&owner, message),
        None => {
            BrokerStats::record(&stats.orphaned_deliveries);
            debug!(
                topic = message.topic(),
                action = message.action(),
                message_id = message.id(),
                "Handler owner dropped; delivery skipped"
            );
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Adapter {
        handled: AtomicUsize,
    }

    #[test]
    fn delivers_while_owner_lives_and_skips_after() -> anyhow::Result<()> {
        let stats = Arc::new(BrokerStats::default());
        let adapter = Arc::new(Adapter::default());
        let callback = guard(&adapter, stats.clone(), |adapter: &Adapter, _| {
            adapter.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let message = Message::call("CarControl", "set_fan_speed", json!({}));

        callback(&message)?;
        assert_eq!(adapter.handled.load(Ordering::SeqCst), 1);

        let observer = Arc::downgrade(&adapter);
        drop(adapter);
        assert!(observer.upgrade().is_none());

        callback(&message)?;
        assert_eq!(stats.orphaned_deliveries(), 1);
        Ok(())
    }
}
