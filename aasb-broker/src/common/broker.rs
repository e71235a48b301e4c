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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use static_assertions::assert_impl_all;
use tracing::{debug, info, instrument, trace};

use crate::common::config::{AasbConfig, DispatchMode};
use crate::common::dispatcher::Dispatcher;
use crate::common::lifetime;
use crate::common::pending::{PendingReplies, ReplyWaiter};
use crate::common::registry::SubscriptionRegistry;
use crate::common::{BrokerStats, SubscriptionHandle};
use crate::message::{codec, Dispatch, InvalidReason, Message, MessageError};
use crate::stream::StreamRegistry;

struct BrokerInner {
    config: AasbConfig,
    registry: Arc<SubscriptionRegistry>,
    pending: Arc<PendingReplies>,
    dispatcher: Dispatcher,
    streams: StreamRegistry,
    stats: Arc<BrokerStats>,
    message_timeout: RwLock<Duration>,
    shutdown: AtomicBool,
}

/// The AASB message broker.
///
/// A `Broker` owns the subscription table, the table of callers waiting for
/// replies, and the stream registry. It is a cheap handle: clones share the
/// same state, and tests can build as many independent brokers as they like.
///
/// Components that are themselves reachable from a subscription (domain
/// adapters) should hold a [`WeakBroker`] instead of a clone, so the broker and
/// the adapter never keep each other alive.
///
/// # Dispatch
///
/// [`publish`](Self::publish) validates a message and returns a [`Dispatch`]:
///
/// * `send()` delivers to every subscriber of the message's `(topic, action)`
///   in registration order. A subscriber that returns `Err` or panics is
///   logged and skipped; the rest still run and the publisher sees no error.
/// * `get()` additionally waits for the REPLY whose `replyToId` matches the
///   CALL, up to [`message_timeout`](Self::message_timeout).
///
/// Publishing a REPLY fulfils the matching waiter, if any, and is also
/// delivered to regular subscribers of the reply's `(topic, action)`.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

/// A non-owning handle to a [`Broker`].
#[derive(Clone, Default)]
pub struct WeakBroker {
    inner: Weak<BrokerInner>,
}

assert_impl_all!(Broker: Send, Sync, Clone);
assert_impl_all!(WeakBroker: Send, Sync, Clone);

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("dispatch", &self.inner.dispatcher.mode())
            .field("pending_replies", &self.inner.pending.len())
            .field("streams", &self.inner.streams.len())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl fmt::Debug for WeakBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBroker")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(AasbConfig::default())
    }
}

impl WeakBroker {
    /// Returns the broker if it is still alive.
    pub fn upgrade(&self) -> Option<Broker> {
        self.inner.upgrade().map(|inner| Broker { inner })
    }
}

impl Broker {
    /// Creates a broker from `config`.
    ///
    /// `DispatchMode::Queued` spawns its worker on the current tokio runtime
    /// and falls back to inline delivery when there is none.
    pub fn new(config: AasbConfig) -> Self {
        let stats = Arc::new(BrokerStats::default());
        let registry = Arc::new(SubscriptionRegistry::default());
        let dispatcher = Dispatcher::new(
            config.dispatch.mode,
            registry.clone(),
            stats.clone(),
            config.behavior.log_payloads,
        );
        debug!(
            dispatch = %dispatcher.mode(),
            reply_timeout_ms = config.timeouts.reply_timeout_ms,
            fail_fast = config.behavior.fail_fast_without_subscribers,
            "Broker created"
        );
        Self {
            inner: Arc::new(BrokerInner {
                message_timeout: RwLock::new(config.reply_timeout()),
                pending: Arc::new(PendingReplies::new(stats.clone())),
                streams: StreamRegistry::default(),
                shutdown: AtomicBool::new(false),
                config,
                registry,
                dispatcher,
                stats,
            }),
        }
    }

    /// Returns a non-owning handle to this broker.
    pub fn downgrade(&self) -> WeakBroker {
        WeakBroker {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Registers `callback` for `(topic, action)`.
    ///
    /// Callbacks for the same pair run in the order they were registered.
    /// Topic and action match exactly and case-sensitively.
    ///
    /// The callback owns whatever it captures for as long as it stays
    /// subscribed; use [`subscribe_weak`](Self::subscribe_weak) when the
    /// callback belongs to an object with its own lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if `topic` or `action` is empty.
    pub fn subscribe<F>(
        &self,
        topic: &str,
        action: &str,
        callback: F,
    ) -> Result<SubscriptionHandle, MessageError>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        check_address(topic, action)?;
        Ok(self.inner.registry.subscribe(topic, action, Arc::new(callback)))
    }

    /// Registers `handler` for `(topic, action)` on behalf of `owner`, holding
    /// only a weak reference to it.
    ///
    /// Once the last strong reference to `owner` is dropped, deliveries are
    /// skipped without calling `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if `topic` or `action` is empty.
    pub fn subscribe_weak<T, F>(
        &self,
        owner: &Arc<T>,
        topic: &str,
        action: &str,
        handler: F,
    ) -> Result<SubscriptionHandle, MessageError>
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        check_address(topic, action)?;
        let callback = lifetime::guard(owner, self.inner.stats.clone(), handler);
        Ok(self.inner.registry.subscribe(topic, action, callback))
    }

    /// Removes exactly the callback behind `handle`. Returns `false` if it was
    /// already removed.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.inner.registry.unsubscribe(handle)
    }

    /// Number of callbacks registered for `(topic, action)`.
    pub fn subscriber_count(&self, topic: &str, action: &str) -> usize {
        self.inner.registry.count(topic, action)
    }

    /// Validates `message` and prepares it for dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] when the id, topic, or action
    /// is empty, a reply's `replyToId` is empty, or the payload is not an
    /// object. Nothing is dispatched in that case.
    pub fn publish(&self, message: Message) -> Result<Dispatch, MessageError> {
        message.validate()?;
        Ok(Dispatch::new(self.clone(), message))
    }

    /// Decodes a wire envelope and prepares it for dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::MalformedEnvelope`] when the text does not
    /// decode.
    pub fn publish_encoded(&self, wire: &str) -> Result<Dispatch, MessageError> {
        self.publish(codec::deserialize(wire)?)
    }

    /// The stream registry shared by everything using this broker.
    pub fn streams(&self) -> &StreamRegistry {
        &self.inner.streams
    }

    /// Sets the default wait used by `get()`.
    pub fn set_message_timeout(&self, timeout: Duration) {
        *self.inner.message_timeout.write() = timeout;
        debug!(timeout_ms = timeout.as_millis() as u64, "Message timeout updated");
    }

    /// The default wait used by `get()`.
    pub fn message_timeout(&self) -> Duration {
        *self.inner.message_timeout.read()
    }

    /// Dispatch counters.
    pub fn stats(&self) -> &BrokerStats {
        &self.inner.stats
    }

    /// The configuration the broker was built with.
    pub fn config(&self) -> &AasbConfig {
        &self.inner.config
    }

    /// The dispatch mode in effect, after any fallback.
    pub fn dispatch_mode(&self) -> DispatchMode {
        self.inner.dispatcher.mode()
    }

    /// Number of `get()` calls currently waiting.
    pub fn pending_replies(&self) -> usize {
        self.inner.pending.len()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has begun.
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Shuts the broker down.
    ///
    /// Drains queued deliveries (bounded by the configured shutdown timeout),
    /// resolves every waiting `get()` with [`InvalidReason::Shutdown`], and
    /// clears the stream registry. Later `send()` calls are discarded and
    /// later `get()` calls return `Shutdown`. Calling this again does nothing.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            trace!("Broker already shut down");
            return;
        }
        info!("Shutting down broker");
        self.inner
            .dispatcher
            .drain(self.inner.config.shutdown_timeout())
            .await;
        let discarded = self.inner.pending.discard_all(InvalidReason::Shutdown);
        self.inner.streams.clear();
        info!(discarded_replies = discarded, "Broker shut down");
    }

    pub(crate) fn fail_fast_without_subscribers(&self) -> bool {
        self.inner.config.behavior.fail_fast_without_subscribers
    }

    pub(crate) fn register_waiter(
        &self,
        id: &str,
        timeout: Duration,
    ) -> Result<ReplyWaiter, MessageError> {
        self.inner.pending.register(id, timeout)
    }

    /// Fulfils the waiter for a REPLY, then hands the message to the
    /// dispatcher for its regular subscribers.
    pub(crate) fn deliver(&self, message: Message) {
        BrokerStats::record(&self.inner.stats.messages_published);
        if message.is_reply() {
            self.inner.pending.fulfill(&message);
        }
        self.inner.dispatcher.dispatch(message);
    }
}

fn check_address(topic: &str, action: &str) -> Result<(), MessageError> {
    if topic.is_empty() || action.is_empty() {
        return Err(MessageError::InvalidMessage(format!(
            "subscription needs a non-empty topic and action, got {topic:?}:{action:?}"
        )));
    }
    Ok(())
}
