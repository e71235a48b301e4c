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


use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use derive_new::new;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace, warn};

use crate::common::config::DispatchMode;
use crate::common::registry::{Subscriber, SubscriptionRegistry};
use crate::common::BrokerStats;
use crate::message::Message;

/// One subscriber's failure to handle one message. Logged and counted, never
/// returned to the publisher.
#[derive(new, Debug, Error)]
#[error("subscriber #{subscription_id} on {topic}:{action} failed handling message {message_id}: {reason}")]
pub(crate) struct DispatchFailure {
    topic: String,
    action: String,
    message_id: String,
    subscription_id: u64,
    reason: String,
}

struct DispatchQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    tracker: TaskTracker,
}

enum Lane {
    Inline,
    Queued(DispatchQueue),
}

/// Runs subscriber callbacks, either on the publishing thread or on a single
/// FIFO worker task.
///
/// Both lanes deliver one message to its subscribers in registration order,
/// and the queued lane preserves publish order across messages.
pub(crate) struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    stats: Arc<BrokerStats>,
    log_payloads: bool,
    lane: Lane,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mode", &self.mode())
            .field("log_payloads", &self.log_payloads)
            .finish()
    }
}

impl Dispatcher {
    /// Builds a dispatcher for `mode`.
    ///
    /// The queued lane spawns its worker on the current tokio runtime. With no
    /// runtime available it falls back to inline delivery.
    pub(crate) fn new(
        mode: DispatchMode,
        registry: Arc<SubscriptionRegistry>,
        stats: Arc<BrokerStats>,
        log_payloads: bool,
    ) -> Self {
        let lane = match mode {
            DispatchMode::Inline => Lane::Inline,
            DispatchMode::Queued => match Handle::try_current() {
                Ok(handle) => {
                    let (sender, receiver) = mpsc::unbounded_channel();
                    let tracker = TaskTracker::new();
                    tracker.spawn_on(
                        run_queue(receiver, registry.clone(), stats.clone(), log_payloads),
                        &handle,
                    );
                    tracker.close();
                    debug!("Queued dispatch worker started");
                    Lane::Queued(DispatchQueue {
                        sender: Mutex::new(Some(sender)),
                        tracker,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "Queued dispatch needs a tokio runtime; falling back to inline");
                    Lane::Inline
                }
            },
        };
        Self {
            registry,
            stats,
            log_payloads,
            lane,
        }
    }

    pub(crate) fn mode(&self) -> DispatchMode {
        match self.lane {
            Lane::Inline => DispatchMode::Inline,
            Lane::Queued(_) => DispatchMode::Queued,
        }
    }

    /// Delivers `message` to the subscribers of its `(topic, action)`.
    ///
    /// Inline delivery completes before returning. Queued delivery returns once
    /// the message is enqueued; it returns `false` if the queue has been closed.
    pub(crate) fn dispatch(&self, message: Message) -> bool {
        match &self.lane {
            Lane::Inline => {
                let subscribers = self.registry.lookup(message.topic(), message.action());
                notify(&subscribers, &message, &self.stats, self.log_payloads);
                true
            }
            Lane::Queued(queue) => {
                let sender = queue.sender.lock().clone();
                match sender {
                    Some(sender) => match sender.send(message) {
                        Ok(()) => true,
                        Err(mpsc::error::SendError(message)) => {
                            warn!(
                                topic = message.topic(),
                                action = message.action(),
                                message_id = message.id(),
                                "Dispatch worker has stopped; message discarded"
                            );
                            false
                        }
                    },
                    None => {
                        warn!(
                            topic = message.topic(),
                            action = message.action(),
                            message_id = message.id(),
                            "Dispatch queue is closed; message discarded"
                        );
                        false
                    }
                }
            }
        }
    }

    /// Closes the queue and waits up to `timeout` for queued messages to be
    /// delivered. Returns `false` if the wait timed out.
    pub(crate) async fn drain(&self, timeout: Duration) -> bool {
        match &self.lane {
            Lane::Inline => true,
            Lane::Queued(queue) => {
                drop(queue.sender.lock().take());
                match tokio::time::timeout(timeout, queue.tracker.wait()).await {
                    Ok(()) => {
                        debug!("Dispatch queue drained");
                        true
                    }
                    Err(_) => {
                        warn!(
                            timeout_ms = timeout.as_millis() as u64,
                            "Dispatch queue did not drain before the shutdown timeout"
                        );
                        false
                    }
                }
            }
        }
    }
}

async fn run_queue(
    mut receiver: mpsc::UnboundedReceiver<Message>,
    registry: Arc<SubscriptionRegistry>,
    stats: Arc<BrokerStats>,
    log_payloads: bool,
) {
    while let Some(message) = receiver.recv().await {
        let subscribers = registry.lookup(message.topic(), message.action());
        notify(&subscribers, &message, &stats, log_payloads);
    }
    trace!("Dispatch worker exiting");
}

/// Invokes each subscriber with `message`, in order, isolating failures.
///
/// An `Err` return or a panic from one callback is logged as a
/// [`DispatchFailure`] and does not stop the remaining callbacks. Returns the
/// number of callbacks that succeeded.
pub(crate) fn notify(
    subscribers: &[Subscriber],
    message: &Message,
    stats: &BrokerStats,
    log_payloads: bool,
) -> usize {
    if log_payloads {
        trace!(
            topic = message.topic(),
            action = message.action(),
            message_id = message.id(),
            subscribers = subscribers.len(),
            payload = %message.payload(),
            "Dispatching"
        );
    } else {
        trace!(
            topic = message.topic(),
            action = message.action(),
            message_id = message.id(),
            subscribers = subscribers.len(),
            "Dispatching"
        );
    }

    let mut delivered = 0;
    for subscriber in subscribers {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(message)));
        let reason = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(format!("{err:#}")),
            Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
        };
        match reason {
            None => {
                BrokerStats::record(&stats.callbacks_delivered);
                delivered += 1;
            }
            Some(reason) => {
                BrokerStats::record(&stats.dispatch_failures);
                let failure = DispatchFailure::new(
                    message.topic().to_string(),
                    message.action().to_string(),
                    message.id().to_string(),
                    subscriber.id,
                    reason,
                );
                error!(
                    topic = message.topic(),
                    action = message.action(),
                    message_id = message.id(),
                    subscription_id = subscriber.id,
                    error = %failure,
                    "Subscriber failed"
                );
            }
        }
    }
    delivered
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn failing_subscriber_does_not_stop_the_next() {
        let registry = Arc::new(SubscriptionRegistry::default());
        let stats = Arc::new(BrokerStats::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(
            "Audio",
            "play",
            Arc::new(|_: &Message| -> anyhow::Result<()> { Err(anyhow::anyhow!("device busy")) }),
        );
        let log = seen.clone();
        registry.subscribe(
            "Audio",
            "play",
            Arc::new(move |message: &Message| -> anyhow::Result<()> {
                log.lock().push(message.id().to_string());
                Ok(())
            }),
        );

        let dispatcher = Dispatcher::new(DispatchMode::Inline, registry, stats.clone(), false);
        let message = Message::call("Audio", "play", json!({}));
        assert!(dispatcher.dispatch(message.clone()));

        assert_eq!(seen.lock().as_slice(), [message.id().to_string()]);
        assert_eq!(stats.dispatch_failures(), 1);
        assert_eq!(stats.callbacks_delivered(), 1);
    }

    #[test]
    fn queued_mode_without_runtime_falls_back_to_inline() {
        let dispatcher = Dispatcher::new(
            DispatchMode::Queued,
            Arc::new(SubscriptionRegistry::default()),
            Arc::new(BrokerStats::default()),
            false,
        );
        assert_eq!(dispatcher.mode(), DispatchMode::Inline);
    }

    #[test]
    fn failure_display_names_the_address() {
        let failure = DispatchFailure::new(
            "Navigation".into(),
            "cancel".into(),
            "m-1".into(),
            3,
            "boom".into(),
        );
        assert_eq!(
            failure.to_string(),
            "subscriber #3 on Navigation:cancel failed handling message m-1: boom"
        );
    }
}
