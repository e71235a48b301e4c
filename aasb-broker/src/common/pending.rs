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


//! The single-assignment bridge behind `Dispatch::get`.
//!
//! A [`ReplyWaiter`] is registered under the CALL id before the CALL is
//! dispatched, so a responder that answers synchronously from inside its
//! callback still finds the slot. [`PendingReplies::fulfill`] removes the slot
//! before sending, which makes fulfilment exactly-once: a second REPLY for the
//! same id finds nothing and is dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::common::BrokerStats;
use crate::message::{InvalidReason, Message, MessageError, ReplyResult};

struct PendingReply {
    sender: oneshot::Sender<ReplyResult>,
    token: u64,
}

/// Outstanding `get()` calls keyed by CALL id.
pub(crate) struct PendingReplies {
    closed: AtomicBool,
    next_token: AtomicU64,
    slots: DashMap<String, PendingReply>,
    stats: Arc<BrokerStats>,
}

impl fmt::Debug for PendingReplies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReplies")
            .field("pending", &self.slots.len())
            .finish()
    }
}

impl PendingReplies {
    pub(crate) fn new(stats: Arc<BrokerStats>) -> Self {
        Self {
            closed: AtomicBool::new(false),
            next_token: AtomicU64::new(0),
            slots: DashMap::new(),
            stats,
        }
    }

    /// Registers a waiter for the CALL `id` with the given deadline.
    ///
    /// Fails with [`MessageError::DuplicatePendingReply`] if a waiter for `id`
    /// already exists, and with [`MessageError::Shutdown`] once
    /// [`discard_all`](Self::discard_all) has run.
    pub(crate) fn register(
        self: &Arc<Self>,
        id: &str,
        timeout: Duration,
    ) -> Result<ReplyWaiter, MessageError> {
        match self.slots.entry(id.to_string()) {
            Entry::Occupied(_) => Err(MessageError::DuplicatePendingReply(id.to_string())),
            Entry::Vacant(vacant) => {
                // checked under the shard lock so `discard_all` either sees the slot or refuses it
                if self.closed.load(Ordering::SeqCst) {
                    return Err(MessageError::Shutdown);
                }
                let (sender, receiver) = oneshot::channel();
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                vacant.insert(PendingReply { sender, token });
                trace!(message_id = id, timeout_ms = timeout.as_millis() as u64, "Reply waiter registered");
                Ok(ReplyWaiter {
                    id: id.to_string(),
                    token,
                    deadline: Instant::now() + timeout,
                    receiver,
                    slots: Arc::downgrade(self),
                    stats: self.stats.clone(),
                })
            }
        }
    }

    /// Hands `reply` to the waiter registered under its `replyToId`.
    ///
    /// Returns `false`, logging a warning, when there is no such waiter: the
    /// reply is late, a duplicate, or answers a CALL nobody waited on.
    pub(crate) fn fulfill(&self, reply: &Message) -> bool {
        let Some(reply_to_id) = reply.reply_to_id() else {
            return false;
        };
        match self.slots.remove(reply_to_id) {
            Some((_, pending)) => {
                if pending.sender.send(ReplyResult::Completed(reply.clone())).is_ok() {
                    BrokerStats::record(&self.stats.replies_fulfilled);
                    debug!(
                        reply_to_id,
                        message_id = reply.id(),
                        topic = reply.topic(),
                        action = reply.action(),
                        "Reply fulfilled"
                    );
                    true
                } else {
                    BrokerStats::record(&self.stats.replies_dropped);
                    warn!(
                        reply_to_id,
                        message_id = reply.id(),
                        "Reply arrived after its waiter gave up; dropped"
                    );
                    false
                }
            }
            None => {
                BrokerStats::record(&self.stats.replies_dropped);
                warn!(
                    reply_to_id,
                    message_id = reply.id(),
                    topic = reply.topic(),
                    action = reply.action(),
                    "No pending call for reply (late, duplicate, or unknown); dropped"
                );
                false
            }
        }
    }

    /// Resolves every outstanding waiter with `reason` and refuses later
    /// registrations. Returns how many waiters there were.
    pub(crate) fn discard_all(&self, reason: InvalidReason) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let ids: Vec<String> = self.slots.iter().map(|slot| slot.key().clone()).collect();
        let mut discarded = 0;
        for id in ids {
            if let Some((_, pending)) = self.slots.remove(&id) {
                // the waiter may already be gone; nothing to resolve then
                let _ = pending.sender.send(ReplyResult::Invalid(reason));
                discarded += 1;
            }
        }
        if discarded > 0 {
            debug!(discarded, %reason, "Discarded pending replies");
        }
        discarded
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }
}

/// The receiving half of a registered reply slot.
///
/// Dropping the waiter, whether after completion or because the owning future
/// was cancelled, removes its slot.
pub(crate) struct ReplyWaiter {
    id: String,
    token: u64,
    deadline: Instant,
    receiver: oneshot::Receiver<ReplyResult>,
    slots: Weak<PendingReplies>,
    stats: Arc<BrokerStats>,
}

impl ReplyWaiter {
    /// Suspends until the reply arrives or the deadline passes.
    pub(crate) async fn wait(mut self) -> ReplyResult {
        match tokio::time::timeout_at(self.deadline, &mut self.receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => ReplyResult::Invalid(InvalidReason::Abandoned),
            Err(_) => {
                self.receiver.close();
                // a reply that won the race against the deadline is still honoured
                match self.receiver.try_recv() {
                    Ok(result) => result,
                    Err(_) => {
                        BrokerStats::record(&self.stats.replies_timed_out);
                        debug!(message_id = %self.id, "Timed out waiting for reply");
                        ReplyResult::Invalid(InvalidReason::TimedOut)
                    }
                }
            }
        }
    }
}

impl Drop for ReplyWaiter {
    fn drop(&mut self) {
        if let Some(pending) = self.slots.upgrade() {
            let token = self.token;
            pending
                .slots
                .remove_if(&self.id, |_, slot| slot.token == token);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pending() -> Arc<PendingReplies> {
        Arc::new(PendingReplies::new(Arc::new(BrokerStats::default())))
    }

    #[tokio::test]
    async fn fulfill_wakes_waiter_once() -> anyhow::Result<()> {
        let pending = pending();
        let call = Message::call("PhoneCallController", "create_call_id", json!({}));
        let waiter = pending.register(call.id(), Duration::from_secs(1))?;

        let reply = Message::reply_to(&call, json!({"callId": "abc-123"}));
        assert!(pending.fulfill(&reply));
        assert!(!pending.fulfill(&reply));

        let result = waiter.wait().await;
        assert_eq!(result.payload(), Some(&json!({"callId": "abc-123"})));
        assert_eq!(pending.stats.replies_fulfilled(), 1);
        assert_eq!(pending.stats.replies_dropped(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() -> anyhow::Result<()> {
        let pending = pending();
        let _waiter = pending.register("m-1", Duration::from_secs(1))?;
        assert!(matches!(
            pending.register("m-1", Duration::from_secs(1)),
            Err(MessageError::DuplicatePendingReply(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn deadline_yields_timed_out_and_frees_slot() -> anyhow::Result<()> {
        let pending = pending();
        let waiter = pending.register("m-1", Duration::from_millis(50))?;
        let result = waiter.wait().await;
        assert_eq!(result.invalid_reason(), Some(InvalidReason::TimedOut));
        assert_eq!(pending.len(), 0);
        assert_eq!(pending.stats.replies_timed_out(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn dropping_waiter_removes_slot() -> anyhow::Result<()> {
        let pending = pending();
        let waiter = pending.register("m-1", Duration::from_secs(1))?;
        assert!(pending.contains("m-1"));
        drop(waiter);
        assert!(!pending.contains("m-1"));
        Ok(())
    }

    #[tokio::test]
    async fn discard_all_resolves_waiters() -> anyhow::Result<()> {
        let pending = pending();
        let waiter = pending.register("m-1", Duration::from_secs(5))?;
        assert_eq!(pending.discard_all(InvalidReason::Shutdown), 1);
        assert_eq!(
            waiter.wait().await.invalid_reason(),
            Some(InvalidReason::Shutdown)
        );
        Ok(())
    }

    #[tokio::test]
    async fn registration_after_discard_all_is_refused() -> anyhow::Result<()> {
        let pending = pending();
        assert_eq!(pending.discard_all(InvalidReason::Shutdown), 0);
        assert!(matches!(
            pending.register("m-1", Duration::from_secs(5)),
            Err(MessageError::Shutdown)
        ));
        assert!(!pending.contains("m-1"));
        assert_eq!(pending.len(), 0);
        Ok(())
    }
}
