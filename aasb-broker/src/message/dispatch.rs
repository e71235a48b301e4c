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
use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use crate::common::Broker;
use crate::message::{InvalidReason, Message, MessageError, ReplyResult};

/// Where a [`Dispatch`] is in its life.
///
/// `Created → Dispatching → {Sent | AwaitingReply} → {Completed | TimedOut}`.
/// A `send()` after shutdown ends in `Discarded` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// Returned from `publish()`, nothing delivered yet.
    Created,
    /// Subscribers are being invoked.
    Dispatching,
    /// `send()` finished delivering (or enqueueing).
    Sent,
    /// `get()` delivered the CALL and is waiting for its REPLY.
    AwaitingReply,
    /// The REPLY arrived.
    Completed,
    /// The wait ended without a REPLY.
    TimedOut,
    /// The broker was shut down, so nothing was delivered.
    Discarded,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::Created => "CREATED",
            DispatchState::Dispatching => "DISPATCHING",
            DispatchState::Sent => "SENT",
            DispatchState::AwaitingReply => "AWAITING_REPLY",
            DispatchState::Completed => "COMPLETED",
            DispatchState::TimedOut => "TIMED_OUT",
            DispatchState::Discarded => "DISCARDED",
        };
        f.write_str(name)
    }
}

/// A validated message on its way out, returned by
/// [`Broker::publish`](crate::common::Broker::publish).
///
/// Nothing is delivered until one of the terminal operations runs:
/// [`send`](Self::send) for fire-and-forget or [`get`](Self::get) to await
/// the correlated REPLY.
#[must_use = "a Dispatch does nothing until `send()` or `get()` is called"]
pub struct Dispatch {
    broker: Broker,
    message: Message,
    state: DispatchState,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("message", &self.message)
            .field("state", &self.state)
            .finish()
    }
}

impl Dispatch {
    pub(crate) fn new(broker: Broker, message: Message) -> Self {
        trace!(
            message_id = message.id(),
            topic = message.topic(),
            action = message.action(),
            state = %DispatchState::Created,
            "Dispatch created"
        );
        Self {
            broker,
            message,
            state: DispatchState::Created,
        }
    }

    /// The message being dispatched.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The current state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    fn transition(&mut self, next: DispatchState) {
        trace!(
            message_id = self.message.id(),
            from = %self.state,
            state = %next,
            "Dispatch state"
        );
        self.state = next;
    }

    /// Delivers the message without waiting for a reply.
    ///
    /// In inline mode every subscriber has run by the time this returns; in
    /// queued mode the message has been enqueued. Subscriber failures are
    /// logged, never returned. After shutdown the message is discarded with a
    /// warning.
    ///
    /// Returns the final state: [`DispatchState::Sent`] or
    /// [`DispatchState::Discarded`].
    #[instrument(skip(self), fields(topic = self.message.topic(), action = self.message.action(), message_id = self.message.id()))]
    pub fn send(mut self) -> DispatchState {
        if self.broker.is_shutdown() {
            warn!("Broker is shut down; message discarded");
            self.transition(DispatchState::Discarded);
            return self.state;
        }
        self.transition(DispatchState::Dispatching);
        self.broker.deliver(self.message.clone());
        self.transition(DispatchState::Sent);
        self.state
    }

    /// Delivers a CALL and waits for its REPLY using the broker's default
    /// [`message_timeout`](crate::common::Broker::message_timeout).
    pub async fn get(self) -> ReplyResult {
        let timeout = self.broker.message_timeout();
        self.get_within(timeout).await
    }

    /// Delivers a CALL and waits up to `timeout` for its REPLY.
    ///
    /// The waiter is registered before any subscriber runs, so a responder
    /// that replies synchronously from inside its callback is still matched.
    ///
    /// An absent reply is not an error. The result is invalid with one of:
    ///
    /// * [`InvalidReason::TimedOut`]: the deadline passed.
    /// * [`InvalidReason::NoSubscribers`]: nobody is subscribed and the broker
    ///   is configured to fail fast. Nothing is delivered.
    /// * [`InvalidReason::Shutdown`]: the broker is or became shut down.
    /// * [`InvalidReason::NotACall`]: the message is a REPLY. It is still
    ///   delivered, as by `send()`.
    /// * [`InvalidReason::DuplicatePendingReply`]: another `get()` is already
    ///   waiting on this message id. Nothing is delivered.
    ///
    /// Dropping the returned future before it completes removes the waiter.
    #[instrument(skip(self), fields(topic = self.message.topic(), action = self.message.action(), message_id = self.message.id()))]
    pub async fn get_within(mut self, timeout: Duration) -> ReplyResult {
        if self.message.is_reply() {
            warn!("get() called on a reply; delivering without waiting");
            let state = self.send();
            trace!(%state, "Reply delivered");
            return ReplyResult::Invalid(InvalidReason::NotACall);
        }
        if self.broker.is_shutdown() {
            warn!("Broker is shut down; call not delivered");
            return ReplyResult::Invalid(InvalidReason::Shutdown);
        }

        let waiter = match self.broker.register_waiter(self.message.id(), timeout) {
            Ok(waiter) => waiter,
            Err(err) => {
                warn!(error = %err, "Call not delivered");
                let reason = match err {
                    MessageError::Shutdown => InvalidReason::Shutdown,
                    _ => InvalidReason::DuplicatePendingReply,
                };
                return ReplyResult::Invalid(reason);
            }
        };

        if self.broker.fail_fast_without_subscribers()
            && self
                .broker
                .subscriber_count(self.message.topic(), self.message.action())
                == 0
        {
            debug!("No subscribers for call; not waiting");
            return ReplyResult::Invalid(InvalidReason::NoSubscribers);
        }

        self.transition(DispatchState::Dispatching);
        self.broker.deliver(self.message.clone());
        self.transition(DispatchState::AwaitingReply);

        let result = waiter.wait().await;
        match result.invalid_reason() {
            None => self.transition(DispatchState::Completed),
            Some(reason) => {
                debug!(%reason, "Call ended without a reply");
                self.transition(DispatchState::TimedOut);
            }
        }
        result
    }
}
