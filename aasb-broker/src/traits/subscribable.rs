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


use std::sync::Arc;

use crate::common::{Broker, SubscriptionHandle};
use crate::message::{Message, MessageError};
use crate::traits::AasbMessage;

/// Typed subscription to [`AasbMessage`] payloads.
///
/// The handler receives both the raw [`Message`], needed to reply, and the
/// decoded payload. Only CALLs reach a typed handler: a REPLY on the same
/// `(topic, action)` is skipped, so a responder never sees its own answer.
/// Use [`Broker::subscribe`] to observe REPLY traffic. A payload that fails
/// to decode is reported as a failure of that one subscriber, like any other
/// handler error.
pub trait Subscribable {
    /// Subscribes `handler` to `M::TOPIC` / `M::ACTION`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if the address is empty.
    fn subscribe_to<M, F>(&self, handler: F) -> Result<SubscriptionHandle, MessageError>
    where
        M: AasbMessage,
        F: Fn(&Message, M) -> anyhow::Result<()> + Send + Sync + 'static;

    /// Subscribes `handler` on behalf of `owner`, holding it weakly.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if the address is empty.
    fn subscribe_to_weak<T, M, F>(
        &self,
        owner: &Arc<T>,
        handler: F,
    ) -> Result<SubscriptionHandle, MessageError>
    where
        T: Send + Sync + 'static,
        M: AasbMessage,
        F: Fn(&T, &Message, M) -> anyhow::Result<()> + Send + Sync + 'static;
}

impl Subscribable for Broker {
    fn subscribe_to<M, F>(&self, handler: F) -> Result<SubscriptionHandle, MessageError>
    where
        M: AasbMessage,
        F: Fn(&Message, M) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(M::TOPIC, M::ACTION, move |message: &Message| {
            if message.is_reply() {
                return Ok(());
            }
            let payload = M::from_message(message)?;
            handler(message, payload)
        })
    }

    fn subscribe_to_weak<T, M, F>(
        &self,
        owner: &Arc<T>,
        handler: F,
    ) -> Result<SubscriptionHandle, MessageError>
    where
        T: Send + Sync + 'static,
        M: AasbMessage,
        F: Fn(&T, &Message, M) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_weak(owner, M::TOPIC, M::ACTION, move |owner: &T, message: &Message| {
            if message.is_reply() {
                return Ok(());
            }
            let payload = M::from_message(message)?;
            handler(owner, message, payload)
        })
    }
}
