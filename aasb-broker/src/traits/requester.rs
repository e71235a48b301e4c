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


use std::time::Duration;

use async_trait::async_trait;

use crate::common::Broker;
use crate::message::{DispatchState, MessageError, ReplyResult};
use crate::traits::AasbMessage;

/// Typed publishing: fire-and-forget notifications and awaited requests.
#[async_trait]
pub trait Requester: Send + Sync {
    /// Publishes `message` as a CALL and waits for its REPLY using the default
    /// message timeout.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if the message cannot be
    /// built. A missing reply is an invalid [`ReplyResult`], not an error.
    async fn request<M: AasbMessage>(&self, message: &M) -> Result<ReplyResult, MessageError>;

    /// Like [`request`](Self::request) with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if the message cannot be built.
    async fn request_within<M: AasbMessage>(
        &self,
        message: &M,
        timeout: Duration,
    ) -> Result<ReplyResult, MessageError>;

    /// Publishes `message` as a CALL without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if the message cannot be built.
    fn notify<M: AasbMessage>(&self, message: &M) -> Result<DispatchState, MessageError>;
}

#[async_trait]
impl Requester for Broker {
    async fn request<M: AasbMessage>(&self, message: &M) -> Result<ReplyResult, MessageError> {
        let dispatch = self.publish(message.to_message()?)?;
        Ok(dispatch.get().await)
    }

    async fn request_within<M: AasbMessage>(
        &self,
        message: &M,
        timeout: Duration,
    ) -> Result<ReplyResult, MessageError> {
        let dispatch = self.publish(message.to_message()?)?;
        Ok(dispatch.get_within(timeout).await)
    }

    fn notify<M: AasbMessage>(&self, message: &M) -> Result<DispatchState, MessageError> {
        Ok(self.publish(message.to_message()?)?.send())
    }
}
