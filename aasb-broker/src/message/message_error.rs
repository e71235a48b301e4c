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


use thiserror::Error;

/// Errors raised on the publish path and by the envelope codec.
///
/// These are the only broker errors that reach a publisher. Failures inside a
/// subscriber callback are isolated and logged instead; see
/// [`Broker::publish`](crate::common::Broker::publish).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageError {
    /// The message is missing its id, topic, or action, or carries an empty
    /// `replyToId`. Raised before any dispatch attempt.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    /// The wire form could not be decoded into a [`Message`](super::Message).
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    /// A waiter is already registered for this CALL id.
    #[error("a reply is already pending for message {0}")]
    DuplicatePendingReply(String),
    /// The broker has shut down and takes no new reply waiters.
    #[error("the broker is shut down")]
    Shutdown,
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        MessageError::MalformedEnvelope(err.to_string())
    }
}
