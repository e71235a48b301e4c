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

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::message::{Message, MessageError};

/// Why a [`ReplyResult`] carries no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InvalidReason {
    /// No REPLY arrived before the deadline.
    TimedOut,
    /// Nobody is subscribed to the CALL, so no REPLY can come.
    NoSubscribers,
    /// The broker shut down before or while waiting.
    Shutdown,
    /// `get()` was called on a message that is itself a REPLY.
    NotACall,
    /// The waiter was discarded without being fulfilled.
    Abandoned,
    /// Another `get()` is already waiting on the same CALL id.
    DuplicatePendingReply,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidReason::TimedOut => "timed out waiting for reply",
            InvalidReason::NoSubscribers => "no subscribers for call",
            InvalidReason::Shutdown => "broker is shut down",
            InvalidReason::NotACall => "message is not a call",
            InvalidReason::Abandoned => "reply waiter was abandoned",
            InvalidReason::DuplicatePendingReply => "a reply is already pending for this call",
        };
        f.write_str(text)
    }
}

/// The outcome of [`Dispatch::get`](crate::message::Dispatch::get).
///
/// A missing responder is routine, so an invalid result is an ordinary value
/// rather than an error. Check [`is_valid`](Self::is_valid) before reading the
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyResult {
    /// The correlated REPLY arrived.
    Completed(Message),
    /// No reply is available.
    Invalid(InvalidReason),
}

impl ReplyResult {
    /// Returns `true` when a REPLY was received.
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, ReplyResult::Completed(_))
    }

    /// The REPLY message, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            ReplyResult::Completed(message) => Some(message),
            ReplyResult::Invalid(_) => None,
        }
    }

    /// Consumes the result, returning the REPLY message if any.
    pub fn into_message(self) -> Option<Message> {
        match self {
            ReplyResult::Completed(message) => Some(message),
            ReplyResult::Invalid(_) => None,
        }
    }

    /// The REPLY payload, if any.
    pub fn payload(&self) -> Option<&Value> {
        self.message().map(Message::payload)
    }

    /// Why there is no reply, or `None` for a valid result.
    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        match self {
            ReplyResult::Completed(_) => None,
            ReplyResult::Invalid(reason) => Some(*reason),
        }
    }

    /// Decodes the REPLY payload.
    ///
    /// Returns `Ok(None)` for an invalid result.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::MalformedEnvelope`] when the payload does not
    /// decode into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<Option<T>, MessageError> {
        self.message().map(|message| message.payload_as::<T>()).transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn invalid_result_has_no_payload() {
        let result = ReplyResult::Invalid(InvalidReason::TimedOut);
        assert!(!result.is_valid());
        assert!(result.payload().is_none());
        assert_eq!(result.invalid_reason(), Some(InvalidReason::TimedOut));
    }

    #[test]
    fn completed_result_decodes_payload() -> anyhow::Result<()> {
        #[derive(serde::Deserialize, PartialEq, Debug)]
        #[serde(rename_all = "camelCase")]
        struct CallId {
            call_id: String,
        }

        let call = Message::call("PhoneCallController", "create_call_id", json!({}));
        let result = ReplyResult::Completed(Message::reply_to(&call, json!({"callId": "abc-123"})));
        assert!(result.is_valid());
        assert_eq!(
            result.payload_as::<CallId>()?,
            Some(CallId {
                call_id: "abc-123".into()
            })
        );
        Ok(())
    }
}
