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


use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::message::{Message, MessageError};

/// A typed payload bound to one `(topic, action)` address.
///
/// Usually implemented through the `#[aasb_message]` attribute:
///
/// ```rust,ignore
/// #[aasb_message(topic = "PhoneCallController", action = "dial")]
/// pub struct Dial {
///     pub call_id: String,
///     pub callee: String,
/// }
/// ```
///
/// The payload must serialize to a JSON object.
pub trait AasbMessage: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The topic this payload travels under.
    const TOPIC: &'static str;
    /// The action this payload travels under.
    const ACTION: &'static str;

    /// Serializes `self` into a payload value.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if serialization fails.
    fn to_payload(&self) -> Result<Value, MessageError> {
        serde_json::to_value(self).map_err(|err| {
            MessageError::InvalidMessage(format!(
                "{}:{} payload does not serialize: {err}",
                Self::TOPIC,
                Self::ACTION
            ))
        })
    }

    /// Builds a CALL carrying `self`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if serialization fails.
    fn to_message(&self) -> Result<Message, MessageError> {
        Ok(Message::call(Self::TOPIC, Self::ACTION, self.to_payload()?))
    }

    /// Builds a REPLY to `call` carrying `self`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMessage`] if serialization fails.
    fn to_reply(&self, call: &Message) -> Result<Message, MessageError> {
        Ok(Message::reply(
            Self::TOPIC,
            Self::ACTION,
            call.id(),
            self.to_payload()?,
        ))
    }

    /// Decodes the payload of `message`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::MalformedEnvelope`] if the payload does not
    /// match `Self`.
    fn from_message(message: &Message) -> Result<Self, MessageError> {
        message.payload_as()
    }
}
