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
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::message::codec::DEFAULT_VERSION;
use crate::message::MessageError;

/// Generates a fresh identifier for a message or a stream.
pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Whether a message is an invocation or the answer to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// An invocation. Carries no `replyToId`.
    Call,
    /// A correlated response. Its `replyToId` names the CALL it answers.
    Reply,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Call => f.write_str("CALL"),
            Direction::Reply => f.write_str("REPLY"),
        }
    }
}

/// A single AASB message: a `(topic, action)` address, an id, optional reply
/// correlation, and a JSON object payload.
///
/// The direction is not stored separately. A message is a
/// [`Direction::Reply`] exactly when it has a `reply_to_id`, which keeps the
/// two from ever disagreeing.
///
/// A `null` payload is normalised to an empty object, so `payload()` is always
/// the value that goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: String,
    topic: String,
    action: String,
    reply_to_id: Option<String>,
    payload: Value,
    version: String,
}

impl Message {
    /// Creates a CALL with a freshly generated id.
    pub fn call(topic: impl Into<String>, action: impl Into<String>, payload: Value) -> Self {
        Self {
            id: generate_id(),
            topic: topic.into(),
            action: action.into(),
            reply_to_id: None,
            payload: normalize_payload(payload),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Creates a REPLY answering `call`, addressed to the same topic and action.
    pub fn reply_to(call: &Message, payload: Value) -> Self {
        Self::reply(
            call.topic.clone(),
            call.action.clone(),
            call.id.clone(),
            payload,
        )
    }

    /// Creates a REPLY with an explicit address and correlation id.
    pub fn reply(
        topic: impl Into<String>,
        action: impl Into<String>,
        reply_to_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: generate_id(),
            topic: topic.into(),
            action: action.into(),
            reply_to_id: Some(reply_to_id.into()),
            payload: normalize_payload(payload),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Replaces the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Replaces the header version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub(crate) fn from_parts(
        id: String,
        topic: String,
        action: String,
        reply_to_id: Option<String>,
        payload: Value,
        version: String,
    ) -> Self {
        Self {
            id,
            topic,
            action,
            reply_to_id,
            payload: normalize_payload(payload),
            version,
        }
    }

    /// The unique id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The functional domain, e.g. `"PhoneCallController"`.
    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The operation within the topic, e.g. `"dial"`.
    #[inline]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The id of the CALL this message answers, present only on replies.
    #[inline]
    pub fn reply_to_id(&self) -> Option<&str> {
        self.reply_to_id.as_deref()
    }

    /// The payload object.
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The header version.
    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns [`Direction::Reply`] when the message carries a `replyToId`.
    pub fn direction(&self) -> Direction {
        if self.reply_to_id.is_some() {
            Direction::Reply
        } else {
            Direction::Call
        }
    }

    /// Returns `true` for a CALL.
    #[inline]
    pub fn is_call(&self) -> bool {
        self.direction() == Direction::Call
    }

    /// Returns `true` for a REPLY.
    #[inline]
    pub fn is_reply(&self) -> bool {
        self.direction() == Direction::Reply
    }

    /// Decodes the payload into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::MalformedEnvelope`] when the payload does not
    /// match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        T::deserialize(&self.payload).map_err(|err| {
            MessageError::MalformedEnvelope(format!(
                "payload of {}:{} does not decode: {err}",
                self.topic, self.action
            ))
        })
    }

    /// The `streamId` field of the payload, if the message references a stream.
    pub fn stream_id(&self) -> Option<&str> {
        self.payload.get("streamId").and_then(Value::as_str)
    }

    /// Checks that the message can be dispatched.
    pub(crate) fn validate(&self) -> Result<(), MessageError> {
        if self.id.is_empty() {
            return Err(MessageError::InvalidMessage("message id is empty".into()));
        }
        if self.topic.is_empty() {
            return Err(MessageError::InvalidMessage(format!(
                "message {} has an empty topic",
                self.id
            )));
        }
        if self.action.is_empty() {
            return Err(MessageError::InvalidMessage(format!(
                "message {} has an empty action",
                self.id
            )));
        }
        if matches!(self.reply_to_id.as_deref(), Some("")) {
            return Err(MessageError::InvalidMessage(format!(
                "reply {} has an empty replyToId",
                self.id
            )));
        }
        if !self.payload.is_object() {
            return Err(MessageError::InvalidMessage(format!(
                "payload of {} is not an object",
                self.id
            )));
        }
        Ok(())
    }
}

fn normalize_payload(payload: Value) -> Value {
    match payload {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reply_to_id {
            Some(reply_to_id) => write!(
                f,
                "{} {}:{} [{}] -> {}",
                self.direction(),
                self.topic,
                self.action,
                self.id,
                reply_to_id
            ),
            None => write!(
                f,
                "{} {}:{} [{}]",
                self.direction(),
                self.topic,
                self.action,
                self.id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn call_ids_are_unique() {
        let first = Message::call("Audio", "play", json!({}));
        let second = Message::call("Audio", "play", json!({}));
        assert_ne!(first.id(), second.id());
        assert_eq!(first.direction(), Direction::Call);
    }

    #[test]
    fn reply_to_copies_address_and_correlates() {
        let call = Message::call("PhoneCallController", "create_call_id", json!({}));
        let reply = Message::reply_to(&call, json!({"callId": "abc-123"}));
        assert_eq!(reply.topic(), "PhoneCallController");
        assert_eq!(reply.action(), "create_call_id");
        assert_eq!(reply.reply_to_id(), Some(call.id()));
        assert!(reply.is_reply());
    }

    #[test]
    fn null_payload_becomes_empty_object() {
        let message = Message::call("Audio", "stop", Value::Null);
        assert_eq!(message.payload(), &json!({}));
    }

    #[test]
    fn validate_rejects_missing_address() {
        let no_topic = Message::call("", "dial", json!({}));
        assert!(matches!(
            no_topic.validate(),
            Err(MessageError::InvalidMessage(_))
        ));

        let no_action = Message::call("PhoneCallController", "", json!({}));
        assert!(matches!(
            no_action.validate(),
            Err(MessageError::InvalidMessage(_))
        ));

        let no_id = Message::call("PhoneCallController", "dial", json!({})).with_id("");
        assert!(matches!(no_id.validate(), Err(MessageError::InvalidMessage(_))));
    }

    #[test]
    fn validate_rejects_non_object_payload() {
        let message = Message::call("Audio", "volume", json!(42));
        assert!(message.validate().is_err());
    }

    #[test]
    fn stream_id_reads_payload_field() {
        let message = Message::call("AudioOutput", "prepare", json!({"streamId": "s-1"}));
        assert_eq!(message.stream_id(), Some("s-1"));
        assert_eq!(Message::call("AudioOutput", "play", json!({})).stream_id(), None);
    }

    #[test]
    fn payload_as_reports_mismatch() {
        #[derive(serde::Deserialize)]
        struct Dial {
            #[allow(dead_code)]
            callee: String,
        }
        let message = Message::call("PhoneCallController", "dial", json!({"callee": 7}));
        assert!(matches!(
            message.payload_as::<Dial>(),
            Err(MessageError::MalformedEnvelope(_))
        ));
    }
}
