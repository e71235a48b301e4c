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


//! JSON wire form of a [`Message`].
//!
//! ```text
//! {
//!   "header": {
//!     "version": "4.0",
//!     "messageType": "Publish" | "Reply",
//!     "id": "<uuid>",
//!     "messageDescription": {
//!       "topic": "PhoneCallController",
//!       "action": "create_call_id",
//!       "replyToId": "<uuid>"            // replies only
//!     }
//!   },
//!   "payload": { ... }
//! }
//! ```
//!
//! `version` and `messageType` are optional on decode. When `messageType` is
//! present it must agree with the presence of `replyToId`. A missing or `null`
//! payload decodes as an empty object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Message, MessageError};

/// Header version written on every encoded message.
pub const DEFAULT_VERSION: &str = "4.0";

const MESSAGE_TYPE_PUBLISH: &str = "Publish";
const MESSAGE_TYPE_REPLY: &str = "Reply";

#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    header: WireHeader,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_type: Option<String>,
    id: String,
    message_description: WireDescription,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDescription {
    topic: String,
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reply_to_id: Option<String>,
}

/// Encodes a message into its wire string.
///
/// # Errors
///
/// Returns [`MessageError::InvalidMessage`] when the message would not survive
/// a decode (empty id, topic, or action, or a non-object payload).
pub fn serialize(message: &Message) -> Result<String, MessageError> {
    message.validate()?;
    let envelope = WireEnvelope {
        header: WireHeader {
            version: Some(message.version().to_string()),
            message_type: Some(
                if message.is_reply() {
                    MESSAGE_TYPE_REPLY
                } else {
                    MESSAGE_TYPE_PUBLISH
                }
                .to_string(),
            ),
            id: message.id().to_string(),
            message_description: WireDescription {
                topic: message.topic().to_string(),
                action: message.action().to_string(),
                reply_to_id: message.reply_to_id().map(str::to_string),
            },
        },
        payload: Some(message.payload().clone()),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decodes a wire string into a message.
///
/// Decoding is all-or-nothing: either every required field is present and
/// well formed, or nothing is produced.
///
/// # Errors
///
/// Returns [`MessageError::MalformedEnvelope`] when the input is not JSON, a
/// required field is missing or empty, `messageType` contradicts `replyToId`,
/// or the payload is not an object.
pub fn deserialize(input: &str) -> Result<Message, MessageError> {
    let envelope: WireEnvelope = serde_json::from_str(input)?;
    let WireEnvelope { header, payload } = envelope;
    let WireHeader {
        version,
        message_type,
        id,
        message_description,
    } = header;
    let WireDescription {
        topic,
        action,
        reply_to_id,
    } = message_description;

    match (message_type.as_deref(), reply_to_id.is_some()) {
        (None, _) | (Some(MESSAGE_TYPE_PUBLISH), false) | (Some(MESSAGE_TYPE_REPLY), true) => {}
        (Some(MESSAGE_TYPE_PUBLISH), true) => {
            return Err(MessageError::MalformedEnvelope(format!(
                "message {id} is a Publish but carries a replyToId"
            )));
        }
        (Some(MESSAGE_TYPE_REPLY), false) => {
            return Err(MessageError::MalformedEnvelope(format!(
                "message {id} is a Reply without a replyToId"
            )));
        }
        (Some(other), _) => {
            return Err(MessageError::MalformedEnvelope(format!(
                "message {id} has unknown messageType {other:?}"
            )));
        }
    }

    let payload = match payload {
        None | Some(Value::Null) => Value::Null,
        Some(value @ Value::Object(_)) => value,
        Some(_) => {
            return Err(MessageError::MalformedEnvelope(format!(
                "payload of message {id} is not an object"
            )));
        }
    };

    let message = Message::from_parts(
        id,
        topic,
        action,
        reply_to_id,
        payload,
        version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
    );
    message.validate().map_err(|err| match err {
        MessageError::InvalidMessage(reason) => MessageError::MalformedEnvelope(reason),
        other => other,
    })?;
    Ok(message)
}
