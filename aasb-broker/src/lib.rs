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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # AASB Broker
//!
//! The message bus that bridges an embedded voice-assistant engine to
//! platform-specific handlers. Every interaction between the two sides is a
//! [`Message`](prelude::Message) addressed by `(topic, action)` and carried in
//! a JSON envelope.
//!
//! ## Key Concepts
//!
//! - **Broker (`Broker`)**: owns the subscription table and the table of
//!   callers waiting for replies. Cheap to clone; every clone is the same bus.
//! - **Dispatch**: [`Broker::publish`](prelude::Broker::publish) validates a
//!   message and returns a `Dispatch` offering `send()` (fire-and-forget) and
//!   `get()` (await the correlated REPLY, bounded by a timeout).
//! - **Lifetime guard**: `subscribe_weak` binds a callback to a `Weak` owner,
//!   so a long-lived broker never keeps a domain adapter alive and never calls
//!   into one that is gone.
//! - **Streams (`StreamRegistry`)**: bulk bytes such as audio move through
//!   registered stream handlers identified by a `streamId`, never inside the
//!   envelope.
//! - **Runtime (`AasbApp`, `AasbRuntime`)**: loads configuration, constructs
//!   the broker, and initializes domain adapters.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aasb_broker::prelude::*;
//!
//! #[aasb_message(topic = "PhoneCallController", action = "create_call_id")]
//! struct CreateCallId {}
//!
//! #[aasb_message(topic = "PhoneCallController", action = "create_call_id")]
//! struct CreateCallIdReply {
//!     call_id: String,
//! }
//!
//! let broker = Broker::default();
//! broker.subscribe_to(|call: &Message, _request: CreateCallId| {
//!     let reply = CreateCallIdReply { call_id: "abc-123".into() }.to_reply(call)?;
//!     // a real adapter holds a WeakBroker instead of capturing the broker
//!     Ok(())
//! })?;
//! let result = broker.request(&CreateCallId {}).await?;
//! ```

extern crate self as aasb_broker;

/// Broker, registries, configuration, and runtime.
pub(crate) mod common;

/// The message model, its wire codec, and dispatch.
pub(crate) mod message;

/// Out-of-band byte streams.
pub(crate) mod stream;

/// Traits for typed messages, typed subscription, and domain adapters.
pub(crate) mod traits;

/// Envelope serialization.
///
/// The wire form is a JSON object with a `header` (`version`, `messageType`,
/// `id`, and a `messageDescription` holding `topic`, `action`, and, for
/// replies, `replyToId`) and a `payload` object.
pub mod codec {
    pub use crate::message::codec::{deserialize, serialize, DEFAULT_VERSION};
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `aasb-macro`)
/// *   [`aasb_macro::aasb_message`]: Attribute macro binding a payload type to a topic and action.
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html)
/// *   [`serde_json::json`] and [`serde_json::Value`] for building payloads.
///
/// ## Core Types
/// *   [`crate::common::Broker`]: The message broker.
/// *   [`crate::common::WeakBroker`]: Non-owning broker handle held by adapters.
/// *   [`crate::common::SubscriptionHandle`]: Token returned by `subscribe`, used to unsubscribe.
/// *   [`crate::common::BrokerStats`]: Dispatch counters.
/// *   [`crate::common::AasbApp`] / [`crate::common::AasbRuntime`]: Startup and shutdown.
/// *   [`crate::common::AasbConfig`] / [`crate::common::EngineConfiguration`]: Configuration.
/// *   [`crate::message::Message`], [`crate::message::Direction`]: The message model.
/// *   [`crate::message::Dispatch`], [`crate::message::DispatchState`]: Publishing.
/// *   [`crate::message::ReplyResult`], [`crate::message::InvalidReason`]: Outcome of `get()`.
/// *   [`crate::stream::StreamRegistry`], [`crate::stream::StreamHandler`],
///     [`crate::stream::MessageStream`], [`crate::stream::ByteBufferStream`]: Streams.
/// *   [`crate::traits::AasbMessage`], [`crate::traits::Subscribable`],
///     [`crate::traits::Requester`], [`crate::traits::DomainAdapter`]: Traits.
pub mod prelude {
    pub use aasb_macro::*;

    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};

    pub use crate::common::{
        AasbApp, AasbConfig, AasbRuntime, BehaviorConfig, Broker, BrokerStats, ConfigError,
        DispatchConfig, DispatchMode, DomainSettings, EngineConfiguration, MessageBrokerSettings,
        SubscriptionHandle, TimeoutConfig, WeakBroker,
    };
    pub use crate::message::{
        Direction, Dispatch, DispatchState, InvalidReason, Message, MessageError, ReplyResult,
    };
    pub use crate::stream::{
        ByteBufferStream, MessageStream, StreamError, StreamHandler, StreamMode, StreamRegistry,
    };
    pub use crate::traits::{AasbMessage, DomainAdapter, Requester, Subscribable};
}
