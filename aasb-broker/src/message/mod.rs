//! The AASB message model, its wire codec, and the dispatch handle returned by
//! [`Broker::publish`](crate::common::Broker::publish).
//!
//! # Key Components
//!
//! *   [`Message`]: a `(topic, action)` addressed CALL or REPLY with a JSON
//!     object payload.
//! *   [`codec`]: conversion between a [`Message`] and its JSON envelope.
//! *   [`Dispatch`]: offers `send()` and `get()` for one published message.
//! *   [`ReplyResult`]: what `get()` produced, valid or not.
//! *   [`MessageError`]: errors on the publish and decode paths.

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


// --- Public Re-exports ---
pub use dispatch::{Dispatch, DispatchState};
pub use message::{Direction, Message};
pub use message_error::MessageError;
pub use reply::{InvalidReason, ReplyResult};

// --- Crate-Internal Re-exports ---
pub(crate) use message::generate_id;

// --- Submodules ---

/// Envelope serialization and deserialization.
pub(crate) mod codec;
/// Defines [`Dispatch`] and [`DispatchState`].
mod dispatch;
/// Defines [`Message`] and [`Direction`].
#[allow(clippy::module_inception)]
mod message;
/// Defines [`MessageError`].
mod message_error;
/// Defines [`ReplyResult`] and [`InvalidReason`].
mod reply;
