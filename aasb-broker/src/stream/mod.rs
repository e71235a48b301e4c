//! Out-of-band byte streams.
//!
//! Large binary payloads such as audio never go inside a JSON envelope. A
//! producer registers a [`StreamHandler`] with the [`StreamRegistry`],
//! publishes a CALL whose payload carries the returned `streamId`, and the
//! consumer opens that id as a [`MessageStream`] to move the bytes.

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
pub use buffer::ByteBufferStream;
pub use registry::{MessageStream, StreamRegistry};
pub use stream_error::StreamError;
pub use stream_handler::{StreamHandler, StreamMode};

// --- Submodules ---

/// Defines [`ByteBufferStream`].
mod buffer;
/// Defines [`StreamRegistry`] and [`MessageStream`].
mod registry;
/// Defines [`StreamError`].
mod stream_error;
/// Defines [`StreamHandler`] and [`StreamMode`].
mod stream_handler;
