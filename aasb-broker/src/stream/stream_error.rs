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

use crate::stream::StreamMode;

/// Stream registry misuse, reported to the caller of the registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StreamError {
    /// No live handler is registered under the id.
    #[error("unknown stream id {0}")]
    UnknownStreamId(String),
    /// A live handler is already registered under the id.
    #[error("stream id {0} is already registered")]
    DuplicateStreamId(String),
    /// The stream was opened in the direction it does not support.
    #[error("stream {stream_id} is registered for {registered}, cannot open for {requested}")]
    ModeMismatch {
        /// The stream id.
        stream_id: String,
        /// The mode passed to `open_stream`.
        requested: StreamMode,
        /// The mode the handler was registered with.
        registered: StreamMode,
    },
    /// Another consumer already has the stream open.
    #[error("stream {0} is already open")]
    StreamInUse(String),
    /// Stream ids must be non-empty.
    #[error("stream id must not be empty")]
    InvalidStreamId,
}
