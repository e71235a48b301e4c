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
use std::io;

/// The single direction a stream supports, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamMode {
    /// The consumer reads bytes from the handler.
    Read,
    /// The consumer writes bytes into the handler.
    Write,
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamMode::Read => f.write_str("READ"),
            StreamMode::Write => f.write_str("WRITE"),
        }
    }
}

/// A byte source or sink registered under a stream id.
///
/// The registering component owns the handler; the
/// [`StreamRegistry`](super::StreamRegistry) only keeps a weak lookup. Methods
/// take `&self`, so implementations use interior mutability. Only one consumer
/// opens a stream at a time.
pub trait StreamHandler: Send + Sync + 'static {
    /// The direction this handler supports.
    fn mode(&self) -> StreamMode;

    /// Reads up to `buf.len()` bytes. `Ok(0)` means end of data.
    ///
    /// A source with no bytes available yet but more to come may return
    /// [`io::ErrorKind::WouldBlock`].
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let _ = buf;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "stream does not support reading",
        ))
    }

    /// Writes bytes from `data`, returning how many were accepted.
    fn write(&self, data: &[u8]) -> io::Result<usize> {
        let _ = data;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "stream does not support writing",
        ))
    }

    /// Returns `true` once no more bytes will be produced or accepted.
    fn is_closed(&self) -> bool;

    /// Closes the stream.
    fn close(&self);
}
