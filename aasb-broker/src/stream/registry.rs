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
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::message::generate_id;
use crate::stream::{StreamError, StreamHandler, StreamMode};

struct StreamEntry {
    handler: Weak<dyn StreamHandler>,
    mode: StreamMode,
    token: u64,
    open: bool,
}

#[derive(Default)]
struct Streams {
    next_token: AtomicU64,
    entries: DashMap<String, StreamEntry>,
}

impl Streams {
    fn remove(&self, id: &str, token: u64) -> bool {
        self.entries
            .remove_if(id, |_, entry| entry.token == token)
            .is_some()
    }

    fn release(&self, id: &str, token: u64) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if entry.token == token {
                entry.open = false;
            }
        }
    }
}

/// Maps stream ids to the handlers that move their bytes.
///
/// Bulk data never travels inside an envelope. A producer registers a handler,
/// puts the returned id in a CALL payload as `streamId`, and the consumer
/// opens the id to read or write.
///
/// Only a weak reference to each handler is kept. A handler whose owner has
/// dropped it resolves as [`StreamError::UnknownStreamId`]. Clones share the
/// same table.
#[derive(Clone, Default)]
pub struct StreamRegistry {
    inner: Arc<Streams>,
}

impl fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("streams", &self.inner.entries.len())
            .finish()
    }
}

impl StreamRegistry {
    /// Registers `handler` under a freshly generated id and returns the id.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::DuplicateStreamId`] only if the generated id
    /// collides with a live registration.
    pub fn register<H: StreamHandler>(&self, handler: &Arc<H>) -> Result<String, StreamError> {
        let id = generate_id();
        self.register_stream_handler(&id, handler)?;
        Ok(id)
    }

    /// Registers `handler` under a caller-chosen `stream_id`.
    ///
    /// An id whose previous handler has been dropped may be reused.
    ///
    /// # Errors
    ///
    /// * [`StreamError::InvalidStreamId`] if `stream_id` is empty.
    /// * [`StreamError::DuplicateStreamId`] if a live handler already uses it.
    pub fn register_stream_handler<H: StreamHandler>(
        &self,
        stream_id: &str,
        handler: &Arc<H>,
    ) -> Result<(), StreamError> {
        if stream_id.is_empty() {
            return Err(StreamError::InvalidStreamId);
        }
        let weak: Weak<dyn StreamHandler> = Arc::downgrade(handler) as Weak<dyn StreamHandler>;
        let entry = StreamEntry {
            handler: weak,
            mode: handler.mode(),
            token: self.inner.next_token.fetch_add(1, Ordering::Relaxed),
            open: false,
        };
        let mode = entry.mode;
        match self.inner.entries.entry(stream_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().handler.strong_count() > 0 {
                    return Err(StreamError::DuplicateStreamId(stream_id.to_string()));
                }
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        debug!(stream_id, %mode, "Stream handler registered");
        Ok(())
    }

    /// Opens a registered stream for the single consumer.
    ///
    /// # Errors
    ///
    /// * [`StreamError::UnknownStreamId`] if nothing live is registered under
    ///   `stream_id`.
    /// * [`StreamError::ModeMismatch`] if `mode` differs from the handler's.
    /// * [`StreamError::StreamInUse`] if the stream is already open.
    pub fn open_stream(&self, stream_id: &str, mode: StreamMode) -> Result<MessageStream, StreamError> {
        let opened = match self.inner.entries.get_mut(stream_id) {
            None => return Err(StreamError::UnknownStreamId(stream_id.to_string())),
            Some(mut entry) => match entry.handler.upgrade() {
                None => Err(entry.token),
                Some(_) if entry.mode != mode => {
                    return Err(StreamError::ModeMismatch {
                        stream_id: stream_id.to_string(),
                        requested: mode,
                        registered: entry.mode,
                    });
                }
                Some(_) if entry.open => {
                    return Err(StreamError::StreamInUse(stream_id.to_string()));
                }
                Some(handler) => {
                    entry.open = true;
                    Ok((handler, entry.token))
                }
            },
        };
        match opened {
            Ok((handler, token)) => {
                trace!(stream_id, %mode, "Stream opened");
                Ok(MessageStream {
                    id: stream_id.to_string(),
                    mode,
                    token,
                    handler,
                    streams: Arc::downgrade(&self.inner),
                })
            }
            Err(token) => {
                self.inner.remove(stream_id, token);
                debug!(stream_id, "Stream handler was dropped; purged");
                Err(StreamError::UnknownStreamId(stream_id.to_string()))
            }
        }
    }

    /// Removes the registration for `stream_id`. Returns `false` if there was none.
    pub fn unregister(&self, stream_id: &str) -> bool {
        let removed = self.inner.entries.remove(stream_id).is_some();
        if removed {
            debug!(stream_id, "Stream handler unregistered");
        }
        removed
    }

    /// Returns `true` if a live handler is registered under `stream_id`.
    pub fn contains(&self, stream_id: &str) -> bool {
        self.inner
            .entries
            .get(stream_id)
            .is_some_and(|entry| entry.handler.strong_count() > 0)
    }

    /// Number of registrations, including any whose handler has been dropped
    /// but not yet purged.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Removes every registration.
    pub fn clear(&self) {
        self.inner.entries.clear();
    }
}

/// An opened stream, held by its single consumer.
///
/// Holds a strong reference to the handler while open. Implements
/// [`io::Read`] for READ streams and [`io::Write`] for WRITE streams; the
/// other direction fails with [`io::ErrorKind::Unsupported`].
///
/// Reading end-of-data from a closed handler, or calling
/// [`close`](Self::close), unregisters the stream id. Dropping the handle
/// without closing releases it so it can be opened again.
pub struct MessageStream {
    id: String,
    mode: StreamMode,
    token: u64,
    handler: Arc<dyn StreamHandler>,
    streams: Weak<Streams>,
}

impl fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageStream")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("closed", &self.handler.is_closed())
            .finish()
    }
}

impl MessageStream {
    /// The stream id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The direction this stream was opened for.
    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Reads up to `buf.len()` bytes. `Ok(0)` means end of data.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode != StreamMode::Read {
            return Err(unsupported(&self.id, "read from"));
        }
        let read = self.handler.read(buf)?;
        if read == 0 && !buf.is_empty() && self.handler.is_closed() {
            self.finish();
        }
        Ok(read)
    }

    /// Writes bytes from `data`, returning how many were accepted.
    pub fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.mode != StreamMode::Write {
            return Err(unsupported(&self.id, "write to"));
        }
        self.handler.write(data)
    }

    /// Returns `true` once the handler has no more bytes to give or take.
    pub fn is_closed(&self) -> bool {
        self.handler.is_closed()
    }

    /// Closes the handler and unregisters the stream id.
    pub fn close(&mut self) {
        self.handler.close();
        self.finish();
    }

    fn finish(&self) {
        if let Some(streams) = self.streams.upgrade() {
            if streams.remove(&self.id, self.token) {
                debug!(stream_id = %self.id, "Stream finished");
            }
        }
    }
}

fn unsupported(id: &str, operation: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot {operation} stream {id} in this mode"),
    )
}

impl io::Read for MessageStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        MessageStream::read(self, buf)
    }
}

impl io::Write for MessageStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        MessageStream::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MessageStream {
    fn drop(&mut self) {
        if let Some(streams) = self.streams.upgrade() {
            streams.release(&self.id, self.token);
        }
    }
}
