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


use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::stream::{StreamHandler, StreamMode};

/// An in-memory [`StreamHandler`].
///
/// As a READ source it hands out bytes supplied up front with
/// [`reader`](Self::reader) or pushed over time with [`push`](Self::push)
/// and ended with [`finish`](Self::finish). As a WRITE sink it collects
/// everything written, available through [`contents`](Self::contents).
#[derive(Debug)]
pub struct ByteBufferStream {
    mode: StreamMode,
    buffer: Mutex<VecDeque<u8>>,
    finished: AtomicBool,
    closed: AtomicBool,
}

impl ByteBufferStream {
    /// A READ source holding all of `bytes`. Closes once they are read.
    pub fn reader(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            mode: StreamMode::Read,
            buffer: Mutex::new(VecDeque::from(bytes.into())),
            finished: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    /// An empty READ source fed with [`push`](Self::push).
    ///
    /// Until [`finish`](Self::finish) is called, reading with nothing buffered
    /// fails with [`io::ErrorKind::WouldBlock`] rather than reporting end of
    /// data.
    pub fn pending_reader() -> Self {
        Self {
            mode: StreamMode::Read,
            buffer: Mutex::new(VecDeque::new()),
            finished: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// An empty WRITE sink.
    pub fn sink() -> Self {
        Self {
            mode: StreamMode::Write,
            buffer: Mutex::new(VecDeque::new()),
            finished: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Appends bytes for a READ source to hand out.
    pub fn push(&self, bytes: &[u8]) {
        self.buffer.lock().extend(bytes);
    }

    /// Marks a READ source as complete; it closes once drained.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// A copy of the bytes currently buffered.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().iter().copied().collect()
    }
}

impl StreamHandler for ByteBufferStream {
    fn mode(&self) -> StreamMode {
        self.mode
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode != StreamMode::Read {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "buffer is a sink"));
        }
        if self.closed.load(Ordering::Acquire) {
            return Ok(0);
        }
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return if self.finished.load(Ordering::Acquire) {
                Ok(0)
            } else {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "no data buffered yet"))
            };
        }
        let count = buf.len().min(buffer.len());
        for (slot, byte) in buf.iter_mut().zip(buffer.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        if self.mode != StreamMode::Write {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "buffer is a source"));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream is closed"));
        }
        self.buffer.lock().extend(data);
        Ok(data.len())
    }

    fn is_closed(&self) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return true;
        }
        self.mode == StreamMode::Read
            && self.finished.load(Ordering::Acquire)
            && self.buffer.lock().is_empty()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_drains_then_closes() -> anyhow::Result<()> {
        let source = ByteBufferStream::reader(b"hello".to_vec());
        let mut buf = [0u8; 3];
        assert_eq!(source.read(&mut buf)?, 3);
        assert_eq!(&buf, b"hel");
        assert!(!source.is_closed());
        assert_eq!(source.read(&mut buf)?, 2);
        assert_eq!(&buf[..2], b"lo");
        assert!(source.is_closed());
        assert_eq!(source.read(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn pending_reader_would_block_until_finished() -> anyhow::Result<()> {
        let source = ByteBufferStream::pending_reader();
        let mut buf = [0u8; 4];
        let err = source.read(&mut buf).err();
        assert_eq!(err.map(|e| e.kind()), Some(io::ErrorKind::WouldBlock));

        source.push(b"ab");
        source.finish();
        assert_eq!(source.read(&mut buf)?, 2);
        assert_eq!(source.read(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn sink_collects_until_closed() -> anyhow::Result<()> {
        let sink = ByteBufferStream::sink();
        assert_eq!(sink.write(b"pcm")?, 3);
        sink.close();
        assert!(sink.write(b"more").is_err());
        assert_eq!(sink.contents(), b"pcm".to_vec());
        Ok(())
    }
}
