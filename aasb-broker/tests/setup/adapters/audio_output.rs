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

#![allow(unused)]

use std::io::Read;
use std::sync::Arc;

use aasb_broker::prelude::*;
use anyhow::Context;
use parking_lot::Mutex;

use crate::setup::messages::*;

/// A fake audio sink: on `prepare` it opens the referenced stream and reads
/// it to the end.
#[derive(Debug, Default)]
pub struct AudioOutputHandler {
    broker: Mutex<WeakBroker>,
    received: Mutex<Vec<u8>>,
    tokens: Mutex<Vec<String>>,
}

impl AudioOutputHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn received(&self) -> Vec<u8> {
        self.received.lock().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }

    fn prepare(&self, call: &Message, request: PrepareStream) -> anyhow::Result<()> {
        let broker = self.broker.lock().upgrade().context("broker is gone")?;
        let stream_id = call.stream_id().context("prepare without a streamId")?;
        let mut stream = broker.streams().open_stream(stream_id, StreamMode::Read)?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        self.received.lock().extend(bytes);
        self.tokens.lock().push(request.token);
        Ok(())
    }
}

impl DomainAdapter for AudioOutputHandler {
    fn topic(&self) -> &str {
        AUDIO_OUTPUT
    }

    fn initialize(self: Arc<Self>, broker: &Broker) -> anyhow::Result<()> {
        *self.broker.lock() = broker.downgrade();
        broker.subscribe_to_weak(
            &self,
            |adapter: &AudioOutputHandler, call: &Message, request: PrepareStream| {
                adapter.prepare(call, request)
            },
        )?;
        Ok(())
    }
}
