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

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aasb_broker::prelude::*;

// --- Messages ---

/// Engine asks the platform for a new call id.
#[aasb_message(topic = "PhoneCallController", action = "create_call_id")]
struct CreateCallId {}

/// Platform answers with the id it allocated.
#[aasb_message(topic = "PhoneCallController", action = "create_call_id")]
struct CreateCallIdReply {
    call_id: String,
}

/// Engine asks the platform to place a call.
#[aasb_message(topic = "PhoneCallController", action = "dial")]
struct Dial {
    call_id: String,
    callee: String,
}

/// Platform reports a call state transition.
#[aasb_message(topic = "PhoneCallController", action = "call_state_changed")]
struct CallStateChanged {
    call_id: String,
    state: String,
}

/// Engine hands the platform a prompt to play from a stream.
#[aasb_message(topic = "AudioOutput", action = "prepare")]
struct PrepareStream {
    stream_id: String,
    token: String,
}

// --- Platform side ---

/// A toy handset: allocates call ids and reports every dial as connected.
#[derive(Debug, Default)]
struct Handset {
    broker: Mutex<WeakBroker>,
    next_call: Mutex<u32>,
}

impl Handset {
    fn broker(&self) -> anyhow::Result<Broker> {
        self.broker.lock().upgrade().context("broker has shut down")
    }

    fn create_call_id(&self, call: &Message) -> anyhow::Result<()> {
        let call_id = {
            let mut next = self.next_call.lock();
            *next += 1;
            format!("call-{}", *next)
        };
        let reply = CreateCallIdReply { call_id }.to_reply(call)?;
        self.broker()?.publish(reply)?.send();
        Ok(())
    }

    fn dial(&self, dial: Dial) -> anyhow::Result<()> {
        info!(call_id = %dial.call_id, callee = %dial.callee, "Dialing");
        self.broker()?.notify(&CallStateChanged {
            call_id: dial.call_id,
            state: "ACTIVE".to_string(),
        })?;
        Ok(())
    }
}

impl DomainAdapter for Handset {
    fn topic(&self) -> &str {
        CreateCallId::TOPIC
    }

    fn initialize(self: Arc<Self>, broker: &Broker) -> anyhow::Result<()> {
        *self.broker.lock() = broker.downgrade();
        broker.subscribe_to_weak(&self, |handset: &Handset, call: &Message, _: CreateCallId| {
            handset.create_call_id(call)
        })?;
        broker.subscribe_to_weak(&self, |handset: &Handset, _: &Message, dial: Dial| {
            handset.dial(dial)
        })?;
        Ok(())
    }

    fn shutdown(&self) {
        info!("Handset powered down");
    }
}

/// A toy speaker that reads whole prompts from the stream registry.
#[derive(Debug, Default)]
struct Speaker {
    broker: Mutex<WeakBroker>,
}

impl DomainAdapter for Speaker {
    fn topic(&self) -> &str {
        PrepareStream::TOPIC
    }

    fn initialize(self: Arc<Self>, broker: &Broker) -> anyhow::Result<()> {
        *self.broker.lock() = broker.downgrade();
        broker.subscribe_to_weak(&self, |speaker: &Speaker, _: &Message, prepare: PrepareStream| {
            let broker = speaker.broker.lock().upgrade().context("broker has shut down")?;
            let mut stream = broker.streams().open_stream(&prepare.stream_id, StreamMode::Read)?;
            let mut audio = Vec::new();
            std::io::Read::read_to_end(&mut stream, &mut audio)?;
            info!(token = %prepare.token, bytes = audio.len(), "Played prompt");
            Ok(())
        })?;
        Ok(())
    }
}

// --- Engine side ---

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let mut runtime = AasbApp::new()
        .with_config(AasbConfig::default())
        .engine_configuration(r#"{"aasb": {"messageBroker": {"messageTimeout": 1000}}}"#)?
        .launch();
    runtime.register_adapter(Arc::new(Handset::default()))?;
    runtime.register_adapter(Arc::new(Speaker::default()))?;

    let broker = runtime.broker().clone();
    broker.subscribe_to(|_: &Message, changed: CallStateChanged| {
        info!(call_id = %changed.call_id, state = %changed.state, "Call state changed");
        Ok(())
    })?;

    // request/reply
    let result = broker.request(&CreateCallId {}).await?;
    let Some(reply) = result.payload_as::<CreateCallIdReply>()? else {
        anyhow::bail!("no call id: {:?}", result.invalid_reason());
    };
    info!(call_id = %reply.call_id, "Got call id");

    // fire-and-forget
    broker.notify(&Dial {
        call_id: reply.call_id,
        callee: "555-0100".to_string(),
    })?;

    // bulk audio travels out of band
    let prompt = Arc::new(ByteBufferStream::reader(vec![0u8; 3200]));
    let stream_id = broker.streams().register(&prompt)?;
    broker.notify(&PrepareStream {
        stream_id,
        token: "prompt-1".to_string(),
    })?;

    // nobody answers navigation calls here
    let unanswered = broker
        .publish(Message::call("Navigation", "get_navigation_state", json!({})))?
        .get_within(Duration::from_millis(200))
        .await;
    info!(outcome = ?unanswered.invalid_reason(), "Navigation state");

    runtime.shutdown().await;
    Ok(())
}
