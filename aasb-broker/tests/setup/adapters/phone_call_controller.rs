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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use aasb_broker::prelude::*;
use anyhow::Context;
use parking_lot::Mutex;

use crate::setup::messages::*;

/// What the platform side of the phone domain can do.
pub trait PhoneCallPlatform: Send + Sync {
    fn create_call_id(&self) -> String;
    fn dial(&self, call_id: &str, callee: &str) -> bool;
}

/// Callbacks the phone domain makes back into the engine.
pub trait PhoneCallEngine {
    fn call_state_changed(&self, call_id: &str, state: &str) -> anyhow::Result<()>;
}

/// A fake phone adapter: answers `create_call_id`, records `dial`, and
/// publishes call state changes.
#[derive(Debug, Default)]
pub struct PhoneCallController {
    call_id: String,
    broker: Mutex<WeakBroker>,
    dialed: Mutex<Vec<Dial>>,
    handled: AtomicUsize,
    shut_down: AtomicBool,
}

impl PhoneCallController {
    pub fn new(call_id: &str) -> Arc<Self> {
        Arc::new(Self {
            call_id: call_id.to_string(),
            ..Self::default()
        })
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn dialed(&self) -> Vec<Dial> {
        self.dialed.lock().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn broker(&self) -> anyhow::Result<Broker> {
        self.broker.lock().upgrade().context("broker is gone")
    }

    fn answer_create_call_id(&self, call: &Message) -> anyhow::Result<()> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        let reply = CreateCallIdReply {
            call_id: self.create_call_id(),
        }
        .to_reply(call)?;
        self.broker()?.publish(reply)?.send();
        Ok(())
    }
}

impl PhoneCallPlatform for PhoneCallController {
    fn create_call_id(&self) -> String {
        self.call_id.clone()
    }

    fn dial(&self, call_id: &str, callee: &str) -> bool {
        self.dialed.lock().push(Dial {
            call_id: call_id.to_string(),
            callee: callee.to_string(),
        });
        true
    }
}

impl PhoneCallEngine for PhoneCallController {
    fn call_state_changed(&self, call_id: &str, state: &str) -> anyhow::Result<()> {
        self.broker()?.notify(&CallStateChanged {
            call_id: call_id.to_string(),
            state: state.to_string(),
        })?;
        Ok(())
    }
}

impl DomainAdapter for PhoneCallController {
    fn topic(&self) -> &str {
        PHONE
    }

    fn initialize(self: Arc<Self>, broker: &Broker) -> anyhow::Result<()> {
        *self.broker.lock() = broker.downgrade();
        broker.subscribe_to_weak(
            &self,
            |adapter: &PhoneCallController, call: &Message, _request: CreateCallId| {
                adapter.answer_create_call_id(call)
            },
        )?;
        broker.subscribe_to_weak(
            &self,
            |adapter: &PhoneCallController, _call: &Message, request: Dial| {
                adapter.handled.fetch_add(1, Ordering::SeqCst);
                adapter.dial(&request.call_id, &request.callee);
                Ok(())
            },
        )?;
        Ok(())
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}
