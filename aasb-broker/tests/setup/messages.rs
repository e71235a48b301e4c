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

use aasb_broker::prelude::*;

pub const PHONE: &str = "PhoneCallController";
pub const NAVIGATION: &str = "Navigation";
pub const AUDIO_OUTPUT: &str = "AudioOutput";

#[aasb_message(topic = "PhoneCallController", action = "create_call_id")]
pub struct CreateCallId {}

#[aasb_message(topic = "PhoneCallController", action = "create_call_id")]
pub struct CreateCallIdReply {
    pub call_id: String,
}

#[aasb_message(topic = "PhoneCallController", action = "dial")]
pub struct Dial {
    pub call_id: String,
    pub callee: String,
}

#[aasb_message(topic = "PhoneCallController", action = "call_state_changed")]
pub struct CallStateChanged {
    pub call_id: String,
    pub state: String,
}

#[aasb_message(topic = "Navigation", action = "get_navigation_state")]
pub struct GetNavigationState {}

#[aasb_message(topic = "AudioOutput", action = "prepare")]
pub struct PrepareStream {
    pub stream_id: String,
    pub token: String,
}
