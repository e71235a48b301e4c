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


//! Type aliases shared across the broker.

use std::sync::Arc;

use crate::message::Message;

/// A subscriber callback as stored in the registry.
///
/// Callbacks run synchronously on whichever thread performs the dispatch and
/// return `Err` to report a failure that the broker isolates and logs.
pub type SubscriberFn = Arc<dyn Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static>;
