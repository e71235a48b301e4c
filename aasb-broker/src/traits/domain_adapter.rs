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

use crate::common::Broker;

/// A per-feature component that translates between AASB messages and a
/// typed platform interface.
///
/// An adapter registers its subscriptions in [`initialize`](Self::initialize),
/// normally through [`Broker::subscribe_weak`] so the broker does not keep it
/// alive, and keeps a [`WeakBroker`](crate::common::WeakBroker) if it needs to
/// publish later. The adapter's own domain operations belong on a separate
/// trait.
pub trait DomainAdapter: Send + Sync + 'static {
    /// The topic this adapter serves. Used to look up whether the domain is
    /// enabled in the engine configuration.
    fn topic(&self) -> &str;

    /// Registers subscriptions on `broker`.
    ///
    /// # Errors
    ///
    /// Any error aborts registration of this adapter.
    fn initialize(self: Arc<Self>, broker: &Broker) -> anyhow::Result<()>;

    /// Called once during runtime shutdown, before the broker shuts down.
    fn shutdown(&self) {}
}
