//! The broker and everything it owns: subscription and reply tables, the
//! dispatcher, configuration, and the runtime that wires domain adapters to it.
//!
//! # Key Re-exported Components:
//!
//! *   [`Broker`] / [`WeakBroker`]: the message broker and its non-owning handle.
//! *   [`SubscriptionHandle`]: identifies one registered callback.
//! *   [`BrokerStats`]: counters for deliveries, failures, and replies.
//! *   [`AasbConfig`] / [`EngineConfiguration`]: TOML and JSON configuration.
//! *   [`AasbApp`] / [`AasbRuntime`]: startup and shutdown.
//!
//! Internal submodules hold the registry, the reply correlation table, the
//! dispatcher, and the weak-owner guard.

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


// --- Public Re-exports ---
pub use aasb::AasbApp;
pub use aasb_runtime::AasbRuntime;
pub use broker::{Broker, WeakBroker};
pub use config::{
    AasbConfig, BehaviorConfig, ConfigError, DispatchConfig, DispatchMode, TimeoutConfig,
};
pub use engine_config::{DomainSettings, EngineConfiguration, MessageBrokerSettings};
pub use registry::SubscriptionHandle;
pub use stats::BrokerStats;

// --- Crate-Internal Re-exports ---
pub(crate) use types::*;

// --- Submodules ---

/// Defines common type aliases.
mod types;

/// Defines the `AasbApp` entry point.
mod aasb;
/// Defines the `AasbRuntime` that owns the broker and adapters.
mod aasb_runtime;
/// Defines the `Broker` implementation.
mod broker;
/// Defines the TOML configuration.
mod config;
/// Runs subscriber callbacks inline or on a queue.
mod dispatcher;
/// Defines the engine configuration document.
mod engine_config;
/// Weak-owner guard for subscriber callbacks.
mod lifetime;
/// Reply correlation between `get()` and incoming replies.
mod pending;
/// The `(topic, action)` subscription table.
mod registry;
/// Defines `BrokerStats`.
mod stats;
