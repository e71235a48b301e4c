//! Traits at the edges of the broker.
//!
//! # Key Traits
//!
//! *   [`AasbMessage`]: a typed payload bound to a `(topic, action)`, usually
//!     implemented with `#[aasb_message]`.
//! *   [`Subscribable`]: typed subscription, with strong and weak-owner forms.
//! *   [`Requester`]: typed `notify` and awaited `request`.
//! *   [`DomainAdapter`]: the contract a per-feature adapter fulfils to be
//!     started and stopped by [`AasbRuntime`](crate::common::AasbRuntime).

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
pub use aasb_message::AasbMessage;
pub use domain_adapter::DomainAdapter;
pub use requester::Requester;
pub use subscribable::Subscribable;

// --- Submodules ---

/// Defines the [`AasbMessage`] trait.
mod aasb_message;
/// Defines the [`DomainAdapter`] trait.
mod domain_adapter;
/// Defines the [`Requester`] trait.
mod requester;
/// Defines the [`Subscribable`] trait.
mod subscribable;
