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

//! Test harness for AASB brokers and domain adapters.
//!
//! ```rust,ignore
//! use aasb_test::prelude::*;
//!
//! #[aasb_test]
//! async fn publishes_to_nobody() -> anyhow::Result<()> {
//!     let broker = Broker::default();
//!     broker.publish(Message::call("Audio", "play", json!({})))?.send();
//!     Ok(())
//! }
//! ```

/// Re-exports the `#[aasb_test]` attribute.
pub mod prelude {
    pub use aasb_test_macro::aasb_test;
}

/// Crates referenced by the code `#[aasb_test]` expands to.
#[doc(hidden)]
pub mod __private {
    pub use parking_lot;
    pub use tokio;
    pub use tracing;
}
