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


use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::common::{Broker, EngineConfiguration};
use crate::traits::DomainAdapter;

/// A running AASB broker together with the domain adapters attached to it.
///
/// Created by [`AasbApp::launch`](crate::common::AasbApp::launch).
pub struct AasbRuntime {
    broker: Broker,
    engine: EngineConfiguration,
    adapters: Vec<Arc<dyn DomainAdapter>>,
}

impl fmt::Debug for AasbRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AasbRuntime")
            .field("broker", &self.broker)
            .field(
                "adapters",
                &self
                    .adapters
                    .iter()
                    .map(|adapter| adapter.topic().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AasbRuntime {
    pub(crate) fn new(broker: Broker, engine: EngineConfiguration) -> Self {
        Self {
            broker,
            engine,
            adapters: Vec::new(),
        }
    }

    /// The broker.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// The merged engine configuration.
    pub fn engine_configuration(&self) -> &EngineConfiguration {
        &self.engine
    }

    /// Number of adapters that were initialised.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Initialises `adapter` against the broker and keeps it alive until
    /// shutdown.
    ///
    /// Returns `Ok(false)` without initialising it when its domain is disabled
    /// in the engine configuration.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's initialisation error; the adapter is not kept.
    #[instrument(skip_all, fields(topic = adapter.topic()))]
    pub fn register_adapter<A: DomainAdapter>(&mut self, adapter: Arc<A>) -> anyhow::Result<bool> {
        if !self.engine.is_domain_enabled(adapter.topic()) {
            info!("Domain disabled by engine configuration; adapter not initialized");
            return Ok(false);
        }
        adapter
            .clone()
            .initialize(&self.broker)
            .with_context(|| format!("failed to initialize {} adapter", adapter.topic()))?;
        debug!("Adapter initialized");
        self.adapters.push(adapter);
        Ok(true)
    }

    /// Shuts adapters down in reverse registration order, then the broker.
    #[instrument(skip(self))]
    pub async fn shutdown(self) {
        for adapter in self.adapters.iter().rev() {
            debug!(topic = adapter.topic(), "Shutting down adapter");
            adapter.shutdown();
        }
        self.broker.shutdown().await;
        info!("AASB runtime shut down");
    }
}
