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


use tracing::trace;

use crate::common::{AasbConfig, AasbRuntime, Broker, ConfigError, EngineConfiguration};

/// The entry point for bringing up an AASB broker and its domain adapters.
///
/// ```rust,ignore
/// use aasb_broker::prelude::*;
///
/// let mut runtime = AasbApp::new()
///     .engine_configuration(r#"{"aasb":{"messageBroker":{"messageTimeout":1000}}}"#)?
///     .launch();
/// runtime.register_adapter(phone_controller)?;
/// // ...
/// runtime.shutdown().await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct AasbApp {
    config: Option<AasbConfig>,
    engine: EngineConfiguration,
}

impl AasbApp {
    /// Starts a builder that will load configuration from the XDG config
    /// directory at launch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` instead of loading one.
    #[must_use]
    pub fn with_config(mut self, config: AasbConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds an engine configuration document. Later documents override
    /// earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document does not parse.
    pub fn engine_configuration(mut self, json: &str) -> Result<Self, ConfigError> {
        self.engine.merge(EngineConfiguration::from_json(json)?);
        Ok(self)
    }

    /// Builds the broker and returns the runtime that owns it.
    ///
    /// Call from within a tokio runtime when the configuration selects queued
    /// dispatch; otherwise the broker falls back to inline delivery.
    pub fn launch(self) -> AasbRuntime {
        trace!("Starting AASB initialization");
        let mut config = self.config.unwrap_or_else(AasbConfig::load);
        self.engine.apply_to(&mut config);
        trace!("Configuration loaded: {:?}", config);

        let broker = Broker::new(config);
        trace!("AASB initialization complete");
        AasbRuntime::new(broker, self.engine)
    }
}
