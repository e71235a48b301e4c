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


//! The engine configuration document read once at startup.
//!
//! ```json
//! {
//!   "aasb": {
//!     "messageBroker": {
//!       "messageTimeout": 1000,
//!       "dispatchMode": "queued",
//!       "failFastWithoutSubscribers": false
//!     },
//!     "domains": {
//!       "Navigation": { "enabled": false }
//!     }
//!   }
//! }
//! ```
//!
//! Keys the broker does not recognise are ignored at every level, so the same
//! document can carry settings for other engine components.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::config::{AasbConfig, ConfigError, DispatchMode};

/// Parsed engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfiguration {
    #[serde(default)]
    aasb: AasbSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AasbSection {
    #[serde(default)]
    message_broker: MessageBrokerSettings,
    #[serde(default)]
    domains: HashMap<String, DomainSettings>,
}

/// Broker overrides from `aasb.messageBroker`. Absent keys leave the
/// corresponding [`AasbConfig`] value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBrokerSettings {
    /// Default reply wait in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_timeout: Option<u64>,
    /// Inline or queued dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_mode: Option<DispatchMode>,
    /// Whether `get()` gives up at once when nobody is subscribed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast_without_subscribers: Option<bool>,
}

/// Per-domain switches from `aasb.domains.<Topic>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSettings {
    /// `false` disables the domain's adapter. Absent means enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl EngineConfiguration {
    /// Parses an engine configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] when the text is not JSON or a recognised
    /// key holds a value of the wrong type.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Overlays `other` onto `self`; values present in `other` win.
    pub fn merge(&mut self, other: EngineConfiguration) {
        let broker = other.aasb.message_broker;
        if broker.message_timeout.is_some() {
            self.aasb.message_broker.message_timeout = broker.message_timeout;
        }
        if broker.dispatch_mode.is_some() {
            self.aasb.message_broker.dispatch_mode = broker.dispatch_mode;
        }
        if broker.fail_fast_without_subscribers.is_some() {
            self.aasb.message_broker.fail_fast_without_subscribers =
                broker.fail_fast_without_subscribers;
        }
        self.aasb.domains.extend(other.aasb.domains);
    }

    /// The `aasb.messageBroker` section.
    pub fn message_broker(&self) -> &MessageBrokerSettings {
        &self.aasb.message_broker
    }

    /// Applies the broker overrides to `config`.
    pub fn apply_to(&self, config: &mut AasbConfig) {
        let broker = &self.aasb.message_broker;
        if let Some(timeout) = broker.message_timeout {
            config.timeouts.reply_timeout_ms = timeout;
        }
        if let Some(mode) = broker.dispatch_mode {
            config.dispatch.mode = mode;
        }
        if let Some(fail_fast) = broker.fail_fast_without_subscribers {
            config.behavior.fail_fast_without_subscribers = fail_fast;
        }
        debug!(?broker, "Applied engine configuration");
    }

    /// Whether the adapter for `topic` should be initialised. Defaults to `true`.
    pub fn is_domain_enabled(&self, topic: &str) -> bool {
        self.aasb
            .domains
            .get(topic)
            .and_then(|domain| domain.enabled)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn applies_broker_overrides() -> anyhow::Result<()> {
        let engine = EngineConfiguration::from_json(
            r#"{"aasb":{"messageBroker":{"messageTimeout":1200,"dispatchMode":"queued"}}}"#,
        )?;
        let mut config = AasbConfig::default();
        engine.apply_to(&mut config);
        assert_eq!(config.reply_timeout(), Duration::from_millis(1200));
        assert_eq!(config.dispatch.mode, DispatchMode::Queued);
        assert!(config.behavior.fail_fast_without_subscribers);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_ignored() -> anyhow::Result<()> {
        let engine = EngineConfiguration::from_json(
            r#"{
                "aace.vehicle": {"info": {"make": "Amazon"}},
                "aasb": {
                    "version": "4.0",
                    "messageBroker": {"somethingElse": true},
                    "domains": {"Navigation": {"enabled": false, "extra": 1}}
                }
            }"#,
        )?;
        assert!(!engine.is_domain_enabled("Navigation"));
        assert!(engine.is_domain_enabled("PhoneCallController"));
        assert_eq!(engine.message_broker(), &MessageBrokerSettings::default());
        Ok(())
    }

    #[test]
    fn empty_document_changes_nothing() -> anyhow::Result<()> {
        let engine = EngineConfiguration::from_json("{}")?;
        let mut config = AasbConfig::default();
        engine.apply_to(&mut config);
        assert_eq!(config, AasbConfig::default());
        Ok(())
    }

    #[test]
    fn later_documents_win_on_merge() -> anyhow::Result<()> {
        let mut engine = EngineConfiguration::from_json(
            r#"{"aasb":{"messageBroker":{"messageTimeout":100},"domains":{"Audio":{"enabled":false}}}}"#,
        )?;
        engine.merge(EngineConfiguration::from_json(
            r#"{"aasb":{"messageBroker":{"failFastWithoutSubscribers":false},"domains":{"Audio":{"enabled":true}}}}"#,
        )?);
        assert_eq!(engine.message_broker().message_timeout, Some(100));
        assert_eq!(
            engine.message_broker().fail_fast_without_subscribers,
            Some(false)
        );
        assert!(engine.is_domain_enabled("Audio"));
        Ok(())
    }

    #[test]
    fn wrong_type_is_an_error() {
        let result =
            EngineConfiguration::from_json(r#"{"aasb":{"messageBroker":{"messageTimeout":"x"}}}"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }
}
