// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted controller configuration.
//!
//! The config file is a flat JSON object with camelCase keys:
//!
//! ```json
//! {
//!   "mqttBroker": "192.168.1.50",
//!   "mqttPort": "1883",
//!   "nanoleafBaseUrl": "http://192.168.1.60:16021",
//!   "nanoleafAuthToken": "abc123",
//!   "friendId": "team-7",
//!   "deviceId": "0d6f7c1e-3c0a-4c8e-9f41-8b0e6d7c2a55"
//! }
//! ```
//!
//! `mqttPort` is accepted as a string or a number and always written back
//! as a string.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::identity::DeviceId;
use crate::protocol::RouterConfig;

/// Controller settings loaded from and saved to the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Broker host name or address.
    pub mqtt_broker: String,
    /// Broker port, kept as text the way the file stores it.
    #[serde(deserialize_with = "port_text")]
    pub mqtt_port: String,
    /// Base URL of the light panel's REST API.
    pub nanoleaf_base_url: String,
    /// Auth token for the light panel.
    pub nanoleaf_auth_token: String,
    /// Friend id; names the device's topic namespace.
    pub friend_id: String,
    /// Unique controller id, generated on first start.
    #[serde(
        deserialize_with = "optional_device_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_id: Option<DeviceId>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mqtt_broker: String::new(),
            mqtt_port: RouterConfig::DEFAULT_PORT.to_string(),
            nanoleaf_base_url: String::new(),
            nanoleaf_auth_token: String::new(),
            friend_id: String::new(),
            device_id: None,
        }
    }
}

impl ControllerConfig {
    /// Reads the config from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reads the config from `path`, falling back to defaults if the file
    /// is missing or unreadable.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Using default config");
                Self::default()
            }
        }
    }

    /// Writes the config to `path` as pretty JSON, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Generates a device id if none is set.
    ///
    /// Returns `true` if one was generated and the config should be saved.
    pub fn ensure_device_id(&mut self) -> bool {
        if self.device_id.is_some() {
            return false;
        }
        let id = DeviceId::new();
        tracing::info!(device_id = %id, "Generated device id");
        self.device_id = Some(id);
        true
    }

    /// Parses the broker port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] unless the port is in 1-65535.
    pub fn port(&self) -> Result<u16, ConfigError> {
        let port = self.mqtt_port.trim();
        match port.parse::<u16>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
                field: "mqttPort".to_string(),
                message: format!("{port:?} is not a port in 1-65535"),
            }),
            Ok(port) => Ok(port),
        }
    }

    /// Builds the router configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty broker host or an
    /// unusable port.
    pub fn router_config(&self) -> Result<RouterConfig, ConfigError> {
        let host = self.mqtt_broker.trim();
        if host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mqttBroker".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(RouterConfig::new(host, self.friend_id.clone()).with_port(self.port()?))
    }
}

fn port_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Number(n) => n.to_string(),
        Port::Text(text) => text,
    })
}

fn optional_device_id<'de, D>(deserializer: D) -> Result<Option<DeviceId>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "mqttBroker": "192.168.1.50",
        "mqttPort": "1884",
        "nanoleafBaseUrl": "http://192.168.1.60:16021",
        "nanoleafAuthToken": "tok",
        "friendId": "team-7",
        "deviceId": "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8"
    }"#;

    #[test]
    fn parses_firmware_format() {
        let config: ControllerConfig = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(config.mqtt_broker, "192.168.1.50");
        assert_eq!(config.port().unwrap(), 1884);
        assert_eq!(config.friend_id, "team-7");
        assert_eq!(
            config.device_id.unwrap().to_string(),
            "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8"
        );
    }

    #[test]
    fn numeric_port_is_accepted_and_written_as_text() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"mqttBroker": "b", "mqttPort": 8883}"#).unwrap();
        assert_eq!(config.port().unwrap(), 8883);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["mqttPort"], "8883");
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config: ControllerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.port().unwrap(), 1883);
    }

    #[test]
    fn empty_device_id_is_none() {
        let config: ControllerConfig = serde_json::from_str(r#"{"deviceId": ""}"#).unwrap();
        assert!(config.device_id.is_none());
    }

    #[test]
    fn invalid_port_is_rejected() {
        for port in ["0", "65536", "abc", ""] {
            let config = ControllerConfig {
                mqtt_broker: "b".to_string(),
                mqtt_port: port.to_string(),
                ..ControllerConfig::default()
            };
            assert!(matches!(
                config.router_config(),
                Err(ConfigError::InvalidValue { ref field, .. }) if field == "mqttPort"
            ));
        }
    }

    #[test]
    fn router_config_requires_host() {
        let config = ControllerConfig::default();
        assert!(matches!(
            config.router_config(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "mqttBroker"
        ));
    }

    #[test]
    fn router_config_carries_values() {
        let config: ControllerConfig = serde_json::from_str(SAMPLE).unwrap();
        let router = config.router_config().unwrap();
        assert_eq!(router.broker_host(), "192.168.1.50");
        assert_eq!(router.broker_port(), 1884);
        assert_eq!(router.friend_id(), "team-7");
    }

    #[test]
    fn ensure_device_id_generates_once() {
        let mut config = ControllerConfig::default();
        assert!(config.ensure_device_id());
        let id = config.device_id;
        assert!(!config.ensure_device_id());
        assert_eq!(config.device_id, id);
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config: ControllerConfig = serde_json::from_str(SAMPLE).unwrap();
        config.nanoleaf_auth_token = "fresh".to_string();

        config.save(&path).unwrap();
        assert_eq!(ControllerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_or_default_tolerates_bad_files() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(
            ControllerConfig::load_or_default(&missing),
            ControllerConfig::default()
        );

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            ControllerConfig::load(&broken),
            Err(ConfigError::Json(_))
        ));
        assert_eq!(
            ControllerConfig::load_or_default(&broken),
            ControllerConfig::default()
        );
    }
}
