// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GeoGlow controller - MQTT topic routing for a networked light panel.
//!
//! The controller keeps one session with an MQTT broker, subscribes every
//! registered topic adapter under its own namespace
//! (`GeoGlow/<friendId>/<suffix>`), and routes each inbound JSON message to
//! the first adapter whose pattern matches. Failures never stop the loop:
//! they are logged and published as error reports on
//! `GeoGlow/status/error`.
//!
//! # Features
//!
//! - **Routing core**: [`MqttRouter`], [`TopicAdapter`], wildcard matching,
//!   bounded JSON buffers, status/error reporting (always available)
//! - **`mqtt`**: [`RumqttTransport`], the broker transport
//! - **`http`**: [`NanoleafClient`](light::NanoleafClient), the light panel
//!   REST client
//!
//! # Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "mqtt")]
//! # fn main() -> geoglow_controller::Result<()> {
//! use geoglow_controller::adapter::FnAdapter;
//! use geoglow_controller::{MqttRouter, RouterConfig, RumqttTransport};
//!
//! let config = RouterConfig::new("192.168.1.50", "team-7");
//! let mut router = MqttRouter::initialize(RumqttTransport::new(), config);
//!
//! router.register_adapter(FnAdapter::new("scenes/+/apply", |topic, payload, _| {
//!     println!("apply {topic}: {payload}");
//! }))?;
//!
//! loop {
//!     router.tick();
//!     if router.is_connected() {
//!         router.publish("GeoGlow/team-7/state", &serde_json::json!({"on": true}));
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! # }
//! # #[cfg(not(feature = "mqtt"))]
//! # fn main() {}
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod heartbeat;
mod identity;
pub mod light;
#[cfg(feature = "cli")]
pub mod logging;
pub mod protocol;

pub use adapter::{FnAdapter, TopicAdapter};
pub use config::ControllerConfig;
pub use error::{CodecError, ConfigError, Error, LightError, Result, TransportError, ValueError};
pub use heartbeat::Heartbeat;
pub use identity::{DeviceId, FirmwareIdentity};
#[cfg(feature = "mqtt")]
pub use protocol::RumqttTransport;
pub use protocol::{Dispatch, MqttRouter, RouterConfig, Transport};
