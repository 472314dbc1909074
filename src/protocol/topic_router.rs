// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker connection manager and inbound message routing.
//!
//! The [`MqttRouter`] owns the one broker connection, the registered topic
//! adapters and the reconnect state machine. It is driven by calling
//! [`MqttRouter::tick`] from the main loop.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: GeoGlow/team-7/color-palette/set → {"palette": [...]}
//!                     ↓
//!             MqttRouter.dispatch()
//!                     ↓
//!          decode JSON (failure → error report)
//!                     ↓
//!   for each adapter, in registration order:
//!     topic_matches("GeoGlow/team-7/" + suffix, topic)?
//!                     ↓
//!        first match: adapter.on_message(topic, json, len)
//!        no match:    "unhandled message" error report
//! ```
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "mqtt")]
//! # fn main() -> geoglow_controller::Result<()> {
//! use geoglow_controller::adapter::FnAdapter;
//! use geoglow_controller::protocol::{MqttRouter, RouterConfig, RumqttTransport};
//!
//! let config = RouterConfig::new("192.168.1.50", "team-7");
//! let mut router = MqttRouter::initialize(RumqttTransport::new(), config);
//!
//! router.register_adapter(FnAdapter::new("lights/set", |topic, payload, _len| {
//!     println!("{topic}: {payload}");
//! }))?;
//!
//! loop {
//!     router.tick();
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! # }
//! # #[cfg(not(feature = "mqtt"))]
//! # fn main() {}
//! ```

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::adapter::{AdapterRegistry, TopicAdapter};
use crate::error::{Error, TransportError};
use crate::identity::FirmwareIdentity;

use super::codec::{self, PayloadBuffer};
use super::reconnect::{ConnectionState, ReconnectMachine};
use super::status::{Report, StatusReporter};
use super::topic::{ERROR_TOPIC, Namespace, topic_matches};
use super::Transport;

/// Longest payload excerpt quoted in an "unhandled message" report.
const REPORT_PAYLOAD_PREVIEW: usize = 256;

/// Configuration for an [`MqttRouter`].
///
/// # Examples
///
/// ```
/// use geoglow_controller::protocol::RouterConfig;
/// use std::time::Duration;
///
/// let config = RouterConfig::new("broker.local", "team-7")
///     .with_port(1884)
///     .with_retry_delay(Duration::from_secs(5));
/// assert_eq!(config.broker_port(), 1884);
/// ```
#[derive(Debug, Clone)]
pub struct RouterConfig {
    broker_host: String,
    broker_port: u16,
    friend_id: String,
    firmware_version: String,
    retry_delay: Duration,
    max_frames_per_tick: usize,
}

impl RouterConfig {
    /// Default MQTT port.
    pub const DEFAULT_PORT: u16 = 1883;
    /// Default fixed delay between connection attempts.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
    /// Default number of inbound frames handled per tick.
    pub const DEFAULT_MAX_FRAMES_PER_TICK: usize = 8;

    /// Creates a configuration for the given broker host and friend id.
    #[must_use]
    pub fn new(broker_host: impl Into<String>, friend_id: impl Into<String>) -> Self {
        Self {
            broker_host: broker_host.into(),
            broker_port: Self::DEFAULT_PORT,
            friend_id: friend_id.into(),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            max_frames_per_tick: Self::DEFAULT_MAX_FRAMES_PER_TICK,
        }
    }

    /// Sets the broker port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.broker_port = port;
        self
    }

    /// Sets the firmware version reported in status payloads.
    #[must_use]
    pub fn with_firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = version.into();
        self
    }

    /// Sets the delay between failed connection attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets how many inbound frames a single tick may handle (at least 1).
    #[must_use]
    pub fn with_max_frames_per_tick(mut self, frames: usize) -> Self {
        self.max_frames_per_tick = frames.max(1);
        self
    }

    /// Returns the broker host.
    #[must_use]
    pub fn broker_host(&self) -> &str {
        &self.broker_host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    /// Returns the friend id.
    #[must_use]
    pub fn friend_id(&self) -> &str {
        &self.friend_id
    }

    /// Returns the firmware version.
    #[must_use]
    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// Returns the retry delay.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the per-tick frame limit.
    #[must_use]
    pub fn max_frames_per_tick(&self) -> usize {
        self.max_frames_per_tick
    }
}

/// Outcome of dispatching one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The adapter at `index` (registration order) handled the message.
    Handled {
        /// Index of the adapter that matched.
        index: usize,
    },
    /// No adapter matched the topic.
    Unhandled,
    /// The payload was not valid JSON; no adapter was invoked.
    DecodeFailed,
}

/// Owns the broker connection and routes messages to topic adapters.
pub struct MqttRouter<T: Transport> {
    transport: T,
    namespace: Namespace,
    client_id: String,
    adapters: AdapterRegistry,
    machine: ReconnectMachine,
    reporter: StatusReporter,
    buffer: PayloadBuffer,
    max_frames_per_tick: usize,
}

impl<T: Transport> MqttRouter<T> {
    /// Points `transport` at the configured broker and builds the router.
    ///
    /// A transport that rejects the address is logged and left as is; the
    /// router starts `Disconnected` either way and keeps retrying from
    /// [`tick`](Self::tick).
    pub fn initialize(mut transport: T, config: RouterConfig) -> Self {
        if let Err(e) = transport.set_server(&config.broker_host, config.broker_port) {
            tracing::warn!(
                host = %config.broker_host,
                port = config.broker_port,
                error = %e,
                "Failed to configure MQTT transport"
            );
        }

        let namespace = Namespace::new(config.friend_id.clone());
        let client_id = namespace.client_id();
        tracing::info!(
            host = %config.broker_host,
            port = config.broker_port,
            namespace = %namespace.as_str(),
            "MQTT router initialized"
        );

        Self {
            transport,
            namespace,
            client_id,
            adapters: AdapterRegistry::new(),
            machine: ReconnectMachine::new(config.retry_delay),
            reporter: StatusReporter::new(FirmwareIdentity::new(
                config.firmware_version,
                config.friend_id,
            )),
            buffer: PayloadBuffer::new(),
            max_frames_per_tick: config.max_frames_per_tick,
        }
    }

    /// Returns `true` while the connection state is `Connected`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.machine.state() == ConnectionState::Connected
    }

    /// Returns the connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Returns the device namespace.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the MQTT client id used for every connect.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the number of registered adapters.
    #[must_use]
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Returns the firmware identity stamped on reports.
    #[must_use]
    pub fn identity(&self) -> &FirmwareIdentity {
        self.reporter.identity()
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Registers a topic adapter and returns its dispatch index.
    ///
    /// When connected, the adapter's namespaced topic is subscribed right
    /// away. A failed subscription is logged only; the adapter stays
    /// registered and is subscribed again after the next reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySuffix`] or [`Error::DuplicateSuffix`] if the
    /// adapter's suffix is unusable.
    pub fn register_adapter<A>(&mut self, adapter: A) -> Result<usize, Error>
    where
        A: TopicAdapter + 'static,
    {
        let topic = self.namespace.topic_for(adapter.suffix());
        let index = self.adapters.push(Box::new(adapter))?;
        tracing::debug!(topic = %topic, index, "Registered topic adapter");

        if self.is_connected() {
            self.subscribe(&topic);
        }
        Ok(index)
    }

    /// Registers a listener invoked for every status or error report.
    pub fn on_report<F>(&mut self, listener: F)
    where
        F: FnMut(&Report) + 'static,
    {
        self.reporter.on_report(listener);
    }

    /// Drives the connection once, using the current time.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Drives the connection once.
    ///
    /// When the transport is down this makes at most one connect attempt
    /// (if the retry deadline has passed). When connected it services the
    /// transport and dispatches up to the per-tick frame limit.
    pub fn tick_at(&mut self, now: Instant) {
        if self.transport.is_connected() {
            if self.machine.state() != ConnectionState::Connected {
                self.on_connected();
            }
        } else {
            if self.machine.state() == ConnectionState::Connected {
                tracing::warn!("MQTT connection lost");
            }
            self.machine.transport_down(now);
            if !self.machine.poll_attempt(now) || !self.attempt_connect(now) {
                return;
            }
        }

        self.service();
    }

    /// Serializes `payload` and publishes it on `topic`.
    ///
    /// Nothing is written while disconnected, or when the payload does not
    /// fit in the outbound buffer. Either failure is reported on the error
    /// topic, unless `topic` is the error topic itself.
    pub fn publish<P>(&mut self, topic: &str, payload: &P)
    where
        P: Serialize + ?Sized,
    {
        if let Err(e) = self.try_publish(topic, payload) {
            tracing::warn!(topic = %topic, error = %e, "Unable to publish message");
            if topic != ERROR_TOPIC {
                self.report_error(format!("unable to publish to {topic}: {e}"));
            }
        }
    }

    /// Publishes a status report: `{firmwareVersion, friendId, <kind>: message}`.
    pub fn report_status(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        self.report(Report::Status {
            kind: kind.into(),
            message: message.into(),
        });
    }

    /// Publishes an error report: `{firmwareVersion, friendId, error: message}`.
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.report(Report::Error {
            message: message.into(),
        });
    }

    /// Routes one inbound message to the first matching adapter.
    pub fn dispatch(&mut self, topic: &str, payload: &[u8]) -> Dispatch {
        let value = match codec::decode(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to parse JSON payload");
                self.report_error(format!("payload parse failed: {e}"));
                return Dispatch::DecodeFailed;
            }
        };

        for (index, adapter) in self.adapters.iter_mut().enumerate() {
            let pattern = self.namespace.topic_for(adapter.suffix());
            if topic_matches(&pattern, topic) {
                tracing::debug!(topic = %topic, pattern = %pattern, index, "Dispatching message");
                adapter.on_message(topic, &value, payload.len());
                return Dispatch::Handled { index };
            }
        }

        let excerpt = preview(payload);
        tracing::warn!(topic = %topic, payload = %excerpt, "Unhandled message");
        self.report_error(format!("unhandled message [{topic}] {excerpt}"));
        Dispatch::Unhandled
    }

    fn attempt_connect(&mut self, now: Instant) -> bool {
        tracing::info!(
            client_id = %self.client_id,
            attempt = self.machine.failed_attempts() + 1,
            "Attempting MQTT connection"
        );
        match self.transport.connect(&self.client_id) {
            Ok(()) => {
                self.on_connected();
                true
            }
            Err(e) => {
                self.machine.attempt_failed(now);
                tracing::warn!(
                    error = %e,
                    retry_in_ms = u64::try_from(self.machine.retry_delay().as_millis())
                        .unwrap_or(u64::MAX),
                    "MQTT connection failed"
                );
                false
            }
        }
    }

    fn on_connected(&mut self) {
        self.machine.connected();
        tracing::info!(client_id = %self.client_id, "MQTT connected");

        let topics: Vec<String> = self
            .adapters
            .suffixes()
            .map(|suffix| self.namespace.topic_for(suffix))
            .collect();
        for topic in &topics {
            self.subscribe(topic);
        }
    }

    fn subscribe(&mut self, topic: &str) {
        match self.transport.subscribe(topic) {
            Ok(()) => tracing::debug!(topic = %topic, "Subscribed"),
            Err(e) => tracing::warn!(topic = %topic, error = %e, "Failed to subscribe"),
        }
    }

    fn service(&mut self) {
        for _ in 0..self.max_frames_per_tick {
            match self.transport.poll() {
                Ok(Some(message)) => {
                    self.dispatch(&message.topic, &message.payload);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "MQTT transport error");
                    break;
                }
            }
        }
    }

    fn try_publish<P>(&mut self, topic: &str, payload: &P) -> Result<(), Error>
    where
        P: Serialize + ?Sized,
    {
        if !self.is_connected() {
            return Err(TransportError::NotConnected.into());
        }
        let bytes = self.buffer.encode(payload)?;
        self.transport.publish(topic, bytes)?;
        tracing::debug!(topic = %topic, len = bytes.len(), "Published message");
        Ok(())
    }

    fn report(&mut self, report: Report) {
        if report.is_error() {
            tracing::warn!(message = %report.message(), "Reporting error");
        } else {
            tracing::info!(message = %report.message(), "Reporting status");
        }
        self.reporter.notify(&report);

        let report = self.reporter.fit(report, self.buffer.capacity());
        let payload = self.reporter.payload(&report);
        if let Err(e) = self.try_publish(report.topic(), &payload) {
            tracing::debug!(topic = %report.topic(), error = %e, "Dropped report");
        }
    }
}

impl<T: Transport> std::fmt::Debug for MqttRouter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttRouter")
            .field("namespace", &self.namespace.as_str())
            .field("state", &self.machine.state())
            .field("adapters", &self.adapters)
            .finish_non_exhaustive()
    }
}

/// Lossy UTF-8 excerpt of a payload, cut at a character boundary.
fn preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.len() <= REPORT_PAYLOAD_PREVIEW {
        return text.into_owned();
    }
    let mut end = REPORT_PAYLOAD_PREVIEW;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
