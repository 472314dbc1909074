// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT routing between the broker and the controller's topic adapters.
//!
//! # Components
//!
//! - [`MqttRouter`]: owns the broker connection, the adapter registry and the
//!   reconnect state machine; dispatches inbound messages and publishes
//!   outbound ones
//! - [`Transport`]: the primitives the router needs from an MQTT client
//! - [`RumqttTransport`]: the `rumqttc`-backed transport (feature `mqtt`)
//! - [`StatusReporter`]: builds status and error reports
//! - [`topic_matches`] and [`Namespace`]: topic tree and wildcard rules
//!
//! # Data Flow
//!
//! ```text
//! broker frame ──► Transport::poll ──► MqttRouter::dispatch
//!                                          │ decode JSON (fail → error report)
//!                                          │ first adapter whose namespaced topic matches
//!                                          ▼
//!                                   TopicAdapter::on_message
//!
//! MqttRouter::publish ──► PayloadBuffer (bounded) ──► Transport::publish
//! ```

mod codec;
#[cfg(feature = "mqtt")]
mod mqtt;
mod reconnect;
mod status;
mod topic;
mod topic_router;

pub use codec::{JSON_BUFFER_SIZE, MQTT_BUFFER_SIZE, PayloadBuffer, decode};
#[cfg(feature = "mqtt")]
pub use mqtt::RumqttTransport;
pub use reconnect::{ConnectionState, ReconnectMachine};
pub use status::{Report, StatusReporter};
pub use topic::{ERROR_TOPIC, Namespace, PING_TOPIC, PRODUCT_PREFIX, STATUS_TOPIC, topic_matches};
pub use topic_router::{Dispatch, MqttRouter, RouterConfig};

use crate::error::TransportError;

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The concrete topic the message was published on.
    pub topic: String,
    /// The raw payload bytes.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Creates a new inbound message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Primitives the router needs from an MQTT client.
///
/// Implementations are driven from a single thread by [`MqttRouter::tick`];
/// none of the methods may spawn work that calls back into the router.
pub trait Transport {
    /// Sets the broker the next [`connect`](Transport::connect) targets.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidAddress` if the address is unusable.
    fn set_server(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    /// Returns whether the transport currently holds a live session.
    fn is_connected(&self) -> bool;

    /// Performs the connect handshake with the given client id.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker cannot be reached or refuses the
    /// session.
    fn connect(&mut self, client_id: &str) -> Result<(), TransportError>;

    /// Requests a QoS 0 subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be queued.
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Publishes a non-retained QoS 0 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Services the connection once and yields at most one inbound message.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection failed while servicing; the
    /// transport must report `is_connected() == false` afterwards.
    fn poll(&mut self) -> Result<Option<InboundMessage>, TransportError>;
}
