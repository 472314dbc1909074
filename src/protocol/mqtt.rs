// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker transport backed by the synchronous `rumqttc` client.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rumqttc::{
    Client, ClientError, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS,
    RecvTimeoutError,
};

use crate::error::TransportError;

use super::codec::MQTT_BUFFER_SIZE;
use super::{InboundMessage, Transport};

/// Capacity of the request channel between the client and its event loop.
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Non-publish events skipped in one `poll` before giving the tick back.
const MAX_SKIPPED_EVENTS: usize = 16;

/// Times a request is retried after draining a full request channel.
const MAX_SEND_RETRIES: usize = 4;

/// A live session: the request handle, its event loop and the messages
/// received while draining requests.
struct Session {
    client: Client,
    connection: Connection,
    inbox: VecDeque<InboundMessage>,
}

/// Outcome of driving the event loop once.
enum Step {
    Message(InboundMessage),
    Other,
    Idle,
}

/// [`Transport`] over `rumqttc`'s blocking client.
///
/// Every `connect` builds a fresh clean session. The event loop is only
/// driven from [`poll`](Transport::poll), so nothing runs in the
/// background between ticks.
///
/// # Examples
///
/// ```no_run
/// use geoglow_controller::protocol::{RumqttTransport, Transport};
/// use std::time::Duration;
///
/// let mut transport = RumqttTransport::new()
///     .with_keep_alive(Duration::from_secs(30))
///     .with_connect_timeout(Duration::from_secs(3));
/// transport.set_server("192.168.1.50", 1883)?;
/// transport.connect("GeoGlow-team-7")?;
/// transport.subscribe("GeoGlow/team-7/#")?;
/// # Ok::<(), geoglow_controller::error::TransportError>(())
/// ```
pub struct RumqttTransport {
    server: Option<(String, u16)>,
    keep_alive: Duration,
    connect_timeout: Duration,
    poll_timeout: Duration,
    session: Option<Session>,
}

impl RumqttTransport {
    /// Default keep-alive interval.
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);
    /// Default time to wait for CONNACK.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default time `poll` waits for an event.
    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

    /// Creates a transport with no broker configured.
    #[must_use]
    pub fn new() -> Self {
        Self {
            server: None,
            keep_alive: Self::DEFAULT_KEEP_ALIVE,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            poll_timeout: Self::DEFAULT_POLL_TIMEOUT,
            session: None,
        }
    }

    /// Sets the keep-alive interval (at least one second).
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive.max(Duration::from_secs(1));
        self
    }

    /// Sets how long `connect` waits for the broker's CONNACK.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how long a single `poll` may block.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Returns the configured broker, if any.
    #[must_use]
    pub fn server(&self) -> Option<(&str, u16)> {
        self.server.as_ref().map(|(host, port)| (host.as_str(), *port))
    }

    fn options(&self, client_id: &str) -> Result<MqttOptions, TransportError> {
        let (host, port) = self
            .server
            .as_ref()
            .ok_or_else(|| TransportError::InvalidAddress("no broker configured".to_string()))?;

        let mut options = MqttOptions::new(client_id, host.as_str(), *port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options.set_max_packet_size(MQTT_BUFFER_SIZE, MQTT_BUFFER_SIZE);
        Ok(options)
    }

    fn session_mut(&mut self) -> Result<&mut Session, TransportError> {
        self.session.as_mut().ok_or(TransportError::NotConnected)
    }

    /// Sends a request, draining the event loop while the request channel
    /// is full.
    ///
    /// The channel is only emptied by the event loop, which runs inside
    /// `poll`, so a burst of requests between polls would otherwise fail.
    fn send<F>(&mut self, request: F) -> Result<(), TransportError>
    where
        F: Fn(&Client) -> Result<(), ClientError>,
    {
        for _ in 0..MAX_SEND_RETRIES {
            match request(&self.session_mut()?.client) {
                Err(ClientError::TryRequest(_)) => self.drain()?,
                result => return Ok(result?),
            }
        }
        Ok(request(&self.session_mut()?.client)?)
    }

    /// Runs the event loop until it goes idle, keeping inbound messages for
    /// the next `poll`.
    fn drain(&mut self) -> Result<(), TransportError> {
        for _ in 0..MAX_SKIPPED_EVENTS {
            match self.step()? {
                Step::Message(message) => self.session_mut()?.inbox.push_back(message),
                Step::Other => {}
                Step::Idle => break,
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Step, TransportError> {
        let timeout = self.poll_timeout;
        let event = self.session_mut()?.connection.recv_timeout(timeout);
        match event {
            Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => Ok(Step::Message(
                InboundMessage::new(publish.topic, publish.payload.to_vec()),
            )),
            Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                Err(self.drop_session("broker sent DISCONNECT"))
            }
            Ok(Ok(event)) => {
                tracing::trace!(?event, "MQTT event");
                Ok(Step::Other)
            }
            Ok(Err(e)) => Err(self.drop_session(&e.to_string())),
            Err(RecvTimeoutError::Timeout) => Ok(Step::Idle),
            Err(RecvTimeoutError::Disconnected) => Err(self.drop_session("event loop closed")),
        }
    }

    fn drop_session(&mut self, reason: &str) -> TransportError {
        if self.session.take().is_some() {
            tracing::info!(reason = %reason, "MQTT session closed");
        }
        TransportError::ConnectionFailed(reason.to_string())
    }
}

impl Default for RumqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RumqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RumqttTransport")
            .field("server", &self.server)
            .field("keep_alive", &self.keep_alive)
            .field("connected", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl Transport for RumqttTransport {
    fn set_server(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        if host.trim().is_empty() {
            return Err(TransportError::InvalidAddress("empty broker host".to_string()));
        }
        if port == 0 {
            return Err(TransportError::InvalidAddress(format!("{host}:0")));
        }
        self.server = Some((host.to_string(), port));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn connect(&mut self, client_id: &str) -> Result<(), TransportError> {
        if let Some(old) = self.session.take() {
            // The old event loop is dropped with it
            if let Err(e) = old.client.try_disconnect() {
                tracing::trace!(error = %e, "DISCONNECT not queued for previous session");
            }
        }

        let options = self.options(client_id)?;
        let (client, mut connection) = Client::new(options, REQUEST_CHANNEL_CAPACITY);

        let deadline = Instant::now() + self.connect_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(TransportError::ConnectionFailed(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    tracing::debug!(client_id = %client_id, "CONNACK received");
                    self.session = Some(Session {
                        client,
                        connection,
                        inbox: VecDeque::new(),
                    });
                    return Ok(());
                }
                Ok(Ok(event)) => tracing::trace!(?event, "Waiting for CONNACK"),
                Ok(Err(e)) => return Err(TransportError::ConnectionFailed(e.to_string())),
                Err(RecvTimeoutError::Timeout) => {
                    let ms = u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX);
                    return Err(TransportError::Timeout(ms));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::ConnectionFailed(
                        "event loop closed".to_string(),
                    ));
                }
            }
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.send(|client| client.try_subscribe(topic, QoS::AtMostOnce))
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.send(|client| client.try_publish(topic, QoS::AtMostOnce, false, payload.to_vec()))
    }

    fn poll(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        if let Some(message) = self.session_mut()?.inbox.pop_front() {
            return Ok(Some(message));
        }
        for _ in 0..MAX_SKIPPED_EVENTS {
            match self.step()? {
                Step::Message(message) => return Ok(Some(message)),
                Step::Other => {}
                Step::Idle => return Ok(None),
            }
        }
        Ok(None)
    }
}
