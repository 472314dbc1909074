// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the controller.
//!
//! Each concern has its own error enum (broker transport, JSON codec,
//! configuration, lighting device, value validation). The top-level
//! [`Error`] wraps them so callers can use a single `Result` type.
//!
//! The routing loop itself never surfaces these to its caller: `tick` and
//! `publish` turn failures into log lines and error reports.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Broker transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON encoding or decoding failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration could not be loaded, saved or validated.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Lighting device request failed.
    #[error("light error: {0}")]
    Light(#[from] LightError),

    /// A value was outside its allowed range.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A topic adapter was registered with an empty suffix.
    #[error("topic adapter suffix must not be empty")]
    EmptySuffix,

    /// A topic adapter with the same suffix is already registered.
    #[error("a topic adapter is already registered for suffix {0:?}")]
    DuplicateSuffix(String),
}

/// Errors raised by an MQTT transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The MQTT client rejected a request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The broker handshake failed or the connection dropped.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The broker did not answer in time.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The broker address is unusable.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The operation needs an established connection.
    #[error("not connected")]
    NotConnected,
}

/// Errors raised while encoding or decoding JSON payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not valid JSON, or the value could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The serialized payload does not fit in the outbound buffer.
    #[error("serialized payload exceeds {capacity} byte buffer")]
    Overflow {
        /// Buffer capacity in bytes.
        capacity: usize,
    },

    /// An inbound payload is larger than the transport buffer.
    #[error("payload of {len} bytes exceeds {capacity} byte buffer")]
    TooLarge {
        /// Received payload length.
        len: usize,
        /// Buffer capacity in bytes.
        capacity: usize,
    },
}

/// Errors related to the persisted controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for this schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds an unusable value.
    #[error("invalid {field}: {message}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Errors raised by the lighting device client.
#[derive(Debug, Error)]
pub enum LightError {
    /// The HTTP request could not be performed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device rejected the auth token (or pairing mode is off).
    #[error("unauthorized")]
    Unauthorized,

    /// The device answered with an unexpected status code.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Errors related to value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A hue value is outside the valid range (0-360).
    #[error("hue value {0} is out of range [0, 360]")]
    InvalidHue(u16),

    /// A saturation value is outside the valid range (0-100).
    #[error("saturation value {0} is out of range [0, 100]")]
    InvalidSaturation(u8),

    /// A brightness value is outside the valid range (0-100).
    #[error("brightness value {0} is out of range [0, 100]")]
    InvalidBrightness(u8),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
