// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded JSON encoding and decoding.
//!
//! Outbound payloads are serialized into a fixed-capacity [`PayloadBuffer`]
//! that is reused for every publish. Nothing grows: a payload that does not
//! fit fails with [`CodecError::Overflow`] and the buffer is left empty, so a
//! truncated prefix can never reach the broker.

use std::io;

use serde::Serialize;
use serde_json::Value;

use crate::error::CodecError;

/// Capacity of the outbound JSON buffer in bytes.
pub const JSON_BUFFER_SIZE: usize = 512;

/// Largest inbound frame the transport accepts, in bytes.
pub const MQTT_BUFFER_SIZE: usize = 2048;

/// Fixed-capacity byte buffer for serialized payloads.
///
/// # Examples
///
/// ```
/// use geoglow_controller::protocol::PayloadBuffer;
///
/// let mut buffer = PayloadBuffer::<16>::new();
/// assert_eq!(buffer.encode(&serde_json::json!({"a": 1})).unwrap(), br#"{"a":1}"#);
/// assert!(buffer.encode(&serde_json::json!({"long": "xxxxxxxxxxxxxxxx"})).is_err());
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct PayloadBuffer<const N: usize = JSON_BUFFER_SIZE> {
    bytes: heapless::Vec<u8, N>,
}

impl<const N: usize> PayloadBuffer<N> {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
        }
    }

    /// Returns the buffer capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the number of bytes currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the bytes currently held.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Serializes `value` into the buffer, replacing previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if the serialized form is larger than
    /// the capacity; the buffer is empty afterwards.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&[u8], CodecError> {
        self.bytes.clear();
        if let Err(e) = serde_json::to_writer(&mut *self, value) {
            self.bytes.clear();
            return Err(if e.is_io() {
                CodecError::Overflow { capacity: N }
            } else {
                CodecError::Json(e)
            });
        }
        Ok(&self.bytes)
    }
}

impl<const N: usize> io::Write for PayloadBuffer<N> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .extend_from_slice(buf)
            .map_err(|_| io::Error::other("payload buffer full"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Decodes an inbound payload.
///
/// Any well-formed JSON value is accepted; no schema is checked.
///
/// # Errors
///
/// Returns [`CodecError::TooLarge`] for payloads over [`MQTT_BUFFER_SIZE`]
/// and [`CodecError::Json`] for malformed JSON.
pub fn decode(payload: &[u8]) -> Result<Value, CodecError> {
    if payload.len() > MQTT_BUFFER_SIZE {
        return Err(CodecError::TooLarge {
            len: payload.len(),
            capacity: MQTT_BUFFER_SIZE,
        });
    }
    Ok(serde_json::from_slice(payload)?)
}
