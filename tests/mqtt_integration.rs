// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the broker transport using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::thread;
use std::time::{Duration, Instant};

use geoglow_controller::adapter::FnAdapter;
use geoglow_controller::protocol::{ConnectionState, RumqttTransport, Transport};
use geoglow_controller::{MqttRouter, RouterConfig, TransportError};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use serde_json::Value;
use tokio::runtime::Runtime;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on its own runtime.
///
/// The transport under test is blocking, so it is driven from the test
/// thread while the broker runs on the returned runtime.
fn start_mock_broker(port: u16) -> Runtime {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };
    runtime.spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind
    thread::sleep(Duration::from_millis(500));
    runtime
}

fn transport() -> RumqttTransport {
    RumqttTransport::new()
        .with_connect_timeout(Duration::from_secs(3))
        .with_poll_timeout(Duration::from_millis(20))
}

// ============================================================================
// RumqttTransport Tests
// ============================================================================

mod transport {
    use super::*;

    #[test]
    fn connect_subscribe_publish() {
        let port = get_test_port();
        let _broker = start_mock_broker(port);

        let mut transport = transport();
        transport.set_server("127.0.0.1", port).unwrap();
        transport.connect("GeoGlow-it-1").unwrap();
        assert!(transport.is_connected());

        transport.subscribe("GeoGlow/it-1/#").unwrap();
        transport
            .publish("GeoGlow/it-1/state", br#"{"on":true}"#)
            .unwrap();

        // Servicing the session must not drop it
        for _ in 0..5 {
            transport.poll().unwrap();
        }
        assert!(transport.is_connected());
    }

    #[test]
    fn subscribe_burst_larger_than_request_channel() {
        let port = get_test_port();
        let _broker = start_mock_broker(port);

        let mut transport = transport();
        transport.set_server("127.0.0.1", port).unwrap();
        transport.connect("GeoGlow-it-6").unwrap();

        let results: Vec<bool> = (0..24)
            .map(|i| transport.subscribe(&format!("GeoGlow/it-6/room-{i}/set")).is_ok())
            .collect();
        assert!(results.iter().all(|ok| *ok), "subscribe results: {results:?}");
        assert!(transport.is_connected());
    }

    #[test]
    fn publish_burst_larger_than_request_channel() {
        let port = get_test_port();
        let _broker = start_mock_broker(port);

        let mut transport = transport();
        transport.set_server("127.0.0.1", port).unwrap();
        transport.connect("GeoGlow-it-7").unwrap();

        for i in 0..24 {
            transport
                .publish("GeoGlow/it-7/state", format!("{{\"n\":{i}}}").as_bytes())
                .unwrap();
        }
        assert!(transport.is_connected());
    }

    #[test]
    fn reconnect_replaces_previous_session() {
        let port = get_test_port();
        let _broker = start_mock_broker(port);

        let mut transport = transport();
        transport.set_server("127.0.0.1", port).unwrap();
        transport.connect("GeoGlow-it-9").unwrap();
        transport.connect("GeoGlow-it-9").unwrap();

        assert!(transport.is_connected());
        transport.subscribe("GeoGlow/it-9/#").unwrap();
    }

    #[test]
    fn connect_to_missing_broker_fails() {
        let port = get_test_port();
        let mut transport = transport();
        transport.set_server("127.0.0.1", port).unwrap();

        let result = transport.connect("GeoGlow-it-2");
        assert!(
            matches!(
                result,
                Err(TransportError::ConnectionFailed(_) | TransportError::Timeout(_))
            ),
            "unexpected result: {result:?}"
        );
        assert!(!transport.is_connected());
    }
}

// ============================================================================
// MqttRouter over RumqttTransport
// ============================================================================

mod router {
    use super::*;

    fn tick_until_connected(router: &mut MqttRouter<RumqttTransport>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !router.is_connected() && Instant::now() < deadline {
            router.tick();
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn connects_and_reports_status() {
        let port = get_test_port();
        let _broker = start_mock_broker(port);

        let config = RouterConfig::new("127.0.0.1", "it-3").with_port(port);
        let mut router = MqttRouter::initialize(transport(), config);
        router
            .register_adapter(FnAdapter::new("color-palette/set", |_: &str, _: &Value, _: usize| {}))
            .unwrap();

        tick_until_connected(&mut router);
        assert_eq!(router.connection_state(), ConnectionState::Connected);
        assert_eq!(router.client_id(), "GeoGlow-it-3");

        let reports = std::rc::Rc::new(std::cell::Cell::new(0));
        let errors = std::rc::Rc::clone(&reports);
        router.on_report(move |report| {
            if report.is_error() {
                errors.set(errors.get() + 1);
            }
        });

        router.report_status("boot", "integration test");
        router.publish("GeoGlow/it-3/state", &serde_json::json!({"on": true}));
        router.tick();

        assert!(router.is_connected());
        assert_eq!(reports.get(), 0, "publishing while connected reports nothing");
    }

    #[test]
    fn many_adapters_stay_connected() {
        let port = get_test_port();
        let _broker = start_mock_broker(port);

        let config = RouterConfig::new("127.0.0.1", "it-8").with_port(port);
        let mut router = MqttRouter::initialize(transport(), config);
        for i in 0..12 {
            router
                .register_adapter(FnAdapter::new(
                    format!("room-{i}/set"),
                    |_: &str, _: &Value, _: usize| {},
                ))
                .unwrap();
        }

        tick_until_connected(&mut router);
        assert!(router.is_connected());

        // Every subscription went out, so the channel has room again
        router.tick();
        assert!(
            router
                .transport_mut()
                .subscribe("GeoGlow/it-8/extra")
                .is_ok()
        );
    }

    #[test]
    fn keeps_retrying_without_broker() {
        let port = get_test_port();
        let config = RouterConfig::new("127.0.0.1", "it-4")
            .with_port(port)
            .with_retry_delay(Duration::from_millis(50));
        let mut router = MqttRouter::initialize(transport(), config);

        let start = Instant::now();
        router.tick_at(start);
        assert_eq!(router.connection_state(), ConnectionState::Connecting);

        router.tick_at(start + Duration::from_millis(100));
        assert_eq!(router.connection_state(), ConnectionState::Connecting);
        assert!(!router.is_connected());
    }

    #[test]
    fn connects_once_broker_appears() {
        let port = get_test_port();
        let config = RouterConfig::new("127.0.0.1", "it-5")
            .with_port(port)
            .with_retry_delay(Duration::from_millis(50));
        let mut router = MqttRouter::initialize(transport(), config);

        router.tick();
        assert!(!router.is_connected());

        let _broker = start_mock_broker(port);
        tick_until_connected(&mut router);
        assert!(router.is_connected());
    }
}
