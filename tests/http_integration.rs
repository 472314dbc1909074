// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the light panel HTTP client using wiremock.

#![cfg(feature = "http")]

use geoglow_controller::LightError;
use geoglow_controller::adapter::TopicAdapter;
use geoglow_controller::light::{ColorPaletteAdapter, HsbColor, NanoleafClient};
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock panel plus the runtime serving it.
///
/// The client under test is blocking and must not run inside the runtime,
/// so mocks are mounted through `block_on` and requests are made from the
/// test thread.
struct Panel {
    // Dropped first so expectations are verified while the runtime lives
    server: MockServer,
    runtime: Runtime,
}

impl Panel {
    fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn client(&self, token: &str) -> NanoleafClient {
        NanoleafClient::new(self.server.uri(), token).unwrap()
    }
}

// ============================================================================
// Connection and pairing
// ============================================================================

mod pairing {
    use super::*;

    #[test]
    fn connected_with_valid_token() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("GET"))
                .and(path("/api/v1/good/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "name": "Shapes 4D2A",
                    "firmwareVersion": "9.2.4"
                }))),
        );

        let client = panel.client("good");
        assert!(client.is_connected());
        assert_eq!(client.info().unwrap()["name"], "Shapes 4D2A");
    }

    #[test]
    fn unauthorized_token() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("GET"))
                .and(path("/api/v1/bad/"))
                .respond_with(ResponseTemplate::new(401)),
        );

        let client = panel.client("bad");
        assert!(!client.is_connected());
        assert!(matches!(client.info(), Err(LightError::Unauthorized)));
    }

    #[test]
    fn generate_token_in_pairing_mode() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("POST"))
                .and(path("/api/v1/new"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"auth_token": "fresh"})),
                ),
        );

        let client = panel.client("");
        assert_eq!(client.generate_token().unwrap(), "fresh");
    }

    #[test]
    fn generate_token_outside_pairing_mode() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("POST"))
                .and(path("/api/v1/new"))
                .respond_with(ResponseTemplate::new(403)),
        );

        let client = panel.client("");
        assert!(matches!(
            client.generate_token(),
            Err(LightError::Unauthorized)
        ));
    }
}

// ============================================================================
// Panel control
// ============================================================================

mod control {
    use super::*;

    #[test]
    fn set_power_sends_state() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("PUT"))
                .and(path("/api/v1/tok/state"))
                .and(body_json(json!({"on": {"value": true}})))
                .respond_with(ResponseTemplate::new(204))
                .expect(1),
        );

        panel.client("tok").set_power(true).unwrap();
    }

    #[test]
    fn panel_ids_from_layout() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("GET"))
                .and(path("/api/v1/tok/panelLayout/layout"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "numPanels": 2,
                    "sideLength": 100,
                    "positionData": [
                        {"panelId": 4211, "x": 0, "y": 0, "o": 0, "shapeType": 7},
                        {"panelId": 977, "x": 100, "y": 0, "o": 60, "shapeType": 7}
                    ]
                }))),
        );

        assert_eq!(
            panel.client("tok").panel_ids().unwrap(),
            vec!["4211".to_string(), "977".to_string()]
        );
    }

    #[test]
    fn malformed_layout() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("GET"))
                .and(path("/api/v1/tok/panelLayout/layout"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"panels": []}))),
        );

        assert!(matches!(
            panel.client("tok").panel_ids(),
            Err(LightError::UnexpectedFormat(_))
        ));
    }

    #[test]
    fn server_error_status() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("PUT"))
                .and(path("/api/v1/tok/state"))
                .respond_with(ResponseTemplate::new(500)),
        );

        assert!(matches!(
            panel.client("tok").set_power(false),
            Err(LightError::Status(500))
        ));
    }

    #[test]
    fn display_palette_writes_effect() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("PUT"))
                .and(path("/api/v1/tok/effects"))
                .and(body_partial_json(json!({
                    "write": {
                        "command": "display",
                        "animType": "random",
                        "colorType": "HSB",
                        "palette": [{"hue": 30, "saturation": 90, "brightness": 70}]
                    }
                })))
                .respond_with(ResponseTemplate::new(204))
                .expect(1),
        );

        panel
            .client("tok")
            .display_palette(&[HsbColor::new(30, 90, 70).unwrap()])
            .unwrap();
    }
}

// ============================================================================
// ColorPaletteAdapter over HTTP
// ============================================================================

mod palette_adapter {
    use super::*;

    #[test]
    fn palette_message_reaches_panel() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("PUT"))
                .and(path("/api/v1/tok/effects"))
                .and(body_partial_json(json!({
                    "write": {"palette": [
                        {"hue": 0, "saturation": 100, "brightness": 100},
                        {"hue": 120, "saturation": 100, "brightness": 50}
                    ]}
                })))
                .respond_with(ResponseTemplate::new(204))
                .expect(1),
        );

        let mut adapter = ColorPaletteAdapter::new(panel.client("tok"));
        let payload = json!({"palette": [
            {"hue": 0, "saturation": 100, "brightness": 100},
            {"hue": 120, "saturation": 100, "brightness": 50}
        ]});
        adapter.on_message("GeoGlow/f/color-palette/set", &payload, 0);
    }

    #[test]
    fn invalid_palette_sends_nothing() {
        let panel = Panel::start();
        panel.mount(
            Mock::given(method("PUT"))
                .respond_with(ResponseTemplate::new(204))
                .expect(0),
        );

        let mut adapter = ColorPaletteAdapter::new(panel.client("tok"));
        adapter.on_message(
            "GeoGlow/f/color-palette/set",
            &json!({"palette": [{"hue": 720}]}),
            0,
        );
    }
}
