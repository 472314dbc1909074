// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GeoGlow controller daemon.
//!
//! Pairs with the light panel, connects to the broker, applies palettes
//! received on `GeoGlow/<friendId>/color-palette/set` and pings the friend
//! service every 30 seconds.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use geoglow_controller::heartbeat::ping_payload;
use geoglow_controller::light::{ColorPaletteAdapter, NanoleafClient};
use geoglow_controller::protocol::PING_TOPIC;
use geoglow_controller::{
    ConfigError, ControllerConfig, DeviceId, Heartbeat, MqttRouter, RumqttTransport, logging,
};

/// Pause between main loop iterations.
const LOOP_DELAY: Duration = Duration::from_millis(10);

/// Pause between pairing attempts with the light panel.
const PANEL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How long the panels stay lit during the startup blink.
const IDENTIFY_DURATION: Duration = Duration::from_millis(1500);

#[derive(Parser, Debug)]
#[command(name = "geoglow-controller")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level or filter directive, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init(&args.log_level) {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Controller stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> geoglow_controller::Result<()> {
    let mut config = ControllerConfig::load_or_default(&args.config);
    let mut changed = config.ensure_device_id();
    let device_id = config.device_id.unwrap_or_default();

    let panel = connect_panel(&mut config, &mut changed)?;
    if changed && let Err(e) = config.save(&args.config) {
        tracing::warn!(path = %args.config.display(), error = %e, "Failed to save config");
    }

    let router_config = config.router_config()?;
    let friend_id = router_config.friend_id().to_string();
    let mut router = MqttRouter::initialize(RumqttTransport::new(), router_config);
    router.register_adapter(ColorPaletteAdapter::new(panel.clone()))?;

    identify(&panel);

    tracing::info!(device_id = %device_id, friend_id = %friend_id, "Controller running");
    let mut heartbeat = Heartbeat::default();
    let mut booted = false;
    loop {
        router.tick();

        if router.is_connected() {
            if !booted {
                router.report_status("boot", format!("controller {device_id} online"));
                booted = true;
            }
            if heartbeat.due(Instant::now()) {
                ping(&mut router, &panel, &friend_id, device_id);
            }
        }

        thread::sleep(LOOP_DELAY);
    }
}

/// Blocks until the panel accepts the configured token, requesting a new
/// one while it does not.
fn connect_panel(
    config: &mut ControllerConfig,
    changed: &mut bool,
) -> geoglow_controller::Result<NanoleafClient> {
    if config.nanoleaf_base_url.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "nanoleafBaseUrl".to_string(),
            message: "must not be empty".to_string(),
        }
        .into());
    }

    let mut panel = NanoleafClient::new(&config.nanoleaf_base_url, &config.nanoleaf_auth_token)?;
    while !panel.is_connected() {
        tracing::info!(url = %panel.base_url(), "Requesting light panel token");
        match panel.generate_token() {
            Ok(token) => {
                panel.set_auth_token(token.clone());
                config.nanoleaf_auth_token = token;
                *changed = true;
                continue;
            }
            Err(e) => tracing::warn!(
                error = %e,
                "Token request failed; hold the panel power button to enable pairing"
            ),
        }
        thread::sleep(PANEL_RETRY_DELAY);
    }

    tracing::info!(url = %panel.base_url(), "Light panel connected");
    Ok(panel)
}

/// Blinks the panels once so the user can see which controller started.
fn identify(panel: &NanoleafClient) {
    if let Err(e) = panel.set_power(true) {
        tracing::warn!(error = %e, "Failed to switch panels on");
        return;
    }
    thread::sleep(IDENTIFY_DURATION);
    if let Err(e) = panel.set_power(false) {
        tracing::warn!(error = %e, "Failed to switch panels off");
    }
}

fn ping(
    router: &mut MqttRouter<RumqttTransport>,
    panel: &NanoleafClient,
    friend_id: &str,
    device_id: DeviceId,
) {
    let panel_ids = panel.panel_ids().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read panel layout");
        Vec::new()
    });
    router.publish(PING_TOPIC, &ping_payload(friend_id, device_id, &panel_ids));
}
