//! Headless engine runner
//!
//! Opens the configured devices, hosts the passthrough plugin and runs until
//! Enter is pressed.
//!
//! Usage:
//! - `clap-host [settings.json] [plugin-path [plugin-index]]`
//! - `clap-host --list-devices`

use std::env;
use std::io::{self, BufRead};
use std::process::ExitCode;

use clap_host_lib::audio::device::{list_audio_apis, list_output_devices};
use clap_host_lib::audio::midi::MidirBackend;
use clap_host_lib::audio::plugin::PassthroughHost;
use clap_host_lib::{Engine, EngineSettings};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();

    if args.get(1).map(String::as_str) == Some("--list-devices") {
        list_devices();
        return ExitCode::SUCCESS;
    }

    let settings = match args.get(1) {
        Some(path) => match EngineSettings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("{}", e);
                eprintln!("Usage: clap-host [settings.json] [plugin-path [plugin-index]]");
                return ExitCode::FAILURE;
            }
        },
        None => EngineSettings::default(),
    };

    let mut engine = Engine::new(settings, Box::new(PassthroughHost::default()));

    if let Some(plugin_path) = args.get(2) {
        let index = match args.get(3).map(|s| s.parse::<u32>()) {
            Some(Ok(index)) => index,
            Some(Err(_)) => {
                log::warn!("Invalid plugin index, using 0");
                0
            }
            None => 0,
        };
        if !engine.load_plugin(plugin_path, index) {
            return ExitCode::FAILURE;
        }
    }

    if let Err(e) = engine.start() {
        log::error!("{}", e);
        return ExitCode::FAILURE;
    }

    println!("Running. Press Enter to stop.");
    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        log::warn!("Failed to read stdin: {}", e);
    }

    engine.stop();
    ExitCode::SUCCESS
}

fn list_devices() {
    for api in list_audio_apis() {
        println!("Audio API: {}", api);
        match list_output_devices(&api) {
            Ok(devices) => {
                for device in devices {
                    let marker = if device.is_default { " (default)" } else { "" };
                    println!("  [{}] {}{}", device.index, device.name, marker);
                }
            }
            Err(e) => println!("  error: {}", e),
        }
    }

    println!("MIDI inputs:");
    match MidirBackend::list_ports() {
        Ok(ports) => {
            for port in ports {
                println!("  [{}] {}", port.index, port.name);
            }
        }
        Err(e) => println!("  error: {}", e),
    }
}
