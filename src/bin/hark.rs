//! One-shot listener: capture a single utterance and print the transcript.
//!
//! Mirrors the flow a host UI uses: start with a ready callback, poll while
//! the render loop spins, read the result once listening ends.

use anyhow::{anyhow, Result};
use hark::audio::MicSource;
use hark::config::AppConfig;
use hark::decoder::{StreamingDecoder, VoskDecoder};
use hark::{CaptureResult, Listener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    hark::init_tracing(&config);

    if config.list_input_devices {
        match MicSource::list_devices() {
            Ok(devices) if devices.is_empty() => println!("No audio input devices detected."),
            Ok(devices) => {
                println!("Detected audio input devices:");
                for (index, name) in devices.iter().enumerate() {
                    println!("  [{index}] {name}");
                }
            }
            Err(err) => eprintln!("Failed to list audio input devices: {err:#}"),
        }
        return Ok(());
    }

    let device = resolve_device(&config)?;
    let decoder: Arc<Mutex<dyn StreamingDecoder>> = Arc::new(Mutex::new(VoskDecoder::new(
        config.model_path.as_deref(),
        config.sample_rate,
    )?));
    let mut listener = Listener::new(config.listener_config(device), decoder);

    listener.start(Some(Box::new(|| eprintln!("Listening... speak now."))));
    while listener.is_listening() {
        thread::sleep(Duration::from_millis(100));
    }

    match listener.poll_result() {
        Some(CaptureResult::Success(text)) => println!("{text}"),
        Some(CaptureResult::Empty) | None => eprintln!("(no speech detected)"),
        Some(CaptureResult::Failed(fault)) => return Err(fault.into()),
    }
    Ok(())
}

/// Turn `--input-device-index` into a concrete name using the same
/// enumeration order `--list-input-devices` prints.
fn resolve_device(config: &AppConfig) -> Result<Option<String>> {
    if let Some(index) = config.input_device_index {
        let devices = MicSource::list_devices()?;
        let name = devices
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("input device index {index} out of range (found {} devices)", devices.len()))?;
        return Ok(Some(name));
    }
    Ok(config.input_device.clone())
}
