//! Audio device enumeration and output stream binding

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use serde::{Deserialize, Serialize};

use super::buffer::CHANNELS;
use super::callback::AudioCallback;
use super::error::{DeviceKind, EngineError};
use super::settings::DeviceReference;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Position within the API's device list, as used by [`DeviceReference`]
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

/// What the engine asks of the output device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRequest {
    pub sample_rate: u32,
    /// Preferred frames per block; the backend may commit to less
    pub block_size: u32,
}

/// An open, stereo, output-only stream. Dropping it closes the device and
/// frees the callback it owns.
pub trait OutputStream {
    /// Block size the driver committed to
    fn block_size(&self) -> u32;

    fn sample_rate(&self) -> u32;

    fn play(&mut self) -> Result<(), EngineError>;
}

/// Opens output streams for the engine
pub trait AudioBackend {
    fn open_output(
        &mut self,
        device: &DeviceReference,
        request: &OutputRequest,
        callback: AudioCallback,
    ) -> Result<Box<dyn OutputStream>, EngineError>;
}

/// Names of the audio APIs compiled into this build
pub fn list_audio_apis() -> Vec<String> {
    cpal::available_hosts()
        .into_iter()
        .map(|id| id.name().to_string())
        .collect()
}

/// Get list of available output devices for `api` (empty for the default host)
pub fn list_output_devices(api: &str) -> Result<Vec<DeviceInfo>, EngineError> {
    let host = resolve_host(api)?;
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let devices = host.output_devices().map_err(|e| EngineError::DeviceQuery {
        kind: DeviceKind::Audio,
        message: e.to_string(),
    })?;

    let mut result = Vec::new();
    for (index, device) in devices.enumerate() {
        if let Ok(name) = device.name() {
            result.push(DeviceInfo {
                index,
                is_default: Some(&name) == default_name.as_ref(),
                name,
            });
        }
    }

    Ok(result)
}

/// Get the host for an API name, or the default host if `api` is empty
pub fn resolve_host(api: &str) -> Result<cpal::Host, EngineError> {
    if api.is_empty() {
        return Ok(cpal::default_host());
    }

    let unsupported = || EngineError::UnsupportedApi {
        kind: DeviceKind::Audio,
        api: api.to_string(),
    };

    let id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(api))
        .ok_or_else(unsupported)?;

    cpal::host_from_id(id).map_err(|_| unsupported())
}

/// Get output device by index, or the host's default if `index` is None
pub fn resolve_output_device(
    host: &cpal::Host,
    index: Option<usize>,
) -> Result<cpal::Device, EngineError> {
    match index {
        Some(index) => host
            .output_devices()
            .map_err(|e| EngineError::DeviceQuery {
                kind: DeviceKind::Audio,
                message: e.to_string(),
            })?
            .nth(index)
            .ok_or(EngineError::DeviceNotFound {
                kind: DeviceKind::Audio,
                index,
            }),
        None => host
            .default_output_device()
            .ok_or(EngineError::NoDefaultDevice(DeviceKind::Audio)),
    }
}

/// Fit the requested block size into what the driver reports it can do
pub fn negotiate_block_size(requested: u32, supported: &cpal::SupportedBufferSize) -> u32 {
    match *supported {
        cpal::SupportedBufferSize::Range { min, max } if min <= max => requested.clamp(min, max),
        _ => requested,
    }
}

/// Pick a stereo stream config at the requested rate, falling back to the
/// device's default rate
fn stream_config(
    device: &cpal::Device,
    request: &OutputRequest,
) -> Result<cpal::StreamConfig, EngineError> {
    let query_error = |message: String| EngineError::DeviceQuery {
        kind: DeviceKind::Audio,
        message,
    };

    let supported_configs = device
        .supported_output_configs()
        .map_err(|e| query_error(e.to_string()))?;

    let mut supported = None;
    for config in supported_configs {
        if config.channels() as usize >= CHANNELS
            && config.sample_format() == cpal::SampleFormat::F32
            && (config.min_sample_rate().0..=config.max_sample_rate().0)
                .contains(&request.sample_rate)
        {
            supported = Some(config.with_sample_rate(cpal::SampleRate(request.sample_rate)));
            break;
        }
    }

    let supported = match supported {
        Some(config) => config,
        None => {
            let default_config = device
                .default_output_config()
                .map_err(|e| query_error(e.to_string()))?;
            log::warn!(
                "Device does not support {} Hz stereo f32; using {} Hz",
                request.sample_rate,
                default_config.sample_rate().0
            );
            default_config
        }
    };

    if (supported.channels() as usize) < CHANNELS {
        return Err(EngineError::BuildStream(format!(
            "device has {} output channel(s), {} required",
            supported.channels(),
            CHANNELS
        )));
    }

    let block_size = negotiate_block_size(request.block_size, supported.buffer_size());

    Ok(cpal::StreamConfig {
        channels: CHANNELS as u16,
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(block_size),
    })
}

/// cpal-backed audio output
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn open_output(
        &mut self,
        device: &DeviceReference,
        request: &OutputRequest,
        mut callback: AudioCallback,
    ) -> Result<Box<dyn OutputStream>, EngineError> {
        let host = resolve_host(&device.api)?;
        let output = resolve_output_device(&host, device.index)?;
        let config = stream_config(&output, request)?;

        let block_size = match config.buffer_size {
            cpal::BufferSize::Fixed(frames) => frames,
            cpal::BufferSize::Default => request.block_size,
        };
        let sample_rate = config.sample_rate.0;
        callback.set_sample_rate(sample_rate as f64);

        log::info!(
            "Opening audio output '{}' on {}: {} Hz, {} frames",
            output.name().unwrap_or_else(|_| "unknown".to_string()),
            host.id().name(),
            sample_rate,
            block_size
        );

        let stream = output
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback.run(data, None);
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| EngineError::BuildStream(e.to_string()))?;

        Ok(Box::new(CpalOutputStream {
            stream,
            block_size,
            sample_rate,
        }))
    }
}

struct CpalOutputStream {
    stream: cpal::Stream,
    block_size: u32,
    sample_rate: u32,
}

impl OutputStream for CpalOutputStream {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.stream
            .play()
            .map_err(|e| EngineError::PlayStream(e.to_string()))
    }
}

impl Drop for CpalOutputStream {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::debug!("Failed to pause stream before closing: {}", e);
        }
        log::info!("Audio output closed");
    }
}
