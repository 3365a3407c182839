use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, Host, SampleFormat, Stream, StreamConfig};
use tracing::{info, warn};

use crate::audio::ring::SampleRing;
use crate::config::Config;
use crate::error::CaptureError;

/// Anything a capture backend can hand interleaved sample batches to.
///
/// Called on the backend's own audio thread, so implementations must not block.
pub trait SampleSink: Send + Sync {
    fn deliver(&self, samples: &[f32], channel_count: usize);
}

impl SampleSink for SampleRing {
    fn deliver(&self, samples: &[f32], channel_count: usize) {
        self.write(samples, channel_count);
    }
}

impl<T: SampleSink + ?Sized> SampleSink for Arc<T> {
    fn deliver(&self, samples: &[f32], channel_count: usize) {
        (**self).deliver(samples, channel_count);
    }
}

pub fn input_device_names(host: &Host) -> Result<Vec<String>, CaptureError> {
    let mut devices = Vec::new();

    for device in host.input_devices()? {
        if let Ok(name) = device.name() {
            devices.push(name);
        }
    }

    Ok(devices)
}

/// Resolve `source` to an input device: `"auto"` is the host default, anything else
/// must match a device name exactly.
pub fn get_input_device(host: &Host, config: &Config) -> Result<Device, CaptureError> {
    if config.uses_default_source() {
        return host.default_input_device().ok_or(CaptureError::NoDevice);
    }

    for device in host.input_devices()? {
        if let Ok(name) = device.name() {
            if name == config.audio_source {
                return Ok(device);
            }
        }
    }

    Err(CaptureError::DeviceNotFound(config.audio_source.clone()))
}

pub fn create_stream_config(channels: u16, sample_rate: u32, buffer_size: usize) -> StreamConfig {
    StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: BufferSize::Fixed(buffer_size as u32),
    }
}

/// A running input stream feeding a [`SampleSink`].
///
/// Dropping it stops the backend callbacks.
pub struct CaptureStream {
    stream: Stream,
    device_name: String,
    channels: u16,
}

impl CaptureStream {
    pub fn start(
        host: &Host,
        config: &Config,
        sink: Arc<dyn SampleSink>,
    ) -> Result<Self, CaptureError> {
        let device = get_input_device(host, config)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());

        let input_config = device.default_input_config()?;
        if input_config.sample_format() != SampleFormat::F32 {
            return Err(CaptureError::SampleFormat(input_config.sample_format()));
        }

        let channels = input_config.channels();
        let stream_config = create_stream_config(channels, config.sample_rate, config.buffer_size);

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                sink.deliver(data, channels as usize);
            },
            |err| warn!("input stream error: {}", err),
            None,
        )?;
        stream.play()?;

        info!(
            device = %device_name,
            channels,
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "capture started"
        );

        Ok(Self {
            stream,
            device_name,
            channels,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Stop callbacks and release the device.
    pub fn stop(self) {
        if let Err(err) = self.stream.pause() {
            warn!("failed to pause input stream: {}", err);
        }
        info!(device = %self.device_name, "capture stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_uses_fixed_buffer() {
        let config = create_stream_config(2, 48000, 1024);
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, cpal::SampleRate(48000));
        assert_eq!(config.buffer_size, BufferSize::Fixed(1024));
    }

    #[test]
    fn test_ring_is_a_sample_sink() {
        let ring = Arc::new(SampleRing::new(16));
        let sink: Arc<dyn SampleSink> = ring.clone();

        sink.deliver(&[0.2, 0.4, 1.0, 1.0], 2);

        let mut out = [0.0; 2];
        assert_eq!(ring.read(&mut out), 2);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert_eq!(out[1], 1.0);
    }
}
