// cpal_sink.rs - Audio output through cpal

//! [`AudioSink`] backed by a cpal output stream.
//!
//! The stream is built for signed 16-bit interleaved samples. A device with a
//! 16-bit config for the requested channel count runs at the requested rate
//! when it can, otherwise at the closest rate it supports. A device with no
//! such config reports its default config instead, so the mixer refuses it
//! during init.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SupportedBufferSize, SupportedStreamConfig, SupportedStreamConfigRange};

use crate::sound::mixer::sink::{AudioSink, MixCallback};
use crate::sound::mixer::types::*;

impl From<cpal::SampleFormat> for SampleFormat {
    fn from(format: cpal::SampleFormat) -> Self {
        match format {
            cpal::SampleFormat::U8 => SampleFormat::U8,
            cpal::SampleFormat::I16 => SampleFormat::S16,
            cpal::SampleFormat::U16 => SampleFormat::U16,
            cpal::SampleFormat::I32 => SampleFormat::S32,
            cpal::SampleFormat::F32 => SampleFormat::F32,
            _ => SampleFormat::Other,
        }
    }
}

/// Rate within `range` closest to `frequency`
fn nearest_rate(range: &SupportedStreamConfigRange, frequency: u32) -> u32 {
    frequency
        .max(range.min_sample_rate().0)
        .min(range.max_sample_rate().0)
}

/// Pick a signed 16-bit stream config with the requested channel count.
///
/// A range that covers the requested rate wins. Otherwise the range whose
/// nearest rate is closest to the request is used at that rate.
fn select_config<I>(ranges: I, desired: &AudioSpec) -> Option<cpal::StreamConfig>
where
    I: IntoIterator<Item = SupportedStreamConfigRange>,
{
    let range = ranges
        .into_iter()
        .filter(|r| r.sample_format() == cpal::SampleFormat::I16 && r.channels() == desired.channels)
        .min_by_key(|r| nearest_rate(r, desired.frequency).abs_diff(desired.frequency))?;

    let buffer_size = match range.buffer_size() {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&desired.frames) => {
            BufferSize::Fixed(desired.frames)
        }
        _ => BufferSize::Default,
    };

    Some(cpal::StreamConfig {
        channels: desired.channels,
        sample_rate: cpal::SampleRate(nearest_rate(&range, desired.frequency)),
        buffer_size,
    })
}

/// Spec to report for a device with no usable 16-bit config.
///
/// The device default is reported so init names the real format. A default
/// that claims 16-bit stereo contradicts the listed configs and is an error.
fn unusable_spec(fallback: &SupportedStreamConfig, desired: &AudioSpec) -> Result<AudioSpec, MixerError> {
    let spec = AudioSpec {
        frequency: fallback.sample_rate().0,
        format: fallback.sample_format().into(),
        channels: fallback.channels(),
        frames: desired.frames,
    };
    if spec.is_stereo16() {
        return Err(MixerError::DeviceOpen(
            "no 16-bit stereo output config available".to_string(),
        ));
    }
    Ok(spec)
}

/// Output through the system audio device
pub struct CpalSink {
    device: Option<cpal::Device>,
    stream: Option<cpal::Stream>,
}

impl CpalSink {
    /// Sink for the default output device of the default host
    pub fn new() -> Self {
        CpalSink {
            device: None,
            stream: None,
        }
    }

    /// Sink for a specific device
    pub fn with_device(device: cpal::Device) -> Self {
        CpalSink {
            device: Some(device),
            stream: None,
        }
    }

    fn take_device(&mut self) -> Result<cpal::Device, MixerError> {
        match self.device.take() {
            Some(device) => Ok(device),
            None => cpal::default_host()
                .default_output_device()
                .ok_or_else(|| MixerError::DeviceOpen("no default output device".to_string())),
        }
    }

    fn open_stream(
        &mut self,
        device: &cpal::Device,
        desired: &AudioSpec,
        mut callback: MixCallback,
    ) -> Result<AudioSpec, MixerError> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", name);

        let ranges = device
            .supported_output_configs()
            .map_err(|e| MixerError::DeviceOpen(e.to_string()))?;

        let Some(config) = select_config(ranges, desired) else {
            let fallback = device
                .default_output_config()
                .map_err(|e| MixerError::DeviceOpen(e.to_string()))?;
            return unusable_spec(&fallback, desired);
        };

        if config.sample_rate.0 != desired.frequency {
            log::warn!(
                "Audio device does not support {}Hz, using {}Hz",
                desired.frequency,
                config.sample_rate.0
            );
        }

        log::info!(
            "Audio config: {} channels, {}Hz, {:?}",
            config.channels,
            config.sample_rate.0,
            config.buffer_size
        );

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    callback(StereoFrame::from_interleaved_mut(data));
                },
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| MixerError::DeviceOpen(e.to_string()))?;

        stream
            .pause()
            .map_err(|e| MixerError::Stream(e.to_string()))?;

        self.stream = Some(stream);
        Ok(AudioSpec {
            frequency: config.sample_rate.0,
            format: SampleFormat::S16,
            channels: config.channels,
            frames: match config.buffer_size {
                BufferSize::Fixed(frames) => frames,
                BufferSize::Default => desired.frames,
            },
        })
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for CpalSink {
    fn open(&mut self, desired: &AudioSpec, callback: MixCallback) -> Result<AudioSpec, MixerError> {
        self.close();

        let device = self.take_device()?;
        let result = self.open_stream(&device, desired, callback);
        // Kept on failure too, so a retry opens the same device
        self.device = Some(device);
        result
    }

    fn pause(&mut self, paused: bool) -> Result<(), MixerError> {
        let stream = self.stream.as_ref().ok_or(MixerError::NotOpen)?;
        let result = if paused {
            stream.pause().map_err(|e| e.to_string())
        } else {
            stream.play().map_err(|e| e.to_string())
        };
        result.map_err(MixerError::Stream)
    }

    fn close(&mut self) {
        // Dropping the stream stops the device callback
        self.stream = None;
    }
}
