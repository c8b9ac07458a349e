// types.rs - Core types and constants for the audio mixer

//! Core types and constants for the channel mixer.
//!
//! This module defines the output frame layout, the device format contract
//! and the mixer error type.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Number of playback channels in the default pool
pub const MAX_CHANNELS: usize = 8;

/// Default output frequency in Hz
pub const DEFAULT_FREQUENCY: u32 = 44100;

/// Default device buffer size in frames
pub const DEFAULT_BUFFER_FRAMES: u32 = 1024;

/// Scale between a 16-bit sample and the normalized range [-1, 1]
pub const SINT16_SCALE: f64 = 32768.0;

/// Number of interleaved channels in the mix output
pub const OUTPUT_CHANNELS: u16 = 2;

/// One interleaved stereo output frame.
///
/// Layout-compatible with `[i16; 2]`, so interleaved device buffers can be
/// viewed as frames without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct StereoFrame {
    pub left: i16,
    pub right: i16,
}

impl StereoFrame {
    pub const SILENCE: StereoFrame = StereoFrame { left: 0, right: 0 };

    /// Frame carrying the same sample on both sides
    pub const fn mono(sample: i16) -> Self {
        StereoFrame {
            left: sample,
            right: sample,
        }
    }

    /// View an interleaved `L R L R ...` buffer as frames.
    ///
    /// # Panics
    /// Panics if `samples` holds an odd number of values. Device buffers are
    /// always whole frames; anything else is a broken sink.
    pub fn from_interleaved_mut(samples: &mut [i16]) -> &mut [StereoFrame] {
        assert!(
            samples.len() % OUTPUT_CHANNELS as usize == 0,
            "interleaved stereo buffer has odd length {}",
            samples.len()
        );
        bytemuck::cast_slice_mut(samples)
    }

    /// View a raw native-endian byte buffer as frames.
    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut [StereoFrame], MixerError> {
        let len = bytes.len();
        bytemuck::try_cast_slice_mut(bytes).map_err(|_| MixerError::BufferLayout { len })
    }
}

/// Sample format reported by an output device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    S16,
    U16,
    S32,
    F32,
    Other,
}

/// Output format requested from, or obtained by, an audio sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    /// Frames per second
    pub frequency: u32,
    pub format: SampleFormat,
    pub channels: u16,
    /// Frames per device buffer
    pub frames: u32,
}

impl AudioSpec {
    /// The only format the mixer can produce: signed 16-bit stereo
    pub fn stereo16(frequency: u32, frames: u32) -> Self {
        AudioSpec {
            frequency,
            format: SampleFormat::S16,
            channels: OUTPUT_CHANNELS,
            frames,
        }
    }

    /// Whether a sink running with this spec can take mixer output
    pub fn is_stereo16(&self) -> bool {
        self.format == SampleFormat::S16 && self.channels == OUTPUT_CHANNELS
    }
}

impl Default for AudioSpec {
    fn default() -> Self {
        AudioSpec::stereo16(DEFAULT_FREQUENCY, DEFAULT_BUFFER_FRAMES)
    }
}

/// Mixer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixerError {
    #[error("Cannot start audio: {0}")]
    DeviceOpen(String),

    #[error("System audio spec must be signed 16-bit stereo (got {format:?}, {channels} channels)")]
    FormatMismatch {
        format: SampleFormat,
        channels: u16,
    },

    #[error("Reached maximum number of {max} active sounds")]
    ChannelsExhausted { max: usize },

    #[error("Buffer of {len} bytes is not a whole number of aligned stereo frames")]
    BufferLayout { len: usize },

    #[error("Audio device is not open")]
    NotOpen,

    #[error("Audio stream error: {0}")]
    Stream(String),
}
