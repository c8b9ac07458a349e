// mod.rs - Audio mixer module

//! Fixed-capacity software mixer.
//!
//! Up to [`MAX_CHANNELS`] mono sounds play at once and are written into an
//! interleaved 16-bit stereo device buffer on every device callback.
//!
//! # Architecture
//!
//! - `types` - Output frame layout, device format contract, errors
//! - `buffer` - Immutable mono sound buffers
//! - `channel` - Fixed pool of playback channels
//! - `mix` - Mixer context and the per-buffer mixing loop
//! - `sink` - Output device abstraction and a headless sink
//! - `cpal_sink` - Output through cpal
//! - `output` - Mixer lifecycle on top of a sink
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chanmix::sound::mixer::{AudioMixer, AudioSpec, CpalSink, Sound};
//!
//! let audio: AudioMixer<CpalSink> = AudioMixer::init(CpalSink::new(), AudioSpec::default())?;
//! audio.mixer().set_volume(0.5);
//! audio.mixer().play(Arc::new(Sound::new(vec![0i16; 4410])));
//! ```

pub mod buffer;
pub mod channel;
pub mod cpal_sink;
pub mod mix;
pub mod output;
pub mod sink;
pub mod types;

pub use types::{
    AudioSpec, MixerError, SampleFormat, StereoFrame, DEFAULT_BUFFER_FRAMES, DEFAULT_FREQUENCY,
    MAX_CHANNELS, OUTPUT_CHANNELS, SINT16_SCALE,
};

pub use buffer::Sound;
pub use channel::{Channel, ChannelPool};
pub use cpal_sink::CpalSink;
pub use mix::{amplitude_for_volume, Mixer};
pub use output::AudioMixer;
pub use sink::{AudioSink, MixCallback, NullSink};
