//! Sound playback.
//!
//! - `mixer` - fixed-capacity channel mixer and its output devices

pub mod mixer;

pub use mixer::{AudioMixer, AudioSink, CpalSink, Mixer, MixerError, NullSink, Sound};
