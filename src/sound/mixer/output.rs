// output.rs - Mixer bound to an output device

//! Mixer lifecycle on top of an [`AudioSink`].
//!
//! [`AudioMixer::init`] opens the sink, checks that it runs signed 16-bit
//! stereo and starts playback; [`AudioMixer::finish`] (also run on drop)
//! pauses, stops every channel and closes the sink.

use std::sync::Arc;

use crate::sound::mixer::mix::Mixer;
use crate::sound::mixer::sink::AudioSink;
use crate::sound::mixer::types::*;

/// Mixer driving an output device
pub struct AudioMixer<S: AudioSink, const N: usize = MAX_CHANNELS> {
    sink: S,
    mixer: Arc<Mixer<N>>,
    spec: AudioSpec,
    running: bool,
}

impl<S: AudioSink, const N: usize> AudioMixer<S, N> {
    /// Open `sink` with the `desired` format and start mixing into it.
    ///
    /// Fails if the device cannot be opened or runs anything other than
    /// signed 16-bit stereo. On failure the sink is left closed.
    ///
    /// The device may run at a different frequency or buffer size than
    /// requested; mixing is per frame, so either is accepted and reported by
    /// [`AudioMixer::spec`].
    pub fn init(mut sink: S, desired: AudioSpec) -> Result<Self, MixerError> {
        let mixer: Arc<Mixer<N>> = Arc::new(Mixer::new());
        let callback_mixer = Arc::clone(&mixer);

        let spec = sink.open(
            &desired,
            Box::new(move |frames: &mut [StereoFrame]| callback_mixer.mix(frames)),
        )?;

        if !spec.is_stereo16() {
            sink.close();
            return Err(MixerError::FormatMismatch {
                format: spec.format,
                channels: spec.channels,
            });
        }

        if spec.frequency != desired.frequency {
            log::warn!(
                "Requested {}Hz, audio device runs at {}Hz",
                desired.frequency,
                spec.frequency
            );
        }

        mixer.reset();

        if let Err(err) = sink.pause(false) {
            sink.close();
            return Err(err);
        }

        log::info!(
            "Audio mixer started: {}Hz, {} frames per buffer, {} channels",
            spec.frequency,
            spec.frames,
            N
        );

        Ok(AudioMixer {
            sink,
            mixer,
            spec,
            running: true,
        })
    }

    /// Stop playback and close the device. Safe to call more than once.
    pub fn finish(&mut self) {
        if !self.running {
            return;
        }

        if let Err(err) = self.sink.pause(true) {
            log::warn!("Failed to pause audio device: {}", err);
        }
        self.mixer.reset();
        self.sink.close();
        self.running = false;

        log::info!("Audio mixer stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Format the device is running at
    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Control surface: play, volume, enable
    pub fn mixer(&self) -> &Mixer<N> {
        &self.mixer
    }

    /// Shared handle to the mixer for other threads
    pub fn handle(&self) -> Arc<Mixer<N>> {
        Arc::clone(&self.mixer)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: AudioSink, const N: usize> Drop for AudioMixer<S, N> {
    fn drop(&mut self) {
        self.finish();
    }
}
