// mix.rs - Main mixing logic

//! Mixer context and the per-buffer mixing loop.
//!
//! A [`Mixer`] is shared between the control thread (play, volume, enable)
//! and the device callback (mix). The enable flag and volume are atomics;
//! the channel pool sits behind a mutex that the callback takes once per
//! buffer and that control operations hold only for a slot scan.
//!
//! Sounds are only ever dropped by control operations, after the pool lock
//! is released, so the callback never waits behind a deallocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use portable_atomic::AtomicF32;

use crate::sound::mixer::buffer::Sound;
use crate::sound::mixer::channel::ChannelPool;
use crate::sound::mixer::types::*;

/// Gain factor applied to normalized samples at a given volume.
///
/// `10^(1 - volume) / 10 - 1`: zero at volume 0, -0.9 at volume 1.
pub fn amplitude_for_volume(volume: f32) -> f32 {
    (10f64.powf(1.0 - volume as f64) / 10.0 - 1.0) as f32
}

/// Apply `amplitude` to one sample, clipping to the 16-bit range
#[inline]
fn scale_sample(sample: i16, amplitude: f32) -> i16 {
    let normalized = sample as f64 / SINT16_SCALE;
    let scaled = (normalized * amplitude as f64).clamp(-1.0, 1.0);
    // `as` truncates toward zero and saturates +1.0 to i16::MAX
    (scaled * SINT16_SCALE) as i16
}

/// Mixer state: global enable flag, volume and the channel pool
#[derive(Debug)]
pub struct Mixer<const N: usize = MAX_CHANNELS> {
    enabled: AtomicBool,
    volume: AtomicF32,
    pool: Mutex<ChannelPool<N>>,
}

impl<const N: usize> Mixer<N> {
    /// Create an enabled mixer at full volume with every channel idle
    pub fn new() -> Self {
        Mixer {
            enabled: AtomicBool::new(true),
            volume: AtomicF32::new(1.0),
            pool: Mutex::new(ChannelPool::new()),
        }
    }

    /// Start playing `sound` on a free channel.
    ///
    /// Returns `false` and drops the request if every channel is busy.
    pub fn play(&self, sound: Arc<Sound>) -> bool {
        let result = self.pool.lock().play(sound);
        match result {
            Ok((slot, previous)) => {
                log::debug!("Playing sound on channel {}", slot);
                drop(previous);
                true
            }
            Err(err) => {
                log::warn!("Did not play sound. {}.", err);
                false
            }
        }
    }

    /// Number of channels currently playing
    pub fn active_sounds(&self) -> usize {
        self.pool.lock().active_count()
    }

    /// Stop every channel and release their sounds
    pub fn reset(&self) {
        let released = self.pool.lock().reset_all();
        drop(released);
    }

    /// Release the sounds held by finished channels.
    ///
    /// Returns how many sounds were released.
    pub fn release_finished(&self) -> usize {
        let released = self.pool.lock().release_idle();
        released.iter().flatten().count()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Silence all output from the next buffer on. Channels keep advancing.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Set the global volume, clamped to [0, 1]
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.volume.store(volume, Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        self.volume.load(Ordering::Relaxed)
    }

    /// Gain factor for the current volume
    pub fn amplitude(&self) -> f32 {
        amplitude_for_volume(self.volume())
    }

    /// Copy of the channel pool for inspection
    pub fn pool_snapshot(&self) -> ChannelPool<N> {
        self.pool.lock().clone()
    }

    /// Mix all active channels into `output`.
    ///
    /// Called from the device callback once per buffer. Every frame starts
    /// silent; each active channel then writes its sample over the frame in
    /// slot order, so the highest-indexed active channel decides the frame.
    /// Each active channel advances one sample per frame whether or not the
    /// mixer is enabled.
    pub fn mix(&self, output: &mut [StereoFrame]) {
        output.fill(StereoFrame::SILENCE);

        let enabled = self.is_enabled();
        let amplitude = self.amplitude();

        let mut pool = self.pool.lock();
        let channels = pool.channels_mut();

        for frame in output.iter_mut() {
            for channel in channels.iter_mut() {
                let Some(sample) = channel.advance() else {
                    continue;
                };

                *frame = if enabled {
                    StereoFrame::mono(scale_sample(sample, amplitude))
                } else {
                    StereoFrame::SILENCE
                };
            }
        }
    }

    /// Mix into an interleaved `L R L R ...` buffer
    pub fn mix_interleaved(&self, samples: &mut [i16]) {
        self.mix(StereoFrame::from_interleaved_mut(samples));
    }

    /// Mix into a raw native-endian byte buffer
    pub fn mix_bytes(&self, stream: &mut [u8]) -> Result<(), MixerError> {
        self.mix(StereoFrame::from_bytes_mut(stream)?);
        Ok(())
    }
}

impl<const N: usize> Default for Mixer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn sound(samples: &[i16]) -> Arc<Sound> {
        Arc::new(Sound::new(samples.to_vec()))
    }

    fn render<const N: usize>(mixer: &Mixer<N>, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::mono(0x55); frames];
        mixer.mix(&mut out);
        out
    }

    #[test]
    fn test_mixer_defaults() {
        let mixer: Mixer = Mixer::new();
        assert!(mixer.is_enabled());
        assert_eq!(mixer.volume(), 1.0);
        assert_eq!(mixer.active_sounds(), 0);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(0.5, -0.683_772_2)]
    #[case(1.0, -0.9)]
    fn test_amplitude_curve(#[case] volume: f32, #[case] expected: f32) {
        assert!((amplitude_for_volume(volume) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_scale_sample_truncates_toward_zero() {
        let amp = amplitude_for_volume(0.5);
        assert_eq!(scale_sample(100, amp), -68);
        assert_eq!(scale_sample(-100, amp), 68);
        assert_eq!(scale_sample(0, amp), 0);
        assert_eq!(scale_sample(i16::MIN, amplitude_for_volume(1.0)), 29491);
    }

    #[test]
    fn test_scenario_five_samples_half_volume() {
        let mixer: Mixer = Mixer::new();
        mixer.set_volume(0.5);
        assert!(mixer.play(sound(&[100, 200, 300, 400, 500])));

        let out = render(&mixer, 8);
        let expected = [-68, -136, -205, -273, -341];
        for (frame, value) in out.iter().zip(expected) {
            assert_eq!(*frame, StereoFrame::mono(value));
        }
        assert!(out[5..].iter().all(|f| *f == StereoFrame::SILENCE));
        assert_eq!(mixer.active_sounds(), 0);
    }

    #[test]
    fn test_channel_stays_active_until_next_visit() {
        let mixer: Mixer = Mixer::new();
        mixer.play(sound(&[1, 2, 3, 4, 5]));

        render(&mixer, 5);
        let pool = mixer.pool_snapshot();
        assert_eq!(pool.channel(0).unwrap().position, 5);
        assert_eq!(mixer.active_sounds(), 1);

        let out = render(&mixer, 2);
        assert_eq!(out, vec![StereoFrame::SILENCE; 2]);
        assert_eq!(mixer.active_sounds(), 0);
        assert_eq!(mixer.pool_snapshot().channel(0).unwrap().position, 5);
    }

    #[test]
    fn test_volume_zero_is_silent() {
        let mixer: Mixer = Mixer::new();
        mixer.set_volume(0.0);
        mixer.play(sound(&[i16::MAX, i16::MIN, 1234]));

        assert_eq!(render(&mixer, 3), vec![StereoFrame::SILENCE; 3]);
        assert_eq!(mixer.pool_snapshot().channel(0).unwrap().position, 3);
    }

    #[test]
    fn test_full_volume_inverts_at_ninety_percent() {
        let mixer: Mixer = Mixer::new();
        mixer.play(sound(&[1000, -1000]));

        let out = render(&mixer, 2);
        assert_eq!(out, vec![StereoFrame::mono(-899), StereoFrame::mono(899)]);
    }

    #[test]
    fn test_disabled_writes_silence_and_advances() {
        let mixer: Mixer = Mixer::new();
        mixer.set_volume(0.5);
        mixer.disable();
        mixer.play(sound(&[100, 200, 300, 400]));

        assert_eq!(render(&mixer, 3), vec![StereoFrame::SILENCE; 3]);
        assert_eq!(mixer.pool_snapshot().channel(0).unwrap().position, 3);

        mixer.enable();
        let out = render(&mixer, 2);
        assert_eq!(out[0], StereoFrame::mono(-273));
        assert_eq!(out[1], StereoFrame::SILENCE);
    }

    #[test]
    fn test_last_active_channel_overwrites_frame() {
        let mixer: Mixer = Mixer::new();
        mixer.set_volume(0.5);
        mixer.play(sound(&[1000; 4]));
        mixer.play(sound(&[2000; 2]));

        let out = render(&mixer, 5);
        assert_eq!(
            out,
            vec![
                StereoFrame::mono(-1367),
                StereoFrame::mono(-1367),
                StereoFrame::mono(-683),
                StereoFrame::mono(-683),
                StereoFrame::SILENCE,
            ]
        );
    }

    #[test]
    fn test_exhausted_channel_does_not_stall_later_channels() {
        let mixer: Mixer = Mixer::new();
        mixer.play(sound(&[1]));
        mixer.play(sound(&[5; 6]));

        render(&mixer, 3);
        let pool = mixer.pool_snapshot();
        assert!(!pool.channel(0).unwrap().active);
        assert_eq!(pool.channel(1).unwrap().position, 3);
    }

    #[test]
    fn test_ninth_play_fails() {
        let mixer: Mixer = Mixer::new();
        for _ in 0..MAX_CHANNELS {
            assert!(mixer.play(sound(&[1, 2, 3])));
        }
        assert!(!mixer.play(sound(&[4])));
        assert_eq!(mixer.active_sounds(), 8);
    }

    #[test]
    fn test_slot_recycled_after_sound_ends() {
        let mixer: Mixer<2> = Mixer::new();
        mixer.play(sound(&[1]));
        mixer.play(sound(&[1, 2, 3, 4]));
        assert!(!mixer.play(sound(&[9])));

        render(&mixer, 2);
        assert_eq!(mixer.active_sounds(), 1);
        assert!(mixer.play(sound(&[9])));
        assert_eq!(mixer.pool_snapshot().channel(0).unwrap().position, 0);
    }

    #[test]
    fn test_recycled_sound_freed_after_play_returns() {
        let mixer: Mixer<1> = Mixer::new();
        let old = sound(&[1, 2, 3, 4]);
        let weak = Arc::downgrade(&old);
        assert!(mixer.play(old));

        render(&mixer, 5);
        assert_eq!(mixer.active_sounds(), 0);
        assert!(weak.upgrade().is_some());

        assert!(mixer.play(sound(&[2])));
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_release_finished() {
        let mixer: Mixer = Mixer::new();
        let short = sound(&[1]);
        let long = sound(&[1; 8]);
        mixer.play(Arc::clone(&short));
        mixer.play(Arc::clone(&long));

        render(&mixer, 2);
        assert_eq!(mixer.release_finished(), 1);
        assert_eq!(Arc::strong_count(&short), 1);
        assert_eq!(Arc::strong_count(&long), 2);
        assert_eq!(mixer.active_sounds(), 1);
        assert_eq!(mixer.release_finished(), 0);
    }

    #[test]
    fn test_reset_releases_sounds() {
        let mixer: Mixer = Mixer::new();
        let snd = sound(&[1; 4]);
        mixer.play(Arc::clone(&snd));
        mixer.play(Arc::clone(&snd));
        mixer.reset();
        assert_eq!(Arc::strong_count(&snd), 1);
    }

    #[test]
    fn test_reset_stops_all() {
        let mixer: Mixer = Mixer::new();
        mixer.play(sound(&[1, 2]));
        mixer.play(sound(&[1, 2]));
        mixer.reset();
        assert_eq!(mixer.active_sounds(), 0);
        assert_eq!(render(&mixer, 2), vec![StereoFrame::SILENCE; 2]);
    }

    #[test]
    fn test_mix_interleaved_and_bytes() {
        let mixer: Mixer = Mixer::new();
        mixer.set_volume(0.5);
        mixer.play(sound(&[100, 200]));

        let mut samples = [7i16; 4];
        mixer.mix_interleaved(&mut samples);
        assert_eq!(samples, [-68, -68, -136, -136]);

        mixer.play(sound(&[300]));
        let mut storage = [0u16; 4];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut storage);
        mixer.mix_bytes(bytes).unwrap();
        let frames: &[StereoFrame] = bytemuck::cast_slice(&storage);
        assert_eq!(frames, &[StereoFrame::mono(-205), StereoFrame::SILENCE]);

        let mut odd = [0u16; 3];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut odd);
        assert_eq!(
            mixer.mix_bytes(bytes),
            Err(MixerError::BufferLayout { len: 6 })
        );
    }

    #[test]
    fn test_set_volume_nan() {
        let mixer: Mixer = Mixer::new();
        mixer.set_volume(f32::NAN);
        assert_eq!(mixer.volume(), 0.0);
    }

    #[test]
    fn test_concurrent_play_and_mix() {
        let mixer: Arc<Mixer> = Arc::new(Mixer::new());
        let snd = sound(&[3; 64]);

        let audio = {
            let mixer = Arc::clone(&mixer);
            std::thread::spawn(move || {
                let mut out = vec![StereoFrame::SILENCE; 32];
                for _ in 0..200 {
                    mixer.mix(&mut out);
                }
            })
        };

        for _ in 0..200 {
            mixer.play(Arc::clone(&snd));
            assert!(mixer.active_sounds() <= MAX_CHANNELS);
        }
        audio.join().unwrap();

        let pool = mixer.pool_snapshot();
        for channel in pool.iter().filter(|c| c.active) {
            assert!(channel.position <= channel.sound.as_ref().unwrap().len());
        }
    }

    proptest! {
        #[test]
        fn prop_set_volume_clamps(v in proptest::num::f32::ANY) {
            let mixer: Mixer = Mixer::new();
            mixer.set_volume(v);
            let stored = mixer.volume();
            prop_assert!((0.0..=1.0).contains(&stored));
            if (0.0..=1.0).contains(&v) {
                prop_assert_eq!(stored, v);
            }
        }

        #[test]
        fn prop_position_tracks_frames(
            len in 0usize..40,
            buffers in proptest::collection::vec(1usize..16, 1..6),
        ) {
            let mixer: Mixer = Mixer::new();
            mixer.play(Arc::new(Sound::new(vec![1i16; len])));

            let mut total = 0;
            for frames in buffers {
                render(&mixer, frames);
                total += frames;

                let pool = mixer.pool_snapshot();
                let channel = pool.channel(0).unwrap();
                prop_assert_eq!(channel.position, total.min(len));
                prop_assert_eq!(channel.active, total <= len);
            }
        }

        #[test]
        fn prop_disabled_is_always_silent(
            samples in proptest::collection::vec(any::<i16>(), 1..32),
            volume in 0.0f32..=1.0,
        ) {
            let mixer: Mixer = Mixer::new();
            mixer.set_volume(volume);
            mixer.disable();
            mixer.play(Arc::new(Sound::new(samples.clone())));
            let out = render(&mixer, samples.len());
            prop_assert!(out.iter().all(|f| *f == StereoFrame::SILENCE));
        }
    }
}
