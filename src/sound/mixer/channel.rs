// channel.rs - Playback channel pool

//! Fixed-size pool of playback channels.
//!
//! Each channel is either idle or tracking the read cursor of one sound.
//! Channels are never freed: a finished channel goes idle and is recycled by
//! the next [`ChannelPool::play`].
//!
//! The pool never drops a sound itself. Whatever a slot held before it was
//! recycled or reset is handed back to the caller, so the last reference to a
//! sample buffer is released outside any lock the mixing callback takes.

use std::sync::Arc;

use crate::sound::mixer::buffer::Sound;
use crate::sound::mixer::types::*;

/// One playback slot
#[derive(Debug, Clone)]
pub struct Channel {
    /// Whether the channel is playing
    pub active: bool,
    /// Sound bound by the last play; kept after the channel goes idle until
    /// the slot is recycled or released
    pub sound: Option<Arc<Sound>>,
    /// Index of the next sample to read
    pub position: usize,
    /// Reserved for per-channel panning, not applied by the mixer
    pub left_volume: f32,
    /// Reserved for per-channel panning, not applied by the mixer
    pub right_volume: f32,
    /// Reserved, the mixer does not loop
    pub loops: u32,
}

impl Channel {
    /// Create an idle channel
    pub fn new() -> Self {
        Channel {
            active: false,
            sound: None,
            position: 0,
            left_volume: 1.0,
            right_volume: 1.0,
            loops: 0,
        }
    }

    /// Bind a sound and start playing it from the beginning.
    ///
    /// `active` is written last so the slot is never seen half-initialized.
    /// Returns the sound the slot held before.
    fn start(&mut self, sound: Arc<Sound>) -> Option<Arc<Sound>> {
        let previous = std::mem::replace(&mut self.sound, Some(sound));
        self.position = 0;
        self.left_volume = 1.0;
        self.right_volume = 1.0;
        self.loops = 0;
        self.active = true;
        previous
    }

    /// Read the sample under the cursor and move past it.
    ///
    /// Returns `None` for an idle channel. A channel whose cursor has reached
    /// the end of its sound goes idle here, so the bounds check always comes
    /// before the read.
    #[inline]
    pub(crate) fn advance(&mut self) -> Option<i16> {
        if !self.active {
            return None;
        }

        match self.sound.as_deref().and_then(|s| s.sample(self.position)) {
            Some(sample) => {
                self.position += 1;
                Some(sample)
            }
            None => {
                self.active = false;
                None
            }
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed set of `N` channels, scanned in slot order
#[derive(Debug, Clone)]
pub struct ChannelPool<const N: usize = MAX_CHANNELS> {
    channels: [Channel; N],
}

impl<const N: usize> ChannelPool<N> {
    /// Create a pool with every channel idle
    pub fn new() -> Self {
        ChannelPool {
            channels: std::array::from_fn(|_| Channel::new()),
        }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Start `sound` on the lowest-indexed idle channel.
    ///
    /// Returns the slot index and the finished sound the slot held before, if
    /// any. With every channel busy the pool is left untouched; nothing is
    /// evicted.
    pub fn play(&mut self, sound: Arc<Sound>) -> Result<(usize, Option<Arc<Sound>>), MixerError> {
        let (index, channel) = self
            .channels
            .iter_mut()
            .enumerate()
            .find(|(_, c)| !c.active)
            .ok_or(MixerError::ChannelsExhausted { max: N })?;

        let previous = channel.start(sound);
        Ok((index, previous))
    }

    /// Number of playing channels
    pub fn active_count(&self) -> usize {
        self.channels.iter().filter(|c| c.active).count()
    }

    /// Stop every channel and hand back the sounds they held
    #[must_use = "dropping the released sounds here frees them in place"]
    pub fn reset_all(&mut self) -> [Option<Arc<Sound>>; N] {
        for channel in &mut self.channels {
            channel.active = false;
        }
        self.release_idle()
    }

    /// Detach the sounds of idle channels and hand them back
    #[must_use = "dropping the released sounds here frees them in place"]
    pub fn release_idle(&mut self) -> [Option<Arc<Sound>>; N] {
        std::array::from_fn(|i| {
            let channel = &mut self.channels[i];
            if channel.active {
                None
            } else {
                channel.sound.take()
            }
        })
    }

    /// Get a channel by slot index
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub(crate) fn channels_mut(&mut self) -> &mut [Channel; N] {
        &mut self.channels
    }
}

impl<const N: usize> Default for ChannelPool<N> {
    fn default() -> Self {
        Self::new()
    }
}
