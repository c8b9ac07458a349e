// buffer.rs - Sound sample buffers

//! Immutable mono sound buffers played by the mixer.
//!
//! A [`Sound`] is decoded elsewhere; the mixer only ever reads it. Channels
//! share it through an `Arc`, so one sound can be playing on several
//! channels at once.

/// Mono 16-bit PCM samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    samples: Box<[i16]>,
}

impl Sound {
    /// Create a sound from decoded samples
    pub fn new(samples: impl Into<Box<[i16]>>) -> Self {
        Sound {
            samples: samples.into(),
        }
    }

    /// Create a sound from raw native-endian 16-bit data.
    ///
    /// A trailing odd byte does not form a sample and is dropped.
    pub fn from_bytes(data: &[u8]) -> Self {
        let samples: Vec<i16> = data
            .chunks_exact(2)
            .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
            .collect();
        Sound::new(samples)
    }

    /// Number of mono samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Size of the sample data in bytes
    pub fn byte_len(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample at `index`, if in range
    #[inline]
    pub fn sample(&self, index: usize) -> Option<i16> {
        self.samples.get(index).copied()
    }
}

impl From<Vec<i16>> for Sound {
    fn from(samples: Vec<i16>) -> Self {
        Sound::new(samples)
    }
}
