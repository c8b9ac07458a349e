// sink.rs - Output device abstraction

//! Output device abstraction.
//!
//! An [`AudioSink`] owns the device side of playback: it negotiates a format,
//! then calls the registered mix callback whenever it needs another buffer.
//! The callback runs on the device's real-time thread and must not keep the
//! slice it is handed.

use crate::sound::mixer::types::*;

/// Callback that fills one device buffer
pub type MixCallback = Box<dyn FnMut(&mut [StereoFrame]) + Send + 'static>;

/// Output device driven by a mix callback
pub trait AudioSink {
    /// Open the device, asking for `desired`.
    ///
    /// Returns the spec the device actually runs at, which may differ from
    /// the request. The device starts paused.
    fn open(&mut self, desired: &AudioSpec, callback: MixCallback) -> Result<AudioSpec, MixerError>;

    /// Pause or resume callbacks. A paused device plays silence.
    fn pause(&mut self, paused: bool) -> Result<(), MixerError>;

    /// Stop the device and drop the callback
    fn close(&mut self);
}

impl<S: AudioSink + ?Sized> AudioSink for &mut S {
    fn open(&mut self, desired: &AudioSpec, callback: MixCallback) -> Result<AudioSpec, MixerError> {
        (**self).open(desired, callback)
    }

    fn pause(&mut self, paused: bool) -> Result<(), MixerError> {
        (**self).pause(paused)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn open(&mut self, desired: &AudioSpec, callback: MixCallback) -> Result<AudioSpec, MixerError> {
        (**self).open(desired, callback)
    }

    fn pause(&mut self, paused: bool) -> Result<(), MixerError> {
        (**self).pause(paused)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Headless sink with no device behind it.
///
/// Buffers are pulled by hand with [`NullSink::render`], which makes it the
/// sink for tests and offline rendering.
#[derive(Default)]
pub struct NullSink {
    /// Spec to report instead of the requested one
    obtained: Option<AudioSpec>,
    /// Reason to refuse `open`
    open_error: Option<String>,
    callback: Option<MixCallback>,
    spec: Option<AudioSpec>,
    paused: bool,
}

impl NullSink {
    /// Create a sink that accepts any requested format
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that reports `spec` no matter what is requested
    pub fn with_obtained(spec: AudioSpec) -> Self {
        NullSink {
            obtained: Some(spec),
            ..Self::default()
        }
    }

    /// Create a sink whose `open` always fails
    pub fn failing(reason: impl Into<String>) -> Self {
        NullSink {
            open_error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.callback.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Spec the sink was opened with
    pub fn spec(&self) -> Option<AudioSpec> {
        self.spec
    }

    /// Fill `out` the way a device would: silence when closed or paused,
    /// otherwise whatever the callback writes.
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::SILENCE);
        if self.paused {
            return;
        }
        if let Some(callback) = self.callback.as_mut() {
            callback(out);
        }
    }

    /// Pull `frames` frames from the sink
    pub fn render(&mut self, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::SILENCE; frames];
        self.render_into(&mut out);
        out
    }
}

impl AudioSink for NullSink {
    fn open(&mut self, desired: &AudioSpec, callback: MixCallback) -> Result<AudioSpec, MixerError> {
        if let Some(reason) = &self.open_error {
            return Err(MixerError::DeviceOpen(reason.clone()));
        }

        let spec = self.obtained.unwrap_or(*desired);
        self.callback = Some(callback);
        self.spec = Some(spec);
        self.paused = true;
        Ok(spec)
    }

    fn pause(&mut self, paused: bool) -> Result<(), MixerError> {
        if !self.is_open() {
            return Err(MixerError::NotOpen);
        }
        self.paused = paused;
        Ok(())
    }

    fn close(&mut self) {
        self.callback = None;
        self.spec = None;
        self.paused = false;
    }
}

impl std::fmt::Debug for NullSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NullSink")
            .field("spec", &self.spec)
            .field("open", &self.is_open())
            .field("paused", &self.paused)
            .finish()
    }
}
