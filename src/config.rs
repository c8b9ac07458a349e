use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::logging::LogLevel;
use crate::sound::mixer::{AudioSpec, DEFAULT_BUFFER_FRAMES, DEFAULT_FREQUENCY};

/// Lowest output frequency accepted from the config or command line
pub const MIN_FREQUENCY: u32 = 8000;

/// Highest output frequency accepted from the config or command line
pub const MAX_FREQUENCY: u32 = 192000;

/// Largest device buffer accepted, in frames
pub const MAX_BUFFER_FRAMES: u32 = 16384;

/// Mixer options that can be set via config file or CLI
#[derive(Debug, Clone, PartialEq)]
pub struct MixerOptions {
    /// Output frequency in Hz
    pub frequency: u32,
    /// Device buffer size in frames
    pub buffer_frames: u32,
    /// Global volume, 0.0 - 1.0
    pub volume: f32,
    /// Start with output enabled
    pub enabled: bool,
    pub log_level: LogLevel,
}

impl Default for MixerOptions {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            volume: 1.0,
            enabled: true,
            log_level: LogLevel::Info,
        }
    }
}

impl MixerOptions {
    /// Device format to request for these options
    pub fn audio_spec(&self) -> AudioSpec {
        AudioSpec::stereo16(self.frequency, self.buffer_frames)
    }

    /// Apply one `key = value` setting
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_lowercase().as_str() {
            "frequency" => self.frequency = parse_frequency(value)?,
            "buffer" => self.buffer_frames = parse_buffer_frames(value)?,
            "volume" => {
                let vol: i32 = value.parse().context("Invalid volume")?;
                self.volume = parse_volume(vol);
            }
            "enabled" => self.enabled = parse_bool(value)?,
            "loglevel" => self.log_level = value.parse()?,
            _ => log::warn!("Unknown config key '{}'", key),
        }
        Ok(())
    }
}

/// Parse `key = value` lines into `opts`.
///
/// `#` starts a comment. Lines without `=` and unknown keys are skipped with
/// a warning; bad values are errors.
pub fn parse_config(data: &str, mut opts: MixerOptions) -> Result<MixerOptions> {
    for (lineno, line) in data.lines().enumerate() {
        let line = match line.find('#') {
            Some(hash) => &line[..hash],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::warn!("Key without value on line {}", lineno + 1);
            continue;
        };

        opts.set(key.trim(), value.trim())
            .with_context(|| format!("Config line {}", lineno + 1))?;
    }

    Ok(opts)
}

/// Load options from a config file, or the defaults when there is none
pub fn load_config(path: Option<&Path>) -> Result<MixerOptions> {
    let Some(path) = path else {
        return Ok(MixerOptions::default());
    };

    let data = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file {}", path.display()))?;
    parse_config(&data, MixerOptions::default())
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Parse a volume value (0-100) to a float (0.0-1.0)
pub fn parse_volume(vol: i32) -> f32 {
    if vol < 0 {
        return 0.0;
    }
    if vol > 100 {
        return 1.0;
    }
    vol as f32 / 100.0
}

/// Parse an output frequency in Hz
pub fn parse_frequency(s: &str) -> Result<u32> {
    let freq: u32 = s.parse().context("Invalid frequency value")?;
    if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&freq) {
        bail!(
            "Frequency out of range ({} to {} Hz)",
            MIN_FREQUENCY,
            MAX_FREQUENCY
        );
    }
    Ok(freq)
}

/// Parse a device buffer size in frames; must be a power of two
pub fn parse_buffer_frames(s: &str) -> Result<u32> {
    let frames: u32 = s.parse().context("Invalid buffer size")?;
    if frames == 0 || frames > MAX_BUFFER_FRAMES || !frames.is_power_of_two() {
        bail!(
            "Buffer size must be a power of two up to {} frames",
            MAX_BUFFER_FRAMES
        );
    }
    Ok(frames)
}

/// Parse a boolean setting
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Invalid boolean value: {}", s),
    }
}
