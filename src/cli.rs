use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::config::{parse_buffer_frames, parse_frequency, parse_volume, MixerOptions};
use crate::sound::mixer::Sound;

/// Peak level of generated tones, as a fraction of full scale
const TONE_LEVEL: f32 = 0.5;

/// Tone played when nothing else is given
const DEFAULT_TONE_HZ: f32 = 440.0;

/// Play sounds through the fixed-capacity channel mixer
#[derive(Parser, Debug)]
#[command(name = "mixplay")]
#[command(version)]
#[command(about = "Play mono sounds through an 8-channel software mixer", long_about = None)]
pub struct Cli {
    /// Config file with key = value settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output frequency in Hz (default 44100)
    #[arg(short, long, value_name = "HZ")]
    pub frequency: Option<String>,

    /// Device buffer size in frames (default 1024)
    #[arg(short, long, value_name = "FRAMES")]
    pub buffer: Option<String>,

    /// Volume (0-100)
    #[arg(long, value_name = "VOLUME")]
    pub volume: Option<String>,

    /// Start with output disabled
    #[arg(short, long)]
    pub mute: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short, long, value_name = "LEVEL")]
    pub loglevel: Option<String>,

    /// Play a sine tone at this pitch in Hz (can be specified multiple times)
    #[arg(short, long, value_name = "HZ")]
    pub tone: Vec<f32>,

    /// Length of each tone in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub tone_ms: u32,

    /// Raw mono signed 16-bit native-endian PCM files
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: MixerOptions) -> Result<MixerOptions> {
        if let Some(ref freq) = self.frequency {
            opts.frequency = parse_frequency(freq)?;
        }

        if let Some(ref buffer) = self.buffer {
            opts.buffer_frames = parse_buffer_frames(buffer)?;
        }

        if let Some(ref vol) = self.volume {
            let int_vol: i32 = vol.parse().context("Invalid volume")?;
            opts.volume = parse_volume(int_vol);
        }

        if self.mute {
            opts.enabled = false;
        }

        if let Some(ref level) = self.loglevel {
            opts.log_level = level.parse()?;
        }

        Ok(opts)
    }

    /// Build the sounds to play: tones first, then files in order.
    ///
    /// With neither given, a single default tone is returned.
    pub fn sounds(&self, sample_rate: u32) -> Result<Vec<Arc<Sound>>> {
        let mut sounds = Vec::with_capacity(self.tone.len() + self.files.len());

        for &pitch in &self.tone {
            sounds.push(Arc::new(tone(pitch, self.tone_ms, sample_rate)?));
        }

        for path in &self.files {
            let data =
                fs::read(path).with_context(|| format!("Cannot read sound {}", path.display()))?;
            sounds.push(Arc::new(Sound::from_bytes(&data)));
        }

        if sounds.is_empty() {
            sounds.push(Arc::new(tone(DEFAULT_TONE_HZ, self.tone_ms, sample_rate)?));
        }

        Ok(sounds)
    }
}

/// Generate a sine tone
pub fn tone(pitch: f32, duration_ms: u32, sample_rate: u32) -> Result<Sound> {
    if !pitch.is_finite() || pitch <= 0.0 || pitch >= sample_rate as f32 / 2.0 {
        bail!(
            "Tone pitch must be between 0 and {} Hz",
            sample_rate / 2
        );
    }

    let len = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
    let step = std::f32::consts::TAU * pitch / sample_rate as f32;
    let peak = TONE_LEVEL * i16::MAX as f32;

    let samples: Vec<i16> = (0..len)
        .map(|i| ((i as f32 * step).sin() * peak) as i16)
        .collect();
    Ok(Sound::new(samples))
}
