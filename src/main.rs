use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use chanmix::config;
use chanmix::logging;
use chanmix::sound::mixer::{AudioMixer, CpalSink};
use chanmix::Cli;

/// How often to check whether playback has finished
const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config file first, command line overrides
    let options = config::load_config(cli.config.as_deref())?;
    let options = cli.merge_into_options(options)?;

    logging::init(options.log_level);
    log::debug!("Options: {:?}", options);

    let sounds = cli.sounds(options.frequency)?;

    let mut audio: AudioMixer<CpalSink> =
        AudioMixer::init(CpalSink::new(), options.audio_spec()).context("Cannot start audio")?;

    let mixer = audio.mixer();
    mixer.set_volume(options.volume);
    if !options.enabled {
        mixer.disable();
    }

    log::info!(
        "Playing {} sound(s) at volume {:.2}{}",
        sounds.len(),
        mixer.volume(),
        if mixer.is_enabled() { "" } else { " (muted)" }
    );

    for sound in sounds {
        mixer.play(sound);
    }

    while mixer.active_sounds() > 0 {
        thread::sleep(POLL_INTERVAL);
        let released = mixer.release_finished();
        if released > 0 {
            log::debug!("Released {} finished sound(s)", released);
        }
    }

    audio.finish();
    Ok(())
}
