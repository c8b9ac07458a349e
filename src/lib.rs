// chanmix library
// Fixed-capacity software audio mixer

pub mod cli;
pub mod config;
pub mod logging;
pub mod sound;

pub use cli::Cli;
pub use config::MixerOptions;
pub use logging::LogLevel;
