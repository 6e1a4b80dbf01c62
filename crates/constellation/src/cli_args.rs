//! All the CLI arguments for Constellation

/// The name of the main config file when one isn't given.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "constellation.toml";

/// A drifting constellation of particles for your terminal background
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
#[non_exhaustive]
pub struct CliArgs {
    /// Use a different config directory.
    #[arg(long)]
    pub config_dir: Option<std::path::PathBuf>,

    /// The name of the main config file inside the config directory.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE_NAME)]
    pub main_config: std::path::PathBuf,

    /// Override the log level from the config.
    #[arg(long, value_enum)]
    pub log_level: Option<crate::config::main::LogLevel>,

    /// Override the path of the log file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,

    /// Override the target frame rate from the config.
    #[arg(long)]
    pub frame_rate: Option<u32>,

    /// Don't use the terminal. Render offscreen and save the final frame as a PNG.
    #[arg(long)]
    pub headless: bool,

    /// Width in pixels of the headless image.
    #[arg(long, default_value_t = 640, requires = "headless")]
    pub width: u16,

    /// Height in pixels of the headless image.
    #[arg(long, default_value_t = 360, requires = "headless")]
    pub height: u16,

    /// How many frames to animate before saving the headless image.
    #[arg(long, default_value_t = 120, requires = "headless")]
    pub frames: u64,

    /// Where to save the headless image. Defaults to a temporary file.
    #[arg(long, requires = "headless")]
    pub output: Option<std::path::PathBuf>,
}
