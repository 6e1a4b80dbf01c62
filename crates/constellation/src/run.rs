//! Main entrypoint for running Constellation

use std::sync::Arc;

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use crate::background::layer::{ParticleLayer, Target};
use crate::cli_args::CliArgs;
use crate::renderer::Renderer;
use crate::shared_state::SharedState;

/// How many rendered frames can be waiting to be displayed. Any more than this and the frame
/// loop waits, there's no point animating faster than frames can be shown.
const FRAME_CHANNEL_SIZE: usize = 2;

/// A single finished frame of the particle background.
pub(crate) struct FrameUpdate {
    /// Counts up from 1 for every frame since the background was mounted.
    pub sequence: u64,
    /// How many particles are being animated.
    pub particle_count: usize,
    /// The rendered pixels
    pub canvas: crate::canvas::PixelCanvas,
}

/// Commands to control the various tasks
#[non_exhaustive]
#[derive(Clone, Debug)]
pub(crate) enum Protocol {
    /// The entire application is exiting.
    End,
    /// User's TTY is resized.
    Resize {
        /// Width of new terminal.
        width: u16,
        /// Height of new terminal.
        height: u16,
    },
    /// Constellation's configuration.
    Config(crate::config::main::Config),
}

/// Main entrypoint
pub(crate) async fn run(state_arc: &Arc<SharedState>) -> Result<()> {
    let cli_args = setup(state_arc).await?;
    override_on_panic_behaviour();

    if cli_args.headless {
        return run_headless(state_arc, &cli_args).await;
    }

    let protocol_tx = state_arc.protocol_tx.clone();
    let users_tty_size = Renderer::get_users_tty_size()?;
    state_arc
        .set_tty_size(
            users_tty_size.cols.try_into()?,
            users_tty_size.rows.try_into()?,
        )
        .await;

    let (frames_tx, frames_rx) = tokio::sync::mpsc::channel(FRAME_CHANNEL_SIZE);
    let renderer = Renderer::start(Arc::clone(state_arc), frames_rx, protocol_tx.clone());
    let config_handle = crate::config::main::Config::watch(Arc::clone(state_arc));

    let resolution = state_arc.config.read().await.resolution;
    let target = Target::Terminal { resolution };
    let maybe_background = ParticleLayer::mount(target.canvas(), target, state_arc, frames_tx);

    renderer.await??;
    tracing::debug!("🏁 left render loop, exiting Constellation...");
    broadcast_protocol_end(&protocol_tx);

    if let Some(background) = maybe_background {
        background.await?;
    }
    config_handle.await??;

    tracing::trace!("Leaving Constellation's main `run()` function");
    Ok(())
}

/// Render without a terminal.
#[expect(
    clippy::print_stdout,
    reason = "It's the only output from a headless run"
)]
async fn run_headless(state: &Arc<SharedState>, cli_args: &CliArgs) -> Result<()> {
    let output = match cli_args.output.clone() {
        Some(path) => path,
        None => crate::config::main::Config::temporary_file("frame.png")?,
    };
    let settings = crate::headless::Settings {
        width: cli_args.width,
        height: cli_args.height,
        frames: cli_args.frames,
        output,
    };

    let path = crate::headless::run(state, settings).await?;
    println!("Saved frame to {}", path.display());
    Ok(())
}

/// The default behaviour prints all panics to the CLI. But that would corrupt the user's terminal
/// whilst it's in raw mode, so instead panics in tasks are logged.
fn override_on_panic_behaviour() {
    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(message) = info.payload().downcast_ref::<String>() {
            message
        } else if let Some(message) = info.payload().downcast_ref::<&str>() {
            message
        } else {
            "Caught a panic with an unknown type."
        };
        let location = match info.location() {
            Some(location) => format!(
                "{}@{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => "Unknown location".to_owned(),
        };
        tracing::error!("Caught panic ({}): {message:?}", location);
    }));
}

/// Signal all task loops to exit.
///
/// We keep it in its own function because we need to handle the error separately. If the error
/// were to be bubbled with `?` as usual, there's a chance it would never be logged, because the
/// protocol end signal is itself what allows the central error handler to even be reached.
pub(crate) fn broadcast_protocol_end(protocol_tx: &tokio::sync::broadcast::Sender<Protocol>) {
    tracing::debug!("Broadcasting the protocol `End` message to all listeners");
    let result = protocol_tx.send(Protocol::End);
    if let Err(error) = result {
        tracing::error!("{error:?}");
    }
}

/// Prepare the application to start.
async fn setup(state: &Arc<SharedState>) -> Result<CliArgs> {
    let cli_args = CliArgs::parse();

    let mut main_config_file = state.main_config_file.write().await;
    (*main_config_file).clone_from(&cli_args.main_config);
    drop(main_config_file);

    let directory_result =
        crate::config::main::Config::setup_directory(cli_args.config_dir.clone(), state).await;
    if let Err(directory_error) = directory_result {
        color_eyre::eyre::bail!("Error setting up config directory: {directory_error:?}");
    }

    let config_result = crate::config::main::Config::load_config_into_shared_state(state).await;
    if let Err(config_error) = config_result {
        let path = crate::config::main::Config::main_config_path(state).await;
        color_eyre::eyre::bail!(
            "Bad config file: {config_error:?}\n\nConfig path: {}",
            path.display()
        );
    }

    setup_logging(cli_args.clone(), state).await?;

    if let Some(frame_rate) = cli_args.frame_rate {
        if frame_rate == 0 {
            color_eyre::eyre::bail!("`--frame-rate` must be at least 1");
        }
        state.config.write().await.frame_rate = frame_rate;
    }

    // Assuming true colour makes rendering simpler.
    std::env::set_var("COLORTERM", "truecolor");

    tracing::info!("Starting Constellation");
    tracing::debug!("Loaded config: {:?}", state.config.read().await);
    tracing::debug!("Published particle config: {:?}", state.particles.snapshot());

    Ok(cli_args)
}

/// Setup logging
async fn setup_logging(cli_args: CliArgs, state: &Arc<SharedState>) -> Result<()> {
    let are_log_filters_manually_set = std::env::var("CONSTELLATION_LOG").is_ok();
    let mut path = state.config.read().await.log_path.clone();

    if let Some(cli_override_path) = cli_args.log_path {
        path = cli_override_path;
    }

    let mut level = state.config.read().await.log_level.clone();
    if let Some(cli_override_level) = cli_args.log_level {
        level = cli_override_level;
    }
    let level_as_string = format!("{level:?}").to_lowercase();

    let is_loggable =
        !matches!(level, crate::config::main::LogLevel::Off) || are_log_filters_manually_set;

    if !is_loggable {
        return Ok(());
    }

    let directory = path.parent().context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(&path)?;

    let filters = if are_log_filters_manually_set {
        if let Ok(user_filters) = std::env::var("CONSTELLATION_LOG") {
            std::env::set_var("RUST_LOG", user_filters);
        }

        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .from_env_lossy()
    } else {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .from_env_lossy()
            .add_directive(format!("constellation={level_as_string}").parse()?)
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_filter(filters);

    tracing_subscriber::registry().with(logfile_layer).init();

    let mut config = state.config.write().await;
    config.log_path = path;
    drop(config);

    let mut is_logging = state.is_logging.write().await;
    *is_logging = true;
    drop(is_logging);

    Ok(())
}
