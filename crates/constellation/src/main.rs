//! Just `main()`. Keep as small as possible.

/// The animated particle background itself.
pub mod background {
    pub mod config;
    pub mod config_bridge;
    pub mod connections;
    pub mod frame;
    pub mod layer;
    pub mod particle;
    pub mod store;
}
pub mod canvas;
pub mod cli_args;
pub mod colour;
/// All the user-configurable settings.
pub mod config {
    pub mod main;
}
pub mod headless;
pub mod renderer;
pub mod run;
pub mod shared_state;
pub mod surface;

use color_eyre::eyre::Result;

/// The size of the channel that all protocol messages are broadcast on.
const PROTOCOL_CHANNEL_SIZE: usize = 16;

#[expect(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "It's our central place for communicating with the user on CLI"
)]
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let (protocol_tx, _) = tokio::sync::broadcast::channel(PROTOCOL_CHANNEL_SIZE);
    let state_arc = shared_state::SharedState::init(0, 0, protocol_tx).await?;
    let result = run::run(&std::sync::Arc::clone(&state_arc)).await;

    let logpath = state_arc.config.read().await.log_path.clone();
    let is_logging = *state_arc.is_logging.read().await;
    tracing::debug!("Constellation is exiting 🙇");

    match result {
        Ok(()) => {
            if is_logging {
                println!("Logs saved to {}", logpath.display());
            }
        }
        Err(error) => {
            tracing::error!("{error:?}");
            eprintln!("Error: {error}");
            if is_logging {
                eprintln!("See {} for more details", logpath.display());
            }
            #[expect(clippy::exit, reason = "Errors should give a failing exit code")]
            std::process::exit(1);
        }
    }

    Ok(())
}
