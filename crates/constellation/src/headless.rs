//! Animate the particle background without a terminal and save the last frame as a PNG. Handy
//! for previewing config changes and for checking that the whole frame loop actually works.

use std::sync::Arc;

use color_eyre::eyre::{bail, ContextCompat as _, Result};

use crate::background::layer::{ParticleLayer, Target};
use crate::canvas::PixelCanvas;
use crate::colour::TRANSPARENT;
use crate::shared_state::SharedState;

/// What to render.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    /// Image width in pixels
    pub width: u16,
    /// Image height in pixels
    pub height: u16,
    /// Number of frames to animate, the last one is saved
    pub frames: u64,
    /// Where to save the image
    pub output: std::path::PathBuf,
}

/// Run the frame loop offscreen until enough frames have been rendered. Returns the path of the
/// saved image.
pub(crate) async fn run(state: &Arc<SharedState>, settings: Settings) -> Result<std::path::PathBuf> {
    if settings.width == 0 || settings.height == 0 {
        bail!(
            "Headless images need a size, got {}x{}",
            settings.width,
            settings.height
        );
    }
    if settings.frames == 0 {
        bail!("Headless rendering needs at least 1 frame");
    }

    tracing::info!(
        "Rendering {} headless frames at {}x{}",
        settings.frames,
        settings.width,
        settings.height
    );
    state.set_tty_size(settings.width, settings.height).await;

    let (frames_tx, mut frames_rx) = tokio::sync::mpsc::channel(1);
    let target = Target::Offscreen;
    let background = ParticleLayer::mount(target.canvas(), target, state, frames_tx)
        .context("Couldn't create an offscreen canvas")?;

    let mut last_frame = None;
    while let Some(update) = frames_rx.recv().await {
        let is_done = update.sequence >= settings.frames;
        last_frame = Some(update);
        if is_done {
            break;
        }
    }

    crate::run::broadcast_protocol_end(&state.protocol_tx);
    drop(frames_rx);
    background.await?;

    let frame = last_frame.context("The particle background stopped before rendering anything")?;
    tracing::debug!(
        "Saving frame {} with {} particles to {:?}",
        frame.sequence,
        frame.particle_count,
        settings.output
    );
    save_png(&frame.canvas, &settings.output)?;

    Ok(settings.output)
}

/// Write the canvas out as an RGBA PNG.
fn save_png(canvas: &PixelCanvas, path: &std::path::Path) -> Result<()> {
    let width: u32 = canvas.columns().try_into()?;
    let height: u32 = canvas.rows().try_into()?;
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        let colour = usize::try_from(x)
            .ok()
            .zip(usize::try_from(y).ok())
            .and_then(|(column, row)| canvas.pixel(column, row))
            .unwrap_or(TRANSPARENT);
        image::Rgba([
            to_byte(colour.0),
            to_byte(colour.1),
            to_byte(colour.2),
            to_byte(colour.3),
        ])
    });
    image.save_with_format(path, image::ImageFormat::Png)?;

    Ok(())
}

/// Convert a `0.0..=1.0` channel to `0..=255`.
#[expect(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "The value is clamped to the range of a u8 first"
)]
fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
