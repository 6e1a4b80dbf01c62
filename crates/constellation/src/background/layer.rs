//! Drive the particle background: a frame on every tick, until the app tells us to stop.

use std::sync::Arc;

use rand::SeedableRng as _;

use super::config_bridge::ConfigReader;
use super::store::ParticleStore;
use crate::canvas::{Canvas as _, PixelCanvas, SurfaceSize};
use crate::run::{FrameUpdate, Protocol};
use crate::shared_state::SharedState;

/// The number of microseconds in a second
const ONE_SECOND_IN_MICROSECONDS: u64 = 1_000_000;

/// Where frames end up. It decides how sizes from the protocol map to logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Target {
    /// The user's terminal. Sizes are in cells, and each cell holds 2 pixels stacked vertically.
    Terminal {
        /// Logical pixels per terminal pixel
        resolution: f32,
    },
    /// An image. Sizes are already in pixels.
    Offscreen,
}

impl Target {
    /// How many logical pixels make up a raster pixel.
    #[must_use]
    pub const fn scale(self) -> f32 {
        match self {
            Self::Terminal { resolution } => resolution,
            Self::Offscreen => 1.0,
        }
    }

    /// The logical size of the drawing surface for a container of the given size.
    ///
    /// Both targets draw over the whole of what's visible: the terminal's container is the TTY
    /// and the image's container is the image. So the viewport is always exactly as tall as the
    /// container.
    #[must_use]
    pub fn surface_size(self, width: u16, height: u16) -> SurfaceSize {
        let (container_width, container_height) = match self {
            Self::Terminal { resolution } => (
                f32::from(width) * resolution,
                f32::from(height) * 2.0 * resolution,
            ),
            Self::Offscreen => (f32::from(width), f32::from(height)),
        };
        let viewport_height = container_height;
        SurfaceSize::covering(container_width, container_height, viewport_height)
    }

    /// Get a drawing surface for this target. It starts out with no size.
    #[must_use]
    pub fn canvas(self) -> Option<PixelCanvas> {
        PixelCanvas::new(SurfaceSize::default(), self.scale())
    }
}

/// `ParticleLayer`
pub(crate) struct ParticleLayer {
    /// Where the frames are going
    target: Target,
    /// The surface that each frame is drawn onto
    canvas: PixelCanvas,
    /// Only created once the canvas has a usable size
    store: Option<ParticleStore>,
    /// The latest particle config
    config: ConfigReader,
    /// A channel to send finished frames
    output: tokio::sync::mpsc::Sender<FrameUpdate>,
    /// The target frame rate
    frame_rate: u32,
    /// The time at which the previous frame was rendered
    last_frame_tick: std::time::Instant,
    /// Number of frames sent so far
    sequence: u64,
    /// Randomness for spawning particles
    rng: rand::rngs::StdRng,
}

impl ParticleLayer {
    /// Instantiate
    fn new(
        target: Target,
        canvas: PixelCanvas,
        config: ConfigReader,
        output: tokio::sync::mpsc::Sender<FrameUpdate>,
        frame_rate: u32,
    ) -> Self {
        Self {
            target,
            canvas,
            store: None,
            config,
            output,
            frame_rate,
            last_frame_tick: std::time::Instant::now(),
            sequence: 0,
            rng: rand::rngs::StdRng::from_entropy(),
        }
    }

    /// Start the frame loop in its own task. Without a canvas there's nothing to draw on, so
    /// nothing is started.
    pub(crate) fn mount(
        maybe_canvas: Option<PixelCanvas>,
        target: Target,
        state: &Arc<SharedState>,
        output: tokio::sync::mpsc::Sender<FrameUpdate>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let Some(canvas) = maybe_canvas else {
            tracing::debug!("No drawing surface available, not starting the particle background");
            return None;
        };

        // Subscribe before spawning so that an `End` sent straight after mounting isn't missed.
        let protocol = state.protocol_tx.subscribe();
        let state_clone = Arc::clone(state);
        Some(tokio::spawn(async move {
            Self::start(canvas, target, state_clone, output, protocol).await;
        }))
    }

    /// Our main entrypoint.
    async fn start(
        canvas: PixelCanvas,
        target: Target,
        state: Arc<SharedState>,
        output: tokio::sync::mpsc::Sender<FrameUpdate>,
        mut protocol: tokio::sync::broadcast::Receiver<Protocol>,
    ) {
        let frame_rate = state.config.read().await.frame_rate;
        let mut layer = Self::new(
            target,
            canvas,
            state.particles.subscribe(),
            output,
            frame_rate,
        );
        let tty_size = state.get_tty_size().await;
        layer.resize(tty_size.width, tty_size.height);

        tracing::debug!("Starting particle background loop for {target:?}");
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                () = layer.sleep_until_next_frame_tick() => {
                    if !layer.render().await {
                        break;
                    }
                },
                Ok(message) = protocol.recv() => {
                    if matches!(message, Protocol::End) {
                        break;
                    }
                    layer.handle_protocol_message(message);
                }
            }
        }

        tracing::debug!("Particle background loop finished");
    }

    /// React to resizes and config changes.
    fn handle_protocol_message(&mut self, message: Protocol) {
        tracing::trace!("Particle background received protocol message: {message:?}");
        match message {
            Protocol::Resize { width, height } => self.resize(width, height),
            Protocol::Config(config) => {
                if config.frame_rate > 0 {
                    self.frame_rate = config.frame_rate;
                }
            }
            Protocol::End => (),
        }
    }

    /// Follow the size of the container. The particles themselves are left exactly as they are,
    /// any outside the new bounds wrap back in on their own.
    fn resize(&mut self, width: u16, height: u16) {
        let size = self.target.surface_size(width, height);
        if size == self.canvas.size() {
            return;
        }
        tracing::debug!("Resizing particle background to {size:?}");
        self.canvas.resize(size);
    }

    /// One frame. Returns `false` when there's no longer anywhere to send frames.
    async fn render(&mut self) -> bool {
        let size = self.canvas.size();
        if !size.is_drawable() {
            return true;
        }

        let config = self.config.snapshot();
        if self.store.is_none() {
            let created = ParticleStore::initialise(&config, size, &mut self.rng);
            tracing::debug!("Created {} particles over {size:?}", created.len());
            self.store = Some(created);
        }
        let Some(store) = self.store.as_mut() else {
            return true;
        };

        let connections = super::frame::draw(store, &config, &mut self.canvas);
        let particle_count = store.len();
        tracing::trace!("Drew {particle_count} particles and {connections} connections");

        self.sequence += 1;
        let update = FrameUpdate {
            sequence: self.sequence,
            particle_count,
            canvas: self.canvas.clone(),
        };
        if self.output.send(update).await.is_err() {
            tracing::debug!("Nothing is receiving particle frames anymore");
            return false;
        }

        true
    }

    /// Sleep until the next frame render is due.
    async fn sleep_until_next_frame_tick(&mut self) {
        let target = ONE_SECOND_IN_MICROSECONDS.wrapping_div(self.frame_rate.max(1).into());
        let target_frame_rate_micro = std::time::Duration::from_micros(target);
        if let Some(wait) = target_frame_rate_micro.checked_sub(self.last_frame_tick.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = std::time::Instant::now();
    }
}
