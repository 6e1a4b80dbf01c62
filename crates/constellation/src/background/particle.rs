//! A single drifting point of the constellation.

use rand::seq::SliceRandom as _;
use rand::Rng;

use crate::canvas::{Point, SurfaceSize};
use crate::colour::Colour;

/// A particle only exists for as long as the background is mounted. Apart from its position,
/// nothing about it changes after it's spawned.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Particle {
    /// Current x,y position in logical pixels
    pub position: Point,
    /// Distance moved per frame
    pub velocity: Point,
    /// Radius
    pub size: f32,
    /// Alpha, `0.0..=1.0`
    pub opacity: f32,
    /// Fill colour, also used for any connection lines that start at this particle
    pub colour: Colour,
}

impl Particle {
    /// Create a particle at a random place on the surface with random motion, size, opacity and
    /// possibly colour, all within the bounds set by the config.
    pub fn spawn<R: Rng>(config: &super::config::Config, size: SurfaceSize, rng: &mut R) -> Self {
        let position = (rng.gen::<f32>() * size.width, rng.gen::<f32>() * size.height);
        let velocity = (
            (rng.gen::<f32>() - 0.5) * config.speed * 0.5,
            (rng.gen::<f32>() - 0.5) * config.speed * 0.5,
        );
        let radius = rng.gen_range(config.size_min..=config.size_max);
        let opacity = config.opacity * rng.gen_range(0.5f32..=1.0f32);

        let colour = if config.multi_color {
            config
                .colors
                .choose(rng)
                .map_or(config.color.0, |colour| colour.0)
        } else {
            config.color.0
        };

        Self {
            position,
            velocity,
            size: radius,
            opacity,
            colour,
        }
    }

    /// Move by one frame's worth of velocity.
    pub fn advance(&mut self, factor: f32) {
        self.position.0 += self.velocity.0 * factor;
        self.position.1 += self.velocity.1 * factor;
    }

    /// Particles that leave one edge reappear at the opposite edge.
    pub fn wrap(&mut self, size: SurfaceSize) {
        if self.position.0 < 0.0 {
            self.position.0 = size.width;
        } else if self.position.0 > size.width {
            self.position.0 = 0.0;
        }

        if self.position.1 < 0.0 {
            self.position.1 = size.height;
        } else if self.position.1 > size.height {
            self.position.1 = 0.0;
        }
    }
}
