//! The fixed set of particles belonging to one mounted background.

use rand::Rng;

use super::config::{Config, LiveScaling};
use super::particle::Particle;
use crate::canvas::SurfaceSize;

/// Created exactly once per mount. The number of particles never changes afterwards, even if the
/// configured density does.
#[derive(Debug, Clone)]
pub(crate) struct ParticleStore {
    /// The particles, in creation order
    particles: Vec<Particle>,
    /// The configured speed when the particles were created
    creation_speed: f32,
    /// The configured opacity when the particles were created
    creation_opacity: f32,
}

impl ParticleStore {
    /// Spawn `config.density` particles over a surface of the given size.
    pub fn initialise<R: Rng>(config: &Config, size: SurfaceSize, rng: &mut R) -> Self {
        let particles = (0..config.density)
            .map(|_| Particle::spawn(config, size, rng))
            .collect();

        Self {
            particles,
            creation_speed: config.speed,
            creation_opacity: config.opacity,
        }
    }

    /// Build a store from hand-placed particles.
    #[cfg(test)]
    pub fn from_particles(particles: Vec<Particle>, config: &Config) -> Self {
        Self {
            particles,
            creation_speed: config.speed,
            creation_opacity: config.opacity,
        }
    }

    /// All the particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access for the frame loop.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// The multiplier applied to every particle's velocity this frame.
    #[must_use]
    pub fn motion_factor(&self, live: &Config) -> f32 {
        Self::ratio(live.live_scaling, live.speed, self.creation_speed)
    }

    /// The multiplier applied to every particle's own opacity this frame.
    #[must_use]
    pub fn opacity_factor(&self, live: &Config) -> f32 {
        Self::ratio(live.live_scaling, live.opacity, self.creation_opacity)
    }

    /// Live value over creation value, or 1 when there's nothing meaningful to divide by.
    fn ratio(scaling: LiveScaling, live: f32, at_creation: f32) -> f32 {
        match scaling {
            LiveScaling::Inert => 1.0,
            LiveScaling::Rescale => {
                let ratio = live / at_creation;
                if ratio.is_finite() {
                    ratio
                } else {
                    1.0
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::colour::ConfigColour;
    use rand::SeedableRng as _;

    const SIZE: SurfaceSize = SurfaceSize {
        width: 640.0,
        height: 480.0,
    };

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(1234)
    }

    #[test]
    fn count_matches_density() {
        for density in [0, 1, 2, 17, 250] {
            let config = Config {
                density,
                ..Config::default()
            };
            let store = ParticleStore::initialise(&config, SIZE, &mut rng());
            assert_eq!(store.len(), density);
        }
    }

    #[test]
    fn zero_density_is_empty() {
        let config = Config {
            density: 0,
            ..Config::default()
        };
        let store = ParticleStore::initialise(&config, SIZE, &mut rng());
        assert!(store.particles().is_empty());
    }

    #[test]
    fn palette_colours_are_only_ever_from_the_palette() {
        let palette = [(1.0, 0.0, 0.0, 1.0), (0.0, 1.0, 0.0, 1.0), (0.0, 0.0, 1.0, 1.0)];
        let config = Config {
            density: 200,
            multi_color: true,
            colors: palette.iter().copied().map(ConfigColour).collect(),
            ..Config::default()
        };
        let store = ParticleStore::initialise(&config, SIZE, &mut rng());
        assert!(store
            .particles()
            .iter()
            .all(|particle| palette.contains(&particle.colour)));

        let distinct = palette
            .iter()
            .filter(|colour| {
                store
                    .particles()
                    .iter()
                    .any(|particle| particle.colour == **colour)
            })
            .count();
        assert_eq!(distinct, 3);
    }

    #[test]
    fn single_colour_mode_ignores_the_palette() {
        let config = Config {
            density: 50,
            multi_color: false,
            colors: vec![ConfigColour((1.0, 0.0, 0.0, 1.0))],
            ..Config::default()
        };
        let store = ParticleStore::initialise(&config, SIZE, &mut rng());
        assert!(store
            .particles()
            .iter()
            .all(|particle| particle.colour == config.color.0));
    }

    #[test]
    fn inert_scaling_ignores_live_changes() {
        let config = Config::default();
        let store = ParticleStore::initialise(&config, SIZE, &mut rng());
        let live = Config {
            speed: 5.0,
            opacity: 0.1,
            ..config
        };
        assert_eq!(store.motion_factor(&live), 1.0);
        assert_eq!(store.opacity_factor(&live), 1.0);
    }

    #[test]
    fn rescale_follows_live_changes() {
        let config = Config {
            live_scaling: LiveScaling::Rescale,
            speed: 2.0,
            opacity: 0.5,
            ..Config::default()
        };
        let store = ParticleStore::initialise(&config, SIZE, &mut rng());
        let live = Config {
            speed: 5.0,
            opacity: 0.25,
            ..config
        };
        assert_eq!(store.motion_factor(&live), 2.5);
        assert_eq!(store.opacity_factor(&live), 0.5);
    }

    #[test]
    fn rescale_from_zero_does_not_produce_nan() {
        let config = Config {
            live_scaling: LiveScaling::Rescale,
            speed: 0.0,
            ..Config::default()
        };
        let store = ParticleStore::initialise(&config, SIZE, &mut rng());
        let live = Config {
            speed: 3.0,
            ..config.clone()
        };
        assert_eq!(store.motion_factor(&live), 1.0);
        assert_eq!(store.motion_factor(&config), 1.0);
    }
}
