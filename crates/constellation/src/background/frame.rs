//! Draw a single frame of the particle background.

use super::config::Config;
use super::connections::LINE_WIDTH;
use super::store::ParticleStore;
use crate::canvas::Canvas;

/// Move, wrap and draw every particle, then join up the nearby ones. Returns the number of
/// connection lines drawn.
pub(crate) fn draw(store: &mut ParticleStore, live: &Config, canvas: &mut impl Canvas) -> usize {
    canvas.clear();
    let size = canvas.size();
    let motion = store.motion_factor(live);
    let fade = store.opacity_factor(live);

    for particle in store.particles_mut() {
        particle.advance(motion);
        particle.wrap(size);
        canvas.fill_circle(
            particle.position,
            particle.size,
            particle.colour,
            particle.opacity * fade,
        );
    }

    let particles = store.particles();
    let connections = live.connections.find(particles);
    for connection in &connections {
        let (Some(from), Some(to)) = (
            particles.get(connection.from),
            particles.get(connection.to),
        ) else {
            continue;
        };
        canvas.stroke_line(
            from.position,
            to.position,
            from.colour,
            connection.alpha(live.opacity),
            LINE_WIDTH,
        );
    }

    connections.len()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::background::particle::Particle;
    use crate::canvas::{Point, SurfaceSize};
    use crate::colour::{Colour, WHITE};
    use rand::SeedableRng as _;

    /// Every call made to a canvas.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum DrawCall {
        Clear,
        Circle {
            centre: Point,
            radius: f32,
            colour: Colour,
            alpha: f32,
        },
        Line {
            from: Point,
            to: Point,
            colour: Colour,
            alpha: f32,
            width: f32,
        },
    }

    /// A canvas that just remembers what it was asked to draw.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingCanvas {
        pub size: SurfaceSize,
        pub calls: Vec<DrawCall>,
    }

    impl RecordingCanvas {
        pub fn new(width: f32, height: f32) -> Self {
            Self {
                size: SurfaceSize { width, height },
                calls: Vec::new(),
            }
        }

        pub fn lines(&self) -> Vec<&DrawCall> {
            self.calls
                .iter()
                .filter(|call| matches!(call, DrawCall::Line { .. }))
                .collect()
        }

        pub fn circles(&self) -> Vec<&DrawCall> {
            self.calls
                .iter()
                .filter(|call| matches!(call, DrawCall::Circle { .. }))
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn size(&self) -> SurfaceSize {
            self.size
        }

        fn resize(&mut self, size: SurfaceSize) {
            self.size = size;
        }

        fn clear(&mut self) {
            self.calls.push(DrawCall::Clear);
        }

        fn fill_circle(&mut self, centre: Point, radius: f32, colour: Colour, alpha: f32) {
            self.calls.push(DrawCall::Circle {
                centre,
                radius,
                colour,
                alpha,
            });
        }

        fn stroke_line(&mut self, from: Point, to: Point, colour: Colour, alpha: f32, width: f32) {
            self.calls.push(DrawCall::Line {
                from,
                to,
                colour,
                alpha,
                width,
            });
        }
    }

    fn store_with(config: &Config, size: SurfaceSize) -> ParticleStore {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        ParticleStore::initialise(config, size, &mut rng)
    }

    /// Move every particle well away from the edges so that nothing wraps.
    fn centred_store(config: &Config, size: SurfaceSize) -> ParticleStore {
        let mut store = store_with(config, size);
        for particle in store.particles_mut() {
            particle.position = (size.width / 2.0, size.height / 2.0);
        }
        store
    }

    fn total_displacement(before: &[Particle], after: &[Particle]) -> f32 {
        before
            .iter()
            .zip(after)
            .map(|(old, new)| {
                let delta_x = new.position.0 - old.position.0;
                let delta_y = new.position.1 - old.position.1;
                (delta_x * delta_x + delta_y * delta_y).sqrt()
            })
            .sum()
    }

    #[test]
    fn zero_density_clears_and_draws_nothing() {
        let config = Config {
            density: 0,
            ..Config::default()
        };
        let mut canvas = RecordingCanvas::new(300.0, 200.0);
        let mut store = store_with(&config, canvas.size());
        for _ in 0..10 {
            assert_eq!(draw(&mut store, &config, &mut canvas), 0);
        }
        assert_eq!(canvas.calls, vec![DrawCall::Clear; 10]);
    }

    #[test]
    fn single_particle_never_connects() {
        let config = Config {
            density: 1,
            ..Config::default()
        };
        let mut canvas = RecordingCanvas::new(50.0, 50.0);
        let mut store = store_with(&config, canvas.size());
        for _ in 0..100 {
            draw(&mut store, &config, &mut canvas);
        }
        assert!(canvas.lines().is_empty());
        assert_eq!(canvas.circles().len(), 100);
    }

    #[test]
    fn clears_then_draws_circles_then_lines() {
        let config = Config {
            density: 30,
            ..Config::default()
        };
        let mut canvas = RecordingCanvas::new(150.0, 150.0);
        let mut store = store_with(&config, canvas.size());
        let drawn = draw(&mut store, &config, &mut canvas);

        assert_eq!(canvas.calls.first(), Some(&DrawCall::Clear));
        assert!(drawn > 0);
        let first_line = canvas
            .calls
            .iter()
            .position(|call| matches!(call, DrawCall::Line { .. }))
            .unwrap();
        assert_eq!(first_line, 1 + 30);
        assert_eq!(canvas.lines().len(), drawn);
    }

    #[test]
    fn lines_use_the_first_particles_colour_and_live_opacity() {
        let red = (1.0, 0.0, 0.0, 1.0);
        let config = Config::default();
        let mut store = ParticleStore::from_particles(
            vec![
                Particle {
                    position: (100.0, 100.0),
                    velocity: (0.0, 0.0),
                    size: 1.0,
                    opacity: 1.0,
                    colour: red,
                },
                Particle {
                    position: (150.0, 100.0),
                    velocity: (0.0, 0.0),
                    size: 1.0,
                    opacity: 1.0,
                    colour: WHITE,
                },
            ],
            &config,
        );
        let mut canvas = RecordingCanvas::new(500.0, 500.0);

        let live = Config {
            opacity: 0.8,
            ..config
        };
        draw(&mut store, &live, &mut canvas);
        let lines = canvas.lines();
        assert_eq!(lines.len(), 1);
        let DrawCall::Line {
            colour,
            alpha,
            width,
            ..
        } = lines[0]
        else {
            panic!("Not a line");
        };
        assert_eq!(*colour, red);
        assert!((alpha - 0.5 * 0.2 * 0.8).abs() < 0.0001);
        assert_eq!(*width, LINE_WIDTH);
    }

    #[test]
    fn particles_stay_in_bounds_over_many_frames() {
        let config = Config {
            density: 50,
            speed: 40.0,
            ..Config::default()
        };
        let mut canvas = RecordingCanvas::new(120.0, 80.0);
        let mut store = store_with(&config, canvas.size());
        for _ in 0..200 {
            draw(&mut store, &config, &mut canvas);
            for particle in store.particles() {
                assert!((0.0..=120.0).contains(&particle.position.0));
                assert!((0.0..=80.0).contains(&particle.position.1));
            }
        }
    }

    #[test]
    fn speed_change_after_creation_does_not_change_motion() {
        let original = Config {
            density: 40,
            speed: 1.0,
            ..Config::default()
        };
        let size = SurfaceSize {
            width: 10_000.0,
            height: 10_000.0,
        };
        let mut canvas = RecordingCanvas::new(size.width, size.height);

        let mut unchanged = centred_store(&original, size);
        let mut changed = unchanged.clone();
        let before = unchanged.particles().to_vec();

        draw(&mut unchanged, &original, &mut canvas);
        let faster = Config {
            speed: 5.0,
            ..original.clone()
        };
        draw(&mut changed, &faster, &mut canvas);

        assert_eq!(unchanged.particles(), changed.particles());
        let moved = total_displacement(&before, changed.particles());
        let expected: f32 = before
            .iter()
            .map(|particle| {
                (particle.velocity.0 * particle.velocity.0
                    + particle.velocity.1 * particle.velocity.1)
                    .sqrt()
            })
            .sum();
        assert!((moved - expected).abs() < 0.01);
    }

    #[test]
    fn rescaling_follows_the_live_speed() {
        let original = Config {
            density: 40,
            speed: 1.0,
            live_scaling: crate::background::config::LiveScaling::Rescale,
            ..Config::default()
        };
        let size = SurfaceSize {
            width: 10_000.0,
            height: 10_000.0,
        };
        let mut canvas = RecordingCanvas::new(size.width, size.height);
        let mut store = centred_store(&original, size);
        let before = store.particles().to_vec();

        let faster = Config {
            speed: 5.0,
            ..original.clone()
        };
        draw(&mut store, &faster, &mut canvas);

        let mut reference = centred_store(&original, size);
        draw(&mut reference, &original, &mut canvas);

        let fast = total_displacement(&before, store.particles());
        let normal = total_displacement(&before, reference.particles());
        assert!((fast - normal * 5.0).abs() < 0.01);
    }
}
