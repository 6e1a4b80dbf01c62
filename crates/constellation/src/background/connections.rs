//! Find pairs of particles close enough to be joined by a faint line, the bit that makes the
//! background look like a constellation.

use std::collections::HashMap;

use super::particle::Particle;
use crate::canvas::Point;

/// Particles closer than this are connected. It's deliberately not configurable.
pub const CONNECTION_DISTANCE: f32 = 100.0;

/// The width of connection lines.
pub const LINE_WIDTH: f32 = 0.5;

/// The alpha of a connection line between two particles at the same position, before the
/// configured opacity is applied.
const MAX_LINE_ALPHA: f32 = 0.2;

/// How to search for nearby pairs.
#[derive(serde::Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ConnectionStrategy {
    /// Compare every particle with every other particle. Fine for a few hundred particles.
    #[default]
    Pairwise,
    /// Bucket particles into a grid of `CONNECTION_DISTANCE` sized cells and only compare
    /// particles in neighbouring cells.
    Grid,
}

/// A pair of particles, by index, that should be joined by a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Connection {
    /// Index of the first particle, the line takes this particle's colour
    pub from: usize,
    /// Index of the second particle, always greater than `from`
    pub to: usize,
    /// Distance between the two
    pub distance: f32,
}

impl Connection {
    /// The line fades out the further apart the particles are.
    #[must_use]
    pub fn alpha(&self, opacity: f32) -> f32 {
        (1.0 - self.distance / CONNECTION_DISTANCE) * MAX_LINE_ALPHA * opacity
    }
}

impl ConnectionStrategy {
    /// Every unordered pair of particles closer than `CONNECTION_DISTANCE`, ordered by `from` then
    /// `to`. Both strategies give identical results.
    #[must_use]
    pub fn find(self, particles: &[Particle]) -> Vec<Connection> {
        match self {
            Self::Pairwise => pairwise(particles),
            Self::Grid => grid(particles),
        }
    }
}

/// Distance between 2 points.
fn distance(first: Point, second: Point) -> f32 {
    let delta_x = first.0 - second.0;
    let delta_y = first.1 - second.1;
    (delta_x * delta_x + delta_y * delta_y).sqrt()
}

/// Check a single pair.
fn connect(particles: &[Particle], from: usize, to: usize) -> Option<Connection> {
    let first = particles.get(from)?;
    let second = particles.get(to)?;
    let gap = distance(first.position, second.position);
    (gap < CONNECTION_DISTANCE).then_some(Connection {
        from,
        to,
        distance: gap,
    })
}

/// The O(n²) approach.
fn pairwise(particles: &[Particle]) -> Vec<Connection> {
    let mut connections = Vec::new();
    for from in 0..particles.len() {
        for to in (from + 1)..particles.len() {
            if let Some(connection) = connect(particles, from, to) {
                connections.push(connection);
            }
        }
    }
    connections
}

/// The grid cell that a position falls in.
#[expect(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    reason = "Positions are always well within i64"
)]
fn cell_of(position: Point) -> (i64, i64) {
    (
        (position.0 / CONNECTION_DISTANCE).floor() as i64,
        (position.1 / CONNECTION_DISTANCE).floor() as i64,
    )
}

/// Spatial bucketing. Because each cell is as wide as the connection distance, any connected
/// pair is always in the same or adjacent cells.
fn grid(particles: &[Particle]) -> Vec<Connection> {
    let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (index, particle) in particles.iter().enumerate() {
        cells
            .entry(cell_of(particle.position))
            .or_default()
            .push(index);
    }

    let mut connections = Vec::new();
    for (from, particle) in particles.iter().enumerate() {
        let (column, row) = cell_of(particle.position);
        for neighbour_row in (row - 1)..=(row + 1) {
            for neighbour_column in (column - 1)..=(column + 1) {
                let Some(neighbours) = cells.get(&(neighbour_column, neighbour_row)) else {
                    continue;
                };
                for &to in neighbours {
                    if to <= from {
                        continue;
                    }
                    if let Some(connection) = connect(particles, from, to) {
                        connections.push(connection);
                    }
                }
            }
        }
    }

    connections.sort_unstable_by_key(|connection| (connection.from, connection.to));
    connections
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::colour::WHITE;
    use rand::{Rng as _, SeedableRng as _};

    fn particle_at(x: f32, y: f32) -> Particle {
        Particle {
            position: (x, y),
            velocity: (0.0, 0.0),
            size: 1.0,
            opacity: 1.0,
            colour: WHITE,
        }
    }

    fn both(particles: &[Particle]) -> Vec<Connection> {
        let pairwise = ConnectionStrategy::Pairwise.find(particles);
        let grid = ConnectionStrategy::Grid.find(particles);
        assert_eq!(pairwise, grid);
        pairwise
    }

    #[test]
    fn connects_just_inside_the_threshold() {
        let particles = vec![particle_at(0.0, 0.0), particle_at(99.99, 0.0)];
        let connections = both(&particles);
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].from, 0);
        assert_eq!(connections[0].to, 1);
    }

    #[test]
    fn does_not_connect_just_outside_the_threshold() {
        let particles = vec![particle_at(0.0, 0.0), particle_at(100.01, 0.0)];
        assert!(both(&particles).is_empty());
    }

    #[test]
    fn exactly_at_the_threshold_is_not_connected() {
        let particles = vec![particle_at(0.0, 0.0), particle_at(60.0, 80.0)];
        assert!(both(&particles).is_empty());
    }

    #[test]
    fn no_particles_or_one_particle_means_no_connections() {
        assert!(both(&[]).is_empty());
        assert!(both(&[particle_at(5.0, 5.0)]).is_empty());
    }

    #[test]
    fn alpha_fades_with_distance() {
        let close = Connection {
            from: 0,
            to: 1,
            distance: 0.0,
        };
        assert!((close.alpha(1.0) - 0.2).abs() < f32::EPSILON);
        assert!((close.alpha(0.5) - 0.1).abs() < f32::EPSILON);

        let halfway = Connection {
            distance: 50.0,
            ..close
        };
        assert!((halfway.alpha(1.0) - 0.1).abs() < 0.0001);
    }

    #[test]
    fn grid_matches_pairwise_for_a_random_cloud() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let particles: Vec<Particle> = (0..300)
            .map(|_| particle_at(rng.gen_range(-50.0..1000.0), rng.gen_range(-50.0..600.0)))
            .collect();
        let connections = both(&particles);
        assert!(!connections.is_empty());
        assert!(connections.iter().all(|connection| connection.from < connection.to));
    }
}
