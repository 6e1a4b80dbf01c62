//! All the variables that can be configured for the particle background.

use color_eyre::eyre::{bail, Result};

use crate::colour::ConfigColour;

/// What to do when the speed or opacity changes after the particles have been created.
#[derive(serde::Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LiveScaling {
    /// Changes have no visible effect on existing particles. Motion and particle alpha stay
    /// exactly as they were when the particles were created. Only the connection lines follow
    /// the live opacity.
    #[default]
    Inert,
    /// Velocities and particle alphas are rescaled every frame by the ratio of the live value to
    /// the value at creation time.
    Rescale,
}

/// All the config for the particle background.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct Config {
    /// The number of particles. Only used when the particles are first created.
    pub density: usize,
    /// A multiplier on the particles' initial velocities.
    pub speed: f32,
    /// The smallest possible particle radius.
    pub size_min: f32,
    /// The largest possible particle radius.
    pub size_max: f32,
    /// The colour of every particle when not in multi-colour mode.
    pub color: ConfigColour,
    /// The palette that particles pick from when in multi-colour mode.
    pub colors: Vec<ConfigColour>,
    /// Whether to use the palette.
    pub multi_color: bool,
    /// The base transparency of particles and connection lines.
    pub opacity: f32,
    /// How changes to `speed` and `opacity` are treated after the particles are created.
    pub live_scaling: LiveScaling,
    /// How nearby pairs of particles are found.
    pub connections: super::connections::ConnectionStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            density: 80,
            speed: 1.0,
            size_min: 1.0,
            size_max: 3.0,
            color: ConfigColour::default(),
            colors: Vec::new(),
            multi_color: false,
            opacity: 0.5,
            live_scaling: LiveScaling::default(),
            connections: super::connections::ConnectionStrategy::default(),
        }
    }
}

impl Config {
    /// Catch values that would make for a broken or nonsensical background.
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() {
            bail!("Particle speed must be a finite number, got: {}", self.speed);
        }
        if !self.size_min.is_finite() || !self.size_max.is_finite() {
            bail!("Particle sizes must be finite numbers");
        }
        if self.size_min < 0.0 {
            bail!("Particle `size_min` can't be negative, got: {}", self.size_min);
        }
        if self.size_min > self.size_max {
            bail!(
                "Particle `size_min` ({}) is bigger than `size_max` ({})",
                self.size_min,
                self.size_max
            );
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            bail!(
                "Particle opacity must be between 0.0 and 1.0, got: {}",
                self.opacity
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::background::connections::ConnectionStrategy;

    #[test]
    fn empty_table_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        config.validate().unwrap();
    }

    #[test]
    fn parses_a_full_table() {
        let config: Config = toml::from_str(
            r##"
            density = 12
            speed = 2.5
            size_min = 0.5
            size_max = 4.0
            color = "#ff0000"
            colors = ["#00ff00", "blue"]
            multi_color = true
            opacity = 0.8
            live_scaling = "rescale"
            connections = "grid"
            "##,
        )
        .unwrap();

        assert_eq!(config.density, 12);
        assert_eq!(config.colors.len(), 2);
        assert_eq!(config.color.0, (1.0, 0.0, 0.0, 1.0));
        assert!(config.multi_color);
        assert_eq!(config.live_scaling, LiveScaling::Rescale);
        assert_eq!(config.connections, ConnectionStrategy::Grid);
        config.validate().unwrap();
    }

    #[test]
    fn bad_colour_fails_to_parse() {
        let result = toml::from_str::<Config>("colors = [\"#123456\", \"nope\"]");
        assert!(result.is_err());
    }

    #[test]
    fn inverted_size_range_is_invalid() {
        let config = Config {
            size_min: 5.0,
            size_max: 1.0,
            ..Config::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("bigger than"));
    }

    #[test]
    fn opacity_out_of_range_is_invalid() {
        let config = Config {
            opacity: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_and_infinite_values_are_invalid() {
        let config = Config {
            size_min: -1.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            speed: f32::INFINITY,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
