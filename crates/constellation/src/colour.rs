//! Colours as they're written in the config file, eg `"#38bdf8"` or `"teal"`, converted to true
//! colour values.

use color_eyre::eyre::{ContextCompat as _, Result};

/// An RGBA colour, each channel is in the range `0.0..=1.0`.
pub(crate) type Colour = (f32, f32, f32, f32);

/// A default pure white.
pub const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

/// A fully transparent colour. It's what an empty canvas is filled with.
pub const TRANSPARENT: Colour = (0.0, 0.0, 0.0, 0.0);

/// A colour parsed from a user-supplied string.
#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(try_from = "String")]
pub(crate) struct ConfigColour(pub Colour);

impl Default for ConfigColour {
    fn default() -> Self {
        Self(WHITE)
    }
}

impl TryFrom<String> for ConfigColour {
    type Error = color_eyre::eyre::Error;

    fn try_from(value: String) -> Result<Self> {
        parse(&value).map(Self)
    }
}

/// Parse either a hex code (`#abc`, `#aabbcc`) or a CSS colour name (`"rebeccapurple"`).
pub(crate) fn parse(text: &str) -> Result<Colour> {
    let trimmed = text.trim();
    let rgb: palette::Srgb<u8> = if trimmed.starts_with('#') {
        trimmed
            .parse()
            .map_err(|error| color_eyre::eyre::eyre!("Invalid hex colour '{trimmed}': {error}"))?
    } else {
        palette::named::from_str(&trimmed.to_lowercase())
            .context(format!("Unknown colour name: '{trimmed}'"))?
    };

    let rgb_float: palette::Srgb<f32> = rgb.into_format();
    Ok((rgb_float.red, rgb_float.green, rgb_float.blue, 1.0))
}

/// Composite a colour with the given alpha over opaque black. Terminals can't do transparency
/// so this is how faint pixels end up looking faint.
#[must_use]
pub(crate) fn over_black(colour: Colour) -> Colour {
    let alpha = colour.3.clamp(0.0, 1.0);
    (colour.0 * alpha, colour.1 * alpha, colour.2 * alpha, 1.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_long_hex() {
        let colour = parse("#ff0080").unwrap();
        assert!((colour.0 - 1.0).abs() < f32::EPSILON);
        assert!(colour.1.abs() < f32::EPSILON);
        assert!((colour.2 - 128.0 / 255.0).abs() < 0.001);
        assert!((colour.3 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parses_short_hex() {
        assert_eq!(parse("#fff").unwrap(), WHITE);
    }

    #[test]
    fn parses_named_colours_case_insensitively() {
        assert_eq!(parse("White").unwrap(), WHITE);
        assert_eq!(parse(" white ").unwrap(), WHITE);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(parse("#zzzzzz").is_err());
        assert!(parse("not-a-colour").is_err());
    }

    #[test]
    fn deserialises_from_toml_string() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            colour: ConfigColour,
        }
        let wrapper: Wrapper = toml::from_str("colour = \"#ffffff\"").unwrap();
        assert_eq!(wrapper.colour, ConfigColour(WHITE));

        let result = toml::from_str::<Wrapper>("colour = \"#nope\"");
        assert!(result.is_err());
    }

    #[test]
    fn faint_colours_darken_over_black() {
        let composited = over_black((1.0, 0.5, 0.0, 0.5));
        assert_eq!(composited, (0.5, 0.25, 0.0, 1.0));
    }
}
