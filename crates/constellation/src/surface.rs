//! Turn a pixel canvas into terminal cells, 2 pixels per cell using half blocks.

use color_eyre::eyre::bail;
use color_eyre::eyre::Result;
use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

use crate::canvas::PixelCanvas;
use crate::colour::{over_black, Colour};

/// Pixels fainter than this are left showing the terminal's own background.
const MIN_VISIBLE_ALPHA: f32 = 0.01;

/// `Surface`
pub(crate) struct Surface {
    /// The terminal's width
    pub width: usize,
    /// The terminal's height
    pub height: usize,
    /// A surface of terminal cells
    pub surface: termwiz::surface::Surface,
}

impl Surface {
    /// Create an empty surface
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            surface: termwiz::surface::Surface::new(width, height),
        }
    }

    /// Convert a whole canvas. Anything in the canvas beyond the terminal's size is cropped.
    pub fn from_canvas(canvas: &PixelCanvas, width: usize, height: usize) -> Result<Self> {
        let mut surface = Self::new(width, height);
        let rows = height.min(canvas.rows().div_ceil(2));
        let columns = width.min(canvas.columns());

        for row in 0..rows {
            for col in 0..columns {
                let upper = canvas.pixel(col, row * 2).filter(Self::is_visible);
                let lower = canvas.pixel(col, row * 2 + 1).filter(Self::is_visible);
                surface.add_pixel_pair(col, row, upper, lower)?;
            }
        }

        Ok(surface)
    }

    /// Whether a pixel should be drawn at all.
    fn is_visible(colour: &Colour) -> bool {
        colour.3 >= MIN_VISIBLE_ALPHA
    }

    /// Draw up to 2 pixels into a single cell using the half blocks "▀" and "▄".
    ///
    /// A pair of colours is always rendered with the upper half block, the upper pixel being the
    /// cell's foreground and the lower pixel the cell's background. A lone lower pixel has to
    /// use the lower half block instead, otherwise there'd be no way to keep the terminal's
    /// default background colour in the upper half.
    pub fn add_pixel_pair(
        &mut self,
        col: usize,
        row: usize,
        upper: Option<Colour>,
        lower: Option<Colour>,
    ) -> Result<()> {
        if col >= self.width {
            bail!("Tried to add pixel to column: {col}")
        }
        if row >= self.height {
            bail!("Tried to add pixel to row: {row}")
        }

        let (character, fg_colour, bg_colour) = match (upper, lower) {
            (None, None) => return Ok(()),
            (Some(upper), None) => (
                "▀",
                Self::make_fg_colour(over_black(upper)),
                Self::make_default_bg_colour(),
            ),
            (None, Some(lower)) => (
                "▄",
                Self::make_fg_colour(over_black(lower)),
                Self::make_default_bg_colour(),
            ),
            (Some(upper), Some(lower)) => (
                "▀",
                Self::make_fg_colour(over_black(upper)),
                Self::make_bg_colour(over_black(lower)),
            ),
        };

        self.surface.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(col),
                y: TermwizPosition::Absolute(row),
            },
            fg_colour,
            bg_colour,
        ]);
        self.surface.add_change(character);

        Ok(())
    }

    /// Make a Termwiz colour attribute
    #[must_use]
    pub const fn make_colour_attribute(colour: Colour) -> termwiz::color::ColorAttribute {
        termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
            colour.0, colour.1, colour.2, colour.3,
        ))
    }

    /// Make a Termwiz background colour
    #[must_use]
    pub const fn make_bg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
    }

    /// Make the default Termwiz background colour. This is whatever the terminal shows when
    /// nothing else has been set, on a GUI terminal it may well be transparent.
    #[must_use]
    pub const fn make_default_bg_colour() -> TermwizChange {
        let colour_attribute = termwiz::color::ColorAttribute::Default;
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
    }

    /// Make a Termwiz foreground colour
    #[must_use]
    pub const fn make_fg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(colour_attribute))
    }
}

#[cfg(test)]
#[expect(
    clippy::indexing_slicing,
    clippy::shadow_unrelated,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;
    use crate::canvas::{Canvas as _, SurfaceSize};
    use crate::colour::WHITE;

    const RED: Colour = (1.0, 0.0, 0.0, 1.0);

    fn canvas(width: f32, height: f32) -> PixelCanvas {
        PixelCanvas::new(SurfaceSize { width, height }, 1.0).unwrap()
    }

    #[test]
    fn empty_cells_are_left_alone() {
        let mut surface = Surface::new(1, 1);
        surface.add_pixel_pair(0, 0, None, None).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), " ");
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn upper_pixel_only() {
        let mut surface = Surface::new(2, 2);
        surface.add_pixel_pair(1, 1, Some(WHITE), None).unwrap();
        let cell = &surface.surface.screen_cells()[1][1];
        assert_eq!(cell.str(), "▀");
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn lower_pixel_only() {
        let mut surface = Surface::new(1, 1);
        surface.add_pixel_pair(0, 0, None, Some(RED)).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), "▄");
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(RED)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn both_pixels() {
        let mut surface = Surface::new(1, 1);
        surface.add_pixel_pair(0, 0, Some(RED), Some(WHITE)).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), "▀");
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(RED)
        );
        assert_eq!(
            cell.attrs().background(),
            Surface::make_colour_attribute(WHITE)
        );
    }

    #[test]
    fn out_of_bounds_pixels_are_errors() {
        let mut surface = Surface::new(2, 2);
        let result = surface.add_pixel_pair(0, 2, Some(WHITE), None).unwrap_err();
        assert_eq!(
            format!("{}", result.root_cause()),
            "Tried to add pixel to row: 2"
        );
        let result = surface.add_pixel_pair(2, 0, Some(WHITE), None).unwrap_err();
        assert_eq!(
            format!("{}", result.root_cause()),
            "Tried to add pixel to column: 2"
        );
    }

    #[test]
    fn converts_a_canvas() {
        let mut pixels = canvas(2.0, 4.0);
        pixels.fill_circle((0.5, 0.5), 0.1, WHITE, 1.0);
        pixels.fill_circle((1.5, 3.5), 0.1, RED, 0.5);

        let mut surface = Surface::from_canvas(&pixels, 2, 2).unwrap();
        let cells = surface.surface.screen_cells();

        assert_eq!(cells[0][0].str(), "▀");
        assert_eq!(
            cells[0][0].attrs().foreground(),
            Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(cells[0][1].str(), " ");
        assert_eq!(cells[1][0].str(), " ");
        assert_eq!(cells[1][1].str(), "▄");
        assert_eq!(
            cells[1][1].attrs().foreground(),
            Surface::make_colour_attribute((0.5, 0.0, 0.0, 1.0))
        );
    }

    #[test]
    fn canvases_bigger_than_the_terminal_are_cropped() {
        let mut pixels = canvas(10.0, 10.0);
        pixels.fill_circle((9.5, 9.5), 0.1, WHITE, 1.0);
        let mut surface = Surface::from_canvas(&pixels, 3, 2).unwrap();
        let cells = surface.surface.screen_cells();
        assert!(cells
            .iter()
            .all(|row| row.iter().all(|cell| cell.str() == " ")));
    }

    #[test]
    fn odd_pixel_heights_still_fill_the_last_row() {
        let mut pixels = canvas(1.0, 3.0);
        pixels.fill_circle((0.5, 2.5), 0.1, WHITE, 1.0);
        let mut surface = Surface::from_canvas(&pixels, 1, 2).unwrap();
        let cells = surface.surface.screen_cells();
        assert_eq!(cells[1][0].str(), "▀");
    }
}
